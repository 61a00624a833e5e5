//! Vertex color painting: masked fills and distance falloff channels.

mod brushes;
mod distance;

pub use brushes::{ALL_CHANNELS, fill, paint};
pub use distance::{MIN_DISTANCE, find_max_distance, paint_distance_channel};
