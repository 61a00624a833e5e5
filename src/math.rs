//! Point and color helpers shared by the painters and the shell builder.

use bevy::prelude::*;

/// RGBA value stored per loop.
pub type Rgba = [f32; 4];

/// Per-channel blend weights. `0.0` keeps the existing channel, `1.0` replaces it.
pub type ChannelWeights = [f32; 4];

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    a.distance(b)
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn distance_squared(a: Vec3, b: Vec3) -> f32 {
    a.distance_squared(b)
}

/// Arithmetic mean of a point list. Returns `Vec3::ZERO` for an empty list.
pub fn centroid(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    points.iter().copied().sum::<Vec3>() / points.len() as f32
}

/// Generalized lerp applied to each channel independently.
///
/// `result[i] = (1 - weights[i]) * existing[i] + weights[i] * target[i]`
///
/// # Example
/// ```
/// use bevy_vegetation_bake::math::blend;
///
/// let out = blend([0.2, 0.3, 0.4, 0.5], [1.0, 0.0, 1.0, 0.0], [1.0, 1.0, 1.0, 1.0]);
/// assert_eq!(out, [1.0, 0.0, 1.0, 0.0]);
/// ```
#[inline]
pub fn blend(existing: Rgba, target: Rgba, weights: ChannelWeights) -> Rgba {
    std::array::from_fn(|i| (1.0 - weights[i]) * existing[i] + weights[i] * target[i])
}

/// Fractional part in `[0, 1)`, also for negative inputs.
#[inline]
pub fn fract01(value: f64) -> f64 {
    let f = value - value.floor();
    // `floor` can round a tiny negative value up to exactly 1.0.
    if f >= 1.0 { 0.0 } else { f }
}

/// A sphere enclosing a set of points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Fits a sphere around `points`: the center is their centroid and the
    /// radius the largest distance from it, scaled by `1 + inflation`.
    ///
    /// Returns `None` for an empty point list.
    pub fn fit(points: &[Vec3], inflation: f32) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let center = centroid(points);
        let max_sq = points
            .iter()
            .map(|p| distance_squared(*p, center))
            .fold(0.0f32, f32::max);

        Some(Self {
            center,
            radius: max_sq.sqrt() * (1.0 + inflation),
        })
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.center - Vec3::splat(self.radius)
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.center + Vec3::splat(self.radius)
    }
}
