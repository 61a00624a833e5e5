//! Per-loop RGBA color storage.

use super::attributes::ColorChannel;
use crate::math::Rgba;

/// A vertex color layer holding one RGBA value per loop (face corner).
///
/// Colors are per loop rather than per vertex: a vertex shared by two
/// polygons can carry a different color in each of them.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexColorLayer {
    name: String,
    data: Vec<Rgba>,
}

impl VertexColorLayer {
    /// Create a layer with every loop set to `[0, 0, 0, 0]`.
    pub fn zeroed(name: impl Into<String>, loop_count: usize) -> Self {
        Self {
            name: name.into(),
            data: vec![[0.0; 4]; loop_count],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, loop_index: usize) -> Option<Rgba> {
        self.data.get(loop_index).copied()
    }

    #[inline]
    pub fn set(&mut self, loop_index: usize, color: Rgba) {
        if let Some(slot) = self.data.get_mut(loop_index) {
            *slot = color;
        }
    }

    /// Overwrite a single channel, leaving the other three untouched.
    #[inline]
    pub fn set_channel(&mut self, loop_index: usize, channel: ColorChannel, value: f32) {
        if let Some(slot) = self.data.get_mut(loop_index) {
            slot[channel.index()] = value;
        }
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.data
    }

    pub fn colors_mut(&mut self) -> &mut [Rgba] {
        &mut self.data
    }

    /// Values of one channel for every loop, in loop order.
    pub fn channel(&self, channel: ColorChannel) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().map(move |c| c[channel.index()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed() {
        let layer = VertexColorLayer::zeroed("Col", 6);
        assert_eq!(layer.len(), 6);
        assert!(layer.colors().iter().all(|c| *c == [0.0; 4]));
    }

    #[test]
    fn test_set_channel_isolated() {
        let mut layer = VertexColorLayer::zeroed("Col", 2);
        layer.set(1, [0.1, 0.2, 0.3, 0.4]);
        layer.set_channel(1, ColorChannel::B, 0.9);
        assert_eq!(layer.get(1), Some([0.1, 0.2, 0.9, 0.4]));
        assert_eq!(layer.get(0), Some([0.0; 4]));
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut layer = VertexColorLayer::zeroed("Col", 1);
        layer.set(5, [1.0; 4]);
        layer.set_channel(5, ColorChannel::R, 1.0);
        assert_eq!(layer.get(5), None);
        assert_eq!(layer.get(0), Some([0.0; 4]));
    }
}
