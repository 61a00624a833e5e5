//! Meaning of the baked vertex color channels.

/// One channel of an RGBA vertex color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorChannel {
    R = 0,
    G = 1,
    B = 2,
    A = 3,
}

impl ColorChannel {
    pub const ALL: [ColorChannel; 4] = [Self::R, Self::G, Self::B, Self::A];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Maps `0..=3` to a channel.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::R),
            1 => Some(Self::G),
            2 => Some(Self::B),
            3 => Some(Self::A),
            _ => None,
        }
    }

    /// Weight mask that touches only this channel.
    pub const fn mask(self) -> [f32; 4] {
        let mut mask = [0.0; 4];
        mask[self as usize] = 1.0;
        mask
    }
}

/// Per-leaf distance falloff, normalized to each leaf's own extent.
///
/// A shader typically uses this as the flutter mask of a single leaf card.
pub const LEAF_DISTANCE_CHANNEL: ColorChannel = ColorChannel::R;

/// Branch identifier in `[0, 1)`, shared by a branch and every leaf under it.
///
/// Used as a phase offset so neighbouring branches sway out of sync.
pub const BRANCH_ID_CHANNEL: ColorChannel = ColorChannel::G;

/// Distance from the branch attach point, normalized over the whole
/// branch + leaves cluster.
pub const BRANCH_DISTANCE_CHANNEL: ColorChannel = ColorChannel::B;

/// Name given to a color layer created on first write.
pub const DEFAULT_COLOR_LAYER: &str = "Col";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_index_roundtrip() {
        for channel in ColorChannel::ALL {
            assert_eq!(ColorChannel::from_index(channel.index()), Some(channel));
        }
        assert_eq!(ColorChannel::from_index(4), None);
    }

    #[test]
    fn test_channel_mask() {
        assert_eq!(ColorChannel::G.mask(), [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(BRANCH_DISTANCE_CHANNEL.mask(), [0.0, 0.0, 1.0, 0.0]);
    }
}
