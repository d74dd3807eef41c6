use core::ops::{BitOr, BitXor};

/// Mirror flags for a texture draw.
///
/// Bit 0 mirrors horizontally, bit 1 vertically, matching the classic
/// `X_FLIP_*` numbering used by sprite data.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Flip(u8);

impl Flip {
    pub const NONE: Flip = Flip(0);
    pub const HORIZONTAL: Flip = Flip(1);
    pub const VERTICAL: Flip = Flip(2);
    pub const BOTH: Flip = Flip(3);

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Flip(bits & 3)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn horizontal(self) -> bool {
        self.0 & 1 != 0
    }

    #[inline]
    pub const fn vertical(self) -> bool {
        self.0 & 2 != 0
    }
}

impl BitOr for Flip {
    type Output = Flip;
    #[inline]
    fn bitor(self, rhs: Flip) -> Flip {
        Flip(self.0 | rhs.0)
    }
}

impl BitXor for Flip {
    type Output = Flip;
    #[inline]
    fn bitxor(self, rhs: Flip) -> Flip {
        Flip(self.0 ^ rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_and_query() {
        let f = Flip::HORIZONTAL | Flip::VERTICAL;
        assert_eq!(f, Flip::BOTH);
        assert!(f.horizontal() && f.vertical());
        assert_eq!(f ^ Flip::VERTICAL, Flip::HORIZONTAL);
    }

    #[test]
    fn from_bits_masks_unknown_bits() {
        assert_eq!(Flip::from_bits(0xfe), Flip::VERTICAL);
    }
}
