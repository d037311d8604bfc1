//! Surface-type classification and fill colors.

/// Number of surface-type slots in every tile header.
pub const NR_SURFACE_TYPES: usize = 10;

/// Land-cover class of a surface mesh. The discriminant is the slot index in
/// the tile header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SurfaceType {
    Water = 0,
    Urban = 1,
    Industrial = 2,
    Farmland = 3,
    OpenLand = 4,
    Mountain = 5,
    Forest = 6,
    Unmapped = 7,
    Unclassified = 8,
    Unspecified = 9,
}

impl SurfaceType {
    /// All surface types in slot order.
    pub const ALL: [SurfaceType; NR_SURFACE_TYPES] = [
        Self::Water,
        Self::Urban,
        Self::Industrial,
        Self::Farmland,
        Self::OpenLand,
        Self::Mountain,
        Self::Forest,
        Self::Unmapped,
        Self::Unclassified,
        Self::Unspecified,
    ];

    /// Looks up a surface type by header slot.
    #[must_use]
    pub fn from_slot(slot: usize) -> Option<Self> {
        Self::ALL.get(slot).copied()
    }

    /// Header slot index.
    #[must_use]
    pub fn slot(self) -> usize {
        self as usize
    }

    /// Fill color as `0xRRGGBB`.
    #[must_use]
    pub fn rgb_hex(self) -> u32 {
        match self {
            Self::Water => 0xb9ccff,
            Self::Urban => 0xfad999,
            Self::Industrial => 0xdcddc5,
            Self::Farmland => 0xfff7a6,
            Self::OpenLand => 0xffffe0,
            Self::Mountain => 0xffffff,
            Self::Forest => 0xc2e6a2,
            Self::Unmapped => 0xb9ccff,
            Self::Unclassified => 0xc2e6a2,
            Self::Unspecified => 0x7f7f7f,
        }
    }

    /// Fill color as normalized RGB, ready for a shader uniform.
    #[must_use]
    pub fn color(self) -> [f32; 3] {
        let rgb = self.rgb_hex();
        [
            (rgb >> 16) as f32 / 255.0,
            ((rgb >> 8) & 0xff) as f32 / 255.0,
            (rgb & 0xff) as f32 / 255.0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_roundtrip() {
        for (slot, ty) in SurfaceType::ALL.iter().enumerate() {
            assert_eq!(ty.slot(), slot);
            assert_eq!(SurfaceType::from_slot(slot), Some(*ty));
        }
        assert_eq!(SurfaceType::from_slot(NR_SURFACE_TYPES), None);
    }

    #[test]
    fn test_colors_normalized() {
        assert_eq!(SurfaceType::Mountain.color(), [1.0, 1.0, 1.0]);
        for ty in SurfaceType::ALL {
            for c in ty.color() {
                assert!((0.0..=1.0).contains(&c));
            }
        }
    }
}
