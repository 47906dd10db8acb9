//! Display rotation and pixel addressing.
//!
//! The LED matrix framebuffer has a fixed physical layout: cell `i` of the 8×8 grid lives at byte
//! offset `i * 2`. Callers address pixels in logical coordinates that are independent of how the
//! HAT is mounted, so each supported rotation carries a permutation table translating logical
//! row-major cell indices to physical ones.

/// Clockwise rotation of the LED matrix, in one of the four supported orientations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// No rotation. Logical and physical layouts coincide.
    #[default]
    Deg0,
    /// 90 degrees clockwise.
    Deg90,
    /// 180 degrees clockwise.
    Deg180,
    /// 270 degrees clockwise.
    Deg270,
}

impl Rotation {
    /// Returns the rotation matching a degree value, or `None` for anything outside
    /// {0, 90, 180, 270}.
    #[must_use]
    pub const fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Returns this rotation's angle in degrees.
    #[must_use]
    pub const fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }
}

/// Permutation of `0..64` mapping logical row-major cell indices (`y * 8 + x`) to physical cell
/// indices.
pub(crate) type CellMap = [usize; 64];

/// The identity map: logical and physical indices coincide.
pub(crate) fn identity() -> CellMap {
    let mut map = [0; 64];
    for (cell, slot) in map.iter_mut().enumerate() {
        *slot = cell;
    }
    map
}

/// Rotates a cell map clockwise, treating it as an 8×8 row-major grid.
///
/// A cell at `(row, col)` lands at `(col, 7 - row)` for 90°, `(7 - row, 7 - col)` for 180° and
/// `(7 - col, row)` for 270°. `Deg0` returns the input unchanged.
pub(crate) fn rotated(map: &CellMap, rotation: Rotation) -> CellMap {
    let mut out = [0; 64];

    for row in 0..8 {
        for col in 0..8 {
            let cell = map[row * 8 + col];
            match rotation {
                Rotation::Deg0 => out[row * 8 + col] = cell,
                Rotation::Deg90 => out[col * 8 + (7 - row)] = cell,
                Rotation::Deg180 => out[(7 - row) * 8 + (7 - col)] = cell,
                Rotation::Deg270 => out[(7 - col) * 8 + row] = cell,
            }
        }
    }

    out
}

/// The four orientation maps, built once and read-only thereafter.
#[derive(Debug, Clone)]
pub(crate) struct OrientationMaps {
    maps: [CellMap; 4],
}

impl OrientationMaps {
    pub fn new() -> Self {
        let base = identity();
        Self {
            maps: [
                base,
                rotated(&base, Rotation::Deg90),
                rotated(&base, Rotation::Deg180),
                rotated(&base, Rotation::Deg270),
            ],
        }
    }

    pub fn get(&self, rotation: Rotation) -> &CellMap {
        &self.maps[rotation.index()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn is_permutation(map: &CellMap) -> bool {
        let mut seen = [false; 64];
        for &cell in map {
            if cell > 63 || seen[cell] {
                return false;
            }
            seen[cell] = true;
        }
        true
    }

    #[test]
    fn unsupported_degrees_are_rejected() {
        assert_eq!(Rotation::from_degrees(90), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(45), None);
        assert_eq!(Rotation::from_degrees(-90), None);
        assert_eq!(Rotation::from_degrees(360), None);
    }

    #[test]
    fn every_map_is_a_bijection() {
        let maps = OrientationMaps::new();
        for rotation in [
            Rotation::Deg0,
            Rotation::Deg90,
            Rotation::Deg180,
            Rotation::Deg270,
        ] {
            assert!(is_permutation(maps.get(rotation)), "{rotation:?}");
        }
    }

    #[test]
    fn quarter_turns_compose_to_identity() {
        let mut map = identity();
        for _ in 0..4 {
            map = rotated(&map, Rotation::Deg90);
        }
        assert_eq!(map, identity());
    }

    #[test]
    fn transform_spot_checks() {
        let maps = OrientationMaps::new();

        assert_eq!(maps.get(Rotation::Deg0)[0], 0);
        assert_eq!(maps.get(Rotation::Deg0)[63], 63);

        // (row 0, col 0) lands at (0, 7); (row 0, col 7) lands at (7, 7).
        assert_eq!(maps.get(Rotation::Deg90)[7], 0);
        assert_eq!(maps.get(Rotation::Deg90)[63], 7);
        assert_eq!(maps.get(Rotation::Deg90)[0], 56);

        // 180 degrees reverses the grid.
        assert_eq!(maps.get(Rotation::Deg180)[0], 63);
        assert_eq!(maps.get(Rotation::Deg180)[63], 0);

        assert_eq!(maps.get(Rotation::Deg270)[0], 7);
        assert_eq!(maps.get(Rotation::Deg270)[63], 56);
    }
}
