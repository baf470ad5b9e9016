//! The six axis-aligned faces of a cube.

use nalgebra::Vector3;

/// A face of an axis-aligned cube.
///
/// Octree nodes are cubes, so every node has six faces on which it can
/// have neighbors. The discriminant ordering matches the face tables
/// used by the boundary and corner layers, so it must not be
/// rearranged.
///
/// # Example
///
/// ```
/// use carve_types::CubeFace;
///
/// let f = CubeFace::XPlus;
/// assert_eq!(f.opposite(), CubeFace::XMinus);
/// assert_eq!(f.axis(), 0);
/// assert_eq!(f.normal().x, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CubeFace {
    /// The `-z` face.
    ZMinus = 0,
    /// The `-y` face.
    YMinus = 1,
    /// The `-x` face.
    XMinus = 2,
    /// The `+x` face.
    XPlus = 3,
    /// The `+y` face.
    YPlus = 4,
    /// The `+z` face.
    ZPlus = 5,
}

impl CubeFace {
    /// All six faces, in discriminant order. Useful for iteration.
    pub const ALL: [Self; 6] = [
        Self::ZMinus,
        Self::YMinus,
        Self::XMinus,
        Self::XPlus,
        Self::YPlus,
        Self::ZPlus,
    ];

    /// Returns the face on the opposite side of the cube.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::ZMinus => Self::ZPlus,
            Self::YMinus => Self::YPlus,
            Self::XMinus => Self::XPlus,
            Self::XPlus => Self::XMinus,
            Self::YPlus => Self::YMinus,
            Self::ZPlus => Self::ZMinus,
        }
    }

    /// Returns the coordinate axis this face is perpendicular to
    /// (0 = x, 1 = y, 2 = z).
    #[inline]
    #[must_use]
    pub const fn axis(self) -> usize {
        match self {
            Self::XMinus | Self::XPlus => 0,
            Self::YMinus | Self::YPlus => 1,
            Self::ZMinus | Self::ZPlus => 2,
        }
    }

    /// Returns the sign of the face along its axis (`+1.0` or `-1.0`).
    #[inline]
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::XPlus | Self::YPlus | Self::ZPlus => 1.0,
            Self::XMinus | Self::YMinus | Self::ZMinus => -1.0,
        }
    }

    /// Returns the outward unit normal of this face.
    #[inline]
    #[must_use]
    pub fn normal(self) -> Vector3<f64> {
        let mut n = Vector3::zeros();
        n[self.axis()] = self.sign();
        n
    }

    /// Returns the face as a dense index in `0..6`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}
