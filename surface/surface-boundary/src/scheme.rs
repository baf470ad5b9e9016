//! Segmentation schemes.

use carve_octree::LeafData;

/// The pure predicate deciding which leaves count as interior for a
/// boundary extraction.
///
/// All three schemes read only the leaf payload, so the same extractor
/// serves every segmentation of the model:
///
/// - [`SegScheme::All`] uses the probabilistic label alone and yields
///   the full carved surface.
/// - [`SegScheme::Objects`] counts any leaf outside a floorplan room
///   as exterior, so only room-contained volume forms the surface and
///   furniture/fixture geometry separates from the building shell.
/// - [`SegScheme::Room`] counts solid leaves inside rooms as interior
///   too, melting objects into the room volume and isolating only the
///   room shell.
///
/// An absent leaf (no payload) is never interior under any scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SegScheme {
    /// Interior = probabilistically solid-free volume label.
    #[default]
    All,
    /// Interior only inside imported rooms.
    Objects,
    /// Object leaves count as interior, exposing the room shell.
    Room,
}

impl SegScheme {
    /// Applies the scheme's interior predicate to a leaf payload.
    #[must_use]
    pub fn is_interior(self, data: Option<&LeafData>) -> bool {
        let Some(data) = data else {
            return false;
        };
        match self {
            Self::All => data.is_interior(),
            Self::Objects => data.is_interior() && data.fp_room >= 0,
            Self::Room => data.is_interior() || data.fp_room >= 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(prob: f64, room: i32) -> LeafData {
        let mut d = LeafData::from_sample(1.0, prob, 0.0, 0.0, 0.0);
        d.set_fp_room(room);
        d
    }

    #[test]
    fn absent_leaves_are_exterior_everywhere() {
        for scheme in [SegScheme::All, SegScheme::Objects, SegScheme::Room] {
            assert!(!scheme.is_interior(None));
        }
    }

    #[test]
    fn all_scheme_follows_probability() {
        assert!(SegScheme::All.is_interior(Some(&leaf(0.9, -1))));
        assert!(!SegScheme::All.is_interior(Some(&leaf(0.1, 3))));
    }

    #[test]
    fn objects_scheme_requires_a_room() {
        assert!(!SegScheme::Objects.is_interior(Some(&leaf(0.9, -1))));
        assert!(SegScheme::Objects.is_interior(Some(&leaf(0.9, 0))));
        assert!(!SegScheme::Objects.is_interior(Some(&leaf(0.1, 0))));
    }

    #[test]
    fn room_scheme_absorbs_objects() {
        // A solid leaf inside a room (an object) counts interior.
        assert!(SegScheme::Room.is_interior(Some(&leaf(0.1, 2))));
        assert!(SegScheme::Room.is_interior(Some(&leaf(0.9, -1))));
        assert!(!SegScheme::Room.is_interior(Some(&leaf(0.1, -1))));
    }
}
