//! Terrain-specific resource caps.
//!
//! Every hex resource pool is clamped to `resource_cap(terrain, resource)`
//! on every mutation. A cap of zero means the terrain never holds that
//! resource. Ocean holds nothing and cannot be extracted.

use telluria_types::{ResourceKind, Terrain};

/// Maximum per-hex amount of a resource on a terrain.
#[must_use]
pub const fn resource_cap(terrain: Terrain, resource: ResourceKind) -> f64 {
    use ResourceKind as R;
    use Terrain as T;
    match (terrain, resource) {
        (T::Plains, R::Grain) => 100.0,
        (T::Plains, R::Herbs) => 20.0,
        (T::Plains, R::Timber) => 10.0,

        (T::Forest, R::Timber) => 90.0,
        (T::Forest, R::Furs) => 60.0,
        (T::Forest, R::Herbs) => 80.0,

        (T::Mountain, R::Stone) => 80.0,
        (T::Mountain, R::IronOre) => 60.0,
        (T::Mountain, R::Coal) => 50.0,
        (T::Mountain, R::Gems) => 15.0,

        (T::Coast, R::Fish) => 70.0,
        (T::Coast, R::Stone) => 20.0,

        (T::River, R::Fish) => 50.0,
        (T::River, R::Grain) => 60.0,
        (T::River, R::Herbs) => 30.0,

        (T::Desert, R::Gems) => 10.0,
        (T::Desert, R::Exotics) => 20.0,
        (T::Desert, R::Stone) => 30.0,

        (T::Swamp, R::Herbs) => 100.0,
        (T::Swamp, R::Exotics) => 15.0,
        (T::Swamp, R::Timber) => 30.0,

        (T::Tundra, R::Furs) => 70.0,
        (T::Tundra, R::Stone) => 30.0,

        _ => 0.0,
    }
}

/// Whether a terrain can hold any amount of a resource.
#[must_use]
pub const fn supports(terrain: Terrain, resource: ResourceKind) -> bool {
    resource_cap(terrain, resource) > 0.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn glossary_caps_hold() {
        assert!((resource_cap(Terrain::Plains, ResourceKind::Grain) - 100.0).abs() < f64::EPSILON);
        assert!((resource_cap(Terrain::Coast, ResourceKind::Fish) - 70.0).abs() < f64::EPSILON);
        assert!((resource_cap(Terrain::Forest, ResourceKind::Herbs) - 80.0).abs() < f64::EPSILON);
        assert!((resource_cap(Terrain::Mountain, ResourceKind::Stone) - 80.0).abs() < f64::EPSILON);
        assert!((resource_cap(Terrain::Mountain, ResourceKind::Gems) - 15.0).abs() < f64::EPSILON);
        assert!((resource_cap(Terrain::Swamp, ResourceKind::Herbs) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ocean_holds_nothing() {
        for resource in ResourceKind::ALL {
            assert!(!supports(Terrain::Ocean, resource));
        }
    }

    #[test]
    fn every_land_terrain_supports_something() {
        for terrain in [
            Terrain::Plains,
            Terrain::Forest,
            Terrain::Mountain,
            Terrain::Coast,
            Terrain::River,
            Terrain::Desert,
            Terrain::Swamp,
            Terrain::Tundra,
        ] {
            assert!(
                ResourceKind::ALL.iter().any(|r| supports(terrain, *r)),
                "{terrain:?} supports nothing"
            );
        }
    }
}
