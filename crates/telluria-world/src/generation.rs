//! One-shot world generation.
//!
//! This is the only place the `rand` crate is allowed: a seeded [`StdRng`]
//! drawn in strict coordinate order, so the same seed always produces the
//! same map. Once the world exists, all randomness is stable hashing.
//!
//! The map is a hex disc of the configured radius: an ocean rim, a mostly
//! coastal ring inside it, and a weighted interior mix. Resource pools are
//! seeded between `Psyche` and full cap of each terrain's resources.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use telluria_types::{AxialCoord, Hex, ResourceKind, Terrain, PSYCHE};
use tracing::info;

use crate::grid::HexMap;
use crate::terrain::resource_cap;

/// Interior terrain mix as `(terrain, weight)` pairs.
const INTERIOR_WEIGHTS: [(Terrain, u32); 7] = [
    (Terrain::Plains, 28),
    (Terrain::Forest, 22),
    (Terrain::Mountain, 14),
    (Terrain::River, 9),
    (Terrain::Desert, 8),
    (Terrain::Swamp, 8),
    (Terrain::Tundra, 11),
];

/// Generate the world map for a seed and radius.
#[must_use]
pub fn generate_world(seed: u64, radius: i32) -> HexMap {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut map = HexMap::new(radius);
    let center = AxialCoord::new(0, 0);

    for q in -radius..=radius {
        let r_min = (-radius).max(-q - radius);
        let r_max = radius.min(-q + radius);
        for r in r_min..=r_max {
            let coord = AxialCoord::new(q, r);
            let distance = center.distance(coord) as i32;

            let terrain = if distance >= radius {
                Terrain::Ocean
            } else if distance == radius - 1 {
                if rng.random_range(0..100u32) < 60 {
                    Terrain::Coast
                } else {
                    pick_interior(&mut rng)
                }
            } else {
                pick_interior(&mut rng)
            };

            let mut hex = Hex::pristine(coord, terrain);
            for kind in ResourceKind::ALL {
                let cap = resource_cap(terrain, kind);
                if cap > 0.0 {
                    let fill = PSYCHE + rng.random_range(0.0..1.0) * (1.0 - PSYCHE);
                    hex.resources.add_capped(kind, cap * fill, cap);
                }
            }
            map.insert(hex);
        }
    }

    info!(seed, radius, hexes = map.len(), "world generated");
    map
}

/// Whether a hex can host a settlement.
#[must_use]
pub fn habitable(hex: &Hex) -> bool {
    hex.terrain.is_passable() && hex.terrain != Terrain::Desert && hex.settlement.is_none()
}

/// Draw an interior terrain from the weighted mix.
fn pick_interior(rng: &mut StdRng) -> Terrain {
    let total: u32 = INTERIOR_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.random_range(0..total);
    for (terrain, weight) in INTERIOR_WEIGHTS {
        if roll < weight {
            return terrain;
        }
        roll -= weight;
    }
    Terrain::Plains
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_world() {
        let a = generate_world(99, 6);
        let b = generate_world(99, 6);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate_world(1, 6);
        let b = generate_world(2, 6);
        assert_ne!(a, b);
    }

    #[test]
    fn disc_has_expected_size() {
        let radius = 5i64;
        let map = generate_world(7, radius as i32);
        let expected = 3 * radius * (radius + 1) + 1;
        assert_eq!(map.len() as i64, expected);
    }

    #[test]
    fn rim_is_ocean() {
        let map = generate_world(13, 6);
        let center = AxialCoord::new(0, 0);
        for hex in map.iter() {
            if center.distance(hex.coord) >= 6 {
                assert_eq!(hex.terrain, Terrain::Ocean, "rim hex {} not ocean", hex.coord);
            }
        }
    }

    #[test]
    fn resources_start_within_caps() {
        let map = generate_world(21, 6);
        for hex in map.iter() {
            for kind in ResourceKind::ALL {
                let amount = hex.resources.get(kind);
                let cap = resource_cap(hex.terrain, kind);
                assert!(amount >= 0.0 && amount <= cap, "{} {kind:?}: {amount}", hex.coord);
            }
        }
    }

    #[test]
    fn interior_is_habitable_somewhere() {
        let map = generate_world(5, 8);
        assert!(map.iter().any(habitable));
    }
}
