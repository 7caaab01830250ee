//! Land health and resource regeneration.
//!
//! The land is a commons with a feedback loop: extraction chips health away,
//! fallow time restores it, and regeneration toward the terrain caps only
//! runs while health stays at or above `Agnosis`. Below that line the hex is
//! desertified -- it must first recover health before any resource returns.
//! Overworked hexes shed producers (perpetuation migration) who return to
//! healthier ground, which is what keeps the loop self-correcting.

use telluria_types::{AGNOSIS, ResourceKind, Season, Terrain, TICKS_PER_DAY};
use tracing::debug;

use crate::grid::HexMap;
use crate::terrain::resource_cap;

/// Health lost per extraction.
pub const EXTRACTION_HEALTH_LOSS: f64 = AGNOSIS * 0.001;

/// Health gained per week while fallow (not extracted in the last sim-day).
pub const FALLOW_HEALTH_GAIN: f64 = AGNOSIS * 0.05;

/// Health restored by a laborer tending the land during stone work.
pub const LABORER_HEALTH_GAIN: f64 = AGNOSIS * 0.002;

/// Weekly regeneration rate applied to each resource's deficit.
const REGEN_RATE: f64 = AGNOSIS * 0.4;

/// Seasonal scaling of regeneration.
#[must_use]
pub const fn seasonal_regen_factor(season: Season) -> f64 {
    match season {
        Season::Spring => 1.0 + AGNOSIS,
        Season::Summer => 1.0,
        Season::Autumn => 1.0 - AGNOSIS,
        Season::Winter => AGNOSIS,
    }
}

/// Run the weekly fallow-recovery and regeneration pass over the whole map.
///
/// Returns the number of hexes whose health improved.
pub fn weekly_recovery(map: &mut HexMap, tick: u64, season: Season) -> u32 {
    let mut recovered = 0u32;
    let factor = seasonal_regen_factor(season);

    for hex in map.iter_mut() {
        if hex.terrain == Terrain::Ocean {
            continue;
        }

        let fallow = tick.saturating_sub(hex.last_extracted_tick) >= TICKS_PER_DAY;
        if fallow && hex.health < 1.0 {
            hex.adjust_health(FALLOW_HEALTH_GAIN);
            recovered += 1;
        }

        // Desertified land regenerates nothing until health recovers.
        if hex.health < AGNOSIS {
            continue;
        }

        for kind in ResourceKind::ALL {
            let cap = resource_cap(hex.terrain, kind);
            if cap <= 0.0 {
                continue;
            }
            let deficit = (cap - hex.resources.get(kind)).max(0.0);
            if deficit > 0.0 {
                hex.resources
                    .add_capped(kind, deficit * REGEN_RATE * hex.health * factor, cap);
            }
        }
    }

    debug!(tick, recovered, "weekly fallow recovery");
    recovered
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::{AxialCoord, Hex};

    use super::*;

    fn one_hex_map(terrain: Terrain) -> HexMap {
        let mut map = HexMap::new(1);
        map.insert(Hex::pristine(AxialCoord::new(0, 0), terrain));
        map
    }

    #[test]
    fn fallow_hex_gains_health() {
        let mut map = one_hex_map(Terrain::Plains);
        map.get_mut(AxialCoord::new(0, 0)).unwrap().health = 0.5;

        weekly_recovery(&mut map, TICKS_PER_DAY * 10, Season::Summer);
        let health = map.get(AxialCoord::new(0, 0)).unwrap().health;
        assert!((health - (0.5 + FALLOW_HEALTH_GAIN)).abs() < 1e-12);
    }

    #[test]
    fn recently_worked_hex_does_not_recover() {
        let tick = TICKS_PER_DAY * 10;
        let mut map = one_hex_map(Terrain::Plains);
        {
            let hex = map.get_mut(AxialCoord::new(0, 0)).unwrap();
            hex.health = 0.5;
            hex.last_extracted_tick = tick - 10;
        }
        weekly_recovery(&mut map, tick, Season::Summer);
        let health = map.get(AxialCoord::new(0, 0)).unwrap().health;
        assert!((health - 0.5).abs() < 1e-12);
    }

    #[test]
    fn desertified_land_regenerates_no_resources() {
        let mut map = one_hex_map(Terrain::Plains);
        map.get_mut(AxialCoord::new(0, 0)).unwrap().health = AGNOSIS / 2.0;

        weekly_recovery(&mut map, TICKS_PER_DAY, Season::Summer);
        let grain = map
            .get(AxialCoord::new(0, 0))
            .unwrap()
            .resources
            .get(ResourceKind::Grain);
        assert!(grain.abs() < f64::EPSILON, "desertified hex grew grain");
    }

    #[test]
    fn healthy_land_regenerates_toward_cap() {
        let mut map = one_hex_map(Terrain::Plains);
        weekly_recovery(&mut map, TICKS_PER_DAY, Season::Summer);

        let grain = map
            .get(AxialCoord::new(0, 0))
            .unwrap()
            .resources
            .get(ResourceKind::Grain);
        // Full deficit (100) at full health: 100 · Agnosis·0.4 ≈ 9.44.
        assert!((grain - 100.0 * REGEN_RATE).abs() < 1e-9);
    }

    #[test]
    fn winter_regeneration_is_suppressed() {
        let mut summer = one_hex_map(Terrain::Plains);
        let mut winter = one_hex_map(Terrain::Plains);
        weekly_recovery(&mut summer, TICKS_PER_DAY, Season::Summer);
        weekly_recovery(&mut winter, TICKS_PER_DAY, Season::Winter);

        let get = |map: &HexMap| {
            map.get(AxialCoord::new(0, 0))
                .unwrap()
                .resources
                .get(ResourceKind::Grain)
        };
        assert!(get(&winter) < get(&summer));
    }

    #[test]
    fn fallow_recovery_accumulates_linearly() {
        // k weeks fallow: health ≥ min(1, initial + k · gain).
        let mut map = one_hex_map(Terrain::Plains);
        map.get_mut(AxialCoord::new(0, 0)).unwrap().health = 0.3;
        for week in 1..=8u64 {
            weekly_recovery(&mut map, TICKS_PER_DAY * 7 * week, Season::Summer);
            let health = map.get(AxialCoord::new(0, 0)).unwrap().health;
            let floor = (0.3 + week as f64 * FALLOW_HEALTH_GAIN).min(1.0);
            assert!(health >= floor - 1e-12, "week {week}: {health} < {floor}");
        }
    }
}
