//! The hex map: storage, neighborhoods, and greedy travel costs.
//!
//! The map is a `BTreeMap` keyed by [`AxialCoord`] so iteration order is
//! deterministic -- the tick engine walks hexes in coordinate order and two
//! replicas must walk them identically.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use telluria_types::{AxialCoord, Hex, TICKS_PER_HOUR};

use crate::error::WorldError;

/// Ticks of travel per unit of terrain movement cost.
pub const TICKS_PER_STEP: u64 = TICKS_PER_HOUR;

/// The world's hex grid.
///
/// `hexes` is serialized as a `Vec<Hex>` (each hex already carries its own
/// `coord`) rather than as a map, since `AxialCoord` is a struct and JSON
/// object keys must be strings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HexMap {
    radius: i32,
    #[serde(serialize_with = "serialize_hexes", deserialize_with = "deserialize_hexes")]
    hexes: BTreeMap<AxialCoord, Hex>,
}

fn serialize_hexes<S>(hexes: &BTreeMap<AxialCoord, Hex>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    hexes.values().collect::<Vec<_>>().serialize(serializer)
}

fn deserialize_hexes<'de, D>(deserializer: D) -> Result<BTreeMap<AxialCoord, Hex>, D::Error>
where
    D: Deserializer<'de>,
{
    let hexes = Vec::<Hex>::deserialize(deserializer)?;
    Ok(hexes.into_iter().map(|hex| (hex.coord, hex)).collect())
}

impl HexMap {
    /// An empty map with the given nominal radius.
    #[must_use]
    pub const fn new(radius: i32) -> Self {
        Self {
            radius,
            hexes: BTreeMap::new(),
        }
    }

    /// The nominal radius used at generation.
    #[must_use]
    pub const fn radius(&self) -> i32 {
        self.radius
    }

    /// Number of hexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hexes.len()
    }

    /// Whether the map holds no hexes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hexes.is_empty()
    }

    /// Insert (or replace) a hex.
    pub fn insert(&mut self, hex: Hex) {
        self.hexes.insert(hex.coord, hex);
    }

    /// The hex at a coordinate.
    #[must_use]
    pub fn get(&self, coord: AxialCoord) -> Option<&Hex> {
        self.hexes.get(&coord)
    }

    /// Mutable hex at a coordinate.
    pub fn get_mut(&mut self, coord: AxialCoord) -> Option<&mut Hex> {
        self.hexes.get_mut(&coord)
    }

    /// The hex at a coordinate, or an error for callers that require it.
    pub fn require(&self, coord: AxialCoord) -> Result<&Hex, WorldError> {
        self.hexes.get(&coord).ok_or(WorldError::UnknownHex { coord })
    }

    /// Iterate hexes in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = &Hex> {
        self.hexes.values()
    }

    /// Iterate hexes mutably in coordinate order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Hex> {
        self.hexes.values_mut()
    }

    /// Existing neighbor coordinates of a hex.
    #[must_use]
    pub fn neighbors(&self, coord: AxialCoord) -> Vec<AxialCoord> {
        coord
            .neighbors()
            .into_iter()
            .filter(|c| self.hexes.contains_key(c))
            .collect()
    }

    /// The hex itself plus its existing neighbors -- a settlement's working
    /// neighborhood of up to seven hexes.
    #[must_use]
    pub fn neighborhood(&self, coord: AxialCoord) -> Vec<AxialCoord> {
        let mut out = Vec::with_capacity(7);
        if self.hexes.contains_key(&coord) {
            out.push(coord);
        }
        out.extend(self.neighbors(coord));
        out
    }

    /// Whether agents can stand on the hex at `coord`.
    #[must_use]
    pub fn passable(&self, coord: AxialCoord) -> bool {
        self.get(coord).is_some_and(|hex| hex.terrain.is_passable())
    }

    /// Greedy travel time in ticks between two coordinates.
    ///
    /// Walks step by step, always taking the passable neighbor closest to
    /// the goal, summing terrain movement costs times [`TICKS_PER_STEP`].
    /// Returns `None` when the walk gets stuck (surrounded by ocean) or the
    /// endpoints are off-map. The greedy path is not optimal, which is the
    /// intent -- merchants travel plausible roads, not perfect ones.
    #[must_use]
    pub fn travel_ticks(&self, from: AxialCoord, to: AxialCoord) -> Option<u64> {
        if from == to {
            return Some(0);
        }
        if self.get(from).is_none() || !self.passable(to) {
            return None;
        }

        let mut here = from;
        let mut total: u64 = 0;
        let step_budget = from.distance(to).saturating_mul(3).max(6);

        for _ in 0..step_budget {
            let next = here
                .neighbors()
                .into_iter()
                .filter(|c| self.passable(*c))
                .min_by_key(|c| (c.distance(to), c.q, c.r))?;
            // Greedy walks never step away from the goal.
            if next.distance(to) >= here.distance(to) {
                return None;
            }
            let cost = self
                .get(next)
                .and_then(|hex| hex.terrain.movement_cost())
                .map(u64::from)?;
            total = total.saturating_add(cost.saturating_mul(TICKS_PER_STEP));
            here = next;
            if here == to {
                return Some(total);
            }
        }
        None
    }
}
