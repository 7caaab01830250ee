//! Axial hex coordinates and the per-hex record.
//!
//! The map uses axial coordinates `(q, r)` on a pointy-top grid. Distances
//! and neighborhoods follow the standard cube-coordinate identities. The hex
//! record carries terrain, a fixed-size resource stock, land health, and the
//! optional owning settlement.

use serde::{Deserialize, Serialize};

use crate::constants::clamp01;
use crate::enums::{ResourceKind, Terrain};
use crate::ids::SettlementId;

/// The six axial direction offsets, counter-clockwise from east.
pub const HEX_DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Axial hex coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct AxialCoord {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
}

impl AxialCoord {
    /// Construct a coordinate.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The six adjacent coordinates.
    #[must_use]
    pub const fn neighbors(self) -> [Self; 6] {
        [
            Self::new(self.q + 1, self.r),
            Self::new(self.q + 1, self.r - 1),
            Self::new(self.q, self.r - 1),
            Self::new(self.q - 1, self.r),
            Self::new(self.q - 1, self.r + 1),
            Self::new(self.q, self.r + 1),
        ]
    }

    /// Hex distance to another coordinate (cube metric).
    #[must_use]
    pub const fn distance(self, other: Self) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.q + self.r - other.q - other.r).abs();
        let sum = dq + dr + ds;
        (sum / 2) as u32
    }

    /// Step `distance` hexes along one of the six directions.
    #[must_use]
    pub const fn offset(self, direction: usize, distance: i32) -> Self {
        let (dq, dr) = HEX_DIRECTIONS[direction % 6];
        Self::new(self.q + dq * distance, self.r + dr * distance)
    }

    /// Map an angle in radians onto one of the six hex directions.
    ///
    /// Used by the diaspora scan, which fans out along golden-angle
    /// multiples rather than the raw direction indices.
    #[must_use]
    pub fn direction_from_angle(angle: f64) -> usize {
        let sector = angle.rem_euclid(core::f64::consts::TAU) / (core::f64::consts::TAU / 6.0);
        (sector as usize) % 6
    }
}

impl core::fmt::Display for AxialCoord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

// ---------------------------------------------------------------------------
// Resource stock
// ---------------------------------------------------------------------------

/// Per-hex resource amounts, indexed by [`ResourceKind`].
///
/// Amounts are non-negative floats; callers clamp to the terrain cap when
/// adding. `take` never goes below zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceStock {
    amounts: [f64; ResourceKind::COUNT],
}

impl ResourceStock {
    /// An empty stock.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            amounts: [0.0; ResourceKind::COUNT],
        }
    }

    /// Current amount of a resource.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.amounts[kind.index()]
    }

    /// Set the amount of a resource, clamped to `[0, cap]`.
    pub fn set_clamped(&mut self, kind: ResourceKind, amount: f64, cap: f64) {
        self.amounts[kind.index()] = amount.clamp(0.0, cap.max(0.0));
    }

    /// Add toward a cap; returns the amount actually added.
    pub fn add_capped(&mut self, kind: ResourceKind, amount: f64, cap: f64) -> f64 {
        let slot = &mut self.amounts[kind.index()];
        let headroom = (cap - *slot).max(0.0);
        let added = amount.max(0.0).min(headroom);
        *slot += added;
        added
    }

    /// Remove up to `amount`; returns the amount actually removed.
    pub fn take(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        let slot = &mut self.amounts[kind.index()];
        let taken = amount.max(0.0).min(*slot);
        *slot -= taken;
        taken
    }
}

// ---------------------------------------------------------------------------
// Hex
// ---------------------------------------------------------------------------

/// One hex of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hex {
    /// The hex's coordinate.
    pub coord: AxialCoord,
    /// Terrain, fixed at generation.
    pub terrain: Terrain,
    /// Extractable resource pools.
    pub resources: ResourceStock,
    /// Land health in `[0, 1]`; 1 is pristine. Below `Agnosis`, regeneration
    /// suspends (desertification).
    pub health: f64,
    /// Tick of the most recent extraction.
    pub last_extracted_tick: u64,
    /// Settlement standing on this hex, if any.
    pub settlement: Option<SettlementId>,
}

impl Hex {
    /// A pristine hex with no resources seeded yet.
    #[must_use]
    pub const fn pristine(coord: AxialCoord, terrain: Terrain) -> Self {
        Self {
            coord,
            terrain,
            resources: ResourceStock::empty(),
            health: 1.0,
            last_extracted_tick: 0,
            settlement: None,
        }
    }

    /// Adjust health, clamped into `[0, 1]`.
    pub fn adjust_health(&mut self, delta: f64) {
        self.health = clamp01(self.health + delta);
    }
}
