//! Daily statistics snapshots.
//!
//! One [`DailyStats`] row is appended per sim-day; the persistence bridge
//! stores them append-only and the observation surface serves range queries
//! over them.

use serde::{Deserialize, Serialize};

use crate::enums::Occupation;

/// Per-occupation roll-up within a daily snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OccupationStat {
    /// The occupation.
    pub occupation: Occupation,
    /// Live agents in the occupation.
    pub count: u32,
    /// Mean satisfaction across them.
    pub mean_satisfaction: f64,
}

/// One day's world statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    /// Sim-day index.
    pub day: u64,
    /// Tick at which the snapshot was taken.
    pub tick: u64,
    /// Live agents.
    pub population: u32,
    /// Sum of live-agent wealth in crowns.
    pub agent_wealth: u64,
    /// Sum of settlement treasuries in crowns.
    pub settlement_treasury: u64,
    /// Sum of faction treasuries in crowns.
    pub faction_treasury: u64,
    /// Cumulative births since world creation.
    pub births: u64,
    /// Cumulative deaths since world creation.
    pub deaths: u64,
    /// Cumulative units traded across all markets.
    pub trade_volume: u64,
    /// Producers who worked successfully within the last sim-day.
    pub producers_working: u32,
    /// Producers who did not.
    pub producers_idle: u32,
    /// Per-occupation breakdown.
    pub occupations: Vec<OccupationStat>,
}

impl DailyStats {
    /// Total crowns across agents, settlements, and factions.
    #[must_use]
    pub const fn total_crowns(&self) -> u64 {
        self.agent_wealth + self.settlement_treasury + self.faction_treasury
    }
}
