//! The crown conservation audit.
//!
//! `Σ agent wealth + Σ settlement treasury + Σ faction treasury` is constant
//! under steady-state simulation (births add zero-wealth agents; only
//! external snapshot/restore boundaries may change it). The integration
//! suite asserts this across mixed activity windows.

use std::collections::BTreeMap;

use telluria_types::{Agent, AgentId, Faction, FactionId, Settlement, SettlementId};

/// Total crowns in the world, across every account.
///
/// Dead agents are included: inheritance zeroes them, so they contribute
/// nothing -- but counting them means a missed inheritance shows up as a
/// conservation failure rather than a silent leak.
#[must_use]
pub fn total_crowns(
    agents: &BTreeMap<AgentId, Agent>,
    settlements: &BTreeMap<SettlementId, Settlement>,
    factions: &BTreeMap<FactionId, Faction>,
) -> u64 {
    let agent_sum: u64 = agents.values().map(|a| a.wealth).sum();
    let settlement_sum: u64 = settlements.values().map(|s| s.treasury).sum();
    let faction_sum: u64 = factions.values().map(|f| f.treasury).sum();
    agent_sum + settlement_sum + faction_sum
}
