//! Read-only observation models.
//!
//! These are the DTOs the external HTTP layer serves. Everything here is a
//! pure function over `&WorldState`; readers hold the shared side of the
//! world lock while calling them and serialize the results after releasing
//! it.

use serde::Serialize;
use telluria_types::{
    AgentId, DailyStats, Event, EventCategory, GoodKind, Governance, NeedsState, Occupation,
    ResourceKind, SettlementId, Soul, WellbeingState,
};

use crate::state::WorldState;
use crate::stats::{collect_daily_stats, world_crowns};

/// Top-level world status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldStatus {
    /// Current tick.
    pub tick: u64,
    /// Current sim-day.
    pub day: u64,
    /// Current season.
    pub season: telluria_types::Season,
    /// Live agents.
    pub population: u32,
    /// Total crowns across every account.
    pub total_crowns: u64,
    /// Active settlements.
    pub settlements: u32,
    /// Today's full statistics row.
    pub stats: DailyStats,
}

/// Per-settlement detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementDetail {
    /// Settlement id.
    pub id: SettlementId,
    /// Name.
    pub name: String,
    /// Live population.
    pub population: u32,
    /// Governance form.
    pub governance: Governance,
    /// Governance legitimacy.
    pub governance_score: f64,
    /// Tax rate.
    pub tax_rate: f64,
    /// Treasury in crowns.
    pub treasury: u64,
    /// Road, wall, and market levels.
    pub infrastructure: (u8, u8, u8),
    /// Current leader, if seated.
    pub leader: Option<AgentId>,
    /// Per-good market prices.
    pub prices: Vec<(GoodKind, f64)>,
    /// Cumulative units traded here.
    pub trade_volume: u64,
    /// Whether the settlement is flagged non-viable.
    pub non_viable: bool,
}

/// Per-agent detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentDetail {
    /// Agent id.
    pub id: AgentId,
    /// Name.
    pub name: String,
    /// Age in sim-years.
    pub age: u32,
    /// Occupation.
    pub occupation: Occupation,
    /// Home settlement.
    pub home: Option<SettlementId>,
    /// Wealth in crowns.
    pub wealth: u64,
    /// The needs vector.
    pub needs: NeedsState,
    /// The wellbeing register.
    pub wellbeing: WellbeingState,
    /// The soul record.
    pub soul: Soul,
    /// Whether the agent lives.
    pub alive: bool,
    /// Relationship count.
    pub relationships: usize,
}

/// One hex of the bulk map dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapHex {
    /// Column.
    pub q: i32,
    /// Row.
    pub r: i32,
    /// Terrain.
    pub terrain: telluria_types::Terrain,
    /// Non-zero resource pools.
    pub resources: Vec<(ResourceKind, f64)>,
    /// Land health.
    pub health: f64,
    /// Owning settlement, if any.
    pub settlement: Option<SettlementId>,
}

/// Compact faction state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactionSummary {
    /// Faction id.
    pub id: telluria_types::FactionId,
    /// Name.
    pub name: String,
    /// Treasury in crowns.
    pub treasury: u64,
    /// Live member count.
    pub members: u32,
    /// Influence per settlement.
    pub influence: Vec<(SettlementId, f64)>,
}

/// Build the world status view.
#[must_use]
pub fn world_status(state: &WorldState) -> WorldStatus {
    WorldStatus {
        tick: state.clock.tick(),
        day: state.clock.sim_day(),
        season: state.clock.season(),
        population: state.live_population(),
        total_crowns: world_crowns(state),
        settlements: state.settlements.values().filter(|s| s.is_active()).count() as u32,
        stats: collect_daily_stats(state),
    }
}

/// Build one settlement's detail view.
#[must_use]
pub fn settlement_detail(state: &WorldState, id: SettlementId) -> Option<SettlementDetail> {
    let settlement = state.settlements.get(&id)?;
    Some(SettlementDetail {
        id,
        name: settlement.name.clone(),
        population: settlement.population,
        governance: settlement.governance,
        governance_score: settlement.governance_score,
        tax_rate: settlement.tax_rate,
        treasury: settlement.treasury,
        infrastructure: (
            settlement.road_level,
            settlement.wall_level,
            settlement.market_level,
        ),
        leader: settlement.leader,
        prices: settlement
            .market
            .iter()
            .map(|(good, entry)| (good, entry.price))
            .collect(),
        trade_volume: settlement
            .market
            .iter()
            .map(|(_, entry)| entry.trade_count)
            .sum(),
        non_viable: settlement.non_viable,
    })
}

/// Build one agent's detail view.
#[must_use]
pub fn agent_detail(state: &WorldState, id: AgentId) -> Option<AgentDetail> {
    let agent = state.agents.get(&id)?;
    Some(AgentDetail {
        id,
        name: agent.name.clone(),
        age: agent.age,
        occupation: agent.occupation,
        home: agent.home,
        wealth: agent.wealth,
        needs: agent.needs,
        wellbeing: agent.wellbeing,
        soul: agent.soul,
        alive: agent.alive,
        relationships: agent.relationships.len(),
    })
}

/// Recent events, newest first, with optional category and settlement
/// filters.
#[must_use]
pub fn recent_events(
    state: &WorldState,
    category: Option<EventCategory>,
    settlement: Option<SettlementId>,
    limit: usize,
) -> Vec<Event> {
    let settlement_key = settlement.map(|id| id.to_string());
    state
        .events()
        .rev()
        .filter(|event| category.is_none_or(|c| event.category == c))
        .filter(|event| {
            settlement_key
                .as_ref()
                .is_none_or(|key| event.meta.get("settlement") == Some(key))
        })
        .take(limit)
        .cloned()
        .collect()
}

/// Statistics rows within an inclusive day range.
#[must_use]
pub fn stats_range(state: &WorldState, from_day: u64, to_day: u64) -> Vec<DailyStats> {
    state
        .stats_history
        .iter()
        .filter(|row| row.day >= from_day && row.day <= to_day)
        .cloned()
        .collect()
}

/// The bulk map dump.
#[must_use]
pub fn bulk_map(state: &WorldState) -> Vec<MapHex> {
    state
        .map
        .iter()
        .map(|hex| MapHex {
            q: hex.coord.q,
            r: hex.coord.r,
            terrain: hex.terrain,
            resources: ResourceKind::ALL
                .iter()
                .map(|kind| (*kind, hex.resources.get(*kind)))
                .filter(|(_, amount)| *amount > 0.0)
                .collect(),
            health: hex.health,
            settlement: hex.settlement,
        })
        .collect()
}

/// All faction summaries.
#[must_use]
pub fn faction_summaries(state: &WorldState) -> Vec<FactionSummary> {
    state
        .factions
        .values()
        .map(|faction| {
            let members = state
                .agents
                .values()
                .filter(|a| a.alive && a.faction == Some(faction.id))
                .count() as u32;
            FactionSummary {
                id: faction.id,
                name: faction.name.clone(),
                treasury: faction.treasury,
                members,
                influence: faction
                    .influence
                    .iter()
                    .map(|(settlement, value)| (*settlement, *value))
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::{
        AxialCoord, CognitionTier, Governance, Settlement, Sex,
    };
    use telluria_world::generate_world;

    use super::*;
    use crate::state::AgentSeed;

    fn observed_world() -> (WorldState, SettlementId, AgentId) {
        let mut world = WorldState::new(5, generate_world(5, 3));
        let sid = world.allocate_settlement_id();
        world.settlements.insert(
            sid,
            Settlement::found(
                sid,
                String::from("Harrowgate"),
                AxialCoord::new(0, 0),
                Governance::Council,
                0,
            ),
        );
        let id = world.create_agent(AgentSeed {
            name: String::from("Orin"),
            sex: Sex::Male,
            age: 30,
            position: AxialCoord::new(0, 0),
            home: Some(sid),
            occupation: Occupation::Farmer,
            tier: CognitionTier::Tier0,
            born_tick: 0,
        });
        world.rebuild_member_index();
        (world, sid, id)
    }

    #[test]
    fn status_and_details_serialize() {
        let (world, sid, id) = observed_world();

        let status = world_status(&world);
        assert_eq!(status.population, 1);
        assert!(serde_json::to_string(&status).is_ok());

        let settlement = settlement_detail(&world, sid).unwrap();
        assert_eq!(settlement.name, "Harrowgate");
        assert_eq!(settlement.prices.len(), GoodKind::COUNT);

        let agent = agent_detail(&world, id).unwrap();
        assert_eq!(agent.name, "Orin");
        assert!(agent_detail(&world, AgentId::new(999)).is_none());
    }

    #[test]
    fn event_filters_apply() {
        let (mut world, sid, _) = observed_world();
        world.emit(
            Event::new(1, EventCategory::Political, "a coronation").with("settlement", sid),
        );
        world.emit(Event::new(2, EventCategory::Economic, "a trade"));

        let political = recent_events(&world, Some(EventCategory::Political), None, 10);
        assert_eq!(political.len(), 1);

        let here = recent_events(&world, None, Some(sid), 10);
        assert_eq!(here.len(), 1);

        let all = recent_events(&world, None, None, 10);
        assert_eq!(all.len(), 2);
        // Newest first.
        assert_eq!(all[0].tick, 2);
    }

    #[test]
    fn bulk_map_covers_every_hex() {
        let (world, _, _) = observed_world();
        assert_eq!(bulk_map(&world).len(), world.map.len());
    }
}
