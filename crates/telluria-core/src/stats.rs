//! Daily statistics collection.

use std::collections::BTreeMap;

use telluria_economy::total_crowns;
use telluria_types::{DailyStats, Occupation, OccupationStat, TICKS_PER_DAY};

use crate::state::WorldState;

/// Collect one day's statistics snapshot.
#[must_use]
pub fn collect_daily_stats(state: &WorldState) -> DailyStats {
    let tick = state.clock.tick();
    let day = state.clock.sim_day();

    let mut occupation_counts: BTreeMap<Occupation, (u32, f64)> = BTreeMap::new();
    let mut producers_working = 0u32;
    let mut producers_idle = 0u32;
    let mut agent_wealth = 0u64;

    for agent in state.agents.values().filter(|a| a.alive) {
        agent_wealth += agent.wealth;
        let entry = occupation_counts.entry(agent.occupation).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += agent.wellbeing.satisfaction;

        if agent.is_producer() {
            if tick.saturating_sub(agent.last_work_tick) <= TICKS_PER_DAY {
                producers_working += 1;
            } else {
                producers_idle += 1;
            }
        }
    }

    let occupations = occupation_counts
        .into_iter()
        .map(|(occupation, (count, satisfaction_sum))| OccupationStat {
            occupation,
            count,
            mean_satisfaction: satisfaction_sum / f64::from(count.max(1)),
        })
        .collect();

    let settlement_treasury: u64 = state.settlements.values().map(|s| s.treasury).sum();
    let faction_treasury: u64 = state.factions.values().map(|f| f.treasury).sum();

    DailyStats {
        day,
        tick,
        population: state.live_population(),
        agent_wealth,
        settlement_treasury,
        faction_treasury,
        births: state.counters.births,
        deaths: state.counters.deaths,
        trade_volume: state.counters.trade_volume,
        producers_working,
        producers_idle,
        occupations,
    }
}

/// The conservation aggregate over the whole world.
#[must_use]
pub fn world_crowns(state: &WorldState) -> u64 {
    total_crowns(&state.agents, &state.settlements, &state.factions)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::{
        AxialCoord, CognitionTier, Governance, Settlement, Sex,
    };
    use telluria_world::HexMap;

    use super::*;
    use crate::state::AgentSeed;

    #[test]
    fn stats_count_the_living_and_their_crowns() {
        let mut world = WorldState::new(3, HexMap::new(2));
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
        world.settlements.get_mut(&sid).unwrap().treasury = 100;

        for occupation in [Occupation::Farmer, Occupation::Farmer, Occupation::Scholar] {
            let id = world.create_agent(AgentSeed {
                name: String::from("A"),
                sex: Sex::Male,
                age: 30,
                position: AxialCoord::new(0, 0),
                home: Some(sid),
                occupation,
                tier: CognitionTier::Tier0,
                born_tick: 0,
            });
            world.agents.get_mut(&id).unwrap().wealth = 10;
        }
        world.rebuild_member_index();

        let stats = collect_daily_stats(&world);
        assert_eq!(stats.population, 3);
        assert_eq!(stats.agent_wealth, 30);
        assert_eq!(stats.settlement_treasury, 100);
        assert_eq!(stats.total_crowns(), 130);
        assert_eq!(world_crowns(&world), 130);

        let farmers = stats
            .occupations
            .iter()
            .find(|o| o.occupation == Occupation::Farmer)
            .unwrap();
        assert_eq!(farmers.count, 2);
        // Fresh farmers worked "today" (last_work_tick == born tick == now).
        assert_eq!(stats.producers_working, 2);
        assert_eq!(stats.producers_idle, 0);
    }
}
