//! The daily crime pass.
//!
//! Desperate agents -- survival or safety critically low, coherence under
//! `Matter` -- may steal food or crowns from a stable-hashed settlement-mate.
//! Deterrence scales with the settlement's fiscal health and governance
//! legitimacy, amplified by its soldier fraction. A caught thief becomes an
//! outlaw, pays an `Agnosis` fine into the treasury, and takes a mood hit.
//! Stealing from one's own faction gets the thief expelled either way.

use std::collections::BTreeMap;

use telluria_types::{
    chance, stable_hash, Agent, AgentId, Event, EventCategory, Need, Occupation, Settlement,
    SocialRole, AGNOSIS, BEING, MATTER, PSYCHE, TICKS_PER_DAY,
};
use tracing::debug;

/// Survival level below which theft becomes thinkable.
pub const THEFT_SURVIVAL_THRESHOLD: f64 = 0.3;

/// Safety level below which theft becomes thinkable.
pub const THEFT_SAFETY_THRESHOLD: f64 = 0.2;

/// Probability an eligible agent attempts theft on a given day.
pub const THEFT_PROPENSITY: f64 = PSYCHE;

/// Food units taken in a successful food theft.
pub const FOOD_THEFT_UNITS: u32 = 2;

/// Esteem lost on being caught.
const CAUGHT_ESTEEM_LOSS: f64 = PSYCHE * 0.2;

/// Belonging lost on being caught.
const CAUGHT_BELONGING_LOSS: f64 = PSYCHE * 0.1;

/// Outcome counts from one settlement's daily crime pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrimeStats {
    /// Successful thefts.
    pub thefts: u32,
    /// Attempts that ended in a catch.
    pub caught: u32,
}

/// Probability a theft attempt is caught in this settlement.
///
/// `treasury/population` funds watchmen, legitimacy makes neighbors talk,
/// and the soldier fraction multiplies both.
#[must_use]
pub fn catch_probability(settlement: &Settlement, soldier_ratio: f64) -> f64 {
    let population = f64::from(settlement.population.max(1));
    let fiscal = (settlement.treasury as f64 / (population * 100.0)).min(1.0);
    let deterrence = fiscal
        * settlement.governance_score
        * (1.0 + soldier_ratio * BEING * 10.0);
    (deterrence * MATTER).clamp(0.05, 0.95)
}

/// Whether an agent is desperate enough to steal.
#[must_use]
pub fn is_theft_eligible(agent: &Agent) -> bool {
    agent.alive
        && (agent.needs.survival < THEFT_SURVIVAL_THRESHOLD
            || agent.needs.safety < THEFT_SAFETY_THRESHOLD)
        && agent.soul.coherence < MATTER
}

/// Run the daily crime pass for one settlement's members.
pub fn run_daily_crime(
    agents: &mut BTreeMap<AgentId, Agent>,
    members: &[AgentId],
    settlement: &mut Settlement,
    tick: u64,
    events: &mut Vec<Event>,
) -> CrimeStats {
    let day = tick / TICKS_PER_DAY;
    let mut stats = CrimeStats::default();
    if members.len() < 2 {
        return stats;
    }

    let soldiers = members
        .iter()
        .filter(|id| {
            agents
                .get(*id)
                .is_some_and(|a| a.alive && a.occupation == Occupation::Soldier)
        })
        .count();
    let soldier_ratio = soldiers as f64 / members.len() as f64;
    let catch_p = catch_probability(settlement, soldier_ratio);

    for &thief_id in members {
        let Some(thief) = agents.get(&thief_id) else {
            continue;
        };
        if !is_theft_eligible(thief) {
            continue;
        }
        let thief_faction = thief.faction;

        let roll = stable_hash(&[thief_id.raw(), day, 0xC413]);
        if !chance(roll, THEFT_PROPENSITY) {
            continue;
        }

        // Stable-hashed victim; skip degenerate picks.
        let victim_roll = stable_hash(&[thief_id.raw(), day, 0xC414]);
        let victim_id = members[(victim_roll as usize) % members.len()];
        if victim_id == thief_id {
            continue;
        }
        let Some(victim) = agents.get(&victim_id) else {
            continue;
        };
        if !victim.alive {
            continue;
        }
        let victim_faction = victim.faction;
        let victim_food = victim.inventory.best_food();
        let victim_wealth = victim.wealth;

        let same_faction =
            thief_faction.is_some() && thief_faction == victim_faction;

        if chance(stable_hash(&[thief_id.raw(), day, 0xC415]), catch_p) {
            stats.caught += 1;
            if let Some(thief) = agents.get_mut(&thief_id) {
                thief.role = SocialRole::Outlaw;
                let fine = (thief.wealth as f64 * AGNOSIS).floor() as u64;
                let fine = fine.min(thief.wealth);
                thief.wealth -= fine;
                settlement.treasury = settlement.treasury.saturating_add(fine);
                thief.needs.adjust(Need::Esteem, -CAUGHT_ESTEEM_LOSS);
                thief.needs.adjust(Need::Belonging, -CAUGHT_BELONGING_LOSS);
                if same_faction {
                    thief.faction = None;
                }
                thief.remember(tick, "caught stealing and branded an outlaw", 0.9);
                events.push(
                    Event::new(tick, EventCategory::Social, "a thief was caught")
                        .with("agent", thief_id)
                        .with("settlement", settlement.id)
                        .with("fine", fine),
                );
            }
            continue;
        }

        // The theft itself: food first, crowns if the pantry is bare.
        let mut stolen_good = None;
        let mut stolen_crowns = 0u64;
        if let Some(victim) = agents.get_mut(&victim_id) {
            if let Some(good) = victim_food {
                let taken = victim.inventory.take(good, FOOD_THEFT_UNITS);
                stolen_good = Some((good, taken));
            } else if victim_wealth > 0 {
                stolen_crowns = ((victim_wealth as f64 * AGNOSIS).floor() as u64)
                    .clamp(1, victim_wealth);
                victim.wealth -= stolen_crowns;
            }
            victim.needs.adjust(Need::Safety, -CAUGHT_BELONGING_LOSS);
            victim.note_relationship(thief_id, -0.1, -0.05);
        }
        if stolen_good.is_none() && stolen_crowns == 0 {
            continue;
        }
        stats.thefts += 1;

        if let Some(thief) = agents.get_mut(&thief_id) {
            if let Some((good, units)) = stolen_good {
                thief.inventory.add(good, units);
            }
            thief.wealth = thief.wealth.saturating_add(stolen_crowns);
            if same_faction {
                thief.faction = None;
            }
            thief.remember(tick, "stole to get by", 0.6);
        }
        events.push(
            Event::new(tick, EventCategory::Social, "a theft in the night")
                .with("agent", thief_id)
                .with("victim", victim_id)
                .with("settlement", settlement.id),
        );
    }

    debug!(
        settlement = %settlement.id,
        thefts = stats.thefts,
        caught = stats.caught,
        "daily crime pass"
    );
    stats
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::{
        AxialCoord, CognitionTier, Governance, Inventory, NeedsState, Sex, Skills, SettlementId,
        Soul, SoulClass, WellbeingState,
    };

    use super::*;

    fn test_agent(id: u64) -> Agent {
        Agent {
            id: AgentId::new(id),
            name: String::from("Test"),
            sex: Sex::Male,
            age: 25,
            health: 1.0,
            position: AxialCoord::new(0, 0),
            home: Some(SettlementId::new(1)),
            occupation: Occupation::Farmer,
            tier: CognitionTier::Tier0,
            role: SocialRole::Commoner,
            wealth: 50,
            inventory: Inventory::empty(),
            needs: NeedsState::default(),
            wellbeing: WellbeingState::default(),
            soul: Soul::new(SoulClass::Seeker, 0.2),
            skills: Skills::default(),
            memories: Vec::new(),
            relationships: Vec::new(),
            faction: None,
            last_work_tick: 0,
            trade: None,
            alive: true,
            born_tick: 0,
        }
    }

    fn test_settlement() -> Settlement {
        let mut s = Settlement::found(
            SettlementId::new(1),
            String::from("Harrowgate"),
            AxialCoord::new(0, 0),
            Governance::Council,
            0,
        );
        s.population = 2;
        s
    }

    #[test]
    fn contented_agents_do_not_steal() {
        let mut agents = BTreeMap::new();
        agents.insert(AgentId::new(1), test_agent(1));
        agents.insert(AgentId::new(2), test_agent(2));
        let members = [AgentId::new(1), AgentId::new(2)];
        let mut settlement = test_settlement();
        let mut events = Vec::new();

        let stats = run_daily_crime(&mut agents, &members, &mut settlement, 1440, &mut events);
        assert_eq!(stats, CrimeStats::default());
        assert!(events.is_empty());
    }

    #[test]
    fn desperation_eventually_produces_theft() {
        let mut agents = BTreeMap::new();
        let mut thief = test_agent(1);
        thief.needs.survival = 0.1;
        thief.wealth = 0;
        agents.insert(AgentId::new(1), thief);
        let mut victim = test_agent(2);
        victim.inventory.add(telluria_types::GoodKind::Grain, 10);
        agents.insert(AgentId::new(2), victim);

        let members = [AgentId::new(1), AgentId::new(2)];
        let mut settlement = test_settlement();
        settlement.treasury = 0; // no watchmen
        let mut events = Vec::new();

        let mut total = CrimeStats::default();
        for day in 0..60u64 {
            // Keep the thief desperate across days.
            agents.get_mut(&AgentId::new(1)).unwrap().needs.survival = 0.1;
            let stats = run_daily_crime(
                &mut agents,
                &members,
                &mut settlement,
                day * TICKS_PER_DAY,
                &mut events,
            );
            total.thefts += stats.thefts;
            total.caught += stats.caught;
        }
        assert!(total.thefts + total.caught > 0, "no crime in 60 desperate days");
    }

    #[test]
    fn catch_probability_rises_with_soldiers() {
        let mut settlement = test_settlement();
        settlement.population = 100;
        settlement.treasury = 10_000;
        let unguarded = catch_probability(&settlement, 0.0);
        let guarded = catch_probability(&settlement, 0.2);
        assert!(guarded > unguarded);
    }

    #[test]
    fn catch_probability_is_clamped() {
        let mut settlement = test_settlement();
        settlement.population = 1;
        settlement.treasury = 0;
        assert!(catch_probability(&settlement, 0.0) >= 0.05);
        settlement.treasury = u64::MAX / 2;
        assert!(catch_probability(&settlement, 1.0) <= 0.95);
    }

    #[test]
    fn high_coherence_refuses_theft() {
        let mut agent = test_agent(1);
        agent.needs.survival = 0.05;
        agent.soul.coherence = 0.8;
        assert!(!is_theft_eligible(&agent));
    }
}
