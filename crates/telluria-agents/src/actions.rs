//! Non-work minute actions and daily upkeep applied to single agents.
//!
//! Eating, foraging, the traveling-merchant minute, and daily food
//! spoilage. Socializing mutates both parties and therefore takes the agent
//! map. Buying food is a market concern and lives in the economy crate.

use std::collections::BTreeMap;

use telluria_types::{Agent, AgentId, GoodKind, Need, ResourceKind, AGNOSIS, PSYCHE};
use telluria_world::HexMap;

/// Survival restored by one eaten unit of food.
pub const EAT_SURVIVAL_GAIN: f64 = PSYCHE;

/// Survival scraped together when foraging finds nothing.
pub const SCAVENGE_SURVIVAL_GAIN: f64 = AGNOSIS * 0.01;

/// Belonging gained by each party to a social minute.
pub const SOCIALIZE_BELONGING_GAIN: f64 = PSYCHE * 0.05;

/// Sentiment gained by each party to a social minute.
pub const SOCIALIZE_SENTIMENT_GAIN: f64 = 0.02;

/// Trust gained by each party to a social minute.
pub const SOCIALIZE_TRUST_GAIN: f64 = 0.01;

/// Base fraction of held food that spoils each sim-day, before the weather
/// factor.
pub const FOOD_SPOILAGE_RATE: f64 = AGNOSIS * 0.05;

/// Needs gain per minute while traveling -- slightly below the work rates,
/// the road being honest but thin living.
pub const TRAVEL_NEED_GAIN: f64 = AGNOSIS * 0.008;

/// Survival level at which a traveling merchant stops to eat.
pub const TRAVEL_EAT_THRESHOLD: f64 = 0.5;

/// Eat one unit of the most plentiful food held.
///
/// Returns the good eaten, or `None` if no food was held.
pub fn eat(agent: &mut Agent) -> Option<GoodKind> {
    let good = agent.inventory.best_food()?;
    agent.inventory.take(good, 1);
    agent.needs.adjust(Need::Survival, EAT_SURVIVAL_GAIN);
    Some(good)
}

/// Forage the agent's current hex for one unit of wild food.
///
/// Grain and fish pools are tried in terrain order; herbs do in a pinch.
/// An empty hex still yields a scrap of survival from scavenging.
pub fn forage(agent: &mut Agent, map: &mut HexMap, tick: u64) -> Option<GoodKind> {
    let coord = agent.position;
    let hex = map.get_mut(coord)?;

    for resource in [ResourceKind::Grain, ResourceKind::Fish, ResourceKind::Herbs] {
        if hex.resources.get(resource) >= 1.0 {
            hex.resources.take(resource, 1.0);
            hex.last_extracted_tick = tick;
            agent.inventory.add(resource.good(), 1);
            return Some(resource.good());
        }
    }
    agent.needs.adjust(Need::Survival, SCAVENGE_SURVIVAL_GAIN);
    None
}

/// One social minute between two live agents: mutual belonging, sentiment,
/// and trust.
pub fn socialize_pair(agents: &mut BTreeMap<AgentId, Agent>, a: AgentId, b: AgentId) {
    if a == b {
        return;
    }
    if let Some(agent) = agents.get_mut(&a) {
        if !agent.alive {
            return;
        }
        agent.needs.adjust(Need::Belonging, SOCIALIZE_BELONGING_GAIN);
        agent.note_relationship(b, SOCIALIZE_SENTIMENT_GAIN, SOCIALIZE_TRUST_GAIN);
    }
    if let Some(agent) = agents.get_mut(&b) {
        if !agent.alive {
            return;
        }
        agent.needs.adjust(Need::Belonging, SOCIALIZE_BELONGING_GAIN);
        agent.note_relationship(a, SOCIALIZE_SENTIMENT_GAIN, SOCIALIZE_TRUST_GAIN);
    }
}

/// One minute of merchant travel: tick down the timer, keep needs on a thin
/// positive drip, eat from cargo or pack when hungry.
///
/// Returns `true` when the merchant arrives this minute.
pub fn travel_tick(agent: &mut Agent) -> bool {
    let Some(trade) = agent.trade.as_mut() else {
        return false;
    };
    if trade.travel_remaining == 0 {
        return false;
    }
    trade.travel_remaining -= 1;

    agent.needs.adjust(Need::Safety, TRAVEL_NEED_GAIN);
    agent.needs.adjust(Need::Purpose, TRAVEL_NEED_GAIN);
    agent.needs.adjust(Need::Esteem, TRAVEL_NEED_GAIN * 0.5);

    if agent.needs.survival < TRAVEL_EAT_THRESHOLD {
        // Provisions first, cargo as a last resort.
        if eat(agent).is_none() {
            let trade = agent.trade.as_mut();
            if let Some(trade) = trade {
                if let Some(good) = trade.cargo.best_food() {
                    trade.cargo.take(good, 1);
                    agent.needs.adjust(Need::Survival, EAT_SURVIVAL_GAIN);
                }
            }
        }
    }

    agent
        .trade
        .as_ref()
        .is_some_and(|trade| trade.travel_remaining == 0)
}

/// Apply one day's food spoilage to an agent's held food.
///
/// `factor` is the weather/season multiplier on the base rate. Spoiled
/// units vanish -- goods, never crowns.
pub fn daily_food_spoilage(agent: &mut Agent, factor: f64) -> u32 {
    let mut spoiled_total = 0u32;
    for good in [GoodKind::Grain, GoodKind::Fish] {
        let held = agent.inventory.get(good);
        if held == 0 {
            continue;
        }
        let spoiled = (f64::from(held) * FOOD_SPOILAGE_RATE * factor).floor() as u32;
        spoiled_total += agent.inventory.take(good, spoiled);
    }
    spoiled_total
}
