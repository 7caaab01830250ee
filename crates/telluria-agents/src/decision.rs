//! The Tier-0 minute kernel: drive to action.
//!
//! Given the minute's dominant drive, pick one concrete action:
//!
//! - Survival: eat from inventory; else buy the cheapest food if the market
//!   is reachable and affordable; else forage.
//! - Safety: work when wealthy enough that security means income; else eat
//!   or forage.
//! - Belonging: socialize with the highest-sentiment settlement-mate.
//! - Esteem, purpose, and the default drive: work.
//!
//! Tier-1 agents pass their archetype template, which biases the drive and
//! may substitute a favored action for the default work drive.

use telluria_types::{ActionKind, Agent, AgentId, Need};

use crate::archetype::ArchetypeTemplate;
use crate::needs::{dominant_drive, Drive};

/// Wealth at which safety is best served by working for more of it.
pub const SECURITY_WEALTH_FLOOR: u64 = 20;

/// What the kernel chose for this minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentAction {
    /// Produce at the workplace.
    Work,
    /// Consume one unit of food from inventory.
    Eat,
    /// Buy one unit of the cheapest food from a settlement-mate.
    BuyFood,
    /// Scavenge food from the land.
    Forage,
    /// Spend the minute with this settlement-mate.
    Socialize(AgentId),
    /// Nothing to do.
    Idle,
}

/// Read-only context the kernel needs for one agent's minute.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// Whether the agent's home settlement market is reachable.
    pub market_reachable: bool,
    /// Price of the cheapest food good at that market.
    pub cheapest_food_price: Option<f64>,
    /// Live settlement-mates, in id order.
    pub nearby: &'a [AgentId],
    /// Archetype template for Tier-1 agents.
    pub template: Option<&'a ArchetypeTemplate>,
}

/// Choose this minute's action for a live agent.
#[must_use]
pub fn decide(agent: &Agent, ctx: &DecisionContext<'_>) -> AgentAction {
    let bias = ctx.template.map(|t| &t.need_bias);
    match dominant_drive(&agent.needs, bias) {
        Drive::Need(Need::Survival) => survival_action(agent, ctx),
        Drive::Need(Need::Safety) => {
            if agent.wealth >= SECURITY_WEALTH_FLOOR {
                AgentAction::Work
            } else {
                survival_action(agent, ctx)
            }
        }
        Drive::Need(Need::Belonging) => best_company(agent, ctx.nearby)
            .map_or(AgentAction::Work, AgentAction::Socialize),
        Drive::Need(Need::Esteem | Need::Purpose) => AgentAction::Work,
        Drive::Work => ctx
            .template
            .and_then(|t| t.favored)
            .map_or(AgentAction::Work, |favored| favored_action(agent, ctx, favored)),
    }
}

/// Resolve the survival branch: eat, buy, or forage.
fn survival_action(agent: &Agent, ctx: &DecisionContext<'_>) -> AgentAction {
    if agent.inventory.food_units() > 0 {
        return AgentAction::Eat;
    }
    if ctx.market_reachable {
        if let Some(price) = ctx.cheapest_food_price {
            if agent.wealth as f64 >= price {
                return AgentAction::BuyFood;
            }
        }
    }
    AgentAction::Forage
}

/// Map a template's favored action kind onto a concrete action.
fn favored_action(agent: &Agent, ctx: &DecisionContext<'_>, favored: ActionKind) -> AgentAction {
    match favored {
        ActionKind::Socialize => best_company(agent, ctx.nearby)
            .map_or(AgentAction::Work, AgentAction::Socialize),
        ActionKind::Forage => AgentAction::Forage,
        ActionKind::Eat if agent.inventory.food_units() > 0 => AgentAction::Eat,
        _ => AgentAction::Work,
    }
}

/// The highest-sentiment live settlement-mate, ties broken by lower id.
fn best_company(agent: &Agent, nearby: &[AgentId]) -> Option<AgentId> {
    nearby
        .iter()
        .filter(|id| **id != agent.id)
        .max_by(|a, b| {
            agent
                .sentiment_toward(**a)
                .total_cmp(&agent.sentiment_toward(**b))
                .then(b.cmp(a))
        })
        .copied()
}
