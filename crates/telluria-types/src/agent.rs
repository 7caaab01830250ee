//! The agent record and its component states.
//!
//! Agents are owned by the simulation; everything else references them by
//! [`AgentId`]. The struct is deliberately flat and serde-friendly -- the
//! persistence bridge full-replaces agents on save -- with the two bounded
//! collections (memories, relationships) enforcing their caps at the
//! mutation site so no code path can grow them without eviction.

use serde::{Deserialize, Serialize};

use crate::constants::clamp01;
use crate::enums::{CognitionTier, GoodKind, Need, Occupation, Sex, SocialRole, SoulClass, SoulState};
use crate::hex::AxialCoord;
use crate::ids::{AgentId, FactionId, SettlementId};

/// Maximum retained memories per agent. Insertion at the cap evicts the
/// lowest-importance entry.
pub const MEMORY_CAP: usize = 20;

/// Maximum tracked relationships per agent. Insertion at the cap evicts the
/// weakest bond.
pub const RELATIONSHIP_CAP: usize = 20;

// ---------------------------------------------------------------------------
// Needs
// ---------------------------------------------------------------------------

/// The five-needs vector, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedsState {
    /// Food and bodily upkeep.
    pub survival: f64,
    /// Security of person and property.
    pub safety: f64,
    /// Connection to others.
    pub belonging: f64,
    /// Standing among peers.
    pub esteem: f64,
    /// Meaningful work.
    pub purpose: f64,
}

impl NeedsState {
    /// Read one need.
    #[must_use]
    pub const fn get(&self, need: Need) -> f64 {
        match need {
            Need::Survival => self.survival,
            Need::Safety => self.safety,
            Need::Belonging => self.belonging,
            Need::Esteem => self.esteem,
            Need::Purpose => self.purpose,
        }
    }

    /// Add a delta to one need, clamping into `[0, 1]`.
    pub fn adjust(&mut self, need: Need, delta: f64) {
        let slot = match need {
            Need::Survival => &mut self.survival,
            Need::Safety => &mut self.safety,
            Need::Belonging => &mut self.belonging,
            Need::Esteem => &mut self.esteem,
            Need::Purpose => &mut self.purpose,
        };
        *slot = clamp01(*slot + delta);
    }

    /// Clamp every need into `[0, 1]`.
    pub fn clamp(&mut self) {
        self.survival = clamp01(self.survival);
        self.safety = clamp01(self.safety);
        self.belonging = clamp01(self.belonging);
        self.esteem = clamp01(self.esteem);
        self.purpose = clamp01(self.purpose);
    }

    /// The need with the lowest value strictly below `threshold`, if any.
    ///
    /// Ties resolve in declaration order, which keeps the kernel
    /// deterministic.
    #[must_use]
    pub fn lowest_below(&self, threshold: f64) -> Option<Need> {
        let mut worst: Option<(Need, f64)> = None;
        for need in Need::ALL {
            let value = self.get(need);
            if value < threshold && worst.is_none_or(|(_, w)| value < w) {
                worst = Some((need, value));
            }
        }
        worst.map(|(need, _)| need)
    }
}

impl Default for NeedsState {
    fn default() -> Self {
        Self {
            survival: 0.8,
            safety: 0.7,
            belonging: 0.6,
            esteem: 0.5,
            purpose: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Wellbeing and soul
// ---------------------------------------------------------------------------

/// The dual wellbeing register, each component in `[-1, 1]`.
///
/// `satisfaction` tracks material needs; `alignment` tracks existential
/// state; `effective_mood` blends them by a coherence-dependent weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WellbeingState {
    /// Needs-weighted material register.
    pub satisfaction: f64,
    /// Coherence-derived existential register.
    pub alignment: f64,
    /// Blend of the two, weighted by coherence.
    pub effective_mood: f64,
}

impl Default for WellbeingState {
    fn default() -> Self {
        Self {
            satisfaction: 0.0,
            alignment: 0.0,
            effective_mood: 0.0,
        }
    }
}

/// The soul record: coherence plus derived state of being.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Soul {
    /// Citta coherence in `[0, 1]`.
    pub coherence: f64,
    /// Inborn class, fixed at creation.
    pub class: SoulClass,
    /// Current state of being, derived from coherence thresholds.
    pub state: SoulState,
}

impl Soul {
    /// A fresh embodied soul with the given class and starting coherence.
    #[must_use]
    pub fn new(class: SoulClass, coherence: f64) -> Self {
        Self {
            coherence: clamp01(coherence),
            class,
            state: SoulState::Embodied,
        }
    }
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// Trained skills, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Skills {
    /// Crop and field work.
    pub farming: f64,
    /// Ore and stone work.
    pub mining: f64,
    /// Making and preparing goods.
    pub crafting: f64,
    /// Hunting and fighting.
    pub combat: f64,
    /// Bargaining and routes.
    pub trade: f64,
}

impl Skills {
    /// Clamp every skill into `[0, 1]`.
    pub fn clamp(&mut self) {
        self.farming = clamp01(self.farming);
        self.mining = clamp01(self.mining);
        self.crafting = clamp01(self.crafting);
        self.combat = clamp01(self.combat);
        self.trade = clamp01(self.trade);
    }
}

// ---------------------------------------------------------------------------
// Memory and relationships
// ---------------------------------------------------------------------------

/// A single remembered episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Tick when the memory formed.
    pub tick: u64,
    /// Human-readable description.
    pub content: String,
    /// Retention weight; lowest goes first at the cap.
    pub importance: f64,
}

/// A tracked bond with another agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// The other agent.
    pub target: AgentId,
    /// Affinity in `[-1, 1]`.
    pub sentiment: f64,
    /// Confidence in `[0, 1]`.
    pub trust: f64,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Fixed-size inventory indexed by [`GoodKind`].
///
/// The good set is closed, so the slots live inline in the agent record
/// rather than behind a map allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inventory {
    slots: [u32; GoodKind::COUNT],
}

impl Inventory {
    /// An empty inventory.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            slots: [0; GoodKind::COUNT],
        }
    }

    /// Units held of a good.
    #[must_use]
    pub fn get(&self, good: GoodKind) -> u32 {
        self.slots[good.index()]
    }

    /// Add units of a good (saturating).
    pub fn add(&mut self, good: GoodKind, units: u32) {
        let slot = &mut self.slots[good.index()];
        *slot = slot.saturating_add(units);
    }

    /// Remove up to `units` of a good; returns the units actually removed.
    pub fn take(&mut self, good: GoodKind, units: u32) -> u32 {
        let slot = &mut self.slots[good.index()];
        let taken = units.min(*slot);
        *slot -= taken;
        taken
    }

    /// Total units of food goods held.
    #[must_use]
    pub fn food_units(&self) -> u32 {
        GoodKind::ALL
            .iter()
            .filter(|good| good.is_food())
            .map(|good| self.get(*good))
            .sum()
    }

    /// The food good held in the greatest quantity, if any food is held.
    #[must_use]
    pub fn best_food(&self) -> Option<GoodKind> {
        GoodKind::ALL
            .iter()
            .filter(|good| good.is_food() && self.get(**good) > 0)
            .max_by_key(|good| self.get(**good))
            .copied()
    }

    /// Whether no units of any good are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|&units| units == 0)
    }

    /// Iterate over `(good, units)` pairs with non-zero units.
    pub fn iter(&self) -> impl Iterator<Item = (GoodKind, u32)> + '_ {
        GoodKind::ALL
            .iter()
            .map(|good| (*good, self.get(*good)))
            .filter(|(_, units)| *units > 0)
    }

    /// Remove everything, returning the drained `(good, units)` pairs.
    pub fn drain(&mut self) -> Vec<(GoodKind, u32)> {
        let held: Vec<(GoodKind, u32)> = self.iter().collect();
        self.slots = [0; GoodKind::COUNT];
        held
    }
}

// ---------------------------------------------------------------------------
// Merchant trade state
// ---------------------------------------------------------------------------

/// Merchant-only fields: route, cargo, consignment, travel timer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeState {
    /// Settlement the merchant is currently bound for.
    pub destination: Option<SettlementId>,
    /// Destination an oracle scout suggested; tried first on the next route.
    pub preferred_destination: Option<SettlementId>,
    /// Goods in transit.
    pub cargo: Inventory,
    /// Crowns owed to the home treasury for consigned cargo.
    pub consignment_debt: u64,
    /// Ticks of travel remaining; zero when not traveling.
    pub travel_remaining: u32,
}

impl TradeState {
    /// Whether the merchant is between settlements right now.
    #[must_use]
    pub const fn is_traveling(&self) -> bool {
        self.travel_remaining > 0
    }

    /// Whether the merchant is free to pick a new route.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.travel_remaining == 0 && self.destination.is_none() && self.cargo.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A single inhabitant of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Stable identifier.
    pub id: AgentId,
    /// Generated name.
    pub name: String,
    /// Biological sex.
    pub sex: Sex,
    /// Age in sim-years.
    pub age: u32,
    /// Bodily health in `[0, 1]`.
    pub health: f64,
    /// Current hex position.
    pub position: AxialCoord,
    /// Home settlement, if any.
    pub home: Option<SettlementId>,
    /// Current occupation.
    pub occupation: Occupation,
    /// Decision-making tier.
    pub tier: CognitionTier,
    /// Social standing.
    pub role: SocialRole,
    /// Liquid wealth in crowns.
    pub wealth: u64,
    /// Held goods.
    pub inventory: Inventory,
    /// The five-needs vector.
    pub needs: NeedsState,
    /// The dual wellbeing register.
    pub wellbeing: WellbeingState,
    /// Coherence and state of being.
    pub soul: Soul,
    /// Trained skills.
    pub skills: Skills,
    /// Bounded episodic memory.
    pub memories: Vec<MemoryEntry>,
    /// Bounded relationship list.
    pub relationships: Vec<Relationship>,
    /// Faction membership, if any.
    pub faction: Option<FactionId>,
    /// Tick of the last successful work action.
    pub last_work_tick: u64,
    /// Merchant route state (merchants only).
    pub trade: Option<TradeState>,
    /// Whether the agent is alive. Dead agents never act or mutate.
    pub alive: bool,
    /// Tick of birth (or of spawning, for seed agents).
    pub born_tick: u64,
}

impl Agent {
    /// Record a memory, evicting the lowest-importance entry at the cap.
    pub fn remember(&mut self, tick: u64, content: impl Into<String>, importance: f64) {
        if self.memories.len() >= MEMORY_CAP {
            if let Some(weakest) = self
                .memories
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.importance.total_cmp(&b.importance))
                .map(|(idx, _)| idx)
            {
                self.memories.remove(weakest);
            }
        }
        self.memories.push(MemoryEntry {
            tick,
            content: content.into(),
            importance,
        });
    }

    /// Strengthen (or sour) the bond with another agent.
    ///
    /// Creates the relationship if absent, evicting the weakest bond at the
    /// cap. Sentiment clamps to `[-1, 1]`, trust to `[0, 1]`.
    pub fn note_relationship(&mut self, target: AgentId, d_sentiment: f64, d_trust: f64) {
        if target == self.id {
            return;
        }
        if let Some(rel) = self.relationships.iter_mut().find(|rel| rel.target == target) {
            rel.sentiment = (rel.sentiment + d_sentiment).clamp(-1.0, 1.0);
            rel.trust = clamp01(rel.trust + d_trust);
            return;
        }
        if self.relationships.len() >= RELATIONSHIP_CAP {
            if let Some(weakest) = self
                .relationships
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    (a.sentiment.abs() + a.trust).total_cmp(&(b.sentiment.abs() + b.trust))
                })
                .map(|(idx, _)| idx)
            {
                self.relationships.remove(weakest);
            }
        }
        self.relationships.push(Relationship {
            target,
            sentiment: d_sentiment.clamp(-1.0, 1.0),
            trust: clamp01(d_trust),
        });
    }

    /// Sentiment toward another agent (0 when untracked).
    #[must_use]
    pub fn sentiment_toward(&self, target: AgentId) -> f64 {
        self.relationships
            .iter()
            .find(|rel| rel.target == target)
            .map_or(0.0, |rel| rel.sentiment)
    }

    /// Whether the agent works a hex-extracting occupation.
    #[must_use]
    pub const fn is_producer(&self) -> bool {
        matches!(
            self.occupation,
            Occupation::Farmer
                | Occupation::Fisher
                | Occupation::Hunter
                | Occupation::Miner
                | Occupation::Laborer
                | Occupation::Alchemist
        )
    }
}
