//! The world state: entities, derived indices, and event fan-out.
//!
//! One value owns everything the simulation mutates. The settlement→members
//! index is *derived* -- a pure function of agent home ids -- and is rebuilt
//! whenever any home id changes; it is never persisted. Events append to a
//! bounded in-memory buffer and fan out to bounded subscriber channels with
//! drop-on-full semantics, so a slow observer can never stall the tick
//! loop.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use telluria_agents::ArchetypeTemplate;
use telluria_types::{
    stable_hash, unit_f64, Agent, AgentId, AxialCoord, CognitionTier, DailyStats, Event, Faction,
    FactionId, Inventory, NeedsState, Occupation, Settlement, SettlementId, Sex, Skills,
    SocialRole, Soul, SoulClass, TradeState, WellbeingState,
};
use telluria_world::HexMap;
use tokio::sync::mpsc;
use tracing::warn;

use crate::clock::SimClock;

/// In-memory event buffer cap; older events are dropped once durably
/// snapshotted.
pub const EVENT_BUFFER_CAP: usize = 1_000;

/// Per-subscriber channel capacity. A full buffer drops the event for that
/// subscriber only.
pub const SUBSCRIBER_CAP: usize = 64;

/// Cumulative world counters, persisted as world metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Agents born since world creation.
    pub births: u64,
    /// Agents dead since world creation.
    pub deaths: u64,
    /// Units traded across all markets.
    pub trade_volume: u64,
    /// Settlements abandoned.
    pub abandoned_settlements: u64,
    /// Settlements marked non-viable.
    pub non_viable_marks: u64,
}

/// Everything needed to create one agent.
#[derive(Debug, Clone)]
pub struct AgentSeed {
    /// Display name.
    pub name: String,
    /// Biological sex.
    pub sex: Sex,
    /// Starting age in sim-years.
    pub age: u32,
    /// Starting position.
    pub position: AxialCoord,
    /// Home settlement, if any.
    pub home: Option<SettlementId>,
    /// Occupation.
    pub occupation: Occupation,
    /// Cognition tier.
    pub tier: CognitionTier,
    /// Tick of birth or spawning.
    pub born_tick: u64,
}

/// The mutable world.
#[derive(Debug)]
pub struct WorldState {
    /// The simulation clock.
    pub clock: SimClock,
    /// World seed (generation and weather fallback).
    pub seed: u64,
    /// The hex map.
    pub map: HexMap,
    /// All agents, dead ones included (inheritance keeps them resolvable).
    pub agents: BTreeMap<AgentId, Agent>,
    /// All settlements, abandoned ones included.
    pub settlements: BTreeMap<SettlementId, Settlement>,
    /// All factions.
    pub factions: BTreeMap<FactionId, Faction>,
    /// Tier-1 archetype templates currently in force.
    pub templates: Vec<ArchetypeTemplate>,
    /// Cumulative counters.
    pub counters: Counters,
    /// Daily statistics history.
    pub stats_history: Vec<DailyStats>,
    /// Derived settlement → live members index.
    members: BTreeMap<SettlementId, Vec<AgentId>>,
    /// Bounded in-memory event tail.
    events: VecDeque<Event>,
    /// Total events emitted since world creation.
    events_emitted: u64,
    /// Live subscriber channels.
    subscribers: Vec<mpsc::Sender<Event>>,
    /// Next agent id to allocate.
    next_agent_id: u64,
    /// Next settlement id to allocate.
    next_settlement_id: u64,
}

impl WorldState {
    /// A fresh world over a generated map.
    #[must_use]
    pub fn new(seed: u64, map: HexMap) -> Self {
        Self {
            clock: SimClock::new(),
            seed,
            map,
            agents: BTreeMap::new(),
            settlements: BTreeMap::new(),
            factions: BTreeMap::new(),
            templates: telluria_agents::builtin_templates(),
            counters: Counters::default(),
            stats_history: Vec::new(),
            members: BTreeMap::new(),
            events: VecDeque::new(),
            events_emitted: 0,
            subscribers: Vec::new(),
            next_agent_id: 1,
            next_settlement_id: 1,
        }
    }

    // -----------------------------------------------------------------------
    // Id allocation and entity creation
    // -----------------------------------------------------------------------

    /// Allocate the next settlement id.
    pub fn allocate_settlement_id(&mut self) -> SettlementId {
        let id = SettlementId::new(self.next_settlement_id);
        self.next_settlement_id += 1;
        id
    }

    /// Create an agent from a seed.
    ///
    /// Derived traits (soul class, starting coherence, starting skill) come
    /// from the agent's stable hash, so a restored world recreates nothing
    /// and a replayed world creates identically. New agents start with zero
    /// wealth -- births never mint crowns. Callers endowing seed agents at
    /// world bootstrap set wealth explicitly afterwards.
    pub fn create_agent(&mut self, seed: AgentSeed) -> AgentId {
        let id = AgentId::new(self.next_agent_id);
        self.next_agent_id += 1;

        let hash = stable_hash(&[self.seed, id.raw(), 0xA6E7]);
        let class = SoulClass::ALL[(hash % 4) as usize];
        let coherence = 0.1 + unit_f64(stable_hash(&[hash, 1])) * 0.3;

        let mut skills = Skills::default();
        let starting_skill = 0.3 + unit_f64(stable_hash(&[hash, 2])) * 0.4;
        match seed.occupation {
            Occupation::Farmer | Occupation::Fisher => skills.farming = starting_skill,
            Occupation::Hunter | Occupation::Soldier => skills.combat = starting_skill,
            Occupation::Miner | Occupation::Laborer => skills.mining = starting_skill,
            Occupation::Alchemist | Occupation::Crafter | Occupation::Scholar => {
                skills.crafting = starting_skill;
            }
            Occupation::Merchant => skills.trade = starting_skill,
        }

        let trade = (seed.occupation == Occupation::Merchant).then(TradeState::default);

        let agent = Agent {
            id,
            name: seed.name,
            sex: seed.sex,
            age: seed.age,
            health: 1.0,
            position: seed.position,
            home: seed.home,
            occupation: seed.occupation,
            tier: seed.tier,
            role: SocialRole::Commoner,
            wealth: 0,
            inventory: Inventory::empty(),
            needs: NeedsState::default(),
            wellbeing: WellbeingState::default(),
            soul: Soul::new(class, coherence),
            skills,
            memories: Vec::new(),
            relationships: Vec::new(),
            faction: None,
            last_work_tick: seed.born_tick,
            trade,
            alive: true,
            born_tick: seed.born_tick,
        };

        if let Some(home) = agent.home {
            self.members.entry(home).or_default().push(id);
            if let Some(settlement) = self.settlements.get_mut(&home) {
                settlement.population += 1;
            }
        }
        self.agents.insert(id, agent);
        id
    }

    // -----------------------------------------------------------------------
    // Derived member index
    // -----------------------------------------------------------------------

    /// Rebuild the settlement → live-members index from agent home ids, and
    /// refresh each settlement's cached population.
    ///
    /// Must be called after any pass that changes home ids or liveness.
    pub fn rebuild_member_index(&mut self) {
        self.members.clear();
        for agent in self.agents.values() {
            if !agent.alive {
                continue;
            }
            if let Some(home) = agent.home {
                self.members.entry(home).or_default().push(agent.id);
            }
        }
        for settlement in self.settlements.values_mut() {
            let count = self
                .members
                .get(&settlement.id)
                .map_or(0, |members| members.len());
            settlement.population = count as u32;
        }
    }

    /// Live members of a settlement, in id order.
    #[must_use]
    pub fn members_of(&self, settlement: SettlementId) -> &[AgentId] {
        self.members
            .get(&settlement)
            .map_or(&[], |members| members.as_slice())
    }

    /// The full derived index (read-only).
    #[must_use]
    pub const fn member_index(&self) -> &BTreeMap<SettlementId, Vec<AgentId>> {
        &self.members
    }

    /// Count of live agents.
    #[must_use]
    pub fn live_population(&self) -> u32 {
        self.agents.values().filter(|a| a.alive).count() as u32
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Append an event and fan it out to subscribers.
    ///
    /// The send is non-blocking: a subscriber with a full buffer misses this
    /// event and the loop moves on.
    pub fn emit(&mut self, event: Event) {
        self.subscribers.retain(|subscriber| {
            match subscriber.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(tick = event.tick, "subscriber buffer full, event dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        self.events.push_back(event);
        self.events_emitted += 1;
    }

    /// Register a new event subscriber.
    pub fn subscribe(&mut self) -> mpsc::Receiver<Event> {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_CAP);
        self.subscribers.push(sender);
        receiver
    }

    /// Drop the oldest buffered events down to the cap. Called after a
    /// durable snapshot has preserved them.
    pub fn trim_events(&mut self) {
        while self.events.len() > EVENT_BUFFER_CAP {
            self.events.pop_front();
        }
    }

    /// The buffered event tail, oldest first.
    #[must_use]
    pub fn events(&self) -> impl DoubleEndedIterator<Item = &Event> {
        self.events.iter()
    }

    /// Total events emitted since world creation.
    #[must_use]
    pub const fn events_emitted(&self) -> u64 {
        self.events_emitted
    }

    // -----------------------------------------------------------------------
    // Snapshot plumbing (used by the persistence bridge)
    // -----------------------------------------------------------------------

    /// Raw id counters, for snapshotting.
    #[must_use]
    pub const fn id_counters(&self) -> (u64, u64) {
        (self.next_agent_id, self.next_settlement_id)
    }

    /// Restore raw id counters from a snapshot.
    pub const fn set_id_counters(&mut self, next_agent: u64, next_settlement: u64) {
        self.next_agent_id = next_agent;
        self.next_settlement_id = next_settlement;
    }

    /// Replace the buffered event tail from a snapshot.
    pub fn set_events(&mut self, events: Vec<Event>, emitted: u64) {
        self.events = events.into();
        self.events_emitted = emitted;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::{EventCategory, Governance};

    use super::*;

    fn empty_world() -> WorldState {
        WorldState::new(7, HexMap::new(2))
    }

    fn seed_at(home: Option<SettlementId>) -> AgentSeed {
        AgentSeed {
            name: String::from("Test"),
            sex: Sex::Female,
            age: 25,
            position: AxialCoord::new(0, 0),
            home,
            occupation: Occupation::Farmer,
            tier: CognitionTier::Tier0,
            born_tick: 0,
        }
    }

    #[test]
    fn created_agents_start_broke() {
        let mut world = empty_world();
        let id = world.create_agent(seed_at(None));
        assert_eq!(world.agents[&id].wealth, 0);
        assert!(world.agents[&id].alive);
    }

    #[test]
    fn derived_traits_are_reproducible() {
        let mut a = empty_world();
        let mut b = empty_world();
        let id_a = a.create_agent(seed_at(None));
        let id_b = b.create_agent(seed_at(None));
        assert_eq!(a.agents[&id_a].soul, b.agents[&id_b].soul);
        assert_eq!(a.agents[&id_a].skills, b.agents[&id_b].skills);
    }

    #[test]
    fn member_index_tracks_home_changes() {
        let mut world = empty_world();
        let s1 = world.allocate_settlement_id();
        let s2 = world.allocate_settlement_id();
        world.settlements.insert(
            s1,
            Settlement::found(s1, String::from("A"), AxialCoord::new(0, 0), Governance::Council, 0),
        );
        world.settlements.insert(
            s2,
            Settlement::found(s2, String::from("B"), AxialCoord::new(1, 0), Governance::Council, 0),
        );

        let id = world.create_agent(seed_at(Some(s1)));
        assert_eq!(world.members_of(s1), &[id]);
        assert_eq!(world.settlements[&s1].population, 1);

        world.agents.get_mut(&id).unwrap().home = Some(s2);
        world.rebuild_member_index();
        assert!(world.members_of(s1).is_empty());
        assert_eq!(world.members_of(s2), &[id]);
        assert_eq!(world.settlements[&s1].population, 0);
        assert_eq!(world.settlements[&s2].population, 1);
    }

    #[test]
    fn dead_agents_leave_the_index() {
        let mut world = empty_world();
        let s1 = world.allocate_settlement_id();
        world.settlements.insert(
            s1,
            Settlement::found(s1, String::from("A"), AxialCoord::new(0, 0), Governance::Council, 0),
        );
        let id = world.create_agent(seed_at(Some(s1)));
        world.agents.get_mut(&id).unwrap().alive = false;
        world.rebuild_member_index();
        assert!(world.members_of(s1).is_empty());
        assert_eq!(world.live_population(), 0);
    }

    #[tokio::test]
    async fn events_fan_out_with_drop_on_full() {
        let mut world = empty_world();
        let mut receiver = world.subscribe();

        // Overfill the subscriber buffer; the overflow is dropped, the
        // buffer's worth arrives, and the loop never blocks.
        for i in 0..(SUBSCRIBER_CAP + 10) {
            world.emit(Event::new(i as u64, EventCategory::System, "tick"));
        }

        let mut received = 0;
        while receiver.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, SUBSCRIBER_CAP);
        assert_eq!(world.events_emitted(), (SUBSCRIBER_CAP + 10) as u64);
    }

    #[test]
    fn event_buffer_trims_to_cap() {
        let mut world = empty_world();
        for i in 0..(EVENT_BUFFER_CAP + 250) {
            world.emit(Event::new(i as u64, EventCategory::System, "tick"));
        }
        world.trim_events();
        assert_eq!(world.events().count(), EVENT_BUFFER_CAP);
        // Oldest were dropped, newest kept.
        assert_eq!(world.events().next().unwrap().tick, 250);
    }

    #[test]
    fn id_allocation_is_monotonic() {
        let mut world = empty_world();
        let a = world.create_agent(seed_at(None));
        let b = world.create_agent(seed_at(None));
        assert!(a < b);
        let (next_agent, _) = world.id_counters();
        assert_eq!(next_agent, 3);
    }
}
