//! The persistence bridge: what an opaque state store must round-trip.
//!
//! The engine does not know or care what the store is made of -- SQLite, a
//! flat file, a test vector. It hands over a [`WorldSnapshot`] and expects
//! the same bytes back. Structured entities are full-replaced on save;
//! events and stats are append-only from the store's point of view (the
//! snapshot carries the current tail and history). The load path rejects
//! any snapshot older than the in-memory tick -- the clock never runs
//! backward.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use telluria_agents::ArchetypeTemplate;
use telluria_types::{Agent, DailyStats, Event, Faction, Settlement};
use telluria_world::HexMap;
use tracing::info;

use crate::clock::SimClock;
use crate::state::{Counters, WorldState};

/// Errors from the persistence bridge.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store I/O failed.
    #[error("store i/o failed: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Snapshot serialization or deserialization failed.
    #[error("snapshot encoding failed: {source}")]
    Encoding {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// The snapshot is older than the in-memory world.
    #[error("stale snapshot: stored tick {snapshot_tick} behind memory tick {memory_tick}")]
    StaleSnapshot {
        /// Tick recorded in the snapshot.
        snapshot_tick: u64,
        /// Tick currently in memory.
        memory_tick: u64,
    },
}

/// Everything the store must round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Tick at which the snapshot was taken.
    pub last_tick: u64,
    /// World seed.
    pub seed: u64,
    /// Next agent id to allocate.
    pub next_agent_id: u64,
    /// Next settlement id to allocate.
    pub next_settlement_id: u64,
    /// Cumulative counters.
    pub counters: Counters,
    /// Total events emitted (the tail below is the buffered suffix).
    pub events_emitted: u64,
    /// The hex map, health and resource pools included.
    pub map: HexMap,
    /// Every agent, dead ones included.
    pub agents: Vec<Agent>,
    /// Every settlement, abandoned ones included.
    pub settlements: Vec<Settlement>,
    /// Every faction, influence and relations maps included.
    pub factions: Vec<Faction>,
    /// Tier-1 templates in force.
    pub templates: Vec<ArchetypeTemplate>,
    /// Buffered event tail.
    pub events: Vec<Event>,
    /// Daily statistics history.
    pub stats: Vec<DailyStats>,
}

/// A store the engine can save to and load from.
pub trait StateStore {
    /// Persist a snapshot, full-replacing structured entities.
    fn save(&mut self, snapshot: &WorldSnapshot) -> Result<(), StoreError>;

    /// Load the most recent snapshot, or `None` for a fresh store.
    fn load(&mut self) -> Result<Option<WorldSnapshot>, StoreError>;
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Option<WorldSnapshot>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { snapshot: None }
    }
}

impl StateStore for MemoryStore {
    fn save(&mut self, snapshot: &WorldSnapshot) -> Result<(), StoreError> {
        self.snapshot = Some(snapshot.clone());
        Ok(())
    }

    fn load(&mut self) -> Result<Option<WorldSnapshot>, StoreError> {
        Ok(self.snapshot.clone())
    }
}

/// Flat-file JSON store -- the binary's default when no external store is
/// wired in.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// A store at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for JsonFileStore {
    fn save(&mut self, snapshot: &WorldSnapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(snapshot)?;
        // Write-then-rename so a crash mid-save never corrupts the store.
        let temp = self.path.with_extension("tmp");
        std::fs::write(&temp, &bytes)?;
        std::fs::rename(&temp, &self.path)?;
        info!(path = %self.path.display(), tick = snapshot.last_tick, "snapshot saved");
        Ok(())
    }

    fn load(&mut self) -> Result<Option<WorldSnapshot>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl WorldState {
    /// Take a snapshot of the world.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        let (next_agent_id, next_settlement_id) = self.id_counters();
        WorldSnapshot {
            last_tick: self.clock.tick(),
            seed: self.seed,
            next_agent_id,
            next_settlement_id,
            counters: self.counters,
            events_emitted: self.events_emitted(),
            map: self.map.clone(),
            agents: self.agents.values().cloned().collect(),
            settlements: self.settlements.values().cloned().collect(),
            factions: self.factions.values().cloned().collect(),
            templates: self.templates.clone(),
            events: self.events().cloned().collect(),
            stats: self.stats_history.clone(),
        }
    }

    /// Rebuild a world from a snapshot.
    ///
    /// The member index is rebuilt from agent home ids -- it is derived
    /// state and never persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StaleSnapshot`] when the snapshot's tick is
    /// behind `minimum_tick` (the in-memory tick of the world being
    /// replaced).
    pub fn restore(snapshot: WorldSnapshot, minimum_tick: u64) -> Result<Self, StoreError> {
        if snapshot.last_tick < minimum_tick {
            return Err(StoreError::StaleSnapshot {
                snapshot_tick: snapshot.last_tick,
                memory_tick: minimum_tick,
            });
        }

        let mut world = Self::new(snapshot.seed, snapshot.map);
        world.clock = SimClock::from_tick(snapshot.last_tick);
        world.counters = snapshot.counters;
        world.templates = snapshot.templates;
        world.stats_history = snapshot.stats;
        world.set_id_counters(snapshot.next_agent_id, snapshot.next_settlement_id);
        world.set_events(snapshot.events, snapshot.events_emitted);

        for settlement in snapshot.settlements {
            world.settlements.insert(settlement.id, settlement);
        }
        for faction in snapshot.factions {
            world.factions.insert(faction.id, faction);
        }
        for agent in snapshot.agents {
            world.agents.insert(agent.id, agent);
        }
        world.rebuild_member_index();

        info!(tick = world.clock.tick(), agents = world.agents.len(), "world restored");
        Ok(world)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::{
        AxialCoord, CognitionTier, Governance, Occupation, Settlement, SettlementId, Sex,
    };
    use telluria_world::generate_world;

    use super::*;
    use crate::state::AgentSeed;

    fn small_world() -> WorldState {
        let mut world = WorldState::new(77, generate_world(77, 4));
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
        for i in 0..5 {
            let id = world.create_agent(AgentSeed {
                name: format!("Agent {i}"),
                sex: Sex::Female,
                age: 30,
                position: AxialCoord::new(0, 0),
                home: Some(sid),
                occupation: Occupation::Farmer,
                tier: CognitionTier::Tier0,
                born_tick: 0,
            });
            world.agents.get_mut(&id).unwrap().wealth = 10 * u64::from(i as u32 + 1);
        }
        world.rebuild_member_index();
        world
    }

    #[test]
    fn snapshot_round_trips_byte_identically() {
        let world = small_world();
        let first = world.snapshot();
        let bytes_one = serde_json::to_vec(&first).unwrap();

        let restored = WorldState::restore(first, 0).unwrap();
        let second = restored.snapshot();
        let bytes_two = serde_json::to_vec(&second).unwrap();

        assert_eq!(bytes_one, bytes_two, "save → load → save is not a fixpoint");
    }

    #[test]
    fn restore_rebuilds_the_member_index() {
        let world = small_world();
        let sid = SettlementId::new(1);
        let members_before = world.members_of(sid).to_vec();

        let restored = WorldState::restore(world.snapshot(), 0).unwrap();
        assert_eq!(restored.members_of(sid), members_before.as_slice());
        assert_eq!(restored.settlements[&sid].population, 5);
    }

    #[test]
    fn stale_snapshots_are_rejected() {
        let world = small_world();
        let snapshot = world.snapshot(); // tick 0
        let result = WorldState::restore(snapshot, 10);
        assert!(matches!(
            result,
            Err(StoreError::StaleSnapshot {
                snapshot_tick: 0,
                memory_tick: 10
            })
        ));
    }

    #[test]
    fn memory_store_round_trips() {
        let world = small_world();
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&world.snapshot()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, world.snapshot());
    }

    #[test]
    fn json_file_store_round_trips() {
        let dir = std::env::temp_dir().join(format!("telluria-store-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("world.json");

        let world = small_world();
        let mut store = JsonFileStore::new(&path);
        assert!(store.load().unwrap().is_none());

        store.save(&world.snapshot()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, world.snapshot());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn id_counters_survive_restore() {
        let world = small_world();
        let restored = WorldState::restore(world.snapshot(), 0).unwrap();
        assert_eq!(restored.id_counters(), world.id_counters());
    }
}
