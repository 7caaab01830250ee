//! Tick engine and world orchestration for the Telluria simulation.
//!
//! This crate owns the world state and the layered tick cycle
//! (minute → hour → day → week → season), plus everything that hangs off
//! it: population, settlement lifecycle, perpetuation, governance and
//! factions, the oracle and persistence bridges, the bounded intervention
//! surface, the observation read models, and the async runner with speed
//! control.
//!
//! The concurrency contract is single-writer: one task holds the world
//! exclusively for the duration of a tick layer; readers take the shared
//! side of the lock. All mutation is sequential and all randomness is
//! stable-hashed, so two replicas with identical state and identical
//! recorded external inputs produce identical traces.

pub mod clock;
pub mod config;
pub mod governance;
pub mod intervention;
pub mod lifecycle;
pub mod observation;
pub mod oracle;
pub mod perpetuation;
pub mod persistence;
pub mod population;
pub mod runner;
pub mod state;
pub mod stats;
pub mod tick;

pub use clock::SimClock;
pub use config::EngineConfig;
pub use intervention::{apply_intervention, Intervention, InterventionError};
pub use oracle::{
    ArchetypeOracle, DecisionOracle, NamedAgentContext, NullArchetypeOracle, NullOracle,
    OracleDecision,
};
pub use persistence::{JsonFileStore, MemoryStore, StateStore, StoreError, WorldSnapshot};
pub use runner::{
    run_simulation, RunReason, RunnerError, RunnerOracles, SimulationResult, SpeedControl,
};
pub use state::WorldState;
pub use tick::{run_tick, TickError, TickInputs, TickSummary};
