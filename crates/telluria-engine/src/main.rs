//! World engine binary for the Telluria simulation.
//!
//! Wires together configuration, the state store, the world (restored or
//! bootstrapped), the oracle fallbacks, and the simulation loop, then runs
//! until a signal or a terminal condition.
//!
//! # Startup sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load `telluria-config.yaml` (path from argv or `TELLURIA_CONFIG`),
//!    apply environment overrides
//! 3. Open the state store and restore the world, or bootstrap a fresh one
//! 4. Install the ctrl-c handler (stop at the next tick boundary)
//! 5. Run the simulation loop
//! 6. Map the outcome to the exit-code contract (0 clean, 1 corruption,
//!    2 provider misconfiguration)

mod error;
mod spawner;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use telluria_core::{
    run_simulation, EngineConfig, JsonFileStore, NullArchetypeOracle, NullOracle, SpeedControl,
    StateStore, WorldState,
};
use telluria_core::runner::RunnerOracles;
use telluria_world::DeterministicWeather;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Application entry point.
#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    match run().await {
        Ok(()) => {
            info!("clean shutdown");
            std::process::ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "engine failed");
            std::process::ExitCode::from(err.exit_code())
        }
    }
}

/// The engine proper; errors map to the exit-code contract.
async fn run() -> Result<(), EngineError> {
    // 1. Configuration.
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TELLURIA_CONFIG").ok())
        .unwrap_or_else(|| String::from("telluria-config.yaml"));
    let config = if Path::new(&config_path).exists() {
        EngineConfig::from_file(Path::new(&config_path))?
    } else {
        warn!(config_path, "no config file; running on defaults");
        let mut config = EngineConfig::default();
        config.apply_env_overrides();
        config
    };
    info!(
        world = config.world.name,
        seed = config.world.seed,
        radius = config.world.radius,
        tick_interval_ms = config.world.tick_interval_ms,
        store = config.store.path,
        "configuration loaded"
    );

    // A required oracle with no endpoint is a fatal misconfiguration; the
    // external adapter process owns the endpoint itself.
    if config.oracle.required && config.oracle.endpoint.is_none() {
        return Err(EngineError::OracleRequired);
    }
    if let Some(endpoint) = &config.oracle.endpoint {
        info!(endpoint, timeout_ms = config.oracle.timeout_ms, "oracle endpoint declared");
    }

    // 2. Store and world.
    let mut store = JsonFileStore::new(&config.store.path);
    let world = match store.load()? {
        Some(snapshot) => {
            info!(tick = snapshot.last_tick, "restoring world from store");
            WorldState::restore(snapshot, 0)?
        }
        None => {
            info!("bootstrapping a fresh world");
            spawner::bootstrap_world(&config)
        }
    };
    info!(
        tick = world.clock.tick(),
        population = world.live_population(),
        settlements = world.settlements.len(),
        "world ready"
    );
    let world = Arc::new(RwLock::new(world));

    // 3. Controls and signal handling.
    let control = Arc::new(SpeedControl::new(config.world.speed));
    let signal_control = Arc::clone(&control);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("signal received; stopping at the next tick boundary");
            signal_control.request_stop();
        }
    });

    // 4. The loop, on the deterministic fallbacks. Live oracle and weather
    // adapters are external collaborators wired in by the host deployment.
    let mut decisions = NullOracle;
    let mut archetypes = NullArchetypeOracle;
    let seed = config.world.seed;
    let mut weather = DeterministicWeather::new(seed);
    let mut oracles = RunnerOracles {
        decisions: &mut decisions,
        archetypes: &mut archetypes,
        weather: &mut weather,
    };

    let result = run_simulation(
        world,
        &mut store,
        &mut oracles,
        control,
        Duration::from_millis(config.world.tick_interval_ms),
    )
    .await?;

    info!(?result.reason, ticks = result.ticks, "simulation ended");
    Ok(())
}
