//! The simulation runner: pacing, speed control, oracle dispatch, daily
//! checkpoints, and clean shutdown.
//!
//! The world lives behind a coarse `tokio::sync::RwLock`. The runner takes
//! the exclusive side for the duration of each tick; readers (the external
//! query layer, snapshot writers) take the shared side between ticks. The
//! engine suspends only at the bottom of a tick: the pacing sleep, the
//! oracle call, and the persistence checkpoint all happen with the lock
//! released.
//!
//! Speed is a multiplier stored in milli-units; zero pauses the loop (the
//! scheduler sleeps on a notify, the tick counter does not advance). A stop
//! request is honored at the next tick boundary -- never mid-tick -- after a
//! final checkpoint.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, RwLock};
use tracing::{info, warn};

use telluria_world::WeatherProvider;

use crate::oracle::{self, ArchetypeOracle, DecisionOracle, OracleDecision};
use crate::persistence::{StateStore, StoreError};
use crate::state::WorldState;
use crate::tick::{run_tick, TickError, TickInputs};

/// Errors that can end a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick failed (clock overflow).
    #[error("tick failed: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },

    /// The state store failed; the engine halts cleanly after the current
    /// tick.
    #[error("state store failed: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReason {
    /// A stop was requested and honored at a tick boundary.
    Stopped,
    /// Every agent is dead.
    Extinction,
}

/// The result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationResult {
    /// Why the run ended.
    pub reason: RunReason,
    /// Ticks executed by this run.
    pub ticks: u64,
}

/// Shared speed and stop control.
///
/// Atomics keep the hot path lock-free; external command surfaces hold an
/// `Arc` of this and may adjust speed at any time -- the change takes effect
/// no later than the next sleep boundary.
#[derive(Debug)]
pub struct SpeedControl {
    /// Speed multiplier in milli-units (1000 = 1.0×, 0 = paused).
    speed_milli: AtomicU64,
    /// Wakes the loop from a pause.
    resume: Notify,
    /// Stop requested.
    stop: AtomicBool,
    /// Wall-clock start, for operator bookkeeping.
    started_at: DateTime<Utc>,
}

impl SpeedControl {
    /// A control at the given initial speed.
    #[must_use]
    pub fn new(initial_speed: f64) -> Self {
        Self {
            speed_milli: AtomicU64::new(to_milli(initial_speed)),
            resume: Notify::new(),
            stop: AtomicBool::new(false),
            started_at: Utc::now(),
        }
    }

    /// Current speed multiplier.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed_milli.load(Ordering::Relaxed) as f64 / 1_000.0
    }

    /// Set the speed multiplier; zero pauses.
    pub fn set_speed(&self, speed: f64) {
        self.speed_milli.store(to_milli(speed), Ordering::Relaxed);
        if speed > 0.0 {
            self.resume.notify_waiters();
        }
    }

    /// Request a stop; honored at the next tick boundary.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        self.resume.notify_waiters();
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Wall-clock time the control was created.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wait until resumed or stopped.
    ///
    /// `notify_waiters` stores no permit, so a wake that races this call
    /// would be lost; the short poll fallback makes the pause loop immune
    /// to that.
    async fn wait_for_resume(&self) {
        loop {
            if self.stop_requested() || self.speed() > 0.0 {
                return;
            }
            let _ = tokio::time::timeout(
                Duration::from_millis(50),
                self.resume.notified(),
            )
            .await;
        }
    }
}

fn to_milli(speed: f64) -> u64 {
    (speed.max(0.0) * 1_000.0).round() as u64
}

/// External collaborators the runner consults between ticks.
pub struct RunnerOracles<'a> {
    /// Weekly decision oracle for named agents.
    pub decisions: &'a mut dyn DecisionOracle,
    /// Weekly archetype-template oracle.
    pub archetypes: &'a mut dyn ArchetypeOracle,
    /// Daily weather provider.
    pub weather: &'a mut dyn WeatherProvider,
}

/// Run the simulation until stopped or extinct.
///
/// Checkpoints daily and at shutdown; a store failure halts the engine
/// cleanly with an error (the caller maps it to the corruption exit code).
pub async fn run_simulation(
    world: Arc<RwLock<WorldState>>,
    store: &mut dyn StateStore,
    oracles: &mut RunnerOracles<'_>,
    control: Arc<SpeedControl>,
    tick_interval: Duration,
) -> Result<SimulationResult, RunnerError> {
    let mut ticks_run = 0u64;
    let mut pending_decisions: Vec<OracleDecision> = Vec::new();

    loop {
        if control.stop_requested() {
            checkpoint(&world, store).await?;
            info!(ticks_run, "stop honored at tick boundary");
            return Ok(SimulationResult {
                reason: RunReason::Stopped,
                ticks: ticks_run,
            });
        }

        let speed = control.speed();
        if speed <= 0.0 {
            // Paused: the tick counter does not advance.
            control.wait_for_resume().await;
            continue;
        }

        // --- The tick proper, under the exclusive lock ---
        let (crossed_day, next_tick, extinct) = {
            let mut state = world.write().await;
            let day_before = state.clock.sim_day();
            // Pending oracle decisions are consumed by the day layer; hold
            // them back on ordinary ticks.
            let runs_day_layer =
                (state.clock.tick() + 1) % telluria_types::TICKS_PER_DAY == 0;
            let decisions_for_tick: &[OracleDecision] = if runs_day_layer {
                &pending_decisions
            } else {
                &[]
            };
            let mut inputs = TickInputs {
                weather: &mut *oracles.weather,
                oracle_decisions: decisions_for_tick,
            };
            run_tick(&mut state, &mut inputs)?;
            ticks_run += 1;

            let crossed_day = state.clock.sim_day() > day_before;
            let extinct = state.live_population() == 0;
            (crossed_day, state.clock.tick(), extinct)
        };
        if crossed_day {
            // The day layer just consumed them.
            pending_decisions.clear();
        }

        if extinct {
            checkpoint(&world, store).await?;
            warn!(tick = next_tick, "extinction: no live agents remain");
            return Ok(SimulationResult {
                reason: RunReason::Extinction,
                ticks: ticks_run,
            });
        }

        // --- Between ticks: checkpoint and oracle calls, lock released ---
        if crossed_day {
            checkpoint(&world, store).await?;

            // Weekly archetype refresh.
            let (week, day) = {
                let state = world.read().await;
                (state.clock.week(), state.clock.sim_day())
            };
            if day % 7 == 0 {
                if let Some(templates) = oracles.archetypes.refresh(week) {
                    if !templates.is_empty() {
                        world.write().await.templates = templates;
                        info!(week, "archetype templates refreshed");
                    }
                }
            }

            // Tier-2 contexts for the batch due tomorrow; the decisions
            // come back before the next tick starts and are applied in its
            // day layer.
            let contexts = {
                let state = world.read().await;
                oracle::build_contexts(&state, day + 1)
            };
            if !contexts.is_empty() {
                pending_decisions = oracles.decisions.decide(&contexts);
            }
        }

        // --- Pacing sleep, scaled by speed ---
        let scaled = tick_interval.div_f64(speed.max(f64::MIN_POSITIVE));
        tokio::time::sleep(scaled).await;
    }
}

/// Snapshot the world and persist it, then trim the event buffer.
async fn checkpoint(
    world: &Arc<RwLock<WorldState>>,
    store: &mut dyn StateStore,
) -> Result<(), StoreError> {
    let snapshot = {
        let state = world.read().await;
        state.snapshot()
    };
    store.save(&snapshot)?;
    world.write().await.trim_events();
    Ok(())
}
