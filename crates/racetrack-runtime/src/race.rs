//! Race Orchestrator
//!
//! Drives engines through the remote engine service and decides races:
//! - One start + drive sequence per car, with a per-car engine state machine
//! - Race fan-out where the first car to report a finish wins
//! - Cooperative stop/reset: in-flight requests are never aborted, their late
//!   results are recognised by a per-car generation and dropped

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use racetrack_core::{
    AppEvent, AttemptOutcome, CarId, DriveFailure, DriveOutcome, EngineRun, EngineState,
    EngineStatus, EventBus, RaceError, RaceOutcome, RemoteStore,
};

// ----------------------------------------------------------------------------
// Engine Slots
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct EngineSlot {
    state: EngineState,
    /// Bumped by every start and stop; results tagged with an older value are stale.
    generation: u64,
}

// ----------------------------------------------------------------------------
// Race Orchestrator
// ----------------------------------------------------------------------------

/// Concurrent engine and race driver
///
/// Cheap to clone; clones share engine slots, store and event bus.
#[derive(Clone)]
pub struct RaceOrchestrator {
    store: Arc<dyn RemoteStore>,
    events: Arc<EventBus>,
    slots: Arc<Mutex<HashMap<CarId, EngineSlot>>>,
}

impl RaceOrchestrator {
    pub fn new(store: Arc<dyn RemoteStore>, events: Arc<EventBus>) -> Self {
        Self {
            store,
            events,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Current engine state; unknown cars are idle.
    pub fn engine_state(&self, car_id: &CarId) -> EngineState {
        self.slots()
            .get(car_id)
            .map(|slot| slot.state)
            .unwrap_or_default()
    }

    /// Start the engine of one car and drive it to the finish or a breakdown.
    pub async fn run_engine(&self, car_id: &CarId) -> EngineRun {
        let generation = self.begin(car_id);

        let start = match self.store.set_engine(car_id, EngineStatus::Started).await {
            Ok(start) => start,
            Err(err) => {
                warn!(car = %car_id, error = %err, "engine start failed");
                return if self.transition(car_id, generation, EngineState::Idle) {
                    EngineRun::new(car_id.clone(), 0, AttemptOutcome::StartFailed)
                } else {
                    EngineRun::new(car_id.clone(), 0, AttemptOutcome::Stopped)
                };
            }
        };

        let Some(elapsed_ms) = start.elapsed_ms() else {
            let err = RaceError::InvalidEngineResponse {
                car_id: car_id.clone(),
                reason: format!(
                    "distance {} / velocity {} is not a finite drive",
                    start.distance, start.velocity
                ),
            };
            warn!(car = %car_id, error = %err, "engine start rejected");
            self.transition(car_id, generation, EngineState::Idle);
            return EngineRun::new(car_id.clone(), 0, AttemptOutcome::StartFailed);
        };

        if !self.transition(car_id, generation, EngineState::Driving) {
            debug!(car = %car_id, "stopped before driving");
            return EngineRun::new(car_id.clone(), elapsed_ms, AttemptOutcome::Stopped);
        }
        self.events.publish(&AppEvent::EngineRunning {
            car_id: car_id.clone(),
            elapsed_ms,
        });

        let drive = self.store.drive(car_id).await;
        let outcome = match drive {
            Ok(DriveOutcome::Finished) => AttemptOutcome::Finished,
            Ok(DriveOutcome::Broken(failure)) => AttemptOutcome::Broken(failure),
            Err(err) => {
                warn!(car = %car_id, error = %err, "drive request failed");
                AttemptOutcome::Broken(DriveFailure::Transport)
            }
        };

        let settled = match outcome {
            AttemptOutcome::Finished => EngineState::Finished,
            _ => EngineState::Broken,
        };
        if !self.transition(car_id, generation, settled) {
            debug!(car = %car_id, ?outcome, "late drive result ignored");
            return EngineRun::new(car_id.clone(), elapsed_ms, AttemptOutcome::Stopped);
        }

        match outcome {
            AttemptOutcome::Finished => {
                debug!(car = %car_id, elapsed_ms, "finished");
            }
            AttemptOutcome::Broken(failure) => {
                info!(car = %car_id, %failure, "drive ended without finishing");
                if let Some(message) = failure.diagnostic(car_id) {
                    self.events.publish(&AppEvent::Diagnostic { message });
                }
                self.events.publish(&AppEvent::EngineStopped {
                    car_id: car_id.clone(),
                });
            }
            AttemptOutcome::Stopped | AttemptOutcome::StartFailed => {}
        }
        EngineRun::new(car_id.clone(), elapsed_ms, outcome)
    }

    /// Race every car; the first finish to arrive wins.
    ///
    /// Attempts still running when the winner is known keep going in the
    /// background and keep publishing their events.
    pub async fn race_all(&self, cars: &[CarId]) -> RaceOutcome {
        if cars.is_empty() {
            return RaceOutcome::NoWinner {
                attempted: 0,
                broken: 0,
            };
        }
        info!(cars = cars.len(), "race started");

        let (tx, mut rx) = mpsc::unbounded_channel();
        for car_id in cars {
            let orchestrator = self.clone();
            let car_id = car_id.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let run = orchestrator.run_engine(&car_id).await;
                // the receiver is gone once a winner was declared
                let _ = tx.send(run);
            });
        }
        drop(tx);

        let mut broken = 0;
        while let Some(run) = rx.recv().await {
            if run.succeeded {
                info!(car = %run.car_id, time_ms = run.elapsed_ms, "race won");
                return RaceOutcome::Winner(run);
            }
            broken += 1;
        }

        info!(attempted = cars.len(), broken, "race ended without a winner");
        RaceOutcome::NoWinner {
            attempted: cars.len(),
            broken,
        }
    }

    /// Return one car to the start line.
    ///
    /// The slot goes idle at once so in-flight results are ignored; the stop
    /// request itself is best effort.
    pub async fn stop_engine(&self, car_id: &CarId) {
        self.begin_stop(car_id);
        if let Err(err) = self.store.set_engine(car_id, EngineStatus::Stopped).await {
            warn!(car = %car_id, error = %err, "engine stop request failed");
        }
        self.events.publish(&AppEvent::EngineStopped {
            car_id: car_id.clone(),
        });
        self.events.publish(&AppEvent::ReturnedToStart {
            car_id: car_id.clone(),
        });
    }

    /// Stop every car concurrently.
    pub async fn reset_all(&self, cars: &[CarId]) {
        debug!(cars = cars.len(), "resetting");
        join_all(cars.iter().map(|car_id| self.stop_engine(car_id))).await;
    }

    /// Drop the slot of a deleted car. Results still in flight for it are
    /// ignored.
    pub fn forget(&self, car_id: &CarId) {
        self.slots().remove(car_id);
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<CarId, EngineSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot for a new attempt and return its generation.
    fn begin(&self, car_id: &CarId) -> u64 {
        let mut slots = self.slots();
        let slot = slots.entry(car_id.clone()).or_default();
        slot.generation += 1;
        slot.state = EngineState::Starting;
        slot.generation
    }

    fn begin_stop(&self, car_id: &CarId) {
        let mut slots = self.slots();
        let slot = slots.entry(car_id.clone()).or_default();
        slot.generation += 1;
        slot.state = EngineState::Idle;
    }

    /// Move to `state` unless a newer start or stop took over the slot.
    fn transition(&self, car_id: &CarId, generation: u64, state: EngineState) -> bool {
        let mut slots = self.slots();
        match slots.get_mut(car_id) {
            Some(slot) if slot.generation == generation => {
                slot.state = state;
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for RaceOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceOrchestrator")
            .field("engines", &self.slots().len())
            .finish()
    }
}
