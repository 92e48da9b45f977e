//! Racetrack Runtime Engine
//!
//! This crate contains the engine behind the Racetrack race simulation:
//! - `Garage`: the state facade front-ends drive with user intents
//! - `RaceOrchestrator`: concurrent engine runs and race decisions
//! - `WinnerLedger`: leaderboard upkeep
//! - `HttpStore` and `MemoryStore`: remote store implementations
//!
//! `racetrack-core` provides the stable API definitions this crate builds on.

pub mod builder;
pub mod event_log;
pub mod garage;
pub mod generator;
pub mod ledger;
pub mod race;
pub mod store;

pub use builder::GarageBuilder;
pub use event_log::EventLogger;
pub use garage::{Garage, GarageSnapshot, WinnersSnapshot};
pub use generator::CarGenerator;
pub use ledger::{LedgerUpdate, WinnerLedger};
pub use race::RaceOrchestrator;
pub use store::{EngineScript, HttpStore, MemoryStore};

// Re-export core types for convenience
pub use racetrack_core::{
    AppEvent, AttemptOutcome, Car, CarId, EngineRun, EngineState, EventBus, EventKind, NewCar,
    RaceConfig, RaceError, RaceOutcome, RaceResult, RemoteStore, SortKey, SortOrder, SortState,
    WinnerRecord, WinnerRow,
};
