//! Racetrack Core API
//!
//! Domain types, errors, configuration, the event bus, page arithmetic and the
//! remote store contract shared by the Racetrack runtime and its front-ends.
//! Nothing in this crate performs I/O.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod events;
pub mod pagination;
pub mod store;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{GarageConfig, RaceConfig, ServerConfig, WinnersConfig};
pub use errors::{DriveFailure, RaceError, RaceResult};
pub use events::{AppEvent, EventBus, EventHandler, EventKind, SubscriptionId};
pub use pagination::{garage_query, PageAction, PagePolicy, SortState, WinnersQuery, FIRST_PAGE};
pub use store::RemoteStore;
pub use types::{
    AttemptOutcome, Car, CarId, DriveOutcome, EngineRun, EngineStart, EngineState, EngineStatus,
    NewCar, Page, RaceOutcome, SortKey, SortOrder, WinnerLookup, WinnerRecord, WinnerRow,
    TRACK_BODY_COLOR,
};
