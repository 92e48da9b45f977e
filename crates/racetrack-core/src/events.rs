//! Event bus between the race core and its presentation layer
//!
//! State changes are announced as typed [`AppEvent`]s. Front-ends register
//! handlers per [`EventKind`] (or for every event) and react to them; the core
//! never touches presentation state itself.
//!
//! ## Delivery rules
//! - `publish` is synchronous: every matching handler runs before it returns.
//! - Handlers run in subscription order, kind-specific and wildcard handlers
//!   interleaved by the order they were registered.
//! - A panicking handler is isolated: the panic is caught and logged and the
//!   remaining handlers still run.
//! - Publishing an event nobody listens to is a no-op.
//! - The handler table is snapshotted before dispatch, so handlers may
//!   subscribe or unsubscribe; the change applies from the next publish.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{error, trace};

use crate::types::{CarId, SortKey, SortOrder};

// ----------------------------------------------------------------------------
// Event Types
// ----------------------------------------------------------------------------

/// Names of the events published to the presentation boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CarAdded,
    CarDeleted,
    CarSelected,
    CarUpdated,
    CarsGenerated,
    PageAdvanced,
    PageRetreated,
    EngineRunning,
    EngineStopped,
    ReturnedToStart,
    WinnersShown,
    WinnerDeclared,
    Diagnostic,
}

impl EventKind {
    /// Stable kebab-case name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CarAdded => "car-added",
            EventKind::CarDeleted => "car-deleted",
            EventKind::CarSelected => "car-selected",
            EventKind::CarUpdated => "car-updated",
            EventKind::CarsGenerated => "cars-generated",
            EventKind::PageAdvanced => "page-advanced",
            EventKind::PageRetreated => "page-retreated",
            EventKind::EngineRunning => "engine-running",
            EventKind::EngineStopped => "engine-stopped",
            EventKind::ReturnedToStart => "returned-to-start",
            EventKind::WinnersShown => "winners-shown",
            EventKind::WinnerDeclared => "winner-declared",
            EventKind::Diagnostic => "diagnostic",
        }
    }
}

/// Event published by the race core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    CarAdded,
    CarDeleted,
    /// A car was selected for editing; carries its current name.
    CarSelected { name: String },
    CarUpdated,
    CarsGenerated { count: usize },
    PageAdvanced { page: u32 },
    PageRetreated { page: u32 },
    /// Engine started; `elapsed_ms` is how long the drive animation should take.
    EngineRunning { car_id: CarId, elapsed_ms: u64 },
    EngineStopped { car_id: CarId },
    ReturnedToStart { car_id: CarId },
    WinnersShown { sort_key: SortKey, sort_order: SortOrder },
    /// First finisher of a race.
    WinnerDeclared {
        car_id: CarId,
        name: String,
        time_ms: u64,
    },
    /// User-visible message.
    Diagnostic { message: String },
}

impl AppEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AppEvent::CarAdded => EventKind::CarAdded,
            AppEvent::CarDeleted => EventKind::CarDeleted,
            AppEvent::CarSelected { .. } => EventKind::CarSelected,
            AppEvent::CarUpdated => EventKind::CarUpdated,
            AppEvent::CarsGenerated { .. } => EventKind::CarsGenerated,
            AppEvent::PageAdvanced { .. } => EventKind::PageAdvanced,
            AppEvent::PageRetreated { .. } => EventKind::PageRetreated,
            AppEvent::EngineRunning { .. } => EventKind::EngineRunning,
            AppEvent::EngineStopped { .. } => EventKind::EngineStopped,
            AppEvent::ReturnedToStart { .. } => EventKind::ReturnedToStart,
            AppEvent::WinnersShown { .. } => EventKind::WinnersShown,
            AppEvent::WinnerDeclared { .. } => EventKind::WinnerDeclared,
            AppEvent::Diagnostic { .. } => EventKind::Diagnostic,
        }
    }

    pub fn diagnostic(message: impl Into<String>) -> Self {
        AppEvent::Diagnostic {
            message: message.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Event Bus
// ----------------------------------------------------------------------------

/// Shared handler signature
pub type EventHandler = Arc<dyn Fn(&AppEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe_with_id`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    /// `None` matches every event.
    kind: Option<EventKind>,
    handler: EventHandler,
}

impl Registration {
    fn matches(&self, kind: EventKind) -> bool {
        self.kind.map_or(true, |k| k == kind)
    }
}

/// Per-instance publish/subscribe registry
pub struct EventBus {
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Convenience constructor for the shared form used by the runtime.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a handler for one event kind. Chainable.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> &Self
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(handler));
        self
    }

    /// Register a handler for every event. Chainable.
    pub fn subscribe_all<F>(&self, handler: F) -> &Self
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler));
        self
    }

    /// Register a handler and keep its id for a later [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe_with_id<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(handler))
    }

    /// Remove a handler. Returns `false` if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registrations = self.write();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    /// Deliver an event to every matching handler, returning how many ran.
    pub fn publish(&self, event: &AppEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<(SubscriptionId, EventHandler)> = self
            .read()
            .iter()
            .filter(|r| r.matches(kind))
            .map(|r| (r.id, Arc::clone(&r.handler)))
            .collect();

        if handlers.is_empty() {
            trace!(event = kind.as_str(), "no subscribers");
            return 0;
        }

        for (id, handler) in &handlers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                error!(
                    event = kind.as_str(),
                    subscription = id.0,
                    "event handler panicked: {}",
                    panic_message(panic.as_ref())
                );
            }
        }
        handlers.len()
    }

    /// Number of handlers that would receive an event of `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.read().iter().filter(|r| r.matches(kind)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn register(&self, kind: Option<EventKind>, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().push(Registration { id, kind, handler });
        id
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Registration>> {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Registration>> {
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.read().len())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
