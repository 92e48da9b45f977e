//! Error types for the Racetrack core
//!
//! This module contains the error types used throughout the race core: the
//! classified drive failures (which are race outcomes, not errors) and the
//! `RaceError` type that unifies every failure a remote call or an intent can
//! report.

use crate::types::CarId;

// ----------------------------------------------------------------------------
// Drive Failure Classification
// ----------------------------------------------------------------------------

/// Classified rejection of a "drive" request.
///
/// The engine service answers a drive request with a status code; anything other
/// than 200 means the car did not finish. These codes are expected race outcomes
/// and are never surfaced as a [`RaceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum DriveFailure {
    #[error("bad request (400)")]
    BadRequest,
    #[error("engine not started (404)")]
    NotStarted,
    #[error("drive already in progress (429)")]
    TooManyRequests,
    #[error("engine broken (500)")]
    EngineBroken,
    #[error("unexpected status {0}")]
    Unexpected(u16),
    /// The drive request never produced a response.
    #[error("transport failure")]
    Transport,
}

impl DriveFailure {
    /// Classify a non-success drive status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => DriveFailure::BadRequest,
            404 => DriveFailure::NotStarted,
            429 => DriveFailure::TooManyRequests,
            500 => DriveFailure::EngineBroken,
            other => DriveFailure::Unexpected(other),
        }
    }

    /// Status code that produced this failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DriveFailure::BadRequest => Some(400),
            DriveFailure::NotStarted => Some(404),
            DriveFailure::TooManyRequests => Some(429),
            DriveFailure::EngineBroken => Some(500),
            DriveFailure::Unexpected(code) => Some(*code),
            DriveFailure::Transport => None,
        }
    }

    /// Human-readable diagnostic for the presentation layer.
    ///
    /// Transport failures are only logged, so they have no user-facing message.
    pub fn diagnostic(&self, car_id: &CarId) -> Option<String> {
        match self {
            DriveFailure::BadRequest => Some(format!(
                "Wrong parameters: car {car_id} cannot drive with the given engine status"
            )),
            DriveFailure::NotStarted => Some(format!(
                "Engine of car {car_id} was not started: start the engine before driving"
            )),
            DriveFailure::TooManyRequests => Some(format!(
                "Car {car_id} is already driving: wait for the current drive to finish"
            )),
            DriveFailure::EngineBroken => Some(format!("Car {car_id} engine was broken")),
            DriveFailure::Unexpected(code) => {
                Some(format!("Car {car_id} engine was broken (status {code})"))
            }
            DriveFailure::Transport => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Core error type for the race core
#[derive(Debug, thiserror::Error)]
pub enum RaceError {
    /// The remote store could not be reached or its response could not be read
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    /// The remote store answered with a status the caller did not expect
    #[error("Unexpected status {status} from {context}")]
    Status { status: u16, context: String },

    /// A single-resource fetch returned 404
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Input rejected before any remote call was issued
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// An update was requested without a selected car
    #[error("No car selected")]
    NoSelection,

    /// Engine start answered with an unusable distance/velocity pair
    #[error("Invalid engine response for car {car_id}: {reason}")]
    InvalidEngineResponse { car_id: CarId, reason: String },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl RaceError {
    /// Shorthand for a transport error built from any displayable cause.
    pub fn transport(reason: impl std::fmt::Display) -> Self {
        RaceError::Transport {
            reason: reason.to_string(),
        }
    }

    /// Shorthand for an unexpected-status error.
    pub fn status(status: u16, context: impl Into<String>) -> Self {
        RaceError::Status {
            status,
            context: context.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RaceError::Transport { .. } => "transport",
            RaceError::Status { .. } => "unexpected_status",
            RaceError::NotFound { .. } => "not_found",
            RaceError::Validation { .. } => "validation",
            RaceError::NoSelection => "no_selection",
            RaceError::InvalidEngineResponse { .. } => "invalid_engine_response",
            RaceError::Configuration { .. } => "configuration",
        }
    }

    /// True when the remote collaborator was unreachable.
    pub fn is_transport(&self) -> bool {
        matches!(self, RaceError::Transport { .. })
    }

    /// True when the input was rejected locally.
    pub fn is_validation(&self) -> bool {
        matches!(self, RaceError::Validation { .. } | RaceError::NoSelection)
    }
}

pub type RaceResult<T> = core::result::Result<T, RaceError>;
