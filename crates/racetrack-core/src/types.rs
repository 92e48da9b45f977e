//! Domain types for the race core
//!
//! Cars, engine results, winner records and the sort/query vocabulary shared by
//! the store contract, the runtime and the front-ends.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{DriveFailure, RaceError, RaceResult};

/// Color used for the track body; generated cars must never blend into it.
pub const TRACK_BODY_COLOR: &str = "#69696b";

// ----------------------------------------------------------------------------
// Car Identity
// ----------------------------------------------------------------------------

/// Opaque car identifier assigned by the remote store.
///
/// json-server hands out numeric ids while other stores use strings, so the id
/// accepts either on the wire and writes numeric ids back as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarId(String);

impl CarId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_number(&self) -> Option<u64> {
        self.0
            .parse::<u64>()
            .ok()
            .filter(|n| n.to_string() == self.0)
    }
}

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CarId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CarId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for CarId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for CarId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_number() {
            Some(n) => serializer.serialize_u64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for CarId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => CarId::from(n),
            RawId::Text(s) => CarId(s),
        })
    }
}

// ----------------------------------------------------------------------------
// Cars
// ----------------------------------------------------------------------------

/// A car stored in the remote garage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub id: CarId,
    pub name: String,
    pub color: String,
}

/// Body of a create or replace request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCar {
    pub name: String,
    pub color: String,
}

impl NewCar {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// Reject input that must never reach the remote store.
    pub fn validate(&self) -> RaceResult<()> {
        if self.name.trim().is_empty() {
            return Err(RaceError::Validation {
                field: "name",
                reason: "car name must not be empty".to_string(),
            });
        }
        if !is_hex_color(&self.color) {
            return Err(RaceError::Validation {
                field: "color",
                reason: format!("expected #rrggbb, got {:?}", self.color),
            });
        }
        Ok(())
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// One page of a remote listing plus the total number of items in the collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u32) -> Self {
        Self { items, total_count }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }
}

// ----------------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------------

/// Engine transitions accepted by `PATCH /engine`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineStatus {
    Started,
    Stopped,
    Drive,
}

impl EngineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineStatus::Started => "started",
            EngineStatus::Stopped => "stopped",
            EngineStatus::Drive => "drive",
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distance/velocity pair returned when an engine starts or stops
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineStart {
    pub distance: f64,
    pub velocity: f64,
}

impl EngineStart {
    /// Time the car needs to cover the track, `floor(distance / velocity)`.
    ///
    /// `None` when the pair cannot describe a finite drive.
    pub fn elapsed_ms(&self) -> Option<u64> {
        if !(self.velocity.is_finite() && self.velocity > 0.0) {
            return None;
        }
        if !(self.distance.is_finite() && self.distance >= 0.0) {
            return None;
        }
        Some((self.distance / self.velocity).floor() as u64)
    }
}

/// Answer of the drive transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    Finished,
    Broken(DriveFailure),
}

/// Per-car engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Starting,
    Driving,
    Finished,
    Broken,
}

impl EngineState {
    /// True while requests for this car are in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, EngineState::Starting | EngineState::Driving)
    }
}

/// How one engine attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Finished,
    Broken(DriveFailure),
    /// The car was stopped or reset while the attempt was in flight.
    Stopped,
    /// The start transition failed, no drive was attempted.
    StartFailed,
}

/// Result of one engine start + drive sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRun {
    pub car_id: CarId,
    pub succeeded: bool,
    pub elapsed_ms: u64,
    pub outcome: AttemptOutcome,
}

impl EngineRun {
    pub fn new(car_id: CarId, elapsed_ms: u64, outcome: AttemptOutcome) -> Self {
        Self {
            car_id,
            succeeded: matches!(outcome, AttemptOutcome::Finished),
            elapsed_ms,
            outcome,
        }
    }
}

/// Overall result of racing a set of cars
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceOutcome {
    /// First car to finish, in arrival order
    Winner(EngineRun),
    /// Every attempt settled without a finisher
    NoWinner { attempted: usize, broken: usize },
}

impl RaceOutcome {
    pub fn winner(&self) -> Option<&EngineRun> {
        match self {
            RaceOutcome::Winner(run) => Some(run),
            RaceOutcome::NoWinner { .. } => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Winners
// ----------------------------------------------------------------------------

/// Leaderboard entry: wins count and best time (ms) per car
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub id: CarId,
    pub wins: u32,
    pub time: u64,
}

impl WinnerRecord {
    pub fn first_win(id: CarId, time_ms: u64) -> Self {
        Self {
            id,
            wins: 1,
            time: time_ms,
        }
    }

    /// Fold a new win into an optional existing record.
    ///
    /// Absent records start at one win; present ones gain a win and keep the
    /// better of the two times.
    pub fn merge(existing: Option<&WinnerRecord>, id: CarId, time_ms: u64) -> WinnerRecord {
        match existing {
            None => WinnerRecord::first_win(id, time_ms),
            Some(record) => WinnerRecord {
                id,
                wins: record.wins.saturating_add(1),
                time: record.time.min(time_ms),
            },
        }
    }
}

/// Three-way answer of a winner lookup is split between this enum and `Err`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnerLookup {
    Found(WinnerRecord),
    NotFound,
}

/// Leaderboard row with the car resolved from the garage, when it still exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerRow {
    pub record: WinnerRecord,
    pub car: Option<Car>,
}

/// Column the winners table is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Wins,
    Time,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Wins => "wins",
            SortKey::Time => "time",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wins" => Ok(SortKey::Wins),
            "time" => Ok(SortKey::Time),
            other => Err(format!("unknown sort key {other:?} (expected wins or time)")),
        }
    }
}

/// Sort direction of the winners table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order {other:?} (expected asc or desc)")),
        }
    }
}
