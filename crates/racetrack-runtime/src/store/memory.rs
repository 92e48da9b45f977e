//! In-memory store
//!
//! A json-server equivalent living in the process: sequential numeric ids,
//! `_page`/`_limit` slicing, winner sorting and a simulated engine service.
//! Engines follow a per-car [`EngineScript`]; cars without a script get one
//! drawn from a seeded RNG so offline runs are reproducible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use racetrack_core::{
    Car, CarId, DriveFailure, DriveOutcome, EngineStart, EngineStatus, NewCar, Page, RaceError,
    RaceResult, RemoteStore, SortKey, SortOrder, WinnerLookup, WinnerRecord, WinnersQuery,
};

/// Track length reported by the simulated engine
pub const TRACK_DISTANCE: f64 = 500_000.0;

// ----------------------------------------------------------------------------
// Engine Scripts
// ----------------------------------------------------------------------------

/// Scripted behaviour of one simulated engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineScript {
    pub distance: f64,
    pub velocity: f64,
    /// How long the drive request takes to answer
    pub drive_delay: Duration,
    /// Status the drive request answers with
    pub drive_status: u16,
}

impl EngineScript {
    /// Finishes after `ms`, reporting an elapsed time of `ms`.
    pub fn finishes_in(ms: u64) -> Self {
        Self {
            distance: ms as f64 * 100.0,
            velocity: 100.0,
            drive_delay: Duration::from_millis(ms),
            drive_status: 200,
        }
    }

    /// Breaks down after `ms` with a 500.
    pub fn breaks_after(ms: u64) -> Self {
        Self {
            drive_status: 500,
            ..Self::finishes_in(ms)
        }
    }

    /// Drive is rejected immediately with `status`.
    pub fn rejects(status: u16) -> Self {
        Self {
            drive_delay: Duration::ZERO,
            drive_status: status,
            ..Self::finishes_in(1_000)
        }
    }

    /// Start answers with a zero velocity.
    pub fn stalled() -> Self {
        Self {
            velocity: 0.0,
            ..Self::finishes_in(1_000)
        }
    }

    /// Random script in the range of the public race server.
    fn random(rng: &mut StdRng) -> Self {
        let velocity = rng.gen_range(50.0..=200.0_f64);
        let elapsed = (TRACK_DISTANCE / velocity).floor() as u64;
        let breaks = rng.gen_bool(0.25);
        let drive_delay = if breaks {
            Duration::from_millis(rng.gen_range(0..=elapsed))
        } else {
            Duration::from_millis(elapsed)
        };
        Self {
            distance: TRACK_DISTANCE,
            velocity,
            drive_delay,
            drive_status: if breaks { 500 } else { 200 },
        }
    }

    fn start(&self) -> EngineStart {
        EngineStart {
            distance: self.distance,
            velocity: self.velocity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum EngineSlot {
    #[default]
    Stopped,
    Started,
    Driving,
}

// ----------------------------------------------------------------------------
// Memory Store
// ----------------------------------------------------------------------------

#[derive(Debug)]
struct MemoryState {
    cars: Vec<Car>,
    next_id: u64,
    winners: Vec<WinnerRecord>,
    engines: HashMap<CarId, EngineSlot>,
    scripts: HashMap<CarId, EngineScript>,
    rng: StdRng,
}

/// `RemoteStore` kept entirely in memory
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    offline: AtomicBool,
    requests: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Empty store whose unscripted engines draw from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                cars: Vec::new(),
                next_id: 1,
                winners: Vec::new(),
                engines: HashMap::new(),
                scripts: HashMap::new(),
                rng: StdRng::seed_from_u64(seed),
            }),
            offline: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        }
    }

    /// Store pre-filled with `cars`, ids assigned from 1.
    pub fn with_cars<I>(cars: I) -> Self
    where
        I: IntoIterator<Item = NewCar>,
    {
        let store = Self::new();
        for car in cars {
            store.insert_car(car);
        }
        store
    }

    /// Insert a car without counting a request.
    pub fn insert_car(&self, car: NewCar) -> Car {
        let mut state = self.lock();
        let car = Car {
            id: CarId::from(state.next_id),
            name: car.name,
            color: car.color,
        };
        state.next_id += 1;
        state.cars.push(car.clone());
        car
    }

    /// Insert or replace a winner record without counting a request.
    pub fn insert_winner(&self, record: WinnerRecord) {
        let mut state = self.lock();
        state.winners.retain(|w| w.id != record.id);
        state.winners.push(record);
    }

    pub fn script(&self, id: impl Into<CarId>, script: EngineScript) {
        self.lock().scripts.insert(id.into(), script);
    }

    /// While offline every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of store calls issued so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn cars(&self) -> Vec<Car> {
        self.lock().cars.clone()
    }

    pub fn winners(&self) -> Vec<WinnerRecord> {
        self.lock().winners.clone()
    }

    pub fn winner(&self, id: &CarId) -> Option<WinnerRecord> {
        self.lock().winners.iter().find(|w| &w.id == id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request(&self, context: &str) -> RaceResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        debug!(request = context, "memory store");
        if self.offline.load(Ordering::SeqCst) {
            return Err(RaceError::transport(format!(
                "{context}: store is offline"
            )));
        }
        Ok(())
    }

    fn script_for(state: &mut MemoryState, id: &CarId) -> EngineScript {
        if let Some(script) = state.scripts.get(id) {
            return script.clone();
        }
        let script = EngineScript::random(&mut state.rng);
        state.scripts.insert(id.clone(), script.clone());
        script
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn slice_page<T: Clone>(items: &[T], page: u32, limit: u32) -> Vec<T> {
    let limit = limit.max(1) as usize;
    let start = (page.max(1) as usize - 1).saturating_mul(limit);
    items.iter().skip(start).take(limit).cloned().collect()
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_cars(&self, page: u32, limit: u32) -> RaceResult<Page<Car>> {
        self.request("GET /garage")?;
        let state = self.lock();
        Ok(Page::new(
            slice_page(&state.cars, page, limit),
            state.cars.len() as u32,
        ))
    }

    async fn list_all_cars(&self) -> RaceResult<Vec<Car>> {
        self.request("GET /garage")?;
        Ok(self.lock().cars.clone())
    }

    async fn get_car(&self, id: &CarId) -> RaceResult<Car> {
        self.request(&format!("GET /garage/{id}"))?;
        self.lock()
            .cars
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| RaceError::NotFound {
                resource: format!("car {id}"),
            })
    }

    async fn create_car(&self, car: &NewCar) -> RaceResult<Car> {
        self.request("POST /garage")?;
        Ok(self.insert_car(car.clone()))
    }

    async fn update_car(&self, id: &CarId, car: &NewCar) -> RaceResult<Car> {
        self.request(&format!("PUT /garage/{id}"))?;
        let mut state = self.lock();
        let stored = state
            .cars
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| RaceError::NotFound {
                resource: format!("car {id}"),
            })?;
        stored.name = car.name.clone();
        stored.color = car.color.clone();
        Ok(stored.clone())
    }

    async fn delete_car(&self, id: &CarId) -> RaceResult<()> {
        self.request(&format!("DELETE /garage/{id}"))?;
        let mut state = self.lock();
        let before = state.cars.len();
        state.cars.retain(|c| &c.id != id);
        if state.cars.len() == before {
            return Err(RaceError::status(404, format!("DELETE /garage/{id}")));
        }
        state.engines.remove(id);
        Ok(())
    }

    async fn set_engine(&self, id: &CarId, status: EngineStatus) -> RaceResult<EngineStart> {
        self.request(&format!("PATCH /engine {id} {status}"))?;
        let mut state = self.lock();
        if !state.cars.iter().any(|c| &c.id == id) {
            return Err(RaceError::status(404, format!("PATCH /engine {id} {status}")));
        }
        match status {
            EngineStatus::Started => {
                let script = Self::script_for(&mut state, id);
                state.engines.insert(id.clone(), EngineSlot::Started);
                Ok(script.start())
            }
            EngineStatus::Stopped => {
                state.engines.insert(id.clone(), EngineSlot::Stopped);
                Ok(EngineStart {
                    distance: TRACK_DISTANCE,
                    velocity: 0.0,
                })
            }
            EngineStatus::Drive => Err(RaceError::status(
                400,
                format!("PATCH /engine {id} drive is not a start/stop transition"),
            )),
        }
    }

    async fn drive(&self, id: &CarId) -> RaceResult<DriveOutcome> {
        self.request(&format!("PATCH /engine {id} drive"))?;
        let script = {
            let mut state = self.lock();
            match state.engines.get(id).copied().unwrap_or_default() {
                EngineSlot::Stopped => {
                    return Ok(DriveOutcome::Broken(DriveFailure::NotStarted));
                }
                EngineSlot::Driving => {
                    return Ok(DriveOutcome::Broken(DriveFailure::TooManyRequests));
                }
                EngineSlot::Started => {}
            }
            state.engines.insert(id.clone(), EngineSlot::Driving);
            Self::script_for(&mut state, id)
        };

        if !script.drive_delay.is_zero() {
            tokio::time::sleep(script.drive_delay).await;
        }

        let mut state = self.lock();
        if state.engines.get(id) == Some(&EngineSlot::Driving) {
            state.engines.insert(id.clone(), EngineSlot::Started);
        }
        if script.drive_status == 200 {
            Ok(DriveOutcome::Finished)
        } else {
            Ok(DriveOutcome::Broken(DriveFailure::from_status(
                script.drive_status,
            )))
        }
    }

    async fn list_winners(&self, query: &WinnersQuery) -> RaceResult<Page<WinnerRecord>> {
        self.request("GET /winners")?;
        let state = self.lock();
        let mut winners = state.winners.clone();
        winners.sort_by(|a, b| {
            let ordering = match query.sort {
                SortKey::Wins => a.wins.cmp(&b.wins),
                SortKey::Time => a.time.cmp(&b.time),
            };
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        Ok(Page::new(
            slice_page(&winners, query.page, query.limit),
            winners.len() as u32,
        ))
    }

    async fn get_winner(&self, id: &CarId) -> RaceResult<WinnerLookup> {
        self.request(&format!("GET /winners/{id}"))?;
        Ok(match self.winner(id) {
            Some(record) => WinnerLookup::Found(record),
            None => WinnerLookup::NotFound,
        })
    }

    async fn create_winner(&self, record: &WinnerRecord) -> RaceResult<()> {
        self.request("POST /winners")?;
        let mut state = self.lock();
        if state.winners.iter().any(|w| w.id == record.id) {
            return Err(RaceError::status(500, "POST /winners duplicate id"));
        }
        state.winners.push(record.clone());
        Ok(())
    }

    async fn update_winner(&self, record: &WinnerRecord) -> RaceResult<()> {
        self.request(&format!("PUT /winners/{}", record.id))?;
        let mut state = self.lock();
        match state.winners.iter_mut().find(|w| w.id == record.id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(RaceError::status(404, format!("PUT /winners/{}", record.id))),
        }
    }

    async fn delete_winner(&self, id: &CarId) -> RaceResult<()> {
        self.request(&format!("DELETE /winners/{id}"))?;
        let mut state = self.lock();
        let before = state.winners.len();
        state.winners.retain(|w| &w.id != id);
        if state.winners.len() == before {
            return Err(RaceError::status(404, format!("DELETE /winners/{id}")));
        }
        Ok(())
    }
}
