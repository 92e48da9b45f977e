//! Remote store contract
//!
//! The race core talks to three REST collections: `/garage` (cars), `/engine`
//! (engine transitions) and `/winners` (leaderboard). Implementations live in
//! the runtime crate; tests use an in-memory one.

use async_trait::async_trait;

use crate::errors::RaceResult;
use crate::pagination::WinnersQuery;
use crate::types::{
    Car, CarId, DriveOutcome, EngineStart, EngineStatus, NewCar, Page, WinnerLookup, WinnerRecord,
};

/// Async client for the garage, engine and winners endpoints
///
/// Transport failures are `RaceError::Transport`; statuses the caller did not
/// expect are `RaceError::Status`. Drive rejections and a missing winner are
/// regular answers, not errors.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `GET /garage?_page&_limit`
    async fn list_cars(&self, page: u32, limit: u32) -> RaceResult<Page<Car>>;

    /// `GET /garage`
    async fn list_all_cars(&self) -> RaceResult<Vec<Car>>;

    /// `GET /garage/{id}`, 404 is `RaceError::NotFound`
    async fn get_car(&self, id: &CarId) -> RaceResult<Car>;

    /// `POST /garage`
    async fn create_car(&self, car: &NewCar) -> RaceResult<Car>;

    /// `PUT /garage/{id}`
    async fn update_car(&self, id: &CarId, car: &NewCar) -> RaceResult<Car>;

    /// `DELETE /garage/{id}`
    async fn delete_car(&self, id: &CarId) -> RaceResult<()>;

    /// `PATCH /engine?id&status=started|stopped`
    async fn set_engine(&self, id: &CarId, status: EngineStatus) -> RaceResult<EngineStart>;

    /// `PATCH /engine?id&status=drive`
    async fn drive(&self, id: &CarId) -> RaceResult<DriveOutcome>;

    /// `GET /winners?_page&_limit&_sort&_order`
    async fn list_winners(&self, query: &WinnersQuery) -> RaceResult<Page<WinnerRecord>>;

    /// `GET /winners/{id}`
    async fn get_winner(&self, id: &CarId) -> RaceResult<WinnerLookup>;

    /// `POST /winners`
    async fn create_winner(&self, record: &WinnerRecord) -> RaceResult<()>;

    /// `PUT /winners/{id}`
    async fn update_winner(&self, record: &WinnerRecord) -> RaceResult<()>;

    /// `DELETE /winners/{id}`
    async fn delete_winner(&self, id: &CarId) -> RaceResult<()>;
}
