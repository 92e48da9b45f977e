//! Garage state facade
//!
//! Owns the state a front-end renders (garage page, winners page, selection)
//! and exposes one async method per user intent. Every mutating intent follows
//! the same sequence:
//!
//! 1. Validate input locally
//! 2. Issue the remote mutation
//! 3. Pick the page to show with the page policy and re-fetch it
//! 4. Assign the new state in one step
//! 5. Publish exactly one completion event
//!
//! A failure in steps 2 or 3 is logged and returned; state stays as it was
//! and no completion event is published. The state lock is never held across
//! a remote call.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::join_all;
use tracing::{debug, info, warn};

use racetrack_core::{
    AppEvent, Car, CarId, EngineRun, EngineState, EventBus, NewCar, Page, PageAction, PagePolicy,
    RaceConfig, RaceError, RaceOutcome, RaceResult, RemoteStore, SortKey, SortState, WinnerRow,
    WinnersQuery, FIRST_PAGE,
};

use crate::builder::GarageBuilder;
use crate::generator::CarGenerator;
use crate::ledger::WinnerLedger;
use crate::race::RaceOrchestrator;

// ----------------------------------------------------------------------------
// Snapshots
// ----------------------------------------------------------------------------

/// Garage page as last fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarageSnapshot {
    pub cars: Vec<Car>,
    pub total_count: u32,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
    pub selected: Option<CarId>,
}

impl GarageSnapshot {
    fn empty(page_size: u32) -> Self {
        Self {
            cars: Vec::new(),
            total_count: 0,
            page: FIRST_PAGE,
            page_size,
            selected: None,
        }
    }

    pub fn last_page(&self) -> u32 {
        PagePolicy::new(self.page_size).last_page(self.total_count)
    }

    pub fn car(&self, id: &CarId) -> Option<&Car> {
        self.cars.iter().find(|car| &car.id == id)
    }

    pub fn car_ids(&self) -> Vec<CarId> {
        self.cars.iter().map(|car| car.id.clone()).collect()
    }
}

/// Winners page as last fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnersSnapshot {
    pub rows: Vec<WinnerRow>,
    pub total_count: u32,
    pub page: u32,
    pub page_size: u32,
    pub sort: SortState,
}

impl WinnersSnapshot {
    fn empty(page_size: u32) -> Self {
        Self {
            rows: Vec::new(),
            total_count: 0,
            page: FIRST_PAGE,
            page_size,
            sort: SortState::default(),
        }
    }

    pub fn last_page(&self) -> u32 {
        PagePolicy::new(self.page_size).last_page(self.total_count)
    }
}

#[derive(Debug)]
struct GarageState {
    garage: GarageSnapshot,
    winners: WinnersSnapshot,
}

enum Selection<'a> {
    Keep,
    Clear,
    ClearIf(&'a CarId),
}

fn failed(intent: &'static str, err: RaceError) -> RaceError {
    warn!(intent, kind = err.as_label(), error = %err, "intent failed");
    err
}

// ----------------------------------------------------------------------------
// Garage
// ----------------------------------------------------------------------------

/// State facade driven by user intents
pub struct Garage {
    store: Arc<dyn RemoteStore>,
    events: Arc<EventBus>,
    race: RaceOrchestrator,
    ledger: WinnerLedger,
    config: RaceConfig,
    garage_policy: PagePolicy,
    winners_policy: PagePolicy,
    generator: Mutex<CarGenerator>,
    state: RwLock<GarageState>,
}

impl Garage {
    pub fn builder() -> GarageBuilder {
        GarageBuilder::new()
    }

    pub fn new(
        config: RaceConfig,
        store: Arc<dyn RemoteStore>,
        events: Arc<EventBus>,
        generator: CarGenerator,
    ) -> Self {
        let garage_policy = PagePolicy::new(config.garage.page_size);
        let winners_policy = PagePolicy::new(config.winners.page_size);
        Self {
            race: RaceOrchestrator::new(store.clone(), events.clone()),
            ledger: WinnerLedger::new(store.clone(), events.clone()),
            state: RwLock::new(GarageState {
                garage: GarageSnapshot::empty(garage_policy.page_size()),
                winners: WinnersSnapshot::empty(winners_policy.page_size()),
            }),
            generator: Mutex::new(generator),
            store,
            events,
            config,
            garage_policy,
            winners_policy,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn ledger(&self) -> &WinnerLedger {
        &self.ledger
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    pub fn garage(&self) -> GarageSnapshot {
        self.read().garage.clone()
    }

    pub fn winners(&self) -> WinnersSnapshot {
        self.read().winners.clone()
    }

    pub fn engine_state(&self, car_id: &CarId) -> EngineState {
        self.race.engine_state(car_id)
    }

    // ------------------------------------------------------------------------
    // Garage Intents
    // ------------------------------------------------------------------------

    /// Fetch the first garage page. Publishes nothing.
    pub async fn load(&self) -> RaceResult<()> {
        let (page, listing) = self
            .fetch_garage(FIRST_PAGE, 0, PageAction::Refresh)
            .await
            .map_err(|e| failed("load", e))?;
        self.assign_garage(page, listing, Selection::Keep);
        debug!(page, "garage loaded");
        Ok(())
    }

    pub async fn add_car(&self, car: NewCar) -> RaceResult<Car> {
        car.validate()?;
        let created = self
            .store
            .create_car(&car)
            .await
            .map_err(|e| failed("add car", e))?;

        let (current, on_page) = self.garage_position();
        let (page, listing) = self
            .fetch_garage(current, on_page, PageAction::Add)
            .await
            .map_err(|e| failed("add car", e))?;
        self.assign_garage(page, listing, Selection::Keep);

        info!(car = %created.id, page, "car added");
        self.events.publish(&AppEvent::CarAdded);
        Ok(created)
    }

    /// Delete a car and its winner record, if any.
    pub async fn remove_car(&self, car_id: &CarId) -> RaceResult<()> {
        self.store
            .delete_car(car_id)
            .await
            .map_err(|e| failed("remove car", e))?;
        self.race.forget(car_id);

        if let Err(err) = self.ledger.remove_for(car_id).await {
            warn!(car = %car_id, error = %err, "winner record not reconciled");
        }

        let (current, on_page) = self.garage_position();
        let (page, listing) = self
            .fetch_garage(current, on_page, PageAction::Delete)
            .await
            .map_err(|e| failed("remove car", e))?;
        self.assign_garage(page, listing, Selection::ClearIf(car_id));

        info!(car = %car_id, page, "car removed");
        self.events.publish(&AppEvent::CarDeleted);
        Ok(())
    }

    /// Remember a car for a later [`update_car`](Self::update_car).
    pub async fn select_car(&self, car_id: &CarId) -> RaceResult<Car> {
        let car = self
            .store
            .get_car(car_id)
            .await
            .map_err(|e| failed("select car", e))?;
        self.write().garage.selected = Some(car.id.clone());

        self.events.publish(&AppEvent::CarSelected {
            name: car.name.clone(),
        });
        Ok(car)
    }

    /// Replace the selected car. The selection is cleared afterwards.
    pub async fn update_car(&self, car: NewCar) -> RaceResult<Car> {
        car.validate()?;
        let selected = self.read().garage.selected.clone();
        let car_id = selected.ok_or(RaceError::NoSelection)?;

        let updated = self
            .store
            .update_car(&car_id, &car)
            .await
            .map_err(|e| failed("update car", e))?;

        let (current, on_page) = self.garage_position();
        let (page, listing) = self
            .fetch_garage(current, on_page, PageAction::Update)
            .await
            .map_err(|e| failed("update car", e))?;
        self.assign_garage(page, listing, Selection::Clear);

        info!(car = %car_id, "car updated");
        self.events.publish(&AppEvent::CarUpdated);
        Ok(updated)
    }

    /// Create `count` random cars concurrently. Returns how many were created.
    pub async fn generate_cars(&self, count: usize) -> RaceResult<usize> {
        let cars = self
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cars(count);

        let results = join_all(cars.iter().map(|car| self.store.create_car(car))).await;
        let mut created = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(_) => created += 1,
                Err(err) => {
                    warn!(error = %err, "generated car not created");
                    first_error.get_or_insert(err);
                }
            }
        }
        if created == 0 {
            if let Some(err) = first_error {
                return Err(failed("generate cars", err));
            }
        }

        let (current, on_page) = self.garage_position();
        let (page, listing) = self
            .fetch_garage(current, on_page, PageAction::Refresh)
            .await
            .map_err(|e| failed("generate cars", e))?;
        self.assign_garage(page, listing, Selection::Keep);

        info!(requested = count, created, "cars generated");
        self.events.publish(&AppEvent::CarsGenerated { count: created });
        Ok(created)
    }

    pub async fn next_page(&self) -> RaceResult<u32> {
        let page = self.navigate(PageAction::Next, "next page").await?;
        self.events.publish(&AppEvent::PageAdvanced { page });
        Ok(page)
    }

    pub async fn prev_page(&self) -> RaceResult<u32> {
        let page = self.navigate(PageAction::Prev, "previous page").await?;
        self.events.publish(&AppEvent::PageRetreated { page });
        Ok(page)
    }

    /// Jump to `page`, clamped to the existing pages. Publishes nothing.
    pub async fn go_to_page(&self, page: u32) -> RaceResult<u32> {
        let (page, listing) = self
            .fetch_garage(page.max(FIRST_PAGE), 0, PageAction::Refresh)
            .await
            .map_err(|e| failed("go to page", e))?;
        self.assign_garage(page, listing, Selection::Keep);
        Ok(page)
    }

    // ------------------------------------------------------------------------
    // Engine Intents
    // ------------------------------------------------------------------------

    pub async fn start_engine(&self, car_id: &CarId) -> EngineRun {
        self.race.run_engine(car_id).await
    }

    pub async fn stop_engine(&self, car_id: &CarId) {
        self.race.stop_engine(car_id).await
    }

    /// Race the cars on the current page and record the winner.
    ///
    /// A winner that cannot be written to the ledger is still returned.
    pub async fn race_all(&self) -> RaceOutcome {
        let cars = self.read().garage.cars.clone();
        let ids: Vec<CarId> = cars.iter().map(|car| car.id.clone()).collect();

        let outcome = self.race.race_all(&ids).await;
        if let RaceOutcome::Winner(run) = &outcome {
            let name = cars
                .iter()
                .find(|car| car.id == run.car_id)
                .map(|car| car.name.clone())
                .unwrap_or_else(|| run.car_id.to_string());
            self.events.publish(&AppEvent::WinnerDeclared {
                car_id: run.car_id.clone(),
                name,
                time_ms: run.elapsed_ms,
            });
            if let Err(err) = self.ledger.record_result(&run.car_id, run.elapsed_ms).await {
                warn!(car = %run.car_id, error = %err, "winner not recorded");
            }
        }
        outcome
    }

    /// Return every car on the current page to the start.
    pub async fn reset_all(&self) {
        let ids = self.read().garage.car_ids();
        self.race.reset_all(&ids).await
    }

    // ------------------------------------------------------------------------
    // Winners Intents
    // ------------------------------------------------------------------------

    pub async fn show_winners(&self) -> RaceResult<()> {
        let sort = self.read().winners.sort;
        self.refresh_winners(PageAction::Refresh, sort, "show winners")
            .await
    }

    pub async fn sort_by_wins(&self) -> RaceResult<()> {
        self.sort_winners(SortKey::Wins).await
    }

    pub async fn sort_by_time(&self) -> RaceResult<()> {
        self.sort_winners(SortKey::Time).await
    }

    pub async fn next_winners_page(&self) -> RaceResult<()> {
        let sort = self.read().winners.sort;
        self.refresh_winners(PageAction::Next, sort, "next winners page")
            .await
    }

    pub async fn prev_winners_page(&self) -> RaceResult<()> {
        let sort = self.read().winners.sort;
        self.refresh_winners(PageAction::Prev, sort, "previous winners page")
            .await
    }

    /// Show winners page `page` sorted by `sort`, in one fetch sequence.
    pub async fn show_winners_at(&self, page: u32, sort: SortState) -> RaceResult<()> {
        self.load_winners(page.max(FIRST_PAGE), 0, PageAction::Refresh, sort, "show winners")
            .await
    }

    async fn sort_winners(&self, key: SortKey) -> RaceResult<()> {
        let mut sort = self.read().winners.sort;
        sort.toggle(key);
        self.refresh_winners(PageAction::Refresh, sort, "sort winners")
            .await
    }

    // ------------------------------------------------------------------------
    // Fetch And Assign
    // ------------------------------------------------------------------------

    fn read(&self) -> RwLockReadGuard<'_, GarageState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GarageState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current page and the number of cars shown on it.
    fn garage_position(&self) -> (u32, u32) {
        let state = self.read();
        (state.garage.page, state.garage.cars.len() as u32)
    }

    async fn navigate(&self, action: PageAction, intent: &'static str) -> RaceResult<u32> {
        let (current, on_page) = self.garage_position();
        let (page, listing) = self
            .fetch_garage(current, on_page, action)
            .await
            .map_err(|e| failed(intent, e))?;
        self.assign_garage(page, listing, Selection::Keep);
        debug!(from = current, to = page, "garage page changed");
        Ok(page)
    }

    /// Fetch `current`, pick the next page with the policy and fetch that one
    /// too when it differs.
    async fn fetch_garage(
        &self,
        current: u32,
        items_on_page: u32,
        action: PageAction,
    ) -> RaceResult<(u32, Page<Car>)> {
        let size = self.garage_policy.page_size();
        let listing = self.store.list_cars(current, size).await?;
        let page = self
            .garage_policy
            .next_page(current, listing.total_count, items_on_page, action);
        if page == current {
            return Ok((page, listing));
        }
        let listing = self.store.list_cars(page, size).await?;
        Ok((page, listing))
    }

    fn assign_garage(&self, page: u32, listing: Page<Car>, selection: Selection<'_>) {
        let mut state = self.write();
        let garage = &mut state.garage;
        garage.page = page;
        garage.cars = listing.items;
        garage.total_count = listing.total_count;
        match selection {
            Selection::Keep => {}
            Selection::Clear => garage.selected = None,
            Selection::ClearIf(car_id) => {
                if garage.selected.as_ref() == Some(car_id) {
                    garage.selected = None;
                }
            }
        }
    }

    async fn refresh_winners(
        &self,
        action: PageAction,
        sort: SortState,
        intent: &'static str,
    ) -> RaceResult<()> {
        let (current, on_page) = {
            let state = self.read();
            (state.winners.page, state.winners.rows.len() as u32)
        };
        self.load_winners(current, on_page, action, sort, intent)
            .await
    }

    async fn load_winners(
        &self,
        current: u32,
        on_page: u32,
        action: PageAction,
        sort: SortState,
        intent: &'static str,
    ) -> RaceResult<()> {
        let winners = self
            .fetch_winners(current, on_page, action, sort)
            .await
            .map_err(|e| failed(intent, e))?;

        self.write().winners = winners;
        self.events.publish(&AppEvent::WinnersShown {
            sort_key: sort.key,
            sort_order: sort.order,
        });
        Ok(())
    }

    async fn fetch_winners(
        &self,
        current: u32,
        items_on_page: u32,
        action: PageAction,
        sort: SortState,
    ) -> RaceResult<WinnersSnapshot> {
        let size = self.winners_policy.page_size();
        let mut listing = self
            .store
            .list_winners(&WinnersQuery::new(current, size, sort))
            .await?;
        let page = self
            .winners_policy
            .next_page(current, listing.total_count, items_on_page, action);
        if page != current {
            listing = self
                .store
                .list_winners(&WinnersQuery::new(page, size, sort))
                .await?;
        }

        let cars = self.store.list_all_cars().await?;
        let rows = listing
            .items
            .into_iter()
            .map(|record| WinnerRow {
                car: cars.iter().find(|car| car.id == record.id).cloned(),
                record,
            })
            .collect();

        Ok(WinnersSnapshot {
            rows,
            total_count: listing.total_count,
            page,
            page_size: size,
            sort,
        })
    }
}

impl std::fmt::Debug for Garage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Garage")
            .field("config", &self.config)
            .field("race", &self.race)
            .finish_non_exhaustive()
    }
}
