//! Garage Facade Integration Tests
//!
//! Intent flows end to end against the in-memory store: page bookkeeping,
//! selection, ledger reconciliation, winners sorting and failure handling.

use std::sync::{Arc, Mutex};

use racetrack_core::{
    AppEvent, CarId, EngineState, EventKind, GarageConfig, NewCar, RaceConfig, RaceError,
    RaceOutcome, SortKey, SortOrder, SortState, WinnerRecord, WinnersConfig,
};
use racetrack_runtime::{EngineScript, Garage, MemoryStore};

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

struct GarageFixture {
    store: Arc<MemoryStore>,
    garage: Garage,
    seen: Arc<Mutex<Vec<AppEvent>>>,
}

impl GarageFixture {
    fn kinds(&self) -> Vec<EventKind> {
        self.seen.lock().unwrap().iter().map(AppEvent::kind).collect()
    }

    fn diagnostics(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                AppEvent::Diagnostic { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

fn test_config() -> RaceConfig {
    RaceConfig::default()
        .with_garage(GarageConfig {
            page_size: 7,
            generate_count: 5,
        })
        .with_winners(WinnersConfig { page_size: 2 })
}

async fn create_test_garage(cars: usize) -> GarageFixture {
    let store = Arc::new(MemoryStore::with_cars(
        (0..cars).map(|i| NewCar::new(format!("Car {}", i + 1), "#336699")),
    ));
    let garage = Garage::builder()
        .with_config(test_config())
        .with_store(store.clone())
        .with_seed(11)
        .build()
        .expect("valid test config");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    garage
        .events()
        .subscribe_all(move |event| sink.lock().unwrap().push(event.clone()));

    garage.load().await.expect("initial load");
    GarageFixture {
        store,
        garage,
        seen,
    }
}

fn new_car(name: &str) -> NewCar {
    NewCar::new(name, "#abcdef")
}

// ----------------------------------------------------------------------------
// Pagination Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_load_fetches_first_page_silently() {
    let fixture = create_test_garage(9).await;
    let snapshot = fixture.garage.garage();
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.cars.len(), 7);
    assert_eq!(snapshot.total_count, 9);
    assert_eq!(snapshot.last_page(), 2);
    assert!(fixture.kinds().is_empty());
}

#[tokio::test]
async fn test_add_filling_page_moves_to_last_page() {
    let fixture = create_test_garage(7).await;

    fixture.garage.add_car(new_car("Eighth")).await.unwrap();

    let snapshot = fixture.garage.garage();
    assert_eq!(snapshot.page, 2);
    assert_eq!(snapshot.total_count, 8);
    assert_eq!(snapshot.cars.len(), 1);
    assert_eq!(snapshot.cars[0].name, "Eighth");
    assert_eq!(fixture.kinds(), vec![EventKind::CarAdded]);
}

#[tokio::test]
async fn test_add_with_room_keeps_page() {
    let fixture = create_test_garage(3).await;
    fixture.garage.add_car(new_car("Fourth")).await.unwrap();
    let snapshot = fixture.garage.garage();
    assert_eq!((snapshot.page, snapshot.cars.len()), (1, 4));
}

#[tokio::test]
async fn test_deleting_only_car_on_page_steps_back() {
    let fixture = create_test_garage(8).await;
    assert_eq!(fixture.garage.next_page().await.unwrap(), 2);

    fixture.garage.remove_car(&CarId::from(8u64)).await.unwrap();

    let snapshot = fixture.garage.garage();
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.total_count, 7);
    assert_eq!(
        fixture.kinds(),
        vec![
            EventKind::PageAdvanced,
            EventKind::Diagnostic,
            EventKind::CarDeleted
        ]
    );
}

#[tokio::test]
async fn test_deleting_with_others_on_page_keeps_page() {
    let fixture = create_test_garage(9).await;
    fixture.garage.next_page().await.unwrap();
    fixture.garage.remove_car(&CarId::from(9u64)).await.unwrap();
    assert_eq!(fixture.garage.garage().page, 2);
}

#[tokio::test]
async fn test_page_navigation_is_bounded() {
    let fixture = create_test_garage(8).await;

    assert_eq!(fixture.garage.prev_page().await.unwrap(), 1);
    assert_eq!(fixture.garage.next_page().await.unwrap(), 2);
    assert_eq!(fixture.garage.next_page().await.unwrap(), 2);

    let seen = fixture.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            AppEvent::PageRetreated { page: 1 },
            AppEvent::PageAdvanced { page: 2 },
            AppEvent::PageAdvanced { page: 2 },
        ]
    );
}

#[tokio::test]
async fn test_go_to_page_is_clamped() {
    let fixture = create_test_garage(8).await;
    assert_eq!(fixture.garage.go_to_page(9).await.unwrap(), 2);
    assert_eq!(fixture.garage.go_to_page(0).await.unwrap(), 1);
}

// ----------------------------------------------------------------------------
// Selection And Validation Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_select_then_update() {
    let fixture = create_test_garage(2).await;
    let id = CarId::from(2u64);

    let selected = fixture.garage.select_car(&id).await.unwrap();
    assert_eq!(selected.name, "Car 2");
    assert_eq!(fixture.garage.garage().selected, Some(id.clone()));

    fixture.garage.update_car(new_car("Renamed")).await.unwrap();

    let snapshot = fixture.garage.garage();
    assert_eq!(snapshot.car(&id).map(|c| c.name.as_str()), Some("Renamed"));
    assert_eq!(snapshot.selected, None);
    assert_eq!(
        fixture.seen.lock().unwrap().clone(),
        vec![
            AppEvent::CarSelected {
                name: "Car 2".to_string()
            },
            AppEvent::CarUpdated,
        ]
    );
}

#[tokio::test]
async fn test_update_without_selection_is_rejected() {
    let fixture = create_test_garage(1).await;
    let before = fixture.store.request_count();

    let err = fixture.garage.update_car(new_car("Nope")).await.unwrap_err();
    assert!(matches!(err, RaceError::NoSelection));
    assert_eq!(fixture.store.request_count(), before);
    assert!(fixture.kinds().is_empty());
}

#[tokio::test]
async fn test_invalid_car_never_reaches_store() {
    let fixture = create_test_garage(1).await;
    let before = fixture.store.request_count();
    let snapshot = fixture.garage.garage();

    let err = fixture.garage.add_car(NewCar::new("  ", "#ffffff")).await.unwrap_err();
    assert!(matches!(err, RaceError::Validation { field: "name", .. }));
    let err = fixture.garage.add_car(NewCar::new("Ok", "blue")).await.unwrap_err();
    assert!(err.is_validation());

    assert_eq!(fixture.store.request_count(), before);
    assert_eq!(fixture.garage.garage(), snapshot);
    assert!(fixture.kinds().is_empty());
}

#[tokio::test]
async fn test_transport_failure_leaves_state_untouched() {
    let fixture = create_test_garage(3).await;
    let snapshot = fixture.garage.garage();
    fixture.store.set_offline(true);

    let err = fixture.garage.add_car(new_car("Lost")).await.unwrap_err();
    assert!(err.is_transport());
    assert!(fixture.garage.next_page().await.is_err());
    assert!(fixture.garage.show_winners().await.is_err());

    assert_eq!(fixture.garage.garage(), snapshot);
    assert!(fixture.kinds().is_empty());
}

// ----------------------------------------------------------------------------
// Generation Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_generate_cars_creates_requested_count() {
    let fixture = create_test_garage(0).await;

    let created = fixture.garage.generate_cars(10).await.unwrap();
    assert_eq!(created, 10);

    let snapshot = fixture.garage.garage();
    assert_eq!(snapshot.total_count, 10);
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.cars.len(), 7);
    assert!(snapshot.cars.iter().all(|car| car.color != "#69696b"));
    assert_eq!(
        fixture.seen.lock().unwrap().clone(),
        vec![AppEvent::CarsGenerated { count: 10 }]
    );
}

// ----------------------------------------------------------------------------
// Race And Ledger Tests
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_race_winner_is_declared_and_recorded() {
    let fixture = create_test_garage(3).await;
    fixture.store.script(1u64, EngineScript::finishes_in(300));
    fixture.store.script(2u64, EngineScript::finishes_in(120));
    fixture.store.script(3u64, EngineScript::breaks_after(10));

    let outcome = fixture.garage.race_all().await;
    assert_eq!(outcome.winner().map(|w| w.car_id.clone()), Some(CarId::from(2u64)));

    let declared: Vec<AppEvent> = fixture
        .seen
        .lock()
        .unwrap()
        .iter()
        .filter(|event| event.kind() == EventKind::WinnerDeclared)
        .cloned()
        .collect();
    assert_eq!(
        declared,
        vec![AppEvent::WinnerDeclared {
            car_id: CarId::from(2u64),
            name: "Car 2".to_string(),
            time_ms: 120,
        }]
    );
    assert!(fixture
        .diagnostics()
        .contains(&"New Winner In Table".to_string()));
    assert_eq!(
        fixture.store.winner(&CarId::from(2u64)),
        Some(WinnerRecord::first_win(CarId::from(2u64), 120))
    );
}

#[tokio::test(start_paused = true)]
async fn test_race_without_finisher_declares_nothing() {
    let fixture = create_test_garage(2).await;
    fixture.store.script(1u64, EngineScript::breaks_after(50));
    fixture.store.script(2u64, EngineScript::rejects(500));

    let outcome = fixture.garage.race_all().await;
    assert!(matches!(outcome, RaceOutcome::NoWinner { attempted: 2, .. }));
    assert!(!fixture.kinds().contains(&EventKind::WinnerDeclared));
    assert!(fixture.store.winners().is_empty());
}

#[tokio::test]
async fn test_removing_winner_cleans_ledger() {
    let fixture = create_test_garage(2).await;
    fixture
        .store
        .insert_winner(WinnerRecord::first_win(CarId::from(1u64), 900));

    fixture.garage.remove_car(&CarId::from(1u64)).await.unwrap();
    fixture.garage.remove_car(&CarId::from(2u64)).await.unwrap();

    assert!(fixture.store.winners().is_empty());
    assert_eq!(
        fixture.diagnostics(),
        vec![
            "Winner was deleted from winners table".to_string(),
            "Deleted car has never won. Winners table remains untouched".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_removed_car_loses_engine_state() {
    let fixture = create_test_garage(2).await;
    let car = CarId::from(1u64);
    fixture.store.script(1u64, EngineScript::finishes_in(100));

    fixture.garage.start_engine(&car).await;
    assert_eq!(fixture.garage.engine_state(&car), EngineState::Finished);

    fixture.garage.remove_car(&car).await.unwrap();
    assert_eq!(fixture.garage.engine_state(&car), EngineState::Idle);
}

// ----------------------------------------------------------------------------
// Winners View Tests
// ----------------------------------------------------------------------------

async fn create_test_winners() -> GarageFixture {
    let fixture = create_test_garage(3).await;
    for (id, wins, time) in [(1u64, 1, 3000), (2, 4, 2500), (3, 2, 1800)] {
        fixture.store.insert_winner(WinnerRecord {
            id: CarId::from(id),
            wins,
            time,
        });
    }
    fixture
}

#[tokio::test]
async fn test_show_winners_resolves_cars() {
    let fixture = create_test_winners().await;
    fixture.garage.show_winners().await.unwrap();

    let winners = fixture.garage.winners();
    assert_eq!(winners.total_count, 3);
    assert_eq!(winners.last_page(), 2);
    assert_eq!(winners.rows.len(), 2);
    assert_eq!(winners.rows[0].record.id, CarId::from(2u64));
    assert_eq!(
        winners.rows[0].car.as_ref().map(|c| c.name.as_str()),
        Some("Car 2")
    );
    assert_eq!(
        fixture.seen.lock().unwrap().clone(),
        vec![AppEvent::WinnersShown {
            sort_key: SortKey::Wins,
            sort_order: SortOrder::Desc
        }]
    );
}

#[tokio::test]
async fn test_sort_toggle_flips_direction() {
    let fixture = create_test_winners().await;

    fixture.garage.sort_by_wins().await.unwrap();
    assert_eq!(fixture.garage.winners().sort.order, SortOrder::Asc);
    assert_eq!(fixture.garage.winners().rows[0].record.id, CarId::from(1u64));

    fixture.garage.sort_by_wins().await.unwrap();
    assert_eq!(fixture.garage.winners().sort.order, SortOrder::Desc);

    // changing the column flips the shared direction as well
    fixture.garage.sort_by_time().await.unwrap();
    let winners = fixture.garage.winners();
    assert_eq!((winners.sort.key, winners.sort.order), (SortKey::Time, SortOrder::Asc));
    assert_eq!(winners.rows[0].record.id, CarId::from(3u64));
}

#[tokio::test]
async fn test_winners_pages_are_bounded() {
    let fixture = create_test_winners().await;
    fixture.garage.show_winners().await.unwrap();

    fixture.garage.next_winners_page().await.unwrap();
    assert_eq!(fixture.garage.winners().page, 2);
    assert_eq!(fixture.garage.winners().rows.len(), 1);

    fixture.garage.next_winners_page().await.unwrap();
    assert_eq!(fixture.garage.winners().page, 2);

    fixture.garage.prev_winners_page().await.unwrap();
    fixture.garage.prev_winners_page().await.unwrap();
    assert_eq!(fixture.garage.winners().page, 1);
    assert_eq!(fixture.kinds().len(), 5);
}

#[tokio::test]
async fn test_deleted_winner_car_is_unresolved() {
    let fixture = create_test_winners().await;
    fixture
        .store
        .insert_winner(WinnerRecord::first_win(CarId::from(77u64), 100));

    fixture
        .garage
        .show_winners_at(1, SortState {
            key: SortKey::Time,
            order: SortOrder::Asc,
        })
        .await
        .unwrap();
    let winners = fixture.garage.winners();
    assert_eq!(winners.rows[0].record.id, CarId::from(77u64));
    assert!(winners.rows[0].car.is_none());
}
