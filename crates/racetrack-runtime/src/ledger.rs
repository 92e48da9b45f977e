//! Winner ledger
//!
//! Keeps the remote winners collection in step with race results and garage
//! deletions. The merge rule itself lives on [`WinnerRecord::merge`].

use std::sync::Arc;

use tracing::{debug, info};

use racetrack_core::{
    AppEvent, CarId, EventBus, RaceResult, RemoteStore, WinnerLookup, WinnerRecord,
};

pub const NEW_WINNER_MESSAGE: &str = "New Winner In Table";
pub const WINNER_DELETED_MESSAGE: &str = "Winner was deleted from winners table";
pub const NEVER_WON_MESSAGE: &str = "Deleted car has never won. Winners table remains untouched";

/// What `record_result` wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerUpdate {
    Created(WinnerRecord),
    Updated(WinnerRecord),
}

impl LedgerUpdate {
    pub fn record(&self) -> &WinnerRecord {
        match self {
            LedgerUpdate::Created(record) | LedgerUpdate::Updated(record) => record,
        }
    }
}

/// Reads and writes winner records through the remote store
#[derive(Clone)]
pub struct WinnerLedger {
    store: Arc<dyn RemoteStore>,
    events: Arc<EventBus>,
}

impl WinnerLedger {
    pub fn new(store: Arc<dyn RemoteStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    pub async fn lookup(&self, car_id: &CarId) -> RaceResult<WinnerLookup> {
        self.store.get_winner(car_id).await
    }

    /// Count a win for `car_id`, keeping its best time.
    pub async fn record_result(&self, car_id: &CarId, time_ms: u64) -> RaceResult<LedgerUpdate> {
        match self.lookup(car_id).await? {
            WinnerLookup::NotFound => {
                self.events.publish(&AppEvent::diagnostic(NEW_WINNER_MESSAGE));
                let record = WinnerRecord::merge(None, car_id.clone(), time_ms);
                self.store.create_winner(&record).await?;
                info!(car = %car_id, time_ms, "first win recorded");
                Ok(LedgerUpdate::Created(record))
            }
            WinnerLookup::Found(existing) => {
                let record = WinnerRecord::merge(Some(&existing), car_id.clone(), time_ms);
                self.store.update_winner(&record).await?;
                info!(car = %car_id, wins = record.wins, best_ms = record.time, "win recorded");
                Ok(LedgerUpdate::Updated(record))
            }
        }
    }

    /// Drop the record of a deleted car. Returns whether one existed.
    pub async fn remove_for(&self, car_id: &CarId) -> RaceResult<bool> {
        match self.lookup(car_id).await? {
            WinnerLookup::Found(_) => {
                self.events.publish(&AppEvent::diagnostic(WINNER_DELETED_MESSAGE));
                self.store.delete_winner(car_id).await?;
                debug!(car = %car_id, "winner record removed");
                Ok(true)
            }
            WinnerLookup::NotFound => {
                self.events.publish(&AppEvent::diagnostic(NEVER_WON_MESSAGE));
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for WinnerLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WinnerLedger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use racetrack_core::EventKind;
    use std::sync::Mutex;

    fn ledger() -> (Arc<MemoryStore>, WinnerLedger, Arc<Mutex<Vec<String>>>) {
        let store = Arc::new(MemoryStore::new());
        let events = EventBus::shared();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        events.subscribe(EventKind::Diagnostic, move |event| {
            if let AppEvent::Diagnostic { message } = event {
                sink.lock().unwrap().push(message.clone());
            }
        });
        (store.clone(), WinnerLedger::new(store, events), messages)
    }

    #[tokio::test]
    async fn test_record_result_merges_wins_and_best_time() {
        let (store, ledger, messages) = ledger();
        let id = CarId::from("5");

        let first = ledger.record_result(&id, 4000).await.unwrap();
        assert_eq!(first, LedgerUpdate::Created(WinnerRecord::first_win(id.clone(), 4000)));
        assert_eq!(*messages.lock().unwrap(), vec![NEW_WINNER_MESSAGE.to_string()]);

        let faster = ledger.record_result(&id, 3500).await.unwrap();
        assert_eq!((faster.record().wins, faster.record().time), (2, 3500));

        let slower = ledger.record_result(&id, 9000).await.unwrap();
        assert_eq!((slower.record().wins, slower.record().time), (3, 3500));

        let tied = ledger.record_result(&id, 3500).await.unwrap();
        assert!(matches!(tied, LedgerUpdate::Updated(_)));
        assert_eq!((tied.record().wins, tied.record().time), (4, 3500));
        assert_eq!(store.winner(&id).map(|w| (w.wins, w.time)), Some((4, 3500)));
        // only the first win announces a new row
        assert_eq!(messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_for_reports_both_outcomes() {
        let (store, ledger, messages) = ledger();
        store.insert_winner(WinnerRecord::first_win(CarId::from("1"), 2000));

        assert!(ledger.remove_for(&CarId::from("1")).await.unwrap());
        assert!(!ledger.remove_for(&CarId::from("2")).await.unwrap());
        assert!(store.winners().is_empty());
        assert_eq!(
            *messages.lock().unwrap(),
            vec![
                WINNER_DELETED_MESSAGE.to_string(),
                NEVER_WON_MESSAGE.to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_lookup_transport_error_is_distinct() {
        let (store, ledger, _messages) = ledger();
        store.set_offline(true);
        assert!(ledger.lookup(&CarId::from("1")).await.unwrap_err().is_transport());
        assert!(ledger.record_result(&CarId::from("1"), 100).await.is_err());
    }
}
