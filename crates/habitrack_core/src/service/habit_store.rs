//! Habit store: in-memory reflection of the latest collection snapshot.
//!
//! # Responsibility
//! - Hold exactly one subscription between `start` and `stop`.
//! - Replace the visible sequence wholesale on every delivered snapshot.
//!
//! # Invariants
//! - The visible sequence is always the most recently delivered snapshot;
//!   partial updates are never observable.
//! - Subscription errors keep the last good snapshot visible.
//! - Nothing survives `stop`: a restarted store waits for a fresh snapshot.
//! - A snapshot handed to a stopped subscription's handler is dropped, even
//!   when a delivery on another thread was already underway.

use crate::model::habit::{Habit, HabitId};
use crate::repo::habit_repo::{HabitRepository, RepoError};
use crate::sync::change_feed::Subscription;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct StoreState {
    /// Bumped by `stop`; handlers of older subscriptions carry a stale value.
    generation: u64,
    habits: Vec<Habit>,
    loaded: bool,
    snapshots_received: u64,
    last_error: Option<String>,
}

/// Snapshot-backed cache consumed by the list presenter.
pub struct HabitStore<R: HabitRepository> {
    repo: Arc<R>,
    state: Arc<Mutex<StoreState>>,
    subscription: Option<Subscription>,
}

impl<R: HabitRepository> HabitStore<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            state: Arc::new(Mutex::new(StoreState::default())),
            subscription: None,
        }
    }

    /// Opens the single subscription backing this store.
    ///
    /// Calling `start` while already started keeps the existing subscription.
    pub fn start(&mut self) {
        if self.subscription.is_some() {
            debug!("event=store_start module=store status=skipped reason=already_started");
            return;
        }

        let state = Arc::clone(&self.state);
        let generation = lock_state(&self.state).generation;
        let subscription = self.repo.subscribe(Box::new(
            move |snapshot: Result<&[Habit], &RepoError>| {
                apply_snapshot(&state, generation, snapshot);
            },
        ));
        info!(
            "event=store_start module=store status=ok subscription_id={}",
            subscription.id()
        );
        self.subscription = Some(subscription);
    }

    /// Releases the subscription and forgets cached records.
    ///
    /// Idempotent; safe without a prior `start` and from inside a snapshot
    /// handler. No snapshot is applied after this returns.
    pub fn stop(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        subscription.cancel();
        {
            let mut state = lock_state(&self.state);
            let generation = state.generation + 1;
            *state = StoreState {
                generation,
                ..StoreState::default()
            };
        }
        info!(
            "event=store_stop module=store status=ok subscription_id={}",
            subscription.id()
        );
    }

    pub fn is_started(&self) -> bool {
        self.subscription.is_some()
    }

    /// Whether at least one snapshot arrived since `start`.
    pub fn is_loaded(&self) -> bool {
        lock_state(&self.state).loaded
    }

    /// Copy of the visible sequence, in snapshot order.
    pub fn habits(&self) -> Vec<Habit> {
        lock_state(&self.state).habits.clone()
    }

    pub fn get(&self, id: &HabitId) -> Option<Habit> {
        lock_state(&self.state)
            .habits
            .iter()
            .find(|habit| &habit.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        lock_state(&self.state).habits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshots_received(&self) -> u64 {
        lock_state(&self.state).snapshots_received
    }

    /// Message of the most recent subscription error, cleared by the next
    /// good snapshot.
    pub fn last_error(&self) -> Option<String> {
        lock_state(&self.state).last_error.clone()
    }
}

impl<R: HabitRepository> Drop for HabitStore<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn apply_snapshot(
    state: &Mutex<StoreState>,
    generation: u64,
    snapshot: Result<&[Habit], &RepoError>,
) {
    let mut state = lock_state(state);
    if state.generation != generation {
        debug!(
            "event=store_snapshot module=store status=skipped reason=stopped generation={generation}"
        );
        return;
    }
    match snapshot {
        Ok(habits) => {
            state.habits = habits.to_vec();
            state.loaded = true;
            state.snapshots_received += 1;
            state.last_error = None;
            debug!(
                "event=store_snapshot module=store status=ok count={}",
                habits.len()
            );
        }
        Err(err) => {
            state.last_error = Some(err.to_string());
            warn!(
                "event=store_snapshot module=store status=error error_code={} kept_count={} error={}",
                err.code(),
                state.habits.len(),
                err
            );
        }
    }
}

fn lock_state(state: &Mutex<StoreState>) -> MutexGuard<'_, StoreState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{apply_snapshot, lock_state, HabitStore, StoreState};
    use crate::db::open_db_in_memory;
    use crate::model::habit::{Category, Frequency, Habit, HabitId, Priority};
    use crate::repo::habit_repo::SqliteHabitRepository;
    use std::sync::{Arc, Mutex};

    fn meditate() -> Habit {
        Habit {
            id: HabitId::parse("a").unwrap(),
            title: "Meditate".to_string(),
            category: Category::Wellbeing,
            frequency: Frequency::Daily,
            priority: Priority::High,
            streak: 2,
        }
    }

    #[test]
    fn snapshot_for_older_generation_is_dropped() {
        let state = Mutex::new(StoreState {
            generation: 1,
            ..StoreState::default()
        });

        let records = vec![meditate()];
        apply_snapshot(&state, 0, Ok(records.as_slice()));
        assert!(lock_state(&state).habits.is_empty());
        assert!(!lock_state(&state).loaded);

        apply_snapshot(&state, 1, Ok(records.as_slice()));
        assert_eq!(lock_state(&state).habits, vec![meditate()]);
    }

    #[test]
    fn late_handler_call_after_stop_leaves_store_empty() {
        let repo = Arc::new(SqliteHabitRepository::new(open_db_in_memory().unwrap()));
        repo.import_habit(&meditate()).unwrap();
        let mut store = HabitStore::new(Arc::clone(&repo));
        store.start();
        let started_generation = lock_state(&store.state).generation;

        store.stop();
        // A delivery that passed the cancel check before `stop` finishes
        // calls the handler with the generation it captured at `start`.
        let records = vec![meditate()];
        apply_snapshot(&store.state, started_generation, Ok(records.as_slice()));

        assert!(store.is_empty());
        assert!(!store.is_loaded());
        assert_eq!(store.snapshots_received(), 0);
    }
}
