#![allow(dead_code)]

use habitrack_core::db::open_db_in_memory;
use habitrack_core::{
    Category, Frequency, Habit, HabitFields, HabitId, HabitPatch, HabitRepository,
    HabitSnapshotHandler, Priority, RepoError, RepoResult, SqliteHabitRepository, Subscription,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub fn memory_repo() -> Arc<SqliteHabitRepository> {
    Arc::new(SqliteHabitRepository::new(open_db_in_memory().unwrap()))
}

pub fn seeded_repo(habits: &[Habit]) -> Arc<SqliteHabitRepository> {
    let repo = memory_repo();
    for habit in habits {
        repo.import_habit(habit).unwrap();
    }
    repo
}

pub fn habit(id: &str, title: &str, streak: u32) -> Habit {
    Habit {
        id: HabitId::parse(id).unwrap(),
        title: title.to_string(),
        category: Category::Health,
        frequency: Frequency::Daily,
        priority: Priority::Medium,
        streak,
    }
}

pub fn read_fields() -> HabitFields {
    HabitFields::new("Read", Category::Learning, Frequency::Daily, Priority::Low)
}

/// Wraps the SQLite repository, counting writes and optionally failing them.
pub struct RecordingRepository {
    inner: SqliteHabitRepository,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl RecordingRepository {
    pub fn new(seed: &[Habit]) -> Self {
        let inner = SqliteHabitRepository::new(open_db_in_memory().unwrap());
        for habit in seed {
            inner.import_habit(habit).unwrap();
        }
        Self {
            inner,
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    fn check_transport(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::InvalidData("transport unavailable".to_string()));
        }
        Ok(())
    }
}

impl HabitRepository for RecordingRepository {
    fn subscribe(&self, handler: HabitSnapshotHandler) -> Subscription {
        self.inner.subscribe(handler)
    }

    fn create_habit(&self, fields: &HabitFields) -> RepoResult<HabitId> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.check_transport()?;
        self.inner.create_habit(fields)
    }

    fn update_habit(&self, id: &HabitId, patch: &HabitPatch) -> RepoResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_transport()?;
        self.inner.update_habit(id, patch)
    }

    fn delete_habit(&self, id: &HabitId) -> RepoResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_transport()?;
        self.inner.delete_habit(id)
    }

    fn list_habits(&self) -> RepoResult<Vec<Habit>> {
        self.inner.list_habits()
    }

    fn deliver_pending(&self) -> usize {
        self.inner.deliver_pending()
    }
}
