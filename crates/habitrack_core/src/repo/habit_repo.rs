//! Habit repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/update/delete/subscribe over the `habits` collection.
//! - Push a full snapshot to every live subscriber after each committed
//!   change, including changes made by this same process.
//!
//! # Invariants
//! - Write paths validate input before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Snapshots list records in insertion order.
//! - Deleting a missing id succeeds and publishes nothing.

use crate::db::DbError;
use crate::model::habit::{
    Category, Frequency, Habit, HabitFields, HabitId, HabitPatch, HabitValidationError, Priority,
};
use crate::sync::change_feed::{ChangeFeed, SnapshotHandler, Subscription};
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const HABIT_SELECT_SQL: &str = "SELECT
    id,
    title,
    category,
    frequency,
    priority,
    streak
FROM habits";

pub type RepoResult<T> = Result<T, RepoError>;

/// Snapshot callback specialized for habit records.
pub type HabitSnapshotHandler = SnapshotHandler<Habit, RepoError>;

/// Generic repository error for habit persistence and feed operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(HabitValidationError),
    Db(DbError),
    NotFound(HabitId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "habit not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted habit data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl RepoError {
    /// Short stable code used in log lines and UI notices.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::Db(_) => "db_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl From<HabitValidationError> for RepoError {
    fn from(value: HabitValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface over a remote-style habit collection.
///
/// Writes never update callers directly: the resulting state reaches them
/// through the next snapshot of every subscription.
pub trait HabitRepository {
    /// Opens a live feed. The current contents are queued immediately and
    /// every later commit queues another full snapshot.
    fn subscribe(&self, handler: HabitSnapshotHandler) -> Subscription;

    /// Appends a record with `streak = 0` and a repository-assigned id.
    fn create_habit(&self, fields: &HabitFields) -> RepoResult<HabitId>;

    /// Merges `patch` into the record at `id`.
    fn update_habit(&self, id: &HabitId, patch: &HabitPatch) -> RepoResult<()>;

    /// Removes the record at `id`; a missing id is a successful no-op.
    fn delete_habit(&self, id: &HabitId) -> RepoResult<()>;

    /// Reads the current contents in snapshot order.
    fn list_habits(&self) -> RepoResult<Vec<Habit>>;

    /// Delivers queued snapshots to live subscribers in commit order.
    ///
    /// Returns the number of handler invocations. Called by the host event
    /// loop; a nested call from inside a handler returns `0` and leaves the
    /// remaining queue to the outer call.
    fn deliver_pending(&self) -> usize;
}

/// SQLite-backed habit collection with an in-process change feed.
pub struct SqliteHabitRepository {
    conn: Mutex<Connection>,
    feed: Mutex<ChangeFeed<Habit, RepoError>>,
    delivering: AtomicBool,
}

impl SqliteHabitRepository {
    /// Wraps a bootstrapped connection (see `db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            feed: Mutex::new(ChangeFeed::new()),
            delivering: AtomicBool::new(false),
        }
    }

    /// Inserts a record with a caller-provided id and streak.
    ///
    /// Used by import/seed paths where identity already exists externally.
    pub fn import_habit(&self, habit: &Habit) -> RepoResult<()> {
        habit.validate()?;
        self.lock_conn().execute(
            "INSERT INTO habits (id, title, category, frequency, priority, streak)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                habit.id.as_str(),
                habit.title.trim(),
                habit.category.as_str(),
                habit.frequency.as_str(),
                habit.priority.as_str(),
                i64::from(habit.streak),
            ],
        )?;

        info!("event=habit_import module=repo status=ok habit_id={}", habit.id);
        self.publish_snapshot();
        Ok(())
    }

    /// Reads one record by id.
    pub fn get_habit(&self, id: &HabitId) -> RepoResult<Option<Habit>> {
        let conn = self.lock_conn();
        query_habit(&conn, id)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock_feed().subscriber_count()
    }

    /// Number of snapshots waiting for `deliver_pending`.
    pub fn pending_deliveries(&self) -> usize {
        self.lock_feed().pending_len()
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_feed(&self) -> MutexGuard<'_, ChangeFeed<Habit, RepoError>> {
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads and queues the current collection.
    ///
    /// Feed lock first, then the connection (same order as `subscribe`), so
    /// concurrent writers queue snapshots in the order they were read and the
    /// last one queued reflects every committed write. Callers must not hold
    /// the connection lock.
    fn publish_snapshot(&self) {
        let mut feed = self.lock_feed();
        let snapshot = self.list_habits();
        if let Err(err) = &snapshot {
            error!(
                "event=habit_snapshot module=repo status=error error_code={} error={}",
                err.code(),
                err
            );
        }
        feed.publish(snapshot);
    }
}

impl HabitRepository for SqliteHabitRepository {
    fn subscribe(&self, handler: HabitSnapshotHandler) -> Subscription {
        // Holding the feed lock pins the initial snapshot to the current
        // commit sequence.
        let mut feed = self.lock_feed();
        let initial = self.list_habits();
        let subscription = feed.subscribe(handler, initial);
        drop(feed);
        debug!(
            "event=habit_subscribe module=repo status=ok subscription_id={}",
            subscription.id()
        );
        subscription
    }

    fn create_habit(&self, fields: &HabitFields) -> RepoResult<HabitId> {
        fields.validate()?;
        let habit = Habit::from_fields(HabitId::generate(), fields.normalized());

        self.lock_conn().execute(
            "INSERT INTO habits (id, title, category, frequency, priority, streak)
             VALUES (?1, ?2, ?3, ?4, ?5, 0);",
            params![
                habit.id.as_str(),
                habit.title.as_str(),
                habit.category.as_str(),
                habit.frequency.as_str(),
                habit.priority.as_str(),
            ],
        )?;

        info!("event=habit_create module=repo status=ok habit_id={}", habit.id);
        self.publish_snapshot();
        Ok(habit.id)
    }

    fn update_habit(&self, id: &HabitId, patch: &HabitPatch) -> RepoResult<()> {
        patch.validate()?;

        {
            let conn = self.lock_conn();
            let mut habit = query_habit(&conn, id)?.ok_or_else(|| RepoError::NotFound(id.clone()))?;
            patch.apply_to(&mut habit);

            let changed = conn.execute(
                "UPDATE habits
                 SET
                    title = ?1,
                    category = ?2,
                    frequency = ?3,
                    priority = ?4,
                    streak = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?6;",
                params![
                    habit.title.as_str(),
                    habit.category.as_str(),
                    habit.frequency.as_str(),
                    habit.priority.as_str(),
                    i64::from(habit.streak),
                    id.as_str(),
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(id.clone()));
            }
        }

        info!("event=habit_update module=repo status=ok habit_id={id}");
        self.publish_snapshot();
        Ok(())
    }

    fn delete_habit(&self, id: &HabitId) -> RepoResult<()> {
        let changed = self
            .lock_conn()
            .execute("DELETE FROM habits WHERE id = ?1;", [id.as_str()])?;

        if changed == 0 {
            debug!("event=habit_delete module=repo status=noop habit_id={id}");
            return Ok(());
        }

        info!("event=habit_delete module=repo status=ok habit_id={id}");
        self.publish_snapshot();
        Ok(())
    }

    fn list_habits(&self) -> RepoResult<Vec<Habit>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(&format!("{HABIT_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut habits = Vec::new();

        while let Some(row) = rows.next()? {
            habits.push(parse_habit_row(row)?);
        }

        Ok(habits)
    }

    fn deliver_pending(&self) -> usize {
        if self.delivering.swap(true, Ordering::SeqCst) {
            return 0;
        }

        let mut delivered = 0;
        loop {
            // Feed lock is released before handlers run so they may write.
            let next = self.lock_feed().next_delivery();
            match next {
                Some(delivery) => delivered += delivery.deliver(),
                None => break,
            }
        }

        self.delivering.store(false, Ordering::SeqCst);
        delivered
    }
}

fn query_habit(conn: &Connection, id: &HabitId) -> RepoResult<Option<Habit>> {
    let mut stmt = conn.prepare(&format!("{HABIT_SELECT_SQL} WHERE id = ?1;"))?;
    let habit = stmt
        .query_row([id.as_str()], |row| Ok(parse_habit_row(row)))
        .optional()?;
    habit.transpose()
}

fn parse_habit_row(row: &Row<'_>) -> RepoResult<Habit> {
    let id_text: String = row.get("id")?;
    let id = HabitId::parse(id_text.as_str()).map_err(|_| {
        RepoError::InvalidData(format!("invalid id value `{id_text}` in habits.id"))
    })?;

    let category_text: String = row.get("category")?;
    let category = Category::parse(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in habits.category"
        ))
    })?;

    let frequency_text: String = row.get("frequency")?;
    let frequency = Frequency::parse(&frequency_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid frequency `{frequency_text}` in habits.frequency"
        ))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = Priority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in habits.priority"
        ))
    })?;

    let streak_value: i64 = row.get("streak")?;
    let streak = u32::try_from(streak_value).map_err(|_| {
        RepoError::InvalidData(format!("invalid streak `{streak_value}` in habits.streak"))
    })?;

    let habit = Habit {
        id,
        title: row.get("title")?,
        category,
        frequency,
        priority,
        streak,
    };
    habit.validate()?;
    Ok(habit)
}

#[cfg(test)]
mod tests {
    use super::{HabitRepository, RepoError, SqliteHabitRepository};
    use crate::db::open_db_in_memory;
    use crate::model::habit::{Habit, HabitId};
    use std::sync::{Arc, Mutex};

    #[test]
    fn nested_delivery_from_handler_is_ignored() {
        let repo = Arc::new(SqliteHabitRepository::new(open_db_in_memory().unwrap()));
        let nested_counts = Arc::new(Mutex::new(Vec::new()));

        let inner_repo = Arc::clone(&repo);
        let inner_counts = Arc::clone(&nested_counts);
        let _subscription = repo.subscribe(Box::new(
            move |_snapshot: Result<&[Habit], &RepoError>| {
                inner_counts
                    .lock()
                    .unwrap()
                    .push(inner_repo.deliver_pending());
            },
        ));

        assert_eq!(repo.deliver_pending(), 1);
        assert_eq!(*nested_counts.lock().unwrap(), vec![0]);
    }

    #[test]
    fn corrupted_streak_is_reported_as_invalid_data() {
        let repo = SqliteHabitRepository::new(open_db_in_memory().unwrap());
        repo.lock_conn()
            .execute_batch(
                "PRAGMA ignore_check_constraints = ON;
                 INSERT INTO habits (id, title, category, frequency, priority, streak)
                 VALUES ('x', 'Stretch', 'health', 'daily', 'low', -3);",
            )
            .unwrap();

        let err = repo
            .get_habit(&HabitId::parse("x").unwrap())
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(message) if message.contains("streak")));
    }
}
