//! Core domain logic for the habitrack habit tracker.
//! This crate is the single source of truth for habit invariants and the
//! synchronization between the habit collection and screen state.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::habit::{
    Category, Frequency, Habit, HabitFields, HabitId, HabitPatch, HabitValidationError, Priority,
};
pub use repo::habit_repo::{
    HabitRepository, HabitSnapshotHandler, RepoError, RepoResult, SqliteHabitRepository,
};
pub use service::habit_form::{
    FormAction, FormError, FormMode, FormState, HabitFormController, SaveIntent, SaveOutcome,
};
pub use service::habit_list::{HabitListPresenter, HabitRow, Notice, NoticeAction};
pub use service::habit_store::HabitStore;
pub use sync::change_feed::Subscription;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
