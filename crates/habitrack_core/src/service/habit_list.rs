//! Habit list presenter.
//!
//! # Responsibility
//! - Bind the habit store to the list screen lifecycle (mount/unmount).
//! - Relay add/edit intents to the form and delete intents to the repository.
//! - Surface failed writes as non-blocking notices.
//!
//! # Invariants
//! - Rows are derived from the store only; local writes show up after the
//!   next delivered snapshot.
//! - Repository failures are reported, never retried, and never clear rows.

use crate::model::habit::{Category, Frequency, Habit, HabitId, Priority};
use crate::repo::habit_repo::HabitRepository;
use crate::service::habit_form::{FormError, HabitFormController, SaveOutcome};
use crate::service::habit_store::HabitStore;
use log::{error, info, warn};
use std::sync::Arc;

/// Render model for one habit row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitRow {
    pub id: HabitId,
    pub title: String,
    pub category_label: &'static str,
    pub frequency_label: &'static str,
    pub priority: Priority,
    pub accent_colors: [&'static str; 2],
    pub streak: u32,
}

impl From<&Habit> for HabitRow {
    fn from(habit: &Habit) -> Self {
        Self {
            id: habit.id.clone(),
            title: habit.title.clone(),
            category_label: habit.category.label(),
            frequency_label: habit.frequency.label(),
            priority: habit.priority,
            accent_colors: habit.priority.accent_colors(),
            streak: habit.streak,
        }
    }
}

/// User action that produced a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
    Create,
    Update,
    Delete,
    Sync,
}

/// Non-blocking, user-visible error report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub action: NoticeAction,
    pub message: String,
}

/// Presenter for the habits screen.
pub struct HabitListPresenter<R: HabitRepository> {
    repo: Arc<R>,
    store: HabitStore<R>,
    form: HabitFormController,
    notices: Vec<Notice>,
    reported_sync_error: Option<String>,
}

impl<R: HabitRepository> HabitListPresenter<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            store: HabitStore::new(Arc::clone(&repo)),
            repo,
            form: HabitFormController::new(),
            notices: Vec::new(),
            reported_sync_error: None,
        }
    }

    /// Screen became visible: subscribe the store.
    pub fn mount(&mut self) {
        self.store.start();
    }

    /// Screen went away: unsubscribe and drop transient state.
    pub fn unmount(&mut self) {
        self.store.stop();
        self.form.cancel();
        self.reported_sync_error = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.store.is_started()
    }

    /// Drains queued snapshots into the store.
    ///
    /// A new subscription error becomes a `Sync` notice; rows stay as they
    /// were.
    pub fn refresh(&mut self) -> usize {
        let delivered = self.repo.deliver_pending();
        match self.store.last_error() {
            Some(message) if self.reported_sync_error.as_ref() != Some(&message) => {
                self.push_notice(NoticeAction::Sync, message.clone());
                self.reported_sync_error = Some(message);
            }
            Some(_) => {}
            None => self.reported_sync_error = None,
        }
        delivered
    }

    pub fn store(&self) -> &HabitStore<R> {
        &self.store
    }

    pub fn rows(&self) -> Vec<HabitRow> {
        self.store.habits().iter().map(HabitRow::from).collect()
    }

    /// Header subtitle, e.g. `"3 habits in progress"`.
    pub fn subtitle(&self) -> String {
        let count = self.store.len();
        let noun = if count > 1 { "habits" } else { "habit" };
        format!("{count} {noun} in progress")
    }

    pub fn form(&self) -> &HabitFormController {
        &self.form
    }

    /// "Add" button: open an empty Create-mode form.
    pub fn on_add(&mut self) {
        self.form.open(None);
    }

    /// Row tap: open the form bound to the stored record.
    ///
    /// Returns `false` when `id` is not in the current snapshot.
    pub fn on_edit(&mut self, id: &HabitId) -> bool {
        match self.store.get(id) {
            Some(habit) => {
                self.form.open(Some(&habit));
                true
            }
            None => {
                warn!("event=list_edit module=presenter status=skipped reason=unknown_id habit_id={id}");
                false
            }
        }
    }

    pub fn on_title_changed(&mut self, title: impl Into<String>) {
        self.form.set_title(title);
    }

    pub fn on_category_selected(&mut self, category: Category) {
        self.form.set_category(category);
    }

    pub fn on_frequency_selected(&mut self, frequency: Frequency) {
        self.form.set_frequency(frequency);
    }

    pub fn on_priority_selected(&mut self, priority: Priority) {
        self.form.set_priority(priority);
    }

    /// Confirm button. Repository failures become notices and keep the form
    /// open for an explicit retry.
    pub fn on_save(&mut self) -> Result<SaveOutcome, FormError> {
        let action = if self.form.state().is_editing() {
            NoticeAction::Update
        } else {
            NoticeAction::Create
        };
        let result = self.form.save(self.repo.as_ref());
        if let Err(FormError::Repository(err)) = &result {
            self.push_notice(action, err.to_string());
        }
        result
    }

    pub fn on_cancel(&mut self) {
        self.form.cancel();
    }

    /// Trash button: delete immediately, report failure, do not retry.
    pub fn on_delete(&mut self, id: &HabitId) {
        match self.repo.delete_habit(id) {
            Ok(()) => info!("event=list_delete module=presenter status=ok habit_id={id}"),
            Err(err) => {
                error!(
                    "event=list_delete module=presenter status=error habit_id={} error_code={} error={}",
                    id,
                    err.code(),
                    err
                );
                self.push_notice(NoticeAction::Delete, err.to_string());
            }
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Hands pending notices to the UI, clearing them.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn push_notice(&mut self, action: NoticeAction, message: String) {
        self.notices.push(Notice { action, message });
    }
}
