//! Habit form controller.
//!
//! # Responsibility
//! - Hold the transient create/edit draft behind the habit editor.
//! - Turn a valid draft into exactly one repository write.
//!
//! # Invariants
//! - State transitions are pure (`FormState::reduce`); only `save` talks to
//!   the repository.
//! - A blank title never reaches the repository.
//! - The closed state always carries Create-mode defaults.
//! - A failed write leaves the form open with the draft intact.

use crate::model::habit::{
    Category, Frequency, Habit, HabitFields, HabitId, HabitPatch, HabitValidationError, Priority,
};
use crate::repo::habit_repo::{HabitRepository, RepoError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Whether the form creates a new record or edits a bound one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Create,
    Edit(HabitId),
}

/// Complete form state. `Default` is the closed Create-mode state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormState {
    pub visible: bool,
    pub mode: FormMode,
    pub draft: HabitFields,
}

/// Input events accepted by the form reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    Open(Option<Habit>),
    SetTitle(String),
    SetCategory(Category),
    SetFrequency(Frequency),
    SetPriority(Priority),
    Close,
}

/// Repository write derived from a valid draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveIntent {
    Create(HabitFields),
    Update { id: HabitId, patch: HabitPatch },
}

impl FormState {
    /// Applies one action and returns the next state.
    ///
    /// Field setters are ignored while the form is closed.
    pub fn reduce(self, action: FormAction) -> Self {
        match action {
            FormAction::Open(Some(habit)) => Self {
                visible: true,
                draft: habit.fields(),
                mode: FormMode::Edit(habit.id),
            },
            FormAction::Open(None) => Self {
                visible: true,
                ..Self::default()
            },
            FormAction::Close => Self::default(),
            _ if !self.visible => self,
            FormAction::SetTitle(title) => self.with_draft(|draft| draft.title = title),
            FormAction::SetCategory(category) => {
                self.with_draft(|draft| draft.category = category)
            }
            FormAction::SetFrequency(frequency) => {
                self.with_draft(|draft| draft.frequency = frequency)
            }
            FormAction::SetPriority(priority) => {
                self.with_draft(|draft| draft.priority = priority)
            }
        }
    }

    /// Validates the draft and derives the write it should produce.
    pub fn save_intent(&self) -> Result<SaveIntent, HabitValidationError> {
        self.draft.validate()?;
        let fields = self.draft.normalized();
        Ok(match &self.mode {
            FormMode::Create => SaveIntent::Create(fields),
            FormMode::Edit(id) => SaveIntent::Update {
                id: id.clone(),
                patch: HabitPatch::from_fields(&fields),
            },
        })
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    /// Header text shown above the form.
    pub fn heading(&self) -> &'static str {
        if self.is_editing() {
            "Edit habit"
        } else {
            "New habit"
        }
    }

    /// Label of the confirm button.
    pub fn submit_label(&self) -> &'static str {
        if self.is_editing() {
            "Save"
        } else {
            "Add"
        }
    }

    fn with_draft(mut self, edit: impl FnOnce(&mut HabitFields)) -> Self {
        edit(&mut self.draft);
        self
    }
}

/// Errors returned by `HabitFormController::save`.
#[derive(Debug)]
pub enum FormError {
    /// Save requested while the form is closed.
    NotOpen,
    Validation(HabitValidationError),
    Repository(RepoError),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotOpen => write!(f, "habit form is not open"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repository(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FormError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotOpen => None,
            Self::Validation(err) => Some(err),
            Self::Repository(err) => Some(err),
        }
    }
}

impl From<HabitValidationError> for FormError {
    fn from(value: HabitValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for FormError {
    fn from(value: RepoError) -> Self {
        Self::Repository(value)
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(HabitId),
    Updated(HabitId),
}

/// Stateful wrapper driving `FormState` and issuing the save write.
#[derive(Debug, Default)]
pub struct HabitFormController {
    state: FormState,
}

impl HabitFormController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    pub fn mode(&self) -> &FormMode {
        &self.state.mode
    }

    pub fn draft(&self) -> &HabitFields {
        &self.state.draft
    }

    pub fn dispatch(&mut self, action: FormAction) {
        let state = std::mem::take(&mut self.state);
        self.state = state.reduce(action);
    }

    /// Opens in Edit mode for `initial`, or Create mode when `None`.
    pub fn open(&mut self, initial: Option<&Habit>) {
        self.dispatch(FormAction::Open(initial.cloned()));
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.dispatch(FormAction::SetTitle(title.into()));
    }

    pub fn set_category(&mut self, category: Category) {
        self.dispatch(FormAction::SetCategory(category));
    }

    pub fn set_frequency(&mut self, frequency: Frequency) {
        self.dispatch(FormAction::SetFrequency(frequency));
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.dispatch(FormAction::SetPriority(priority));
    }

    /// Discards the draft and closes without touching the repository.
    pub fn cancel(&mut self) {
        self.dispatch(FormAction::Close);
    }

    /// Persists the draft, then resets and closes the form.
    ///
    /// # Errors
    /// - `FormError::NotOpen` when the form is closed.
    /// - `FormError::Validation` for a blank title; nothing is written.
    /// - `FormError::Repository` when the write fails; the form stays open.
    pub fn save<R: HabitRepository + ?Sized>(&mut self, repo: &R) -> Result<SaveOutcome, FormError> {
        if !self.state.visible {
            return Err(FormError::NotOpen);
        }

        let mode = if self.state.is_editing() { "edit" } else { "create" };
        let written = match self.state.save_intent()? {
            SaveIntent::Create(fields) => repo.create_habit(&fields).map(SaveOutcome::Created),
            SaveIntent::Update { id, patch } => repo
                .update_habit(&id, &patch)
                .map(|()| SaveOutcome::Updated(id)),
        };
        let outcome = match written {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    "event=form_save module=form status=error mode={} error_code={} error={}",
                    mode,
                    err.code(),
                    err
                );
                return Err(err.into());
            }
        };

        info!("event=form_save module=form status=ok mode={mode}");
        self.dispatch(FormAction::Close);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::{FormAction, FormMode, FormState, SaveIntent};
    use crate::model::habit::{
        Category, Frequency, Habit, HabitFields, HabitId, HabitPatch, HabitValidationError,
        Priority,
    };

    fn meditate() -> Habit {
        Habit {
            id: HabitId::parse("a").unwrap(),
            title: "Meditate".to_string(),
            category: Category::Wellbeing,
            frequency: Frequency::Weekend,
            priority: Priority::High,
            streak: 4,
        }
    }

    #[test]
    fn open_without_record_enters_create_mode_with_defaults() {
        let state = FormState::default().reduce(FormAction::Open(None));
        assert!(state.visible);
        assert_eq!(state.mode, FormMode::Create);
        assert_eq!(state.draft, HabitFields::default());
        assert_eq!(state.heading(), "New habit");
        assert_eq!(state.submit_label(), "Add");
    }

    #[test]
    fn open_with_record_binds_id_and_copies_fields() {
        let habit = meditate();
        let state = FormState::default().reduce(FormAction::Open(Some(habit.clone())));
        assert_eq!(state.mode, FormMode::Edit(habit.id.clone()));
        assert_eq!(state.draft, habit.fields());
        assert_eq!(state.heading(), "Edit habit");
    }

    #[test]
    fn setters_are_ignored_while_closed() {
        let state = FormState::default().reduce(FormAction::SetTitle("Run".to_string()));
        assert_eq!(state, FormState::default());
    }

    #[test]
    fn close_resets_to_create_defaults() {
        let state = FormState::default()
            .reduce(FormAction::Open(Some(meditate())))
            .reduce(FormAction::SetPriority(Priority::Low))
            .reduce(FormAction::Close);
        assert_eq!(state, FormState::default());
    }

    #[test]
    fn save_intent_rejects_blank_title() {
        let state = FormState::default()
            .reduce(FormAction::Open(None))
            .reduce(FormAction::SetTitle("   ".to_string()));
        assert_eq!(
            state.save_intent().unwrap_err(),
            HabitValidationError::EmptyTitle
        );
    }

    #[test]
    fn edit_intent_trims_title_and_leaves_streak_alone() {
        let state = FormState::default()
            .reduce(FormAction::Open(Some(meditate())))
            .reduce(FormAction::SetTitle("  Meditate 10 min ".to_string()));

        let SaveIntent::Update { id, patch } = state.save_intent().unwrap() else {
            panic!("edit mode must produce an update intent");
        };
        assert_eq!(id.as_str(), "a");
        assert_eq!(patch.title.as_deref(), Some("Meditate 10 min"));
        assert_eq!(patch.streak, None);
        assert_eq!(
            patch,
            HabitPatch {
                title: Some("Meditate 10 min".to_string()),
                category: Some(Category::Wellbeing),
                frequency: Some(Frequency::Weekend),
                priority: Some(Priority::High),
                streak: None,
            }
        );
    }
}
