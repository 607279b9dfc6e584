//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the habits screen (list, form, delete) to Dart via FRB.
//! - Own the single process-wide habits session between open and close.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Enum values cross the boundary as stable snake_case wire strings.
//! - Snapshot deliveries only happen inside `habits_pump`.

use habitrack_core::db::open_db;
use habitrack_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Category, FormError, FormMode, Frequency, HabitId, HabitListPresenter, HabitRow, Priority,
    SaveOutcome, SqliteHabitRepository,
};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

const DEFAULT_DB_FILE_NAME: &str = "habitrack.sqlite3";
const DB_PATH_ENV: &str = "HABITRACK_DB_PATH";

type HabitSession = HabitListPresenter<SqliteHabitRepository>;

static SESSION: Mutex<Option<HabitSession>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Habit ID touched by the action, when there is one.
    pub habit_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl HabitActionResponse {
    fn success(message: impl Into<String>, habit_id: Option<String>) -> Self {
        Self {
            ok: true,
            habit_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            habit_id: None,
            message: message.into(),
        }
    }
}

/// One rendered habit row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitItem {
    pub habit_id: String,
    pub title: String,
    pub category: String,
    pub frequency: String,
    /// `high|medium|low`.
    pub priority: String,
    /// Gradient start/end colors (`#rrggbb`).
    pub accent_colors: Vec<String>,
    pub streak: u32,
}

/// Whole habits screen state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitListView {
    pub items: Vec<HabitItem>,
    pub subtitle: String,
    /// `false` until the first snapshot arrived.
    pub loaded: bool,
    /// Pending user-visible error notices; drained by this call.
    pub notices: Vec<String>,
}

/// Habit form state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitFormView {
    pub visible: bool,
    pub editing: bool,
    pub habit_id: Option<String>,
    pub heading: String,
    pub submit_label: String,
    pub title: String,
    pub category: String,
    pub frequency: String,
    pub priority: String,
    /// Empty on success; explains a rejected call otherwise.
    pub message: String,
}

/// Opens the habit collection and mounts the habits screen.
///
/// `db_path` falls back to `$HABITRACK_DB_PATH`, then to a temp-dir file.
/// Re-opening replaces (and unsubscribes) any previous session.
#[flutter_rust_bridge::frb(sync)]
pub fn habits_open(db_path: Option<String>) -> HabitActionResponse {
    let path = resolve_db_path(db_path);
    let conn = match open_db(&path) {
        Ok(conn) => conn,
        Err(err) => return HabitActionResponse::failure(format!("habits_open failed: {err}")),
    };

    let mut presenter = HabitListPresenter::new(Arc::new(SqliteHabitRepository::new(conn)));
    presenter.mount();

    let previous = lock_session().replace(presenter);
    if previous.is_some() {
        warn!("event=ffi_session_open module=ffi status=replaced");
    }
    info!("event=ffi_session_open module=ffi status=ok");
    HabitActionResponse::success(format!("Opened {}.", path.display()), None)
}

/// Unmounts the habits screen and releases the collection.
#[flutter_rust_bridge::frb(sync)]
pub fn habits_close() -> HabitActionResponse {
    match lock_session().take() {
        Some(mut presenter) => {
            presenter.unmount();
            HabitActionResponse::success("Closed.", None)
        }
        None => HabitActionResponse::success("No open session.", None),
    }
}

/// Delivers queued snapshots; returns the number delivered.
#[flutter_rust_bridge::frb(sync)]
pub fn habits_pump() -> u32 {
    with_session(|presenter| presenter.refresh())
        .map(|delivered| u32::try_from(delivered).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Returns rows, subtitle and drained notices.
#[flutter_rust_bridge::frb(sync)]
pub fn habits_view() -> HabitListView {
    with_session(|presenter| HabitListView {
        items: presenter.rows().iter().map(to_habit_item).collect(),
        subtitle: presenter.subtitle(),
        loaded: presenter.store().is_loaded(),
        notices: presenter
            .take_notices()
            .into_iter()
            .map(|notice| notice.message)
            .collect(),
    })
    .unwrap_or_else(|message| HabitListView {
        items: Vec::new(),
        subtitle: String::new(),
        loaded: false,
        notices: vec![message],
    })
}

/// Opens an empty Create-mode form.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_add() -> HabitFormView {
    form_call(|presenter| {
        presenter.on_add();
        Ok(())
    })
}

/// Opens the form bound to `habit_id`.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_edit(habit_id: String) -> HabitFormView {
    form_call(|presenter| {
        let id = HabitId::parse(habit_id).map_err(|err| err.to_string())?;
        if presenter.on_edit(&id) {
            Ok(())
        } else {
            Err(format!("habit not found: {id}"))
        }
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn habit_form_view() -> HabitFormView {
    form_call(|_| Ok(()))
}

#[flutter_rust_bridge::frb(sync)]
pub fn habit_form_set_title(title: String) -> HabitFormView {
    form_call(|presenter| {
        presenter.on_title_changed(title);
        Ok(())
    })
}

/// `category`: `health|learning|productivity|wellbeing`.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_form_set_category(category: String) -> HabitFormView {
    form_call(|presenter| {
        let value = Category::parse(category.trim())
            .ok_or_else(|| format!("unsupported category `{category}`"))?;
        presenter.on_category_selected(value);
        Ok(())
    })
}

/// `frequency`: `daily|tue_thu_sun|weekend|weekdays`.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_form_set_frequency(frequency: String) -> HabitFormView {
    form_call(|presenter| {
        let value = Frequency::parse(frequency.trim())
            .ok_or_else(|| format!("unsupported frequency `{frequency}`"))?;
        presenter.on_frequency_selected(value);
        Ok(())
    })
}

/// `priority`: `high|medium|low`.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_form_set_priority(priority: String) -> HabitFormView {
    form_call(|presenter| {
        let value = Priority::parse(priority.trim())
            .ok_or_else(|| format!("unsupported priority `{priority}`"))?;
        presenter.on_priority_selected(value);
        Ok(())
    })
}

/// Saves the draft. On failure the form stays open.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_form_save() -> HabitActionResponse {
    let result = with_session(|presenter| match presenter.on_save() {
        Ok(SaveOutcome::Created(id)) => {
            HabitActionResponse::success("Habit created.", Some(id.to_string()))
        }
        Ok(SaveOutcome::Updated(id)) => {
            HabitActionResponse::success("Habit updated.", Some(id.to_string()))
        }
        Err(FormError::Validation(err)) => HabitActionResponse::failure(err.to_string()),
        Err(err) => HabitActionResponse::failure(format!("habit_form_save failed: {err}")),
    });
    result.unwrap_or_else(HabitActionResponse::failure)
}

/// Discards the draft and closes the form.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_form_cancel() -> HabitFormView {
    form_call(|presenter| {
        presenter.on_cancel();
        Ok(())
    })
}

/// Deletes a habit. Failures are also queued as list notices.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_delete(habit_id: String) -> HabitActionResponse {
    let result = with_session(|presenter| {
        let id = match HabitId::parse(habit_id) {
            Ok(id) => id,
            Err(err) => return HabitActionResponse::failure(err.to_string()),
        };
        let notices_before = presenter.notices().len();
        presenter.on_delete(&id);
        match presenter.notices().get(notices_before) {
            Some(notice) => {
                HabitActionResponse::failure(format!("habit_delete failed: {}", notice.message))
            }
            None => HabitActionResponse::success("Habit deleted.", Some(id.to_string())),
        }
    });
    result.unwrap_or_else(HabitActionResponse::failure)
}

fn lock_session() -> std::sync::MutexGuard<'static, Option<HabitSession>> {
    SESSION.lock().unwrap_or_else(PoisonError::into_inner)
}

fn with_session<T>(f: impl FnOnce(&mut HabitSession) -> T) -> Result<T, String> {
    let mut session = lock_session();
    match session.as_mut() {
        Some(presenter) => Ok(f(presenter)),
        None => Err("no open habits session; call habits_open first".to_string()),
    }
}

fn form_call(f: impl FnOnce(&mut HabitSession) -> Result<(), String>) -> HabitFormView {
    match with_session(|presenter| {
        let message = f(presenter).err().unwrap_or_default();
        to_form_view(presenter, message)
    }) {
        Ok(view) => view,
        Err(message) => HabitFormView {
            visible: false,
            editing: false,
            habit_id: None,
            heading: String::new(),
            submit_label: String::new(),
            title: String::new(),
            category: String::new(),
            frequency: String::new(),
            priority: String::new(),
            message,
        },
    }
}

fn to_form_view(presenter: &HabitSession, message: String) -> HabitFormView {
    let state = presenter.form().state();
    HabitFormView {
        visible: state.visible,
        editing: state.is_editing(),
        habit_id: match &state.mode {
            FormMode::Edit(id) => Some(id.to_string()),
            FormMode::Create => None,
        },
        heading: state.heading().to_string(),
        submit_label: state.submit_label().to_string(),
        title: state.draft.title.clone(),
        category: state.draft.category.as_str().to_string(),
        frequency: state.draft.frequency.as_str().to_string(),
        priority: state.draft.priority.as_str().to_string(),
        message,
    }
}

fn to_habit_item(row: &HabitRow) -> HabitItem {
    HabitItem {
        habit_id: row.id.to_string(),
        title: row.title.clone(),
        category: row.category_label.to_string(),
        frequency: row.frequency_label.to_string(),
        priority: row.priority.as_str().to_string(),
        accent_colors: row
            .accent_colors
            .iter()
            .map(|color| (*color).to_string())
            .collect(),
        streak: row.streak,
    }
}

fn resolve_db_path(explicit: Option<String>) -> PathBuf {
    let from_env = || {
        std::env::var(DB_PATH_ENV)
            .ok()
            .filter(|raw| !raw.trim().is_empty())
    };
    explicit
        .filter(|raw| !raw.trim().is_empty())
        .or_else(from_env)
        .map(|raw| PathBuf::from(raw.trim()))
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME))
}
