//! Habit domain model.
//!
//! # Responsibility
//! - Define the canonical habit record rendered by list/form projections.
//! - Own field-level validation shared by repository writes and form saves.
//!
//! # Invariants
//! - `id` is assigned by the repository, stable, and never reused.
//! - `title` is non-empty after trimming.
//! - `streak` starts at 0 on creation and is never negative.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque repository-assigned habit identifier.
///
/// Serialized as a plain string so ids coming from other backends (or seeded
/// fixtures) keep their original shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    /// Generates a fresh random id for a newly created record.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing external id.
    ///
    /// # Errors
    /// - Returns `HabitValidationError::EmptyId` when `value` is blank.
    pub fn parse(value: impl Into<String>) -> Result<Self, HabitValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(HabitValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for HabitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed category set offered by the habit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Health,
    Learning,
    Productivity,
    Wellbeing,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Health,
        Category::Learning,
        Category::Productivity,
        Category::Wellbeing,
    ];

    /// Stable storage/wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Learning => "learning",
            Self::Productivity => "productivity",
            Self::Wellbeing => "wellbeing",
        }
    }

    /// Human-readable label for badges and option chips.
    pub fn label(self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Learning => "Learning",
            Self::Productivity => "Productivity",
            Self::Wellbeing => "Wellbeing",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "health" => Some(Self::Health),
            "learning" => Some(Self::Learning),
            "productivity" => Some(Self::Productivity),
            "wellbeing" => Some(Self::Wellbeing),
            _ => None,
        }
    }
}

/// Fixed schedule labels offered by the habit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    /// Tuesday, Thursday and Sunday.
    TueThuSun,
    Weekend,
    Weekdays,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Daily,
        Frequency::TueThuSun,
        Frequency::Weekend,
        Frequency::Weekdays,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::TueThuSun => "tue_thu_sun",
            Self::Weekend => "weekend",
            Self::Weekdays => "weekdays",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::TueThuSun => "Tue, Thu, Sun",
            Self::Weekend => "Weekend",
            Self::Weekdays => "Weekdays",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "tue_thu_sun" => Some(Self::TueThuSun),
            "weekend" => Some(Self::Weekend),
            "weekdays" => Some(Self::Weekdays),
            _ => None,
        }
    }
}

/// Visual ranking of a habit. Has no behavioral meaning in core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Start/end colors of the row accent gradient.
    pub fn accent_colors(self) -> [&'static str; 2] {
        match self {
            Self::High => ["#ef4444", "#dc2626"],
            Self::Medium => ["#f59e0b", "#d97706"],
            Self::Low => ["#10b981", "#059669"],
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Field-level validation failures for habit input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitValidationError {
    EmptyTitle,
    EmptyId,
}

impl Display for HabitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "habit title must not be empty"),
            Self::EmptyId => write!(f, "habit id must not be empty"),
        }
    }
}

impl Error for HabitValidationError {}

/// User-editable habit fields, without identity and streak.
///
/// This is the shape carried by form drafts and create requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitFields {
    pub title: String,
    pub category: Category,
    pub frequency: Frequency,
    pub priority: Priority,
}

impl Default for HabitFields {
    fn default() -> Self {
        Self {
            title: String::new(),
            category: Category::Health,
            frequency: Frequency::Daily,
            priority: Priority::Medium,
        }
    }
}

impl HabitFields {
    pub fn new(
        title: impl Into<String>,
        category: Category,
        frequency: Frequency,
        priority: Priority,
    ) -> Self {
        Self {
            title: title.into(),
            category,
            frequency,
            priority,
        }
    }

    /// Validates user input before it reaches the repository.
    pub fn validate(&self) -> Result<(), HabitValidationError> {
        validate_title(&self.title)
    }

    /// Returns a copy with the title trimmed, as it will be persisted.
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            ..self.clone()
        }
    }
}

/// Canonical habit record as stored in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    pub category: Category,
    pub frequency: Frequency,
    pub priority: Priority,
    pub streak: u32,
}

impl Habit {
    /// Builds a record from fields with an explicit id and zero streak.
    pub fn from_fields(id: HabitId, fields: HabitFields) -> Self {
        Self {
            id,
            title: fields.title,
            category: fields.category,
            frequency: fields.frequency,
            priority: fields.priority,
            streak: 0,
        }
    }

    /// Returns the user-editable part of this record.
    pub fn fields(&self) -> HabitFields {
        HabitFields {
            title: self.title.clone(),
            category: self.category,
            frequency: self.frequency,
            priority: self.priority,
        }
    }

    pub fn validate(&self) -> Result<(), HabitValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(HabitValidationError::EmptyId);
        }
        validate_title(&self.title)
    }
}

/// Partial update merged field-by-field into an existing record.
///
/// `None` keeps the stored value (last writer wins per field).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitPatch {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub frequency: Option<Frequency>,
    pub priority: Option<Priority>,
    pub streak: Option<u32>,
}

impl HabitPatch {
    /// Patch overwriting every user-editable field; streak is preserved.
    pub fn from_fields(fields: &HabitFields) -> Self {
        Self {
            title: Some(fields.title.clone()),
            category: Some(fields.category),
            frequency: Some(fields.frequency),
            priority: Some(fields.priority),
            streak: None,
        }
    }

    pub fn streak(value: u32) -> Self {
        Self {
            streak: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.category.is_none()
            && self.frequency.is_none()
            && self.priority.is_none()
            && self.streak.is_none()
    }

    pub fn validate(&self) -> Result<(), HabitValidationError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }

    /// Merges this patch into `habit`, trimming a supplied title.
    pub fn apply_to(&self, habit: &mut Habit) {
        if let Some(title) = &self.title {
            habit.title = title.trim().to_string();
        }
        if let Some(category) = self.category {
            habit.category = category;
        }
        if let Some(frequency) = self.frequency {
            habit.frequency = frequency;
        }
        if let Some(priority) = self.priority {
            habit.priority = priority;
        }
        if let Some(streak) = self.streak {
            habit.streak = streak;
        }
    }
}

fn validate_title(title: &str) -> Result<(), HabitValidationError> {
    if title.trim().is_empty() {
        return Err(HabitValidationError::EmptyTitle);
    }
    Ok(())
}
