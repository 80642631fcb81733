// Data models for the to-do list

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single to-do entry
///
/// Field names serialize in camelCase so the storage JSON and the
/// spreadsheet header row share the same attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub description: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub category: Category,
    #[serde(default)]
    pub is_completed: bool,
    /// Snapshot taken when the store is opened, not a live value
    #[serde(default)]
    pub is_expired: bool,
}

/// Closed task classification; anything unrecognized lands in `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Work,
    Personal,
    Urgent,
    #[serde(other)]
    None,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Urgent => "Urgent",
            Category::None => "None",
        }
    }

    /// Lenient mapping used for imported values
    pub fn from_import(value: &str) -> Self {
        value.parse().unwrap_or(Category::None)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Category::Work),
            "personal" => Ok(Category::Personal),
            "urgent" => Ok(Category::Urgent),
            "none" => Ok(Category::None),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}

/// Reasons a create or edit is refused before it reaches the store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter task description.")]
    EmptyDescription,

    #[error("Due date {due} is before start date {start}.")]
    DueBeforeStart { start: NaiveDate, due: NaiveDate },

    #[error("Start date {start} is before today ({today}).")]
    StartInPast { start: NaiveDate, today: NaiveDate },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub description: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub category: Category,
}

impl TaskDraft {
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        validate_description(&self.description)?;
        if self.start_date < today {
            return Err(ValidationError::StartInPast {
                start: self.start_date,
                today,
            });
        }
        validate_range(self.start_date, self.due_date)
    }

    /// Build the task record; completion and expiry start out false
    pub fn into_task(self, id: i64) -> Task {
        Task {
            id,
            description: self.description.trim().to_string(),
            start_date: self.start_date,
            due_date: self.due_date,
            category: self.category,
            is_completed: false,
            is_expired: false,
        }
    }
}

/// Editable fields of an existing task
#[derive(Debug, Clone)]
pub struct TaskEdit {
    pub description: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub category: Category,
}

impl TaskEdit {
    /// Start from the task's current values
    pub fn from_task(task: &Task) -> Self {
        Self {
            description: task.description.clone(),
            start_date: task.start_date,
            due_date: task.due_date,
            category: task.category,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_description(&self.description)?;
        validate_range(self.start_date, self.due_date)
    }

    /// Apply onto `task`, keeping id and both flags
    pub fn apply(self, task: &Task) -> Task {
        Task {
            description: self.description.trim().to_string(),
            start_date: self.start_date,
            due_date: self.due_date,
            category: self.category,
            ..task.clone()
        }
    }
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.trim().is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    Ok(())
}

pub(crate) fn validate_range(start: NaiveDate, due: NaiveDate) -> Result<(), ValidationError> {
    if due < start {
        return Err(ValidationError::DueBeforeStart { start, due });
    }
    Ok(())
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
