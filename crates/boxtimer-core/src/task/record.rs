use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ValidationError};

/// A timebox: a task paired with a planned duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Planned duration in minutes.
    pub duration_min: u32,
    /// Real elapsed time recorded at completion, in seconds.
    #[serde(default)]
    pub actual_duration_secs: Option<u64>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
}

impl TaskRecord {
    /// Create a fresh, uncompleted task with a random id.
    ///
    /// # Errors
    /// Rejects an empty title or a zero duration.
    pub fn new(title: impl Into<String>, duration_min: u32) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::Empty("title").into());
        }
        if duration_min == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration_min".into(),
                message: "must be at least one minute".into(),
            }
            .into());
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title,
            description: String::new(),
            duration_min,
            actual_duration_secs: None,
            completed: false,
            created_at: Utc::now(),
            scheduled_date: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn scheduled_on(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    pub fn planned_secs(&self) -> u64 {
        u64::from(self.duration_min) * 60
    }

    /// Actual duration when recorded, otherwise the planned one.
    pub fn effective_secs(&self) -> u64 {
        self.actual_duration_secs.unwrap_or_else(|| self.planned_secs())
    }

    /// A new uncompleted task with the same title, description and plan.
    pub fn repeat(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            duration_min: self.duration_min,
            actual_duration_secs: None,
            completed: false,
            created_at: Utc::now(),
            scheduled_date: None,
        }
    }
}

/// Durable keyed storage for task records.
pub trait TaskStore: Send + Sync {
    fn create_task(&self, task: &TaskRecord) -> Result<()>;

    fn get_task(&self, id: &str) -> Result<Option<TaskRecord>>;

    fn list_tasks(&self) -> Result<Vec<TaskRecord>>;

    /// Upsert.
    fn update_task(&self, task: &TaskRecord) -> Result<()>;

    fn delete_task(&self, id: &str) -> Result<()>;

    /// Delete every completed task, returning how many were removed.
    fn clear_completed(&self) -> Result<usize>;
}
