//! Task store: task documents in the `tasks` collection.
//!
//! Deadlines and creation times are written in the store's native
//! `Timestamp` form and surfaced as `DateTime<Utc>`. `createdAt` is only
//! ever written by `create`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::{Direction, Document, DocumentStore, Query, Timestamp, TASKS};
use crate::error::{Error, Result};
use crate::stats::TaskStats;
use crate::user::{to_document, UserRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(Error::InvalidArgument(format!(
                "unknown task status '{other}' (expected pending, in-progress or completed)"
            ))),
        }
    }
}

/// A task as read back from the store
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub assigned_to: String,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub notes: String,
    pub user_notes: String,
}

impl TaskRecord {
    /// Derived: open and past its deadline at `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Completed && self.deadline < now
    }
}

/// Fields supplied when creating a task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub deadline: DateTime<Utc>,
    pub status: Option<TaskStatus>,
    pub notes: Option<String>,
    pub user_notes: Option<String>,
}

/// Partial task for merge-writes; `id` and `createdAt` are not updatable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub user_notes: Option<String>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
            && self.deadline.is_none()
            && self.notes.is_none()
            && self.user_notes.is_none()
    }
}

/// On-store shape of a task document
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    assigned_to: String,
    deadline: Timestamp,
    created_at: Timestamp,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    user_notes: String,
}

impl StoredTask {
    fn into_record(self, id: String) -> TaskRecord {
        TaskRecord {
            id,
            title: self.title,
            description: self.description,
            status: self.status,
            assigned_to: self.assigned_to,
            deadline: self.deadline.to_datetime(),
            created_at: self.created_at.to_datetime(),
            notes: self.notes,
            user_notes: self.user_notes,
        }
    }
}

/// On-store shape of a partial update
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredTaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deadline: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_notes: Option<String>,
}

impl From<&TaskUpdate> for StoredTaskUpdate {
    fn from(update: &TaskUpdate) -> Self {
        Self {
            title: update.title.clone(),
            description: update.description.clone(),
            status: update.status,
            assigned_to: update.assigned_to.clone(),
            deadline: update.deadline.map(Timestamp::from_datetime),
            notes: update.notes.clone(),
            user_notes: update.user_notes.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TaskStore {
    documents: Arc<dyn DocumentStore>,
}

impl TaskStore {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Store a new task; returns its generated id
    pub fn create(&self, task: NewTask) -> Result<String> {
        let title = task.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidArgument("title cannot be empty".to_string()));
        }
        if task.assigned_to.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "assignee cannot be empty".to_string(),
            ));
        }

        let stored = StoredTask {
            title: title.to_string(),
            description: task.description,
            status: task.status.unwrap_or_default(),
            assigned_to: task.assigned_to.trim().to_string(),
            deadline: Timestamp::from_datetime(task.deadline),
            created_at: Timestamp::now(),
            notes: task.notes.unwrap_or_default(),
            user_notes: task.user_notes.unwrap_or_default(),
        };
        let id = self.documents.add(TASKS, to_document(&stored)?)?;
        tracing::info!(task = %id, assignee = %stored.assigned_to, "task created");
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Option<TaskRecord>> {
        self.documents
            .get(TASKS, id)?
            .map(|snapshot| decode_task(snapshot.id, snapshot.data))
            .transpose()
    }

    /// All tasks, newest first
    pub fn list_all(&self) -> Result<Vec<TaskRecord>> {
        self.run(Query::collection(TASKS).order_by("createdAt", Direction::Descending))
    }

    /// Tasks assigned to `user_id`, newest first
    pub fn list_for(&self, user_id: &str) -> Result<Vec<TaskRecord>> {
        self.run(
            Query::collection(TASKS)
                .where_eq("assignedTo", user_id)
                .order_by("createdAt", Direction::Descending),
        )
    }

    /// Merge-write the supplied fields
    pub fn update(&self, id: &str, updates: &TaskUpdate) -> Result<()> {
        if updates.is_empty() {
            return Err(Error::InvalidArgument("no fields to update".to_string()));
        }
        if let Some(title) = updates.title.as_deref() {
            if title.trim().is_empty() {
                return Err(Error::InvalidArgument("title cannot be empty".to_string()));
            }
        }
        let fields = to_document(&StoredTaskUpdate::from(updates))?;
        self.merge(id, fields)?;
        tracing::info!(task = id, "task updated");
        Ok(())
    }

    /// Status-only write used by the assignee
    pub fn update_status(&self, id: &str, status: TaskStatus) -> Result<()> {
        let fields = to_document(&StoredTaskUpdate {
            status: Some(status),
            ..StoredTaskUpdate::default()
        })?;
        self.merge(id, fields)?;
        tracing::info!(task = id, status = %status, "task status updated");
        Ok(())
    }

    /// Assignee-authored notes, written alone
    pub fn update_user_notes(&self, id: &str, notes: &str) -> Result<()> {
        let fields = to_document(&StoredTaskUpdate {
            user_notes: Some(notes.to_string()),
            ..StoredTaskUpdate::default()
        })?;
        self.merge(id, fields)?;
        tracing::info!(task = id, "task user notes updated");
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.documents.delete(TASKS, id)?;
        tracing::info!(task = id, "task deleted");
        Ok(())
    }

    /// Counts over all tasks, or only those assigned to `user_id`
    ///
    /// Full scan per call; fine for small teams, not for large stores.
    pub fn stats(&self, user_id: Option<&str>) -> Result<TaskStats> {
        let query = match user_id {
            Some(user_id) => Query::collection(TASKS).where_eq("assignedTo", user_id),
            None => Query::collection(TASKS),
        };
        let tasks = self.run(query)?;
        Ok(TaskStats::compute(&tasks, Utc::now()))
    }

    fn merge(&self, id: &str, fields: Document) -> Result<()> {
        self.documents
            .merge(TASKS, id, fields)
            .map_err(|err| match err {
                Error::DocumentNotFound { .. } => Error::TaskNotFound(id.to_string()),
                other => other,
            })
    }

    fn run(&self, query: Query) -> Result<Vec<TaskRecord>> {
        self.documents
            .query(&query)?
            .into_iter()
            .map(|snapshot| decode_task(snapshot.id, snapshot.data))
            .collect()
    }
}

fn decode_task(id: String, data: Document) -> Result<TaskRecord> {
    let stored: StoredTask = serde_json::from_value(serde_json::Value::Object(data))?;
    Ok(stored.into_record(id))
}

/// Assignee display name per task id, with `unknown` for missing profiles
pub fn assignee_names(
    tasks: &[TaskRecord],
    users: &[UserRecord],
    unknown: &str,
) -> HashMap<String, String> {
    let by_id: HashMap<&str, &str> = users
        .iter()
        .map(|user| (user.id.as_str(), user.name.as_str()))
        .collect();
    tasks
        .iter()
        .map(|task| {
            let name = by_id
                .get(task.assigned_to.as_str())
                .copied()
                .unwrap_or(unknown);
            (task.id.clone(), name.to_string())
        })
        .collect()
}
