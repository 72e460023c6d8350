use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::task::{TaskRecord, TaskStatus};

/// Aggregate counts over a set of tasks
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl TaskStats {
    /// Single pass over `tasks`; overdue is judged against `now`
    pub fn compute(tasks: &[TaskRecord], now: DateTime<Utc>) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
            stats
        })
    }

    /// Tasks not yet completed
    pub fn open(&self) -> usize {
        self.pending + self.in_progress
    }
}
