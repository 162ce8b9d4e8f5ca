//! Core types for favlist-syncer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Unique identifier for a download task
///
/// Derived from the video's bvid plus the creation instant, so re-adding the same video
/// always produces a fresh id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Build a task id for `bvid` created at `at`
    pub fn generate(bvid: &str, at: DateTime<Utc>) -> Self {
        let nanos = at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| at.timestamp_micros() * 1_000);
        Self(format!("task_{bvid}_{nanos}"))
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Download task status
///
/// Tasks move strictly `Queued → Downloading → {Completed, Failed, Canceled}`. A queued task may
/// also end directly in `Canceled` (drained at shutdown) or `Failed` (worker fault before the
/// pipeline started). Terminal states are never left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Registered and waiting for a worker
    Queued,
    /// A worker is running the download pipeline
    Downloading,
    /// Media file written and ledger updated
    Completed,
    /// Pipeline failed; see the task's error message
    Failed,
    /// Interrupted by shutdown
    Canceled,
}

impl TaskStatus {
    /// True for `Completed`, `Failed` and `Canceled`
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    /// True for `Queued` and `Downloading`
    pub fn is_in_flight(self) -> bool {
        !self.is_terminal()
    }

    /// Whether a task in this status may move to `next`
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Queued, Downloading)
                | (Queued, Canceled)
                | (Queued, Failed)
                | (Downloading, Completed)
                | (Downloading, Failed)
                | (Downloading, Canceled)
        )
    }

    /// Lowercase name, matching the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt to materialize one video locally
///
/// Values handed out by the registry are snapshots; mutating them has no effect on the
/// scheduler's state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Unique task id
    pub id: TaskId,
    /// Video identifier, stable across tasks
    pub bvid: String,
    /// Display title copied at creation time
    pub title: String,
    /// Cover reference copied from the ledger at creation time (may be empty)
    pub cover: String,
    /// Current status
    pub status: TaskStatus,
    /// Progress percentage (0-100)
    pub progress: f64,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
    /// Failure reason, set only when `status == Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    /// Create a new task in `Queued`
    pub fn new(bvid: impl Into<String>, title: impl Into<String>, cover: impl Into<String>) -> Self {
        let now = Utc::now();
        let bvid = bvid.into();
        Self {
            id: TaskId::generate(&bvid, now),
            bvid,
            title: title.into(),
            cover: cover.into(),
            status: TaskStatus::Queued,
            progress: 0.0,
            created_at: now,
            updated_at: now,
            error: None,
        }
    }
}

/// Counters describing one sync cycle over a favlist
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SyncReport {
    /// Total media count reported by the first page
    pub media_count: u32,
    /// Videos seen for the first time (ledger row inserted, task submitted)
    pub new: usize,
    /// Known but undownloaded videos resubmitted
    pub resumed: usize,
    /// Videos already downloaded or already in flight
    pub skipped: usize,
    /// Submissions refused by the scheduler (queue full or already scheduled)
    pub rejected: usize,
}
