use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshPhase {
    #[default]
    Idle,
    Fetching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchPhase {
    #[default]
    Idle,
    Interpreting,
    Dispatching,
    AwaitingBatch,
}

/// Health of the refresh loop, as reported by `/api/status`.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SchedulerStatus {
    pub refresh_phase: RefreshPhase,
    pub batch_phase: BatchPhase,
    pub fetches_ok: u64,
    pub fetches_failed: u64,
    /// Failed fetches since the last successful one.
    pub consecutive_failures: u64,
    pub batches_dispatched: u64,
    pub effects_failed: u64,
    pub batches_timed_out: u64,
    pub last_sample_at: Option<DateTime<Utc>>,
    pub last_batch_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
