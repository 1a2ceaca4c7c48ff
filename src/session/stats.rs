use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created but never started
    Idle,
    /// Capture task is running
    Recording,
    /// Stopped and buffer harvested
    Stopped,
}

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: SessionState,

    /// When the recording started, if it has
    pub started_at: Option<DateTime<Local>>,

    /// Seconds elapsed since the recording started
    pub duration_secs: f64,

    /// Samples buffered so far
    pub samples_captured: usize,
}
