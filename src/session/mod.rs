//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - Audio capture from a microphone or file backend
//! - Channel normalization (stereo to mono)
//! - The background task draining frames into the session buffer
//! - Session statistics and state

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::RecordingSession;
pub use stats::{SessionState, SessionStats};
