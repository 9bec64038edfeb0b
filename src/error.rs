//! # Error types for the event loop façade.
//!
//! The dispatch core never unwinds across the façade: handler panics are
//! caught and counted, queue overflow drops the envelope, and unknown ids
//! come back as `false`. [`LoopError`] covers the one surface that does
//! fail — loop ownership.

use thiserror::Error;

/// Errors produced by [`EventLoop::run`](crate::EventLoop::run).
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoopError {
    /// `run` was called while another caller already owns the loop.
    #[error("event loop is already running")]
    AlreadyRunning,

    /// `run` was called after `stop_loop`; a stopped loop cannot restart.
    #[error("event loop has been stopped")]
    Stopped,
}

impl LoopError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoopError::AlreadyRunning => "loop_already_running",
            LoopError::Stopped => "loop_stopped",
        }
    }
}
