//! Engine state types.
//!
//! Defines the state machine for the replication engine lifecycle.
//!
//! # State Transitions
//!
//! ```text
//!                run()
//! Created ─────────────→ ConnectingLocal
//!                              │
//!                              │ (local store answered)
//!                              ↓
//!                        ConnectingRemote ──────────────┐
//!                              │                        │
//!                              │ (remote store          │
//!                              ↓  answered)             │ (stop requested)
//!                           Running ────────────────────┤
//!                              │                        ↓
//!                              │ (fatal error)       Stopped
//!                              ↓
//!                           Failed
//! ```
//!
//! The one-shot local check never waits: an unreachable local store
//! fails the engine from `ConnectingLocal`. The remote wait and every
//! later suspension honor the stop signal, so `Stopped` is reachable
//! from `ConnectingRemote` and `Running`.
//!
//! # State Descriptions
//!
//! - **Created**: Initial state after `ReplicationEngine::new()`. No network traffic yet.
//! - **ConnectingLocal**: One-shot liveness check against the local store.
//! - **ConnectingRemote**: Blocking wait until the remote store answers a ping.
//! - **Running**: Cycling over sources: fetch, upload, mark, pause.
//! - **Stopped**: Stop request honored, both connections closed. Exit is clean.
//! - **Failed**: Fatal error, both connections closed, error propagated to the caller.

/// State of the replication engine.
///
/// See module docs for the state transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Engine created but not started.
    ///
    /// Call [`run()`](super::ReplicationEngine::run) to begin replication.
    Created,

    /// Checking that the local store is reachable.
    ///
    /// A connectivity failure here is fatal; the initial local check
    /// does not retry.
    ConnectingLocal,

    /// Waiting for the remote store to become reachable.
    ///
    /// Retries indefinitely at the configured connect interval.
    ConnectingRemote,

    /// Replicating.
    ///
    /// Sources are processed strictly one at a time, in configured
    /// order, forever.
    Running,

    /// Stopped on request.
    ///
    /// Both store connections are closed. Safe to drop.
    Stopped,

    /// Unrecoverable error.
    ///
    /// Check logs for error details. Both store connections are closed.
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Created => write!(f, "Created"),
            EngineState::ConnectingLocal => write!(f, "ConnectingLocal"),
            EngineState::ConnectingRemote => write!(f, "ConnectingRemote"),
            EngineState::Running => write!(f, "Running"),
            EngineState::Stopped => write!(f, "Stopped"),
            EngineState::Failed => write!(f, "Failed"),
        }
    }
}
