// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication engine: the top-level driver.
//!
//! Ties together:
//! - Store clients via [`crate::store::TimeSeriesStore`]
//! - Point fetching via [`crate::fetch::PointFetcher`]
//! - Batch upload and marking via [`crate::upload::BatchUploader`]
//! - Connectivity waits via [`crate::resilience`]
//!
//! # Architecture
//!
//! The engine owns the full replication lifecycle:
//! 1. One-shot liveness check against the local store (fatal if unreachable)
//! 2. Blocking wait until the remote store answers a ping
//! 3. Unbounded source cycle: fetch unmarked points, upload, mark, pause
//! 4. On exit, closes both store connections: cleanly on a stop request,
//!    with the error propagated on any fatal failure
//!
//! Everything runs on one flow of control. No source overlaps another,
//! so a slow remote delays every source equally; the only suspension
//! points are the connectivity wait and the inter-source pause.

mod types;

pub use types::EngineState;

use crate::config::{EngineSettings, ReplicatorConfig};
use crate::error::{ReplicationError, Result};
use crate::fetch::PointFetcher;
use crate::metrics;
use crate::resilience::{await_connectivity, suspend};
use crate::store::TimeSeriesStore;
use crate::upload::BatchUploader;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// The replication engine.
///
/// Drives continuous local-to-remote replication across all configured
/// sources. The engine is handed its two store clients at construction
/// and never builds connections itself, so the same driver runs against
/// production HTTP clients and in-memory test stores alike.
pub struct ReplicationEngine<S: TimeSeriesStore> {
    /// Configuration, read-only for the engine's lifetime.
    config: ReplicatorConfig,

    /// Pacing knobs (connect retry interval, inter-source pause).
    settings: EngineSettings,

    /// Local store: fetched from, and mark-written to.
    local: Arc<S>,

    /// Remote store: upload target.
    remote: Arc<S>,

    /// Engine state (broadcast to watchers).
    state_tx: watch::Sender<EngineState>,

    /// Engine state receiver (for internal use).
    state_rx: watch::Receiver<EngineState>,

    /// Stop signal sender.
    shutdown_tx: watch::Sender<bool>,

    /// Stop signal receiver; cloned into every timed wait.
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: TimeSeriesStore> ReplicationEngine<S> {
    /// Create an engine with default pacing.
    ///
    /// The engine starts in `Created` state. Call [`run()`](Self::run)
    /// to begin replication.
    pub fn new(config: ReplicatorConfig, local: Arc<S>, remote: Arc<S>) -> Self {
        Self::with_settings(config, local, remote, EngineSettings::default())
    }

    /// Create an engine with explicit pacing settings.
    pub fn with_settings(
        config: ReplicatorConfig,
        local: Arc<S>,
        remote: Arc<S>,
        settings: EngineSettings,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(EngineState::Created);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            settings,
            local,
            remote,
            state_tx,
            state_rx,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Get current engine state.
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    pub fn state_receiver(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Check if the engine is running.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), EngineState::Running)
    }

    /// Request a stop.
    ///
    /// Safe to call from another task (the engine is shared behind an
    /// `Arc` for exactly this). The running cycle observes the signal
    /// at its next check or timed wait; in-flight network calls are
    /// not cancelled, only cleaned up once control returns.
    pub fn request_stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Run replication until a stop request or a fatal error.
    ///
    /// Returns `Ok(())` after a stop request was honored and both
    /// store connections closed. Any other exit closes both
    /// connections and propagates the error.
    pub async fn run(&self) -> Result<()> {
        if self.state() != EngineState::Created {
            return Err(ReplicationError::InvalidState {
                expected: "Created".to_string(),
                actual: format!("{:?}", self.state()),
            });
        }

        let result = self.replicate().await;

        // Both connections close on every exit path.
        self.local.close();
        self.remote.close();

        match result {
            Err(ReplicationError::Shutdown) | Ok(()) => {
                self.set_state(EngineState::Stopped);
                info!("replication stopped");
                Ok(())
            }
            Err(e) => {
                self.set_state(EngineState::Failed);
                metrics::record_error(match &e {
                    ReplicationError::Query { .. } => "fetch",
                    ReplicationError::Write { .. } => "upload",
                    _ => "connect",
                });
                error!(error = %e, "replication failed");
                Err(e)
            }
        }
    }

    /// The replication cycle proper. Exits only by error; a stop
    /// request surfaces as `Err(Shutdown)`.
    async fn replicate(&self) -> Result<()> {
        let mut stop = self.shutdown_rx.clone();

        self.set_state(EngineState::ConnectingLocal);
        let local_version = self.local.ping().await.map_err(|e| {
            error!(endpoint = %self.config.local.endpoint(), error = %e, "local store unreachable");
            e
        })?;
        info!(
            endpoint = %self.config.local.endpoint(),
            version = %local_version,
            "local store connected"
        );

        self.set_state(EngineState::ConnectingRemote);
        let remote_version = await_connectivity(
            self.remote.as_ref(),
            &self.settings.connect_retry,
            &mut stop,
        )
        .await?;
        info!(
            endpoint = %self.config.remote.endpoint(),
            version = %remote_version,
            "remote store connected"
        );

        self.set_state(EngineState::Running);
        info!(sources = self.config.sources.len(), "replication running");

        let fetcher = PointFetcher::new(Arc::clone(&self.local));
        let uploader = BatchUploader::new(
            Arc::clone(&self.local),
            Arc::clone(&self.remote),
            self.settings.connect_retry,
        );

        loop {
            for source in &self.config.sources {
                if *stop.borrow() {
                    return Err(ReplicationError::Shutdown);
                }
                if let Some(batch) = fetcher.fetch(source).await? {
                    uploader.upload(source, batch, &mut stop).await?;
                }
                suspend(self.settings.source_pause, &mut stop).await?;
            }
        }
    }

    fn set_state(&self, state: EngineState) {
        let _ = self.state_tx.send(state);
        metrics::set_engine_state(&state.to_string());
        debug!(state = %state, "engine state changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::{Point, Precision};
    use crate::store::{BoxFuture, QueryRow};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always-healthy store that records closes.
    struct NullStore {
        ping_ok: bool,
        closes: AtomicUsize,
    }

    impl NullStore {
        fn new() -> Self {
            Self {
                ping_ok: true,
                closes: AtomicUsize::new(0),
            }
        }

        fn unreachable() -> Self {
            let mut store = Self::new();
            store.ping_ok = false;
            store
        }
    }

    impl TimeSeriesStore for NullStore {
        fn ping(&self) -> BoxFuture<'_, String> {
            let result = if self.ping_ok {
                Ok("mock".to_string())
            } else {
                Err(ReplicationError::connectivity_msg(
                    "mock:8086",
                    "connection refused",
                ))
            };
            Box::pin(async move { result })
        }

        fn query(&self, _statement: &str, _precision: Precision) -> BoxFuture<'_, Vec<QueryRow>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn write_points(&self, _batch: &[Point], _precision: Precision) -> BoxFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn engine_with(local: NullStore, remote: NullStore) -> ReplicationEngine<NullStore> {
        ReplicationEngine::with_settings(
            ReplicatorConfig::for_testing(),
            Arc::new(local),
            Arc::new(remote),
            EngineSettings::testing(),
        )
    }

    #[test]
    fn test_engine_initial_state() {
        let engine = engine_with(NullStore::new(), NullStore::new());
        assert_eq!(engine.state(), EngineState::Created);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_engine_state_receiver() {
        let engine = engine_with(NullStore::new(), NullStore::new());
        let state_rx = engine.state_receiver();
        assert_eq!(*state_rx.borrow(), EngineState::Created);
    }

    #[tokio::test]
    async fn test_run_rejects_non_created_state() {
        let engine = engine_with(NullStore::new(), NullStore::new());
        let _ = engine.state_tx.send(EngineState::Running);

        let result = engine.run().await;
        match result {
            Err(ReplicationError::InvalidState { expected, actual }) => {
                assert_eq!(expected, "Created");
                assert_eq!(actual, "Running");
            }
            other => panic!("expected InvalidState, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_request_before_run_exits_cleanly() {
        let engine = engine_with(NullStore::new(), NullStore::new());
        engine.request_stop();

        engine.run().await.unwrap();

        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(engine.local.closes.load(Ordering::SeqCst), 1);
        assert_eq!(engine.remote.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_local_store_is_fatal() {
        let engine = engine_with(NullStore::unreachable(), NullStore::new());

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, ReplicationError::Connectivity { .. }));
        assert_eq!(engine.state(), EngineState::Failed);
        // both connections closed even though only the local one was used
        assert_eq!(engine.local.closes.load(Ordering::SeqCst), 1);
        assert_eq!(engine.remote.closes.load(Ordering::SeqCst), 1);
    }
}
