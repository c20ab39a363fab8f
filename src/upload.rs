//! Batch uploader: delivers a batch to the remote store and reflects
//! success locally.
//!
//! The write ordering here is load-bearing. The remote write must be
//! confirmed before any point is marked, and the mark-write lands in
//! the local store as an upsert over the original points. A crash
//! between the two writes leaves the batch unmarked, so the next fetch
//! re-sends it: delivery is at-least-once, never silent loss.

use crate::config::SourceDefinition;
use crate::error::Result;
use crate::metrics;
use crate::point::{Batch, Precision};
use crate::resilience::{await_connectivity, RetryPolicy};
use crate::store::TimeSeriesStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

/// Uploads batches to the remote store and marks them locally.
pub struct BatchUploader<S> {
    local: Arc<S>,
    remote: Arc<S>,
    connect_retry: RetryPolicy,
}

impl<S: TimeSeriesStore> BatchUploader<S> {
    pub fn new(local: Arc<S>, remote: Arc<S>, connect_retry: RetryPolicy) -> Self {
        Self {
            local,
            remote,
            connect_retry,
        }
    }

    /// Upload one batch, then mark it replicated in the local store.
    ///
    /// Blocks until the remote store answers a ping, pacing probes
    /// with the connect policy. Write rejections propagate with no
    /// marking performed; only reachability is retried, never the
    /// write itself.
    #[instrument(skip(self, source, batch, stop), fields(source = %source.name, points = batch.len()))]
    pub async fn upload(
        &self,
        source: &SourceDefinition,
        mut batch: Batch,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        await_connectivity(self.remote.as_ref(), &self.connect_retry, stop).await?;

        let started = Instant::now();
        self.remote
            .write_points(&batch, Precision::Milliseconds)
            .await?;
        debug!("remote write confirmed");

        for point in &mut batch {
            point.mark_replicated();
        }
        self.local
            .write_points(&batch, Precision::Milliseconds)
            .await?;

        metrics::record_points_marked(&source.name, batch.len());
        metrics::record_batch_upload(&source.name, batch.len(), started.elapsed());
        info!("batch replicated");
        Ok(())
    }
}
