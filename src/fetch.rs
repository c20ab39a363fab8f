//! Point fetcher: produces the next batch for one source.
//!
//! One fetch pass runs a single statement against the local store:
//!
//! ```text
//! SELECT "f1","f2" FROM "measurement" WHERE "status"=0 AND "tag"='value' LIMIT n
//! ```
//!
//! Rows come back in store order (time ascending) and become points
//! carrying the source's configured tag set verbatim. An empty result
//! is the normal idle outcome, not an error.

use crate::config::SourceDefinition;
use crate::error::Result;
use crate::metrics;
use crate::point::{Batch, Point, Precision, STATUS_FIELD};
use crate::query::SelectBuilder;
use crate::store::TimeSeriesStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Fetches unmarked points from the local store, one source at a time.
pub struct PointFetcher<S> {
    local: Arc<S>,
}

impl<S: TimeSeriesStore> PointFetcher<S> {
    pub fn new(local: Arc<S>) -> Self {
        Self { local }
    }

    /// Fetch the next batch of unmarked points for `source`.
    ///
    /// Returns `None` when nothing matches. The batch preserves the
    /// store's row order and never exceeds the source's limit.
    #[instrument(skip(self, source), fields(source = %source.name))]
    pub async fn fetch(&self, source: &SourceDefinition) -> Result<Option<Batch>> {
        let statement = fetch_statement(source);
        debug!(statement = %statement, "fetching unmarked points");

        let started = Instant::now();
        let rows = self
            .local
            .query(&statement, Precision::Milliseconds)
            .await?;
        metrics::record_fetch_duration(&source.name, started.elapsed());

        if rows.is_empty() {
            debug!("no unmarked points");
            return Ok(None);
        }
        metrics::record_points_fetched(&source.name, rows.len());

        let batch: Batch = rows
            .into_iter()
            .map(|row| Point {
                measurement: source.measurement.clone(),
                tags: source.tags.clone(),
                timestamp: row.timestamp,
                fields: row.values,
            })
            .collect();
        Ok(Some(batch))
    }
}

/// Build the filter statement for one source: configured fields from
/// its measurement, unmarked points only, every configured tag as an
/// equality predicate, capped at the source's limit.
fn fetch_statement(source: &SourceDefinition) -> String {
    let mut builder = SelectBuilder::from_measurement(&source.measurement)
        .fields(source.fields.iter().map(String::as_str))
        .and_field_eq(STATUS_FIELD, 0);
    for (key, value) in &source.tags {
        builder = builder.and_tag_eq(key, value);
    }
    builder.limit(source.limit).build()
}
