// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Store client: the network boundary to one time-series store.
//!
//! The engine talks to two stores (local and remote) through the
//! [`TimeSeriesStore`] trait; [`HttpStoreClient`] is the production
//! implementation over the store's v1 HTTP API:
//!
//! ```text
//! GET  /ping                          liveness; version in X-Influxdb-Version
//! GET  /query?db=…&q=…&epoch=ms       JSON results: series/columns/values
//! POST /write?db=…&precision=ms       line protocol body; 204 on success
//! ```
//!
//! This layer is a thin, faithful transport: no retry logic lives here,
//! and no request timeout is set; a stalled call blocks the engine's
//! single flow of control until the transport gives up. All resilience
//! policy belongs to the layers above.
//!
//! Errors are classified by operation: transport failures are
//! `Connectivity` (retryable), store-side rejections are `Query` or
//! `Write` (fatal).

use crate::config::StoreConfig;
use crate::error::{ReplicationError, Result};
use crate::point::{render_lines, FieldValue, Point, Precision};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, trace};

/// Response header carrying the store's version.
const VERSION_HEADER: &str = "X-Influxdb-Version";

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// One query result row: a timestamp plus the non-time columns.
///
/// The `time` column is surfaced only as [`timestamp`](Self::timestamp);
/// null column values are omitted from [`values`](Self::values).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    /// Epoch timestamp in the query's precision.
    pub timestamp: i64,
    /// Column name to decoded value, `time` excluded.
    pub values: BTreeMap<String, FieldValue>,
}

/// Trait defining what the engine needs from a store.
///
/// The engine drives two instances of this (local and remote) from a
/// single flow of control. The trait exists so the fetch/upload/loop
/// layers are testable against mocks.
pub trait TimeSeriesStore: Send + Sync + 'static {
    /// Liveness check. Returns the store's version string.
    ///
    /// Any failure, including a rejected ping, is a `Connectivity`
    /// error so the connectivity monitor can wait it out.
    fn ping(&self) -> BoxFuture<'_, String>;

    /// Execute a fetch statement with the given timestamp precision.
    fn query(&self, statement: &str, precision: Precision) -> BoxFuture<'_, Vec<QueryRow>>;

    /// Write a batch of points with the given timestamp precision.
    ///
    /// Writing a point whose (measurement, tags, timestamp) identity
    /// already exists upserts it in place; the uploader's mark-write
    /// relies on this.
    fn write_points(&self, batch: &[Point], precision: Precision) -> BoxFuture<'_, ()>;

    /// Release the underlying connection. Idempotent.
    fn close(&self);
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP implementation
// ═══════════════════════════════════════════════════════════════════════════════

/// HTTP client for one store instance.
///
/// Built from a [`StoreConfig`]: `https` when `secure`, basic auth
/// attached per request when a username is configured, certificate
/// verification disabled when `verify_certs` is off.
pub struct HttpStoreClient {
    config: StoreConfig,
    base_url: String,
    client: reqwest::Client,
}

impl HttpStoreClient {
    /// Build a client for the given store.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if !config.verify_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| ReplicationError::Config(format!("http client: {}", e)))?;
        let base_url = config.base_url();
        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// `host:port` of the store this client talks to.
    pub fn endpoint(&self) -> String {
        self.config.endpoint()
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut rb = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(username) = &self.config.username {
            rb = rb.basic_auth(username, self.config.password.as_deref());
        }
        rb
    }

    /// Liveness check against `/ping`.
    pub async fn ping(&self) -> Result<String> {
        let response = self
            .request(reqwest::Method::GET, "/ping")
            .send()
            .await
            .map_err(|e| ReplicationError::connectivity(self.endpoint(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReplicationError::connectivity_msg(
                self.endpoint(),
                format!("ping returned {}", status),
            ));
        }

        let version = response
            .headers()
            .get(VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        trace!(endpoint = %self.endpoint(), version = %version, "ping ok");
        Ok(version)
    }

    /// Execute a statement against `/query`.
    pub async fn query(&self, statement: &str, precision: Precision) -> Result<Vec<QueryRow>> {
        let response = self
            .request(reqwest::Method::GET, "/query")
            .query(&[
                ("db", self.config.database.as_str()),
                ("q", statement),
                ("epoch", precision.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ReplicationError::connectivity(self.endpoint(), e))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_body(response).await.unwrap_or_else(|| status.to_string());
            return Err(ReplicationError::query(statement, message));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| ReplicationError::query(statement, format!("malformed response: {}", e)))?;
        decode_query_response(statement, body)
    }

    /// Write a batch to `/write` as line protocol.
    pub async fn write_points(&self, batch: &[Point], precision: Precision) -> Result<()> {
        self.write_body(render_lines(batch), batch.len(), precision)
            .await
    }

    /// Write an already-rendered line protocol body.
    async fn write_body(&self, body: String, count: usize, precision: Precision) -> Result<()> {
        debug!(endpoint = %self.endpoint(), points = count, "writing points");

        let response = self
            .request(reqwest::Method::POST, "/write")
            .query(&[
                ("db", self.config.database.as_str()),
                ("precision", precision.as_str()),
            ])
            .body(body)
            .send()
            .await
            .map_err(|e| ReplicationError::connectivity(self.endpoint(), e))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_body(response).await.unwrap_or_else(|| status.to_string());
            return Err(ReplicationError::write(self.endpoint(), message));
        }
        Ok(())
    }

    /// Release the connection.
    ///
    /// Pooled connections are torn down when the client drops; this
    /// exists so teardown is explicit and the call is observable on
    /// the trait seam.
    pub fn close(&self) {
        debug!(endpoint = %self.endpoint(), "store client closed");
    }
}

impl TimeSeriesStore for HttpStoreClient {
    fn ping(&self) -> BoxFuture<'_, String> {
        Box::pin(self.ping())
    }

    fn query(&self, statement: &str, precision: Precision) -> BoxFuture<'_, Vec<QueryRow>> {
        let statement = statement.to_string();
        Box::pin(async move { self.query(&statement, precision).await })
    }

    fn write_points(&self, batch: &[Point], precision: Precision) -> BoxFuture<'_, ()> {
        let body = render_lines(batch);
        let count = batch.len();
        Box::pin(async move { self.write_body(body, count, precision).await })
    }

    fn close(&self) {
        HttpStoreClient::close(self)
    }
}

/// Pull the store's error message out of a failed response body.
///
/// The store answers rejections with `{"error": "..."}`; fall back to
/// the raw body text when it isn't JSON.
async fn error_body(response: reqwest::Response) -> Option<String> {
    let text = response.text().await.ok()?;
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return Some(message.to_string());
        }
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Query response decoding
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Flatten a decoded query response into rows.
///
/// Per-statement errors surface as `Query` errors even though the HTTP
/// status was 200. Rows keep series order; the `time` column becomes
/// the row timestamp and never appears among the values.
fn decode_query_response(statement: &str, body: QueryResponse) -> Result<Vec<QueryRow>> {
    let mut rows = Vec::new();
    for result in body.results {
        if let Some(message) = result.error {
            return Err(ReplicationError::query(statement, message));
        }
        for series in result.series {
            let time_index = series
                .columns
                .iter()
                .position(|c| c == "time")
                .ok_or_else(|| {
                    ReplicationError::query(statement, "malformed response: no time column")
                })?;
            for value_row in series.values {
                let timestamp = value_row
                    .get(time_index)
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| {
                        ReplicationError::query(
                            statement,
                            "malformed response: non-integer timestamp",
                        )
                    })?;
                let mut values = BTreeMap::new();
                for (i, column) in series.columns.iter().enumerate() {
                    if i == time_index {
                        continue;
                    }
                    if let Some(value) =
                        value_row.get(i).and_then(FieldValue::from_json)
                    {
                        values.insert(column.clone(), value);
                    }
                }
                rows.push(QueryRow { timestamp, values });
            }
        }
    }
    Ok(rows)
}
