//! # Uplink
//!
//! A replication daemon that moves time-series points from a local
//! store to a remote one, marking each point once it has landed.
//!
//! ## Architecture
//!
//! The engine drives a single flow of control over two HTTP store
//! clients:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                               uplink                                  │
//! │                                                                       │
//! │  ┌──────────────┐     ┌───────────────┐     ┌──────────────────────┐  │
//! │  │ PointFetcher │────►│ BatchUploader │────►│ mark-write (local)   │  │
//! │  │ status = 0   │     │ remote write  │     │ status = 1.0, floats │  │
//! │  └──────────────┘     └───────────────┘     └──────────────────────┘  │
//! │         │                     │                                       │
//! │         ▼                     ▼                                       │
//! │  ┌──────────────┐     ┌─────────────────────┐                         │
//! │  │ local store  │     │ connectivity wait   │                         │
//! │  │ HTTP client  │     │ (ping remote, 30s)  │                         │
//! │  └──────────────┘     └─────────────────────┘                         │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Replication Cycle
//!
//! For every configured source, forever:
//! 1. Fetch up to `limit` points with `status = 0` from the local store
//! 2. Wait until the remote store answers a ping (retrying indefinitely)
//! 3. Write the batch to the remote store
//! 4. Write the same batch back locally with every field coerced to
//!    float and `status = 1.0` (an upsert over the original points)
//!
//! The remote write strictly precedes the local mark, so a crash
//! between the two re-sends the batch on restart: delivery is
//! at-least-once, never silent loss.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use uplink::{HttpStoreClient, ReplicationEngine, ReplicatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> uplink::Result<()> {
//!     let config = ReplicatorConfig::load(std::path::Path::new("config.toml"))?;
//!     let local = Arc::new(HttpStoreClient::new(config.local.clone())?);
//!     let remote = Arc::new(HttpStoreClient::new(config.remote.clone())?);
//!
//!     let engine = ReplicationEngine::new(config, local, remote);
//!     // Runs until a stop request or a fatal error
//!     engine.run().await
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod point;
pub mod query;
pub mod resilience;
pub mod store;
pub mod upload;

// Re-exports for convenience
pub use config::{EngineSettings, ReplicatorConfig, SourceDefinition, StoreConfig};
pub use engine::{EngineState, ReplicationEngine};
pub use error::{ReplicationError, Result};
pub use fetch::PointFetcher;
pub use point::{Batch, FieldValue, Point, Precision};
pub use resilience::RetryPolicy;
pub use store::{HttpStoreClient, QueryRow, TimeSeriesStore};
pub use upload::BatchUploader;
