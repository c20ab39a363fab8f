//! Shared test utilities for engine and chaos tests.
//!
//! This module provides:
//! - An in-memory mock store with upsert and status filtering
//! - An ordered op log for cross-store ordering assertions
//! - Failure injection for pings and writes

pub mod mock_store;

pub use mock_store::*;
