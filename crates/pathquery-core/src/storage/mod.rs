//! Storage layer for pathquery.
//!
//! This module provides a sled-based row store: one tree of rows per entity
//! type plus an identity index.

mod config;
mod engine;
mod record;

pub use config::StorageConfig;
pub use engine::StorageEngine;
pub use record::{current_timestamp, Record};
