//! Runtime layer for player analytics.
//!
//! Owns the dataset cache and the interactive session that recomputes the
//! dashboard after every filter change.

pub mod data_manager;
pub mod session;

pub use analytics_core as core;
pub use analytics_data as data;
