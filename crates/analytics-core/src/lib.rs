//! Core types for player analytics.
//!
//! Record models, the segmentation bin tables, the derivation engine and the
//! small numeric, time and formatting helpers shared by the data and runtime
//! crates.

pub mod derivation;
pub mod error;
pub mod formatting;
pub mod models;
pub mod quantile;
pub mod segments;
pub mod settings;
pub mod time_utils;

pub use error::{AnalyticsError, Result};
