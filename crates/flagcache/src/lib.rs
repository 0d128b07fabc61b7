//! The feature-retrieval coordination core of a feature-flag client.
//!
//! This crate decides, on every request for feature definitions, whether to
//! serve from the local cache or to refresh from the remote delivery API,
//! and arbitrates concurrent callers so that refreshes are neither
//! duplicated nor block callers unnecessarily. See the [`caching`] module
//! docs for how the pieces fit together, and
//! [`repository::FeatureRepository`] for the public entry point.

pub mod caching;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod repository;
pub mod types;
pub mod utils;
