//! Sentiment analytics over social-media mention exports.
//!
//! A semicolon-delimited dataset is loaded into an in-memory table,
//! sentiment labels are folded into a three-way taxonomy, and the engine
//! serves six memoized views over it: summary, time series, keywords,
//! topics, influencers, and geography. Re-ingesting a dataset replaces
//! the table wholesale and wipes every cached result.

/// Wire types for the HTTP surface.
pub mod api_types;
/// Flag/env/default settings resolution.
pub mod config;
/// Semicolon CSV loading, column resolution, and cell coercion.
pub mod dataset;
/// The analytics engine: table ownership, caching, and the six views.
pub mod engine;
/// Upload merging into the canonical backing file.
pub mod ingest;
/// Sentiment label taxonomy and normalization.
pub mod labels;
/// Record/table schema and typed query results.
pub mod models;
/// Text cleaning shared with the prediction side.
pub mod preprocess;
/// actix-web routes over the engine.
pub mod server;

pub use engine::MetricsEngine;
pub use labels::{normalize, Sentiment};
pub use models::{Freq, Record, SortKey, Table};
