//! Country-level choropleth data: fetches a percentage dataset, country
//! metadata and world boundaries, joins them into one enriched feature
//! collection, and drives per-country highlighting.

pub mod classify;
pub mod config;
pub mod context;
pub mod data;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod interaction;
pub mod join;
pub mod render;
pub mod server;
pub mod stats;
pub mod style;
pub mod topology;
pub mod types;

pub use classify::{ColorBucket, ColorClassifier};
pub use context::MapContext;
pub use error::{ClassifierError, PipelineError};
pub use interaction::{FeatureLayer, InfoPanel, InteractionController};
pub use stats::AggregateStat;
