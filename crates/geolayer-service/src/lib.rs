//! Layer aggregation service
//!
//! Routes `(source, location, data_type)` requests onto provider adapters,
//! synthesizes spatial features and wraps everything in a never-failing
//! FeatureCollection envelope. A TTL cache and a rule-based intent
//! classifier sit in front.

pub mod aggregator;
pub mod cache;
pub mod dispatch;
pub mod intent;
pub mod pipeline;

pub use aggregator::{AggregationService, DynAdapter, Providers};
pub use cache::{LayerCache, DEFAULT_TTL};
pub use dispatch::{Dispatch, SourceKind};
pub use intent::{Intent, IntentClassifier, LayerRequest};
pub use pipeline::{ChatResponse, LayerPipeline};
