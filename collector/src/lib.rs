//! # Sapawarga Exporter Collector
//!
//! Periodically computes user-activity statistics from the Sapawarga database and republishes
//! them as Prometheus gauge vectors.
//!
//! ## Architecture
//!
//! - **`source`**: aggregate queries against the activity store (`MySqlSource`)
//! - **`registry`**: the gauge vectors read by the metrics endpoint
//! - **`families`**: the fixed catalogue of published statistic families
//! - **`collectors`**: collectors, cadence groups and the scheduler
//! - **`telemetry`**: the exporter's own refresh metrics

#[macro_use]
extern crate tracing;

pub mod collectors;
pub mod error;
pub mod families;
pub mod registry;
pub mod source;
pub mod telemetry;

pub use collectors::*;
pub use error::{
    Error,
    RefreshError,
};
pub use registry::{
    MetricRegistry,
    VectorHandle,
};
pub use source::{
    AggregateQuery,
    MySqlSource,
    QueryFuture,
    QuerySource,
    Row,
    SourceError,
};
pub use telemetry::RefreshTelemetry;
