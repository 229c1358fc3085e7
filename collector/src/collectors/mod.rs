//! # Collectors Module
//!
//! The snapshot-refresh engine.
//!
//! ## Architecture
//!
//! - **`Collector` trait**: refreshes one statistic family
//! - **`FamilyCollector`**: the catalogue-driven implementation used for every family
//! - **`CadenceGroup`**: collectors run back-to-back, then a fixed sleep, in a loop
//! - **`Scheduler`**: runs every cadence group as an independent task
//!
//! ## Refresh semantics
//!
//! A refresh first gathers the complete result of all of the family's queries, then clears the
//! gauge vector and sets one series per result row. A failing or timed out query leaves the
//! previously published snapshot untouched.

pub mod cadence;
pub mod collector;
pub mod scheduler;

pub use cadence::{
    CadenceGroup,
    CycleSummary,
    GroupState,
};
pub use collector::{
    Collector,
    FamilyCollector,
    RefreshFuture,
    RefreshReport,
    Snapshot,
};
pub use scheduler::Scheduler;
