//! # Aggregate Query Source
//!
//! The read side of the exporter. A source executes one fixed, parameterless aggregate query and
//! hands back its rows as `(dimension values..., count)`. Time windows such as "the last five
//! minutes" or "this ISO week" live inside the SQL and are evaluated by the database clock.
//!
//! Sources never retry. Every failure is returned to the caller as a [`SourceError`].
//!
//! Cancellation is expressed the async way: a collector that gives up on a query (deadline or
//! shutdown) drops the returned future, which releases the pooled connection mid-query.

use std::{
    future::Future,
    pin::Pin,
};

mod mysql;

pub use mysql::MySqlSource;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type QueryFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Row>, SourceError>> + Send + 'a>>;

/// A fixed aggregate query and the number of leading string columns it yields before the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateQuery {
    pub sql: &'static str,
    pub dimensions: usize,
}

impl AggregateQuery {
    pub const fn scalar(sql: &'static str) -> Self {
        Self { sql, dimensions: 0 }
    }

    pub const fn grouped(sql: &'static str, dimensions: usize) -> Self {
        Self { sql, dimensions }
    }
}

/// One aggregate result row. Missing values are carried as empty strings, never as nulls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub dimensions: Vec<String>,
    pub count: i64,
}

impl Row {
    pub fn new<I, S>(dimensions: I, count: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            count,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("database connection failed: {0}")]
    Connection(#[source] BoxError),
    #[error("query failed: {0}")]
    Query(#[source] BoxError),
    #[error("row {row}, column {column} has an unexpected shape: {reason}")]
    Shape { row: usize, column: usize, reason: String },
    #[error("expected {expected} row(s), got {actual}")]
    RowCount { expected: usize, actual: usize },
}

/// Executes aggregate queries against the activity store.
///
/// Implementations must tolerate concurrent callers: every cadence group shares one source.
pub trait QuerySource: Send + Sync {
    fn run<'a>(&'a self, query: &'a AggregateQuery) -> QueryFuture<'a>;
}
