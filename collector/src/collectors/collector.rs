use crate::{
    error::RefreshError,
    families::{
        FamilySpec,
        QueryPlan,
        NAMESPACE,
    },
    registry::{
        MetricRegistry,
        VectorHandle,
    },
    source::{
        AggregateQuery,
        QuerySource,
        Row,
        SourceError,
    },
    telemetry::RefreshTelemetry,
};
use std::{
    collections::BTreeMap,
    future::Future,
    pin::Pin,
    sync::Arc,
    time::Duration,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument as _;

pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<RefreshReport, RefreshError>> + Send + 'a>>;

/// Trait for refreshing one statistic family
pub trait Collector: Send + Sync {
    /// Query the family's statistics and replace its published snapshot
    fn refresh<'a>(&'a self, cancel: &'a CancellationToken) -> RefreshFuture<'a>;

    /// Get the unqualified name of the family this collector owns
    fn family(&self) -> &'static str;
}

/// Outcome of a successful refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub family: &'static str,
    pub series: usize,
    pub elapsed: Duration,
}

/// The complete set of series of one family, keyed by label tuple.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    series: BTreeMap<Vec<String>, f64>,
}

impl Snapshot {
    /// Returns the previous value if the tuple was already present.
    pub fn insert(&mut self, labels: Vec<String>, value: f64) -> Option<f64> {
        self.series.insert(labels, value)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<String>, f64)> {
        self.series.iter().map(|(labels, value)| (labels, *value))
    }
}

/// The one collector implementation, driven by a [`FamilySpec`] from the catalogue.
pub struct FamilyCollector {
    spec: &'static FamilySpec,
    handle: VectorHandle,
    registry: MetricRegistry,
    source: Arc<dyn QuerySource>,
    deadline: Duration,
    telemetry: RefreshTelemetry,
}

impl FamilyCollector {
    /// Declares the family's gauge vector and returns a collector ready to refresh it.
    pub fn new(
        spec: &'static FamilySpec,
        registry: &MetricRegistry,
        source: Arc<dyn QuerySource>,
        deadline: Duration,
        telemetry: RefreshTelemetry,
    ) -> prometheus::Result<Self> {
        let handle = registry.declare(NAMESPACE, spec.name, spec.help, spec.labels)?;
        Ok(Self {
            spec,
            handle,
            registry: registry.clone(),
            source,
            deadline,
            telemetry,
        })
    }

    pub fn handle(&self) -> &VectorHandle {
        &self.handle
    }

    /// Runs every query of the family and builds the next snapshot without touching the
    /// published one.
    async fn gather(&self) -> Result<Snapshot, SourceError> {
        let mut snapshot = Snapshot::default();

        match self.spec.plan {
            QueryPlan::Fixed(series) => {
                for fixed in series {
                    let rows = self.source.run(&AggregateQuery::scalar(fixed.sql)).await?;
                    let [row] = rows.as_slice() else {
                        return Err(SourceError::RowCount {
                            expected: 1,
                            actual: rows.len(),
                        });
                    };
                    let value = count(0, row, 0)?;
                    snapshot.insert(fixed.labels.iter().map(|label| label.to_string()).collect(), value);
                }
            }
            QueryPlan::Grouped(sql) => {
                let dimensions = self.spec.labels.len();
                let rows = self.source.run(&AggregateQuery::grouped(sql, dimensions)).await?;
                for (index, row) in rows.into_iter().enumerate() {
                    let value = count(index, &row, dimensions)?;
                    if let Some(previous) = snapshot.insert(row.dimensions.clone(), value) {
                        warn!(
                            family = self.spec.name,
                            labels = ?row.dimensions,
                            previous,
                            value,
                            "Duplicate label tuple in result, keeping the last row"
                        );
                    }
                }
            }
        }

        Ok(snapshot)
    }
}

fn count(index: usize, row: &Row, dimensions: usize) -> Result<f64, SourceError> {
    if row.dimensions.len() != dimensions {
        return Err(SourceError::Shape {
            row: index,
            column: row.dimensions.len().min(dimensions),
            reason: format!("expected {dimensions} dimension(s), got {}", row.dimensions.len()),
        });
    }
    if row.count < 0 {
        return Err(SourceError::Shape {
            row: index,
            column: dimensions,
            reason: format!("negative count {}", row.count),
        });
    }
    Ok(row.count as f64)
}

impl Collector for FamilyCollector {
    fn refresh<'a>(&'a self, cancel: &'a CancellationToken) -> RefreshFuture<'a> {
        let family = self.spec.name;
        let span = debug_span!("refresh", family);

        Box::pin(
            async move {
                let started = Instant::now();

                let gathered = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RefreshError::Cancelled { family }),
                    gathered = tokio::time::timeout(self.deadline, self.gather()) => gathered,
                };
                let elapsed = started.elapsed();

                let result = match gathered {
                    Ok(Ok(snapshot)) => self
                        .registry
                        .replace(&self.handle, &snapshot)
                        .map(|()| snapshot.len())
                        .map_err(|source| RefreshError::Registry { family, source }),
                    Ok(Err(source)) => Err(RefreshError::Source { family, source }),
                    Err(_) => Err(RefreshError::Timeout {
                        family,
                        deadline: self.deadline,
                    }),
                };

                match result {
                    Ok(series) => {
                        self.telemetry.record_success(family, series, elapsed);
                        debug!(series, elapsed_ms = elapsed.as_millis() as u64, "Published snapshot");
                        Ok(RefreshReport {
                            family,
                            series,
                            elapsed,
                        })
                    }
                    Err(err) => {
                        self.telemetry.record_failure(family, err.kind(), elapsed);
                        Err(err)
                    }
                }
            }
            .instrument(span),
        )
    }

    fn family(&self) -> &'static str {
        self.spec.name
    }
}
