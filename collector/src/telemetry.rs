//! Self-telemetry about refresh cycles, published next to the statistic families.

use crate::registry::MetricRegistry;
use prometheus::{
    core::Collector,
    proto::Metric,
    GaugeVec,
    IntCounterVec,
    IntGaugeVec,
    Opts,
};
use std::time::{
    Duration,
    SystemTime,
    UNIX_EPOCH,
};

pub const TELEMETRY_NAMESPACE: &str = "sapawarga_exporter";

#[derive(Clone)]
pub struct RefreshTelemetry {
    duration: GaugeVec,
    failures: IntCounterVec,
    last_success: GaugeVec,
    series: IntGaugeVec,
}

impl RefreshTelemetry {
    pub fn register(registry: &MetricRegistry) -> prometheus::Result<Self> {
        let duration = GaugeVec::new(
            Opts::new("refresh_duration_seconds", "Wall time of the last refresh attempt")
                .namespace(TELEMETRY_NAMESPACE),
            &["family"],
        )?;
        let failures = IntCounterVec::new(
            Opts::new("refresh_failures_total", "Failed refreshes by family and error kind")
                .namespace(TELEMETRY_NAMESPACE),
            &["family", "kind"],
        )?;
        let last_success = GaugeVec::new(
            Opts::new(
                "last_success_timestamp_seconds",
                "Unix time of the last successful refresh",
            )
            .namespace(TELEMETRY_NAMESPACE),
            &["family"],
        )?;
        let series = IntGaugeVec::new(
            Opts::new("series", "Series in the current snapshot of each family").namespace(TELEMETRY_NAMESPACE),
            &["family"],
        )?;

        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(last_success.clone()))?;
        registry.register(Box::new(series.clone()))?;

        Ok(Self {
            duration,
            failures,
            last_success,
            series,
        })
    }

    pub fn record_success(&self, family: &str, series: usize, elapsed: Duration) {
        self.duration.with_label_values(&[family]).set(elapsed.as_secs_f64());
        self.series.with_label_values(&[family]).set(series as i64);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        self.last_success.with_label_values(&[family]).set(now);
    }

    pub fn record_failure(&self, family: &str, kind: &str, elapsed: Duration) {
        self.duration.with_label_values(&[family]).set(elapsed.as_secs_f64());
        self.failures.with_label_values(&[family, kind]).inc();
    }

    /// Failed refreshes of `family` with this error kind. Reading never creates the series.
    pub fn failures(&self, family: &str, kind: &str) -> u64 {
        let labels = [("family", family), ("kind", kind)];
        read(&self.failures, &labels, |m| m.get_counter().get_value()).unwrap_or_default() as u64
    }

    pub fn series(&self, family: &str) -> i64 {
        read(&self.series, &[("family", family)], |m| m.get_gauge().get_value()).unwrap_or_default() as i64
    }
}

fn read(collector: &impl Collector, labels: &[(&str, &str)], value: impl Fn(&Metric) -> f64) -> Option<f64> {
    collector
        .collect()
        .iter()
        .flat_map(|family| family.get_metric().iter())
        .find(|metric| {
            labels.iter().all(|(name, expected)| {
                metric
                    .get_label()
                    .iter()
                    .any(|pair| pair.get_name() == *name && pair.get_value() == *expected)
            })
        })
        .map(value)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reading_counters_does_not_create_series() {
        let registry = MetricRegistry::new();
        let telemetry = RefreshTelemetry::register(&registry).unwrap();

        assert_eq!(telemetry.failures("users_posts", "source"), 0);
        assert_eq!(telemetry.series("users_posts"), 0);
        assert!(!registry.render().unwrap().contains("users_posts"));

        telemetry.record_failure("users_posts", "timeout", Duration::from_secs(2));
        telemetry.record_success("users_recent_active", 4, Duration::from_millis(30));

        assert_eq!(telemetry.failures("users_posts", "timeout"), 1);
        assert_eq!(telemetry.failures("users_posts", "source"), 0);
        assert_eq!(telemetry.series("users_recent_active"), 4);
        assert!(!registry
            .render()
            .unwrap()
            .contains("refresh_failures_total{family=\"users_posts\",kind=\"source\"}"));
    }
}
