//! # Metric Registry
//!
//! A thin layer over a [`prometheus::Registry`] that only offers the mutation pattern the
//! collectors rely on: declare a gauge vector once, then replace its series with `clear`
//! followed by `set` calls. The registry is cheap to clone and every clone shares the same
//! series, so the export surface and all cadence groups can hold their own copy.

use crate::collectors::Snapshot;
use prometheus::{
    core::Collector as _,
    GaugeVec,
    Opts,
    Registry,
    TextEncoder,
};
use std::fmt;

/// Write handle for one declared statistic family.
#[derive(Clone)]
pub struct VectorHandle {
    name: String,
    labels: &'static [&'static str],
    vec: GaugeVec,
}

impl fmt::Debug for VectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorHandle")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .finish()
    }
}

impl VectorHandle {
    /// Current series of this family as `(label values, value)`, in label order.
    pub fn series(&self) -> Vec<(Vec<String>, f64)> {
        let mut series: Vec<_> = self
            .vec
            .collect()
            .iter()
            .flat_map(|family| family.get_metric().iter())
            .map(|metric| {
                // Exposition sorts label pairs by name; restore the declared order.
                let values: Vec<String> = self
                    .labels
                    .iter()
                    .map(|label| {
                        metric
                            .get_label()
                            .iter()
                            .find(|pair| pair.get_name() == *label)
                            .map(|pair| pair.get_value().to_string())
                            .unwrap_or_default()
                    })
                    .collect();
                (values, metric.get_gauge().get_value())
            })
            .collect();
        series.sort_by(|a, b| a.0.cmp(&b.0));
        series
    }
}

#[derive(Clone, Default)]
pub struct MetricRegistry {
    registry: Registry,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gauge vector. Must happen once per family, before the first refresh.
    pub fn declare(
        &self,
        namespace: &str,
        name: &str,
        help: &str,
        labels: &'static [&'static str],
    ) -> prometheus::Result<VectorHandle> {
        let opts = Opts::new(name, help).namespace(namespace);
        let vec = GaugeVec::new(opts, labels)?;
        self.registry.register(Box::new(vec.clone()))?;
        debug!(namespace, name, ?labels, "Declared gauge vector");

        Ok(VectorHandle {
            name: format!("{namespace}_{name}"),
            labels,
            vec,
        })
    }

    /// Drops every series of the family.
    pub fn clear(&self, handle: &VectorHandle) {
        handle.vec.reset();
    }

    /// Creates or overwrites the series for exactly this label tuple.
    pub fn set(&self, handle: &VectorHandle, label_values: &[&str], value: f64) -> prometheus::Result<()> {
        handle.vec.get_metric_with_label_values(label_values)?.set(value);
        Ok(())
    }

    /// Replaces the whole family with `snapshot`: one `clear`, then one `set` per series.
    pub fn replace(&self, handle: &VectorHandle, snapshot: &Snapshot) -> prometheus::Result<()> {
        self.clear(handle);
        for (labels, value) in snapshot.iter() {
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
            self.set(handle, &labels, value)?;
        }
        Ok(())
    }

    /// Registers an additional collector, used for the exporter's own telemetry.
    pub fn register(&self, collector: Box<dyn prometheus::core::Collector>) -> prometheus::Result<()> {
        self.registry.register(collector)
    }

    /// Renders the current state in the Prometheus text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
