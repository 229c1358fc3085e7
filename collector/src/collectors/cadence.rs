use crate::{
    collectors::Collector,
    error::RefreshError,
};
use sapawarga_exporter_config::FailurePolicy;
use std::time::Duration;
use tokio::{
    sync::watch,
    time::sleep,
};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Where a cadence group currently is in its loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupState {
    #[default]
    Idle,
    Running {
        index: usize,
        family: &'static str,
    },
    Sleeping,
    Stopped,
}

/// Counts of one pass over a group's collectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub refreshed: usize,
    pub failed: usize,
}

/// Collectors refreshed strictly one after another, then a fixed pause, forever.
pub struct CadenceGroup {
    name: String,
    interval: Duration,
    collectors: Vec<Box<dyn Collector>>,
    policy: FailurePolicy,
    state: watch::Sender<GroupState>,
}

impl CadenceGroup {
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        collectors: Vec<Box<dyn Collector>>,
        policy: FailurePolicy,
    ) -> Self {
        let (state, _) = watch::channel(GroupState::Idle);
        Self {
            name: name.into(),
            interval,
            collectors,
            policy,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn families(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.collectors.iter().map(|collector| collector.family())
    }

    pub fn subscribe(&self) -> watch::Receiver<GroupState> {
        self.state.subscribe()
    }

    /// One pass over all collectors. Under [`FailurePolicy::Isolate`] failures are logged and
    /// skipped; under [`FailurePolicy::Exit`] the first failure ends the pass. Cancellation
    /// always ends the pass.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleSummary, RefreshError> {
        let mut summary = CycleSummary::default();

        for (index, collector) in self.collectors.iter().enumerate() {
            let family = collector.family();
            self.state.send_replace(GroupState::Running { index, family });

            match collector.refresh(cancel).await {
                Ok(report) => {
                    summary.refreshed += 1;
                    trace!(
                        group = %self.name,
                        family,
                        series = report.series,
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        "Family refreshed"
                    );
                }
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => match self.policy {
                    FailurePolicy::Isolate => {
                        summary.failed += 1;
                        warn!(
                            group = %self.name,
                            family,
                            kind = err.kind(),
                            "Refresh failed, keeping previous snapshot: {err}"
                        );
                    }
                    FailurePolicy::Exit => {
                        error!(group = %self.name, family, kind = err.kind(), "Refresh failed: {err}");
                        return Err(err);
                    }
                },
            }
        }

        Ok(summary)
    }

    /// Loops until `cancel` fires or, under [`FailurePolicy::Exit`], a refresh fails.
    #[instrument(name = "cadence_group", skip_all, fields(group = %self.name))]
    pub async fn run(self, cancel: CancellationToken) -> Result<(), RefreshError> {
        info!(
            group = %self.name,
            interval = ?self.interval,
            families = ?self.families().collect::<Vec<_>>(),
            "Cadence group started"
        );

        let outcome = loop {
            let started = tokio::time::Instant::now();
            match self.run_cycle(&cancel).await {
                Ok(summary) => debug!(
                    group = %self.name,
                    refreshed = summary.refreshed,
                    failed = summary.failed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Cycle finished"
                ),
                Err(err) if err.is_cancelled() => break Ok(()),
                Err(err) => break Err(err),
            }

            self.state.send_replace(GroupState::Sleeping);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Ok(()),
                _ = sleep(self.interval) => {}
            }
            self.state.send_replace(GroupState::Idle);
        };

        self.state.send_replace(GroupState::Stopped);
        info!(group = %self.name, "Cadence group stopped");
        outcome
    }
}
