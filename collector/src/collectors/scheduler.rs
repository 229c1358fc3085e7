use crate::{
    collectors::{
        CadenceGroup,
        Collector,
        FamilyCollector,
        GroupState,
    },
    error::Error,
    families::{
        self,
        CATALOGUE,
        NAMESPACE,
    },
    registry::MetricRegistry,
    source::QuerySource,
    telemetry::RefreshTelemetry,
};
use sapawarga_exporter_config::Config;
use std::{
    collections::HashSet,
    sync::Arc,
};
use tokio::{
    sync::watch,
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

/// Owns every cadence group and runs each one as its own task.
pub struct Scheduler {
    groups: Vec<CadenceGroup>,
}

impl Scheduler {
    pub fn new(groups: Vec<CadenceGroup>) -> Self {
        Self { groups }
    }

    /// Declares every catalogue family in `registry` and builds the configured groups around
    /// one shared `source`.
    pub fn from_config(
        config: &Config,
        registry: &MetricRegistry,
        source: Arc<dyn QuerySource>,
    ) -> Result<Self, Error> {
        let telemetry = RefreshTelemetry::register(registry)?;

        let mut groups = Vec::with_capacity(config.groups.len());
        for group in &config.groups {
            let mut collectors: Vec<Box<dyn Collector>> = Vec::with_capacity(group.families.len());
            for family in &group.families {
                let spec = families::find(family).ok_or_else(|| Error::UnknownFamily {
                    group: group.name.clone(),
                    family: family.clone(),
                })?;
                let collector = FamilyCollector::new(
                    spec,
                    registry,
                    source.clone(),
                    config.refresh_timeout,
                    telemetry.clone(),
                )?;
                collectors.push(Box::new(collector));
            }
            groups.push(CadenceGroup::new(
                group.name.clone(),
                group.interval,
                collectors,
                config.failure_policy,
            ));
        }

        // Unscheduled families stay declared so the scrape contract does not change shape.
        let scheduled: HashSet<&str> = config.scheduled_families().collect();
        for spec in CATALOGUE.iter().filter(|spec| !scheduled.contains(spec.name)) {
            warn!(family = spec.name, "Family is not part of any cadence group and will stay empty");
            registry.declare(NAMESPACE, spec.name, spec.help, spec.labels)?;
        }

        Ok(Self::new(groups))
    }

    pub fn groups(&self) -> &[CadenceGroup] {
        &self.groups
    }

    /// State receivers of all groups, by group name.
    pub fn subscribe(&self) -> Vec<(String, watch::Receiver<GroupState>)> {
        self.groups
            .iter()
            .map(|group| (group.name().to_string(), group.subscribe()))
            .collect()
    }

    /// Runs all groups concurrently until `cancel` fires. The first group that ends with an
    /// error cancels the others; that error is returned once every group has stopped.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), Error> {
        let mut tasks = JoinSet::new();
        for group in self.groups {
            tasks.spawn(group.run(cancel.clone()));
        }

        let mut outcome = Ok(());
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => Error::from(err),
                Err(err) => Error::from(err),
            };
            error!("Stopping all cadence groups: {failure}");
            cancel.cancel();
            if outcome.is_ok() {
                outcome = Err(failure);
            }
        }

        info!("Scheduler stopped");
        outcome
    }
}
