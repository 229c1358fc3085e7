#![allow(dead_code)]

use sapawarga_exporter_collector::{
    families::{
        self,
        FamilySpec,
        QueryPlan,
    },
    AggregateQuery,
    FamilyCollector,
    MetricRegistry,
    QueryFuture,
    QuerySource,
    RefreshTelemetry,
    Row,
    SourceError,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

#[derive(Clone)]
enum Response {
    Rows(Vec<Row>),
    Fail(String),
    Hang,
}

/// In-memory query source keyed by SQL text. Unknown queries return no rows.
#[derive(Default)]
pub struct FakeSource {
    responses: Mutex<HashMap<&'static str, Response>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, sql: &'static str, rows: Vec<Row>) {
        self.responses.lock().unwrap().insert(sql, Response::Rows(rows));
    }

    pub fn fail(&self, sql: &'static str, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(sql, Response::Fail(message.to_string()));
    }

    pub fn hang(&self, sql: &'static str) {
        self.responses.lock().unwrap().insert(sql, Response::Hang);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, sql: &'static str) -> usize {
        self.calls().into_iter().filter(|call| *call == sql).count()
    }
}

impl QuerySource for FakeSource {
    fn run<'a>(&'a self, query: &'a AggregateQuery) -> QueryFuture<'a> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(query.sql);
            let response = self.responses.lock().unwrap().get(query.sql).cloned();
            match response {
                Some(Response::Rows(rows)) => Ok(rows),
                Some(Response::Fail(message)) => Err(SourceError::Query(message.into())),
                Some(Response::Hang) => std::future::pending().await,
                None => Ok(Vec::new()),
            }
        })
    }
}

pub fn spec(name: &str) -> &'static FamilySpec {
    families::find(name).unwrap_or_else(|| panic!("unknown family {name}"))
}

pub fn grouped_sql(name: &str) -> &'static str {
    match spec(name).plan {
        QueryPlan::Grouped(sql) => sql,
        QueryPlan::Fixed(_) => panic!("{name} is not grouped"),
    }
}

pub fn fixed_sql(name: &str, label: &str) -> &'static str {
    match spec(name).plan {
        QueryPlan::Fixed(series) => {
            series
                .iter()
                .find(|s| s.labels == [label])
                .unwrap_or_else(|| panic!("{name} has no series {label}"))
                .sql
        }
        QueryPlan::Grouped(_) => panic!("{name} is not fixed"),
    }
}

pub struct Harness {
    pub registry: MetricRegistry,
    pub telemetry: RefreshTelemetry,
    pub source: Arc<FakeSource>,
}

impl Harness {
    pub fn new() -> Self {
        let registry = MetricRegistry::new();
        let telemetry = RefreshTelemetry::register(&registry).unwrap();
        Self {
            registry,
            telemetry,
            source: FakeSource::new(),
        }
    }

    pub fn collector(&self, name: &str) -> FamilyCollector {
        self.collector_with_deadline(name, Duration::from_secs(30))
    }

    pub fn collector_with_deadline(&self, name: &str, deadline: Duration) -> FamilyCollector {
        FamilyCollector::new(
            spec(name),
            &self.registry,
            self.source.clone(),
            deadline,
            self.telemetry.clone(),
        )
        .unwrap()
    }

    /// Exposition lines of the published statistic families only.
    pub fn family_lines(&self) -> Vec<String> {
        self.registry
            .render()
            .unwrap()
            .lines()
            .filter(|line| line.starts_with("sapawarga_users_"))
            .map(str::to_string)
            .collect()
    }
}

pub fn area(kabkota: &str, count: i64) -> Row {
    Row::new([kabkota], count)
}

pub fn area_all(names: [&str; 5], count: i64) -> Row {
    Row::new(names, count)
}

pub fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
