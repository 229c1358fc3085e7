//! # Statistic Families
//!
//! The declarative catalogue of everything the exporter publishes. Each [`FamilySpec`] is one
//! gauge vector: its name, help text, label dimensions and the fixed queries that produce its
//! snapshot. The catalogue is the contract with the dashboards built on top of the scrape, so
//! names and label orders must stay stable between releases.

mod catalogue;

pub use catalogue::CATALOGUE;

/// Prefix of every published family.
pub const NAMESPACE: &str = "sapawarga";

pub const ROLE_LABELS: &[&str] = &["role"];
pub const AREA_LABELS: &[&str] = &["kabkota"];
pub const AREA_ALL_LABELS: &[&str] = &["kabkota", "kecamatan", "kelurahan", "latitude", "longitude"];

#[derive(Debug)]
pub struct FamilySpec {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    pub plan: QueryPlan,
}

/// How a family turns queries into series.
#[derive(Debug)]
pub enum QueryPlan {
    /// One scalar count per fixed label tuple. All counts are gathered before the family is
    /// published.
    Fixed(&'static [FixedSeries]),
    /// One grouped query whose leading columns are the label values, in label order.
    Grouped(&'static str),
}

/// A series whose label values are known up front and whose count comes from its own query.
#[derive(Debug)]
pub struct FixedSeries {
    pub labels: &'static [&'static str],
    pub sql: &'static str,
}

/// Looks up a family by its unqualified name.
pub fn find(name: &str) -> Option<&'static FamilySpec> {
    CATALOGUE.iter().find(|spec| spec.name == name)
}
