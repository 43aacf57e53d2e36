use crate::{
    diff::Row,
    error::{RecordKind, Result, ViewError},
    interface::{
        record::{PolicyRecord, Stats, Tally},
        sink::{Cell, Table},
    },
    util::PROGRAM,
};

pub mod reconciler;

pub use reconciler::PolicyReconciler;

/// How a resource counts consumption against its limit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Distinct users.
    Consumer,
    /// Distinct running instances.
    #[default]
    Instance,
    /// A strategy this view has no statistic for; it consumes nothing.
    Other(String),
}

impl Strategy {
    /// Absent or empty strategies mean `instance`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("") | Some("instance") => Strategy::Instance,
            Some("consumer") => Strategy::Consumer,
            Some(other) => Strategy::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Strategy::Consumer => "consumer",
            Strategy::Instance => "instance",
            Strategy::Other(other) => other,
        }
    }

    pub fn tally<'a>(&self, stats: &'a Stats) -> Option<&'a Tally> {
        match self {
            Strategy::Consumer => stats.consumer.as_ref(),
            Strategy::Instance => stats.instance.as_ref(),
            Strategy::Other(_) => None,
        }
    }

    pub fn consumed(&self, stats: &Stats) -> u64 {
        self.tally(stats).map_or(0, |tally| tally.consumed)
    }
}

/// One row of the policy table.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRow {
    pub resource: String,
    pub program: String,
    pub strategy: Strategy,
    pub limit: u64,
    /// Latest statistics pushed for the resource, if any.
    pub stats: Option<Stats>,
}

impl PolicyRow {
    pub fn from_record(record: &PolicyRecord) -> Result<Self> {
        let resource = record
            .resource
            .clone()
            .filter(|resource| !resource.is_empty())
            .ok_or_else(|| ViewError::invalid(RecordKind::Policy, "missing resource"))?;
        Ok(Self {
            program: PROGRAM.resolve(record.properties.as_ref(), Some(&resource)),
            strategy: Strategy::parse(record.strategy.as_deref()),
            limit: record.limit,
            stats: None,
            resource,
        })
    }

    /// `None` until statistics arrive for the resource.
    pub fn consumed(&self) -> Option<u64> {
        self.stats
            .as_ref()
            .map(|stats| self.strategy.consumed(stats))
    }

    /// Negative when the resource is over-committed.
    pub fn available(&self) -> Option<i128> {
        self.consumed()
            .map(|consumed| i128::from(self.limit) - i128::from(consumed))
    }
}

impl Row for PolicyRow {
    const TABLE: Table = Table::Policies;

    fn id(&self) -> &str {
        &self.resource
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.program),
            Cell::Text(self.consumed().map(|c| c.to_string()).unwrap_or_default()),
            Cell::Text(self.available().map(|a| a.to_string()).unwrap_or_default()),
            Cell::Text(self.limit.to_string()),
        ]
    }
}
