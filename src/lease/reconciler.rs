use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{diff::Diff, error::Result, interface::record::LeaseRecord};

use super::LeaseRow;

/// Owns the lease rows currently in view and diffs incoming lease sets
/// against them.
#[derive(Debug, Default)]
pub struct LeaseReconciler {
    rows: HashMap<String, LeaseRow>,
}

impl LeaseReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves every record, or fails on the first invalid one. When an
    /// identity repeats, the last record wins but keeps the first position.
    pub fn resolve(records: &[LeaseRecord]) -> Result<Vec<LeaseRow>> {
        let mut rows: Vec<LeaseRow> = Vec::with_capacity(records.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
        for record in records {
            let row = LeaseRow::from_record(record)?;
            match index.get(&row.id) {
                Some(&i) => rows[i] = row,
                None => {
                    index.insert(row.id.clone(), rows.len());
                    rows.push(row);
                }
            }
        }
        Ok(rows)
    }

    /// Resolves `records` and applies them. Nothing changes if any record is
    /// invalid.
    pub fn reconcile(
        &mut self,
        scope: Option<&str>,
        records: &[LeaseRecord],
        now: DateTime<Utc>,
    ) -> Result<Diff<LeaseRow>> {
        let rows = Self::resolve(records)?;
        Ok(self.apply(scope, rows, now))
    }

    /// Applies already-resolved rows.
    ///
    /// With a `scope`, known rows of that resource missing from `rows` are
    /// removed; rows of other resources are never touched by omission. Rows
    /// that are already dead count as missing.
    pub fn apply(
        &mut self,
        scope: Option<&str>,
        rows: Vec<LeaseRow>,
        now: DateTime<Utc>,
    ) -> Diff<LeaseRow> {
        let mut removed: BTreeSet<String> = match scope {
            Some(resource) => self
                .rows
                .values()
                .filter(|row| row.resource == resource)
                .map(|row| row.id.clone())
                .collect(),
            None => BTreeSet::new(),
        };

        let mut diff = Diff::default();
        let mut live = HashSet::with_capacity(rows.len());
        for row in rows {
            if row.is_dead(now) {
                debug!(lease = %row.id, resource = %row.resource, "dead lease detected");
                if self.rows.contains_key(&row.id) {
                    removed.insert(row.id);
                }
                continue;
            }
            live.insert(row.id.clone());
            match self.rows.insert(row.id.clone(), row.clone()) {
                None => diff.added.push(row),
                Some(_) => diff.updated.push(row),
            }
        }

        removed.retain(|id| !live.contains(id));
        for id in &removed {
            self.rows.remove(id);
        }
        diff.removed = removed.into_iter().collect();
        diff
    }

    /// Removes and returns every row whose death instant is at or before
    /// `now`, in identity order.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut expired: Vec<String> = self
            .rows
            .values()
            .filter(|row| row.is_dead(now))
            .map(|row| row.id.clone())
            .collect();
        expired.sort();
        for id in &expired {
            self.rows.remove(id);
        }
        expired
    }

    pub fn get(&self, id: &str) -> Option<&LeaseRow> {
        self.rows.get(id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &LeaseRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
