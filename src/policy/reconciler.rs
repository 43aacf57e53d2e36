use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::{
    diff::Diff,
    error::Result,
    interface::record::{PolicyRecord, Stats},
};

use super::PolicyRow;

/// Owns the policy rows currently in view.
///
/// Policy definitions and consumption statistics arrive on independent
/// cadences, so each has its own entry point and neither waits for the other.
#[derive(Debug, Default)]
pub struct PolicyReconciler {
    rows: HashMap<String, PolicyRow>,
}

impl PolicyReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a complete policy list. Rows missing from it are removed.
    /// Statistics already held for a surviving row are kept.
    pub fn reconcile_policies(&mut self, records: &[PolicyRecord]) -> Result<Diff<PolicyRow>> {
        let mut incoming: Vec<PolicyRow> = Vec::with_capacity(records.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
        for record in records {
            let row = PolicyRow::from_record(record)?;
            match index.get(&row.resource) {
                Some(&i) => incoming[i] = row,
                None => {
                    index.insert(row.resource.clone(), incoming.len());
                    incoming.push(row);
                }
            }
        }

        let mut diff = Diff::default();
        let mut found = HashSet::with_capacity(incoming.len());
        for mut row in incoming {
            found.insert(row.resource.clone());
            match self.rows.get(&row.resource) {
                Some(existing) => {
                    row.stats = existing.stats.clone();
                    diff.updated.push(row.clone());
                }
                None => diff.added.push(row.clone()),
            }
            self.rows.insert(row.resource.clone(), row);
        }

        let mut removed: Vec<String> = self
            .rows
            .keys()
            .filter(|resource| !found.contains(*resource))
            .cloned()
            .collect();
        removed.sort();
        for resource in &removed {
            self.rows.remove(resource);
        }
        diff.removed = removed;
        Ok(diff)
    }

    /// Records fresh statistics for `resource` and returns the updated row.
    /// Statistics for a resource with no policy are dropped.
    pub fn apply_consumption(&mut self, resource: &str, stats: &Stats) -> Option<PolicyRow> {
        let row = match self.rows.get_mut(resource) {
            Some(row) => row,
            None => {
                debug!(resource = %resource, "statistics for unknown policy dropped");
                return None;
            }
        };
        row.stats = Some(stats.clone());
        Some(row.clone())
    }

    pub fn get(&self, resource: &str) -> Option<&PolicyRow> {
        self.rows.get(resource)
    }

    pub fn rows(&self) -> impl Iterator<Item = &PolicyRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diff::Row,
        interface::sink::Cell,
        policy::{
            tests::{policy, stats},
            Strategy,
        },
    };

    #[test]
    fn full_list_adds_updates_and_removes() {
        let mut policies = PolicyReconciler::new();
        let diff = policies
            .reconcile_policies(&[policy("gpu", None, 4), policy("cad", Some("consumer"), 10)])
            .unwrap();
        assert_eq!(diff.added_ids(), vec!["gpu", "cad"]);

        let diff = policies
            .reconcile_policies(&[policy("gpu", None, 8)])
            .unwrap();
        assert!(diff.added.is_empty());
        assert_eq!(diff.updated_ids(), vec!["gpu"]);
        assert_eq!(diff.updated[0].limit, 8);
        assert_eq!(diff.removed, vec!["cad".to_string()]);
        assert_eq!(policies.len(), 1);
    }

    #[test]
    fn consumption_updates_known_policy() {
        let mut policies = PolicyReconciler::new();
        policies
            .reconcile_policies(&[policy("gpu", Some("instance"), 4)])
            .unwrap();
        let row = policies.apply_consumption("gpu", &stats(1, 3)).unwrap();
        assert_eq!(row.consumed(), Some(3));
        assert_eq!(row.available(), Some(1));
        assert_eq!(
            row.cells(),
            vec![
                Cell::text("gpu"),
                Cell::text("3"),
                Cell::text("1"),
                Cell::text("4")
            ]
        );
    }

    #[test]
    fn consumption_for_unknown_policy_is_dropped() {
        let mut policies = PolicyReconciler::new();
        assert!(policies.apply_consumption("gpu", &stats(1, 3)).is_none());
        assert!(policies.is_empty());

        policies
            .reconcile_policies(&[policy("gpu", None, 4)])
            .unwrap();
        assert_eq!(policies.get("gpu").unwrap().consumed(), None);
        let row = policies.apply_consumption("gpu", &stats(0, 2)).unwrap();
        assert_eq!(row.consumed(), Some(2));
    }

    #[test]
    fn policy_update_keeps_statistics_and_applies_new_strategy() {
        let mut policies = PolicyReconciler::new();
        policies
            .reconcile_policies(&[policy("gpu", Some("instance"), 4)])
            .unwrap();
        policies.apply_consumption("gpu", &stats(1, 3));

        let diff = policies
            .reconcile_policies(&[policy("gpu", Some("consumer"), 4)])
            .unwrap();
        let row = &diff.updated[0];
        assert_eq!(row.strategy, Strategy::Consumer);
        assert_eq!(row.consumed(), Some(1));
        assert_eq!(row.available(), Some(3));
    }

    #[test]
    fn invalid_policy_rejects_the_whole_list() {
        let mut policies = PolicyReconciler::new();
        policies
            .reconcile_policies(&[policy("gpu", None, 4)])
            .unwrap();
        let result = policies.reconcile_policies(&[PolicyRecord::default()]);
        assert!(result.is_err());
        assert!(policies.get("gpu").is_some());
    }
}
