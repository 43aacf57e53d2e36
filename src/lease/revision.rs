use std::collections::HashMap;

/// Per-resource ordering guard for lease events.
///
/// Each resource's channel only moves forward: an event whose revision is not
/// newer than the last accepted one for its resource is rejected, and the
/// caller must drop the whole event.
#[derive(Debug, Default)]
pub struct RevisionGate {
    accepted: HashMap<String, u64>,
}

impl RevisionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `revision` when the event may be applied.
    ///
    /// Events without a revision always pass. Revision `0` is the wire's
    /// unset value and counts as absent.
    pub fn accept(&mut self, resource: &str, revision: Option<u64>) -> bool {
        let revision = match revision {
            Some(revision) if revision > 0 => revision,
            _ => return true,
        };
        match self.accepted.get(resource) {
            Some(&last) if revision <= last => false,
            _ => {
                self.accepted.insert(resource.to_string(), revision);
                true
            }
        }
    }

    pub fn last_accepted(&self, resource: &str) -> Option<u64> {
        self.accepted.get(resource).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_revision_is_accepted_and_recorded() {
        let mut gate = RevisionGate::new();
        assert!(gate.accept("gpu", Some(4)));
        assert_eq!(gate.last_accepted("gpu"), Some(4));
    }

    #[test]
    fn equal_or_older_revisions_are_rejected_without_change() {
        let mut gate = RevisionGate::new();
        assert!(gate.accept("gpu", Some(4)));
        assert!(!gate.accept("gpu", Some(4)));
        assert!(!gate.accept("gpu", Some(2)));
        assert_eq!(gate.last_accepted("gpu"), Some(4));
        assert!(gate.accept("gpu", Some(5)));
        assert_eq!(gate.last_accepted("gpu"), Some(5));
    }

    #[test]
    fn resources_are_tracked_independently() {
        let mut gate = RevisionGate::new();
        assert!(gate.accept("gpu", Some(10)));
        assert!(gate.accept("cad", Some(1)));
        assert!(!gate.accept("gpu", Some(9)));
    }

    #[test]
    fn unrevisioned_events_always_pass() {
        let mut gate = RevisionGate::new();
        assert!(gate.accept("gpu", Some(3)));
        assert!(gate.accept("gpu", None));
        assert!(gate.accept("gpu", Some(0)));
        assert_eq!(gate.last_accepted("gpu"), Some(3));
    }
}
