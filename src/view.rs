//! The reconciliation core.
//!
//! [`LeaseView`] owns every row the operator sees. Transport events and clock
//! ticks go in, rendering instructions come out. The sink never holds state of
//! its own, so [`LeaseView::snapshot`] can rebuild it from scratch at any time.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    diff::Row,
    error::{Result, ViewError},
    interface::{
        record::{LeasesEvent, TransportEvent},
        sink::{ConnectionStatus, Instruction, Table},
    },
    lease::{LeaseReconciler, RevisionGate},
    policy::PolicyReconciler,
};

#[derive(Debug, Default)]
pub struct LeaseView {
    gate: RevisionGate,
    leases: LeaseReconciler,
    policies: PolicyReconciler,
    connection: ConnectionStatus,
}

impl LeaseView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one transport event.
    ///
    /// An event is either applied whole or not at all: invalid records and
    /// stale revisions leave the view untouched and come back as errors.
    pub fn apply_event(
        &mut self,
        event: &TransportEvent,
        now: DateTime<Utc>,
    ) -> Result<Vec<Instruction>> {
        let mut instructions = match event {
            TransportEvent::Policies(event) => self
                .policies
                .reconcile_policies(&event.policies)?
                .into_instructions(),
            TransportEvent::Leases(event) => self.apply_leases(event, now)?,
        };
        if let Some(recovered) = self.mark_connected() {
            instructions.insert(0, recovered);
        }
        Ok(instructions)
    }

    fn apply_leases(&mut self, event: &LeasesEvent, now: DateTime<Utc>) -> Result<Vec<Instruction>> {
        let rows = LeaseReconciler::resolve(&event.leases)?;

        let scope = event.resource.as_deref();
        if let Some(resource) = scope {
            if !self.gate.accept(resource, event.revision) {
                return Err(ViewError::StaleRevision {
                    resource: resource.to_string(),
                    revision: event.revision.unwrap_or_default(),
                    last: self.gate.last_accepted(resource).unwrap_or_default(),
                });
            }
        }

        let mut instructions = Vec::new();
        if let (Some(resource), Some(stats)) = (scope, event.stats.as_ref()) {
            if let Some(row) = self.policies.apply_consumption(resource, stats) {
                instructions.push(row.update_instruction());
            }
        }
        instructions.extend(self.leases.apply(scope, rows, now).into_instructions());
        Ok(instructions)
    }

    /// Raises the connectivity banner. Row state is left alone so rows keep
    /// ageing out while the transport is down.
    pub fn transport_interrupted(&mut self, reason: impl Into<String>) -> Instruction {
        let reason = reason.into();
        warn!(reason = %reason, "transport interrupted");
        self.connection = ConnectionStatus::Interrupted(reason);
        Instruction::Connection(self.connection.clone())
    }

    fn mark_connected(&mut self) -> Option<Instruction> {
        if self.connection == ConnectionStatus::Connected {
            return None;
        }
        info!("transport recovered");
        self.connection = ConnectionStatus::Connected;
        Some(Instruction::Connection(ConnectionStatus::Connected))
    }

    /// Removes every lease whose death instant has passed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<Instruction> {
        self.leases
            .sweep(now)
            .into_iter()
            .map(|row_id| Instruction::Remove {
                table: Table::Leases,
                row_id,
            })
            .collect()
    }

    /// One clock tick: expire dead leases, then refresh relative labels.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Instruction> {
        let mut instructions = self.sweep(now);
        instructions.push(Instruction::RefreshRelativeLabels(now));
        instructions
    }

    /// Instructions that rebuild an empty sink into the current view.
    pub fn snapshot(&self) -> Vec<Instruction> {
        let mut policies: Vec<_> = self.policies.rows().collect();
        policies.sort_by(|a, b| a.resource.cmp(&b.resource));
        let mut leases: Vec<_> = self.leases.rows().collect();
        leases.sort_by(|a, b| a.id.cmp(&b.id));

        let mut instructions = Vec::with_capacity(policies.len() + leases.len() + 1);
        instructions.push(Instruction::Connection(self.connection.clone()));
        instructions.extend(policies.into_iter().map(|row| row.add_instruction()));
        instructions.extend(leases.into_iter().map(|row| row.add_instruction()));
        instructions
    }

    pub fn leases(&self) -> &LeaseReconciler {
        &self.leases
    }

    pub fn policies(&self) -> &PolicyReconciler {
        &self.policies
    }

    pub fn gate(&self) -> &RevisionGate {
        &self.gate
    }

    pub fn connection(&self) -> &ConnectionStatus {
        &self.connection
    }
}
