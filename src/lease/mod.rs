use chrono::{DateTime, Datelike, Duration, Utc};

use crate::{
    diff::Row,
    error::{RecordKind, Result, ViewError},
    interface::{
        record::LeaseRecord,
        sink::{Cell, Table},
    },
    util::{HOST, PROCESS_CREATION, PROCESS_ID, PROGRAM, USER},
};

pub mod reconciler;
pub mod revision;

pub use reconciler::LeaseReconciler;
pub use revision::RevisionGate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseStatus {
    Active,
    Released,
    Queued,
    Other(String),
}

impl LeaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            LeaseStatus::Active => "active",
            LeaseStatus::Released => "released",
            LeaseStatus::Queued => "queued",
            LeaseStatus::Other(status) => status,
        }
    }
}

impl From<&str> for LeaseStatus {
    fn from(status: &str) -> Self {
        match status {
            "active" => LeaseStatus::Active,
            "released" => LeaseStatus::Released,
            "queued" => LeaseStatus::Queued,
            other => LeaseStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for LeaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The moment after which a lease must no longer be displayed.
///
/// Active leases die `duration + decay` after their last renewal, released
/// leases `decay` after release. Other statuses never die by this rule.
pub fn death_instant(
    status: &LeaseStatus,
    renewed: Option<DateTime<Utc>>,
    released: Option<DateTime<Utc>>,
    duration: Duration,
    decay: Duration,
) -> Option<DateTime<Utc>> {
    match status {
        LeaseStatus::Active => renewed.map(|renewed| renewed + duration + decay),
        LeaseStatus::Released => match released {
            Some(released) => Some(released + decay),
            // A release without a timestamp decays from the nominal expiry.
            None => renewed.map(|renewed| renewed + duration + decay),
        },
        LeaseStatus::Queued | LeaseStatus::Other(_) => None,
    }
}

// Go encoders write unset times as the year-one zero instant.
fn present(when: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    when.filter(|when| when.year() > 1)
}

/// One row of the lease table.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaseRow {
    pub id: String,
    pub resource: String,
    pub program: String,
    pub user: String,
    pub host: String,
    pub pid: String,
    pub status: LeaseStatus,
    pub started: Option<DateTime<Utc>>,
    pub renewed: Option<DateTime<Utc>>,
    pub released: Option<DateTime<Utc>>,
    pub duration: Duration,
    pub decay: Duration,
    pub death: Option<DateTime<Utc>>,
}

impl LeaseRow {
    /// Resolves display fields and the death instant of a wire record.
    ///
    /// Fails when the record lacks an instance id or a resource.
    pub fn from_record(record: &LeaseRecord) -> Result<Self> {
        let instance = record.instance.clone().unwrap_or_default();
        let id = instance
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ViewError::invalid(RecordKind::Lease, "missing instance id"))?;
        let resource = record
            .resource
            .clone()
            .filter(|resource| !resource.is_empty())
            .ok_or_else(|| {
                ViewError::invalid(RecordKind::Lease, format!("lease '{}' has no resource", id))
            })?;

        let properties = record.properties.as_ref();
        let status = LeaseStatus::from(record.status.as_str());
        let started = PROCESS_CREATION
            .lookup(properties)
            .and_then(|created| DateTime::parse_from_rfc3339(created).ok())
            .map(|created| created.with_timezone(&Utc))
            .or_else(|| present(record.started));
        // The process creation time is for display only; expiry runs off the
        // lease's own timestamps.
        let renewed = present(record.renewed).or(present(record.started));
        let released = present(record.released);
        let duration = Duration::nanoseconds(record.duration);
        let decay = Duration::nanoseconds(record.decay);
        let death = death_instant(&status, renewed, released, duration, decay);

        Ok(Self {
            program: PROGRAM.resolve(properties, Some(&resource)),
            user: USER.resolve(properties, instance.user.as_deref()),
            host: HOST.resolve(properties, instance.host.as_deref()),
            pid: PROCESS_ID.resolve(properties, None),
            id,
            resource,
            status,
            started,
            renewed,
            released,
            duration,
            decay,
            death,
        })
    }

    pub fn is_dead(&self, now: DateTime<Utc>) -> bool {
        matches!(self.death, Some(death) if death <= now)
    }
}

impl Row for LeaseRow {
    const TABLE: Table = Table::Leases;

    fn id(&self) -> &str {
        &self.id
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.program),
            Cell::text(&self.user),
            Cell::text(&self.host),
            Cell::text(&self.pid),
            Cell::text(self.status.as_str()),
            Cell::Since(self.started),
            Cell::Until(self.death),
        ]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::interface::record::{InstanceRecord, Properties};

    pub(crate) const SECOND: i64 = 1_000_000_000;

    pub(crate) fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    pub(crate) fn released(id: &str, resource: &str, at: i64, decay_secs: i64) -> LeaseRecord {
        LeaseRecord {
            instance: Some(InstanceRecord {
                id: Some(id.into()),
                user: Some("alice".into()),
                host: Some("ws1".into()),
            }),
            resource: Some(resource.into()),
            status: "released".into(),
            started: Some(t(at - 60)),
            released: Some(t(at)),
            duration: 900 * SECOND,
            decay: decay_secs * SECOND,
            ..LeaseRecord::default()
        }
    }

    pub(crate) fn active(
        id: &str,
        resource: &str,
        renewed: i64,
        duration_secs: i64,
        decay_secs: i64,
    ) -> LeaseRecord {
        LeaseRecord {
            instance: Some(InstanceRecord {
                id: Some(id.into()),
                user: Some("bob".into()),
                host: Some("ws2".into()),
            }),
            resource: Some(resource.into()),
            status: "active".into(),
            started: Some(t(renewed - 30)),
            renewed: Some(t(renewed)),
            duration: duration_secs * SECOND,
            decay: decay_secs * SECOND,
            ..LeaseRecord::default()
        }
    }

    #[test]
    fn released_lease_dies_after_decay() {
        let row = LeaseRow::from_record(&released("i-1", "gpu", 0, 5)).unwrap();
        assert_eq!(row.death, Some(t(5)));
        assert!(!row.is_dead(t(4)));
        assert!(row.is_dead(t(5)));
        assert!(row.is_dead(t(6)));
    }

    #[test]
    fn active_lease_dies_after_duration_and_decay() {
        let row = LeaseRow::from_record(&active("i-1", "gpu", 100, 60, 10)).unwrap();
        assert_eq!(row.death, Some(t(170)));
    }

    #[test]
    fn queued_and_unknown_leases_never_die() {
        let mut record = active("i-1", "gpu", 0, 1, 1);
        record.status = "queued".into();
        assert_eq!(LeaseRow::from_record(&record).unwrap().death, None);
        record.status = "pending".into();
        let row = LeaseRow::from_record(&record).unwrap();
        assert_eq!(row.status, LeaseStatus::Other("pending".into()));
        assert_eq!(row.death, None);
        assert!(!row.is_dead(t(1_000_000)));
    }

    #[test]
    fn go_zero_times_are_unset() {
        let mut record = released("i-1", "gpu", 0, 5);
        record.released = Some(Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap());
        record.renewed = Some(t(0));
        let row = LeaseRow::from_record(&record).unwrap();
        assert_eq!(row.released, None);
        assert_eq!(row.death, Some(t(905)));
    }

    #[test]
    fn active_lease_without_renewal_decays_from_its_own_start() {
        let mut record = active("i-1", "gpu", 0, 60, 0);
        record.started = Some(t(0));
        record.renewed = None;
        let properties: Properties = [("process.creation", "2023-12-31T23:00:00Z")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        record.properties = Some(properties);

        let row = LeaseRow::from_record(&record).unwrap();
        assert_eq!(row.started, Some(t(-3600)));
        assert_eq!(row.renewed, Some(t(0)));
        assert_eq!(row.death, Some(t(60)));
        assert!(!row.is_dead(t(59)));
    }

    #[test]
    fn display_fields_follow_property_preferences() {
        let mut record = active("i-1", "gpu", 0, 60, 0);
        let properties: Properties = [
            ("program.name", "render.exe"),
            ("user.id", "S-1-5-21"),
            ("host.name", "render-01"),
            ("process.id", "4242"),
            ("process.creation", "2023-12-31T23:00:00Z"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        record.properties = Some(properties);

        let row = LeaseRow::from_record(&record).unwrap();
        assert_eq!(row.program, "render.exe");
        assert_eq!(row.user, "S-1-5-21");
        assert_eq!(row.host, "render-01");
        assert_eq!(row.pid, "4242");
        assert_eq!(row.started, Some(t(-3600)));
    }

    #[test]
    fn display_fields_fall_back_to_record() {
        let row = LeaseRow::from_record(&active("i-1", "gpu", 0, 60, 0)).unwrap();
        assert_eq!(row.program, "gpu");
        assert_eq!(row.user, "bob");
        assert_eq!(row.host, "ws2");
        assert_eq!(row.pid, "");
    }

    #[test]
    fn missing_identity_or_resource_is_invalid() {
        let mut record = active("i-1", "gpu", 0, 60, 0);
        record.instance = None;
        assert!(matches!(
            LeaseRow::from_record(&record),
            Err(ViewError::InvalidRecord {
                kind: RecordKind::Lease,
                ..
            })
        ));

        let mut record = active("i-1", "gpu", 0, 60, 0);
        record.resource = Some(String::new());
        assert!(LeaseRow::from_record(&record).is_err());
    }

    #[test]
    fn cells_project_in_column_order() {
        let row = LeaseRow::from_record(&released("i-1", "gpu", 0, 5)).unwrap();
        assert_eq!(
            row.cells(),
            vec![
                Cell::text("gpu"),
                Cell::text("alice"),
                Cell::text("ws1"),
                Cell::text(""),
                Cell::text("released"),
                Cell::Since(Some(t(-60))),
                Cell::Until(Some(t(5))),
            ]
        );
    }
}
