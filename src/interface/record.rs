use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, ViewError};

/// Flat key/value properties attached to leases and policies.
pub type Properties = HashMap<String, String>;

pub const POLICIES_EVENT: &str = "policies";
pub const LEASES_EVENT: &str = "leases";

// Go-style encoders emit `null` for empty slices.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
}

/// A lease as it arrives on the wire. Durations are nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaseRecord {
    #[serde(default)]
    pub instance: Option<InstanceRecord>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub renewed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub released: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub decay: i64,
    #[serde(default)]
    pub properties: Option<Properties>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub properties: Option<Properties>,
}

/// Consumption counts for one counting strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    #[serde(default)]
    pub consumed: u64,
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub released: u64,
    #[serde(default)]
    pub queued: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub consumer: Option<Tally>,
    #[serde(default)]
    pub instance: Option<Tally>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoliciesEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub policies: Vec<PolicyRecord>,
}

/// A snapshot of one resource's leases, or an unscoped batch when
/// `resource` is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeasesEvent {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub revision: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub leases: Vec<LeaseRecord>,
    #[serde(default)]
    pub stats: Option<Stats>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Policies(PoliciesEvent),
    Leases(LeasesEvent),
}

impl TransportEvent {
    /// Decodes the JSON payload of a named stream event. Event types the view
    /// does not consume yield `Ok(None)`.
    pub fn decode(event: &str, data: &str) -> Result<Option<Self>> {
        let decoded = match event {
            POLICIES_EVENT => serde_json::from_str(data).map(TransportEvent::Policies),
            LEASES_EVENT => serde_json::from_str(data).map(TransportEvent::Leases),
            _ => return Ok(None),
        };
        decoded.map(Some).map_err(|source| ViewError::Decode {
            event: event.to_string(),
            source,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransportEvent::Policies(_) => POLICIES_EVENT,
            TransportEvent::Leases(_) => LEASES_EVENT,
        }
    }
}
