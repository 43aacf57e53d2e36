use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::interface::record::Properties;

pub mod labels;
pub(crate) mod runnable;

/// An ordered list of property keys consulted for one display field. The
/// first key with a non-empty value wins.
#[derive(Debug, Clone, Copy)]
pub struct Preference {
    keys: &'static [&'static str],
}

impl Preference {
    pub const fn new(keys: &'static [&'static str]) -> Self {
        Self { keys }
    }

    pub fn lookup<'a>(&self, properties: Option<&'a Properties>) -> Option<&'a str> {
        let properties = properties?;
        self.keys
            .iter()
            .filter_map(|key| properties.get(*key))
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }

    /// Resolves the field, falling back to `default` and then to an empty
    /// string.
    pub fn resolve(&self, properties: Option<&Properties>, default: Option<&str>) -> String {
        self.lookup(properties)
            .or(default)
            .unwrap_or_default()
            .to_string()
    }
}

pub const PROGRAM: Preference = Preference::new(&["resource.name", "program.name"]);
pub const USER: Preference = Preference::new(&["user.account", "user.id"]);
pub const HOST: Preference = Preference::new(&["host.name"]);
pub const PROCESS_ID: Preference = Preference::new(&["process.id"]);
pub const PROCESS_CREATION: Preference = Preference::new(&["process.creation"]);

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
