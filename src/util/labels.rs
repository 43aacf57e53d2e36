//! Relative-time labels shown in the `since` and `until` columns.

use chrono::{DateTime, Duration, Utc};

use crate::interface::sink::Cell;

/// Time elapsed since `when`, clamped at zero for future instants.
pub fn time_since(when: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - when).max(Duration::zero())
}

/// Time remaining until `when`, clamped at zero for past instants.
pub fn time_until(when: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (when - now).max(Duration::zero())
}

/// Renders `H:MM:SS`. A zero duration renders as an empty label.
pub fn format_duration(duration: Duration) -> String {
    if duration <= Duration::zero() {
        return String::new();
    }
    let total = duration.num_seconds();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// The text a cell displays at `now`.
pub fn render(cell: &Cell, now: DateTime<Utc>) -> String {
    match cell {
        Cell::Text(text) => text.clone(),
        Cell::Since(Some(when)) => format_duration(time_since(*when, now)),
        Cell::Until(Some(when)) => format_duration(time_until(*when, now)),
        Cell::Since(None) | Cell::Until(None) => String::new(),
    }
}
