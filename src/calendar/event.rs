use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// The subset of a Google Calendar event the dashboard shows and caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub start: EventStart,
}

/// Timed events carry `dateTime` (RFC 3339), all-day events carry `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStart {
    #[serde(
        rename = "dateTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Event {
    /// Local start time for timed events.
    pub fn start_time(&self) -> Option<DateTime<Local>> {
        let raw = self.start.date_time.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Local))
    }

    /// Calendar day the event starts on, `None` when the start is unparseable.
    pub fn start_date(&self) -> Option<NaiveDate> {
        if self.start.date_time.is_some() {
            return self.start_time().map(|dt| dt.date_naive());
        }
        let raw = self.start.date.as_deref()?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }

    pub fn is_all_day(&self) -> bool {
        self.start.date_time.is_none() && self.start.date.is_some()
    }
}

/// Events starting on `day`, in fetch order.
pub fn events_on(events: &[Event], day: NaiveDate) -> Vec<Event> {
    events
        .iter()
        .filter(|event| event.start_date() == Some(day))
        .cloned()
        .collect()
}
