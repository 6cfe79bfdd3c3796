use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use super::event::{Event, events_on};
use crate::io::{IoError, read_json, write_json};

/// Minimum time between two fetch initiations.
pub const FETCH_COOLDOWN: Duration = Duration::from_secs(5);

/// Cache bucket for the month containing `date`, e.g. `2025-11`.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    /// Events for the month are already stored.
    Cached,
    /// The caller must fetch the month now. It is marked in flight.
    Start,
    /// A fetch for the month is running, or the cooldown has not elapsed.
    Deferred,
}

/// Month-keyed event cache. A present key means a fetch for that month
/// completed at least once, even when it returned no events.
#[derive(Debug)]
pub struct EventCache {
    months: BTreeMap<String, Vec<Event>>,
    in_flight: HashSet<String>,
    last_fetch_started: Option<Instant>,
    cooldown: Duration,
}

impl Default for EventCache {
    fn default() -> Self {
        Self::with_months(BTreeMap::new())
    }
}

impl EventCache {
    pub fn with_months(months: BTreeMap<String, Vec<Event>>) -> Self {
        Self {
            months,
            in_flight: HashSet::new(),
            last_fetch_started: None,
            cooldown: FETCH_COOLDOWN,
        }
    }

    /// Reads the persisted cache. Anything unreadable starts an empty one.
    pub fn load(path: &Path) -> Self {
        match read_json::<BTreeMap<String, Vec<Event>>>(path) {
            Ok(Some(months)) => Self::with_months(months),
            Ok(None) => Self::default(),
            Err(err) => {
                warn!(error = %err, "calendar cache unreadable, starting fresh");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), IoError> {
        write_json(path, &self.months)
    }

    /// Writes a snapshot of the cache from a detached thread.
    pub fn save_in_background(&self, path: PathBuf) {
        let months = self.months.clone();
        thread::spawn(move || {
            if let Err(err) = write_json(&path, &months) {
                warn!(error = %err, "failed to persist calendar cache");
            }
        });
    }

    pub fn request_month(&mut self, key: &str, now: Instant) -> FetchDecision {
        if self.months.contains_key(key) {
            return FetchDecision::Cached;
        }
        if self.in_flight.contains(key) {
            debug!(month = key, "fetch already in flight");
            return FetchDecision::Deferred;
        }
        if let Some(started) = self.last_fetch_started {
            if now.saturating_duration_since(started) < self.cooldown {
                debug!(month = key, "fetch deferred by cooldown");
                return FetchDecision::Deferred;
            }
        }
        self.in_flight.insert(key.to_string());
        self.last_fetch_started = Some(now);
        FetchDecision::Start
    }

    /// Refetches a month whether or not it is cached. Only an in-flight
    /// fetch for the same month holds it back.
    pub fn request_refresh(&mut self, key: &str, now: Instant) -> FetchDecision {
        if self.in_flight.contains(key) {
            return FetchDecision::Deferred;
        }
        self.in_flight.insert(key.to_string());
        self.last_fetch_started = Some(now);
        FetchDecision::Start
    }

    pub fn complete(&mut self, key: &str, events: Vec<Event>) {
        self.in_flight.remove(key);
        self.months.insert(key.to_string(), events);
    }

    pub fn fail(&mut self, key: &str) {
        self.in_flight.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.months.contains_key(key)
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.contains(key)
    }

    pub fn month(&self, key: &str) -> Option<&[Event]> {
        self.months.get(key).map(Vec::as_slice)
    }

    /// Events on `day`, empty when its month is not cached.
    pub fn events_on(&self, day: NaiveDate) -> Vec<Event> {
        self.month(&month_key(day))
            .map(|events| events_on(events, day))
            .unwrap_or_default()
    }
}
