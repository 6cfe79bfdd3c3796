use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Datelike, Local, Months, NaiveDate, TimeDelta};
use tracing::{debug, info, warn};

use crate::calendar::{CalendarError, Event, EventCache, FetchDecision, month_key};
use crate::core::Command;
use crate::io::IoError;
use crate::weather::{Weather, WeatherError};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarState {
    /// No fetch has succeeded yet.
    Idle,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherState {
    Loading,
    Ready(Weather),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarAction {
    None,
    /// Fetch the month containing this date in the background.
    Fetch(NaiveDate),
    OpenUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    AuthRequired,
    Fatal(String),
}

pub struct CalendarPanel {
    state: CalendarState,
    /// Set while the dashboard wants calendar data. Cleared when the token
    /// is rejected so ticks stop requesting until authorization completes.
    active: bool,
    selected: NaiveDate,
    day_events: Vec<Event>,
    cache: EventCache,
    cache_path: PathBuf,
    weather: WeatherState,
    location: String,
    now: DateTime<Local>,
    spinner_frame: usize,
}

impl CalendarPanel {
    pub fn new(cache_path: PathBuf, location: String, now: DateTime<Local>) -> Self {
        let cache = EventCache::load(&cache_path);
        Self::with_cache(cache, cache_path, location, now)
    }

    pub fn with_cache(
        cache: EventCache,
        cache_path: PathBuf,
        location: String,
        now: DateTime<Local>,
    ) -> Self {
        let selected = now.date_naive();
        let mut panel = Self {
            state: CalendarState::Idle,
            active: false,
            selected,
            day_events: Vec::new(),
            cache,
            cache_path,
            weather: WeatherState::Loading,
            location,
            now,
            spinner_frame: 0,
        };
        panel.refilter();
        panel
    }

    pub fn state(&self) -> &CalendarState {
        &self.state
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn day_events(&self) -> &[Event] {
        &self.day_events
    }

    pub fn weather(&self) -> &WeatherState {
        &self.weather
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: String) {
        self.location = location;
    }

    pub fn now(&self) -> DateTime<Local> {
        self.now
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER[self.spinner_frame % SPINNER.len()]
    }

    /// The selected month has no cached events yet.
    pub fn is_loading(&self) -> bool {
        !self.cache.contains(&month_key(self.selected))
    }

    /// A request for the selected month is running, as opposed to waiting
    /// out the cooldown.
    pub fn is_fetching(&self) -> bool {
        self.cache.is_in_flight(&month_key(self.selected))
    }

    /// Writes the cache synchronously. Used on exit, when a background
    /// write could be cut short.
    pub fn persist_cache(&self) -> Result<(), IoError> {
        self.cache.save(&self.cache_path)
    }

    /// Days in the selected month that have at least one event.
    pub fn busy_days(&self) -> Vec<u32> {
        let mut days: Vec<u32> = self
            .cache
            .month(&month_key(self.selected))
            .unwrap_or_default()
            .iter()
            .filter_map(Event::start_date)
            .filter(|date| {
                date.year() == self.selected.year() && date.month() == self.selected.month()
            })
            .map(|date| date.day())
            .collect();
        days.sort_unstable();
        days.dedup();
        days
    }

    /// Starts (or restarts) calendar activity. The selected month is always
    /// refetched so a cache from an earlier session gets refreshed.
    pub fn activate(&mut self, now: Instant) -> CalendarAction {
        self.active = true;
        if matches!(self.state, CalendarState::Failed(_)) {
            return CalendarAction::None;
        }
        match self.cache.request_refresh(&month_key(self.selected), now) {
            FetchDecision::Start => CalendarAction::Fetch(self.selected),
            _ => CalendarAction::None,
        }
    }

    pub fn weather_requested(&mut self) {
        self.weather = WeatherState::Loading;
    }

    pub fn apply_weather(&mut self, result: Result<Weather, WeatherError>) {
        self.weather = match result {
            Ok(weather) => WeatherState::Ready(weather),
            Err(err) => {
                warn!(error = %err, "weather unavailable");
                WeatherState::Unavailable
            }
        };
    }

    /// Clock and spinner advance; a deferred month request is retried.
    pub fn on_tick(&mut self, now: Instant, wall: DateTime<Local>) -> CalendarAction {
        self.now = wall;
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        if !self.active || matches!(self.state, CalendarState::Failed(_)) {
            return CalendarAction::None;
        }
        if self.is_loading() {
            return self.request_selected_month(now);
        }
        CalendarAction::None
    }

    pub fn handle_command(&mut self, cmd: Command, now: Instant) -> CalendarAction {
        if self.state != CalendarState::Ready {
            return CalendarAction::None;
        }
        let target = match cmd {
            Command::MoveLeft => self.selected.checked_sub_signed(TimeDelta::days(1)),
            Command::MoveRight => self.selected.checked_add_signed(TimeDelta::days(1)),
            Command::MoveUp => self.selected.checked_sub_signed(TimeDelta::weeks(1)),
            Command::MoveDown => self.selected.checked_add_signed(TimeDelta::weeks(1)),
            Command::PrevMonth => self.selected.checked_sub_months(Months::new(1)),
            Command::NextMonth => self.selected.checked_add_months(Months::new(1)),
            Command::Today => Some(self.now.date_naive()),
            Command::Confirm | Command::Open => {
                return CalendarAction::OpenUrl(google_calendar_url(self.selected));
            }
            _ => None,
        };
        match target {
            Some(date) if date != self.selected => {
                self.selected = date;
                self.refilter();
                self.request_selected_month(now)
            }
            _ => CalendarAction::None,
        }
    }

    pub fn apply_events(&mut self, key: &str, events: Vec<Event>) {
        info!(month = key, count = events.len(), "calendar month loaded");
        self.cache.complete(key, events);
        self.state = CalendarState::Ready;
        if key == month_key(self.selected) {
            self.refilter();
        }
        self.cache.save_in_background(self.cache_path.clone());
    }

    pub fn apply_fetch_error(&mut self, key: &str, err: CalendarError) -> FetchFailure {
        self.cache.fail(key);
        match err {
            CalendarError::AuthRequired => {
                info!(month = key, "calendar authorization required");
                self.active = false;
                self.state = CalendarState::Idle;
                FetchFailure::AuthRequired
            }
            other => {
                let message = other.to_string();
                warn!(month = key, error = %message, "calendar fetch failed");
                self.state = CalendarState::Failed(message.clone());
                FetchFailure::Fatal(message)
            }
        }
    }

    fn request_selected_month(&mut self, now: Instant) -> CalendarAction {
        let key = month_key(self.selected);
        match self.cache.request_month(&key, now) {
            FetchDecision::Cached => {
                self.refilter();
                CalendarAction::None
            }
            FetchDecision::Start => {
                debug!(month = %key, "requesting calendar month");
                CalendarAction::Fetch(self.selected)
            }
            FetchDecision::Deferred => CalendarAction::None,
        }
    }

    fn refilter(&mut self) {
        self.day_events = self.cache.events_on(self.selected);
    }
}

fn google_calendar_url(date: NaiveDate) -> String {
    format!(
        "https://calendar.google.com/calendar/r/day/{}/{}/{}",
        date.year(),
        date.month(),
        date.day()
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::{Duration, Instant};

    use chrono::{DateTime, Local, NaiveDate, TimeZone};
    use tempfile::{TempDir, tempdir};

    use super::{CalendarAction, CalendarPanel, CalendarState, FetchFailure, WeatherState};
    use crate::calendar::{CalendarError, Event, EventCache, EventStart, FETCH_COOLDOWN};
    use crate::core::Command;
    use crate::weather::WeatherError;

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .expect("unambiguous local time")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn all_day(summary: &str, day: &str) -> Event {
        Event {
            summary: summary.into(),
            start: EventStart {
                date_time: None,
                date: Some(day.into()),
            },
        }
    }

    fn panel(months: BTreeMap<String, Vec<Event>>) -> (TempDir, CalendarPanel) {
        let dir = tempdir().expect("tempdir");
        let panel = CalendarPanel::with_cache(
            EventCache::with_months(months),
            dir.path().join("calendar_cache.json"),
            "Athens".into(),
            noon(2025, 11, 5),
        );
        (dir, panel)
    }

    #[test]
    fn activation_fetches_current_month_once() {
        let (_dir, mut panel) = panel(BTreeMap::new());
        let now = Instant::now();
        assert_eq!(panel.activate(now), CalendarAction::Fetch(date(2025, 11, 5)));
        assert!(panel.is_loading());
        let later = now + FETCH_COOLDOWN * 2;
        assert_eq!(panel.on_tick(later, noon(2025, 11, 5)), CalendarAction::None);
    }

    #[test]
    fn navigation_waits_for_first_success() {
        let (_dir, mut panel) = panel(BTreeMap::new());
        let now = Instant::now();
        panel.activate(now);
        assert_eq!(panel.handle_command(Command::MoveRight, now), CalendarAction::None);
        assert_eq!(panel.selected(), date(2025, 11, 5));

        panel.apply_events("2025-11", vec![all_day("dentist", "2025-11-06")]);
        assert_eq!(panel.state(), &CalendarState::Ready);
        assert!(panel.day_events().is_empty());
        assert_eq!(panel.handle_command(Command::MoveRight, now), CalendarAction::None);
        assert_eq!(panel.day_events()[0].summary, "dentist");
        assert_eq!(panel.busy_days(), vec![6]);
    }

    #[test]
    fn deferred_month_is_fetched_on_a_later_tick() {
        let (_dir, mut panel) = panel(BTreeMap::new());
        let start = Instant::now();
        panel.activate(start);
        panel.apply_events("2025-11", Vec::new());

        let soon = start + Duration::from_secs(1);
        assert_eq!(panel.handle_command(Command::NextMonth, soon), CalendarAction::None);
        assert_eq!(panel.selected(), date(2025, 12, 5));
        assert!(panel.is_loading());
        assert!(!panel.is_fetching());
        assert_eq!(panel.on_tick(soon, noon(2025, 11, 5)), CalendarAction::None);

        let after = start + FETCH_COOLDOWN;
        assert_eq!(
            panel.on_tick(after, noon(2025, 11, 5)),
            CalendarAction::Fetch(date(2025, 12, 5))
        );
        assert!(panel.is_fetching());
    }

    #[test]
    fn stale_month_results_are_kept() {
        let (_dir, mut panel) = panel(BTreeMap::new());
        let now = Instant::now();
        panel.activate(now);
        panel.apply_events("2025-10", vec![all_day("old", "2025-10-01")]);
        assert!(panel.day_events().is_empty());
        assert!(panel.is_loading());
        panel.apply_events("2025-11", vec![all_day("today", "2025-11-05")]);
        assert_eq!(panel.day_events()[0].summary, "today");
    }

    #[test]
    fn cached_months_show_at_once_and_skip_navigation_fetches() {
        let mut months = BTreeMap::new();
        months.insert("2025-11".to_string(), vec![all_day("x", "2025-11-05")]);
        months.insert("2025-12".to_string(), Vec::new());
        let (_dir, mut panel) = panel(months);
        assert_eq!(panel.day_events().len(), 1);
        assert!(!panel.is_loading());

        let now = Instant::now();
        assert_eq!(panel.activate(now), CalendarAction::Fetch(date(2025, 11, 5)));
        panel.apply_events("2025-11", vec![all_day("x", "2025-11-05")]);
        let later = now + FETCH_COOLDOWN;
        assert_eq!(panel.handle_command(Command::NextMonth, later), CalendarAction::None);
        assert!(!panel.is_loading());
        assert!(panel.day_events().is_empty());
    }

    #[test]
    fn auth_failure_pauses_requests_until_reactivated() {
        let (_dir, mut panel) = panel(BTreeMap::new());
        let now = Instant::now();
        panel.activate(now);
        assert_eq!(
            panel.apply_fetch_error("2025-11", CalendarError::AuthRequired),
            FetchFailure::AuthRequired
        );
        assert_eq!(panel.state(), &CalendarState::Idle);
        let later = now + FETCH_COOLDOWN;
        assert_eq!(panel.on_tick(later, noon(2025, 11, 5)), CalendarAction::None);
        assert_eq!(panel.activate(later), CalendarAction::Fetch(date(2025, 11, 5)));
    }

    #[test]
    fn other_failures_are_fatal() {
        let (_dir, mut panel) = panel(BTreeMap::new());
        let now = Instant::now();
        panel.activate(now);
        let failure = panel.apply_fetch_error(
            "2025-11",
            CalendarError::Status {
                url: "https://example.test".into(),
                status: 500,
            },
        );
        assert!(matches!(failure, FetchFailure::Fatal(_)));
        assert!(matches!(panel.state(), CalendarState::Failed(_)));
        assert_eq!(
            panel.on_tick(now + FETCH_COOLDOWN, noon(2025, 11, 5)),
            CalendarAction::None
        );
    }

    #[test]
    fn enter_opens_the_selected_day() {
        let mut months = BTreeMap::new();
        months.insert("2025-11".to_string(), Vec::new());
        let (_dir, mut panel) = panel(months);
        panel.apply_events("2025-11", Vec::new());
        assert_eq!(
            panel.handle_command(Command::Confirm, Instant::now()),
            CalendarAction::OpenUrl("https://calendar.google.com/calendar/r/day/2025/11/5".into())
        );
    }

    #[test]
    fn persisted_cache_reloads_into_a_new_panel() {
        let mut months = BTreeMap::new();
        months.insert("2025-11".to_string(), vec![all_day("x", "2025-11-05")]);
        let (dir, panel) = panel(months);
        panel.persist_cache().expect("persist");
        let reopened = CalendarPanel::new(
            dir.path().join("calendar_cache.json"),
            "Athens".into(),
            noon(2025, 11, 5),
        );
        assert!(!reopened.is_loading());
        assert_eq!(reopened.day_events().len(), 1);
    }

    #[test]
    fn weather_failure_reads_unavailable() {
        let (_dir, mut panel) = panel(BTreeMap::new());
        assert_eq!(panel.weather(), &WeatherState::Loading);
        panel.apply_weather(Err(WeatherError::NoData));
        assert_eq!(panel.weather(), &WeatherState::Unavailable);
    }
}
