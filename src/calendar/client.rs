use std::path::PathBuf;

use chrono::{DateTime, Datelike, Local, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::CalendarError;
use super::auth::{Credentials, OAuthClient, StoredToken};
use super::event::Event;

const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";

/// Where month fetches come from. Called from background threads.
pub trait EventSource {
    fn fetch_month(&self, month: NaiveDate) -> Result<Vec<Event>, CalendarError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<Event>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Reads the primary Google Calendar. Credentials and token are reloaded
/// from disk on every call so a fresh authorization is picked up without a
/// restart.
#[derive(Debug, Clone)]
pub struct GoogleCalendar {
    credentials_path: PathBuf,
    token_path: PathBuf,
    http: Client,
}

impl GoogleCalendar {
    pub fn new(credentials_path: PathBuf, token_path: PathBuf) -> Self {
        Self {
            credentials_path,
            token_path,
            http: Client::new(),
        }
    }

    fn access_token(&self) -> Result<String, CalendarError> {
        let token = match StoredToken::load(&self.token_path) {
            Ok(Some(token)) => token,
            Ok(None) => return Err(CalendarError::AuthRequired),
            Err(err) => {
                warn!(error = %err, "token file unreadable");
                return Err(CalendarError::AuthRequired);
            }
        };
        if !token.is_expired(Utc::now()) {
            return Ok(token.access_token);
        }

        info!("refreshing expired access token");
        let oauth = OAuthClient::new(Credentials::load(&self.credentials_path)?);
        let refreshed = oauth.refresh(&token).map_err(|err| {
            warn!(error = %err, "token refresh failed");
            CalendarError::AuthRequired
        })?;
        refreshed.save(&self.token_path)?;
        Ok(refreshed.access_token)
    }
}

impl EventSource for GoogleCalendar {
    fn fetch_month(&self, month: NaiveDate) -> Result<Vec<Event>, CalendarError> {
        let access_token = self.access_token()?;
        let (start, end) = month_bounds(month);
        let time_min = start.to_rfc3339();
        let time_max = end.to_rfc3339();

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("showDeleted", "false"),
                ("maxResults", "2500"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let resp = self
                .http
                .get(EVENTS_URL)
                .bearer_auth(&access_token)
                .query(&query)
                .send()
                .map_err(|source| CalendarError::Request {
                    url: EVENTS_URL.to_string(),
                    source,
                })?;

            match resp.status() {
                StatusCode::UNAUTHORIZED => return Err(CalendarError::AuthRequired),
                status if !status.is_success() => {
                    return Err(CalendarError::Status {
                        url: EVENTS_URL.to_string(),
                        status: status.as_u16(),
                    });
                }
                _ => {}
            }

            let page: EventsPage = resp.json().map_err(|source| CalendarError::Request {
                url: EVENTS_URL.to_string(),
                source,
            })?;
            events.extend(page.items);
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(month = %month.format("%Y-%m"), count = events.len(), "fetched events");
        Ok(events)
    }
}

/// First instant of the month containing `date` and of the month after, in
/// local time.
pub fn month_bounds(date: NaiveDate) -> (DateTime<Local>, DateTime<Local>) {
    let first = date.with_day(1).unwrap_or(date);
    let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
    (local_midnight(first), local_midnight(next))
}

fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    let naive = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Timelike};

    use super::month_bounds;

    #[test]
    fn month_bounds_cover_the_whole_month() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 17).expect("date");
        let (start, end) = month_bounds(date);
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2025, 11, 1).expect("date"));
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2025, 12, 1).expect("date"));
        assert_eq!(start.hour(), 0);
    }

    #[test]
    fn month_bounds_roll_over_the_year() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).expect("date");
        let (_, end) = month_bounds(date);
        assert_eq!(end.year(), 2026);
        assert_eq!(end.month(), 1);
        assert_eq!(end.day(), 1);
    }
}
