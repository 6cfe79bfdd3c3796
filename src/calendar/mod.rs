mod auth;
mod cache;
mod client;
mod event;

use thiserror::Error;

use crate::io::IoError;

pub use auth::{
    AuthFlow, AuthOutcome, AuthSession, CALLBACK_PORTS, CALLBACK_TIMEOUT, CallbackTarget,
    CodeExchange, Credentials, OAuthClient, bind_callback_listener, is_authorized,
    spawn_callback_server,
};
#[cfg(test)]
pub use auth::{CallbackBinding, StoredToken};
#[cfg(test)]
pub use cache::FETCH_COOLDOWN;
pub use cache::{EventCache, FetchDecision, month_key};
pub use client::{EventSource, GoogleCalendar};
pub use event::Event;
#[cfg(test)]
pub use event::EventStart;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar authorization required")]
    AuthRequired,
    #[error("invalid OAuth credentials {path}: {message}")]
    Credentials { path: String, message: String },
    #[error("authorization failed: {0}")]
    Authorization(String),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error(transparent)]
    Io(#[from] IoError),
}
