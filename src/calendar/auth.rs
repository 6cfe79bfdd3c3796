use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::CalendarError;
use crate::io::{read_json, write_private_json};

pub const CALLBACK_PORTS: std::ops::RangeInclusive<u16> = 8080..=8089;
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
const MANUAL_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const SUCCESS_PAGE: &str = "<!DOCTYPE html>
<html>
<head><title>dashdeck - authorized</title></head>
<body style=\"font-family: monospace; background: #282c34; color: #abb2bf; text-align: center; padding: 60px;\">
<h1 style=\"color: #98c379;\">Authentication successful</h1>
<p>dashdeck can now read your Google Calendar. You can close this window.</p>
</body>
</html>
";

/// OAuth client of type "installed application", as downloaded from the
/// Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct CredentialsFile {
    installed: Credentials,
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, CalendarError> {
        let invalid = |message: String| CalendarError::Credentials {
            path: path.display().to_string(),
            message,
        };
        let file: CredentialsFile = read_json(path)
            .map_err(|err| invalid(err.to_string()))?
            .ok_or_else(|| invalid("file not found".to_string()))?;
        let creds = file.installed;
        if creds.client_id.trim().is_empty() || creds.client_secret.trim().is_empty() {
            return Err(invalid("client_id and client_secret are required".to_string()));
        }
        Ok(creds)
    }
}

/// Token file contents. Field names match what Go's oauth2 package writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn load(path: &Path) -> Result<Option<Self>, CalendarError> {
        Ok(read_json(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), CalendarError> {
        Ok(write_private_json(path, self)?)
    }

    /// Expired, or about to within a minute. A missing or zero expiry never
    /// expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) if expiry.timestamp() > 0 => expiry <= now + TimeDelta::seconds(60),
            _ => false,
        }
    }
}

/// The token file can be read and decoded.
pub fn is_authorized(token_path: &Path) -> bool {
    matches!(read_json::<StoredToken>(token_path), Ok(Some(_)))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: &str) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            refresh_token: self
                .refresh_token
                .unwrap_or_else(|| previous_refresh.to_string()),
            expiry: self
                .expires_in
                .map(|secs| Utc::now() + TimeDelta::seconds(secs)),
        }
    }
}

/// Turns an authorization code into a token.
pub trait CodeExchange {
    fn exchange(&self, code: &str, redirect_uri: &str) -> Result<StoredToken, CalendarError>;
}

impl<E: CodeExchange + ?Sized> CodeExchange for Arc<E> {
    fn exchange(&self, code: &str, redirect_uri: &str) -> Result<StoredToken, CalendarError> {
        (**self).exchange(code, redirect_uri)
    }
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: Credentials,
    http: Client,
}

impl OAuthClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            http: Client::new(),
        }
    }

    fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, CalendarError> {
        let url = self.credentials.token_uri.as_str();
        let resp = self
            .http
            .post(url)
            .form(form)
            .send()
            .map_err(|source| CalendarError::Request {
                url: url.to_string(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(CalendarError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        resp.json().map_err(|source| CalendarError::Request {
            url: url.to_string(),
            source,
        })
    }

    pub fn refresh(&self, token: &StoredToken) -> Result<StoredToken, CalendarError> {
        if token.refresh_token.is_empty() {
            return Err(CalendarError::AuthRequired);
        }
        let resp = self.post_token(&[
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", token.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])?;
        Ok(resp.into_token(&token.refresh_token))
    }
}

impl CodeExchange for OAuthClient {
    fn exchange(&self, code: &str, redirect_uri: &str) -> Result<StoredToken, CalendarError> {
        let resp = self.post_token(&[
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])?;
        Ok(resp.into_token(""))
    }
}

#[derive(Debug)]
pub enum CallbackBinding {
    Bound { listener: TcpListener, port: u16 },
    Unavailable,
}

/// Binds the first free port among `ports` on the loopback interface.
pub fn bind_callback_listener(ports: impl IntoIterator<Item = u16>) -> CallbackBinding {
    for port in ports {
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => {
                let port = listener
                    .local_addr()
                    .map(|addr| addr.port())
                    .unwrap_or(port);
                return CallbackBinding::Bound { listener, port };
            }
            Err(err) => debug!(port, error = %err, "callback port unavailable"),
        }
    }
    CallbackBinding::Unavailable
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    /// Google redirects the browser to a local callback listener.
    Automatic { port: u16 },
    /// The user pastes the code shown by Google.
    Manual,
}

/// One authorization attempt. A new session is started for every retry.
#[derive(Debug)]
pub struct AuthSession {
    flow: AuthFlow,
    redirect_uri: String,
    auth_url: String,
    state: String,
    listener: Option<TcpListener>,
}

impl AuthSession {
    pub fn new(credentials: &Credentials, binding: CallbackBinding) -> Result<Self, CalendarError> {
        let (flow, redirect_uri, listener) = match binding {
            CallbackBinding::Bound { listener, port } => (
                AuthFlow::Automatic { port },
                format!("http://localhost:{port}/callback"),
                Some(listener),
            ),
            CallbackBinding::Unavailable => (AuthFlow::Manual, MANUAL_REDIRECT.to_string(), None),
        };
        let state = generate_state();
        let auth_url = Url::parse_with_params(
            &credentials.auth_uri,
            [
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPE),
                ("access_type", "offline"),
                ("state", state.as_str()),
            ],
        )
        .map_err(|err| CalendarError::Credentials {
            path: credentials.auth_uri.clone(),
            message: err.to_string(),
        })?
        .to_string();

        info!(?flow, "started authorization session");
        Ok(Self {
            flow,
            redirect_uri,
            auth_url,
            state,
            listener,
        })
    }

    pub fn flow(&self) -> AuthFlow {
        self.flow
    }

    pub fn is_manual(&self) -> bool {
        self.flow == AuthFlow::Manual
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Hands the callback listener to the server thread. `None` after the
    /// first call, and always in the manual flow.
    pub fn take_listener(&mut self) -> Option<TcpListener> {
        self.listener.take()
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Exchanges a pasted code and stores the token.
    pub fn complete_manual(
        &self,
        code: &str,
        exchange: &dyn CodeExchange,
        token_path: &Path,
    ) -> Result<(), CalendarError> {
        let token = exchange.exchange(code.trim(), &self.redirect_uri)?;
        token.save(token_path)?;
        info!("authorization completed with pasted code");
        Ok(())
    }
}

fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized,
    Failed(String),
}

/// What the callback handler needs to finish the flow.
#[derive(Debug, Clone)]
pub struct CallbackTarget {
    pub state: String,
    pub redirect_uri: String,
    pub token_path: PathBuf,
}

/// Serves `/callback` on `listener` until the flow completes, fails, or
/// `timeout` passes. The outcome is sent exactly once.
pub fn spawn_callback_server<E>(
    listener: TcpListener,
    target: CallbackTarget,
    exchange: E,
    timeout: Duration,
) -> Receiver<AuthOutcome>
where
    E: CodeExchange + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    thread::spawn(move || run_callback_server(listener, target, exchange, timeout, tx));
    rx
}

fn run_callback_server<E: CodeExchange>(
    listener: TcpListener,
    target: CallbackTarget,
    exchange: E,
    timeout: Duration,
    tx: SyncSender<AuthOutcome>,
) {
    if let Err(err) = listener.set_nonblocking(true) {
        let _ = tx.send(AuthOutcome::Failed(err.to_string()));
        return;
    }
    let deadline = Instant::now() + timeout;
    loop {
        if Instant::now() >= deadline {
            warn!("authorization callback timed out");
            let _ = tx.send(AuthOutcome::Failed("authentication timeout".to_string()));
            return;
        }
        match listener.accept() {
            Ok((stream, _)) => match handle_callback(stream, &target, &exchange) {
                Ok(Some(outcome)) => {
                    let _ = tx.send(outcome);
                    return;
                }
                Ok(None) => {}
                Err(err) => debug!(error = %err, "dropped callback connection"),
            },
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(200));
            }
            Err(err) => {
                let _ = tx.send(AuthOutcome::Failed(err.to_string()));
                return;
            }
        }
    }
}

/// Handles one request. `None` means the request was not the callback and
/// the server keeps listening.
fn handle_callback<E: CodeExchange>(
    mut stream: TcpStream,
    target: &CallbackTarget,
    exchange: &E,
) -> io::Result<Option<AuthOutcome>> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    // Drain headers so closing the socket does not reset the connection.
    let mut header = String::new();
    while reader.read_line(&mut header)? > 0 && !header.trim_end().is_empty() {
        header.clear();
    }
    let request_target = request_line.split_whitespace().nth(1).unwrap_or("/");

    let Ok(url) = Url::parse(&format!("http://localhost{request_target}")) else {
        respond(&mut stream, "400 Bad Request", "text/plain", "Bad request\n")?;
        return Ok(None);
    };
    if url.path() != "/callback" {
        respond(&mut stream, "404 Not Found", "text/plain", "Not found\n")?;
        return Ok(None);
    }

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    let outcome = match (param("code"), param("error")) {
        (_, Some(error)) => Err(CalendarError::Authorization(format!(
            "provider returned {error}"
        ))),
        (None, None) => Err(CalendarError::Authorization(
            "no authorization code received".to_string(),
        )),
        (Some(_), None) if param("state").as_deref() != Some(target.state.as_str()) => Err(
            CalendarError::Authorization("state does not match this session".to_string()),
        ),
        (Some(code), None) => exchange
            .exchange(&code, &target.redirect_uri)
            .and_then(|token| token.save(&target.token_path)),
    };

    match outcome {
        Ok(()) => {
            respond(&mut stream, "200 OK", "text/html; charset=utf-8", SUCCESS_PAGE)?;
            info!("authorization completed through callback");
            Ok(Some(AuthOutcome::Authorized))
        }
        Err(err) => {
            let message = err.to_string();
            respond(
                &mut stream,
                "400 Bad Request",
                "text/plain; charset=utf-8",
                &format!("{message}\n"),
            )?;
            warn!(%message, "authorization callback failed");
            Ok(Some(AuthOutcome::Failed(message)))
        }
    }
}

fn respond(stream: &mut TcpStream, status: &str, content_type: &str, body: &str) -> io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::time::Duration;

    use chrono::{TimeDelta, Utc};
    use tempfile::tempdir;

    use super::{
        AuthFlow, AuthOutcome, AuthSession, CallbackBinding, CallbackTarget, CodeExchange,
        Credentials, StoredToken, bind_callback_listener, is_authorized, spawn_callback_server,
    };
    use crate::calendar::CalendarError;

    struct FakeExchange;

    impl CodeExchange for FakeExchange {
        fn exchange(&self, code: &str, _redirect_uri: &str) -> Result<StoredToken, CalendarError> {
            if code == "bad" {
                return Err(CalendarError::Authorization("rejected".into()));
            }
            Ok(StoredToken {
                access_token: format!("access-{code}"),
                token_type: "Bearer".into(),
                refresh_token: "refresh".into(),
                expiry: Some(Utc::now() + TimeDelta::hours(1)),
            })
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            client_id: "client".into(),
            client_secret: "secret".into(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".into(),
            token_uri: "https://oauth2.googleapis.com/token".into(),
        }
    }

    fn get(port: u16, target: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("connect");
        write!(stream, "GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").expect("send");
        let mut response = String::new();
        stream.read_to_string(&mut response).expect("read");
        response
    }

    #[test]
    fn listener_falls_back_to_the_next_port() {
        let occupied = TcpListener::bind("127.0.0.1:0").expect("bind");
        let taken = occupied.local_addr().expect("addr").port();

        match bind_callback_listener([taken, 0]) {
            CallbackBinding::Bound { port, .. } => assert_ne!(port, taken),
            CallbackBinding::Unavailable => panic!("expected a fallback port"),
        }
        assert!(matches!(
            bind_callback_listener([taken]),
            CallbackBinding::Unavailable
        ));
    }

    #[test]
    fn session_picks_flow_from_binding() {
        let manual = AuthSession::new(&credentials(), CallbackBinding::Unavailable).expect("session");
        assert!(manual.is_manual());
        assert_eq!(manual.redirect_uri(), "urn:ietf:wg:oauth:2.0:oob");

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let mut auto = AuthSession::new(&credentials(), CallbackBinding::Bound { listener, port })
            .expect("session");
        assert_eq!(auto.flow(), AuthFlow::Automatic { port });
        assert!(auto.auth_url().contains("access_type=offline"));
        assert!(auto.auth_url().contains(&format!("state={}", auto.state())));
        assert!(auto.take_listener().is_some());
        assert!(auto.take_listener().is_none());
    }

    #[test]
    fn callback_ignores_other_paths_then_stores_token() {
        let dir = tempdir().expect("tempdir");
        let token_path = dir.path().join("token.json");
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let rx = spawn_callback_server(
            listener,
            CallbackTarget {
                state: "xyz".into(),
                redirect_uri: format!("http://localhost:{port}/callback"),
                token_path: token_path.clone(),
            },
            FakeExchange,
            Duration::from_secs(10),
        );

        assert!(get(port, "/favicon.ico").starts_with("HTTP/1.1 404"));
        let page = get(port, "/callback?code=abc&state=xyz");
        assert!(page.starts_with("HTTP/1.1 200"));
        assert!(page.contains("Authentication successful"));

        assert_eq!(rx.recv().expect("outcome"), AuthOutcome::Authorized);
        assert!(is_authorized(&token_path));
        let token = StoredToken::load(&token_path).expect("load").expect("token");
        assert_eq!(token.access_token, "access-abc");
    }

    #[test]
    fn callback_rejects_wrong_state_and_provider_errors() {
        let dir = tempdir().expect("tempdir");
        let token_path = dir.path().join("token.json");
        for (target, expected) in [
            (
                "/callback?code=abc&state=nope",
                "authorization failed: state does not match this session",
            ),
            (
                "/callback?error=access_denied",
                "authorization failed: provider returned access_denied",
            ),
            ("/callback", "authorization failed: no authorization code received"),
        ] {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            let port = listener.local_addr().expect("addr").port();
            let rx = spawn_callback_server(
                listener,
                CallbackTarget {
                    state: "xyz".into(),
                    redirect_uri: String::new(),
                    token_path: token_path.clone(),
                },
                FakeExchange,
                Duration::from_secs(10),
            );
            assert!(get(port, target).starts_with("HTTP/1.1 400"));
            assert_eq!(
                rx.recv().expect("outcome"),
                AuthOutcome::Failed(expected.to_string())
            );
        }
        assert!(!is_authorized(&token_path));
    }

    #[test]
    fn callback_server_gives_up_after_timeout() {
        let dir = tempdir().expect("tempdir");
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let rx = spawn_callback_server(
            listener,
            CallbackTarget {
                state: "xyz".into(),
                redirect_uri: String::new(),
                token_path: dir.path().join("token.json"),
            },
            FakeExchange,
            Duration::from_millis(100),
        );
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).expect("outcome"),
            AuthOutcome::Failed("authentication timeout".into())
        );
    }

    #[test]
    fn manual_flow_saves_token_or_reports_failure() {
        let dir = tempdir().expect("tempdir");
        let token_path = dir.path().join("token.json");
        let session = AuthSession::new(&credentials(), CallbackBinding::Unavailable).expect("session");

        assert!(session.complete_manual("bad", &FakeExchange, &token_path).is_err());
        assert!(!is_authorized(&token_path));

        session
            .complete_manual("  pasted \n", &FakeExchange, &token_path)
            .expect("complete");
        let token = StoredToken::load(&token_path).expect("load").expect("token");
        assert_eq!(token.access_token, "access-pasted");
    }

    #[test]
    fn token_file_decodes_go_oauth2_layout() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{"access_token":"a","token_type":"Bearer","refresh_token":"r","expiry":"2030-01-02T03:04:05.123456+01:00"}"#,
        )
        .expect("write");
        let token = StoredToken::load(&path).expect("load").expect("token");
        assert_eq!(token.refresh_token, "r");
        assert!(!token.is_expired(Utc::now()));

        std::fs::write(&path, "garbage").expect("write");
        assert!(!is_authorized(&path));
    }

    #[test]
    fn expiry_includes_a_minute_of_slack() {
        let now = Utc::now();
        let mut token = StoredToken {
            access_token: "a".into(),
            token_type: "Bearer".into(),
            refresh_token: "r".into(),
            expiry: Some(now + TimeDelta::seconds(30)),
        };
        assert!(token.is_expired(now));
        token.expiry = None;
        assert!(!token.is_expired(now));
    }

    #[test]
    fn credentials_require_client_fields() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("credentials.json");
        assert!(Credentials::load(&path).is_err());
        std::fs::write(
            &path,
            r#"{"installed":{"client_id":"id","client_secret":"s"}}"#,
        )
        .expect("write");
        let creds = Credentials::load(&path).expect("load");
        assert_eq!(creds.token_uri, "https://oauth2.googleapis.com/token");
        std::fs::write(&path, r#"{"installed":{"client_id":"","client_secret":"s"}}"#)
            .expect("write");
        assert!(Credentials::load(&path).is_err());
    }
}
