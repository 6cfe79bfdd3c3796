mod editor;

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};
use clap::Parser;
use crossterm::event::{
    self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tui_textarea::TextArea;

use crate::calendar::{
    AuthOutcome, AuthSession, CALLBACK_PORTS, CALLBACK_TIMEOUT, CalendarError, CallbackTarget,
    CodeExchange, Credentials, Event, EventSource, GoogleCalendar, OAuthClient,
    bind_callback_listener, is_authorized, month_key, spawn_callback_server,
};
use crate::core::{
    AppMode, Binding, BindingContext, Command, ConfirmChoice, EditorMode, KeyBindings, PanelId,
};
use crate::input::{InputContext, map_key_event};
use crate::io::{
    AppPaths, FsNoteRepository, LoadedSettings, Settings, ensure_seed_notes, load_settings,
    save_settings,
};
use crate::panels::{
    CalendarAction, CalendarPanel, DashboardLayout, FetchFailure, FocusRouter, NotesOutcome,
    NotesPanel, TodoPanel,
};
use crate::ui::{UiModel, draw};
use crate::weather::{Weather, WeatherError, WeatherSource, Wttr};

pub use editor::NoteEditor;

const TICK: Duration = Duration::from_millis(120);
const SAVED_STATUS: Duration = Duration::from_secs(3);
const ERROR_STATUS: Duration = Duration::from_secs(5);
const EDITOR_PAGE: i32 = 10;

#[derive(Parser, Debug)]
#[command(author, version, about = "dashdeck - terminal dashboard")]
struct Cli {}

/// Results from background threads. Threads never touch app state.
#[derive(Debug)]
pub enum AppMessage {
    Weather(Result<Weather, WeatherError>),
    Events {
        month: String,
        result: Result<Vec<Event>, CalendarError>,
    },
    Auth {
        /// State token of the session the outcome belongs to.
        state: String,
        outcome: AuthOutcome,
    },
}

/// Remote data sources, injectable so tests never touch the network.
#[derive(Clone)]
pub struct Services {
    pub events: Arc<dyn EventSource + Send + Sync>,
    pub weather: Arc<dyn WeatherSource + Send + Sync>,
}

impl Services {
    pub fn google(paths: &AppPaths) -> Self {
        Self {
            events: Arc::new(GoogleCalendar::new(
                paths.credentials_file(),
                paths.token_file(),
            )),
            weather: Arc::new(Wttr),
        }
    }
}

/// First-run screens: the city prompt and the calendar authorization.
#[derive(Default)]
pub struct SetupState {
    pub input: TextArea<'static>,
    pub session: Option<AuthSession>,
    /// Exchanges codes for the current session.
    exchange: Option<Arc<dyn CodeExchange + Send + Sync>>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone)]
struct StatusMessage {
    text: String,
    until: Instant,
}

pub struct App {
    pub mode: AppMode,
    pub running: bool,
    pub needs_redraw: bool,
    paths: AppPaths,
    settings: Settings,
    router: FocusRouter,
    todo: TodoPanel,
    notes: NotesPanel,
    calendar: CalendarPanel,
    editor: Option<NoteEditor>,
    confirm_choice: ConfirmChoice,
    setup: SetupState,
    show_help: bool,
    status: Option<StatusMessage>,
    fatal: Option<String>,
    /// A calendar failure that arrived while the editor was open. It ends
    /// the session once the editor closes.
    fatal_pending: Option<String>,
    /// An expired authorization was noticed while the editor was open.
    auth_pending: bool,
    bindings: KeyBindings,
    area: Rect,
    services: Services,
    tx: Sender<AppMessage>,
    rx: Receiver<AppMessage>,
}

impl App {
    pub fn new(
        paths: AppPaths,
        loaded: LoadedSettings,
        services: Services,
        now: DateTime<Local>,
    ) -> Result<Self> {
        let LoadedSettings {
            mut settings,
            first_run,
        } = loaded;
        let repo = FsNoteRepository::new(paths.notes_dir());
        if ensure_seed_notes(&repo, &mut settings).context("writing default notes")? {
            save_settings(&paths.settings_file(), &settings).context("saving settings")?;
        }
        let notes = NotesPanel::new(Box::new(repo)).context("listing notes")?;
        let todo = TodoPanel::load(paths.todo_file());
        let calendar =
            CalendarPanel::new(paths.calendar_cache_file(), settings.location.clone(), now);

        let mode = if first_run {
            AppMode::SetupWeather
        } else if !is_authorized(&paths.token_file()) {
            AppMode::SetupCalendar
        } else {
            AppMode::Dashboard
        };
        let router = FocusRouter::default();
        let bindings = KeyBindings::compute(BindingContext {
            mode,
            focus: router.focus(),
            capturing: false,
            editor_mode: EditorMode::Preview,
        });
        let (tx, rx) = mpsc::channel();

        Ok(Self {
            mode,
            running: true,
            needs_redraw: true,
            paths,
            settings,
            router,
            todo,
            notes,
            calendar,
            editor: None,
            confirm_choice: ConfirmChoice::No,
            setup: SetupState::default(),
            show_help: false,
            status: None,
            fatal: None,
            fatal_pending: None,
            auth_pending: false,
            bindings,
            area: Rect::default(),
            services,
            tx,
            rx,
        })
    }

    /// Runs the entry actions of the startup mode.
    pub fn start(&mut self, now: Instant) {
        info!(mode = ?self.mode, "starting");
        match self.mode {
            AppMode::Dashboard => self.enter_dashboard(now),
            AppMode::SetupCalendar => self.enter_calendar_setup(),
            AppMode::SetupWeather => self.enter_weather_setup(),
            AppMode::EditingNote | AppMode::ExitConfirmation => {}
        }
    }

    /// `Err` when the session ended on an unrecoverable calendar error.
    pub fn finish(self) -> Result<()> {
        if let Err(err) = self.calendar.persist_cache() {
            warn!(error = %err, "failed to persist calendar cache");
        }
        match self.fatal.or(self.fatal_pending) {
            Some(message) => Err(anyhow!("calendar error: {message}")),
            None => Ok(()),
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.area = Rect::new(0, 0, width, height);
        self.needs_redraw = true;
    }

    pub fn ui_model(&self) -> UiModel<'_> {
        UiModel {
            mode: self.mode,
            focus: self.router.focus(),
            todo: &self.todo,
            notes: &self.notes,
            calendar: &self.calendar,
            editor: self.editor.as_ref(),
            confirm_choice: self.confirm_choice,
            setup: &self.setup,
            credentials_path: self.paths.credentials_file(),
            bindings: &self.bindings,
            show_help: self.show_help,
            status: self.status.as_ref().map(|s| s.text.as_str()),
            hint: self.status_hint(),
            fatal: self.fatal.as_deref(),
        }
    }

    fn status_hint(&self) -> String {
        format!(
            "Press Ctrl+k to see key bindings from {}",
            self.router.focus().title()
        )
    }

    pub fn tick(&mut self, now: Instant, wall: DateTime<Local>) {
        if self.status.as_ref().is_some_and(|s| now >= s.until) {
            self.status = None;
        }
        let action = self.calendar.on_tick(now, wall);
        self.run_calendar_action(action);
        self.needs_redraw = true;
    }

    pub fn drain_messages(&mut self, now: Instant) {
        while let Ok(msg) = self.rx.try_recv() {
            self.handle_message(msg, now);
        }
    }

    fn handle_message(&mut self, msg: AppMessage, now: Instant) {
        match msg {
            AppMessage::Weather(result) => self.calendar.apply_weather(result),
            AppMessage::Events { month, result } => match result {
                Ok(events) => self.calendar.apply_events(&month, events),
                Err(err) => match self.calendar.apply_fetch_error(&month, err) {
                    FetchFailure::AuthRequired => self.require_authorization(),
                    FetchFailure::Fatal(message) => self.fail_calendar(message),
                },
            },
            AppMessage::Auth { state, outcome } => self.apply_auth_outcome(&state, outcome, now),
        }
        self.needs_redraw = true;
    }

    fn require_authorization(&mut self) {
        match self.mode {
            AppMode::Dashboard => self.enter_calendar_setup(),
            AppMode::EditingNote | AppMode::ExitConfirmation => self.auth_pending = true,
            AppMode::SetupWeather | AppMode::SetupCalendar => {}
        }
    }

    fn fail_calendar(&mut self, message: String) {
        match self.mode {
            AppMode::EditingNote | AppMode::ExitConfirmation => {
                warn!(error = %message, "calendar failed, waiting for the editor to close");
                self.flash(
                    format!("Calendar error: {message}. Save your note, dashdeck will exit."),
                    ERROR_STATUS,
                );
                self.fatal_pending = Some(message);
            }
            AppMode::Dashboard | AppMode::SetupWeather | AppMode::SetupCalendar => {
                self.fatal = Some(message);
            }
        }
    }

    fn apply_auth_outcome(&mut self, state: &str, outcome: AuthOutcome, now: Instant) {
        let current = self
            .setup
            .session
            .as_ref()
            .is_some_and(|session| session.state() == state);
        if !current || self.mode != AppMode::SetupCalendar {
            debug!("ignoring outcome of a stale authorization session");
            return;
        }
        match outcome {
            AuthOutcome::Authorized => {
                info!("calendar authorized");
                self.enter_dashboard(now);
            }
            AuthOutcome::Failed(message) => {
                warn!(error = %message, "authorization failed");
                self.setup.error = Some(message);
                self.setup.session = None;
                self.setup.exchange = None;
            }
        }
    }

    fn switch_mode(&mut self, mode: AppMode) {
        if self.mode != mode {
            info!(from = ?self.mode, to = ?mode, "mode change");
        }
        self.mode = mode;
        self.show_help = false;
        self.refresh_bindings();
    }

    fn refresh_bindings(&mut self) {
        self.bindings = KeyBindings::compute(BindingContext {
            mode: self.mode,
            focus: self.router.focus(),
            capturing: self.focused_is_capturing(),
            editor_mode: self
                .editor
                .as_ref()
                .map_or(EditorMode::Preview, NoteEditor::mode),
        });
        self.needs_redraw = true;
    }

    fn focused_is_capturing(&self) -> bool {
        match self.router.focus() {
            PanelId::Tasks => self.todo.is_capturing(),
            PanelId::Notes => self.notes.is_capturing(),
            PanelId::Calendar => false,
        }
    }

    fn enter_dashboard(&mut self, now: Instant) {
        self.setup = SetupState::default();
        self.switch_mode(AppMode::Dashboard);
        self.spawn_weather();
        let action = self.calendar.activate(now);
        self.run_calendar_action(action);
    }

    fn enter_weather_setup(&mut self) {
        self.setup = SetupState::default();
        self.setup
            .input
            .set_placeholder_text(format!("City (default {})", self.settings.location));
        self.switch_mode(AppMode::SetupWeather);
    }

    fn enter_calendar_setup(&mut self) {
        self.setup = SetupState::default();
        self.setup
            .input
            .set_placeholder_text("Paste the authorization code");
        self.switch_mode(AppMode::SetupCalendar);
        self.start_auth_session();
    }

    /// Binds a callback port if one is free and, in that case, serves the
    /// redirect in the background. Otherwise the session uses the pasted
    /// code flow.
    fn start_auth_session(&mut self) {
        self.setup.session = None;
        self.setup.exchange = None;
        let credentials = match Credentials::load(&self.paths.credentials_file()) {
            Ok(credentials) => credentials,
            Err(err) => {
                warn!(error = %err, "calendar credentials unavailable");
                self.setup.error = Some(err.to_string());
                return;
            }
        };
        let binding = bind_callback_listener(CALLBACK_PORTS);
        let mut session = match AuthSession::new(&credentials, binding) {
            Ok(session) => session,
            Err(err) => {
                self.setup.error = Some(err.to_string());
                return;
            }
        };
        let exchange: Arc<dyn CodeExchange + Send + Sync> =
            Arc::new(OAuthClient::new(credentials));

        if let Some(listener) = session.take_listener() {
            let state = session.state().to_string();
            let target = CallbackTarget {
                state: state.clone(),
                redirect_uri: session.redirect_uri().to_string(),
                token_path: self.paths.token_file(),
            };
            let outcome = spawn_callback_server(listener, target, Arc::clone(&exchange), CALLBACK_TIMEOUT);
            let tx = self.tx.clone();
            thread::spawn(move || {
                if let Ok(outcome) = outcome.recv() {
                    let _ = tx.send(AppMessage::Auth { state, outcome });
                }
            });
        }
        self.setup.error = None;
        self.setup.session = Some(session);
        self.setup.exchange = Some(exchange);
    }

    fn spawn_weather(&mut self) {
        self.calendar.weather_requested();
        let source = Arc::clone(&self.services.weather);
        let city = self.settings.location.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let _ = tx.send(AppMessage::Weather(source.current(&city)));
        });
    }

    fn run_calendar_action(&mut self, action: CalendarAction) {
        match action {
            CalendarAction::None => {}
            CalendarAction::Fetch(month) => {
                let key = month_key(month);
                info!(month = %key, "fetching calendar month");
                let source = Arc::clone(&self.services.events);
                let tx = self.tx.clone();
                thread::spawn(move || {
                    let result = source.fetch_month(month);
                    let _ = tx.send(AppMessage::Events { month: key, result });
                });
            }
            CalendarAction::OpenUrl(url) => {
                if let Err(err) = webbrowser::open(&url) {
                    self.flash_error(err);
                }
            }
        }
    }

    fn flash(&mut self, text: impl Into<String>, ttl: Duration) {
        self.status = Some(StatusMessage {
            text: text.into(),
            until: Instant::now() + ttl,
        });
        self.needs_redraw = true;
    }

    fn flash_error(&mut self, err: impl std::fmt::Display) {
        warn!(error = %err, "operation failed");
        self.flash(format!("Error: {err}"), ERROR_STATUS);
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.mode != AppMode::Dashboard || self.show_help || self.fatal.is_some() {
            return;
        }
        if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
            let layout = DashboardLayout::compute(self.area);
            let capturing = self.focused_is_capturing();
            if self
                .router
                .click(&layout, mouse.column, mouse.row, capturing)
            {
                self.refresh_bindings();
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.fatal.is_some() {
            self.running = false;
            return;
        }
        match self.mode {
            AppMode::Dashboard => self.handle_dashboard_key(key, now),
            AppMode::EditingNote => self.handle_editor_key(key),
            AppMode::ExitConfirmation => self.handle_confirmation_key(key),
            AppMode::SetupWeather => self.handle_weather_setup_key(key, now),
            AppMode::SetupCalendar => self.handle_calendar_setup_key(key, now),
        }
        self.refresh_bindings();
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent, now: Instant) {
        let capturing = self.focused_is_capturing();
        let context = if capturing {
            InputContext::TextEntry
        } else {
            InputContext::Navigation
        };
        let Some(cmd) = map_key_event(key, context) else {
            if self.show_help {
                return;
            }
            if capturing {
                match self.router.focus() {
                    PanelId::Tasks => self.todo.handle_text_key(key),
                    PanelId::Notes => self.notes.handle_text_key(key),
                    PanelId::Calendar => {}
                }
            } else if let Some(c) = type_ahead_char(key) {
                match self.router.focus() {
                    PanelId::Tasks => self.todo.jump_to(c),
                    PanelId::Notes => self.notes.jump_to(c),
                    PanelId::Calendar => {}
                }
            }
            return;
        };

        if self.show_help {
            match cmd {
                Command::ToggleHelp | Command::Cancel => self.show_help = false,
                Command::Quit if self.bindings.allows(Binding::Quit) => self.running = false,
                _ => {}
            }
            return;
        }

        match cmd {
            Command::Quit => {
                if self.bindings.allows(Binding::Quit) {
                    self.running = false;
                }
            }
            Command::ToggleHelp => {
                if self.bindings.allows(Binding::ShowHelp) {
                    self.show_help = true;
                }
            }
            Command::CycleFocus | Command::CycleFocusBack => {
                self.router.cycle(cmd == Command::CycleFocus, capturing);
            }
            _ => self.dispatch_to_panel(cmd, now),
        }
    }

    fn dispatch_to_panel(&mut self, cmd: Command, now: Instant) {
        match self.router.focus() {
            PanelId::Tasks => {
                if let Err(err) = self.todo.handle_command(cmd) {
                    self.flash_error(err);
                }
            }
            PanelId::Notes => match self.notes.handle_command(cmd) {
                Ok(NotesOutcome::EditRequested { note, content }) => {
                    info!(path = %note.path.display(), "opening note");
                    self.editor = Some(NoteEditor::open(note, content));
                    self.switch_mode(AppMode::EditingNote);
                }
                Ok(NotesOutcome::None) => {}
                Err(err) => self.flash_error(err),
            },
            PanelId::Calendar => {
                let action = self.calendar.handle_command(cmd, now);
                self.run_calendar_action(action);
            }
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let Some(editor) = self.editor.as_mut() else {
            self.switch_mode(AppMode::Dashboard);
            return;
        };
        match editor.mode() {
            EditorMode::Preview => match map_key_event(key, InputContext::Navigation) {
                Some(Command::Edit) => editor.enter_source(),
                Some(Command::Cancel) => self.close_editor(),
                Some(Command::MoveUp) => editor.scroll_by(-1),
                Some(Command::MoveDown) => editor.scroll_by(1),
                Some(Command::PageUp) => editor.scroll_by(-EDITOR_PAGE),
                Some(Command::PageDown) => editor.scroll_by(EDITOR_PAGE),
                _ => {}
            },
            EditorMode::Source => match map_key_event(key, InputContext::Editor) {
                Some(Command::Save) => self.save_editor(),
                Some(Command::Cancel) => {
                    if editor.is_dirty() {
                        self.confirm_choice = ConfirmChoice::No;
                        self.switch_mode(AppMode::ExitConfirmation);
                    } else {
                        editor.enter_preview();
                    }
                }
                Some(_) => {}
                None => editor.input(key),
            },
        }
    }

    fn save_editor(&mut self) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        let path = editor.note().path.clone();
        match self.notes.save_note(&path, &editor.content()) {
            Ok(()) => {
                editor.mark_saved();
                info!(path = %path.display(), "saved note");
                self.flash("Note saved", SAVED_STATUS);
            }
            Err(err) => self.flash_error(err),
        }
    }

    fn close_editor(&mut self) {
        self.editor = None;
        self.switch_mode(AppMode::Dashboard);
        if let Some(message) = self.fatal_pending.take() {
            self.fatal = Some(message);
            return;
        }
        if self.auth_pending {
            self.auth_pending = false;
            self.enter_calendar_setup();
        }
    }

    fn handle_confirmation_key(&mut self, key: KeyEvent) {
        match map_key_event(key, InputContext::Confirmation) {
            Some(Command::ChooseYes) => self.confirm_choice = ConfirmChoice::Yes,
            Some(Command::ChooseNo) => self.confirm_choice = ConfirmChoice::No,
            Some(Command::Confirm) => {
                if let Some(editor) = self.editor.as_mut() {
                    match self.confirm_choice {
                        ConfirmChoice::Yes => editor.discard(),
                        ConfirmChoice::No => editor.enter_source(),
                    }
                }
                self.switch_mode(AppMode::EditingNote);
            }
            Some(Command::Cancel) => self.switch_mode(AppMode::EditingNote),
            Some(Command::Quit) => self.running = false,
            _ => {}
        }
    }

    fn handle_weather_setup_key(&mut self, key: KeyEvent, now: Instant) {
        match map_key_event(key, InputContext::TextEntry) {
            Some(Command::Confirm) => {
                let city = self.setup.input.lines().join(" ").trim().to_string();
                if !city.is_empty() {
                    self.finish_weather_setup(Some(city), now);
                }
            }
            Some(Command::Cancel) => self.finish_weather_setup(None, now),
            Some(Command::Quit) => self.running = false,
            Some(_) => {}
            None => {
                self.setup.input.input(key);
            }
        }
    }

    fn finish_weather_setup(&mut self, city: Option<String>, now: Instant) {
        if let Some(city) = city {
            self.settings.location = city;
        }
        if let Err(err) = save_settings(&self.paths.settings_file(), &self.settings) {
            self.flash_error(err);
        }
        info!(location = %self.settings.location, "weather location set");
        self.calendar.set_location(self.settings.location.clone());
        if is_authorized(&self.paths.token_file()) {
            self.enter_dashboard(now);
        } else {
            self.enter_calendar_setup();
        }
    }

    fn handle_calendar_setup_key(&mut self, key: KeyEvent, now: Instant) {
        match map_key_event(key, InputContext::TextEntry) {
            Some(Command::OpenLink) => self.open_auth_url(),
            Some(Command::Confirm) => self.submit_auth_code(now),
            Some(Command::Quit) => self.running = false,
            Some(_) => {}
            None => {
                if self
                    .setup
                    .session
                    .as_ref()
                    .is_some_and(AuthSession::is_manual)
                {
                    self.setup.input.input(key);
                }
            }
        }
    }

    fn open_auth_url(&mut self) {
        if self.setup.session.is_none() {
            self.start_auth_session();
        }
        let Some(url) = self
            .setup
            .session
            .as_ref()
            .map(|session| session.auth_url().to_string())
        else {
            return;
        };
        self.setup.notice = Some(match webbrowser::open(&url) {
            Ok(()) => "Browser opened. Finish signing in there.".to_string(),
            Err(err) => {
                warn!(error = %err, "could not launch a browser");
                format!("Could not open a browser ({err}). Visit the link shown below.")
            }
        });
    }

    fn submit_auth_code(&mut self, now: Instant) {
        let code = self.setup.input.lines().join("").trim().to_string();
        if code.is_empty() {
            return;
        }
        let (Some(session), Some(exchange)) =
            (self.setup.session.as_ref(), self.setup.exchange.as_ref())
        else {
            return;
        };
        if !session.is_manual() {
            return;
        }
        match session.complete_manual(&code, exchange.as_ref(), &self.paths.token_file()) {
            Ok(()) => self.enter_dashboard(now),
            Err(err) => {
                warn!(error = %err, "code exchange failed");
                self.setup.error = Some(err.to_string());
            }
        }
    }
}

/// Plain characters with no binding jump through the focused list.
fn type_ahead_char(key: KeyEvent) -> Option<char> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    match key.code {
        KeyCode::Char(c) if c.is_alphanumeric() => Some(c),
        _ => None,
    }
}

pub fn run() -> Result<()> {
    let _cli = Cli::parse();
    let paths = AppPaths::discover()?;
    paths.ensure()?;
    let _log_guard = init_logging(&paths)?;
    info!(version = env!("CARGO_PKG_VERSION"), "dashdeck starting");

    let loaded = load_settings(&paths.settings_file()).context("loading settings")?;
    let services = Services::google(&paths);
    let mut app = App::new(paths, loaded, services, Local::now())?;
    app.start(Instant::now());

    let (_guard, mut terminal) = setup_terminal()?;
    let size = terminal.size().context("reading terminal size")?;
    app.resize(size.width, size.height);

    while app.running {
        app.drain_messages(Instant::now());
        if app.needs_redraw {
            terminal.draw(|f| draw(f, app.ui_model()))?;
            app.needs_redraw = false;
        }

        if event::poll(TICK)? {
            match event::read()? {
                TermEvent::Key(key) => app.handle_key(key, Instant::now()),
                TermEvent::Mouse(mouse) => app.handle_mouse(mouse),
                TermEvent::Resize(w, h) => app.resize(w, h),
                _ => {}
            }
        }
        app.tick(Instant::now(), Local::now());
    }

    terminal.show_cursor().context("show cursor")?;
    info!("dashdeck exiting");
    app.finish()
}

/// Logs go to a file in the cache directory; the terminal belongs to the UI.
fn init_logging(paths: &AppPaths) -> Result<WorkerGuard> {
    let appender = tracing_appender::rolling::never(&paths.cache_dir, paths.log_file_name());
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("initializing logging: {err}"))?;
    Ok(guard)
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture
        );
    }
}

fn setup_terminal() -> Result<(TerminalGuard, Terminal<CrosstermBackend<io::Stdout>>)> {
    enable_raw_mode().context("enabling raw mode")?;
    execute!(
        io::stdout(),
        EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )
    .context("enter alternate screen")?;

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture
        );
        hook(panic_info);
    }));

    let guard = TerminalGuard;
    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend).context("creating terminal")?;
    Ok((guard, terminal))
}
