use std::path::PathBuf;

use chrono::{Datelike, Months, NaiveDate};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{NoteEditor, SetupState};
use crate::calendar::AuthFlow;
use crate::core::{
    AppMode, ConfirmChoice, EditorMode, KeyBindings, ListItem, PanelId, visible_window,
};
use crate::panels::{
    CalendarPanel, CalendarState, DashboardLayout, MIN_HEIGHT, MIN_WIDTH, NotesPanel, NotesState,
    TodoPanel, TodoState, WeatherState, is_too_small,
};

const ACCENT: Color = Color::Cyan;
const DIM: Style = Style::new().fg(Color::DarkGray);

pub struct UiModel<'a> {
    pub mode: AppMode,
    pub focus: PanelId,
    pub todo: &'a TodoPanel,
    pub notes: &'a NotesPanel,
    pub calendar: &'a CalendarPanel,
    pub editor: Option<&'a NoteEditor>,
    pub confirm_choice: ConfirmChoice,
    pub setup: &'a SetupState,
    pub credentials_path: PathBuf,
    pub bindings: &'a KeyBindings,
    pub show_help: bool,
    pub status: Option<&'a str>,
    pub hint: String,
    pub fatal: Option<&'a str>,
}

pub fn draw(frame: &mut Frame<'_>, model: UiModel<'_>) {
    let area = frame.area();
    if let Some(message) = model.fatal {
        draw_fatal(frame, area, message);
        return;
    }
    if is_too_small(area) {
        draw_too_small(frame, area);
        return;
    }
    match model.mode {
        AppMode::Dashboard => draw_dashboard(frame, area, &model),
        AppMode::EditingNote => draw_editor(frame, area, &model),
        AppMode::ExitConfirmation => {
            draw_editor(frame, area, &model);
            draw_exit_dialog(frame, area, model.confirm_choice);
        }
        AppMode::SetupWeather => draw_weather_setup(frame, area, model.setup),
        AppMode::SetupCalendar => draw_calendar_setup(frame, area, &model),
    }
}

fn draw_dashboard(frame: &mut Frame<'_>, area: Rect, model: &UiModel<'_>) {
    let layout = DashboardLayout::compute(area);
    draw_header(frame, layout.header, model);
    draw_tasks(frame, layout.tasks, model);
    draw_calendar(frame, layout.calendar, model);
    draw_notes(frame, layout.notes, model);
    draw_status(frame, layout.status, model.status, &model.hint);
    if model.show_help {
        draw_help(frame, area, model.bindings);
    }
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, model: &UiModel<'_>) {
    let today = model.calendar.now().format("%A, %d %B %Y").to_string();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " dashdeck ",
            Style::default().fg(Color::Black).bg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::raw(today),
    ]));
    frame.render_widget(header, area);
}

fn draw_status(frame: &mut Frame<'_>, area: Rect, status: Option<&str>, hint: &str) {
    let mut spans = Vec::new();
    if let Some(message) = status {
        spans.push(Span::styled(
            format!(" {message} "),
            Style::default().fg(Color::Black).bg(Color::Green),
        ));
    }
    spans.push(Span::styled(format!(" {hint}"), DIM));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border)
}

/// Splits off a three-line text field at the bottom of `area` when `capturing`.
fn with_input_row(area: Rect, capturing: bool) -> (Rect, Option<Rect>) {
    if !capturing {
        return (area, None);
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(area);
    (chunks[0], Some(chunks[1]))
}

fn draw_tasks(frame: &mut Frame<'_>, area: Rect, model: &UiModel<'_>) {
    let focused = model.focus == PanelId::Tasks;
    let todo = model.todo;
    let done = todo.tasks().iter().filter(|t| t.done).count();
    let block = pane_block(
        format!(" {} ({done}/{}) ", PanelId::Tasks.title(), todo.tasks().len()),
        focused,
    );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (list_area, input_area) = with_input_row(inner, todo.is_capturing());
    draw_list(frame, list_area, todo.tasks(), todo.selected(), focused);
    if let Some(input_area) = input_area {
        let title = match todo.state() {
            TodoState::Editing => "Edit task",
            TodoState::Adding | TodoState::Default => "New task",
        };
        let mut input = todo.input().clone();
        input.set_block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(&input, input_area);
    }
}

fn draw_notes(frame: &mut Frame<'_>, area: Rect, model: &UiModel<'_>) {
    let focused = model.focus == PanelId::Notes;
    let notes = model.notes;
    let block = pane_block(format!(" {} ", PanelId::Notes.title()), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let capturing = notes.state() == NotesState::Create;
    let (list_area, input_area) = with_input_row(inner, capturing);
    draw_list(frame, list_area, notes.notes(), notes.selected(), focused);
    if let Some(input_area) = input_area {
        let mut input = notes.input().clone();
        input.set_block(Block::default().title("Note title").borders(Borders::ALL));
        frame.render_widget(&input, input_area);
    }
}

fn draw_list<T: ListItem>(
    frame: &mut Frame<'_>,
    area: Rect,
    items: &[T],
    selected: Option<usize>,
    focused: bool,
) {
    if items.is_empty() {
        frame.render_widget(Paragraph::new("Nothing here yet. Press o to add.").style(DIM), area);
        return;
    }
    let width = area.width as usize;
    let window = visible_window(items.len(), selected.unwrap_or(0), area.height as usize);
    let lines: Vec<Line<'_>> = window
        .map(|idx| {
            let text = truncate(&items[idx].display_text(), width);
            let style = match (Some(idx) == selected, focused) {
                (true, true) => Style::default().add_modifier(Modifier::REVERSED),
                (true, false) => Style::default().add_modifier(Modifier::BOLD),
                _ => Style::default(),
            };
            Line::styled(text, style)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_calendar(frame: &mut Frame<'_>, area: Rect, model: &UiModel<'_>) {
    let focused = model.focus == PanelId::Calendar;
    let calendar = model.calendar;
    let title = match calendar.state() {
        CalendarState::Ready => format!(" {} ", PanelId::Calendar.title()),
        CalendarState::Idle => format!(" {} (syncing) ", PanelId::Calendar.title()),
        CalendarState::Failed(_) => format!(" {} (error) ", PanelId::Calendar.title()),
    };
    let block = pane_block(title, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(1)])
        .split(inner);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(0)])
        .split(rows[0]);

    let today = calendar.now().date_naive();
    let grid = month_grid_lines(calendar.selected(), today, &calendar.busy_days());
    frame.render_widget(Paragraph::new(grid), top[0]);
    frame.render_widget(Paragraph::new(clock_and_weather(calendar)), top[1]);
    frame.render_widget(
        Paragraph::new(day_event_lines(calendar)).wrap(Wrap { trim: false }),
        rows[1],
    );
}

fn month_grid_lines(selected: NaiveDate, today: NaiveDate, busy: &[u32]) -> Vec<Line<'static>> {
    let first = selected.with_day(1).unwrap_or(selected);
    let offset = first.weekday().num_days_from_monday() as usize;
    let days = days_in_month(first);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("{:^21}", first.format("%B %Y").to_string()),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::styled("Mo Tu We Th Fr Sa Su", DIM),
    ];
    let mut week: Vec<Span<'static>> = vec![Span::raw("   "); offset];
    let mut column = offset;
    for day in 1..=days {
        let mut style = Style::default();
        if busy.contains(&day) {
            style = style.fg(ACCENT).add_modifier(Modifier::BOLD);
        }
        if first.with_day(day) == Some(today) {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if day == selected.day() {
            style = style.add_modifier(Modifier::REVERSED);
        }
        week.push(Span::styled(format!("{day:>2}"), style));
        week.push(Span::raw(" "));
        column += 1;
        if column == 7 {
            lines.push(Line::from(std::mem::take(&mut week)));
            column = 0;
        }
    }
    if !week.is_empty() {
        lines.push(Line::from(week));
    }
    lines
}

fn days_in_month(first: NaiveDate) -> u32 {
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| u32::try_from((next - first).num_days()).ok())
        .unwrap_or(31)
}

fn clock_and_weather(calendar: &CalendarPanel) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        calendar.now().format("%H:%M:%S").to_string(),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))];
    match calendar.weather() {
        WeatherState::Loading => {
            lines.push(Line::from(format!("{} Fetching weather", calendar.spinner())));
        }
        WeatherState::Unavailable => {
            lines.push(Line::styled(
                format!("Weather unavailable ({})", calendar.location()),
                DIM,
            ));
        }
        WeatherState::Ready(weather) => {
            lines.push(Line::from(format!("{}  {:.0}°C", weather.name, weather.temp_c)));
            lines.push(Line::styled(weather.description.clone(), DIM));
            lines.extend(
                weather
                    .kind
                    .art()
                    .iter()
                    .map(|row| Line::styled(*row, Style::default().fg(Color::Yellow))),
            );
        }
    }
    lines
}

fn day_event_lines(calendar: &CalendarPanel) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        calendar.selected().format("%A %d %B").to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    if calendar.is_loading() {
        let text = if calendar.is_fetching() {
            format!("{} Loading events", calendar.spinner())
        } else {
            format!("{} Waiting to fetch events", calendar.spinner())
        };
        lines.push(Line::styled(text, DIM));
        return lines;
    }
    if calendar.day_events().is_empty() {
        lines.push(Line::styled("No events", DIM));
        return lines;
    }
    for event in calendar.day_events() {
        let time = if event.is_all_day() {
            "all day".to_string()
        } else {
            event
                .start_time()
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{time:>7}  "), Style::default().fg(ACCENT)),
            Span::raw(event.summary.clone()),
        ]));
    }
    lines
}

fn draw_help(frame: &mut Frame<'_>, area: Rect, bindings: &KeyBindings) {
    let rect = centered_rect(50, 60, area);
    frame.render_widget(Clear, rect);
    let mut lines = Vec::new();
    for (idx, group) in bindings.help_groups().iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(""));
        }
        for binding in group {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{:>14}", binding.keys()),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::raw(binding.description()),
            ]));
        }
    }
    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(" Key bindings (ctrl+k to close) ")
            .borders(Borders::ALL),
    );
    frame.render_widget(widget, rect);
}

fn draw_editor(frame: &mut Frame<'_>, area: Rect, model: &UiModel<'_>) {
    let Some(editor) = model.editor else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let dirty = if editor.is_dirty() { " *" } else { "" };
    let (label, hint) = match editor.mode() {
        EditorMode::Preview => ("PREVIEW", "i edit | arrows scroll | esc back"),
        EditorMode::Source => ("EDIT", "ctrl+s save | esc preview"),
    };
    let block = Block::default()
        .title(format!(" {}{dirty} [{label}] ", editor.note().title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    match editor.mode() {
        EditorMode::Preview => {
            let widget = Paragraph::new(preview_lines(&editor.content()))
                .block(block)
                .wrap(Wrap { trim: false })
                .scroll((editor.scroll(), 0));
            frame.render_widget(widget, chunks[0]);
        }
        EditorMode::Source => {
            let mut textarea = editor.textarea().clone();
            textarea.set_block(block);
            frame.render_widget(&textarea, chunks[0]);
        }
    }
    draw_status(frame, chunks[1], model.status, hint);
}

/// Raw markdown with headings picked out.
fn preview_lines(content: &str) -> Vec<Line<'static>> {
    content
        .split('\n')
        .map(|line| {
            let level = line.chars().take_while(|c| *c == '#').count();
            if level > 0 && line[level..].starts_with(' ') {
                let style = if level == 1 {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                } else {
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
                };
                Line::styled(line.to_string(), style)
            } else {
                Line::from(line.to_string())
            }
        })
        .collect()
}

fn draw_exit_dialog(frame: &mut Frame<'_>, area: Rect, choice: ConfirmChoice) {
    let rect = centered_rect(40, 25, area);
    frame.render_widget(Clear, rect);
    let button = |label: &'static str, active: bool| {
        let style = if active {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else {
            Style::default()
        };
        Span::styled(label, style)
    };
    let text = vec![
        Line::from("You have unsaved changes."),
        Line::from("Discard them?"),
        Line::from(""),
        Line::from(vec![
            button(" Yes ", choice == ConfirmChoice::Yes),
            Span::raw("    "),
            button(" No ", choice == ConfirmChoice::No),
        ]),
    ];
    let widget = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .title(" Unsaved changes ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(widget, rect);
}

fn draw_weather_setup(frame: &mut Frame<'_>, area: Rect, setup: &SetupState) {
    let rect = centered_rect(60, 40, area);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .title(" Welcome to dashdeck ")
        .borders(Borders::ALL);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(inner);
    frame.render_widget(
        Paragraph::new("Which city should the weather readout use?").wrap(Wrap { trim: true }),
        chunks[0],
    );
    let mut input = setup.input.clone();
    input.set_block(Block::default().title("City").borders(Borders::ALL));
    frame.render_widget(&input, chunks[1]);
    frame.render_widget(
        Paragraph::new("enter confirm | esc keep default | ctrl+q quit").style(DIM),
        chunks[2],
    );
}

fn draw_calendar_setup(frame: &mut Frame<'_>, area: Rect, model: &UiModel<'_>) {
    let setup = model.setup;
    let rect = centered_rect(80, 70, area);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .title(" Connect Google Calendar ")
        .borders(Borders::ALL);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let manual = setup.session.as_ref().is_some_and(|s| s.is_manual());
    let (body_area, input_area) = with_input_row(inner, manual);

    let mut lines = Vec::new();
    match &setup.session {
        Some(session) => {
            let how = match session.flow() {
                AuthFlow::Automatic { port } => format!(
                    "Press ctrl+o to open the Google sign-in page. dashdeck is waiting for the redirect on port {port}."
                ),
                AuthFlow::Manual => "Press ctrl+o to open the Google sign-in page, then paste the code you are given below and press enter.".to_string(),
            };
            lines.push(Line::from(how));
            lines.push(Line::from(""));
            lines.push(Line::styled("Authorization link:", DIM));
            lines.push(Line::from(session.auth_url().to_string()));
        }
        None => {
            lines.push(Line::from(format!(
                "Place your OAuth client file at {}",
                model.credentials_path.display()
            )));
            lines.push(Line::from("then press ctrl+o to start signing in."));
        }
    }
    if let Some(notice) = &setup.notice {
        lines.push(Line::from(""));
        lines.push(Line::styled(notice.clone(), Style::default().fg(Color::Yellow)));
    }
    if let Some(error) = &setup.error {
        lines.push(Line::from(""));
        lines.push(Line::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        ));
    }
    lines.push(Line::from(""));
    lines.push(Line::styled("ctrl+o open link | ctrl+q quit", DIM));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), body_area);

    if let Some(input_area) = input_area {
        let mut input = setup.input.clone();
        input.set_block(Block::default().title("Authorization code").borders(Borders::ALL));
        frame.render_widget(&input, input_area);
    }
}

fn draw_fatal(frame: &mut Frame<'_>, area: Rect, message: &str) {
    let rect = centered_rect(70, 40, area);
    frame.render_widget(Clear, rect);
    let text = vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::styled("Press any key to exit.", DIM),
    ];
    let widget = Paragraph::new(text).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" Calendar error ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );
    frame.render_widget(widget, rect);
}

fn draw_too_small(frame: &mut Frame<'_>, area: Rect) {
    let text = vec![
        Line::from("Terminal too small"),
        Line::from(format!(
            "need {MIN_WIDTH}x{MIN_HEIGHT}, have {}x{}",
            area.width, area.height
        )),
    ];
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}

/// Cuts `text` to `max` display columns, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if UnicodeWidthStr::width(text) <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(c);
    }
    if max > 0 {
        out.push('…');
    }
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
