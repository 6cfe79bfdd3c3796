use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::Command;

/// How the receiver of a key treats unmapped keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputContext {
    /// Lists, calendar grid, editor preview.
    Navigation,
    /// Single-line capture. Unmapped keys go to the text field.
    TextEntry,
    /// Multi-line editing. Enter belongs to the text, so only save and
    /// cancel are commands.
    Editor,
    Confirmation,
}

fn ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char(k) if k.eq_ignore_ascii_case(&c))
}

pub fn map_key_event(key: KeyEvent, context: InputContext) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if ctrl(&key, 'q') {
        return Some(Command::Quit);
    }
    if ctrl(&key, 's') {
        return Some(Command::Save);
    }
    if key.code == KeyCode::Esc {
        return Some(Command::Cancel);
    }

    match context {
        InputContext::Editor => None,
        InputContext::TextEntry => map_text_entry(key),
        InputContext::Confirmation => map_confirmation(key),
        InputContext::Navigation => map_navigation(key),
    }
}

fn map_text_entry(key: KeyEvent) -> Option<Command> {
    if ctrl(&key, 'o') {
        return Some(Command::OpenLink);
    }
    if ctrl(&key, 'k') {
        return Some(Command::ToggleHelp);
    }
    match key.code {
        KeyCode::Enter => Some(Command::Confirm),
        KeyCode::Tab => Some(Command::CycleFocus),
        KeyCode::BackTab => Some(Command::CycleFocusBack),
        _ => None,
    }
}

fn map_confirmation(key: KeyEvent) -> Option<Command> {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('y') => Some(Command::ChooseYes),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('n') => Some(Command::ChooseNo),
        KeyCode::Enter => Some(Command::Confirm),
        _ => None,
    }
}

fn map_navigation(key: KeyEvent) -> Option<Command> {
    if ctrl(&key, 'd') {
        return Some(Command::Delete);
    }
    if ctrl(&key, 'o') {
        return Some(Command::OpenLink);
    }
    if ctrl(&key, 'k') {
        return Some(Command::ToggleHelp);
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) || key.modifiers.contains(KeyModifiers::ALT)
    {
        return None;
    }

    match key.code {
        KeyCode::Tab => Some(Command::CycleFocus),
        KeyCode::BackTab => Some(Command::CycleFocusBack),
        KeyCode::Enter => Some(Command::Confirm),
        KeyCode::Up | KeyCode::Char('k') => Some(Command::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Command::MoveDown),
        KeyCode::Left => Some(Command::MoveLeft),
        KeyCode::Right => Some(Command::MoveRight),
        KeyCode::PageUp => Some(Command::PageUp),
        KeyCode::PageDown => Some(Command::PageDown),
        KeyCode::Char('o') => Some(Command::Add),
        KeyCode::Char('i') => Some(Command::Edit),
        KeyCode::Char('e') => Some(Command::Open),
        KeyCode::Char(' ') => Some(Command::Toggle),
        KeyCode::Char('[') => Some(Command::PrevMonth),
        KeyCode::Char(']') => Some(Command::NextMonth),
        KeyCode::Char('t') => Some(Command::Today),
        _ => None,
    }
}
