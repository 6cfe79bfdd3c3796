/// Top-level application mode. Modes other than `Dashboard` take all input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Dashboard,
    EditingNote,
    SetupWeather,
    SetupCalendar,
    ExitConfirmation,
}

impl AppMode {
    pub fn is_setup(self) -> bool {
        matches!(self, AppMode::SetupWeather | AppMode::SetupCalendar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Preview,
    Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelId {
    Tasks,
    Notes,
    Calendar,
}

impl PanelId {
    pub const ORDER: [PanelId; 3] = [PanelId::Tasks, PanelId::Notes, PanelId::Calendar];

    pub fn next(self) -> Self {
        let idx = Self::ORDER.iter().position(|p| *p == self).unwrap_or(0);
        Self::ORDER[(idx + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ORDER.iter().position(|p| *p == self).unwrap_or(0);
        Self::ORDER[(idx + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn title(self) -> &'static str {
        match self {
            PanelId::Tasks => "To-Do List",
            PanelId::Notes => "Notes",
            PanelId::Calendar => "Calendar",
        }
    }
}
