mod calendar;
mod notes;
mod todo;

use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};

use crate::core::PanelId;

pub use calendar::{CalendarAction, CalendarPanel, CalendarState, FetchFailure, WeatherState};
pub use notes::{NotesOutcome, NotesPanel, NotesState};
pub use todo::{TodoPanel, TodoState};

pub const MIN_WIDTH: u16 = 100;
pub const MIN_HEIGHT: u16 = 30;

/// Pane geometry of the dashboard. Rendering and mouse hit-testing both
/// read it, so a click always lands on the pane that was drawn there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardLayout {
    pub header: Rect,
    pub tasks: Rect,
    pub calendar: Rect,
    pub notes: Rect,
    pub status: Rect,
}

impl DashboardLayout {
    pub fn compute(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Ratio(3, 7), Constraint::Ratio(4, 7)])
            .split(columns[0]);

        Self {
            header: rows[0],
            tasks: left[0],
            calendar: left[1],
            notes: columns[1],
            status: rows[2],
        }
    }

    pub fn pane(&self, panel: PanelId) -> Rect {
        match panel {
            PanelId::Tasks => self.tasks,
            PanelId::Notes => self.notes,
            PanelId::Calendar => self.calendar,
        }
    }

    pub fn panel_at(&self, column: u16, row: u16) -> Option<PanelId> {
        let pos = Position::new(column, row);
        PanelId::ORDER
            .into_iter()
            .find(|panel| self.pane(*panel).contains(pos))
    }
}

pub fn is_too_small(area: Rect) -> bool {
    area.width < MIN_WIDTH || area.height < MIN_HEIGHT
}

/// Owns dashboard focus. Focus never moves while the focused panel is
/// capturing text.
#[derive(Debug, Clone, Copy)]
pub struct FocusRouter {
    focus: PanelId,
}

impl Default for FocusRouter {
    fn default() -> Self {
        Self {
            focus: PanelId::Tasks,
        }
    }
}

impl FocusRouter {
    pub fn focus(&self) -> PanelId {
        self.focus
    }

    /// Returns whether focus moved.
    pub fn cycle(&mut self, forward: bool, capturing: bool) -> bool {
        if capturing {
            return false;
        }
        self.focus = if forward {
            self.focus.next()
        } else {
            self.focus.prev()
        };
        true
    }

    /// Focuses the pane under a left click. Returns whether focus moved.
    pub fn click(
        &mut self,
        layout: &DashboardLayout,
        column: u16,
        row: u16,
        capturing: bool,
    ) -> bool {
        if capturing {
            return false;
        }
        match layout.panel_at(column, row) {
            Some(panel) if panel != self.focus => {
                self.focus = panel;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::layout::Rect;

    use super::{DashboardLayout, FocusRouter, is_too_small};
    use crate::core::PanelId;

    #[test]
    fn tab_cycles_unless_capturing() {
        let mut router = FocusRouter::default();
        assert!(router.cycle(true, false));
        assert_eq!(router.focus(), PanelId::Notes);
        assert!(!router.cycle(true, true));
        assert_eq!(router.focus(), PanelId::Notes);
        assert!(router.cycle(false, false));
        assert!(router.cycle(false, false));
        assert_eq!(router.focus(), PanelId::Calendar);
    }

    #[test]
    fn layout_splits_columns_and_left_rows() {
        let layout = DashboardLayout::compute(Rect::new(0, 0, 120, 40));
        assert_eq!(layout.header.height, 1);
        assert_eq!(layout.status.y, 39);
        assert_eq!(layout.tasks.x, 0);
        assert_eq!(layout.notes.x, 60);
        assert_eq!(layout.tasks.width + layout.notes.width, 120);
        assert_eq!(layout.calendar.y, layout.tasks.y + layout.tasks.height);
        assert!(layout.tasks.height < layout.calendar.height);
        assert_eq!(layout.notes.height, layout.tasks.height + layout.calendar.height);
    }

    #[test]
    fn clicks_resolve_to_panes() {
        let layout = DashboardLayout::compute(Rect::new(0, 0, 120, 40));
        assert_eq!(layout.panel_at(5, 3), Some(PanelId::Tasks));
        assert_eq!(layout.panel_at(5, 35), Some(PanelId::Calendar));
        assert_eq!(layout.panel_at(100, 3), Some(PanelId::Notes));
        assert_eq!(layout.panel_at(5, 0), None);

        let mut router = FocusRouter::default();
        assert!(router.click(&layout, 100, 20, false));
        assert_eq!(router.focus(), PanelId::Notes);
        assert!(!router.click(&layout, 5, 35, true));
        assert_eq!(router.focus(), PanelId::Notes);
    }

    #[test]
    fn small_terminals_are_flagged() {
        assert!(is_too_small(Rect::new(0, 0, 80, 24)));
        assert!(!is_too_small(Rect::new(0, 0, 120, 40)));
    }
}
