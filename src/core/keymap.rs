use super::mode::{AppMode, EditorMode, PanelId};

/// Everything the help overlay can list. Whether a binding is live is decided
/// by [`Binding::enabled`] alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    AddTask,
    EditTask,
    ToggleTask,
    DeleteTask,
    SaveTask,
    Confirm,
    Cancel,
    CreateNote,
    OpenNote,
    DeleteNote,
    SaveNote,
    ToggleEditMode,
    NavigateCalendar,
    OpenCalendar,
    OpenLink,
    CycleFocus,
    ShowHelp,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingContext {
    pub mode: AppMode,
    pub focus: PanelId,
    /// The focused panel is collecting free text (task title, note title).
    pub capturing: bool,
    pub editor_mode: EditorMode,
}

impl Binding {
    pub const ALL: [Binding; 18] = [
        Binding::AddTask,
        Binding::EditTask,
        Binding::ToggleTask,
        Binding::DeleteTask,
        Binding::SaveTask,
        Binding::Confirm,
        Binding::Cancel,
        Binding::CreateNote,
        Binding::OpenNote,
        Binding::DeleteNote,
        Binding::SaveNote,
        Binding::ToggleEditMode,
        Binding::NavigateCalendar,
        Binding::OpenCalendar,
        Binding::OpenLink,
        Binding::CycleFocus,
        Binding::ShowHelp,
        Binding::Quit,
    ];

    pub fn keys(self) -> &'static str {
        match self {
            Binding::AddTask | Binding::CreateNote => "o",
            Binding::EditTask | Binding::ToggleEditMode => "i",
            Binding::ToggleTask => "space",
            Binding::DeleteTask | Binding::DeleteNote => "ctrl+d",
            Binding::SaveTask => "enter/ctrl+s",
            Binding::Confirm | Binding::OpenCalendar => "enter",
            Binding::Cancel => "esc",
            Binding::OpenNote => "enter/e",
            Binding::SaveNote => "ctrl+s",
            Binding::NavigateCalendar => "arrows [ ] t",
            Binding::OpenLink => "ctrl+o",
            Binding::CycleFocus => "tab",
            Binding::ShowHelp => "ctrl+k",
            Binding::Quit => "ctrl+q",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Binding::AddTask => "add task",
            Binding::EditTask => "edit task",
            Binding::ToggleTask => "toggle task",
            Binding::DeleteTask => "delete task",
            Binding::SaveTask => "save task",
            Binding::Confirm => "confirm",
            Binding::Cancel => "cancel",
            Binding::CreateNote => "new note",
            Binding::OpenNote => "open note",
            Binding::DeleteNote => "delete note",
            Binding::SaveNote => "save note",
            Binding::ToggleEditMode => "edit mode",
            Binding::NavigateCalendar => "day/week/month/today",
            Binding::OpenCalendar => "open calendar",
            Binding::OpenLink => "open/authorize",
            Binding::CycleFocus => "cycle focus",
            Binding::ShowHelp => "key bindings",
            Binding::Quit => "quit",
        }
    }

    pub fn enabled(self, ctx: &BindingContext) -> bool {
        let dashboard = ctx.mode == AppMode::Dashboard;
        let idle = dashboard && !ctx.capturing;
        let editor = ctx.mode == AppMode::EditingNote;
        let confirming = ctx.mode == AppMode::ExitConfirmation;
        let setup = ctx.mode.is_setup();
        let on = |panel: PanelId| ctx.focus == panel;

        match self {
            Binding::AddTask | Binding::EditTask | Binding::ToggleTask | Binding::DeleteTask => {
                idle && on(PanelId::Tasks)
            }
            Binding::SaveTask => dashboard && ctx.capturing && on(PanelId::Tasks),
            Binding::Confirm => (dashboard && ctx.capturing) || setup || confirming,
            Binding::Cancel => {
                dashboard || editor || confirming || ctx.mode == AppMode::SetupWeather
            }
            Binding::CreateNote | Binding::OpenNote | Binding::DeleteNote => {
                idle && on(PanelId::Notes)
            }
            Binding::SaveNote => editor && ctx.editor_mode == EditorMode::Source,
            Binding::ToggleEditMode => editor && ctx.editor_mode == EditorMode::Preview,
            Binding::NavigateCalendar | Binding::OpenCalendar => idle && on(PanelId::Calendar),
            Binding::OpenLink => ctx.mode == AppMode::SetupCalendar,
            Binding::CycleFocus => idle,
            Binding::ShowHelp => dashboard,
            Binding::Quit => idle || setup || confirming,
        }
    }
}

/// Snapshot of the live bindings, recomputed on every mode or focus change.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    context: BindingContext,
    enabled: Vec<Binding>,
}

impl KeyBindings {
    pub fn compute(context: BindingContext) -> Self {
        let enabled = Binding::ALL
            .into_iter()
            .filter(|b| b.enabled(&context))
            .collect();
        Self { context, enabled }
    }

    pub fn allows(&self, binding: Binding) -> bool {
        self.enabled.contains(&binding)
    }

    /// Bindings grouped for the help overlay, disabled ones left out.
    pub fn help_groups(&self) -> Vec<Vec<Binding>> {
        let global = vec![Binding::CycleFocus, Binding::ShowHelp, Binding::Quit];
        let groups = match self.context.mode {
            AppMode::EditingNote => vec![vec![
                Binding::SaveNote,
                Binding::ToggleEditMode,
                Binding::Cancel,
            ]],
            _ => match self.context.focus {
                PanelId::Tasks => vec![
                    vec![
                        Binding::AddTask,
                        Binding::DeleteTask,
                        Binding::ToggleTask,
                        Binding::EditTask,
                        Binding::SaveTask,
                        Binding::Cancel,
                    ],
                    global,
                ],
                PanelId::Notes => vec![
                    vec![
                        Binding::CreateNote,
                        Binding::DeleteNote,
                        Binding::OpenNote,
                        Binding::Confirm,
                        Binding::Cancel,
                    ],
                    global,
                ],
                PanelId::Calendar => vec![
                    vec![Binding::NavigateCalendar, Binding::OpenCalendar],
                    global,
                ],
            },
        };
        groups
            .into_iter()
            .map(|group| group.into_iter().filter(|b| self.allows(*b)).collect())
            .filter(|group: &Vec<Binding>| !group.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Binding, BindingContext, KeyBindings};
    use crate::core::mode::{AppMode, EditorMode, PanelId};

    fn ctx(mode: AppMode, focus: PanelId, capturing: bool) -> BindingContext {
        BindingContext {
            mode,
            focus,
            capturing,
            editor_mode: EditorMode::Preview,
        }
    }

    #[test]
    fn task_bindings_follow_focus_and_capture() {
        let idle = KeyBindings::compute(ctx(AppMode::Dashboard, PanelId::Tasks, false));
        assert!(idle.allows(Binding::AddTask));
        assert!(idle.allows(Binding::CycleFocus));
        assert!(!idle.allows(Binding::SaveTask));

        let adding = KeyBindings::compute(ctx(AppMode::Dashboard, PanelId::Tasks, true));
        assert!(!adding.allows(Binding::AddTask));
        assert!(!adding.allows(Binding::CycleFocus));
        assert!(!adding.allows(Binding::Quit));
        assert!(adding.allows(Binding::SaveTask));

        let notes = KeyBindings::compute(ctx(AppMode::Dashboard, PanelId::Notes, false));
        assert!(!notes.allows(Binding::AddTask));
        assert!(notes.allows(Binding::CreateNote));
    }

    #[test]
    fn editor_only_exposes_editor_bindings() {
        let mut context = ctx(AppMode::EditingNote, PanelId::Notes, false);
        let preview = KeyBindings::compute(context);
        assert!(preview.allows(Binding::ToggleEditMode));
        assert!(!preview.allows(Binding::SaveNote));
        assert!(!preview.allows(Binding::Quit));
        assert!(!preview.allows(Binding::CycleFocus));

        context.editor_mode = EditorMode::Source;
        let source = KeyBindings::compute(context);
        assert!(source.allows(Binding::SaveNote));
        assert!(!source.allows(Binding::ToggleEditMode));
        assert_eq!(
            source.help_groups(),
            vec![vec![Binding::SaveNote, Binding::Cancel]]
        );
    }

    #[test]
    fn setup_allows_quit_and_link() {
        let setup = KeyBindings::compute(ctx(AppMode::SetupCalendar, PanelId::Tasks, false));
        assert!(setup.allows(Binding::Quit));
        assert!(setup.allows(Binding::OpenLink));
        assert!(setup.allows(Binding::Confirm));
        assert!(!setup.allows(Binding::CycleFocus));
        assert!(!setup.allows(Binding::AddTask));
    }

    #[test]
    fn help_groups_drop_disabled_bindings() {
        let calendar = KeyBindings::compute(ctx(AppMode::Dashboard, PanelId::Calendar, false));
        let groups = calendar.help_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0],
            vec![Binding::NavigateCalendar, Binding::OpenCalendar]
        );
    }
}
