#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleHelp,
    CycleFocus,
    CycleFocusBack,
    Confirm,
    Cancel,
    Save,
    Add,
    Edit,
    Open,
    Toggle,
    Delete,
    OpenLink,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PageUp,
    PageDown,
    PrevMonth,
    NextMonth,
    Today,
    ChooseYes,
    ChooseNo,
}
