//! Enumerations for TUI state management.

/// Screen shown by the schedule board.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    Board,
    Detail,
    Dashboard,
    Help,
    Confirm,
}

/// Action waiting for a yes/no answer.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PendingAction {
    Sweep,
    QuitUnsaved,
}

impl PendingAction {
    pub fn prompt(self) -> &'static str {
        match self {
            PendingAction::Sweep => "close every open task whose deadline has passed",
            PendingAction::QuitUnsaved => "quit without saving your changes",
        }
    }
}
