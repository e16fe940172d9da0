//! Enumerations for board state management.

use crate::fields::QuadrantType;
use crate::tui::input::InputField;

/// What keystrokes currently act on.
#[derive(Clone, Debug)]
pub enum BoardMode {
    /// Navigating the grid.
    Normal,
    /// Typing the name of a new task for the given quadrant.
    AddTask(QuadrantType, InputField),
    /// Waiting for 1-4 to pick a move target for the selected task.
    Move,
    /// Navigating the suggestion bar.
    Suggestions,
    /// Full record of the task with this id.
    Detail(String),
    Help,
}
