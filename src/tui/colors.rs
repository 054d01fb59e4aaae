//! Color constants for the terminal user interface.

use ratatui::style::Color;

/// Header and status bar background.
pub const SITE_BLUE: Color = Color::Rgb(0, 60, 110);
/// Tasks moved by the last propagation.
pub const SHIFTED: Color = Color::Rgb(255, 215, 0);
/// Parents rolled up by the last propagation.
pub const ROLLED_UP: Color = Color::Rgb(0, 170, 170);
/// Open tasks past their deadline.
pub const OVERDUE: Color = Color::Rgb(200, 40, 40);
/// Confirmation dialogs.
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
