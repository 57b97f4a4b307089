//! Terminal styling helpers.

use console::Style;

use gitmerge_core::ChangeAction;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold).
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Colour for an action label, shared by plain and table output.
pub fn action_color(action: ChangeAction) -> comfy_table::Color {
    match action {
        ChangeAction::Added => comfy_table::Color::Green,
        ChangeAction::Modified => comfy_table::Color::Yellow,
        ChangeAction::Deleted => comfy_table::Color::Red,
    }
}

/// The branch marker used in `branches` output.
pub fn current_marker(is_current: bool) -> String {
    if is_current {
        Style::new().green().bold().apply_to("*").to_string()
    } else {
        " ".to_string()
    }
}
