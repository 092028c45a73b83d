//! Terminal colors for token classes, candidate categories and display tags.

use crossterm::style::{Color, Stylize};
use pretty_shell_core::completion::{Candidate, CandidateCategory};
use pretty_shell_core::highlight::TokenClass;

/// Color name (as used in `display_tags`) to a crossterm color.
pub fn color_from_name(name: &str) -> Option<Color> {
    Some(match name.to_lowercase().as_str() {
        "black" => Color::Black,
        "darkgrey" | "darkgray" => Color::DarkGrey,
        "red" => Color::Red,
        "darkred" => Color::DarkRed,
        "green" => Color::Green,
        "darkgreen" => Color::DarkGreen,
        "yellow" => Color::Yellow,
        "darkyellow" => Color::DarkYellow,
        "blue" => Color::Blue,
        "darkblue" => Color::DarkBlue,
        "magenta" => Color::Magenta,
        "darkmagenta" => Color::DarkMagenta,
        "cyan" => Color::Cyan,
        "darkcyan" => Color::DarkCyan,
        "white" => Color::White,
        "grey" | "gray" => Color::Grey,
        _ => return None,
    })
}

pub fn token_color(class: TokenClass) -> Color {
    match class {
        TokenClass::Command => Color::Cyan,
        TokenClass::Group => Color::Blue,
        TokenClass::Shell => Color::Magenta,
        TokenClass::Builtin => Color::DarkYellow,
        TokenClass::ExitBuiltin => Color::DarkRed,
        TokenClass::Option => Color::Yellow,
        TokenClass::Text => Color::White,
        TokenClass::Number => Color::DarkCyan,
        TokenClass::Boolean => Color::DarkGreen,
        TokenClass::Choice => Color::Green,
        TokenClass::Literal => Color::DarkMagenta,
        TokenClass::Invalid => Color::Red,
    }
}

fn category_color(category: CandidateCategory) -> Color {
    match category {
        CandidateCategory::Command => Color::Cyan,
        CandidateCategory::Group => Color::Blue,
        CandidateCategory::Option => Color::Yellow,
        CandidateCategory::ArgumentPlaceholder => Color::DarkGrey,
        CandidateCategory::ChoiceValue => Color::Green,
        CandidateCategory::BooleanValue => Color::DarkGreen,
        CandidateCategory::TupleBracket => Color::DarkMagenta,
    }
}

/// The label shown in the completion list, colored by display tag when the
/// candidate has a known one and by category otherwise.
pub fn candidate_label(candidate: &Candidate, color: bool) -> String {
    let mut label = candidate.display_label.clone();
    if let Some(help) = &candidate.help_text {
        label = format!("{label}  {help}");
    }
    if !color {
        return label;
    }

    let tint = candidate
        .display_tag
        .as_deref()
        .and_then(color_from_name)
        .unwrap_or_else(|| category_color(candidate.category));
    label.with(tint).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_names() {
        assert_eq!(color_from_name("Red"), Some(Color::Red));
        assert_eq!(color_from_name("darkgray"), Some(Color::DarkGrey));
        assert_eq!(color_from_name("chartreuse"), None);
    }

    #[test]
    fn test_invalid_tokens_are_red() {
        assert_eq!(token_color(TokenClass::Invalid), Color::Red);
    }
}
