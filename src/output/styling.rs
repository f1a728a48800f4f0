use std::fmt::Display;

use console::{style, StyledObject};

type Styled = StyledObject<String>;

/// Section title preceded by its icon, e.g. `📋 Overview`.
pub fn heading(icon: &str, title: &str) -> String {
    format!(
        "{} {}",
        style(icon).bright(),
        style(title).bright().underlined()
    )
}

/// Work in progress or planned changes
pub fn pending(text: impl Display) -> Styled {
    style(text.to_string()).bright().yellow()
}

pub fn done(text: impl Display) -> Styled {
    style(text.to_string()).bright().green()
}

pub fn failed(text: impl Display) -> Styled {
    style(text.to_string()).bright().red()
}

/// Identifiers and values pulled from Azure DevOps
pub fn value(text: impl Display) -> Styled {
    style(text.to_string()).cyan()
}

pub fn muted(text: impl Display) -> Styled {
    style(text.to_string()).dim()
}

pub fn brand(text: impl Display) -> Styled {
    style(text.to_string()).magenta().bold()
}
