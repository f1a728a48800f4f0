//! Integration build history, stored on work items as `v1 | v2 | v3`.

const SEPARATOR: &str = " | ";

/// Appends `version` to `history`.
///
/// Returns `None` when the history already mentions the version, so callers
/// can skip the update entirely.
pub fn merge(history: &str, version: &str) -> Option<String> {
    let history = history.trim();
    if history.is_empty() {
        Some(version.to_string())
    } else if history.contains(version) {
        None
    } else {
        Some(format!("{history}{SEPARATOR}{version}"))
    }
}

/// Splits a `|`-joined history into trimmed, non-empty entries.
pub fn split(history: &str) -> Vec<String> {
    split_on(history, '|')
}

/// Splits `;`-joined work item tags into trimmed, non-empty entries.
pub fn split_tags(tags: &str) -> Vec<String> {
    split_on(tags, ';')
}

fn split_on(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}
