use crate::Keyword;

/// Parses a newline-delimited keyword source. Lines are trimmed; blank lines are dropped.
pub fn parse_keywords(raw: &str) -> Vec<Keyword> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
