//! Highlight line convention.
//!
//! A lookup response may open with a single machine-readable line such as
//! `DESTAQUE: The square was founded in 1560.` followed by a blank line and
//! the narrative body. The line is lifted out and stripped from the body.

/// Sentinel label the context prompt asks the model to use.
pub const DEFAULT_HIGHLIGHT_PREFIX: &str = "DESTAQUE:";

/// Decoration the model sometimes wraps around the sentinel line.
const DECORATION: &[char] = &['*', '"', '“', '”', '_', '#', ' '];

/// Split `text` into `(highlight, body)`.
///
/// The first line whose undecorated start matches `prefix` becomes the
/// highlight (an empty fact yields `None` but the line is still stripped).
/// One blank line after it is consumed too. Without a match the body is the
/// original text, trimmed.
pub fn extract_highlight(text: &str, prefix: &str) -> (Option<String>, String) {
    if prefix.is_empty() {
        return (None, text.trim().to_string());
    }

    let lines: Vec<&str> = text.lines().collect();
    let Some(idx) = lines
        .iter()
        .position(|line| line.trim_start_matches(DECORATION).starts_with(prefix))
    else {
        return (None, text.trim().to_string());
    };

    let fact = lines[idx]
        .trim_start_matches(DECORATION)
        .strip_prefix(prefix)
        .unwrap_or_default()
        .trim_matches(DECORATION)
        .trim();
    let highlight = (!fact.is_empty()).then(|| fact.to_string());

    let mut skip_to = idx + 1;
    if lines.get(skip_to).is_some_and(|l| l.trim().is_empty()) {
        skip_to += 1;
    }

    let body = lines[..idx]
        .iter()
        .chain(lines[skip_to..].iter())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");

    (highlight, body.trim().to_string())
}
