//! Heading text helpers: raw ATX extraction, canonical form and stable
//! section identifiers.

use sha2::{Digest, Sha256};

/// Canonical form of a heading for path matching.
///
/// Keeps letters, digits, whitespace and hyphens (Unicode-aware), which also
/// drops inline-code backticks and the emphasis characters `*`, `_` and `~`.
/// Whitespace runs collapse to a single space and the result is lowercased.
/// The transformation is idempotent.
pub fn normalize_heading(input: &str) -> String {
    let kept: String = input
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || *ch == '-')
        .collect();

    let mut collapsed = String::with_capacity(kept.len());
    for (idx, word) in kept.split_whitespace().enumerate() {
        if idx > 0 {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }

    collapsed.to_lowercase()
}

/// Stable 16-hex-char identifier for a section.
///
/// Derived from the raw heading path joined with `/` plus the 0-based heading
/// line, so the ID survives content edits that do not move the heading.
pub fn section_id(heading_path: &[String], heading_line: usize) -> String {
    let input = format!("{}:{}", heading_path.join("/"), heading_line);
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(16);
    hex
}

/// Raw text of an ATX heading line: leading `#` markers, surrounding
/// whitespace and an optional closing hash run stripped, inline markup kept.
pub(crate) fn atx_text(line: &str) -> String {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&ch| ch == '#').count();
    let mut content = trimmed[hashes..].trim();

    let stripped = content.trim_end_matches('#');
    if stripped.len() < content.len() {
        let candidate = &content[..stripped.len()];
        if candidate.is_empty() || candidate.ends_with(char::is_whitespace) {
            content = candidate.trim_end();
        }
    }

    content.to_string()
}
