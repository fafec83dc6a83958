//! Unified diff rendering.

use similar::TextDiff;

/// Unified diff between the pre- and post-edit content, three lines of
/// context, `a/<name>` and `b/<name>` headers. Empty when nothing changed.
pub fn build_unified_diff(original: &str, modified: &str, name: &str) -> String {
    if original == modified {
        return String::new();
    }

    let diff = TextDiff::from_lines(original, modified);
    let header_old = format!("a/{name}");
    let header_new = format!("b/{name}");

    diff.unified_diff()
        .context_radius(3)
        .header(&header_old, &header_new)
        .to_string()
}
