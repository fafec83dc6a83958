//! Code fence balance checks.
//!
//! Lines whose trimmed form begins with three backticks or three tildes are
//! treated as alternating open/close markers per fence character; backtick
//! and tilde fences track independently.

use markdown_outline::Diagnostic;

/// Fences still open at end of input, as `(fence_char, opening_line)` with a
/// 0-based line.
pub fn scan_fences(lines: &[String]) -> Vec<(char, usize)> {
    let mut backtick: Option<usize> = None;
    let mut tilde: Option<usize> = None;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            backtick = match backtick {
                Some(_) => None,
                None => Some(idx),
            };
        } else if trimmed.starts_with("~~~") {
            tilde = match tilde {
                Some(_) => None,
                None => Some(idx),
            };
        }
    }

    let mut unclosed = Vec::new();
    if let Some(line) = backtick {
        unclosed.push(('`', line));
    }
    if let Some(line) = tilde {
        unclosed.push(('~', line));
    }
    unclosed.sort_by_key(|&(_, line)| line);
    unclosed
}

/// One error diagnostic per fence left open at end of input.
pub fn fence_diagnostics(lines: &[String]) -> Vec<Diagnostic> {
    scan_fences(lines)
        .into_iter()
        .map(|(fence_char, line)| {
            Diagnostic::error(
                format!(
                    "unclosed {0}{0}{0} fence opened at line {1}",
                    fence_char,
                    line + 1
                ),
                "validator",
            )
            .with_code("UNBALANCED_FENCE")
            .with_line(line + 1)
        })
        .collect()
}
