//! YAML front matter extraction.

use serde_yaml::{Mapping, Value};

use crate::diagnostics::Diagnostic;

/// Closing delimiter search stops after this many lines to avoid pathological
/// scans on malformed files.
const SCAN_LIMIT: usize = 50;

/// Front matter block at the very top of a document.
#[derive(Debug, Clone)]
pub struct FrontMatter {
    /// Parsed key/value pairs, in source order.
    pub data: Mapping,
    /// Inclusive line span covering both `---` delimiter lines.
    pub lines: (usize, usize),
}

pub(crate) fn extract(lines: &[String], warnings: &mut Vec<Diagnostic>) -> Option<FrontMatter> {
    let first = lines.first()?;
    if first.trim_end_matches('\r') != "---" {
        return None;
    }

    let limit = lines.len().min(SCAN_LIMIT);
    for idx in 1..limit {
        if lines[idx].trim() != "---" {
            continue;
        }

        let body = lines[1..idx].join("\n");
        return match serde_yaml::from_str::<Value>(&body) {
            Ok(Value::Mapping(data)) => Some(FrontMatter {
                data,
                lines: (0, idx),
            }),
            Ok(Value::Null) => Some(FrontMatter {
                data: Mapping::new(),
                lines: (0, idx),
            }),
            Ok(_) => {
                warnings.push(Diagnostic::warning(
                    "front matter is not a key/value mapping; ignoring it",
                    "parser",
                ));
                None
            }
            Err(err) => {
                warnings.push(Diagnostic::warning(
                    format!("malformed front matter: {err}"),
                    "parser",
                ));
                None
            }
        };
    }

    None
}
