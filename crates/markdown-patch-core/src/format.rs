//! Optional post-edit formatting through an external command.
//!
//! The command receives the document on stdin and must print the formatted
//! document to stdout, the contract of `mdformat -` and similar tools.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

/// Formatter selection for `apply` and `validate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormatMode {
    #[default]
    None,
    /// Whitespace-separated command line, e.g. `"mdformat -"`.
    Command(String),
}

impl FormatMode {
    /// Parse a user-supplied value; `"none"` and blank strings disable
    /// formatting.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == "none" {
            Self::None
        } else {
            Self::Command(trimmed.to_string())
        }
    }
}

pub(crate) fn run_formatter(command: &str, input: &str) -> Result<String, String> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        return Err("empty formatter command".to_string());
    };

    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| format!("failed to spawn '{program}': {err}"))?;

    let Some(mut stdin) = child.stdin.take() else {
        return Err("formatter stdin unavailable".to_string());
    };
    let payload = input.to_string();
    // Writing from a separate thread avoids a pipe deadlock on large inputs.
    let writer = thread::spawn(move || stdin.write_all(payload.as_bytes()));

    let output = child
        .wait_with_output()
        .map_err(|err| format!("formatter did not finish: {err}"))?;
    let _ = writer.join();

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "formatter exited with {}: {}",
            output.status,
            stderr.trim()
        ));
    }

    String::from_utf8(output.stdout)
        .map_err(|err| format!("formatter produced invalid UTF-8: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_none_and_commands() {
        assert_eq!(FormatMode::parse("none"), FormatMode::None);
        assert_eq!(FormatMode::parse("  "), FormatMode::None);
        assert_eq!(
            FormatMode::parse("mdformat -"),
            FormatMode::Command("mdformat -".to_string())
        );
    }

    #[test]
    fn pipes_content_through_command() {
        let formatted = run_formatter("cat", "hello\n").unwrap();
        assert_eq!(formatted, "hello\n");
    }

    #[test]
    fn failing_command_reports_error() {
        assert!(run_formatter("false", "hello\n").is_err());
        assert!(run_formatter("definitely-not-a-real-binary", "hello\n").is_err());
    }
}
