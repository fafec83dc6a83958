use serde::Serialize;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single diagnostic produced while parsing, validating or editing.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<String>,
    pub message: String,
    pub line: Option<usize>,
    pub col: Option<usize>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, source: &str) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            line: None,
            col: None,
            source: Some(source.to_string()),
        }
    }

    pub fn error(message: impl Into<String>, source: &str) -> Self {
        Self::new(Severity::Error, message, source)
    }

    pub fn warning(message: impl Into<String>, source: &str) -> Self {
        Self::new(Severity::Warning, message, source)
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    /// Attach a 1-based line number.
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}
