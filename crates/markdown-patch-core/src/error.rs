//! The closed error-code set and the pipeline failure type.

use std::io;

use markdown_outline::{Diagnostic, LoadError};
use thiserror::Error;

/// Machine-readable error codes exposed on failure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    PreconditionFailed,
    NoMatch,
    AmbiguousMatch,
    OutOfRange,
    SectionNotFound,
    AmbiguousHeading,
    InvalidOperation,
    InvalidRegex,
    MarkdownBroken,
    ConflictingEdits,
    FormatterFailed,
    IoError,
    EncodingError,
    FrontMatterNotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::NoMatch => "NO_MATCH",
            Self::AmbiguousMatch => "AMBIGUOUS_MATCH",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::SectionNotFound => "SECTION_NOT_FOUND",
            Self::AmbiguousHeading => "AMBIGUOUS_HEADING",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::InvalidRegex => "INVALID_REGEX",
            Self::MarkdownBroken => "MARKDOWN_BROKEN",
            Self::ConflictingEdits => "CONFLICTING_EDITS",
            Self::FormatterFailed => "FORMATTER_FAILED",
            Self::IoError => "IO_ERROR",
            Self::EncodingError => "ENCODING_ERROR",
            Self::FrontMatterNotFound => "FRONT_MATTER_NOT_FOUND",
        }
    }
}

/// Failure of a whole `stat`/`validate`/`apply` call.
///
/// Per-edit failures inside a batch are accumulated as [`Diagnostic`] values
/// instead; only the hash gate, batch aborts and finalization problems
/// surface here.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("SHA-256 mismatch (file changed): expected {expected}, found {actual}")]
    Precondition { expected: String, actual: String },

    #[error("edit {index} failed")]
    ConflictingEdits {
        index: usize,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("post-edit validation failed: {0}")]
    MarkdownBroken(String),

    #[error("formatter failed: {0}")]
    Formatter(String),
}

impl PatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::IoError,
            Self::Encoding(_) => ErrorCode::EncodingError,
            Self::Precondition { .. } => ErrorCode::PreconditionFailed,
            Self::ConflictingEdits { .. } => ErrorCode::ConflictingEdits,
            Self::InvalidOperation(_) => ErrorCode::InvalidOperation,
            Self::MarkdownBroken(_) => ErrorCode::MarkdownBroken,
            Self::Formatter(_) => ErrorCode::FormatterFailed,
        }
    }

    /// Diagnostics carried by a batch abort, empty for every other variant.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::ConflictingEdits { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

impl From<LoadError> for PatchError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Io(io_err) => Self::Io(io_err),
            LoadError::Encoding(message) => Self::Encoding(message),
        }
    }
}

/// One failed edit operation, recorded as a diagnostic on the session.
#[derive(Debug, Clone)]
pub(crate) struct EditFailure {
    pub code: ErrorCode,
    pub message: String,
    pub line: Option<usize>,
}

impl EditFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            line: None,
        }
    }

    /// Attach the 1-based line the failure refers to.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        let mut diagnostic =
            Diagnostic::error(self.message, "editor").with_code(self.code.as_str());
        if let Some(line) = self.line {
            diagnostic = diagnostic.with_line(line);
        }
        diagnostic
    }
}
