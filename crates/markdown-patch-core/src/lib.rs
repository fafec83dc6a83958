//! Deterministic, structure-aware Markdown editing.
//!
//! A batch of declarative edit operations is applied to one file behind a
//! SHA-256 precondition: the caller states which file version the edits
//! target, and nothing is written unless the file still hashes to that value.
//! Logical addresses (heading paths, section IDs, scoped regex matches,
//! explicit ranges) resolve against the structural index built by
//! [`markdown_outline`], edits mutate a cloned line buffer, and the finalizer
//! re-encodes with the original encoding and line-ending style.

pub mod api;
pub mod diff;
pub mod edit;
pub mod engine;
pub mod error;
pub mod fence;
mod finalize;
pub mod format;
pub mod fs;
mod resolve;

pub use api::{
    apply, stat, validate, ApplyOptions, ApplyReport, StatReport, ValidateOptions, ValidateReport,
};
pub use edit::{ContextPolicy, Edit, InsertPosition, Occurrence, PositionSpec, RangeSpec, Scope};
pub use engine::{EditSession, MatchRecord, Position};
pub use error::{ErrorCode, PatchError};
pub use format::FormatMode;
pub use markdown_outline::{
    sha256_hex, CodeBlock, Diagnostic, Document, Encoding, Eol, FrontMatter, Section, Severity,
    TableInfo,
};
