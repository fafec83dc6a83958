//! Structural model of a Markdown document.
//!
//! The [`Document`] loader reads a file, detects its encoding and line-ending
//! style, and derives a line-indexed view of the document's structure: the
//! section tree (flattened into document order), fenced code blocks, GFM
//! tables and YAML front matter. The index is read-only; editing layers clone
//! the line buffer and keep this crate's output as their address space.

mod diagnostics;
mod document;
mod front_matter;
mod heading;
mod structure;

pub use diagnostics::{Diagnostic, Severity};
pub use document::{sha256_hex, Document, Encoding, Eol, LoadError};
pub use front_matter::FrontMatter;
pub use heading::{normalize_heading, section_id};
pub use structure::{CodeBlock, Section, TableInfo};
