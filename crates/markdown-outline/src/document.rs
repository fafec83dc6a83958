//! Document loader: bytes on disk to a decoded, line-split, structurally
//! indexed view.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::front_matter::{self, FrontMatter};
use crate::structure::{self, CodeBlock, Section, TableInfo};

const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Source encoding, preserved across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Encoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "utf-8-sig")]
    Utf8Bom,
    #[serde(rename = "latin-1")]
    Latin1,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Bom => "utf-8-sig",
            Self::Latin1 => "latin-1",
        }
    }
}

/// Line-ending style, preserved across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Eol {
    #[serde(rename = "LF")]
    Lf,
    #[serde(rename = "CRLF")]
    CrLf,
}

impl Eol {
    pub fn sequence(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// In-memory representation of one Markdown file plus its derived structure.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub encoding: Encoding,
    pub eol: Eol,
    /// Decoded content, BOM stripped, original line terminators intact.
    pub content: String,
    /// Lines without terminators. A trailing terminator yields a final empty
    /// entry, so joining with `eol` reproduces `content` exactly.
    pub lines: Vec<String>,
    /// Hex SHA-256 of the raw bytes as they live on disk.
    pub sha256: String,
    pub sections: Vec<Section>,
    pub code_blocks: Vec<CodeBlock>,
    pub tables: Vec<TableInfo>,
    pub front_matter: Option<FrontMatter>,
    /// Non-fatal findings from the load, e.g. malformed front matter.
    pub warnings: Vec<Diagnostic>,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let raw = fs::read(path)?;
        Self::from_bytes(path, &raw)
    }

    pub fn from_bytes(path: &Path, raw: &[u8]) -> Result<Self, LoadError> {
        let (encoding, content) = decode(raw)?;
        let eol = if content.contains("\r\n") {
            Eol::CrLf
        } else {
            Eol::Lf
        };
        let lines: Vec<String> = content
            .split(eol.sequence())
            .map(str::to_string)
            .collect();

        let mut warnings = Vec::new();
        let front_matter = front_matter::extract(&lines, &mut warnings);
        let index = structure::index(&content, &lines, front_matter.as_ref());

        Ok(Self {
            path: path.to_path_buf(),
            encoding,
            eol,
            content,
            lines,
            sha256: sha256_hex(raw),
            sections: index.sections,
            code_blocks: index.code_blocks,
            tables: index.tables,
            front_matter,
            warnings,
        })
    }

    /// True when `line` (0-based) sits inside a fenced code block, fence
    /// lines included.
    pub fn is_in_code_block(&self, line: usize) -> bool {
        self.code_blocks
            .iter()
            .any(|block| block.start_line <= line && line < block.end_line)
    }

    /// True when `line` (0-based) sits inside a table span.
    pub fn is_in_table(&self, line: usize) -> bool {
        self.tables
            .iter()
            .any(|table| table.start_line <= line && line < table.end_line)
    }

    pub fn section_by_id(&self, id: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.section_id == id)
    }
}

/// Hex SHA-256 digest of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn decode(raw: &[u8]) -> Result<(Encoding, String), LoadError> {
    if let Some(rest) = raw.strip_prefix(BOM) {
        let text = std::str::from_utf8(rest).map_err(|err| {
            LoadError::Encoding(format!("invalid UTF-8 after byte order mark: {err}"))
        })?;
        return Ok((Encoding::Utf8Bom, text.to_string()));
    }

    match std::str::from_utf8(raw) {
        Ok(text) => Ok((Encoding::Utf8, text.to_string())),
        Err(_) => Ok((Encoding::Latin1, raw.iter().map(|&b| b as char).collect())),
    }
}
