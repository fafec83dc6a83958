//! Public entry points: `stat`, `validate` and `apply`.

use std::path::Path;

use markdown_outline::{
    sha256_hex, CodeBlock, Diagnostic, Document, Encoding, Eol, Section, TableInfo,
};
use serde::Serialize;

use crate::diff::build_unified_diff;
use crate::edit::Edit;
use crate::engine::{EditSession, MatchRecord};
use crate::error::PatchError;
use crate::fence::{fence_diagnostics, scan_fences};
use crate::finalize::encode;
use crate::format::{run_formatter, FormatMode};
use crate::fs::write_atomic;

/// Structural description of a file. Line numbers are 0-based and act as
/// opaque addresses for subsequent `apply` calls.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatReport {
    pub ok: bool,
    pub file_path: String,
    pub content_sha256: String,
    pub encoding: Encoding,
    pub eol: Eol,
    pub line_count: usize,
    pub sections: Vec<Section>,
    pub code_blocks: Vec<CodeBlock>,
    pub tables: Vec<TableInfo>,
    pub front_matter: Option<serde_json::Value>,
    pub has_front_matter: bool,
}

pub fn stat(path: &Path) -> Result<StatReport, PatchError> {
    let doc = Document::load(path)?;
    let front_matter = doc
        .front_matter
        .as_ref()
        .and_then(|fm| serde_json::to_value(&fm.data).ok());

    Ok(StatReport {
        ok: true,
        file_path: doc.path.display().to_string(),
        content_sha256: doc.sha256.clone(),
        encoding: doc.encoding,
        eol: doc.eol,
        line_count: doc.lines.len(),
        sections: doc.sections.clone(),
        code_blocks: doc.code_blocks.clone(),
        tables: doc.tables.clone(),
        has_front_matter: doc.front_matter.is_some(),
        front_matter,
    })
}

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub autofix_preview: bool,
    pub format: FormatMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReport {
    pub ok: bool,
    pub file_path: String,
    pub content_sha256: String,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_format_changes: Option<bool>,
}

pub fn validate(path: &Path, options: &ValidateOptions) -> Result<ValidateReport, PatchError> {
    let doc = Document::load(path)?;

    let mut diagnostics = doc.warnings.clone();
    diagnostics.extend(fence_diagnostics(&doc.lines));

    let mut report = ValidateReport {
        ok: true,
        file_path: doc.path.display().to_string(),
        content_sha256: doc.sha256.clone(),
        diagnostics,
        formatted_preview: None,
        has_format_changes: None,
    };

    if options.autofix_preview {
        if let FormatMode::Command(command) = &options.format {
            let formatted =
                run_formatter(command, &doc.content).map_err(PatchError::Formatter)?;
            if formatted != doc.content {
                report.formatted_preview = Some(formatted);
                report.has_format_changes = Some(true);
            } else {
                report.has_format_changes = Some(false);
            }
        }
    }

    Ok(report)
}

/// Settings for one `apply` call.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub base_sha256: String,
    pub edits: Vec<Edit>,
    pub atomic: bool,
    pub dry_run: bool,
    pub format: FormatMode,
    pub preserve_eol: bool,
    pub preserve_encoding: bool,
    pub ensure_final_newline: bool,
}

impl ApplyOptions {
    pub fn new(base_sha256: impl Into<String>, edits: Vec<Edit>) -> Self {
        Self {
            base_sha256: base_sha256.into(),
            edits,
            atomic: true,
            dry_run: false,
            format: FormatMode::None,
            preserve_eol: true,
            preserve_encoding: true,
            ensure_final_newline: true,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub ok: bool,
    pub file_path: String,
    /// SHA-256 of the finalized bytes, whether or not they were written.
    pub content_sha256: String,
    pub diff: String,
    pub edits_applied: usize,
    pub dry_run: bool,
    pub matches: Vec<MatchRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Apply a batch of edits gated on the file's current hash.
///
/// The pipeline is pure up to the final write: load, hash gate, per-edit
/// application, fence sanity, optional formatting, final-newline policy,
/// re-encode, hash, diff, write. With `dry_run` the write is skipped and the
/// report carries the would-be hash and diff.
pub fn apply(path: &Path, options: ApplyOptions) -> Result<ApplyReport, PatchError> {
    let doc = Document::load(path)?;

    if doc.sha256 != options.base_sha256 {
        return Err(PatchError::Precondition {
            expected: options.base_sha256,
            actual: doc.sha256,
        });
    }

    let fences_before = scan_fences(&doc.lines).len();

    let mut session = EditSession::new(&doc);
    let mut edits_applied = 0usize;
    for (index, edit) in options.edits.iter().enumerate() {
        if session.apply(edit) {
            edits_applied += 1;
        } else if options.atomic {
            let (_, diagnostics, _) = session.into_parts();
            return Err(PatchError::ConflictingEdits { index, diagnostics });
        }
    }
    let (buffer, mut diagnostics, matches) = session.into_parts();

    let unclosed_after = scan_fences(&buffer);
    if unclosed_after.len() > fences_before {
        let message = format!("edits left {} code fence(s) unclosed", unclosed_after.len());
        if options.atomic {
            return Err(PatchError::MarkdownBroken(message));
        }
        diagnostics.push(Diagnostic::warning(message, "validator").with_code("UNBALANCED_FENCE"));
    }

    let eol = if options.preserve_eol { doc.eol } else { Eol::Lf };
    let mut new_content = buffer.join(eol.sequence());

    if let FormatMode::Command(command) = &options.format {
        match run_formatter(command, &new_content) {
            Ok(formatted) => new_content = formatted,
            Err(message) => {
                if options.atomic {
                    return Err(PatchError::Formatter(message));
                }
                diagnostics.push(
                    Diagnostic::warning(format!("formatter failed: {message}"), "formatter"),
                );
            }
        }
    }

    if options.ensure_final_newline && !new_content.ends_with('\n') {
        new_content.push_str(eol.sequence());
    }

    let encoding = if options.preserve_encoding {
        doc.encoding
    } else {
        Encoding::Utf8
    };
    let bytes = encode(&new_content, encoding)?;
    let content_sha256 = sha256_hex(&bytes);

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let diff = build_unified_diff(&doc.content, &new_content, &name);

    if !options.dry_run {
        write_atomic(path, &bytes)?;
    }

    Ok(ApplyReport {
        ok: true,
        file_path: doc.path.display().to_string(),
        content_sha256,
        diff,
        edits_applied,
        dry_run: options.dry_run,
        matches,
        diagnostics,
    })
}
