//! Edit kernel: a mutable line buffer plus the five edit operations.
//!
//! The session clones the document's lines once and applies edits in the
//! submitted order. The structural index is never rebuilt between edits, so
//! addresses must be valid at batch start; edits that land on lines moved by
//! an earlier edit fail with out-of-range diagnostics.

use markdown_outline::{Diagnostic, Document, Section};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::edit::{ContextPolicy, Edit, InsertPosition, Occurrence, RangeSpec, Scope};
use crate::error::{EditFailure, ErrorCode};
use crate::resolve::{
    byte_offset, external_position, resolve_matches, resolve_range, resolve_target, MatchQuery,
    ResolvedMatch, ResolvedRange,
};

/// 1-based position in outward-facing records.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

/// Location of one regex occurrence, reported to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub line: usize,
    pub col: usize,
    pub text: String,
    pub start: Position,
    pub end: Position,
}

/// One edit session over a single document.
pub struct EditSession<'a> {
    doc: &'a Document,
    buffer: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    matches: Vec<MatchRecord>,
}

impl<'a> EditSession<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            buffer: doc.lines.clone(),
            diagnostics: Vec::new(),
            matches: Vec::new(),
        }
    }

    /// Apply one edit. Returns `true` on success; on failure the buffer is
    /// untouched and a diagnostic is recorded.
    pub fn apply(&mut self, edit: &Edit) -> bool {
        let result = match edit {
            Edit::ReplaceRange {
                range,
                replacement,
                expected_text,
            } => self.replace_range(range, replacement, expected_text.as_deref()),
            Edit::ReplaceMatch {
                pattern,
                replacement,
                literal,
                flags,
                occurrence,
                expected_matches,
                scope,
                code_blocks,
                links_and_images: _,
                tables,
            } => self.replace_match(
                pattern,
                replacement,
                *literal,
                flags,
                *occurrence,
                *expected_matches,
                scope,
                *code_blocks,
                *tables,
            ),
            Edit::ReplaceSection {
                heading_path,
                section_id,
                markdown,
                keep_subsections,
            } => self.replace_section(heading_path, section_id, markdown, *keep_subsections),
            Edit::InsertAfterHeading {
                heading_path,
                section_id,
                markdown,
                position,
                ensure_blank_line,
            } => self.insert_after_heading(
                heading_path,
                section_id,
                markdown,
                *position,
                *ensure_blank_line,
            ),
            Edit::UpdateFrontMatter { set, remove } => self.update_front_matter(set, remove),
        };

        match result {
            Ok(()) => true,
            Err(failure) => {
                self.diagnostics.push(failure.into_diagnostic());
                false
            }
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.buffer
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Diagnostic>, Vec<MatchRecord>) {
        (self.buffer, self.diagnostics, self.matches)
    }

    fn replace_range(
        &mut self,
        range: &RangeSpec,
        replacement: &str,
        expected_text: Option<&str>,
    ) -> Result<(), EditFailure> {
        let resolved = resolve_range(&self.buffer, range)?;
        let current = self.extract(&resolved);

        if let Some(expected) = expected_text {
            if expected != current {
                return Err(EditFailure::new(
                    ErrorCode::PreconditionFailed,
                    format!("expected text mismatch at line {}", range.start.line),
                )
                .at_line(range.start.line));
            }
        }

        if resolved.start_line == resolved.end_line {
            let new_line = {
                let line = &self.buffer[resolved.start_line];
                let start = byte_offset(line, resolved.start_col);
                let end = byte_offset(line, resolved.end_col);
                format!("{}{}{}", &line[..start], replacement, &line[end..])
            };
            self.buffer[resolved.start_line] = new_line;
        } else {
            let merged = {
                let head = &self.buffer[resolved.start_line];
                let tail = &self.buffer[resolved.end_line];
                format!(
                    "{}{}{}",
                    &head[..byte_offset(head, resolved.start_col)],
                    replacement,
                    &tail[byte_offset(tail, resolved.end_col)..]
                )
            };
            self.buffer
                .splice(resolved.start_line..=resolved.end_line, [merged]);
        }

        Ok(())
    }

    /// Text currently spanned by the range; multi-line spans join with `\n`
    /// regardless of the document's eol, which is reapplied only at finalize
    /// time.
    fn extract(&self, resolved: &ResolvedRange) -> String {
        if resolved.start_line == resolved.end_line {
            let line = &self.buffer[resolved.start_line];
            let start = byte_offset(line, resolved.start_col);
            let end = byte_offset(line, resolved.end_col);
            return line[start..end].to_string();
        }

        let mut parts = Vec::with_capacity(resolved.end_line - resolved.start_line + 1);
        let head = &self.buffer[resolved.start_line];
        parts.push(head[byte_offset(head, resolved.start_col)..].to_string());
        for line in &self.buffer[resolved.start_line + 1..resolved.end_line] {
            parts.push(line.clone());
        }
        let tail = &self.buffer[resolved.end_line];
        parts.push(tail[..byte_offset(tail, resolved.end_col)].to_string());
        parts.join("\n")
    }

    #[allow(clippy::too_many_arguments)]
    fn replace_match(
        &mut self,
        pattern: &str,
        replacement: &str,
        literal: bool,
        flags: &str,
        occurrence: Occurrence,
        expected_matches: Option<usize>,
        scope: &Scope,
        code_blocks: ContextPolicy,
        tables: ContextPolicy,
    ) -> Result<(), EditFailure> {
        let query = MatchQuery {
            pattern,
            literal,
            flags,
            scope,
            code_blocks,
            tables,
        };
        let found = resolve_matches(self.doc, &self.buffer, &query)?;

        if let Some(expected) = expected_matches {
            if found.len() != expected {
                return Err(if found.is_empty() {
                    EditFailure::new(
                        ErrorCode::NoMatch,
                        format!("no matches found (expected {expected})"),
                    )
                } else {
                    EditFailure::new(
                        ErrorCode::AmbiguousMatch,
                        format!("found {} matches (expected {expected})", found.len()),
                    )
                });
            }
        }

        for m in &found {
            let start = external_position(m.line, m.char_start);
            let end = external_position(m.line, m.char_end);
            self.matches.push(MatchRecord {
                line: start.line,
                col: start.col,
                text: m.text.clone(),
                start,
                end,
            });
        }

        let selected: Vec<&ResolvedMatch> = match occurrence {
            Occurrence::All => found.iter().rev().collect(),
            Occurrence::Nth(index) => {
                if index < 1 || index > found.len() {
                    return Err(EditFailure::new(
                        ErrorCode::OutOfRange,
                        format!(
                            "occurrence {index} out of range (found {} matches)",
                            found.len()
                        ),
                    ));
                }
                vec![&found[index - 1]]
            }
        };

        // Reverse document order keeps earlier byte offsets valid.
        for m in selected {
            let new_line = {
                let line = &self.buffer[m.line];
                format!(
                    "{}{}{}",
                    &line[..m.byte_start],
                    replacement,
                    &line[m.byte_end..]
                )
            };
            self.buffer[m.line] = new_line;
        }

        Ok(())
    }

    fn replace_section(
        &mut self,
        heading_path: &Option<Vec<String>>,
        section_id: &Option<String>,
        markdown: &str,
        keep_subsections: bool,
    ) -> Result<(), EditFailure> {
        let section = resolve_target(self.doc, heading_path, section_id)?;

        let content_end = if keep_subsections {
            first_subsection(self.doc, section)
                .map(|sub| sub.start_line - 1)
                .unwrap_or(section.end_line)
        } else {
            section.end_line
        };

        let new_lines: Vec<String> = markdown.split('\n').map(str::to_string).collect();
        let replaces_heading = new_lines
            .iter()
            .find(|line| !line.trim().is_empty())
            .map_or(false, |line| line.trim().starts_with('#'));

        let splice_start = if replaces_heading {
            section.heading_line
        } else {
            section.heading_line + 1
        };
        let resume = content_end + 1;

        if resume > self.buffer.len() || splice_start > resume {
            return Err(EditFailure::new(
                ErrorCode::OutOfRange,
                format!(
                    "section span {}..{} no longer inside the buffer",
                    section.heading_line + 1,
                    content_end + 1
                ),
            ));
        }

        self.buffer.splice(splice_start..resume, new_lines);
        Ok(())
    }

    fn insert_after_heading(
        &mut self,
        heading_path: &Option<Vec<String>>,
        section_id: &Option<String>,
        markdown: &str,
        position: InsertPosition,
        ensure_blank_line: bool,
    ) -> Result<(), EditFailure> {
        let section = resolve_target(self.doc, heading_path, section_id)?;

        let insert_line = match position {
            InsertPosition::AfterHeading | InsertPosition::Start => section.heading_line + 1,
            InsertPosition::End => section.end_line + 1,
        };
        if insert_line > self.buffer.len() {
            return Err(EditFailure::new(
                ErrorCode::OutOfRange,
                format!("insertion point {} outside the buffer", insert_line + 1),
            ));
        }

        let mut new_lines: Vec<String> = markdown.split('\n').map(str::to_string).collect();
        if ensure_blank_line
            && insert_line < self.buffer.len()
            && !self.buffer[insert_line].trim().is_empty()
        {
            new_lines.push(String::new());
        }

        self.buffer.splice(insert_line..insert_line, new_lines);
        Ok(())
    }

    fn update_front_matter(
        &mut self,
        set: &Mapping,
        remove: &[String],
    ) -> Result<(), EditFailure> {
        let mut data = self
            .doc
            .front_matter
            .as_ref()
            .map(|fm| fm.data.clone())
            .unwrap_or_default();

        for (key, value) in set {
            data.insert(key.clone(), value.clone());
        }
        if !remove.is_empty() {
            data = data
                .into_iter()
                .filter(|(key, _)| match key {
                    Value::String(name) => !remove.contains(name),
                    _ => true,
                })
                .collect();
        }

        let rendered = serde_yaml::to_string(&Value::Mapping(data)).map_err(|err| {
            EditFailure::new(
                ErrorCode::InvalidOperation,
                format!("front matter serialization failed: {err}"),
            )
        })?;

        let mut new_lines: Vec<String> = vec!["---".to_string()];
        new_lines.extend(
            rendered
                .trim_end_matches('\n')
                .split('\n')
                .map(str::to_string),
        );
        new_lines.push("---".to_string());

        match &self.doc.front_matter {
            Some(fm) => {
                let resume = fm.lines.1 + 1;
                if resume > self.buffer.len() {
                    return Err(EditFailure::new(
                        ErrorCode::OutOfRange,
                        "front matter span no longer inside the buffer",
                    ));
                }
                self.buffer.splice(0..resume, new_lines);
            }
            None => {
                new_lines.push(String::new());
                self.buffer.splice(0..0, new_lines);
            }
        }

        Ok(())
    }
}

/// First section in document order strictly below `section`.
fn first_subsection<'d>(doc: &'d Document, section: &Section) -> Option<&'d Section> {
    doc.sections.iter().find(|candidate| {
        candidate.heading_path.len() > section.heading_path.len()
            && candidate.heading_path[..section.heading_path.len()] == section.heading_path[..]
            && candidate.start_line > section.heading_line
    })
}
