//! Address resolution: wire coordinates, heading paths and scoped patterns
//! down to concrete buffer locations.
//!
//! The public wire format is 1-based; the buffer is 0-based. Both conversions
//! live here, once for input ([`internal_position`]) and once for output
//! ([`external_position`]). Columns count Unicode code points and are turned
//! into byte offsets at the last moment.

use markdown_outline::{normalize_heading, Document, Section};
use regex::{Regex, RegexBuilder};

use crate::edit::{ContextPolicy, PositionSpec, RangeSpec, Scope};
use crate::engine::Position;
use crate::error::{EditFailure, ErrorCode};

const REGEX_SIZE_LIMIT: usize = 1024 * 100;

/// 0-based range with code-point columns, validated against the buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedRange {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

/// One regex occurrence located in the buffer.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedMatch {
    pub line: usize,
    pub byte_start: usize,
    pub byte_end: usize,
    pub char_start: usize,
    pub char_end: usize,
    pub text: String,
}

pub(crate) struct MatchQuery<'a> {
    pub pattern: &'a str,
    pub literal: bool,
    pub flags: &'a str,
    pub scope: &'a Scope,
    pub code_blocks: ContextPolicy,
    pub tables: ContextPolicy,
}

/// Convert a wire position to 0-based internals.
pub(crate) fn internal_position(pos: &PositionSpec) -> Result<(usize, usize), EditFailure> {
    if pos.line == 0 || pos.col == 0 {
        return Err(EditFailure::new(
            ErrorCode::OutOfRange,
            format!("position {}:{} is not 1-based", pos.line, pos.col),
        ));
    }
    Ok((pos.line - 1, pos.col - 1))
}

/// Convert 0-based internals back to a wire position.
pub(crate) fn external_position(line: usize, col: usize) -> Position {
    Position {
        line: line + 1,
        col: col + 1,
    }
}

pub(crate) fn resolve_range(
    buffer: &[String],
    range: &RangeSpec,
) -> Result<ResolvedRange, EditFailure> {
    let (start_line, start_col) = internal_position(&range.start)?;
    let (end_line, end_col) = internal_position(&range.end)?;

    if start_line >= buffer.len() {
        return Err(EditFailure::new(
            ErrorCode::OutOfRange,
            format!("start line {} out of range", range.start.line),
        )
        .at_line(range.start.line));
    }
    if end_line >= buffer.len() {
        return Err(EditFailure::new(
            ErrorCode::OutOfRange,
            format!("end line {} out of range", range.end.line),
        )
        .at_line(range.end.line));
    }
    if start_col > char_len(&buffer[start_line]) {
        return Err(EditFailure::new(
            ErrorCode::OutOfRange,
            format!("start column {} out of range", range.start.col),
        )
        .at_line(range.start.line));
    }
    if end_col > char_len(&buffer[end_line]) {
        return Err(EditFailure::new(
            ErrorCode::OutOfRange,
            format!("end column {} out of range", range.end.col),
        )
        .at_line(range.end.line));
    }
    if (start_line, start_col) > (end_line, end_col) {
        return Err(EditFailure::new(
            ErrorCode::OutOfRange,
            "range start is after range end",
        )
        .at_line(range.start.line));
    }

    Ok(ResolvedRange {
        start_line,
        start_col,
        end_line,
        end_col,
    })
}

/// Find the single section a heading path names.
///
/// A section matches on its raw path or its canonical path. With
/// `include_subsections`, strict canonical prefix extensions are collected as
/// well; resolution still requires exactly one match overall.
pub(crate) fn find_section_by_path<'d>(
    doc: &'d Document,
    path: &[String],
    include_subsections: bool,
) -> Result<&'d Section, EditFailure> {
    let canonical: Vec<String> = path.iter().map(|segment| normalize_heading(segment)).collect();

    let mut found: Vec<&Section> = Vec::new();
    for section in &doc.sections {
        if section.heading_path.as_slice() == path
            || section.canonical_heading_path == canonical
        {
            found.push(section);
            continue;
        }
        if include_subsections
            && section.canonical_heading_path.len() > canonical.len()
            && section.canonical_heading_path[..canonical.len()] == canonical[..]
        {
            found.push(section);
        }
    }

    match found.len() {
        0 => Err(EditFailure::new(
            ErrorCode::SectionNotFound,
            format!("section not found: {}", path.join(" > ")),
        )),
        1 => Ok(found[0]),
        count => Err(EditFailure::new(
            ErrorCode::AmbiguousHeading,
            format!("heading path {} matched {count} sections", path.join(" > ")),
        )),
    }
}

pub(crate) fn find_section_by_id<'d>(
    doc: &'d Document,
    id: &str,
) -> Result<&'d Section, EditFailure> {
    doc.section_by_id(id).ok_or_else(|| {
        EditFailure::new(
            ErrorCode::SectionNotFound,
            format!("section not found with id: {id}"),
        )
    })
}

/// Resolve a section target from the optional `sectionId`/`headingPath`
/// pair; the ID wins when both are present.
pub(crate) fn resolve_target<'d>(
    doc: &'d Document,
    heading_path: &Option<Vec<String>>,
    section_id: &Option<String>,
) -> Result<&'d Section, EditFailure> {
    if let Some(id) = section_id {
        return find_section_by_id(doc, id);
    }
    if let Some(path) = heading_path {
        return find_section_by_path(doc, path, false);
    }
    Err(EditFailure::new(
        ErrorCode::InvalidOperation,
        "either headingPath or sectionId must be provided",
    ))
}

/// Enumerate matches within the scope, in document order, skipping lines in
/// excluded contexts. Link and image spans are not filtered.
pub(crate) fn resolve_matches(
    doc: &Document,
    buffer: &[String],
    query: &MatchQuery<'_>,
) -> Result<Vec<ResolvedMatch>, EditFailure> {
    let regex = build_regex(query.pattern, query.literal, query.flags)?;

    let (start_line, end_line) = match query.scope {
        Scope::WholeDocument => (0, buffer.len().saturating_sub(1)),
        Scope::Section {
            heading_path,
            include_subsections,
        } => {
            let section = find_section_by_path(doc, heading_path, *include_subsections)?;
            (section.start_line, section.end_line)
        }
    };

    if end_line >= buffer.len() {
        return Err(EditFailure::new(
            ErrorCode::OutOfRange,
            format!("scope line {} no longer inside the buffer", end_line + 1),
        ));
    }

    let mut matches = Vec::new();
    for line_idx in start_line..=end_line {
        if query.code_blocks == ContextPolicy::Exclude && doc.is_in_code_block(line_idx) {
            continue;
        }
        if query.tables == ContextPolicy::Exclude && doc.is_in_table(line_idx) {
            continue;
        }

        let line = &buffer[line_idx];
        for found in regex.find_iter(line) {
            matches.push(ResolvedMatch {
                line: line_idx,
                byte_start: found.start(),
                byte_end: found.end(),
                char_start: char_len(&line[..found.start()]),
                char_end: char_len(&line[..found.end()]),
                text: found.as_str().to_string(),
            });
        }
    }

    Ok(matches)
}

fn build_regex(pattern: &str, literal: bool, flags: &str) -> Result<Regex, EditFailure> {
    let source = if literal {
        regex::escape(pattern)
    } else {
        pattern.to_string()
    };

    let mut builder = RegexBuilder::new(&source);
    builder.size_limit(REGEX_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            _ => {}
        }
    }

    builder.build().map_err(|err| {
        EditFailure::new(
            ErrorCode::InvalidRegex,
            format!("invalid regex pattern: {err}"),
        )
    })
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `chars`-th code point, or the end of the string.
pub(crate) fn byte_offset(line: &str, chars: usize) -> usize {
    line.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(line.len())
}
