//! Structural index derived from a single CommonMark + GFM tokenizer pass.
//!
//! Byte offsets reported by the tokenizer are mapped to 0-based line indices
//! through a precomputed line-start table. Sections are emitted by a
//! level-keyed heading stack and then sorted into document order.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use serde::Serialize;

use crate::front_matter::FrontMatter;
use crate::heading::{atx_text, normalize_heading, section_id};

/// One heading and the content it dominates.
///
/// `start_line` and `end_line` are 0-based and inclusive; `end_line` is one
/// less than the next sibling-or-ancestor heading's line, or the last line of
/// the document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub heading_path: Vec<String>,
    pub canonical_heading_path: Vec<String>,
    pub section_id: String,
    pub level: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub heading_line: usize,
}

/// Fenced code block span. `end_line` is exclusive.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    pub start_line: usize,
    pub end_line: usize,
    pub language: Option<String>,
    pub info_string: String,
}

/// GFM table span. `end_line` is exclusive; `section` is the heading path of
/// the innermost enclosing section.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub start_line: usize,
    pub end_line: usize,
    pub section: Option<Vec<String>>,
}

pub(crate) struct StructureIndex {
    pub sections: Vec<Section>,
    pub code_blocks: Vec<CodeBlock>,
    pub tables: Vec<TableInfo>,
}

struct RawHeading {
    level: usize,
    text: String,
    line: usize,
}

pub(crate) fn index(
    content: &str,
    lines: &[String],
    front_matter: Option<&FrontMatter>,
) -> StructureIndex {
    let starts = line_starts(content);
    let line_of = |offset: usize| starts.partition_point(|&start| start <= offset) - 1;
    let skip_until = front_matter.map(|fm| fm.lines.1);

    let mut headings: Vec<RawHeading> = Vec::new();
    let mut code_blocks: Vec<CodeBlock> = Vec::new();
    let mut tables: Vec<TableInfo> = Vec::new();

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);

    for (event, range) in Parser::new_ext(content, options).into_offset_iter() {
        let Event::Start(tag) = event else { continue };
        if range.end <= range.start {
            continue;
        }

        let start_line = line_of(range.start);
        if skip_until.map_or(false, |until| start_line <= until) {
            continue;
        }
        let last_line = line_of(range.end - 1);

        match tag {
            Tag::Heading(level, _, _) => {
                headings.push(RawHeading {
                    level: level as usize,
                    text: heading_text(lines, start_line, last_line),
                    line: start_line,
                });
            }
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                let info_string = info.to_string();
                let language = info_string.split_whitespace().next().map(str::to_string);
                code_blocks.push(CodeBlock {
                    start_line,
                    end_line: last_line + 1,
                    language,
                    info_string,
                });
            }
            Tag::Table(_) => {
                tables.push(TableInfo {
                    start_line,
                    end_line: last_line + 1,
                    section: None,
                });
            }
            _ => {}
        }
    }

    let sections = build_sections(&headings, lines.len());
    for table in &mut tables {
        table.section =
            enclosing_section(&sections, table.start_line).map(|s| s.heading_path.clone());
    }

    StructureIndex {
        sections,
        code_blocks,
        tables,
    }
}

fn line_starts(content: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

/// Raw heading text. ATX headings get their marker runs stripped; setext
/// headings keep the content line(s) above the underline. Block quote
/// markers are dropped so quoted headings address like plain ones.
fn heading_text(lines: &[String], start_line: usize, last_line: usize) -> String {
    let first = lines.get(start_line).map(String::as_str).unwrap_or("");
    let unquoted = strip_quote_markers(first);
    if unquoted.starts_with('#') {
        return atx_text(unquoted);
    }

    let last_content = last_line.saturating_sub(1).max(start_line);
    let parts: Vec<&str> = lines
        .iter()
        .take(last_content + 1)
        .skip(start_line)
        .map(|line| strip_quote_markers(line).trim_end())
        .collect();
    parts.join("\n").trim().to_string()
}

fn strip_quote_markers(line: &str) -> &str {
    let mut rest = line.trim_start();
    while let Some(stripped) = rest.strip_prefix('>') {
        rest = stripped.trim_start();
    }
    rest
}

fn build_sections(headings: &[RawHeading], line_count: usize) -> Vec<Section> {
    let mut stack: Vec<&RawHeading> = Vec::new();
    let mut sections = Vec::new();

    for heading in headings {
        while stack.last().map_or(false, |top| top.level >= heading.level) {
            let Some(closed) = stack.pop() else { break };
            emit_section(&mut sections, &stack, closed, heading.line - 1);
        }
        stack.push(heading);
    }

    let last_line = line_count.saturating_sub(1);
    while let Some(closed) = stack.pop() {
        emit_section(&mut sections, &stack, closed, last_line);
    }

    sections.sort_by_key(|section| section.heading_line);
    sections
}

fn emit_section(
    sections: &mut Vec<Section>,
    ancestors: &[&RawHeading],
    closed: &RawHeading,
    end_line: usize,
) {
    let mut heading_path: Vec<String> =
        ancestors.iter().map(|entry| entry.text.clone()).collect();
    heading_path.push(closed.text.clone());
    let canonical_heading_path = heading_path
        .iter()
        .map(|segment| normalize_heading(segment))
        .collect();
    let id = section_id(&heading_path, closed.line);

    sections.push(Section {
        heading_path,
        canonical_heading_path,
        section_id: id,
        level: closed.level,
        start_line: closed.line,
        end_line,
        heading_line: closed.line,
    });
}

fn enclosing_section(sections: &[Section], line: usize) -> Option<&Section> {
    sections
        .iter()
        .filter(|section| section.start_line <= line && line <= section.end_line)
        .max_by_key(|section| section.level)
}
