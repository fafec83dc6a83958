//! Wire format for edit operations.
//!
//! Edits form a closed tagged enum, so unknown `op` values, missing required
//! fields and invalid enum values all fail at the deserialization boundary
//! and surface as `INVALID_OPERATION` before any file is touched.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use serde_yaml::Mapping;

fn default_true() -> bool {
    true
}

/// 1-based line/column pair, counted in Unicode code points.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PositionSpec {
    pub line: usize,
    pub col: usize,
}

/// Half-open range: `end` names the position after the last included
/// character.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RangeSpec {
    pub start: PositionSpec,
    pub end: PositionSpec,
}

/// Which occurrences of a match set to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    All,
    /// 1-based index into the match set.
    Nth(usize),
}

impl Default for Occurrence {
    fn default() -> Self {
        Self::All
    }
}

impl<'de> Deserialize<'de> for Occurrence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OccurrenceVisitor;

        impl<'de> Visitor<'de> for OccurrenceVisitor {
            type Value = Occurrence;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("\"all\" or a 1-based occurrence index")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Occurrence, E> {
                Ok(Occurrence::Nth(value as usize))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Occurrence, E> {
                if value < 0 {
                    return Err(E::invalid_value(de::Unexpected::Signed(value), &self));
                }
                Ok(Occurrence::Nth(value as usize))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Occurrence, E> {
                if value == "all" {
                    Ok(Occurrence::All)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(value), &self))
                }
            }
        }

        deserializer.deserialize_any(OccurrenceVisitor)
    }
}

/// Region a match set is resolved within.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    #[default]
    WholeDocument,
    #[serde(rename_all = "camelCase")]
    Section {
        heading_path: Vec<String>,
        #[serde(default)]
        include_subsections: bool,
    },
}

/// Whether a markdown context is excluded from match resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextPolicy {
    #[default]
    Exclude,
    Include,
}

/// Where `insert_after_heading` places its payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertPosition {
    #[default]
    AfterHeading,
    Start,
    End,
}

/// One declarative edit operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    #[serde(rename_all = "camelCase")]
    ReplaceRange {
        range: RangeSpec,
        replacement: String,
        #[serde(default)]
        expected_text: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ReplaceMatch {
        pattern: String,
        replacement: String,
        #[serde(default = "default_true")]
        literal: bool,
        #[serde(default)]
        flags: String,
        #[serde(default)]
        occurrence: Occurrence,
        #[serde(default)]
        expected_matches: Option<usize>,
        #[serde(default)]
        scope: Scope,
        #[serde(default)]
        code_blocks: ContextPolicy,
        #[serde(default)]
        links_and_images: ContextPolicy,
        #[serde(default)]
        tables: ContextPolicy,
    },
    #[serde(rename_all = "camelCase")]
    ReplaceSection {
        #[serde(default)]
        heading_path: Option<Vec<String>>,
        #[serde(default)]
        section_id: Option<String>,
        markdown: String,
        #[serde(default = "default_true")]
        keep_subsections: bool,
    },
    #[serde(rename_all = "camelCase")]
    InsertAfterHeading {
        #[serde(default)]
        heading_path: Option<Vec<String>>,
        #[serde(default)]
        section_id: Option<String>,
        markdown: String,
        #[serde(default)]
        position: InsertPosition,
        #[serde(default = "default_true")]
        ensure_blank_line: bool,
    },
    #[serde(rename_all = "camelCase")]
    UpdateFrontMatter {
        #[serde(default)]
        set: Mapping,
        #[serde(default)]
        remove: Vec<String>,
    },
}
