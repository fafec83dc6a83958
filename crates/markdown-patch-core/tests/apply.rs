use std::fs;
use std::path::{Path, PathBuf};

use markdown_patch_core::{
    apply, sha256_hex, stat, validate, ApplyOptions, Edit, ErrorCode, FormatMode, PatchError,
    ValidateOptions,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::{tempdir, TempDir};

fn write_fixture(initial: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.md");
    fs::write(&path, initial).unwrap();
    (dir, path)
}

fn sha_of(path: &Path) -> String {
    sha256_hex(&fs::read(path).unwrap())
}

fn edits(value: serde_json::Value) -> Vec<Edit> {
    serde_json::from_value(value).unwrap()
}

fn options(path: &Path, edits: Vec<Edit>) -> ApplyOptions {
    ApplyOptions::new(sha_of(path), edits)
}

#[test]
fn precondition_mismatch_leaves_file_untouched() {
    let (_dir, path) = write_fixture(b"# A\nhi\n");
    let before = fs::read(&path).unwrap();

    let opts = ApplyOptions::new(
        "0".repeat(64),
        edits(json!([{
            "op": "replace_match", "pattern": "hi", "replacement": "bye"
        }])),
    );
    let err = apply(&path, opts).unwrap_err();

    assert_eq!(err.code(), ErrorCode::PreconditionFailed);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn replace_section_preserves_heading_and_subsections() {
    let (_dir, path) = write_fixture(b"# Intro\nold\n## Sub\nx\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_section", "headingPath": ["Intro"], "markdown": "new body"
        }])),
    );
    let report = apply(&path, opts).unwrap();

    assert_eq!(report.edits_applied, 1);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "# Intro\nnew body\n## Sub\nx\n"
    );
}

#[test]
fn replace_section_accepts_a_new_heading() {
    let (_dir, path) = write_fixture(b"# Intro\nold\n## Sub\nx\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_section",
            "headingPath": ["Intro"],
            "markdown": "# Introduction\nnew body"
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "# Introduction\nnew body\n## Sub\nx\n"
    );
}

#[test]
fn replace_section_without_keeping_subsections() {
    let (_dir, path) = write_fixture(b"# Intro\nold\n## Sub\nx\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_section",
            "headingPath": ["Intro"],
            "markdown": "new body",
            "keepSubsections": false
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "# Intro\nnew body\n");
}

#[test]
fn replace_match_skips_code_blocks() {
    let (_dir, path) = write_fixture(b"foo\n```\nfoo\n```\nfoo\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match",
            "pattern": "foo",
            "replacement": "bar",
            "codeBlocks": "exclude"
        }])),
    );
    let report = apply(&path, opts).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "bar\n```\nfoo\n```\nbar\n"
    );
    let hits: Vec<(usize, usize)> = report.matches.iter().map(|m| (m.line, m.col)).collect();
    assert_eq!(hits, vec![(1, 1), (5, 1)]);
}

#[test]
fn replace_match_can_include_code_blocks() {
    let (_dir, path) = write_fixture(b"foo\n```\nfoo\n```\nfoo\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match",
            "pattern": "foo",
            "replacement": "bar",
            "codeBlocks": "include"
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "bar\n```\nbar\n```\nbar\n"
    );
}

#[test]
fn ambiguous_heading_aborts_the_batch() {
    let (_dir, path) = write_fixture(b"# A\n## B\n# A\n## B\n");
    let before = fs::read(&path).unwrap();
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_section", "headingPath": ["A", "B"], "markdown": "x"
        }])),
    );
    let err = apply(&path, opts).unwrap_err();

    assert_eq!(err.code(), ErrorCode::ConflictingEdits);
    let codes: Vec<&str> = err
        .diagnostics()
        .iter()
        .filter_map(|d| d.code.as_deref())
        .collect();
    assert_eq!(codes, vec!["AMBIGUOUS_HEADING"]);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn front_matter_upsert_preserves_key_order() {
    let (_dir, path) = write_fixture(b"---\ntitle: old\n---\nbody\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "update_front_matter",
            "set": {"title": "new", "tags": ["a", "b"]},
            "remove": []
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "---\ntitle: new\ntags:\n- a\n- b\n---\nbody\n"
    );
}

#[test]
fn front_matter_is_created_when_absent() {
    let (_dir, path) = write_fixture(b"body\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "update_front_matter", "set": {"title": "x"}
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "---\ntitle: x\n---\n\nbody\n"
    );
}

#[test]
fn front_matter_keys_can_be_removed() {
    let (_dir, path) = write_fixture(b"---\na: 1\nb: 2\n---\nbody\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "update_front_matter", "set": {}, "remove": ["a"]
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "---\nb: 2\n---\nbody\n");
}

#[test]
fn empty_edit_list_is_identity() {
    let (_dir, path) = write_fixture(b"# A\nhi\n");
    let base = sha_of(&path);
    let report = apply(&path, ApplyOptions::new(base.clone(), Vec::new())).unwrap();

    assert_eq!(report.content_sha256, base);
    assert_eq!(report.diff, "");
    assert_eq!(sha_of(&path), base);
}

#[test]
fn final_newline_is_added_when_missing() {
    let (_dir, path) = write_fixture(b"# A\nhi");
    let opts = options(&path, Vec::new());
    apply(&path, opts).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "# A\nhi\n");
}

#[test]
fn atomic_batch_rolls_back_on_any_failure() {
    let (_dir, path) = write_fixture(b"# A\nhello\n");
    let before = fs::read(&path).unwrap();
    let opts = options(
        &path,
        edits(json!([
            {"op": "replace_match", "pattern": "hello", "replacement": "goodbye"},
            {"op": "replace_section", "headingPath": ["Missing"], "markdown": "x"}
        ])),
    );
    let err = apply(&path, opts).unwrap_err();

    let PatchError::ConflictingEdits { index, .. } = &err else {
        panic!("expected batch abort, got {err:?}");
    };
    assert_eq!(*index, 1);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn non_atomic_mode_applies_survivors() {
    let (_dir, path) = write_fixture(b"# A\nhello\n");
    let mut opts = options(
        &path,
        edits(json!([
            {"op": "replace_section", "headingPath": ["Missing"], "markdown": "x"},
            {"op": "replace_match", "pattern": "hello", "replacement": "goodbye"}
        ])),
    );
    opts.atomic = false;
    let report = apply(&path, opts).unwrap();

    assert_eq!(report.edits_applied, 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(
        report.diagnostics[0].code.as_deref(),
        Some("SECTION_NOT_FOUND")
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), "# A\ngoodbye\n");
}

#[test]
fn dry_run_reports_the_same_hash_without_writing() {
    let (_dir, path) = write_fixture(b"# A\nhello\n");
    let base = sha_of(&path);
    let edit_list = json!([
        {"op": "replace_match", "pattern": "hello", "replacement": "goodbye"}
    ]);

    let mut dry = options(&path, edits(edit_list.clone()));
    dry.dry_run = true;
    let dry_report = apply(&path, dry).unwrap();
    assert!(dry_report.dry_run);
    assert_eq!(sha_of(&path), base);
    assert!(dry_report.diff.contains("-hello"));
    assert!(dry_report.diff.contains("+goodbye"));

    let wet_report = apply(&path, options(&path, edits(edit_list))).unwrap();
    assert_eq!(wet_report.content_sha256, dry_report.content_sha256);
    assert_eq!(sha_of(&path), dry_report.content_sha256);
}

#[test]
fn crlf_documents_keep_their_line_endings() {
    let (_dir, path) = write_fixture(b"# A\r\nold\r\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match", "pattern": "old", "replacement": "new"
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"# A\r\nnew\r\n");
}

#[test]
fn bom_documents_keep_their_bom() {
    let (_dir, path) = write_fixture(b"\xef\xbb\xbf# A\nold\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match", "pattern": "old", "replacement": "new"
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"\xef\xbb\xbf# A\nnew\n");
}

#[test]
fn latin1_documents_round_trip() {
    let (_dir, path) = write_fixture(b"caf\xe9 old\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match", "pattern": "old", "replacement": "n\u{e9}"
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"caf\xe9 n\xe9\n");
}

#[test]
fn latin1_unencodable_replacement_fails() {
    let (_dir, path) = write_fixture(b"caf\xe9 old\n");
    let before = fs::read(&path).unwrap();
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match", "pattern": "old", "replacement": "\u{2603}"
        }])),
    );
    let err = apply(&path, opts).unwrap_err();

    assert_eq!(err.code(), ErrorCode::EncodingError);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn occurrence_selects_a_single_match() {
    let (_dir, path) = write_fixture(b"foo foo\nfoo\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match", "pattern": "foo", "replacement": "bar", "occurrence": 2
        }])),
    );
    let report = apply(&path, opts).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "foo bar\nfoo\n");
    assert_eq!(report.matches.len(), 3);
}

#[test]
fn occurrence_out_of_range_fails() {
    let (_dir, path) = write_fixture(b"foo\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match", "pattern": "foo", "replacement": "bar", "occurrence": 5
        }])),
    );
    let err = apply(&path, opts).unwrap_err();

    assert_eq!(err.code(), ErrorCode::ConflictingEdits);
    assert_eq!(err.diagnostics()[0].code.as_deref(), Some("OUT_OF_RANGE"));
}

#[test]
fn expected_matches_zero_found_reports_no_match() {
    let (_dir, path) = write_fixture(b"foo\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match",
            "pattern": "zzz",
            "replacement": "bar",
            "expectedMatches": 1
        }])),
    );
    let err = apply(&path, opts).unwrap_err();
    assert_eq!(err.diagnostics()[0].code.as_deref(), Some("NO_MATCH"));
}

#[test]
fn expected_matches_wrong_count_reports_ambiguous_match() {
    let (_dir, path) = write_fixture(b"foo foo\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match",
            "pattern": "foo",
            "replacement": "bar",
            "expectedMatches": 1
        }])),
    );
    let err = apply(&path, opts).unwrap_err();
    assert_eq!(
        err.diagnostics()[0].code.as_deref(),
        Some("AMBIGUOUS_MATCH")
    );
}

#[test]
fn invalid_pattern_reports_invalid_regex() {
    let (_dir, path) = write_fixture(b"foo\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match",
            "pattern": "(",
            "replacement": "bar",
            "literal": false
        }])),
    );
    let err = apply(&path, opts).unwrap_err();
    assert_eq!(err.diagnostics()[0].code.as_deref(), Some("INVALID_REGEX"));
}

#[test]
fn case_insensitive_flag_widens_the_match_set() {
    let (_dir, path) = write_fixture(b"Foo foo FOO\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match", "pattern": "foo", "replacement": "bar", "flags": "i"
        }])),
    );
    let report = apply(&path, opts).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "bar bar bar\n");
    assert_eq!(report.matches.len(), 3);
}

#[test]
fn replace_match_scoped_to_one_section() {
    let (_dir, path) = write_fixture(b"# One\nfoo\n# Two\nfoo\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match",
            "pattern": "foo",
            "replacement": "bar",
            "scope": {"kind": "section", "headingPath": ["One"]}
        }])),
    );
    let report = apply(&path, opts).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "# One\nbar\n# Two\nfoo\n");
    assert_eq!(report.matches.len(), 1);
    assert_eq!(report.matches[0].line, 2);
}

#[test]
fn replace_match_skips_table_lines() {
    let (_dir, path) = write_fixture(b"foo\n\n| foo |\n|-----|\n| foo |\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match", "pattern": "foo", "replacement": "bar"
        }])),
    );
    let report = apply(&path, opts).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "bar\n\n| foo |\n|-----|\n| foo |\n"
    );
    assert_eq!(report.matches.len(), 1);
}

#[test]
fn replace_range_with_expected_text() {
    let (_dir, path) = write_fixture(b"# T\nhello world\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_range",
            "range": {"start": {"line": 2, "col": 7}, "end": {"line": 2, "col": 12}},
            "replacement": "there",
            "expectedText": "world"
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "# T\nhello there\n");
}

#[test]
fn replace_range_expected_text_mismatch_fails() {
    let (_dir, path) = write_fixture(b"# T\nhello world\n");
    let before = fs::read(&path).unwrap();
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_range",
            "range": {"start": {"line": 2, "col": 7}, "end": {"line": 2, "col": 12}},
            "replacement": "there",
            "expectedText": "globe"
        }])),
    );
    let err = apply(&path, opts).unwrap_err();

    assert_eq!(
        err.diagnostics()[0].code.as_deref(),
        Some("PRECONDITION_FAILED")
    );
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn replace_range_spans_multiple_lines() {
    let (_dir, path) = write_fixture(b"a\nb\nc\nd\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_range",
            "range": {"start": {"line": 1, "col": 1}, "end": {"line": 3, "col": 1}},
            "replacement": "X",
            "expectedText": "a\nb\n"
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "Xc\nd\n");
}

#[test]
fn replace_range_counts_columns_in_code_points() {
    let (_dir, path) = write_fixture("héllo wörld\n".as_bytes());
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_range",
            "range": {"start": {"line": 1, "col": 7}, "end": {"line": 1, "col": 12}},
            "replacement": "there",
            "expectedText": "wörld"
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "héllo there\n");
}

#[test]
fn replace_range_out_of_bounds_fails() {
    let (_dir, path) = write_fixture(b"one\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_range",
            "range": {"start": {"line": 9, "col": 1}, "end": {"line": 9, "col": 2}},
            "replacement": "x"
        }])),
    );
    let err = apply(&path, opts).unwrap_err();
    assert_eq!(err.diagnostics()[0].code.as_deref(), Some("OUT_OF_RANGE"));
}

#[test]
fn insert_after_heading_adds_blank_separator() {
    let (_dir, path) = write_fixture(b"# A\nbody\n# B\nx\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "insert_after_heading", "headingPath": ["A"], "markdown": "new"
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "# A\nnew\n\nbody\n# B\nx\n"
    );
}

#[test]
fn insert_at_section_end() {
    let (_dir, path) = write_fixture(b"# A\nbody\n# B\nx\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "insert_after_heading",
            "headingPath": ["A"],
            "markdown": "added",
            "position": "end"
        }])),
    );
    apply(&path, opts).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "# A\nbody\nadded\n\n# B\nx\n"
    );
}

#[test]
fn insert_resolves_section_ids() {
    let (_dir, path) = write_fixture(b"# A\nbody\n");
    let report = stat(&path).unwrap();
    let id = report.sections[0].section_id.clone();

    let opts = options(
        &path,
        edits(json!([{
            "op": "insert_after_heading", "sectionId": id, "markdown": "new"
        }])),
    );
    apply(&path, opts).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "# A\nnew\n\nbody\n");
}

#[test]
fn missing_target_is_an_invalid_operation() {
    let (_dir, path) = write_fixture(b"# A\nbody\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "insert_after_heading", "markdown": "new"
        }])),
    );
    let err = apply(&path, opts).unwrap_err();
    assert_eq!(
        err.diagnostics()[0].code.as_deref(),
        Some("INVALID_OPERATION")
    );
}

#[test]
fn edit_that_breaks_fences_aborts_atomically() {
    let (_dir, path) = write_fixture(b"# A\ntext\n");
    let before = fs::read(&path).unwrap();
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match", "pattern": "text", "replacement": "```"
        }])),
    );
    let err = apply(&path, opts).unwrap_err();

    assert_eq!(err.code(), ErrorCode::MarkdownBroken);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn section_scope_with_subsections_included_is_ambiguous() {
    let (_dir, path) = write_fixture(b"# A\nfoo\n## B\nfoo\n");
    let opts = options(
        &path,
        edits(json!([{
            "op": "replace_match",
            "pattern": "foo",
            "replacement": "bar",
            "scope": {"kind": "section", "headingPath": ["A"], "includeSubsections": true}
        }])),
    );
    let err = apply(&path, opts).unwrap_err();
    assert_eq!(
        err.diagnostics()[0].code.as_deref(),
        Some("AMBIGUOUS_HEADING")
    );
}

#[test]
fn stat_reports_zero_based_structure() {
    let (_dir, path) = write_fixture(b"---\ntitle: t\n---\n# A\nbody\n## B\nx\n");
    let report = stat(&path).unwrap();

    assert!(report.ok);
    assert_eq!(report.line_count, 8);
    assert_eq!(report.sections.len(), 2);
    assert_eq!(report.sections[0].heading_line, 3);
    assert_eq!(report.sections[1].heading_path, vec!["A", "B"]);
    assert!(report.has_front_matter);
    let front = report.front_matter.unwrap();
    assert_eq!(front["title"], json!("t"));
    assert_eq!(report.content_sha256, sha_of(&path));
}

#[test]
fn validate_flags_unbalanced_fences() {
    let (_dir, path) = write_fixture(b"# A\n```\ncode\n");
    let report = validate(&path, &ValidateOptions::default()).unwrap();

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(
        report.diagnostics[0].code.as_deref(),
        Some("UNBALANCED_FENCE")
    );
    assert_eq!(report.diagnostics[0].line, Some(2));
}

#[test]
fn validate_produces_format_preview() {
    let (_dir, path) = write_fixture(b"hello\n");
    let options = ValidateOptions {
        autofix_preview: true,
        format: FormatMode::Command("tr a-z A-Z".to_string()),
    };
    let report = validate(&path, &options).unwrap();

    assert_eq!(report.has_format_changes, Some(true));
    assert_eq!(report.formatted_preview.as_deref(), Some("HELLO\n"));
}

#[test]
fn validate_reports_no_changes_for_identity_formatter() {
    let (_dir, path) = write_fixture(b"hello\n");
    let options = ValidateOptions {
        autofix_preview: true,
        format: FormatMode::Command("cat".to_string()),
    };
    let report = validate(&path, &options).unwrap();

    assert_eq!(report.has_format_changes, Some(false));
    assert!(report.formatted_preview.is_none());
}

#[test]
fn formatter_runs_during_apply() {
    let (_dir, path) = write_fixture(b"hello\n");
    let mut opts = options(&path, Vec::new());
    opts.format = FormatMode::Command("tr a-z A-Z".to_string());
    apply(&path, opts).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "HELLO\n");
}

#[test]
fn failing_formatter_aborts_atomic_apply() {
    let (_dir, path) = write_fixture(b"hello\n");
    let before = fs::read(&path).unwrap();
    let mut opts = options(&path, Vec::new());
    opts.format = FormatMode::Command("false".to_string());
    let err = apply(&path, opts).unwrap_err();

    assert_eq!(err.code(), ErrorCode::FormatterFailed);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn missing_file_reports_io_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.md");
    let err = stat(&path).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IoError);
}
