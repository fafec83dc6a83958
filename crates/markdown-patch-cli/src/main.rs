use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use markdown_patch_config::{Config, LoadOptions};
use markdown_patch_core::{
    apply, stat, validate, ApplyOptions, Edit, FormatMode, PatchError, ValidateOptions,
};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(author, version, about = "Deterministic, structure-aware Markdown editor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe the structure of a markdown file
    Stat(StatArgs),
    /// Check structural sanity and optionally preview formatting
    Validate(ValidateArgs),
    /// Apply a batch of edits gated on the file's current hash
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
struct StatArgs {
    /// Path to markdown file
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Path to markdown file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Include a formatted preview from the configured formatter
    #[arg(long = "autofix-preview")]
    autofix_preview: bool,

    /// Formatter command ('none' disables)
    #[arg(long = "format", value_name = "CMD")]
    format: Option<String>,

    /// Explicit config file path
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Path to markdown file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// SHA-256 the file must currently hash to
    #[arg(long = "base-sha256", value_name = "HEX")]
    base_sha256: String,

    /// Edit list as inline JSON
    #[arg(long = "edits", value_name = "JSON", allow_hyphen_values = true)]
    edits: Option<String>,

    /// Read the edit list from a file (use '-' for stdin)
    #[arg(long = "edits-file", value_name = "PATH", conflicts_with = "edits")]
    edits_file: Option<PathBuf>,

    /// Compute the result without writing to disk
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Apply edits independently instead of all-or-nothing
    #[arg(long = "no-atomic")]
    no_atomic: bool,

    /// Formatter command ('none' disables)
    #[arg(long = "format", value_name = "CMD")]
    format: Option<String>,

    /// Explicit config file path
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    match cli.command {
        Command::Stat(args) => handle_stat(args),
        Command::Validate(args) => handle_validate(args),
        Command::Apply(args) => handle_apply(args),
    }
}

fn handle_stat(args: StatArgs) -> Result<bool> {
    match stat(&args.file) {
        Ok(report) => {
            emit(serde_json::to_value(&report)?)?;
            Ok(true)
        }
        Err(err) => {
            emit(failure_record(&err, &args.file))?;
            Ok(false)
        }
    }
}

fn handle_validate(args: ValidateArgs) -> Result<bool> {
    let config = load_config(args.config.as_ref())?;
    let options = ValidateOptions {
        autofix_preview: args.autofix_preview,
        format: resolve_format(args.format.as_deref(), &config),
    };

    match validate(&args.file, &options) {
        Ok(report) => {
            emit(serde_json::to_value(&report)?)?;
            Ok(true)
        }
        Err(err) => {
            emit(failure_record(&err, &args.file))?;
            Ok(false)
        }
    }
}

fn handle_apply(args: ApplyArgs) -> Result<bool> {
    let config = load_config(args.config.as_ref())?;
    let raw_edits = load_edits(&args)?;

    let edits: Vec<Edit> = match serde_json::from_str(&raw_edits) {
        Ok(edits) => edits,
        Err(err) => {
            emit(json!({
                "ok": false,
                "filePath": args.file.display().to_string(),
                "error": format!("invalid edit list: {err}"),
                "errorCode": "INVALID_OPERATION",
            }))?;
            return Ok(false);
        }
    };

    let options = ApplyOptions {
        base_sha256: args.base_sha256.clone(),
        edits,
        atomic: !args.no_atomic && config.atomic,
        dry_run: args.dry_run,
        format: resolve_format(args.format.as_deref(), &config),
        preserve_eol: config.preserve_eol,
        preserve_encoding: config.preserve_encoding,
        ensure_final_newline: config.ensure_final_newline,
    };

    match apply(&args.file, options) {
        Ok(report) => {
            emit(serde_json::to_value(&report)?)?;
            Ok(true)
        }
        Err(err) => {
            emit(failure_record(&err, &args.file))?;
            Ok(false)
        }
    }
}

fn load_config(override_path: Option<&PathBuf>) -> Result<Config> {
    Config::load(LoadOptions {
        override_path: override_path.cloned(),
        start_dir: None,
    })
    .context("failed to load configuration")
}

fn resolve_format(flag: Option<&str>, config: &Config) -> FormatMode {
    match flag {
        Some(value) => FormatMode::parse(value),
        None => config
            .format_command
            .as_deref()
            .map(FormatMode::parse)
            .unwrap_or(FormatMode::None),
    }
}

fn load_edits(args: &ApplyArgs) -> Result<String> {
    match (&args.edits, &args.edits_file) {
        (Some(inline), None) => Ok(inline.clone()),
        (None, Some(path)) if path == Path::new("-") => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read edits from stdin")?;
            Ok(buffer)
        }
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read edits file '{}'", path.display())),
        (None, None) => bail!("apply requires --edits or --edits-file"),
        (Some(_), Some(_)) => bail!("--edits and --edits-file cannot be used together"),
    }
}

fn failure_record(err: &PatchError, file: &Path) -> serde_json::Value {
    let mut record = json!({
        "ok": false,
        "filePath": file.display().to_string(),
        "error": err.to_string(),
        "errorCode": err.code().as_str(),
    });

    if let PatchError::Precondition { expected, actual } = err {
        record["expected"] = json!(expected);
        record["actual"] = json!(actual);
    }

    let diagnostics = err.diagnostics();
    if !diagnostics.is_empty() {
        record["diagnostics"] = serde_json::to_value(diagnostics).unwrap_or_default();
    }

    record
}

fn emit(value: serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
