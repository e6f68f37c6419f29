//! Purpose: `manifest-kv-sync` CLI entry point.
//! Role: Binary crate root; parses flags/env, runs one pipeline, emits JSON on stdout.
//! Invariants: Logs and errors go to stderr; stdout carries only the command result.
//! Invariants: Non-interactive errors are emitted as one JSON object on stderr.
//! Invariants: Process exit code is derived from `to_exit_code`.
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use manifest_kv_sync::config::Settings;
use manifest_kv_sync::logging::init_tracing;
use manifest_kv_sync::{Error, ErrorKind, to_exit_code};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;

mod command_dispatch;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `manifest-kv-sync --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command, color_mode).map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "manifest-kv-sync",
    version,
    about = "Shard a content manifest and bulk-upload its tables to a key-value store",
    long_about = None,
    after_help = r#"EXAMPLES
  # CI step 1: fetch the manifest, refresh the cache, emit the shard matrix
  $ SHARD_COUNT=8 manifest-kv-sync plan

  # CI step 2 (one job per matrix entry): upload one shard
  $ MANIFEST_TABLES='["DestinyClassDefinition"]' CACHE_PATH=manifest-cache manifest-kv-sync sync

  # Local: dump every table into bulk-data/ batch files
  $ manifest-kv-sync export --output-dir bulk-data"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Fetch the manifest, update the cache, and emit the shard matrix")]
    Plan {
        #[command(flatten)]
        bungie: BungieArgs,
        #[arg(long, env = "SHARD_COUNT", help = "Number of parallel upload jobs")]
        shard_count: Option<String>,
        #[arg(
            long = "oversized",
            env = "OVERSIZED_TABLES",
            help = "Comma-separated tables that each get a dedicated shard"
        )]
        oversized_tables: Option<String>,
        #[command(flatten)]
        skip: SkipArgs,
        #[arg(long, env = "CACHE_PATH", help = "Manifest cache directory (default: manifest-cache)")]
        cache_dir: Option<PathBuf>,
        #[arg(long, env = "GITHUB_OUTPUT", help = "Append step outputs to this file")]
        output_file: Option<PathBuf>,
    },
    #[command(about = "Fetch one shard's tables and bulk-upload them to the key-value store")]
    Sync {
        #[command(flatten)]
        bungie: BungieArgs,
        #[command(flatten)]
        kv: KvArgs,
        #[arg(long, env = "MANIFEST_TABLES", help = "JSON array of table names for this shard")]
        tables: Option<String>,
        #[arg(long, env = "CACHE_PATH", help = "Manifest cache directory written by `plan`")]
        cache_dir: Option<PathBuf>,
        #[command(flatten)]
        batch: BatchArgs,
    },
    #[command(about = "Download every table into size-bounded local JSON batch files")]
    Export {
        #[command(flatten)]
        bungie: BungieArgs,
        #[command(flatten)]
        skip: SkipArgs,
        #[arg(long, env = "CACHE_FOLDER_PATH", help = "Output directory (default: bulk-data)")]
        output_dir: Option<PathBuf>,
        #[command(flatten)]
        batch: BatchArgs,
    },
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Clone, Debug, Default)]
struct BungieArgs {
    #[arg(long, env = "BUNGIE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long = "server-url", env = "SERVER_URL", help = "Origin header sent with API requests")]
    origin: Option<String>,
    #[arg(long, env = "BUNGIE_BASE_URL", help = "Manifest API base url")]
    bungie_base_url: Option<String>,
    #[arg(long, env = "MANIFEST_LOCALE", help = "Content locale (default: en)")]
    locale: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
struct KvArgs {
    #[arg(long, env = "CLOUDFLARE_ACCOUNT_ID")]
    account_id: Option<String>,
    #[arg(long, env = "CLOUDFLARE_NAMESPACE_ID")]
    namespace_id: Option<String>,
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,
    #[arg(long, env = "CLOUDFLARE_API_BASE_URL", help = "Key-value API base url")]
    kv_base_url: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
struct SkipArgs {
    #[arg(
        long = "skip",
        env = "SKIPPED_TABLES",
        help = "Comma-separated tables to leave out (replaces the built-in list)"
    )]
    skipped_tables: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
struct BatchArgs {
    #[arg(long, env = "MAX_BULK_ITEMS", help = "Items per bulk batch (default: 10000)")]
    max_bulk_items: Option<String>,
    #[arg(long, env = "SYNC_CONCURRENCY", help = "Parallel requests (default: 4)")]
    concurrency: Option<String>,
}

impl BungieArgs {
    fn apply(self, settings: &mut Settings) {
        settings.api_key = self.api_key;
        settings.origin = self.origin;
        settings.bungie_base_url = self.bungie_base_url;
        settings.locale = self.locale;
    }
}

impl KvArgs {
    fn apply(self, settings: &mut Settings) {
        settings.kv_account_id = self.account_id;
        settings.kv_namespace_id = self.namespace_id;
        settings.kv_api_token = self.api_token;
        settings.kv_base_url = self.kv_base_url;
    }
}

impl BatchArgs {
    fn apply(self, settings: &mut Settings) {
        settings.max_bulk_items = self.max_bulk_items;
        settings.concurrency = self.concurrency;
    }
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let pretty = is_tty || color_mode.use_color(is_tty);
    let json = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    let fallback = match err.kind() {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::ConfigurationMissing => "required configuration is missing",
        ErrorKind::InvalidArgument => "invalid argument",
        ErrorKind::Transport => "network request failed",
        ErrorKind::ResponseParse => "could not parse response",
        ErrorKind::Upstream => "upstream API reported an error",
        ErrorKind::MissingLocaleData => "manifest has no data for the locale",
        ErrorKind::UploadRejected => "bulk upload was rejected",
        ErrorKind::NotFound => "not found",
        ErrorKind::Io => "i/o error",
    };
    fallback.to_string()
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(table) = err.table() {
        inner.insert("table".to_string(), json!(table));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(url) = err.url() {
        inner.insert("url".to_string(), json!(url));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(table) = err.table() {
        lines.push(format!(
            "{} {table}",
            colorize_label("table:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(url) = err.url() {
        let status = err.status().map(|code| format!(" ({code})")).unwrap_or_default();
        lines.push(format!(
            "{} {url}{status}",
            colorize_label("url:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    for cause in error_causes(err) {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, error_json, error_text};
    use clap::Parser;
    use manifest_kv_sync::{Error, ErrorKind};

    #[test]
    fn error_json_carries_context_and_causes() {
        let io_err = std::io::Error::other("connection reset");
        let err = Error::new(ErrorKind::Transport)
            .with_message("request failed")
            .with_url("https://www.bungie.net/Platform/Destiny2/Manifest/")
            .with_source(io_err);
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Transport");
        assert_eq!(value["error"]["message"], "request failed");
        assert_eq!(value["error"]["causes"][0], "connection reset");
        assert!(value["error"].get("hint").is_none());
    }

    #[test]
    fn error_text_without_color_has_plain_labels() {
        let err = Error::new(ErrorKind::ConfigurationMissing)
            .with_message("could not get SHARD_COUNT from environment")
            .with_hint("Set SHARD_COUNT or pass the matching flag.");
        let text = error_text(&err, false);
        assert_eq!(
            text,
            "error: could not get SHARD_COUNT from environment\nhint: Set SHARD_COUNT or pass the matching flag."
        );
    }

    #[test]
    fn plan_flags_parse() {
        let cli = Cli::try_parse_from([
            "manifest-kv-sync",
            "plan",
            "--shard-count",
            "4",
            "--oversized",
            "DestinyInventoryItemDefinition",
            "--api-key",
            "k",
            "--server-url",
            "https://example.test",
        ])
        .expect("parse");
        match cli.command {
            Command::Plan {
                shard_count,
                oversized_tables,
                bungie,
                ..
            } => {
                assert_eq!(shard_count.as_deref(), Some("4"));
                assert_eq!(oversized_tables.as_deref(), Some("DestinyInventoryItemDefinition"));
                assert_eq!(bungie.api_key.as_deref(), Some("k"));
            }
            _ => panic!("expected plan"),
        }
    }
}
