//! Purpose: `tabline` CLI entry point.
//! Role: Binary crate root; parses args, installs logging, reports errors.
//! Invariants: Rows go to stdout as JSON Lines; diagnostics go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use tabline::api::{
    DelimitedLineStore, Durability, Error, ErrorKind, LineFormat, Mode, StoreOptions, to_exit_code,
};

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
    init_tracing();
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
                        Error::new(ErrorKind::Internal)
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
                        .with_hint("Try `tabline --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command).map_err(|err| (err, color_mode))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "tabline",
    version,
    about = "Read and append delimiter-separated text rows",
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
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

#[derive(Args, Clone, Debug)]
struct FormatArgs {
    #[arg(
        long,
        short = 'd',
        default_value = "\\t",
        help = "Field delimiter; the escape `\\t` means a tab"
    )]
    delimiter: String,
}

impl FormatArgs {
    fn line_format(&self) -> Result<LineFormat, Error> {
        LineFormat::new(self.delimiter.replace("\\t", "\t"))
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Print every row of a file as a JSON array per line")]
    Read {
        #[arg(help = "File to read", value_hint = ValueHint::FilePath)]
        path: PathBuf,
        #[command(flatten)]
        format: FormatArgs,
    },
    #[command(
        about = "Append rows read from stdin (one JSON array of strings per line)",
        after_help = r#"EXAMPLES
  $ printf '["a","b","c"]\n["d","e"]\n' | tabline write data.tsv
  $ echo '["x","y"]' | tabline write --delimiter , --sync data.csv"#
    )]
    Write {
        #[arg(help = "File to append to (created if missing)", value_hint = ValueHint::FilePath)]
        path: PathBuf,
        #[command(flatten)]
        format: FormatArgs,
        #[arg(long, help = "Sync file data to disk after every row")]
        sync: bool,
        #[arg(long, help = "Fail instead of writing when another locked writer is active")]
        lock: bool,
    },
    #[command(
        about = "Generate shell completion scripts",
        long_about = r#"Generate shell completion scripts for tabline.

  $ tabline completion bash > ~/.local/share/bash-completion/completions/tabline
  $ tabline completion zsh > ~/.zfunc/_tabline
  $ tabline completion fish > ~/.config/fish/completions/tabline.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

const RED: &str = "31";
const YELLOW: &str = "33";

fn paint(label: &str, code: &str, enabled: bool) -> String {
    if enabled {
        format!("\u{1b}[{code}m{label}\u{1b}[0m")
    } else {
        label.to_string()
    }
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| err.kind().to_string())
}

fn error_causes(err: &Error) -> Vec<String> {
    std::iter::successors(err.source(), |&source| source.source())
        .map(|source| source.to_string())
        .collect()
}

/// Optional error context in display order; shared by the JSON and text renderings.
fn error_details(err: &Error) -> Vec<(&'static str, Value)> {
    let mut details = Vec::new();
    if let Some(hint) = err.hint() {
        details.push(("hint", json!(hint)));
    }
    if let Some(path) = err.path() {
        details.push(("path", json!(path.display().to_string())));
    }
    if let Some(line) = err.line() {
        details.push(("line", json!(line)));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        details.push(("causes", json!(causes)));
    }
    details
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    for (key, value) in error_details(err) {
        inner.insert(key.to_string(), value);
    }
    json!({ "error": inner })
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        paint("error:", RED, use_color),
        error_message(err)
    )];
    for (key, value) in error_details(err) {
        let (label, text) = match value {
            // Terminals only get the first cause.
            Value::Array(causes) => match causes.into_iter().next() {
                Some(Value::String(first)) => ("caused by", first),
                _ => continue,
            },
            Value::String(text) => (key, text),
            other => (key, other.to_string()),
        };
        lines.push(format!("{} {text}", paint(&format!("{label}:"), YELLOW, use_color)));
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
