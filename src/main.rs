//! Purpose: `mqbridge` CLI entry point: produce to and consume from a native queue library.
//! Role: Binary crate root; parses args and env config, installs logging, dispatches commands.
//! Invariants: Message output goes to stdout; logs and errors go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use mqbridge::api::{Error, ErrorKind, to_exit_code};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

const LIBRARY_STEM: &str = "rocketmq_service";

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
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
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
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `mqbridge --help`."));
            }
        },
    };

    init_tracing();
    let library = cli.library.unwrap_or_else(default_library_path);
    command_dispatch::dispatch_command(cli.command, library).map_err(add_library_hint)
}

#[derive(Parser)]
#[command(
    name = "mqbridge",
    version,
    about = "Send and receive queue messages through a native client library",
    long_about = None,
    after_help = r#"EXAMPLES
  $ mqbridge --lib ./librocketmq_service.so produce --topic orders '{"id": 1}'
  $ printf 'a\nb\n' | mqbridge produce --topic orders --tag created
  $ mqbridge consume --topic orders --group workers --count 10

ENVIRONMENT
  ROCKETMQ_LIB, ROCKETMQ_NS, ROCKETMQ_GROUP, ROCKETMQ_TOPIC, ROCKETMQ_TAG supply defaults
  for the matching flags. RUST_LOG controls log verbosity (default: info)."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long = "lib",
        env = "ROCKETMQ_LIB",
        help = "Path to the native client library (default: ./<platform name of rocketmq_service>)",
        value_hint = ValueHint::FilePath
    )]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Debug)]
struct BrokerArgs {
    #[arg(
        long = "ns",
        env = "ROCKETMQ_NS",
        default_value = "127.0.0.1:9876",
        help = "Name server address"
    )]
    name_server: String,
    #[arg(
        long,
        env = "ROCKETMQ_GROUP",
        default_value = "task_group",
        help = "Producer or consumer group"
    )]
    group: String,
    #[arg(
        long,
        env = "ROCKETMQ_TOPIC",
        default_value = "task_topic",
        help = "Topic to send to or subscribe to"
    )]
    topic: String,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Send messages (arguments, or one per stdin line)",
        after_help = "Prints one JSON object per message: {\"success\":..,\"raw\":..,\"msg_id\":..}.\nExits 1 if any send was declined."
    )]
    Produce {
        #[command(flatten)]
        broker: BrokerArgs,
        #[arg(long, env = "ROCKETMQ_TAG", default_value = "", help = "Message tag")]
        tag: String,
        #[arg(help = "Message bodies; reads stdin lines when omitted")]
        bodies: Vec<String>,
    },
    #[command(
        about = "Receive messages until interrupted",
        after_help = "Prints one JSON line per message: {\"time\":..,\"body\":..}.\nStops on Ctrl-C (a second Ctrl-C exits immediately)."
    )]
    Consume {
        #[command(flatten)]
        broker: BrokerArgs,
        #[arg(
            long,
            env = "ROCKETMQ_TAG",
            default_value = "*",
            help = "Tag filter expression"
        )]
        tag: String,
        #[arg(long, default_value_t = 5000, help = "Per-poll timeout in milliseconds")]
        timeout_ms: u64,
        #[arg(long, default_value_t = 100, help = "Pause after an empty poll in milliseconds")]
        idle_ms: u64,
        #[arg(long, help = "Exit after receiving this many messages")]
        count: Option<u64>,
        #[arg(long, help = "Emit bare message bodies instead of JSON lines")]
        raw: bool,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn default_library_path() -> PathBuf {
    let file_name: OsString = libloading::library_filename(LIBRARY_STEM);
    std::env::current_dir()
        .map(|dir| dir.join(&file_name))
        .unwrap_or_else(|_| PathBuf::from(file_name))
}

fn millis(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn add_library_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::LibraryNotFound => {
            err.with_hint("Pass --lib <path> or set ROCKETMQ_LIB to the native client library.")
        }
        ErrorKind::LibraryLoad => err.with_hint(
            "Check that the file is a shared library for this platform and exports the client entry points.",
        ),
        ErrorKind::InitFailed => {
            err.with_hint("Check the name server address and group, then retry.")
        }
        _ => err,
    }
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::LibraryNotFound => "native library not found".to_string(),
        ErrorKind::LibraryLoad => "native library could not be loaded".to_string(),
        ErrorKind::ParameterEncoding => "parameter could not be encoded".to_string(),
        ErrorKind::InitFailed => "initialization failed".to_string(),
        ErrorKind::NotInitialized => "session is not initialized".to_string(),
        ErrorKind::SessionClosed => "session is closed".to_string(),
        ErrorKind::NativeCallFailed => "native call failed".to_string(),
        ErrorKind::ShutdownFailed => "shutdown failed".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
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
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(code) = err.code() {
        inner.insert("code".to_string(), json!(code));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(path) = err.path() {
        lines.push(format!("path: {}", path.display()));
    }
    if let Some(code) = err.code() {
        lines.push(format!("code: {code}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
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
