use cattrace::config::Config;
use cattrace::engine::convert_trace;
use cattrace::ingest::{read_events, LineParser, Sessions};
use cattrace::InvariantViolation;
use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static LONG_VERSION: OnceLock<String> = OnceLock::new();

fn get_long_version() -> &'static str {
    LONG_VERSION.get_or_init(|| {
        format!(
            "{} (commit: {})",
            env!("CARGO_PKG_VERSION"),
            env!("CATTRACE_GIT_REVISION")
        )
    })
}

#[derive(Parser)]
#[command(name = "cattrace")]
#[command(about = "convert chrome trace event logs into perfetto traces")]
#[command(version = None, long_version = get_long_version())]
struct Args {
    #[arg(
        short,
        long,
        global = true,
        help = "configuration file path (toml format)"
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert json trace files into .perfetto_trace files
    Convert {
        #[arg(required = true, help = "json trace files to convert")]
        inputs: Vec<PathBuf>,

        #[arg(
            short,
            long,
            help = "output file, only valid with a single input (default: <input>.perfetto_trace)"
        )]
        output: Option<PathBuf>,
    },
    /// Read tagged log lines from stdin until a blank line, then write and
    /// convert one trace per session
    Ingest {
        #[arg(
            short = 'd',
            long,
            default_value = "files",
            help = "directory for session traces"
        )]
        output_dir: PathBuf,
    },
}

fn convert_files(inputs: &[PathBuf], output: Option<&Path>, config: &Config) -> Result<()> {
    if output.is_some() && inputs.len() > 1 {
        eyre::bail!("--output requires exactly one input, got {}", inputs.len());
    }

    let mut failed = 0;
    for input in inputs {
        if let Err(e) = convert_trace(input, output, config) {
            if e.downcast_ref::<InvariantViolation>().is_some() {
                return Err(e);
            }
            tracing::error!(input = %input.display(), error = %format!("{e:#}"), "conversion failed");
            failed += 1;
        }
    }

    if failed > 0 {
        eyre::bail!("{failed} of {} conversions failed", inputs.len());
    }
    Ok(())
}

fn ingest(output_dir: &Path, config: &Config) -> Result<()> {
    let parser = LineParser::new(config.ingest.tag.clone());
    let mut sessions = Sessions::new(&config.ingest);

    let stdin = std::io::stdin();
    let summary = read_events(stdin.lock(), &parser, &mut sessions)?;
    tracing::info!(
        lines = summary.lines,
        events = summary.events,
        skipped = summary.skipped,
        sessions = sessions.sessions().len(),
        "finished reading input"
    );

    let paths = sessions.write_json(output_dir)?;
    convert_files(&paths, None, config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config path={}", path.display()))?,
        None => Config::default(),
    };

    match args.command {
        Command::Convert { inputs, output } => convert_files(&inputs, output.as_deref(), &config),
        Command::Ingest { output_dir } => ingest(&output_dir, &config),
    }
}
