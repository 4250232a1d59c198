use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use schema_drift_core::{BreakingChangeDetector, OutputFormat, format_result, format_schema_set};
use schema_drift_loader::{DriftConfig, load_library, load_spec};
use schema_drift_runner::{CheckRequest, ExternalDiffTool, run_check};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit status when the comparison found blocking drift.
const EXIT_DRIFT: i32 = 1;

/// Exit status for unreadable inputs, bad configuration and I/O failures.
const EXIT_FATAL: i32 = 2;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "schema-drift")]
#[command(about = "Detect drift between a schema library and a generated API specification")]
#[command(version)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Log line format on stderr.
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare a schema library export with a generated specification.
    Check(CheckArgs),
    /// Load one input and list its types without comparing.
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Schema library export (side A).
    #[arg(long)]
    library: PathBuf,
    /// Generated OpenAPI / Swagger specification (side B).
    #[arg(long)]
    spec: PathBuf,
    /// Previously captured specification for breaking-change detection.
    #[arg(long)]
    baseline: Option<PathBuf>,
    /// Structural diff binary, overrides `detector.binary` from the config.
    #[arg(long)]
    detector: Option<String>,
    /// Seconds before the detector is killed.
    #[arg(long)]
    detector_timeout: Option<u64>,
    /// Configuration file (default: ./.schema-drift.yml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Report format.
    #[arg(long, default_value = "text")]
    format: OutputFormat,
    /// One line per issue for CI logs. Does not change the exit status.
    #[arg(long, conflicts_with = "format")]
    ci: bool,
    /// Write the report to a file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("input").required(true).args(["library", "spec"])))]
struct InspectArgs {
    /// Schema library export.
    #[arg(long)]
    library: Option<PathBuf>,
    /// Generated OpenAPI / Swagger specification.
    #[arg(long)]
    spec: Option<PathBuf>,
    /// Listing format.
    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    let result = match cli.command {
        Command::Check(args) => run_check_command(args),
        Command::Inspect(args) => run_inspect(args).map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_DRIFT),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(EXIT_FATAL);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` takes precedence over
/// `--verbose`.
fn init_logging(verbose: bool, format: LogFormat) {
    let default = if verbose {
        "schema_drift=debug"
    } else {
        "schema_drift=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Runs a drift check and returns whether it passed.
fn run_check_command(args: CheckArgs) -> Result<bool, String> {
    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(binary) = args.detector {
        config.detector.binary = Some(binary);
    }
    if let Some(timeout) = args.detector_timeout {
        config.detector.timeout_secs = timeout;
    }

    let tool = ExternalDiffTool::from_config(&config.detector);
    let detector = tool.as_ref().map(|tool| tool as &dyn BreakingChangeDetector);

    let mut request = CheckRequest::new(args.library, args.spec).with_config(config);
    if let Some(baseline) = args.baseline {
        request = request.with_baseline(baseline);
    }

    let result = run_check(&request, detector).map_err(|e| e.to_string())?;

    let format = if args.ci { OutputFormat::Ci } else { args.format };
    let rendered = format_result(&result, format)?;
    match args.output {
        Some(path) => {
            write_report(&path, &rendered)?;
            println!("{} Report written to '{}'.", result.summary, path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(result.passed())
}

fn run_inspect(args: InspectArgs) -> Result<(), String> {
    let set = match (args.library, args.spec) {
        (Some(path), _) => load_library(&path),
        (None, Some(path)) => load_spec(&path),
        (None, None) => return Err("one of --library or --spec is required".to_string()),
    }
    .map_err(|e| e.to_string())?;

    print!("{}", format_schema_set(&set, args.format)?);
    Ok(())
}

/// Loads the explicit config file, else `.schema-drift.yml` from the working
/// directory when it exists, else defaults.
fn resolve_config(explicit: Option<&Path>) -> Result<DriftConfig, String> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let default = Path::new(DriftConfig::DEFAULT_FILE);
            if !default.exists() {
                debug!("no configuration file, using defaults");
                return Ok(DriftConfig::default());
            }
            default
        }
    };
    debug!(path = %path.display(), "loading configuration");
    DriftConfig::load(path).map_err(|e| e.to_string())
}

fn write_report(path: &Path, rendered: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    fs::write(path, rendered).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
}
