//! PDF Metadata Remover - Command-line and interactive entry point
//! Author: kartik4091
//! Created: 2025-06-06
//!
//! `metastrip --cli ...` runs one batch and exits; without `--cli` an
//! interactive session is started.

use clap::{Arg, ArgAction, ArgMatches, Command, ValueEnum};
use metastrip::config::{CompressionLevel, RunConfig, DEFAULT_SETTINGS_FILE};
use metastrip::external::{ConsolePrompter, FixedAnswer, Prompter, QpdfManager};
use metastrip::metadata::{parse_pair, DirectiveSet};
use metastrip::pipeline::{
    CancelToken, FileOutcome, FileProcessor, Pipeline, ProgressEvent, ProgressSink,
};
use metastrip::scanner::{FileScanner, ScanOptions};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages
    Info,
    /// Debug and all messages
    Debug,
    /// Trace and all messages (most verbose)
    Trace,
}

/// Prints per-file results the way the command-line mode reports them
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn emit(&self, event: ProgressEvent) {
        if let ProgressEvent::FileFinished {
            source,
            destination,
            outcome,
            ..
        } = event
        {
            match outcome {
                FileOutcome::Success => {
                    println!("Processed: {} -> {}", source.display(), destination.display())
                }
                FileOutcome::SizeRegression { .. } => println!(
                    "Processed (larger after compression): {} -> {}",
                    source.display(),
                    destination.display()
                ),
                FileOutcome::Failure { reason } => {
                    println!("Error processing: {}", source.display());
                    eprintln!("  {}", reason);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    let cli_mode = matches.get_flag("cli");

    let level = if matches.get_flag("quiet") {
        LogLevel::Error
    } else {
        matches
            .get_one::<LogLevel>("verbose")
            .copied()
            .unwrap_or(if cli_mode { LogLevel::Warn } else { LogLevel::Error })
    };
    init_logging(level);

    let code = if cli_mode {
        run_cli(&matches).await
    } else {
        run_interactive(&matches).await
    };
    process::exit(code);
}

fn build_cli() -> Command {
    Command::new("metastrip")
        .version(env!("CARGO_PKG_VERSION"))
        .author("kartik4091")
        .about("Remove or edit PDF metadata in bulk, with optional qpdf compression")
        .long_about(
            "Strips or rewrites document-information metadata in batches of PDF files. \
             Without --cli an interactive session is started.",
        )
        .arg(
            Arg::new("cli")
                .long("cli")
                .action(ArgAction::SetTrue)
                .help("Run in command-line mode instead of the interactive session"),
        )
        .arg(
            Arg::new("inputs")
                .value_name("PATH")
                .num_args(0..)
                .value_parser(clap::value_parser!(PathBuf))
                .help("PDF files or folders to process"),
        )
        // Output
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Output file or existing folder (default: <name>_clean.pdf beside each source)"),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .action(ArgAction::SetTrue)
                .help("Overwrite the original files"),
        )
        .arg(
            Arg::new("backup")
                .short('b')
                .long("backup")
                .action(ArgAction::SetTrue)
                .help("Back up originals before overwriting them"),
        )
        // Discovery
        .arg(
            Arg::new("recursive")
                .short('r')
                .long("recursive")
                .action(ArgAction::SetTrue)
                .help("Process folders recursively"),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .default_value("3")
                .help("Maximum folder depth when recursive (0 = unlimited)"),
        )
        // Processing
        .arg(
            Arg::new("compression")
                .short('c')
                .long("compression")
                .value_name("LEVEL")
                .value_parser(clap::value_parser!(CompressionLevel))
                .ignore_case(true)
                .default_value("none")
                .help("qpdf compression level"),
        )
        .arg(
            Arg::new("remove-meta")
                .long("remove-meta")
                .value_name("KEY")
                .num_args(1..)
                .action(ArgAction::Append)
                .help("Metadata keys to remove, e.g. /Author /Title"),
        )
        .arg(
            Arg::new("edit-meta")
                .long("edit-meta")
                .value_name("KEY=VALUE")
                .num_args(1..)
                .action(ArgAction::Append)
                .value_parser(parse_pair)
                .help("Metadata keys to set, e.g. /Author=Anonymous"),
        )
        .arg(
            Arg::new("custom-meta")
                .long("custom-meta")
                .value_name("KEY=VALUE")
                .num_args(1..)
                .action(ArgAction::Append)
                .value_parser(parse_pair)
                .help("Custom metadata entries to add, e.g. MyField=Value"),
        )
        // Reporting and tool acquisition
        .arg(
            Arg::new("report")
                .long("report")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .requires("cli")
                .help("Write a run report (.json for JSON, anything else plain text)"),
        )
        .arg(
            Arg::new("assume-yes")
                .short('y')
                .long("assume-yes")
                .action(ArgAction::SetTrue)
                .requires("cli")
                .help("Download qpdf without asking when it is missing"),
        )
        .arg(
            Arg::new("no-download")
                .long("no-download")
                .action(ArgAction::SetTrue)
                .requires("cli")
                .conflicts_with("assume-yes")
                .help("Never download qpdf"),
        )
        // Configuration
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Settings file for the interactive session (JSON/YAML)"),
        )
        // Logging
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .value_parser(clap::value_parser!(LogLevel))
                .help("Set logging verbosity"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Suppress all log output except errors"),
        )
}

fn init_logging(level: LogLevel) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let filter_level = match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!("metastrip={}", filter_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn prompter_for(matches: &ArgMatches) -> Box<dyn Prompter> {
    if matches.get_flag("assume-yes") {
        Box::new(FixedAnswer(true))
    } else if matches.get_flag("no-download") || !std::io::stdin().is_terminal() {
        Box::new(FixedAnswer(false))
    } else {
        Box::new(ConsolePrompter)
    }
}

fn collect_pairs(matches: &ArgMatches, id: &str) -> Vec<(String, String)> {
    matches
        .get_many::<(String, String)>(id)
        .map(|pairs| pairs.cloned().collect())
        .unwrap_or_default()
}

async fn run_cli(matches: &ArgMatches) -> i32 {
    let inputs: Vec<PathBuf> = matches
        .get_many::<PathBuf>("inputs")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();
    if inputs.is_empty() {
        eprintln!("{}", build_cli().render_usage());
        eprintln!("No input files or folders given.");
        return EXIT_FAILURE;
    }

    let recursive = matches.get_flag("recursive");
    let max_depth = matches.get_one::<usize>("max-depth").copied().unwrap_or(3);
    let compression = matches
        .get_one::<CompressionLevel>("compression")
        .copied()
        .unwrap_or_default();

    let scanner = FileScanner::new(ScanOptions {
        recursive,
        max_depth,
        validate_signature: true,
    });
    let scan = scanner.collect(&inputs);
    if !scan.missing.is_empty() {
        for path in &scan.missing {
            eprintln!("File or folder does not exist: {}", path.display());
        }
        return EXIT_FAILURE;
    }
    if scan.files.is_empty() {
        println!("No PDF files found.");
        return EXIT_FAILURE;
    }
    println!("Found {} PDF file(s) to process.", scan.files.len());

    let remove: Vec<String> = matches
        .get_many::<String>("remove-meta")
        .map(|keys| keys.cloned().collect())
        .unwrap_or_default();
    let directives = match DirectiveSet::from_cli(
        &remove,
        &collect_pairs(matches, "edit-meta"),
        &collect_pairs(matches, "custom-meta"),
    ) {
        Ok(directives) => directives,
        Err(e) => {
            eprintln!("{}", e);
            return EXIT_FAILURE;
        }
    };
    if !directives.has_effect() && !compression.is_enabled() {
        warn!("No metadata changes or compression requested; files will only be rewritten");
    }

    let config = RunConfig::new(
        matches.get_flag("backup"),
        matches.get_flag("overwrite"),
        matches.get_one::<PathBuf>("output").map(PathBuf::as_path),
        compression,
    )
    .with_recursion(recursive, max_depth);

    let tools = Arc::new(QpdfManager::new(prompter_for(matches)));
    let pipeline = Arc::new(Pipeline::new(FileProcessor::new(config, directives, tools)));

    let cancel = CancelToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            eprintln!("Interrupted, stopping after the current file (Ctrl-C again to quit now)...");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted again, exiting.");
                process::exit(EXIT_CANCELLED);
            }
        }
    });

    let sink: Arc<dyn ProgressSink> = Arc::new(ConsoleSink);
    let report = match pipeline.execute(scan.files, cancel, sink).await {
        Ok(report) => report,
        Err(e) => {
            error!("Batch aborted: {}", e);
            return EXIT_FAILURE;
        }
    };

    if let Some(path) = matches.get_one::<PathBuf>("report") {
        if let Err(e) = report.write(path) {
            error!("Failed to write report {}: {}", path.display(), e);
        }
    }

    if report.summary.is_cancelled() {
        println!("Processing cancelled by user.");
    }
    println!("Summary: {}", report.summary);

    if report.summary.is_cancelled() {
        EXIT_CANCELLED
    } else if report.summary.errors > 0 {
        EXIT_FAILURE
    } else {
        EXIT_OK
    }
}

async fn run_interactive(matches: &ArgMatches) -> i32 {
    let settings_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

    let initial: Vec<PathBuf> = matches
        .get_many::<PathBuf>("inputs")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();

    // Consent is asked by the session itself before a run starts
    let tools = Arc::new(QpdfManager::new(Box::new(FixedAnswer(false))));

    info!("Starting interactive session");
    match metastrip::interactive::run(settings_path, tools, initial).await {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!("Session ended with an error: {}", e);
            EXIT_FAILURE
        }
    }
}
