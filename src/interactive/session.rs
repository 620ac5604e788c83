//! Interactive session: file selection, directive editor, options and a background batch
//! Author: kartik4091
//! Created: 2025-06-06

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, instrument};

use super::commands::{parse_command, Command, HELP};
use crate::{
    config::{CompressionLevel, RunConfig, Settings},
    error::Result,
    external::{is_yes, QpdfManager, ToolProvider, QPDF_VERSION},
    metadata::{discover_extra_keys, DirectiveSet},
    pipeline::{
        CancelToken, FileOutcome, FileProcessor, Pipeline, ProgressEvent, ProgressSink,
    },
    scanner::{is_valid_pdf, FileScanner, ScanOptions},
    utils::{LogEntry, LogLevel},
};

/// Whether the session keeps reading commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug)]
struct ActiveRun {
    cancel: CancelToken,
    total: usize,
    done: usize,
}

/// State behind the interactive front end
pub struct Session {
    settings: Settings,
    settings_path: PathBuf,
    files: Vec<PathBuf>,
    directives: DirectiveSet,
    compression: CompressionLevel,
    tools: Arc<QpdfManager>,
    events: UnboundedSender<ProgressEvent>,
    active: Option<ActiveRun>,
    awaiting_consent: bool,
    log: Vec<LogEntry>,
    out: Box<dyn Write + Send>,
}

impl Session {
    pub fn new(
        settings_path: PathBuf,
        tools: Arc<QpdfManager>,
        events: UnboundedSender<ProgressEvent>,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            settings: Settings::load(&settings_path),
            settings_path,
            files: Vec::new(),
            directives: DirectiveSet::standard(),
            compression: CompressionLevel::None,
            tools,
            events,
            active: None,
            awaiting_consent: false,
            log: Vec::new(),
            out,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn directives(&self) -> &DirectiveSet {
        &self.directives
    }

    pub fn compression(&self) -> CompressionLevel {
        self.compression
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn save_settings(&self) {
        self.settings.save(&self.settings_path);
    }

    fn print(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }

    fn say(&mut self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::new(level, message);
        let line = entry.tagged();
        self.log.push(entry);
        self.print(&line);
    }

    /// Handles one input line. Command errors are logged and the session continues.
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        if self.awaiting_consent {
            self.awaiting_consent = false;
            self.settle_tool(is_yes(line)).await;
            self.launch();
            return Flow::Continue;
        }

        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Flow::Continue,
            Err(e) => {
                self.say(LogLevel::Error, e.to_string());
                return Flow::Continue;
            }
        };

        match self.execute(command).await {
            Ok(flow) => flow,
            Err(e) => {
                self.say(LogLevel::Error, e.to_string());
                Flow::Continue
            }
        }
    }

    #[instrument(skip(self))]
    async fn execute(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Add(paths) => self.add_paths(&paths),
            Command::Unadd(target) => self.unadd(&target),
            Command::Files => self.show_files(),
            Command::Clear => {
                self.files.clear();
                self.say(LogLevel::Info, "File list cleared.");
            }
            Command::Fields => self.show_fields(),
            Command::Remove(key) => self.directives.remove(&key)?,
            Command::Keep(key) => self.directives.keep(&key)?,
            Command::Set(key, value) => self.directives.set(&key, &value)?,
            Command::Custom(key, value) => {
                let remove = value.is_none();
                self.directives
                    .add_custom(&key, value.as_deref().unwrap_or(""), remove)?;
            }
            Command::Uncustom(key) => {
                if !self.directives.drop_custom(&key) {
                    self.say(LogLevel::Warning, format!("No custom field named {}", key));
                }
            }
            Command::Neutral => {
                self.directives.fill_neutral();
                self.say(LogLevel::Info, "Filled fields with neutral values.");
            }
            Command::Random => {
                self.directives.fill_random(&mut rand::thread_rng());
                self.say(LogLevel::Info, "Filled fields with random values.");
            }
            Command::ResetFields => {
                self.directives.reset_values();
                self.say(LogLevel::Info, "Field values cleared.");
            }
            Command::Scan => self.scan_first_file().await?,
            Command::Option { name, value } => {
                self.settings.set_option(&name, &value)?;
                self.say(LogLevel::Info, format!("{} set to {}", name, value));
            }
            Command::Output(target) => {
                self.settings.output_path = target
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                let shown = match self.settings.output() {
                    Some(path) => path.display().to_string(),
                    None => "beside each source (<name>_clean.pdf)".to_string(),
                };
                self.say(LogLevel::Info, format!("Output: {}", shown));
            }
            Command::Compression(level) => {
                self.compression = level;
                self.say(LogLevel::Info, format!("Compression level: {}", level));
            }
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Status => self.show_status(),
            Command::Reset => self.reset(),
            Command::ClearLog => {
                self.log.clear();
                self.print("Log cleared.");
            }
            Command::Help => self.print(HELP),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Adds existing PDFs; directories are expanded with the current recursion options.
    pub fn add_paths(&mut self, paths: &[PathBuf]) {
        let scanner = FileScanner::new(ScanOptions {
            recursive: self.settings.recursive,
            max_depth: self.settings.max_depth,
            validate_signature: true,
        });

        let mut roots = Vec::new();
        for path in paths {
            if !path.exists() {
                self.say(
                    LogLevel::Warning,
                    format!("File or folder does not exist: {}", path.display()),
                );
            } else if path.is_file() && !is_valid_pdf(path) {
                self.say(
                    LogLevel::Warning,
                    format!("Skipping non-PDF file: {}", path.display()),
                );
            } else {
                roots.push(path.clone());
            }
        }

        let mut added = 0;
        for file in scanner.collect(&roots).files {
            if !self.files.contains(&file) {
                self.files.push(file);
                added += 1;
            }
        }
        self.say(LogLevel::Info, format!("Added {} PDF file(s).", added));
    }

    /// Drops one selected file, given as its 1-based listing number or its path.
    pub fn unadd(&mut self, target: &str) {
        let position = match target.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.files.len() => Some(n - 1),
            Ok(_) => None,
            Err(_) => {
                let wanted = Path::new(target);
                let canonical = wanted.canonicalize().ok();
                self.files.iter().position(|f| {
                    f == wanted
                        || canonical
                            .as_ref()
                            .is_some_and(|c| f.canonicalize().ok().as_ref() == Some(c))
                })
            }
        };

        match position {
            Some(i) => {
                let removed = self.files.remove(i);
                self.say(LogLevel::Info, format!("Removed {}", removed.display()));
            }
            None => self.say(
                LogLevel::Warning,
                format!("{} is not in the file list", target),
            ),
        }
    }

    fn show_files(&mut self) {
        if self.files.is_empty() {
            self.print("No files selected.");
            return;
        }
        let listing: Vec<String> = self
            .files
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{:>4}. {}", i + 1, f.display()))
            .collect();
        self.print(&listing.join("\n"));
    }

    fn show_fields(&mut self) {
        let mut lines = vec![format!("{:<20} {:<7} {}", "Field", "Remove", "Value")];
        for (key, directive) in self.directives.fields() {
            lines.push(format!(
                "{:<20} {:<7} {}",
                key,
                if directive.remove { "yes" } else { "no" },
                directive.value
            ));
        }
        let custom: Vec<String> = self
            .directives
            .custom()
            .map(|(key, directive)| {
                format!(
                    "{:<20} {:<7} {}",
                    key,
                    if directive.remove { "yes" } else { "no" },
                    directive.value
                )
            })
            .collect();
        if !custom.is_empty() {
            lines.push("Custom:".to_string());
            lines.extend(custom);
        }
        self.print(&lines.join("\n"));
    }

    async fn scan_first_file(&mut self) -> Result<()> {
        let Some(first) = self.files.first().cloned() else {
            self.say(LogLevel::Warning, "No files selected to scan.");
            return Ok(());
        };

        let directives = self.directives.clone();
        let keys =
            tokio::task::spawn_blocking(move || discover_extra_keys(&first, &directives)).await??;
        let added = self.directives.extend_schema(keys);
        if added.is_empty() {
            self.say(LogLevel::Info, "No additional metadata fields found.");
        } else {
            self.say(
                LogLevel::Info,
                format!(
                    "Found {} additional metadata field(s): {}",
                    added.len(),
                    added.join(", ")
                ),
            );
        }
        Ok(())
    }

    fn start(&mut self) {
        if self.active.is_some() {
            self.say(LogLevel::Warning, "Processing is already running.");
            return;
        }
        if self.files.is_empty() {
            self.say(LogLevel::Warning, "No files selected.");
            return;
        }

        if self.compression.is_enabled() && self.tools.needs_consent() {
            self.awaiting_consent = true;
            self.print(&format!(
                "QPDF is missing. Download QPDF {} automatically for compression support? [y/N]",
                QPDF_VERSION
            ));
            return;
        }
        self.launch();
    }

    async fn settle_tool(&mut self, consent: bool) {
        let tools = Arc::clone(&self.tools);
        let resolved = tokio::task::spawn_blocking(move || tools.acquire(consent))
            .await
            .ok()
            .flatten();
        match resolved {
            Some(path) => self.say(LogLevel::Info, format!("Using qpdf at {}", path.display())),
            None => self.say(
                LogLevel::Warning,
                "QPDF is unavailable; files will fail the compression step.",
            ),
        }
    }

    fn launch(&mut self) {
        let config = RunConfig::from_settings(&self.settings, self.compression);
        let tools: Arc<dyn ToolProvider> = self.tools.clone();
        let pipeline = Arc::new(Pipeline::new(FileProcessor::new(
            config,
            self.directives.clone(),
            tools,
        )));

        let files = self.files.clone();
        let total = files.len();
        let cancel = CancelToken::new();
        let events = self.events.clone();
        let sink: Arc<dyn ProgressSink> = Arc::new(events.clone());

        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if let Err(e) = pipeline.execute(files, cancel, sink).await {
                    events.emit(ProgressEvent::Aborted {
                        reason: e.to_string(),
                    });
                }
            }
        });

        self.active = Some(ActiveRun {
            cancel,
            total,
            done: 0,
        });
        self.say(LogLevel::Info, "Processing started.");
    }

    fn stop(&mut self) {
        match &self.active {
            Some(run) => {
                run.cancel.cancel();
                self.say(LogLevel::Warning, "Stopping after the current file...");
            }
            None => self.say(LogLevel::Info, "Nothing is running."),
        }
    }

    /// Requests cancellation of a running batch; true when one was running
    pub fn cancel_active(&self) -> bool {
        match &self.active {
            Some(run) => {
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn show_status(&mut self) {
        let s = &self.settings;
        let mut lines = vec![
            format!("Files selected: {}", self.files.len()),
            format!(
                "Backup: {}  Overwrite: {}  Recursive: {}  Max depth: {}  Show errors: {}",
                on_off(s.backup),
                on_off(s.overwrite),
                on_off(s.recursive),
                s.max_depth,
                on_off(s.show_errors)
            ),
            format!(
                "Output: {}",
                s.output()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "beside each source".to_string())
            ),
            format!("Compression: {}", self.compression),
        ];
        match &self.active {
            Some(run) => lines.push(format!("Running: [{}/{}]", run.done, run.total)),
            None => lines.push("Idle".to_string()),
        }
        self.print(&lines.join("\n"));
    }

    fn reset(&mut self) {
        if self.active.is_some() {
            self.say(LogLevel::Warning, "Stop processing before resetting.");
            return;
        }
        self.files.clear();
        self.directives = DirectiveSet::standard();
        self.compression = CompressionLevel::None;
        self.say(LogLevel::Info, "Session reset.");
    }

    /// Renders a progress event from the background batch.
    pub fn on_event(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => {
                debug!("Batch of {} started", total);
            }
            ProgressEvent::FileStarted { index, total, path } => {
                self.print(&format!("[{}/{}] {}", index, total, display_name(&path)));
            }
            ProgressEvent::Log(entry) => {
                let line = entry.tagged();
                self.log.push(entry);
                self.print(&line);
            }
            ProgressEvent::FileFinished {
                source,
                destination,
                outcome,
                ..
            } => {
                if let Some(run) = self.active.as_mut() {
                    run.done += 1;
                }
                match outcome {
                    FileOutcome::Success => self.say(
                        LogLevel::Info,
                        format!("Processed: {} -> {}", source.display(), destination.display()),
                    ),
                    FileOutcome::SizeRegression { .. } => self.say(
                        LogLevel::Warning,
                        format!(
                            "Processed (larger after compression): {} -> {}",
                            source.display(),
                            destination.display()
                        ),
                    ),
                    FileOutcome::Failure { reason } => {
                        self.say(
                            LogLevel::Error,
                            format!("Error processing: {}", source.display()),
                        );
                        if self.settings.show_errors {
                            self.say(LogLevel::Error, reason);
                        }
                    }
                }
            }
            ProgressEvent::Finished(summary) => {
                self.active = None;
                if summary.is_cancelled() {
                    self.say(LogLevel::Warning, "Processing cancelled by user.");
                } else {
                    self.say(LogLevel::Info, format!("Processing complete. {}", summary));
                }
            }
            ProgressEvent::Aborted { reason } => {
                let done = self.active.take().map(|run| run.done).unwrap_or(0);
                self.say(
                    LogLevel::Error,
                    format!("Processing failed after {} file(s): {}", done, reason),
                );
            }
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs the session on stdin until `quit`, end of input or Ctrl-C. `initial` paths are added first.
pub async fn run(
    settings_path: PathBuf,
    tools: Arc<QpdfManager>,
    initial: Vec<PathBuf>,
) -> Result<()> {
    let (tx, mut rx): (UnboundedSender<ProgressEvent>, UnboundedReceiver<ProgressEvent>) =
        mpsc::unbounded_channel();
    let mut session = Session::new(settings_path, tools, tx, Box::new(std::io::stdout()));
    session.print("PDF metadata remover. Type 'help' for commands.");
    if !initial.is_empty() {
        session.add_paths(&initial);
    }

    let lines = BufReader::new(tokio::io::stdin()).lines();
    drive(&mut session, lines, &mut rx, interrupted()).await;
    session.shut_down(&mut rx, interrupted()).await;
    Ok(())
}

/// Resolves on Ctrl-C; never when the signal cannot be watched
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Feeds input lines and progress events to `session` until it should stop.
/// Every way out (quit, end of input, a read error, `interrupt`) returns here
/// so the caller can shut down the same way.
pub async fn drive<R, F>(
    session: &mut Session,
    mut lines: Lines<R>,
    rx: &mut UnboundedReceiver<ProgressEvent>,
    interrupt: F,
) where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if session.handle_line(&line).await == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    session.say(LogLevel::Error, format!("Cannot read input: {}", e));
                    break;
                }
            },
            Some(event) = rx.recv() => session.on_event(event),
            _ = &mut interrupt => {
                session.print("Interrupted.");
                break;
            }
        }
    }
}

impl Session {
    /// Stops a running batch, waits for its current file, then saves settings.
    /// `interrupt` gives up the wait; settings are saved either way.
    pub async fn shut_down<F>(&mut self, rx: &mut UnboundedReceiver<ProgressEvent>, interrupt: F)
    where
        F: Future<Output = ()>,
    {
        if self.cancel_active() {
            self.print("Waiting for the current file to finish...");
            tokio::pin!(interrupt);
            while self.is_running() {
                tokio::select! {
                    event = rx.recv() => match event {
                        Some(event) => self.on_event(event),
                        None => break,
                    },
                    _ = &mut interrupt => {
                        self.say(LogLevel::Warning, "Stopped waiting for the current file.");
                        break;
                    }
                }
            }
        }
        self.save_settings();
    }
}
