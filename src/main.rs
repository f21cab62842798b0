use altid::artifact::CaptureArtifact;
use altid::camera::{self, CameraCapture, PreviewSink};
use altid::workflow::{
    CaptureOutcome, Navigator, Step, SubmitOutcome, VerificationResult, VerificationWorkflow,
    FAILURE_LOG_TARGET,
};
use altid::{
    AltidConfig, CameraCommand, CameraStatus, FrameData, HttpVerificationClient,
    KeyboardInputHandler,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "altid")]
#[command(about = "Identity verification client with document upload and selfie capture")]
#[command(version)]
#[command(long_about = "Runs an identity verification session against an AltID backend. \
The identity document and the selfie are read from files or, for the selfie, captured \
from a local camera. On success the backend's redirect target and credential are printed.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "altid.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Callback URL of the site requesting verification
    #[arg(long, value_name = "URL", help = "Callback URL supplied by the requesting site")]
    callback: Option<String>,

    /// Identity document to upload
    #[arg(long, value_name = "PATH", help = "Identity document image to upload")]
    document: Option<PathBuf>,

    /// Selfie image to upload
    #[arg(long, value_name = "PATH", help = "Selfie image to upload instead of using the camera")]
    selfie: Option<PathBuf>,

    /// Capture the selfie from the local camera
    #[arg(long, help = "Capture the selfie from the local camera")]
    camera: bool,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Fetch the backend's token signing key and exit
    #[arg(long, help = "Print the backend's public key (PEM) and exit")]
    print_public_key: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

/// Prints the redirect target in place of a browser navigation
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, url: &str) {
        println!("→ Redirecting to {}", url);
    }
}

/// Preview sink for terminals: reports the stream and counts frames
#[derive(Default)]
struct TerminalPreview {
    frames: AtomicU64,
}

impl PreviewSink for TerminalPreview {
    fn attach(&self, resolution: (u32, u32)) {
        self.frames.store(0, Ordering::Relaxed);
        println!("Camera preview {}x{}", resolution.0, resolution.1);
    }

    fn present(&self, frame: &FrameData) {
        let count = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 10 == 0 {
            debug!("Preview frame {} ({} bytes)", frame.id, frame.data.len());
        }
    }

    fn detach(&self) {
        debug!(
            "Camera preview closed after {} frames",
            self.frames.load(Ordering::Relaxed)
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let config = AltidConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    let failure_log_guard = init_logging(&args, &config)?;

    info!("Starting AltID client v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                drop(failure_log_guard);
                std::process::exit(1);
            }
        }
    }

    config.validate().context("Invalid configuration")?;

    let client = Arc::new(HttpVerificationClient::new(&config.backend)?);

    if args.print_public_key {
        let key = client.fetch_public_key().await?;
        println!("{}", key.trim_end());
        return Ok(());
    }

    let mut builder = VerificationWorkflow::builder()
        .config(&config)
        .callback_url(args.callback.clone())
        .backend(client)
        .navigator(Arc::new(ConsoleNavigator));

    if args.camera && args.selfie.is_none() {
        let device = camera::default_device(&config.camera);
        info!("Using camera backend '{}'", device.name());
        builder = builder.camera(
            CameraCapture::new(device, config.camera.clone())
                .with_preview(Arc::new(TerminalPreview::default())),
        );
    }

    let workflow = builder.build()?;

    let mut events = workflow.subscribe();
    let event_logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!("{}", event.description());
        }
    });

    let outcome = run(&workflow, &args).await;
    workflow.shutdown();
    event_logger.abort();
    outcome?;

    let exit_code = match workflow.result() {
        Some(VerificationResult::Success { credential, .. }) => {
            println!("✓ Verification complete");
            println!("Credential: {}", credential.as_str());
            0
        }
        Some(VerificationResult::Failure { reason }) => {
            eprintln!("✗ Verification failed: {}", reason);
            1
        }
        None => {
            eprintln!("Verification not finished (step {})", workflow.step());
            2
        }
    };

    info!("AltID client exited with code: {}", exit_code);
    // Flush the failure log before exiting
    drop(failure_log_guard);
    std::process::exit(exit_code);
}

/// Drive the workflow from start to a terminal step or until input runs out
async fn run(workflow: &VerificationWorkflow, args: &Args) -> Result<()> {
    match workflow.start().await {
        Ok(SubmitOutcome::Advanced(_)) => {}
        Ok(SubmitOutcome::Rejected(failure)) => {
            eprintln!("✗ {}", failure);
            return Ok(());
        }
        Ok(SubmitOutcome::Ignored) => {}
        // Missing callback: the workflow is already failed and reports it
        Err(e) => {
            error!("Cannot start verification: {}", e);
            return Ok(());
        }
    }

    let mut document_path = args.document.clone();
    while workflow.step() == Step::AwaitingDocument {
        let Some(artifact) = next_artifact(document_path.take(), "Identity document").await? else {
            return Ok(());
        };

        workflow.select_document(artifact)?;
        report(workflow.submit_document().await?);
    }

    let mut selfie_path = args.selfie.clone();
    let mut use_camera = workflow.has_camera();
    while workflow.step() == Step::AwaitingSelfie {
        if use_camera {
            if capture_live_selfie(workflow).await? != LiveCapture::Captured {
                use_camera = false;
                continue;
            }
        } else {
            let Some(artifact) = next_artifact(selfie_path.take(), "Selfie").await? else {
                return Ok(());
            };
            workflow.select_selfie(artifact)?;
        }

        report(workflow.submit_selfie().await?);
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum LiveCapture {
    Captured,
    Cancelled,
    Unavailable,
}

/// Open the camera and wait for a capture or cancel key
async fn capture_live_selfie(workflow: &VerificationWorkflow) -> Result<LiveCapture> {
    if workflow.open_camera().await? != CameraStatus::Active {
        if let Some(failure) = workflow.snapshot().error {
            eprintln!("✗ {} - falling back to file upload", failure);
        }
        return Ok(LiveCapture::Unavailable);
    }

    println!("Camera active - press SPACE to capture, ESC to cancel");
    let keyboard = KeyboardInputHandler::new();
    let mut commands = keyboard.start().await?;
    let command = commands.recv().await;
    keyboard.stop().await?;

    match command {
        Some(CameraCommand::Capture) => match workflow.capture_selfie()? {
            CaptureOutcome::Captured { size } => {
                println!("✓ Selfie captured ({} bytes)", size);
                Ok(LiveCapture::Captured)
            }
            CaptureOutcome::Failed(failure) => {
                eprintln!("✗ {} - falling back to file upload", failure);
                Ok(LiveCapture::Unavailable)
            }
        },
        Some(CameraCommand::Cancel) | None => {
            workflow.cancel_camera();
            println!("Camera closed");
            Ok(LiveCapture::Cancelled)
        }
    }
}

fn report(outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Advanced(step) => println!("✓ Accepted, now {}", step),
        SubmitOutcome::Rejected(failure) => eprintln!("✗ {}", failure),
        SubmitOutcome::Ignored => debug!("Submission already in flight"),
    }
}

/// Load the given file, or prompt until a readable one is supplied.
///
/// Returns `None` when standard input is closed.
async fn next_artifact(path: Option<PathBuf>, label: &str) -> Result<Option<CaptureArtifact>> {
    let mut path = path;
    loop {
        let candidate = match path.take() {
            Some(path) => path,
            None => match prompt(&format!("{} path: ", label)).await? {
                Some(line) if line.is_empty() => continue,
                Some(line) => PathBuf::from(line),
                None => return Ok(None),
            },
        };

        match load_artifact(&candidate).await {
            Ok(artifact) => return Ok(Some(artifact)),
            Err(e) => eprintln!("✗ {}", e),
        }
    }
}

async fn load_artifact(path: &Path) -> Result<CaptureArtifact> {
    let artifact = CaptureArtifact::from_file(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    if artifact.is_empty() {
        anyhow::bail!("{} is empty", path.display());
    }
    Ok(artifact)
}

async fn prompt(label: &str) -> Result<Option<String>> {
    let label = label.to_string();
    let line = tokio::task::spawn_blocking(move || -> std::io::Result<Option<String>> {
        print!("{}", label);
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    })
    .await??;

    Ok(line)
}

fn init_logging(args: &Args, config: &AltidConfig) -> Result<Option<WorkerGuard>> {
    use tracing::Level;
    use tracing_subscriber::{
        filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    };

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("altid={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    // Failed attempts go to their own file regardless of the console level
    let (failure_layer, guard) = if config.logging.log_failed_attempts {
        let path = Path::new(&config.logging.failure_log);
        let directory = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .context("Failure log path has no file name")?;

        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_filter(Targets::new().with_target(FAILURE_LOG_TARGET, Level::WARN));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .with(failure_layer)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# AltID Configuration File");
    println!("# Every value can be overridden with ALTID__<SECTION>__<KEY> environment variables");
    println!();
    println!("{}", toml::to_string_pretty(&AltidConfig::default())?);
    Ok(())
}
