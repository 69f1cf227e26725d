//! QR Reader CLI
//!
//! Opens a frame source, runs one scan session and prints the confirmed
//! payload on stdout.

use clap::{Parser, Subcommand};
use qr_reader::{
    capture::{Camera, FileConfig, ImageSequenceCamera},
    decoding::RqrrDecoder,
    metrics::{MetricsRegistry, MetricsSnapshot},
    session::{finish_pumped, pump_frames, Scanner},
    torch::{Flash, LoggingTorch},
    ScanError,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How long to wait for in-flight frames after the source runs dry.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "qr-reader", version, about = "Scan a QR code from a camera or image files")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Consecutive identical reads required to accept a payload
    #[arg(long, global = true)]
    confirmations: Option<u32>,

    /// Give up after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long, global = true)]
    metrics: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Feed image files to the scanner as camera frames
    Images {
        /// Image files, played in order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Clockwise rotation to apply to every frame (0, 90, 180, 270)
        #[arg(long, default_value_t = 0)]
        rotation: u32,

        /// Times to replay the sequence
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },

    /// Scan from a camera device
    #[cfg(feature = "camera")]
    Camera {
        /// Camera device index (overrides the config file)
        #[arg(long)]
        device: Option<u32>,

        /// Toggle the torch once the camera is open
        #[arg(long)]
        torch: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!("QR Reader v{}", qr_reader::VERSION);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };
    process::exit(code);
}

fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    if let Some(confirmations) = cli.confirmations {
        config.scanner.required_confirmations = confirmations;
    }
    if let Some(timeout) = cli.timeout {
        config.scanner.session_timeout_secs = timeout;
    }

    let (mut camera, toggle_torch) = match cli.command {
        Command::Images {
            paths,
            rotation,
            repeat,
        } => (
            Box::new(
                ImageSequenceCamera::new(paths)
                    .with_rotation(rotation)
                    .with_repeat(repeat),
            ) as Box<dyn Camera>,
            false,
        ),
        #[cfg(feature = "camera")]
        Command::Camera { device, torch } => {
            if let Some(device) = device {
                config.capture.device_id = device;
            }
            (
                Box::new(qr_reader::capture::NokhwaCamera::new()) as Box<dyn Camera>,
                torch,
            )
        }
    };
    config.validate()?;

    camera.open(&config.capture)?;

    let mut flash = Flash::new(Box::new(LoggingTorch), config.torch.initial_state());
    if toggle_torch {
        flash.toggle();
    }

    let scanner = Scanner::new(Arc::new(RqrrDecoder::new()), &config.scanner);
    let session = scanner.start();

    let canceller = session.canceller();
    if let Err(e) = ctrlc::set_handler(move || {
        if canceller.cancel() {
            eprintln!("Scan cancelled");
        }
    }) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let deadline = config
        .scanner
        .session_timeout()
        .map(|timeout| Instant::now() + timeout);
    let pumped = pump_frames(
        camera.as_mut(),
        &session,
        config.capture.frame_interval(),
        deadline,
    );
    camera.close();

    if let Ok(summary) = &pumped {
        info!(
            frames = summary.frames_pushed,
            stalls = summary.stalls,
            "Capture finished"
        );
    }
    let outcome = finish_pumped(session, pumped, DRAIN_GRACE)?;

    if cli.metrics {
        let registry = MetricsRegistry::new()?;
        registry.update(&MetricsSnapshot::from_components(
            scanner.ingest_stats(),
            scanner.session_stats(),
            flash.state(),
        ));
        eprint!("{}", registry.encode()?);
    }

    match outcome {
        Ok(result) => {
            info!(
                confirmations = result.confirmations(),
                at = %result.confirmed_at().to_rfc3339(),
                "QR code read"
            );
            println!("{}", result.payload());
            Ok(0)
        }
        Err(ScanError::Cancelled) => {
            eprintln!("QR reading aborted");
            Ok(2)
        }
        Err(ScanError::TimedOut) => {
            eprintln!("No QR code confirmed");
            Ok(2)
        }
    }
}
