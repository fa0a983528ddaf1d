//! Surveil Agent CLI
//!
//! Detection-triggered recording and alerting for live video.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use surveil_agent::{
    config::{Config, NotificationConfig},
    core::SystemClock,
    detect::{Detector, Target},
    display::HeadlessDisplay,
    notify::{LogTransport, Notifier, Recipients, Transport},
    pipeline::{ExitReason, Pipeline, PipelineParts},
    recording::{MjpegSinkFactory, Recorder, RecorderConfig},
    source::ImageSequenceSource,
    stats::create_shared_stats_with_persistence,
    VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "surveil")]
#[command(version = VERSION)]
#[command(about = "Record and alert when a target object appears on camera", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start watching a frame stream
    Start {
        /// Directory of frames to watch, read in file-name order
        #[arg(long)]
        frames: PathBuf,

        /// The object to detect (default from config: person)
        #[arg(short = 'o', long)]
        target: Option<String>,

        /// Run detection on every n-th frame
        #[arg(short = 'f', long)]
        frame_skip: Option<u64>,

        /// Duration of each recording in seconds
        #[arg(short = 'd', long)]
        record_duration: Option<u64>,

        /// Inference endpoint of the detection service
        #[arg(long)]
        detector_url: Option<String>,

        /// Where recordings are written
        #[arg(long)]
        recording_dir: Option<PathBuf>,
    },

    /// Show cumulative activity
    Status,

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            frames,
            target,
            frame_skip,
            record_duration,
            detector_url,
            recording_dir,
        } => {
            let overrides = Overrides {
                target,
                frame_skip,
                record_duration,
                detector_url,
                recording_dir,
            };
            if let Err(e) = cmd_start(frames, overrides) {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Config { init } => {
            cmd_config(init);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Command-line values that take precedence over the config file.
struct Overrides {
    target: Option<String>,
    frame_skip: Option<u64>,
    record_duration: Option<u64>,
    detector_url: Option<String>,
    recording_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(target) = self.target {
            config.target_object = target;
        }
        if let Some(skip) = self.frame_skip {
            config.frame_skip = skip;
        }
        if let Some(secs) = self.record_duration {
            config.record_duration = Duration::from_secs(secs);
        }
        if let Some(url) = self.detector_url {
            config.detector_url = Some(url);
        }
        if let Some(dir) = self.recording_dir {
            config.recording_dir = dir;
        }
    }
}

fn cmd_start(frames: PathBuf, overrides: Overrides) -> anyhow::Result<()> {
    println!("Surveil Agent v{VERSION}");
    println!();

    let mut config = Config::load().context("Could not load configuration")?;
    config
        .apply_env()
        .context("Invalid mail settings in environment")?;
    overrides.apply(&mut config);
    config.validate()?;
    config
        .ensure_directories()
        .context("Could not create output directories")?;

    let target = Target::new(&config.target_object);
    let source = ImageSequenceSource::open(&frames)?;
    let detector = create_detector(&config)?;
    let (transport, recipients) = create_transport(config.notification.as_ref())?;

    println!("Monitoring for '{target}'...");
    println!("  Frames: {}", frames.display());
    println!("  Frame skip: {}", config.frame_skip);
    println!("  Record duration: {}s", config.record_duration.as_secs());
    println!("  Recordings: {}", config.recording_dir.display());
    println!(
        "  Alerts: {}",
        if config.notification.is_some() {
            "email"
        } else {
            "log only"
        }
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stats = create_shared_stats_with_persistence(config.stats_path());
    let recorder = Recorder::new(
        RecorderConfig {
            output_dir: config.recording_dir.clone(),
            duration: chrono::Duration::from_std(config.record_duration)
                .context("record_duration out of range")?,
            fps: config.recording_fps,
        },
        Box::new(MjpegSinkFactory::default()),
    );
    let notifier = Notifier::new(transport, recipients).context("Could not start notifier")?;

    let parts = PipelineParts {
        source: Box::new(source),
        detector,
        display: Box::new(HeadlessDisplay::with_snapshot(config.snapshot_path())),
        recorder,
        notifier,
        clock: Arc::new(SystemClock),
        stats: stats.clone(),
    };
    let mut pipeline = Pipeline::new(target, config.frame_skip, parts)?
        .with_notify_grace(Duration::from_secs(config.notify_grace_secs));

    let stop = Arc::new(AtomicBool::new(false));
    ctrlc_handler(stop.clone())?;

    let reason = pipeline.run(&stop);
    drop(pipeline);

    println!();
    match reason {
        ExitReason::Stopped => println!("Stopped."),
        ExitReason::SourceExhausted => println!("No more frames."),
        ExitReason::SourceFailed(e) => eprintln!("Frame source failed: {e}"),
    }

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save session stats: {e}");
    }

    println!();
    println!("{}", stats.summary());
    Ok(())
}

#[cfg(feature = "remote-detector")]
fn create_detector(config: &Config) -> anyhow::Result<Box<dyn Detector>> {
    use surveil_agent::detect::{RemoteDetector, RemoteDetectorConfig};

    let url = config
        .detector_url
        .clone()
        .context("No detector configured: pass --detector-url or set detector_url")?;
    let detector = RemoteDetector::new(RemoteDetectorConfig {
        url,
        timeout: Duration::from_secs(config.detector_timeout_secs),
        inference_size: config.inference_size,
    })?;
    println!("  Detector: {}", detector.url());
    Ok(Box::new(detector))
}

#[cfg(not(feature = "remote-detector"))]
fn create_detector(_config: &Config) -> anyhow::Result<Box<dyn Detector>> {
    anyhow::bail!("No detector available (remote-detector feature not enabled at compile time)")
}

#[cfg(feature = "smtp")]
fn create_transport(
    notification: Option<&NotificationConfig>,
) -> anyhow::Result<(Arc<dyn Transport>, Recipients)> {
    match notification {
        Some(n) => {
            let transport = surveil_agent::notify::SmtpTransport::new(n)?;
            println!("  Mail server: {}:{}", transport.host(), n.smtp_port);
            Ok((Arc::new(transport), recipients_for(n)))
        }
        None => Ok((Arc::new(LogTransport), log_recipients())),
    }
}

#[cfg(not(feature = "smtp"))]
fn create_transport(
    notification: Option<&NotificationConfig>,
) -> anyhow::Result<(Arc<dyn Transport>, Recipients)> {
    match notification {
        Some(n) => {
            eprintln!("Warning: mail settings ignored (smtp feature not enabled at compile time)");
            Ok((Arc::new(LogTransport), recipients_for(n)))
        }
        None => Ok((Arc::new(LogTransport), log_recipients())),
    }
}

fn recipients_for(notification: &NotificationConfig) -> Recipients {
    Recipients {
        from: notification.sender_address.clone(),
        to: notification.receiver_address.clone(),
    }
}

fn log_recipients() -> Recipients {
    Recipients {
        from: "surveil-agent".to_string(),
        to: "operator".to_string(),
    }
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Surveil Agent Status");
    println!("====================");
    println!();
    println!("Configuration:");
    println!("  Target: {}", config.target_object);
    println!("  Frame skip: {}", config.frame_skip);
    println!("  Record duration: {}s", config.record_duration.as_secs());
    println!("  Recordings: {}", config.recording_dir.display());
    println!();

    let recordings = std::fs::read_dir(&config.recording_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with("detected_"))
                .filter(|e| {
                    e.path()
                        .extension()
                        .map(|ext| ext != "json")
                        .unwrap_or(false)
                })
                .count()
        })
        .unwrap_or(0);
    println!("Recordings on disk: {recordings}");
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                for key in [
                    "frames_read",
                    "frames_sampled",
                    "detector_failures",
                    "episodes",
                    "alerts_dispatched",
                    "alerts_sent",
                    "alerts_failed",
                    "recordings_started",
                    "recordings_saved",
                ] {
                    if let Some(value) = stats.get(key) {
                        println!("  {}: {value}", key.replace('_', " "));
                    }
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config(init: bool) {
    let config = Config::load().unwrap_or_default();

    if init {
        if let Err(e) = config.save() {
            eprintln!("Error saving config: {e}");
            std::process::exit(1);
        }
        println!("Configuration written to {:?}", Config::config_path());
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();

    let mut value = serde_json::to_value(&config).unwrap_or(serde_json::Value::Null);
    if let Some(secret) = value.pointer_mut("/notification/sender_secret") {
        *secret = serde_json::Value::String("<redacted>".to_string());
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
