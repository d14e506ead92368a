use clap::Parser;
use log::info;
use motion_sentry::camera::{CaptureNamer, StillCamera};
use motion_sentry::config::{self, Config, SensorConfig};
use motion_sentry::input::simulation::SimulatedMotion;
use motion_sentry::instance_lock::InstanceLock;
use motion_sentry::sensors::{MotionInput, PinNumbering, Pull};
use motion_sentry::{Result, Sentry, SentryError, SentryStats};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Camera spool directory, created inside the capture directory.
const SPOOL_DIR: &str = ".motion-sentry";

#[derive(Parser)]
#[command(name = "motion-sentry")]
#[command(about = "Capture a still whenever the PIR motion sensor fires")]
struct Cli {
    /// Sensor pin, in the selected numbering scheme
    #[arg(long)]
    pin: Option<u8>,

    /// Pin numbering scheme: board or bcm
    #[arg(long)]
    numbering: Option<PinNumbering>,

    /// Pull resistor on the sensor pin: none, up or down
    #[arg(long)]
    pull: Option<Pull>,

    /// Directory captures are written to
    #[arg(long)]
    capture_dir: Option<PathBuf>,

    /// Still-capture command (rpicam-still, libcamera-still, ...)
    #[arg(long)]
    camera_command: Option<String>,

    /// Wait after a detection before polling again, in milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Wait between polls while idle, in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Use a simulated sensor that fires every SECS seconds instead of GPIO
    #[arg(long, value_name = "SECS")]
    simulate: Option<u64>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(pin) = self.pin {
            config.sensor.pin = pin;
        }
        if let Some(numbering) = self.numbering {
            config.sensor.numbering = numbering;
        }
        if let Some(pull) = self.pull {
            config.sensor.pull = pull;
        }
        if let Some(dir) = &self.capture_dir {
            config.capture.dir = dir.clone();
        }
        if let Some(command) = &self.camera_command {
            config.camera.command = command.clone();
        }
        if let Some(ms) = self.debounce_ms {
            config.timing.debounce_ms = ms;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.timing.poll_interval_ms = ms;
        }
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file before anything else
    config::load_dotenv();
    init_logger();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli, |key| std::env::var(key).ok())?;

    if cli.print_config {
        println!("{}", render_config(&config)?);
        return Ok(());
    }

    info!("Starting motion sentry");
    info!("  Sensor: {} pin {}", config.sensor.numbering, config.sensor.pin);
    info!("  Camera: {}", config.camera.command);
    info!("  Captures: {}", config.capture.dir.display());

    let _lock = InstanceLock::acquire()?;

    prepare_capture_dir(&config.capture.dir).await?;
    let spool_dir = config.capture.dir.join(SPOOL_DIR);
    let camera = StillCamera::open(config.camera.clone(), spool_dir).await?;
    let namer = CaptureNamer::new(&config.capture.dir, &config.capture.file_prefix);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let stats = match cli.simulate {
        Some(secs) => watch(simulated_input(secs), camera, namer, &config, cancel).await,
        None => {
            let input = open_sensor(&config.sensor)?;
            watch(input, camera, namer, &config, cancel).await
        }
    };

    info!(
        "Motion sentry stopped ({} captures, {} failed)",
        stats.captures, stats.capture_failures
    );
    Ok(())
}

/// Defaults, then environment (via `lookup`), then CLI flags.
fn load_config<F>(cli: &Cli, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::from_lookup(lookup);
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn render_config(config: &Config) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

async fn prepare_capture_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        SentryError::DeviceInit(format!(
            "cannot create capture directory {}: {}",
            dir.display(),
            e
        ))
    })
}

fn simulated_input(secs: u64) -> SimulatedMotion {
    SimulatedMotion::pulses(Duration::from_secs(secs.max(1)))
}

async fn watch<I: MotionInput>(
    input: I,
    camera: StillCamera,
    namer: CaptureNamer,
    config: &Config,
    cancel: CancellationToken,
) -> SentryStats {
    Sentry::new(input, camera, namer, config.timing)
        .run(cancel)
        .await
}

#[cfg(feature = "rpi")]
fn open_sensor(config: &SensorConfig) -> Result<motion_sentry::sensors::PirSensor> {
    motion_sentry::sensors::PirSensor::open(config)
}

#[cfg(not(feature = "rpi"))]
fn open_sensor(_config: &SensorConfig) -> Result<SimulatedMotion> {
    Err(SentryError::DeviceInit(
        "built without GPIO support (enable the `rpi` feature or pass --simulate)".to_string(),
    ))
}

async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }

    info!("Received shutdown signal");
    cancel.cancel();
}
