//! Levelcounter - level-crossing edge counter
//!
//! Entry point for the command-line monitor.

use anyhow::{bail, Context, Result};
use levelcounter::audio::signal::Waveform;
use levelcounter::monitor::Monitor;
use levelcounter::CounterConfig;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{error, info};

/// Command-line options layered over the config file
#[derive(Debug, Default)]
struct Options {
    config_path: Option<PathBuf>,
    save_config: bool,
    duration: Option<Duration>,
    level: Option<f32>,
    cutoff_hz: Option<f32>,
    frequency: Option<f64>,
    noise: Option<f32>,
    waveform: Option<Waveform>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("levelcounter=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args)? {
        Some(options) => options,
        None => return Ok(()),
    };

    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(default_config_path);
    let mut config = CounterConfig::load(&config_path);
    apply_overrides(&mut config, &options);

    if options.save_config {
        config
            .save(&config_path)
            .with_context(|| format!("Failed to save config to {}", config_path.display()))?;
    }

    println!(
        "Levelcounter v{} (built {})",
        levelcounter::VERSION,
        levelcounter::BUILD_DATE
    );
    println!(
        "Level: {} | Cutoff: {} Hz | Signal: {:?} {} Hz, noise {}",
        config.level,
        config.cutoff_hz,
        config.signal.waveform,
        config.signal.frequency,
        config.signal.noise
    );
    println!("Press Ctrl+C to stop.");
    println!("────────────────────────────────────────");

    let monitor = Monitor::new(config)?;

    let running = monitor.stop_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        error!("Failed to install Ctrl+C handler: {}", e);
    }

    let summary = monitor.run_with(options.duration, |measurement, edge| {
        println!(
            "Edges: {:>6} | Rate: {:>8.2} Hz | Edge: {}",
            measurement.edges, measurement.rate_hz, edge
        );
    })?;

    println!("────────────────────────────────────────");
    info!(samples = summary.samples_processed, "Run complete");
    if let Some(expected) = summary.expected_edges {
        println!(
            "Counted {} edges ({} half-cycle boundaries in signal)",
            summary.stats.stats().total_edges,
            expected
        );
    }
    println!("{}", summary.to_json()?);

    Ok(())
}

/// Default config location: `<config_dir>/levelcounter/config.json`
fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("levelcounter")
        .join("config.json")
}

fn apply_overrides(config: &mut CounterConfig, options: &Options) {
    if let Some(level) = options.level {
        config.level = level;
    }
    if let Some(cutoff_hz) = options.cutoff_hz {
        config.cutoff_hz = cutoff_hz;
    }
    if let Some(frequency) = options.frequency {
        config.signal.frequency = frequency;
    }
    if let Some(noise) = options.noise {
        config.signal.noise = noise;
    }
    if let Some(waveform) = options.waveform {
        config.signal.waveform = waveform;
    }
}

/// Parse arguments; `None` means the invocation was fully handled (help/version)
fn parse_args(args: &[String]) -> Result<Option<Options>> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("levelcounter {}", levelcounter::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            "--save-config" => options.save_config = true,
            "--config" | "-c" => {
                options.config_path = Some(PathBuf::from(value(&mut iter, arg)?));
            }
            "--duration" | "-d" => {
                let secs: f64 = parse_value(&mut iter, arg)?;
                if !secs.is_finite() || secs < 0.0 {
                    bail!("--duration must be a non-negative number of seconds");
                }
                options.duration = Some(Duration::from_secs_f64(secs));
            }
            "--level" | "-l" => options.level = Some(parse_value(&mut iter, arg)?),
            "--cutoff" => options.cutoff_hz = Some(parse_value(&mut iter, arg)?),
            "--frequency" | "-f" => options.frequency = Some(parse_value(&mut iter, arg)?),
            "--noise" | "-n" => options.noise = Some(parse_value(&mut iter, arg)?),
            "--waveform" | "-w" => {
                options.waveform = Some(match value(&mut iter, arg)? {
                    "square" => Waveform::Square,
                    "sine" => Waveform::Sine,
                    other => bail!("Unknown waveform: {} (expected square or sine)", other),
                });
            }
            other => {
                print_help();
                bail!("Unknown argument: {}", other);
            }
        }
    }

    Ok(Some(options))
}

fn value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> Result<&'a str> {
    iter.next()
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", flag))
}

fn parse_value<T>(iter: &mut std::slice::Iter<'_, String>, flag: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = value(iter, flag)?;
    raw.parse()
        .with_context(|| format!("Invalid value for {}: {}", flag, raw))
}

fn print_help() {
    println!("Usage: levelcounter [OPTIONS]");
    println!();
    println!("Options:");
    println!(
        "  -c, --config PATH        Config file (default: <config dir>/levelcounter/config.json)"
    );
    println!("      --save-config        Write the effective config back to the config file");
    println!("  -d, --duration SECS      Stop after SECS seconds (default: run until Ctrl+C)");
    println!("  -l, --level LEVEL        Threshold level");
    println!("      --cutoff HZ          Low-pass cutoff frequency");
    println!("  -f, --frequency HZ       Test signal frequency");
    println!("  -w, --waveform SHAPE     Test signal shape: square or sine");
    println!("  -n, --noise AMPLITUDE    Peak white-noise amplitude added to the signal");
    println!("  -v, --version            Show version");
    println!("  -h, --help               Show this help");
    println!();
    println!("Examples:");
    println!("  levelcounter -f 50 -n 0.3 --cutoff 200 -d 10");
    println!("  levelcounter -w sine -l 0.25 --save-config");
}
