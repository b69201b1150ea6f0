//! cpuhog: top CPU consumer monitor for status bars.
//!
//! Runs the platform's per-process sampler and prints one line per
//! reporting period, empty while the machine is below the threshold.

use anyhow::Context;
use clap::Parser;
use cpuhog_core::{GlobalConfig, LineSensor};
use cpuhog_top_cpu::{PlatformProfile, Sampler, Shutdown, TopCpuSensor};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the top-CPU sensor.
#[derive(Parser)]
#[command(name = "cpuhog")]
#[command(about = "Prints the command using the most CPU, once per sampling period")]
#[command(version)]
#[command(author)]
struct Args {
    /// Log diagnostics (including per-period readings) to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Sampling period in seconds
    #[arg(
        value_parser = validate_period,
        required_unless_present_any = ["check", "generate_config"]
    )]
    period: Option<u64>,

    /// Total CPU percentage below which an empty line is printed
    #[arg(
        value_parser = validate_threshold,
        required_unless_present_any = ["check", "generate_config"]
    )]
    threshold: Option<f64>,

    /// Verify the sampler and core count are available and exit
    #[arg(long)]
    check: bool,

    /// Generate example config file and exit
    #[arg(long)]
    generate_config: bool,
}

/// Validate that the period is a whole number of seconds, at least one.
fn validate_period(s: &str) -> Result<u64, String> {
    let period = s
        .parse::<u64>()
        .map_err(|_| "Period must be a positive integer".to_owned())?;

    if period == 0 {
        return Err("Period must be at least 1 second".to_owned());
    }

    Ok(period)
}

/// Validate that the threshold is a non-negative percentage.
fn validate_threshold(s: &str) -> Result<f64, String> {
    let threshold = s
        .parse::<f64>()
        .map_err(|_| "Threshold must be a number".to_owned())?;

    if !threshold.is_finite() || threshold < 0.0 {
        return Err("Threshold must be a non-negative number".to_owned());
    }

    Ok(threshold)
}

fn init_logging(verbose: bool, configured: Option<&str>) {
    let fallback = if verbose {
        "debug"
    } else {
        configured.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn generate_config() -> ExitCode {
    let Some(config_path) = GlobalConfig::default_config_path() else {
        eprintln!("Could not determine config directory");
        return ExitCode::FAILURE;
    };

    match GlobalConfig::save_example_config_to_file(&config_path) {
        Ok(()) => {
            println!("Generated example config at: {}", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to write {}: {}", config_path.display(), e);
            ExitCode::FAILURE
        }
    }
}

fn publish(line: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()
}

fn check(config: &GlobalConfig) -> anyhow::Result<()> {
    let profile = PlatformProfile::resolve(config)?;
    let sensor = TopCpuSensor::new(profile, 0.0)?;
    sensor.check_availability()?;

    let profile = sensor.profile();
    println!(
        "{} sensor is available: {} on {}, {} logical cores",
        sensor.name(),
        profile.sampler().display(),
        profile.platform(),
        profile.core_count()
    );
    Ok(())
}

async fn monitor(config: &GlobalConfig, period: u64, threshold: f64) -> anyhow::Result<()> {
    let profile = PlatformProfile::resolve(config)?;
    let mut sensor =
        TopCpuSensor::new(profile, threshold)?.with_label_width(config.label_width);
    let spec = sensor.profile().launch_spec(period);

    let mut shutdown = Shutdown::install().context("cannot install signal handlers")?;
    let mut sampler = Sampler::spawn(&spec)?;

    loop {
        tokio::select! {
            biased;

            signal = shutdown.recv() => {
                info!(signal, sampler = sampler.program(), "shutting down");
                sampler.shutdown().await?;
                return Ok(());
            }
            line = sampler.next_line() => match line? {
                Some(line) => {
                    if let Some(output) = sensor.feed(&line) {
                        publish(&output).context("cannot write to stdout")?;
                    }
                }
                None => return Err(sampler.exit_error().await.into()),
            },
        }
    }
}

/// Main entry point for the top-CPU sensor.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.generate_config {
        return generate_config();
    }

    let (config, config_error) = match GlobalConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (GlobalConfig::default(), Some(e)),
    };

    init_logging(args.verbose, config.log_filter.as_deref());
    if let Some(e) = config_error {
        warn!(error = %e, "ignoring config file, using defaults");
    }

    // clap rejects a missing PERIOD or THRESHOLD unless --check is given
    let result = match (args.period, args.threshold) {
        (Some(period), Some(threshold)) if !args.check => {
            monitor(&config, period, threshold).await
        }
        _ => check(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_validate_period() {
        assert_eq!(validate_period("5"), Ok(5));
        assert!(validate_period("0").is_err());
        assert!(validate_period("-1").is_err());
        assert!(validate_period("1.5").is_err());
    }

    #[test]
    fn test_validate_threshold() {
        assert_eq!(validate_threshold("20"), Ok(20.0));
        assert_eq!(validate_threshold("0"), Ok(0.0));
        assert_eq!(validate_threshold("12.5"), Ok(12.5));
        assert!(validate_threshold("-3").is_err());
        assert!(validate_threshold("inf").is_err());
        assert!(validate_threshold("lots").is_err());
    }

    #[test]
    fn test_positional_arguments() {
        let args = Args::try_parse_from(["cpuhog", "-v", "2", "15"]).unwrap();
        assert!(args.verbose);
        assert_eq!(args.period, Some(2));
        assert_eq!(args.threshold, Some(15.0));
    }

    #[test]
    fn test_missing_arguments_is_usage_error() {
        let err = Args::try_parse_from(["cpuhog"]).err().unwrap();
        assert_eq!(err.exit_code(), 2);

        let err = Args::try_parse_from(["cpuhog", "2"]).err().unwrap();
        assert_eq!(err.exit_code(), 2);

        let err = Args::try_parse_from(["cpuhog", "2", "15", "extra"]).err().unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_check_needs_no_positionals() {
        let args = Args::try_parse_from(["cpuhog", "--check"]).unwrap();
        assert!(args.check);
        assert_eq!(args.period, None);
    }
}
