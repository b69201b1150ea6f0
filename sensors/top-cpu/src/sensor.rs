//! The top-CPU line sensor: sampler lines in, bar lines out.

use crate::accumulator::Accumulator;
use crate::parser::ParsedLine;
use crate::platform::PlatformProfile;
use cpuhog_core::{GlobalConfig, LineSensor, SensorError};
use tracing::{debug, enabled, trace, Level};

/// Sensor reporting the heaviest command and the machine total.
///
/// # Examples
///
/// ```rust
/// use cpuhog_core::LineSensor;
/// use cpuhog_top_cpu::{Platform, PlatformProfile, TopCpuSensor};
///
/// let profile = PlatformProfile::new(Platform::MacOs, 2, "/usr/bin/top")?;
/// let mut sensor = TopCpuSensor::new(profile, 10.0)?;
///
/// assert_eq!(sensor.feed("30.0 rustc"), None);
/// assert_eq!(sensor.feed("%CPU COMMAND").as_deref(), Some("       rustc   15% /  15%"));
/// # Ok::<(), cpuhog_core::SensorError>(())
/// ```
#[derive(Debug)]
pub struct TopCpuSensor {
    name: String,
    profile: PlatformProfile,
    threshold: f64,
    label_width: usize,
    accumulator: Accumulator,
    periods: u64,
}

impl TopCpuSensor {
    /// Create a sensor that hides itself while the total is below
    /// `threshold` percent.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `threshold` is negative or not finite.
    pub fn new(profile: PlatformProfile, threshold: f64) -> Result<Self, SensorError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(SensorError::config_with_value(
                "Threshold must be a non-negative number",
                threshold.to_string(),
            ));
        }

        Ok(Self {
            name: "top-cpu".to_owned(),
            profile,
            threshold,
            label_width: GlobalConfig::DEFAULT_LABEL_WIDTH,
            accumulator: Accumulator::new(),
            periods: 0,
        })
    }

    /// Override the column budget for the command label.
    #[must_use]
    pub fn with_label_width(mut self, label_width: usize) -> Self {
        self.label_width = label_width.max(1);
        self
    }

    /// The profile this sensor parses and normalizes with.
    #[must_use]
    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Readings gathered in the current, still open period.
    #[must_use]
    pub fn pending(&self) -> &Accumulator {
        &self.accumulator
    }

    /// Close the current period.
    ///
    /// Returns `None` if nothing was recorded since the last flush, so a run
    /// of boundary lines prints a single line at most.
    pub fn flush(&mut self) -> Option<String> {
        if self.accumulator.is_empty() {
            return None;
        }

        let period = self.accumulator.take();
        self.periods += 1;

        if enabled!(Level::DEBUG) {
            match serde_json::to_string(&period) {
                Ok(readings) => debug!(period = self.periods, %readings, "period closed"),
                Err(e) => debug!(period = self.periods, error = %e, "period closed"),
            }
        }

        let summary = period.summarize(self.profile.core_count());
        trace!(?summary, "period summary");
        Some(summary.render(self.threshold, self.label_width))
    }
}

impl LineSensor for TopCpuSensor {
    type Error = SensorError;

    fn name(&self) -> &str {
        &self.name
    }

    fn feed(&mut self, line: &str) -> Option<String> {
        match self.profile.parse_line(line) {
            ParsedLine::Record {
                command,
                cpu_percent,
            } => {
                self.accumulator.record(&command, cpu_percent);
                None
            }
            ParsedLine::Boundary => self.flush(),
        }
    }

    fn check_availability(&self) -> Result<(), Self::Error> {
        let sampler = self.profile.sampler();
        if !sampler.exists() {
            return Err(SensorError::unavailable(format!(
                "{} does not exist",
                sampler.display()
            )));
        }
        Ok(())
    }
}
