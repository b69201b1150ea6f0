//! Top-CPU monitoring for cpuhog.
//!
//! This crate turns the continuous output of a per-process CPU sampler
//! (`pidstat` on Linux, `top` on macOS) into one fixed-width line per
//! reporting period: the command using the most CPU and the machine total,
//! both normalized by core count. Periods that stay below the threshold
//! produce an empty line so the bar can hide the monitor.
//!
//! # Examples
//!
//! ```rust
//! use cpuhog_core::LineSensor;
//! use cpuhog_top_cpu::{Platform, PlatformProfile, TopCpuSensor};
//!
//! let profile = PlatformProfile::new(Platform::Linux, 1, "/usr/bin/pidstat")?;
//! let mut sensor = TopCpuSensor::new(profile, 0.0)?;
//!
//! sensor.feed("14:23:01 1000 100 1.0 2.0 0.0 0.0 3.0 0 node");
//! sensor.feed("14:23:01 1000 101 0.5 0.5 0.0 0.0 1.0 0 chrome");
//! let line = sensor.feed("Average: ...");
//! assert_eq!(line.as_deref(), Some("        node    3% /   4%"));
//! # Ok::<(), cpuhog_core::SensorError>(())
//! ```

pub mod accumulator;
pub mod parser;
pub mod platform;
pub mod sensor;
pub mod summary;
pub mod supervisor;

pub use accumulator::Accumulator;
pub use parser::ParsedLine;
pub use platform::{LaunchSpec, Platform, PlatformProfile};
pub use sensor::TopCpuSensor;
pub use summary::{PeriodSummary, TopCommand};
pub use supervisor::{Sampler, Shutdown};
