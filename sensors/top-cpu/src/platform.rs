//! Platform profiles: which sampler to launch, how to read its lines, and
//! how many logical cores to normalize by.

use crate::parser::{self, ParsedLine};
use cpuhog_core::{GlobalConfig, SensorError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Operating systems with a known sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `pidstat` from sysstat
    Linux,
    /// The stock `top`
    MacOs,
}

impl Platform {
    /// Map an OS identity (as in [`std::env::consts::OS`]) to a platform.
    pub fn from_os(os: &str) -> Result<Self, SensorError> {
        match os {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::MacOs),
            other => Err(SensorError::unsupported_platform(other)),
        }
    }

    /// The platform this binary is running on.
    pub fn current() -> Result<Self, SensorError> {
        Self::from_os(std::env::consts::OS)
    }

    /// Classify one line of this platform's sampler output.
    #[must_use]
    pub fn parse_line(self, line: &str) -> ParsedLine {
        match self {
            Self::Linux => parser::parse_pidstat_line(line),
            Self::MacOs => parser::parse_top_line(line),
        }
    }

    /// Sampler arguments for a continuous, per-process run.
    fn sampler_args(self, period_secs: u64) -> Vec<String> {
        match self {
            Self::Linux => vec!["-u".to_owned(), period_secs.to_string()],
            Self::MacOs => vec![
                "-l".to_owned(),
                "0".to_owned(),
                "-s".to_owned(),
                period_secs.to_string(),
                "-stats".to_owned(),
                "cpu,command".to_owned(),
                "-o".to_owned(),
                "cpu".to_owned(),
            ],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::MacOs => write!(f, "macos"),
        }
    }
}

/// A fully resolved command line for the sampler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Executable to run
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Extra environment for the child
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    /// Start a spec for `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Everything platform-specific, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformProfile {
    platform: Platform,
    core_count: usize,
    sampler: PathBuf,
}

impl PlatformProfile {
    /// Where Linux lists its logical processors.
    const PROC_CPUINFO_PATH: &'static str = "/proc/cpuinfo";

    /// Stock location of `top` on macOS.
    const TOP_PATH: &'static str = "/usr/bin/top";

    /// Build a profile from known parts.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidData`] if `core_count` is zero.
    pub fn new(
        platform: Platform,
        core_count: usize,
        sampler: impl Into<PathBuf>,
    ) -> Result<Self, SensorError> {
        if core_count == 0 {
            return Err(SensorError::invalid_data_with_value(
                "Core count must be at least 1",
                core_count.to_string(),
            ));
        }

        Ok(Self {
            platform,
            core_count,
            sampler: sampler.into(),
        })
    }

    /// Resolve the profile for the running system.
    ///
    /// # Errors
    ///
    /// Fails on an unsupported OS, a missing sampler, or an unreadable
    /// core count.
    pub fn resolve(config: &GlobalConfig) -> Result<Self, SensorError> {
        let profile = match Platform::current()? {
            Platform::Linux => {
                Self::resolve_linux(&config.pidstat_path, Path::new(Self::PROC_CPUINFO_PATH))?
            }
            Platform::MacOs => Self::new(Platform::MacOs, sysctl_logical_cpus()?, Self::TOP_PATH)?,
        };

        debug!(
            platform = %profile.platform,
            cores = profile.core_count,
            sampler = %profile.sampler.display(),
            "resolved platform profile"
        );
        Ok(profile)
    }

    /// Resolve the Linux profile from explicit paths (useful for testing).
    pub fn resolve_linux(pidstat_path: &Path, cpuinfo_path: &Path) -> Result<Self, SensorError> {
        if !pidstat_path.exists() {
            return Err(SensorError::unavailable(format!(
                "{} not found; install the sysstat package",
                pidstat_path.display()
            )));
        }

        let core_count = core_count_from_cpuinfo(cpuinfo_path)?;
        Self::new(Platform::Linux, core_count, pidstat_path)
    }

    /// The platform this profile was resolved for.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Logical cores used for normalization.
    #[must_use]
    pub fn core_count(&self) -> usize {
        self.core_count
    }

    /// Path to the sampler executable.
    #[must_use]
    pub fn sampler(&self) -> &Path {
        &self.sampler
    }

    /// Command line that samples every `period_secs` seconds, forever.
    #[must_use]
    pub fn launch_spec(&self, period_secs: u64) -> LaunchSpec {
        LaunchSpec::new(&self.sampler)
            .with_args(self.platform.sampler_args(period_secs))
            .with_env("LC_ALL", "C")
    }

    /// Classify one sampler line.
    #[must_use]
    pub fn parse_line(&self, line: &str) -> ParsedLine {
        self.platform.parse_line(line)
    }
}

/// Count `processor` entries in cpuinfo-formatted text.
#[must_use]
pub fn count_processors(content: &str) -> usize {
    content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| key.trim() == "processor")
        .count()
}

/// Logical core count from a cpuinfo file.
pub fn core_count_from_cpuinfo(path: &Path) -> Result<usize, SensorError> {
    let content = fs::read_to_string(path)?;
    match count_processors(&content) {
        0 => Err(SensorError::invalid_data_with_value(
            "No processor entries",
            path.display().to_string(),
        )),
        count => Ok(count),
    }
}

/// Parse the single-integer output of `sysctl -n`.
pub fn parse_core_count(output: &str) -> Result<usize, SensorError> {
    let trimmed = output.trim();
    match trimmed.parse::<usize>() {
        Ok(0) => Err(SensorError::invalid_data_with_value("Core count is zero", trimmed)),
        Ok(count) => Ok(count),
        Err(e) => Err(SensorError::parse_with_source(
            format!("Invalid core count {trimmed:?}"),
            e,
        )),
    }
}

fn sysctl_logical_cpus() -> Result<usize, SensorError> {
    let output = Command::new("sysctl")
        .args(["-n", "hw.logicalcpu"])
        .output()?;

    if !output.status.success() {
        return Err(SensorError::unavailable(format!(
            "sysctl hw.logicalcpu failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_core_count(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CPUINFO: &str = r#"
processor       : 0
model name      : Intel(R) Core(TM) i7-8700K CPU @ 3.70GHz
cpu MHz         : 3700.000

processor       : 1
model name      : Intel(R) Core(TM) i7-8700K CPU @ 3.70GHz
cpu MHz         : 3700.000
"#;

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("linux").unwrap(), Platform::Linux);
        assert_eq!(Platform::from_os("macos").unwrap(), Platform::MacOs);
        assert!(matches!(
            Platform::from_os("windows"),
            Err(SensorError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn test_count_processors() {
        assert_eq!(count_processors(CPUINFO), 2);
        assert_eq!(count_processors(""), 0);
    }

    #[test]
    fn test_resolve_linux() {
        let dir = tempfile::tempdir().unwrap();
        let pidstat = dir.path().join("pidstat");
        fs::File::create(&pidstat).unwrap();
        let cpuinfo = dir.path().join("cpuinfo");
        fs::File::create(&cpuinfo)
            .unwrap()
            .write_all(CPUINFO.as_bytes())
            .unwrap();

        let profile = PlatformProfile::resolve_linux(&pidstat, &cpuinfo).unwrap();
        assert_eq!(profile.platform(), Platform::Linux);
        assert_eq!(profile.core_count(), 2);
        assert_eq!(profile.sampler(), pidstat.as_path());
    }

    #[test]
    fn test_resolve_linux_missing_pidstat() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlatformProfile::resolve_linux(
            &dir.path().join("pidstat"),
            &dir.path().join("cpuinfo"),
        )
        .unwrap_err();
        assert!(matches!(err, SensorError::Unavailable { .. }));
        assert!(err.to_string().contains("sysstat"));
    }

    #[test]
    fn test_resolve_linux_empty_cpuinfo() {
        let dir = tempfile::tempdir().unwrap();
        let pidstat = dir.path().join("pidstat");
        fs::File::create(&pidstat).unwrap();
        let cpuinfo = dir.path().join("cpuinfo");
        fs::File::create(&cpuinfo).unwrap();

        let err = PlatformProfile::resolve_linux(&pidstat, &cpuinfo).unwrap_err();
        assert!(matches!(err, SensorError::InvalidData { .. }));
    }

    #[test]
    fn test_parse_core_count() {
        assert_eq!(parse_core_count("8\n").unwrap(), 8);
        assert!(parse_core_count("0").is_err());
        assert!(parse_core_count("eight").is_err());
        assert!(parse_core_count("").is_err());
    }

    #[test]
    fn test_zero_cores_rejected() {
        assert!(PlatformProfile::new(Platform::Linux, 0, "/usr/bin/pidstat").is_err());
    }

    #[test]
    fn test_launch_specs() {
        let linux = PlatformProfile::new(Platform::Linux, 4, "/usr/bin/pidstat").unwrap();
        let spec = linux.launch_spec(5);
        assert_eq!(spec.to_string(), "/usr/bin/pidstat -u 5");
        assert_eq!(spec.env, vec![("LC_ALL".to_owned(), "C".to_owned())]);

        let mac = PlatformProfile::new(Platform::MacOs, 8, "/usr/bin/top").unwrap();
        assert_eq!(
            mac.launch_spec(2).to_string(),
            "/usr/bin/top -l 0 -s 2 -stats cpu,command -o cpu"
        );
    }

    #[test]
    fn test_profile_dispatches_parser() {
        let linux = PlatformProfile::new(Platform::Linux, 1, "/usr/bin/pidstat").unwrap();
        let mac = PlatformProfile::new(Platform::MacOs, 1, "/usr/bin/top").unwrap();

        assert_eq!(linux.parse_line("12.0 node"), ParsedLine::Boundary);
        assert!(matches!(mac.parse_line("12.0 node"), ParsedLine::Record { .. }));
    }
}
