//! Line classification for sampler output.
//!
//! Samplers print a mix of per-process rows, headers, banners and blank
//! lines. Only rows carrying a command name and a CPU figure are records;
//! every other line marks the edge of a reporting period.

use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// One classified line of sampler output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// A process row: its command name and CPU usage in percent of one core.
    Record {
        /// Command name, exactly as the sampler printed it
        command: String,
        /// CPU usage, never negative
        cpu_percent: f64,
    },
    /// Anything that is not a process row.
    Boundary,
}

impl ParsedLine {
    fn record(command: &str, cpu_percent: f64) -> Self {
        Self::Record {
            command: command.to_owned(),
            cpu_percent,
        }
    }
}

/// `HH:MM:SS [AM|PM] UID PID %usr %system %guest %wait %CPU CPU Command`
static PIDSTAT_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d{2}:\d{2}:\d{2}(?:\s+[AP]M)?\s+\d+\s+\d+\s+(?P<usr>[\d.]+)\s+(?P<system>[\d.]+)\s+[\d.]+\s+[\d.]+\s+[\d.]+\s+\d+\s+(?P<command>\S.*?)\s*$",
    )
    .expect("pidstat record pattern is valid")
});

/// `%CPU COMMAND`
static TOP_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<cpu>[\d.]+)\s+(?P<command>\S.*?)\s*$")
        .expect("top record pattern is valid")
});

/// Classify one line of `pidstat -u` output.
///
/// CPU usage is `%usr + %system`; guest and wait time are left out.
pub fn parse_pidstat_line(line: &str) -> ParsedLine {
    let Some(caps) = PIDSTAT_RECORD.captures(line) else {
        return ParsedLine::Boundary;
    };

    match (caps["usr"].parse::<f64>(), caps["system"].parse::<f64>()) {
        (Ok(usr), Ok(system)) => ParsedLine::record(&caps["command"], usr + system),
        _ => {
            trace!(line, "unparseable pidstat figures");
            ParsedLine::Boundary
        }
    }
}

/// Classify one line of `top -stats cpu,command` output.
///
/// Rows at 0% are boundaries: `top` lists every process, and idle ones
/// carry no information.
pub fn parse_top_line(line: &str) -> ParsedLine {
    let Some(caps) = TOP_RECORD.captures(line) else {
        return ParsedLine::Boundary;
    };

    match caps["cpu"].parse::<f64>() {
        Ok(cpu) if cpu > 0.0 => ParsedLine::record(&caps["command"], cpu),
        Ok(_) => ParsedLine::Boundary,
        Err(_) => {
            trace!(line, "unparseable top figure");
            ParsedLine::Boundary
        }
    }
}
