//! Sampler child process: spawn it, read its lines, take it down.
//!
//! The sampler runs in its own process group so that shutting it down also
//! reaches anything it spawned.

use crate::platform::LaunchSpec;
use cpuhog_core::SensorError;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader, Split};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, trace, warn};

/// A running sampler and its output stream.
#[derive(Debug)]
pub struct Sampler {
    program: String,
    child: Child,
    lines: Split<BufReader<ChildStdout>>,
    pgid: Option<u32>,
    terminated: bool,
}

impl Sampler {
    /// Start the sampler described by `spec`.
    ///
    /// Standard output is piped to us; standard error goes straight to ours.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Unavailable`] if the program cannot be found,
    /// or an I/O error if it cannot be started.
    pub fn spawn(spec: &LaunchSpec) -> Result<Self, SensorError> {
        let program = spec.program.display().to_string();

        let mut std_command = std::process::Command::new(&spec.program);
        std_command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_command.process_group(0);
        }

        let mut command = Command::from(std_command);
        command.kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SensorError::unavailable(format!("{program} not found"))
            } else {
                SensorError::Io(e)
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SensorError::unavailable(format!("{program} stdout was not captured")))?;

        let pgid = child.id();
        info!(pid = pgid, command = %spec, "sampler started");

        Ok(Self {
            program,
            child,
            lines: BufReader::new(stdout).split(b'\n'),
            pgid,
            terminated: false,
        })
    }

    /// Program name, for diagnostics.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Next line of sampler output, or `None` once the sampler closed it.
    ///
    /// Cancel safe: a line is never lost when this future is dropped.
    /// Bytes that are not UTF-8 (process names are arbitrary bytes) come
    /// through as U+FFFD instead of failing the stream.
    pub async fn next_line(&mut self) -> Result<Option<String>, SensorError> {
        let Some(mut bytes) = self.lines.next_segment().await? else {
            return Ok(None);
        };
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        Ok(Some(match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => {
                trace!(error = %e, "sampler line is not UTF-8");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        }))
    }

    /// Reap the sampler after its output ended and report how it went.
    ///
    /// The sampler is meant to run forever, so any exit is an error.
    pub async fn exit_error(mut self) -> SensorError {
        match self.child.wait().await {
            Ok(status) => {
                self.terminated = true;
                SensorError::child_exited(&self.program, describe(status))
            }
            Err(e) => SensorError::Io(e),
        }
    }

    /// Terminate the sampler and everything in its process group, then reap it.
    pub async fn shutdown(mut self) -> Result<ExitStatus, SensorError> {
        self.terminate();
        let status = self.child.wait().await?;
        debug!(program = %self.program, status = %describe(status), "sampler stopped");
        Ok(status)
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        if self.signal_group() {
            return;
        }
        if let Err(e) = self.child.start_kill() {
            debug!(error = %e, "sampler already gone");
        }
    }

    /// SIGTERM the whole process group. False if the group could not be
    /// signalled.
    #[cfg(unix)]
    fn signal_group(&self) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(pgid) = self.pgid else {
            return false;
        };

        match killpg(Pid::from_raw(pgid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => true,
            Err(e) => {
                warn!(pgid, error = %e, "failed to signal sampler process group");
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn signal_group(&self) -> bool {
        false
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn describe(status: ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("killed by signal {signal}");
        }
    }
    status.to_string()
}

/// Termination signals this process reacts to.
#[cfg(unix)]
pub struct Shutdown {
    terminate: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Shutdown {
    /// Register for SIGTERM, SIGINT and SIGHUP.
    pub fn install() -> Result<Self, SensorError> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    /// Wait for the next termination signal and name it.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.hangup.recv() => "SIGHUP",
        }
    }
}

/// Termination signals this process reacts to.
#[cfg(not(unix))]
pub struct Shutdown;

#[cfg(not(unix))]
impl Shutdown {
    /// Register for Ctrl-C.
    pub fn install() -> Result<Self, SensorError> {
        Ok(Self)
    }

    /// Wait for Ctrl-C.
    pub async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(_) => std::future::pending().await,
        }
    }
}
