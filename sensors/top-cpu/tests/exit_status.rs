//! Exit status of the `cpuhog` binary against a scripted sampler.
//!
//! The config points `pidstat_path` at `/bin/sh`, so `pidstat -u 1` becomes
//! `sh -u 1` and runs the script saved as `1` in the working directory.
#![cfg(target_os = "linux")]

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;

const PERIOD: &str = "1";

fn cpuhog(sampler_script: &str) -> (TempDir, Child) {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("config").join("cpuhog");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.ron"),
        "(pidstat_path: \"/bin/sh\")\n",
    )
    .unwrap();
    std::fs::write(dir.path().join(PERIOD), sampler_script).unwrap();

    let child = Command::new(env!("CARGO_BIN_EXE_cpuhog"))
        .args([PERIOD, "0"])
        .current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    (dir, child)
}

const ONE_PERIOD: &str = "printf '%s\\n' \
    '14:23:01 1000 100 40.0 10.0 0.0 0.0 50.0 0 node' \
    'Average: ...'\n";

#[tokio::test]
async fn test_signal_shutdown_exits_zero() {
    let (_dir, mut child) = cpuhog(&format!("{ONE_PERIOD}exec sleep 30\n"));

    let stdout = child.stdout.take().unwrap();
    let mut lines = BufReader::new(stdout).lines();
    let published = timeout(Duration::from_secs(10), lines.next_line())
        .await
        .expect("a period should be published")
        .unwrap()
        .unwrap();
    assert!(published.contains("node"), "{published:?}");

    let pid = Pid::from_raw(child.id().unwrap() as i32);
    kill(pid, Signal::SIGTERM).unwrap();

    let status = timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("cpuhog should stop on SIGTERM")
        .unwrap();
    assert_eq!(status.code(), Some(0));
}

#[tokio::test]
async fn test_sampler_exit_is_fatal() {
    let (_dir, child) = cpuhog(&format!("{ONE_PERIOD}exit 0\n"));

    let output = timeout(Duration::from_secs(10), child.wait_with_output())
        .await
        .expect("cpuhog should stop when the sampler does")
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1, "{stdout:?}");
    assert!(stdout.contains("node"), "{stdout:?}");
}

#[tokio::test]
async fn test_usage_error_exits_two() {
    let output = Command::new(env!("CARGO_BIN_EXE_cpuhog"))
        .arg("0")
        .output()
        .await
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}
