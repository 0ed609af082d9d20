use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::error::PlotError;
use crate::progress;

/// Find a specific tool on PATH. Returns the name callers spawn it by.
pub fn find_tool(tool_name: &str) -> Option<PathBuf> {
    let locator = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };
    let found = Command::new(locator)
        .arg(tool_name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if found {
        return Some(PathBuf::from(tool_name));
    }

    None
}

/// Fails listing every missing tool. Reporting is left to the caller.
pub fn check_dependencies(required: &[&'static str]) -> Result<(), PlotError> {
    let missing: Vec<&'static str> = required
        .iter()
        .copied()
        .filter(|tool| find_tool(tool).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PlotError::MissingTools(missing))
    }
}

/// Run a command and capture its stdout as a string.
pub fn get_command_output(cmd: &mut Command) -> Result<String> {
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::null());

    let output = cmd
        .output()
        .with_context(|| format!("Failed to execute {:?}", cmd.get_program()))?;

    if output.status.success() {
        String::from_utf8(output.stdout).context("Command output is not valid UTF-8")
    } else {
        anyhow::bail!(
            "{:?} failed with status: {}",
            cmd.get_program(),
            output.status
        )
    }
}

/// Connect `producer`'s stdout to `consumer`'s stdin, like a shell pipe.
/// Both stderr streams go to the log. Returns true only if both succeed.
pub fn pipe_commands(producer: &mut Command, consumer: &mut Command, log_path: &Path) -> Result<bool> {
    let mut writer = open_log(log_path)?;
    writeln!(writer, "Running pipeline: {:?} | {:?}", producer, consumer)?;

    producer.stdout(Stdio::piped());
    producer.stderr(Stdio::piped());
    let mut upstream = producer.spawn().context("Failed to spawn producer")?;

    let upstream_out = upstream
        .stdout
        .take()
        .context("Failed to capture producer stdout")?;
    let mut upstream_err = upstream
        .stderr
        .take()
        .context("Failed to capture producer stderr")?;

    // Drain producer stderr so a chatty ffmpeg never blocks on a full pipe.
    let err_thread = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = upstream_err.read_to_end(&mut buf);
        buf
    });

    consumer.stdin(Stdio::from(upstream_out));
    consumer.stdout(Stdio::piped());
    consumer.stderr(Stdio::piped());
    let downstream = consumer
        .spawn()
        .context("Failed to spawn consumer")?
        .wait_with_output()
        .context("Failed to wait for consumer")?;

    let upstream_status = upstream.wait().context("Failed to wait for producer")?;
    let upstream_log = err_thread.join().unwrap_or_default();

    for chunk in [&upstream_log, &downstream.stdout, &downstream.stderr] {
        writer.write_all(chunk)?;
        echo_if_verbose(chunk);
    }
    writer.flush()?;

    Ok(upstream_status.success() && downstream.status.success())
}

/// Open a file with the platform's default viewer. Does not wait for it to close.
pub fn open_in_viewer(path: &Path) -> Result<()> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(())
}

fn open_log(log_path: &Path) -> Result<BufWriter<File>> {
    let log_file = File::create(log_path)
        .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
    Ok(BufWriter::new(log_file))
}

fn echo_if_verbose(data: &[u8]) {
    if progress::is_verbose() && !data.is_empty() {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(data);
        let _ = stderr.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_not_found() {
        assert!(find_tool("hdrplot-definitely-not-a-tool").is_none());
    }

    #[test]
    fn test_check_dependencies_reports_missing() {
        let err = check_dependencies(&["hdrplot-missing-a", "hdrplot-missing-b"]).unwrap_err();
        assert!(matches!(
            &err,
            PlotError::MissingTools(tools) if tools == &["hdrplot-missing-a", "hdrplot-missing-b"]
        ));
        assert_eq!(
            err.to_string(),
            "Required command(s) not found in PATH: hdrplot-missing-a, hdrplot-missing-b"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_present_tool_is_spawned_by_name() {
        assert_eq!(find_tool("sh"), Some(PathBuf::from("sh")));
    }

    /// A file in the working directory is not on PATH, so spawning it by name
    /// would fail; it must not satisfy the check.
    #[test]
    fn test_local_file_is_not_a_tool() {
        let name = "hdrplot-local-tool-check";
        std::fs::write(name, b"").unwrap();
        let found = find_tool(name);
        std::fs::remove_file(name).unwrap();
        assert!(found.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_pipe_commands() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("pipe.log");
        let out = dir.path().join("out.txt");
        let mut producer = Command::new("sh");
        producer.args(["-c", "printf 'abc'"]);
        let mut consumer = Command::new("sh");
        consumer.arg("-c").arg(format!("cat > '{}'", out.display()));
        assert!(pipe_commands(&mut producer, &mut consumer, &log).unwrap());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "abc");
    }

    #[cfg(unix)]
    #[test]
    fn test_pipe_commands_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("pipe.log");
        let mut producer = Command::new("sh");
        producer.args(["-c", "printf 'abc'"]);
        let mut consumer = Command::new("sh");
        consumer.args(["-c", "cat > /dev/null; exit 3"]);
        assert!(!pipe_commands(&mut producer, &mut consumer, &log).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_get_command_output() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo 42"]);
        assert_eq!(get_command_output(&mut cmd).unwrap().trim(), "42");

        let mut failing = Command::new("sh");
        failing.args(["-c", "exit 1"]);
        assert!(get_command_output(&mut failing).is_err());
    }
}
