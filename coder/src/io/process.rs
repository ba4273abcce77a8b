//! Helpers for running child processes with optional timeouts and bounded output.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Exit code, or `-1` when the process was killed by a signal.
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn stderr_truncated_notice(&self) -> String {
        if self.stderr_truncated > 0 {
            format!("\n[stderr truncated {} bytes]\n", self.stderr_truncated)
        } else {
            String::new()
        }
    }
}

/// Build a command that runs `line` through the platform shell.
pub fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(line);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(line);
        cmd
    }
}

/// Run a command and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
/// With `timeout: None` the call blocks until the child exits.
#[instrument(skip_all, fields(timeout_secs = timeout.map(|t| t.as_secs()), output_limit_bytes))]
pub fn run_command(
    mut cmd: Command,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = spawn(&mut cmd)?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let (status, timed_out) = wait_child(&mut child, timeout)?;

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

/// Run a command with `stdin` piped in, handing each stdout line to `on_line` as it arrives.
///
/// Lines are passed with their terminator. Stdout is not retained in the
/// returned [`CommandOutput`]; stderr is captured up to `output_limit_bytes`.
/// An error from `on_line` kills the child and is returned.
#[instrument(skip_all, fields(stdin_bytes = stdin.len(), output_limit_bytes))]
pub fn run_command_streaming(
    mut cmd: Command,
    stdin: Vec<u8>,
    output_limit_bytes: usize,
    on_line: &mut dyn FnMut(&str) -> Result<()>,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = spawn(&mut cmd)?;
    let mut child_stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin was not piped"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    // Dropping the handle at the end of the closure closes the child's stdin.
    let stdin_handle = thread::spawn(move || -> Result<()> {
        child_stdin.write_all(&stdin).context("write stdin")
    });
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).context("read stdout")?;
        if n == 0 {
            break;
        }
        if let Err(err) = on_line(&String::from_utf8_lossy(&line)) {
            warn!(err = %err, "stream consumer failed, killing child");
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }
    }

    let (status, _) = wait_child(&mut child, None)?;
    match stdin_handle.join() {
        Ok(result) => {
            if let Err(err) = result {
                // A child that exits without reading all input closes the pipe early.
                debug!(err = %err, "stdin writer stopped early");
            }
        }
        Err(_) => return Err(anyhow!("stdin writer thread panicked")),
    }
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    debug!(exit_code = ?status.code(), "streaming command finished");
    Ok(CommandOutput {
        status,
        stdout: Vec::new(),
        stderr,
        stdout_truncated: 0,
        stderr_truncated,
        timed_out: false,
    })
}

fn spawn(cmd: &mut Command) -> Result<Child> {
    debug!(program = ?cmd.get_program(), "spawning child process");
    match cmd.spawn() {
        Ok(c) => Ok(c),
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            Err(e).context("spawn command")
        }
    }
}

fn wait_child(child: &mut Child, timeout: Option<Duration>) -> Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        return Ok((child.wait().context("wait for command")?, false));
    };
    match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Ok((status, false)),
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            child.kill().context("kill command")?;
            Ok((child.wait().context("wait command after kill")?, true))
        }
    }
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_exit_code() {
        let output = run_command(shell_command("printf 'ok\\n'"), None, 1000).expect("run");
        assert_eq!(output.exit_code(), 0);
        assert_eq!(output.stdout_text(), "ok\n");
        assert!(output.stderr.is_empty());
        assert!(!output.timed_out);
    }

    #[test]
    fn captures_stderr_on_failure() {
        let output =
            run_command(shell_command("printf 'bad\\n' >&2; exit 3"), None, 1000).expect("run");
        assert_eq!(output.exit_code(), 3);
        assert_eq!(output.stderr_text(), "bad\n");
    }

    #[test]
    fn truncates_output_beyond_limit() {
        let output = run_command(shell_command("printf '0123456789'"), None, 4).expect("run");
        assert_eq!(output.stdout, b"0123");
        assert_eq!(output.stdout_truncated, 6);
    }

    #[test]
    fn kills_on_timeout() {
        let output = run_command(
            shell_command("exec sleep 5"),
            Some(Duration::from_millis(100)),
            1000,
        )
        .expect("run");
        assert!(output.timed_out);
        assert_ne!(output.exit_code(), 0);
    }

    #[test]
    fn streaming_delivers_lines_in_order() {
        let mut seen = Vec::new();
        let output = run_command_streaming(
            shell_command("cat; printf 'tail'"),
            b"one\ntwo\n".to_vec(),
            1000,
            &mut |line: &str| {
                seen.push(line.to_string());
                Ok(())
            },
        )
        .expect("run");
        assert_eq!(output.exit_code(), 0);
        assert_eq!(seen, vec!["one\n", "two\n", "tail"]);
    }
}
