//! External process invocation
//!
//! Service manager commands go through [`CommandRunner`] so they can be
//! mocked in tests and so every call is bounded by a timeout.

use crate::error::{AgentError, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status 0
    pub success: bool,
    /// Exit code, `None` if terminated by a signal
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with no text
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            ..Self::default()
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Exit status followed by the combined output, trimmed
    pub fn describe(&self) -> String {
        let status = match self.code {
            Some(code) => format!("exit status: {}", code),
            None => "terminated by signal".to_string(),
        };

        let combined = format!("{}{}", self.stdout, self.stderr);
        let combined = combined.trim();
        if combined.is_empty() {
            status
        } else {
            format!("{}: {}", status, combined)
        }
    }
}

/// Runs external programs to completion
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, waiting at most `timeout`
    ///
    /// A non-zero exit is not an error here; launch failures are
    /// `ServiceControl` and expiry is `LifecycleTimeout`.
    fn run(&self, program: &Path, args: &[String], timeout: Duration) -> Result<CommandOutput>;
}

/// Render a command line for logs and errors
pub fn command_line(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// [`CommandRunner`] backed by `std::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    /// Create a new runner
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &Path, args: &[String], timeout: Duration) -> Result<CommandOutput> {
        let command = command_line(program, args);
        debug!("Executing command: {}", command);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AgentError::ServiceControl {
                command: command.clone(),
                detail: format!("failed to launch: {}", e),
            })?;

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || read_pipe(stdout));
        let stderr_reader = thread::spawn(move || read_pipe(stderr));

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!("Command timed out after {:?}: {}", timeout, command);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AgentError::LifecycleTimeout { command, timeout });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(AgentError::ServiceControl {
                        command,
                        detail: format!("failed to wait: {}", e),
                    })
                }
            }
        };

        let output = CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: stdout_reader.join().unwrap_or_default(),
            stderr: stderr_reader.join().unwrap_or_default(),
        };

        debug!("Command finished: {} ({})", command, output.describe());
        Ok(output)
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_describe() {
        assert_eq!(CommandOutput::ok().describe(), "exit status: 0");
        assert_eq!(
            CommandOutput::failed(5, "Unit not found.\n").describe(),
            "exit status: 5: Unit not found."
        );
        let signalled = CommandOutput {
            success: false,
            code: None,
            ..CommandOutput::default()
        };
        assert_eq!(signalled.describe(), "terminated by signal");
    }

    #[test]
    fn test_command_line() {
        let args = vec!["start".to_string(), "tincd_net1".to_string()];
        assert_eq!(
            command_line(Path::new("systemctl"), &args),
            "systemctl start tincd_net1"
        );
    }

    #[test]
    fn test_run_captures_output_and_status() {
        let output = SystemCommandRunner::new()
            .run(
                Path::new("/bin/sh"),
                &sh("echo out; echo err >&2; exit 3"),
                Duration::from_secs(10),
            )
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.describe(), "exit status: 3: out\nerr");
    }

    #[test]
    fn test_run_success() {
        let output = SystemCommandRunner::new()
            .run(Path::new("/bin/sh"), &sh("true"), Duration::from_secs(10))
            .unwrap();
        assert!(output.success);
    }

    #[test]
    fn test_run_timeout() {
        let started = Instant::now();
        let err = SystemCommandRunner::new()
            .run(
                Path::new("/bin/sh"),
                &sh("sleep 10"),
                Duration::from_millis(200),
            )
            .unwrap_err();

        assert!(matches!(err, AgentError::LifecycleTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_run_launch_failure() {
        let err = SystemCommandRunner::new()
            .run(
                Path::new("/nonexistent/systemctl"),
                &[],
                Duration::from_secs(1),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::ServiceControl { detail, .. } if detail.starts_with("failed to launch")
        ));
    }
}
