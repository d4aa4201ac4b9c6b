//! Control of the service that owns the database.
//!
//! Rotation must not race a live writer, so the coordinator stops the
//! service first. [`SupervisorctlController`] drives supervisord; tests use
//! an in-memory fake.

use crate::error::{RotateError, RotateResult};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;

/// Coarse state of a supervised program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    Stopped,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Running => write!(f, "running"),
            ServiceState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Stop/start/status capability used by the rotation coordinator.
#[async_trait]
pub trait ServiceController: Send + Sync {
    /// Stop `name` and wait until it is stopped.
    async fn stop(&self, name: &str) -> RotateResult<()>;

    /// Start `name` and wait until it is running.
    async fn start(&self, name: &str) -> RotateResult<()>;

    /// True when `name` is currently in the `expected` state.
    async fn is_running(&self, name: &str, expected: ServiceState) -> RotateResult<bool>;
}

/// [`ServiceController`] backed by `supervisorctl`.
#[derive(Debug, Clone)]
pub struct SupervisorctlController {
    program: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl SupervisorctlController {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn run(&self, args: &[&str]) -> RotateResult<std::process::Output> {
        log::debug!("[{}] {}", self.program, args.join(" "));
        Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|source| RotateError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    async fn command(&self, action: &'static str, name: &str) -> RotateResult<()> {
        let output = self.run(&[action, name]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        // Some supervisorctl versions exit 0 and report the failure on stdout.
        if !output.status.success() || stdout.contains("ERROR") {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RotateError::ServiceCommand {
                service: name.to_string(),
                action,
                message: format!("{} {}", stdout.trim(), stderr.trim()).trim().to_string(),
            });
        }
        Ok(())
    }

    async fn wait_for(&self, name: &str, expected: ServiceState) -> RotateResult<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if self.is_running(name, expected).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(RotateError::Timeout {
                    service: name.to_string(),
                    state: expected,
                    secs: self.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ServiceController for SupervisorctlController {
    async fn stop(&self, name: &str) -> RotateResult<()> {
        self.command("stop", name).await?;
        self.wait_for(name, ServiceState::Stopped).await
    }

    async fn start(&self, name: &str) -> RotateResult<()> {
        self.command("start", name).await?;
        self.wait_for(name, ServiceState::Running).await
    }

    async fn is_running(&self, name: &str, expected: ServiceState) -> RotateResult<bool> {
        // `status` exits non-zero for any program that is not running, so
        // only stdout is inspected.
        let output = self.run(&["status", name]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_status(&stdout, name) == Some(expected))
    }
}

/// Map a `supervisorctl status` line to a [`ServiceState`]. Transitional
/// states (`STARTING`, `STOPPING`, `BACKOFF`) map to `None`.
pub(crate) fn parse_status(output: &str, name: &str) -> Option<ServiceState> {
    let line = output
        .lines()
        .find(|line| line.split_whitespace().next() == Some(name))?;
    match line.split_whitespace().nth(1)? {
        "RUNNING" => Some(ServiceState::Running),
        "STOPPED" | "EXITED" | "FATAL" => Some(ServiceState::Stopped),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        let out = "colvault-server                  RUNNING   pid 41, uptime 0:10:02\n\
                   other                            STOPPED   Not started\n";
        assert_eq!(
            parse_status(out, "colvault-server"),
            Some(ServiceState::Running)
        );
        assert_eq!(parse_status(out, "other"), Some(ServiceState::Stopped));
        assert_eq!(parse_status(out, "missing"), None);
        assert_eq!(
            parse_status("colvault-server STARTING\n", "colvault-server"),
            None
        );
        assert_eq!(
            parse_status("colvault-server FATAL Exited too quickly\n", "colvault-server"),
            Some(ServiceState::Stopped)
        );
    }

    #[test]
    fn test_name_prefix_does_not_match() {
        let out = "colvault-server-extra RUNNING pid 9\n";
        assert_eq!(parse_status(out, "colvault-server"), None);
    }

    #[tokio::test]
    async fn test_missing_supervisorctl_is_spawn_error() {
        let controller =
            SupervisorctlController::new("/nonexistent/supervisorctl", Duration::from_secs(1));
        let err = controller.stop("colvault-server").await.unwrap_err();
        assert!(matches!(err, RotateError::Spawn { .. }));
    }
}
