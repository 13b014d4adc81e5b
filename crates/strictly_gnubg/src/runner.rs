//! gnubg process runner.

use crate::config::GnubgConfig;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use strictly_backgammon::EvaluatorError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Runs command scripts through `gnubg -t`, one process per call.
///
/// Calls are serialized; a second caller waits for the first process to
/// exit. Timeouts and cancellation kill the child.
#[derive(Debug)]
pub struct GnubgRunner {
    config: GnubgConfig,
    lock: Mutex<()>,
}

impl GnubgRunner {
    /// Creates a runner for `config`.
    pub fn new(config: GnubgConfig) -> Self {
        Self {
            config,
            lock: Mutex::new(()),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &GnubgConfig {
        &self.config
    }

    /// Whether the executable starts and identifies itself as gnubg.
    #[instrument(skip(self), fields(executable = %self.config.executable()))]
    pub async fn is_available(&self) -> bool {
        match self
            .execute(&["show version".to_string()], &CancellationToken::new())
            .await
        {
            Ok(output) => output.to_lowercase().contains("gnu backgammon"),
            Err(e) => {
                debug!(error = %e, "gnubg not available");
                false
            }
        }
    }

    /// Feeds `commands` followed by `quit` to a fresh gnubg and returns stdout.
    #[instrument(skip(self, commands, cancel), fields(commands = commands.len()))]
    pub async fn execute(
        &self,
        commands: &[String],
        cancel: &CancellationToken,
    ) -> Result<String, EvaluatorError> {
        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EvaluatorError::Cancelled),
            guard = self.lock.lock() => guard,
        };

        let script = format!("{}\nquit\n", commands.join("\n"));
        if *self.config.verbose() {
            info!(%script, "Running gnubg script");
        }

        let mut child = Command::new(self.config.executable())
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => EvaluatorError::Unavailable(
                    format!("cannot start '{}': {}", self.config.executable(), e),
                ),
                _ => EvaluatorError::Process(format!("failed to spawn gnubg: {}", e)),
            })?;

        let stdin = child.stdin.take();
        let run = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(script.as_bytes()).await {
                    Ok(()) => {}
                    // gnubg may quit before reading everything.
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => debug!("gnubg closed stdin early"),
                    Err(e) => return Err(e),
                }
            }
            child.wait_with_output().await
        };

        let budget = Duration::from_millis(*self.config.timeout_ms());
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("gnubg call cancelled, killing process");
                return Err(EvaluatorError::Cancelled);
            }
            result = tokio::time::timeout(budget, run) => match result {
                Err(_) => {
                    warn!(timeout_ms = *self.config.timeout_ms(), "gnubg timed out, killing process");
                    return Err(EvaluatorError::Timeout(*self.config.timeout_ms()));
                }
                Ok(Err(e)) => return Err(EvaluatorError::Process(e.to_string())),
                Ok(Ok(output)) => output,
            },
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if *self.config.verbose() {
            info!(%stdout, %stderr, status = %output.status, "gnubg output");
        }
        if !output.status.success() {
            debug!(status = %output.status, "gnubg exited with failure status");
        }
        if stdout.trim().is_empty() && !stderr.trim().is_empty() {
            return Err(EvaluatorError::Process(stderr.trim().to_string()));
        }
        Ok(stdout)
    }
}
