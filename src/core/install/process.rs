use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

/// Output kept from a finished subprocess for error messages.
const OUTPUT_TAIL_BYTES: usize = 4096;

/// How an installer subprocess ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExitReport {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an external program to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, argv: &[String], working_dir: &Path) -> LauncherResult<ExitReport>;
}

/// `tokio::process` runner with an optional wall-clock limit.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner {
    timeout: Option<Duration>,
}

impl TokioProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, argv: &[String], working_dir: &Path) -> LauncherResult<ExitReport> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| LauncherError::Process("Empty command line".into()))?;

        info!(program = %program, cwd = %working_dir.display(), "Running installer process");
        debug!("argv: {:?}", argv);

        let child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LauncherError::Process(format!("Failed to start {}: {}", program, e)))?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    LauncherError::Process(format!(
                        "{} did not exit within {}s",
                        program,
                        limit.as_secs()
                    ))
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| LauncherError::Process(format!("Failed to wait for {}: {}", program, e)))?;

        Ok(ExitReport {
            code: output.status.code(),
            stdout: tail(&output.stdout),
            stderr: tail(&output.stderr),
        })
    }
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(OUTPUT_TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}
