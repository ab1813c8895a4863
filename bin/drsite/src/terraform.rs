//! Terraform CLI engine

use crate::workspace::{EngineOutput, Invocation, OrchestratorError, ProvisioningEngine, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

/// Runs `terraform` in the root module directory.
///
/// Captured commands are killed when their future is dropped. Streamed
/// commands (apply and destroy) share the terminal and its interrupt, and
/// are waited on by a detached task; a dropped future leaves them running
/// until Terraform exits on its own.
#[derive(Clone, Debug)]
pub struct TerraformCli {
    program: PathBuf,
    working_dir: PathBuf,
    streaming: Arc<Mutex<()>>,
}

impl TerraformCli {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            streaming: Arc::new(Mutex::new(())),
        }
    }

    /// Wait until no streamed command is running
    pub async fn settle(&self) {
        let _idle = self.streaming.lock().await;
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&invocation.args)
            .envs(&invocation.env)
            .current_dir(&self.working_dir)
            .kill_on_drop(!invocation.stream);
        command
    }

    async fn stream(&self, mut command: Command) -> Result<EngineOutput> {
        let running = self.streaming.clone().lock_owned().await;
        let mut child = command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let waiter = tokio::spawn(async move {
            let status = child.wait().await;
            drop(running);
            status
        });
        let status = waiter
            .await
            .map_err(|e| self.spawn_error(std::io::Error::other(e)))?
            .map_err(|e| self.spawn_error(e))?;
        Ok(EngineOutput {
            status: status.code().unwrap_or(-1),
            ..Default::default()
        })
    }

    fn spawn_error(&self, source: std::io::Error) -> OrchestratorError {
        OrchestratorError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl ProvisioningEngine for TerraformCli {
    async fn execute(&self, invocation: &Invocation) -> Result<EngineOutput> {
        debug!(
            "Running {} {} in {}",
            self.program.display(),
            invocation.args.join(" "),
            self.working_dir.display()
        );

        let mut command = self.command(invocation);
        if invocation.stream {
            return self.stream(command).await;
        }

        let output = command
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        Ok(EngineOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
