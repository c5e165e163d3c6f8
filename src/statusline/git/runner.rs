//! Running the `git` executable.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const GIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Something that can answer git queries.
///
/// `None` means "unavailable": the command failed, timed out, or git is not
/// installed. Callers degrade instead of erroring.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn run(&self, args: &[&str]) -> Option<String>;
}

/// Spawns `git --no-optional-locks <args>` in a working directory.
#[derive(Debug, Clone)]
pub struct SystemGit {
    cwd: Option<PathBuf>,
    timeout: Duration,
}

impl SystemGit {
    pub fn new(cwd: Option<PathBuf>) -> Self {
        Self {
            cwd,
            timeout: GIT_TIMEOUT,
        }
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn run(&self, args: &[&str]) -> Option<String> {
        let mut cmd = Command::new("git");
        cmd.arg("--no-optional-locks")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!("git {}: {e}", args.join(" "));
                return None;
            }
            Err(_) => {
                debug!("git {}: timed out after {:?}", args.join(" "), self.timeout);
                return None;
            }
        };
        if !output.status.success() {
            return None;
        }
        // Leading whitespace is significant in porcelain output.
        Some(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}
