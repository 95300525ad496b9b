//! Process invocation with full output capture.
//!
//! A [`ProcessInvocation`] describes one external-process call. Running it
//! spawns the child, drains stdout and stderr concurrently until the child
//! exits, and classifies the outcome.

use crate::error::{InsightError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

const GENERIC_FAILURE: &str = "process failed without error output";

/// One external-process call: program, arguments, working directory and an
/// environment overlay merged over the inherited environment.
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl ProcessInvocation {
    /// Create an invocation for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add variables on top of the inherited environment.
    pub fn envs<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Kill the child and fail if it has not exited within `timeout`.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the process to completion and return its trimmed stdout.
    ///
    /// Fails with [`InsightError::ProcessExecution`] when the exit status is
    /// non-zero or anything was written to stderr.
    pub async fn run(&self) -> Result<String> {
        let mut command = Command::new(&self.program);
        command.kill_on_drop(true);
        command.args(&self.args);
        command.envs(&self.env);
        if let Some(ref dir) = self.current_dir {
            command.current_dir(dir);
        }
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        debug!(
            "Spawning {} {:?} (cwd: {:?})",
            self.program, self.args, self.current_dir
        );

        let child = command
            .spawn()
            .map_err(|e| self.fault(None, format!("failed to spawn: {}", e)))?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    warn!("{} timed out after {:?}, killing it", self.program, limit);
                    self.fault(None, format!("timed out after {}s", limit.as_secs_f64()))
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| self.fault(None, format!("failed to collect output: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() || !output.stderr.is_empty() {
            let message = if stderr.trim().is_empty() {
                GENERIC_FAILURE.to_string()
            } else {
                stderr.trim().to_string()
            };
            warn!(
                "{} exited with {:?}: {}",
                self.program,
                output.status.code(),
                message
            );
            return Err(self.fault(output.status.code(), message));
        }

        info!(
            "{} finished ({} bytes of output)",
            self.program,
            output.stdout.len()
        );
        Ok(stdout.trim().to_string())
    }

    fn fault(&self, status: Option<i32>, stderr: String) -> InsightError {
        InsightError::ProcessExecution {
            program: self.program.clone(),
            status,
            stderr,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let script = dir.join("script.sh");
        std::fs::write(&script, body).unwrap();
        script
    }

    fn sh(script: &Path) -> ProcessInvocation {
        ProcessInvocation::new("sh").arg(script.display().to_string())
    }

    #[tokio::test]
    async fn test_success_returns_trimmed_stdout() {
        let dir = TempDir::new().unwrap();
        let script = write_script(dir.path(), "printf '\\n  hello world  \\n\\n'\n");

        let out = sh(&script).run().await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let script = write_script(dir.path(), "echo 'boom' >&2\nexit 3\n");

        let err = sh(&script).run().await.unwrap_err();
        match err {
            InsightError::ProcessExecution { status, stderr, .. } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_zero_exit_without_stderr_uses_generic_message() {
        let dir = TempDir::new().unwrap();
        let script = write_script(dir.path(), "echo '{\"ok\": true}'\nexit 2\n");

        let err = sh(&script).run().await.unwrap_err();
        match err {
            InsightError::ProcessExecution { status, stderr, .. } => {
                assert_eq!(status, Some(2));
                assert_eq!(stderr, GENERIC_FAILURE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_stderr_output_fails_even_on_zero_exit() {
        let dir = TempDir::new().unwrap();
        let script = write_script(dir.path(), "echo '{}'\necho 'DeprecationWarning' >&2\n");

        let err = sh(&script).run().await.unwrap_err();
        assert!(matches!(
            err,
            InsightError::ProcessExecution { status: Some(0), .. }
        ));
    }

    #[tokio::test]
    async fn test_env_overlay_is_merged_with_inherited_env() {
        let dir = TempDir::new().unwrap();
        let script = write_script(
            dir.path(),
            "if [ -z \"$PATH\" ]; then echo 'no PATH' >&2; exit 1; fi\nprintf '%s' \"$PYTHONIOENCODING\"\n",
        );

        let overlay = BTreeMap::from([("PYTHONIOENCODING".to_string(), "utf-8".to_string())]);
        let out = sh(&script)
            .envs(&overlay)
            .run()
            .await
            .unwrap();
        assert_eq!(out, "utf-8");
    }

    #[tokio::test]
    async fn test_runs_in_requested_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let script = write_script(dir.path(), "cat marker.txt\n");

        let out = sh(&script).current_dir(dir.path()).run().await.unwrap();
        assert_eq!(out, "here");
    }

    #[tokio::test]
    async fn test_captures_long_output() {
        let dir = TempDir::new().unwrap();
        let script = write_script(
            dir.path(),
            "i=0\nwhile [ $i -lt 20000 ]; do echo \"line $i of diagnostic output\"; i=$((i+1)); done\n",
        );

        let out = sh(&script).run().await.unwrap();
        assert_eq!(out.lines().count(), 20000);
        assert!(out.ends_with("line 19999 of diagnostic output"));
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = TempDir::new().unwrap();
        let script = write_script(dir.path(), "sleep 5\necho late\n");

        let started = std::time::Instant::now();
        let err = sh(&script)
            .timeout(Some(Duration::from_millis(100)))
            .run()
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_process_fault() {
        let err = ProcessInvocation::new("definitely-not-a-real-program-4821")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, InsightError::ProcessExecution { status: None, .. }));
    }
}
