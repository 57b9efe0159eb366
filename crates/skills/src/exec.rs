//! Subprocess execution of discovered skill scripts.
//!
//! The runner is the boundary the tool-registration side calls into when a
//! model turn asks for a script. Scripts run as isolated subprocesses: the
//! child environment is cleared and only the manifest's allowlisted
//! variables (plus `PATH`) are passed through, a timeout kills runaway
//! scripts, and captured output is capped so one script cannot flood the
//! conversation.

use crate::loader::ScriptRef;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Interpreter used for skill scripts.
const PYTHON: &str = "python3";

/// Default wall-clock limit for a script run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on captured bytes per stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Script execution failures. A script that runs and exits nonzero is not an
/// error; its status is reported in [`ScriptOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("script '{0}' timed out after {1:?}")]
    Timeout(String, Duration),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Captured result of a completed script run.
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process died from a signal.
    pub exit_code: Option<i32>,
    /// Whether either stream was cut off at the output cap.
    pub truncated: bool,
}

impl ScriptOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs skill scripts with an environment allowlist, timeout, and output cap.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES }
    }
}

impl ScriptRunner {
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self { timeout, max_output_bytes: max_output_bytes.max(1) }
    }

    /// Run one discovered script with the given arguments.
    ///
    /// Only variables named in `env_allowlist` are copied from the host
    /// environment into the child; `PATH` is always passed so the
    /// interpreter can resolve its own tooling. On timeout the child is
    /// killed and [`ExecError::Timeout`] is returned.
    pub async fn run(
        &self,
        script: &ScriptRef,
        args: &[String],
        env_allowlist: &[String],
    ) -> Result<ScriptOutcome, ExecError> {
        let mut cmd = Command::new(PYTHON);
        cmd.arg(&script.path);
        for arg in args {
            cmd.arg(arg);
        }

        cmd.env_clear();
        for name in env_allowlist.iter().chain(std::iter::once(&"PATH".to_string())) {
            if let Some(value) = std::env::var_os(name) {
                cmd.env(name, value);
            }
        }

        if let Some(dir) = script.path.parent() {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        debug!(script = %script.name, ?args, "running skill script");
        let mut child = cmd.spawn()?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let cap = self.max_output_bytes;

        let collected = async {
            let (out, err, status) = tokio::join!(
                read_capped(stdout_pipe, cap),
                read_capped(stderr_pipe, cap),
                child.wait(),
            );
            (out, err, status)
        };

        match tokio::time::timeout(self.timeout, collected).await {
            Ok((out, err, status)) => {
                let (stdout_bytes, stdout_cut) = out?;
                let (stderr_bytes, stderr_cut) = err?;
                let status = status?;

                let outcome = ScriptOutcome {
                    stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                    exit_code: status.code(),
                    truncated: stdout_cut || stderr_cut,
                };

                if !outcome.success() {
                    warn!(script = %script.name, code = ?outcome.exit_code, "skill script exited nonzero");
                }
                Ok(outcome)
            }
            Err(_) => {
                if let Err(e) = child.start_kill() {
                    warn!(script = %script.name, error = %e, "failed to kill timed-out script");
                }
                let _ = child.wait().await;
                Err(ExecError::Timeout(script.name.clone(), self.timeout))
            }
        }
    }
}

/// Read at most `cap` bytes, then drain the rest so the child never blocks
/// on a full pipe. Returns the captured bytes and whether anything was cut.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: Option<R>,
    cap: usize,
) -> io::Result<(Vec<u8>, bool)> {
    let Some(mut reader) = reader else {
        return Ok((Vec::new(), false));
    };

    let mut buf = Vec::new();
    (&mut reader).take(cap as u64).read_to_end(&mut buf).await?;
    let drained = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((buf, drained > 0))
}
