use crate::core::error::{Error, Result};
use crate::core::log::{LogSink, Severity};
use futures::future::join_all;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// How a finished child ended up.
#[derive(Debug)]
pub enum ProcessOutcome {
    Exited(ExitStatus),
    TimedOut,
}

/// Launches external tools and streams their output into a [`LogSink`].
#[derive(Clone)]
pub struct ProcessRunner {
    log: Arc<dyn LogSink>,
}

impl ProcessRunner {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self { log }
    }

    /// Run `program` with `args` until it exits or `timeout` elapses.
    ///
    /// Stdout lines are logged at info, stderr lines at error, both on the
    /// channel named after the program and as soon as they are produced.
    /// A timed-out child is killed before returning. The exit status is
    /// reported but not judged here.
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutcome> {
        tracing::debug!(program, ?args, "launching");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let mut child = cmd.spawn().map_err(|source| Error::Process {
            program: program.to_string(),
            source,
        })?;

        let channel = channel_name(program);
        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(out, self.log.clone(), channel.clone(), Severity::Info)));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(err, self.log.clone(), channel.clone(), Severity::Error)));

        let waited = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };

        let outcome = match waited {
            Some(status) => {
                let status = status.map_err(|source| Error::Process {
                    program: program.to_string(),
                    source,
                })?;
                // Drain whatever is still buffered in the pipes.
                join_all([stdout, stderr].into_iter().flatten()).await;
                ProcessOutcome::Exited(status)
            }
            None => {
                tracing::warn!(program, "timed out, killing");
                let _ = child.kill().await;
                for reader in [stdout, stderr].into_iter().flatten() {
                    reader.abort();
                }
                ProcessOutcome::TimedOut
            }
        };

        if let ProcessOutcome::Exited(status) = &outcome {
            tracing::debug!(program, %status, "exited");
        }
        Ok(outcome)
    }
}

fn channel_name(program: &str) -> String {
    Path::new(program)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string())
}

/// Forward every line until EOF. Lines are decoded lossily: tools echo raw
/// tag values, and a reader that stops early leaves the child to die on
/// SIGPIPE.
async fn forward_lines<R>(reader: R, log: Arc<dyn LogSink>, channel: String, severity: Severity)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if !line.is_empty() {
                    log.log_line(&channel, severity, line);
                }
            }
            Err(e) => tracing::debug!(channel = %channel, "read error on child output: {}", e),
        }
    }
}
