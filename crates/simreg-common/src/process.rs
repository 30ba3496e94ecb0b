//! External process execution with stderr relayed into the log stream

use crate::error::ProcessError;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{Instrument, Span, debug};

/// Lines buffered between the stderr reader and the log drain
const STDERR_CHANNEL_CAPACITY: usize = 256;

/// Run `cmd` to completion, relaying every stderr line to the log at `debug`.
///
/// The child's stderr is read by one task and handed through a bounded
/// channel to a drain task that logs under the current span, while the caller
/// awaits the exit status. stdout is left as configured on `cmd`.
pub async fn run_logged(cmd: &mut Command) -> Result<ExitStatus, ProcessError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    debug!(target: "simreg::process", "exec: {:?}", cmd.as_std());

    let mut child = cmd
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn { program: program.clone(), source })?;

    let (tx, mut rx) = mpsc::channel::<String>(STDERR_CHANNEL_CAPACITY);

    let reader = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        })
    });

    let label = program.clone();
    let drain = tokio::spawn(
        async move {
            while let Some(line) = rx.recv().await {
                debug!(target: "simreg::process", "[{label}] {line}");
            }
        }
        .instrument(Span::current()),
    );

    let status = child.wait().await.map_err(|source| ProcessError::Wait { program, source });

    if let Some(reader) = reader {
        let _ = reader.await;
    }
    let _ = drain.await;

    status
}

/// Open `path` as a child stdio handle, appending or truncating
pub fn file_stdio(path: &Path, append: bool) -> Result<Stdio, ProcessError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|source| ProcessError::LogFile { path: path.to_path_buf(), source })?;
    Ok(Stdio::from(file))
}
