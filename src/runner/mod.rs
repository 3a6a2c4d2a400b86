// file: src/runner/mod.rs
// version: 1.1.0
// guid: 5b7a4e90-c1d3-4f68-8a2e-6d95b03c71f4

//! Run orchestration
//!
//! A run walks a fixed sequence: prepare the log directory and event log,
//! create the workspace, launch the child with piped output, drain both
//! streams into capture files, wait (with optional timeout and Ctrl-C
//! handling), record side effects, stage artifacts, write the summary and
//! finally clean up or persist the workspace. Staging and cleanup execute
//! even when the child fails, times out or is interrupted; only a launch
//! failure skips staging.

pub mod capture;
pub mod summary;

pub use summary::{RunStatus, RunSummary};

use crate::artifacts::{ArtifactStager, StagedArtifact};
use crate::config::RunRequest;
use crate::error::RunnerError;
use crate::logging::RunLog;
use crate::workspace::{ensure_dir, Workspace, WorkspaceSnapshot};
use crate::Result;
use chrono::Utc;
use colored::Color;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Longest stderr excerpt copied into the event log on failure
const STDERR_EXCERPT_BYTES: u64 = 64 * 1024;

/// How long to keep draining the capture pipes once the child is gone.
/// A background process the child left behind inherits the pipe ends
/// and can hold them open long after the run itself is over.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Unique identifier for a run
///
/// Names the log files, the summary and the default persistent
/// workspace. Timestamp first so directory listings sort by run time.
#[derive(Debug, Clone)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
        let unique = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("run-{}-{}", timestamp, &unique[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name for the default persistent workspace
    pub fn workspace_dir_name(&self) -> String {
        format!("{}-workspace", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything `main` needs after a run to report and exit
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
    /// Child exit code, 128+signal when signal-killed, `None` when the
    /// child never ran to completion
    pub exit_code: Option<i32>,
    /// Staging reported failures or violated strict mode
    pub staging_failed: bool,
    pub event_log_path: PathBuf,
    pub summary_path: PathBuf,
}

impl RunOutcome {
    /// Process exit code for this outcome. The child's own code always
    /// wins when it ran to completion; a staging failure only surfaces
    /// as exit 1 when the child itself succeeded. Timeout maps to 124
    /// and interrupt to 130, following the conventions of timeout(1)
    /// and shell SIGINT handling.
    pub fn process_exit_code(&self) -> u8 {
        match self.status {
            RunStatus::TimedOut => 124,
            RunStatus::Interrupted => 130,
            RunStatus::Succeeded => {
                if self.staging_failed {
                    1
                } else {
                    0
                }
            }
            RunStatus::Failed => match self.exit_code {
                Some(code) if (0..=255).contains(&code) => code as u8,
                _ => 1,
            },
        }
    }
}

/// Executes one run from start to finish
pub struct Runner {
    request: RunRequest,
    run_id: RunId,
}

impl Runner {
    pub fn new(request: RunRequest) -> Self {
        Self {
            request,
            run_id: RunId::generate(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Execute the run to completion
    pub async fn run(&self) -> Result<RunOutcome> {
        ensure_dir(&self.request.log_dir)?;

        let event_log_path = self.log_file("log");
        let stdout_path = self.log_file("stdout.log");
        let stderr_path = self.log_file("stderr.log");
        let summary_path = self.log_file("json");

        let mut run_log = RunLog::create(&event_log_path, self.request.verbose)?;
        info!("Run {} logging to {}", self.run_id, event_log_path.display());

        let workspace = Workspace::create(
            self.request.workspace_dir.as_deref(),
            self.request.persist_workspace,
            &self.request.log_dir,
            &self.run_id.workspace_dir_name(),
        )?;

        if workspace.is_ephemeral()
            && self.request.stage_mode == crate::artifacts::StageMode::Symlink
        {
            warn!(
                "Symlinked artifacts will dangle once the temporary workspace is removed; \
                 consider --workspace or dropping --no-persist"
            );
        }

        run_log.event_colored(
            &format!("Workspace ready at {}", workspace.path().display()),
            Color::Green,
        )?;
        run_log.event(&format!("Running: {}", self.request.display_command()))?;
        if let Some(timeout) = self.request.timeout {
            run_log.event(&format!("Timeout: {}s", timeout.as_secs()))?;
        }

        let before = WorkspaceSnapshot::capture(workspace.path())?;

        let resolved = match self.preflight(workspace.path()) {
            Ok(resolved) => resolved,
            Err(e) => {
                run_log.event_colored(&e.to_string(), Color::Red)?;
                return Err(e);
            }
        };
        debug!("Resolved command: {}", resolved.display());

        let started_at = Utc::now();
        let mut command = Command::new(&resolved);
        command
            .args(self.request.args())
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The child leads its own process group. On timeout or interrupt
        // the whole group is killed, the way timeout(1) signals it, so
        // grandchildren cannot outlive the run holding our pipes.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = RunnerError::launch(self.request.program(), e);
                run_log.event_colored(&err.to_string(), Color::Red)?;
                return Err(err);
            }
        };

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_file = capture::open_capture_file(&stdout_path).await?;
        let stderr_file = capture::open_capture_file(&stderr_path).await?;
        let echo = self.request.verbose;

        let stdout_task = tokio::spawn(async move {
            match stdout_pipe {
                Some(pipe) => {
                    capture::pump_stream(pipe, stdout_file, echo.then(tokio::io::stdout))
                        .await
                }
                None => Ok(0),
            }
        });
        let stderr_task = tokio::spawn(async move {
            match stderr_pipe {
                Some(pipe) => {
                    capture::pump_stream(pipe, stderr_file, echo.then(tokio::io::stderr))
                        .await
                }
                None => Ok(0),
            }
        });

        let (status, exit_code) = tokio::select! {
            result = child.wait() => {
                let exit = result?;
                let code = effective_exit_code(exit);
                if exit.success() {
                    (RunStatus::Succeeded, code)
                } else {
                    (RunStatus::Failed, code)
                }
            }
            _ = sleep_or_forever(self.request.timeout) => {
                warn!("Command exceeded its timeout; killing it");
                kill_child_group(&mut child).await;
                (RunStatus::TimedOut, None)
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted; killing command");
                kill_child_group(&mut child).await;
                (RunStatus::Interrupted, None)
            }
        };

        let (stdout_bytes, stderr_bytes) = tokio::join!(
            join_pump(stdout_task, "stdout", &stdout_path),
            join_pump(stderr_task, "stderr", &stderr_path),
        );
        debug!(
            "Captured {} stdout bytes, {} stderr bytes",
            stdout_bytes, stderr_bytes
        );

        self.log_exit(&mut run_log, status, exit_code, &stderr_path, stderr_bytes)
            .await?;

        let after = WorkspaceSnapshot::capture(workspace.path())?;
        let effects = before.diff(&after);
        if !effects.is_empty() {
            run_log.event_colored("Run side effects:", Color::Cyan)?;
            for dir in &effects.created_dirs {
                run_log.event_colored(
                    &format!("  created dir:  {}", dir.display()),
                    Color::Cyan,
                )?;
            }
            for file in &effects.created_files {
                run_log.event_colored(
                    &format!("  created file: {}", file.display()),
                    Color::Cyan,
                )?;
            }
        }

        let (staging_failed, artifacts) =
            self.stage_artifacts(workspace.path(), &mut run_log).await?;

        let summary = RunSummary {
            run_id: self.run_id.to_string(),
            command: self.request.command.clone(),
            workspace: workspace.path().to_path_buf(),
            workspace_persisted: !workspace.is_ephemeral(),
            started_at,
            finished_at: Utc::now(),
            status,
            exit_code,
            stdout_bytes,
            stderr_bytes,
            artifacts,
        };
        if let Err(e) = summary.write(&summary_path).await {
            warn!("Failed to write run summary: {}", e);
        }

        if workspace.is_ephemeral() {
            run_log.event("Removing temporary workspace")?;
            if let Err(e) = workspace.cleanup() {
                warn!("{}", e);
            }
        } else {
            run_log.event_colored(
                &format!("Workspace persisted at {}", workspace.path().display()),
                Color::Green,
            )?;
        }

        info!("Run {} {}", self.run_id, status);

        Ok(RunOutcome {
            run_id: self.run_id.to_string(),
            status,
            exit_code,
            staging_failed,
            event_log_path,
            summary_path,
        })
    }

    fn log_file(&self, suffix: &str) -> PathBuf {
        self.request
            .log_dir
            .join(format!("{}.{}", self.run_id, suffix))
    }

    /// Resolve the program before spawning so a missing or non-executable
    /// command is reported cleanly instead of surfacing as a spawn error.
    fn preflight(&self, cwd: &Path) -> Result<PathBuf> {
        let program = self.request.program();
        match which::which_in(program, std::env::var_os("PATH"), cwd) {
            Ok(resolved) => Ok(resolved),
            Err(_) => {
                let candidate = if Path::new(program).is_absolute() {
                    PathBuf::from(program)
                } else {
                    cwd.join(program)
                };
                if candidate.exists() {
                    Err(RunnerError::launch(
                        program,
                        std::io::Error::new(
                            std::io::ErrorKind::PermissionDenied,
                            "is not executable",
                        ),
                    ))
                } else {
                    Err(RunnerError::command_not_found(program))
                }
            }
        }
    }

    async fn log_exit(
        &self,
        run_log: &mut RunLog,
        status: RunStatus,
        exit_code: Option<i32>,
        stderr_path: &Path,
        stderr_bytes: u64,
    ) -> Result<()> {
        match status {
            RunStatus::Succeeded => {
                run_log.event_colored("Command succeeded (exit code 0)", Color::Green)?;
            }
            RunStatus::Failed => {
                let message = match exit_code {
                    Some(code) => format!("Command failed (exit code {})", code),
                    None => "Command failed".to_string(),
                };
                run_log.event_colored(&message, Color::Red)?;

                if stderr_bytes > 0 {
                    let (excerpt, truncated) =
                        read_tail(stderr_path, STDERR_EXCERPT_BYTES).await?;
                    if truncated {
                        run_log.event(&format!(
                            "Captured stderr (last {} of {} bytes):",
                            STDERR_EXCERPT_BYTES, stderr_bytes
                        ))?;
                    } else {
                        run_log.event("Captured stderr:")?;
                    }
                    run_log.raw_block(&excerpt)?;
                }
            }
            RunStatus::TimedOut => {
                let seconds = self.request.timeout.map(|t| t.as_secs()).unwrap_or(0);
                run_log.event_colored(
                    &format!("Command timed out after {}s and was killed", seconds),
                    Color::Red,
                )?;
            }
            RunStatus::Interrupted => {
                run_log.event_colored("Run interrupted; command killed", Color::Red)?;
            }
        }
        Ok(())
    }

    /// Stage artifacts and fold the report into the event log. Returns
    /// whether staging should count as failed and the staged set.
    async fn stage_artifacts(
        &self,
        workspace: &Path,
        run_log: &mut RunLog,
    ) -> Result<(bool, Vec<StagedArtifact>)> {
        if self.request.artifact_patterns.is_empty() {
            return Ok((false, Vec::new()));
        }

        let stager = ArtifactStager::new(
            self.request.artifacts_dir.clone(),
            self.request.stage_mode,
        );
        let report = match stager
            .stage_all(workspace, &self.request.artifact_patterns)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                run_log.event_colored(&format!("Artifact staging failed: {}", e), Color::Red)?;
                return Ok((true, Vec::new()));
            }
        };

        for pattern in &report.unmatched_patterns {
            run_log.event(&format!(
                "WARNING: artifact pattern '{}' matched nothing",
                pattern
            ))?;
        }
        for failure in &report.failures {
            run_log.event_colored(&format!("Staging failure: {}", failure), Color::Red)?;
        }
        if !report.staged.is_empty() {
            run_log.event(&format!(
                "Staged {} artifact(s) into {}",
                report.staged.len(),
                self.request.artifacts_dir.display()
            ))?;
        }

        let strict_violation = self.request.strict_artifacts
            && report.unmatched_patterns.len() == self.request.artifact_patterns.len();
        if strict_violation {
            run_log.event_colored(
                "No artifact pattern matched anything (strict mode)",
                Color::Red,
            )?;
        }

        Ok((report.has_failures() || strict_violation, report.staged))
    }
}

/// Exit code as a shell would report it: the child's own code, or
/// 128+signal when it died to a signal
fn effective_exit_code(status: std::process::ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(128 + signal);
        }
    }
    None
}

async fn sleep_or_forever(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}

/// Kill the child and, on Unix, everything else in its process group
async fn kill_child_group(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // Negative pid addresses the whole group the child leads
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
    if let Err(e) = child.start_kill() {
        warn!("Failed to kill child process: {}", e);
    }
    let _ = child.wait().await;
}

/// Wait for a capture task, but only within the drain grace period.
/// A surviving background process can keep the pipe open forever; past
/// the grace the task is aborted and the capture file's length stands
/// in for its byte count. Every fully read chunk is already on disk.
async fn join_pump(
    mut task: tokio::task::JoinHandle<std::io::Result<u64>>,
    stream: &str,
    capture_path: &Path,
) -> u64 {
    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(Ok(Ok(bytes))) => bytes,
        Ok(Ok(Err(e))) => {
            warn!("Capture of {} failed: {}", stream, e);
            0
        }
        Ok(Err(e)) => {
            warn!("Capture task for {} did not finish: {}", stream, e);
            0
        }
        Err(_) => {
            warn!(
                "Stopped capturing {}: the pipe is still held open after the command ended",
                stream
            );
            task.abort();
            let _ = task.await;
            tokio::fs::metadata(capture_path)
                .await
                .map(|m| m.len())
                .unwrap_or(0)
        }
    }
}

/// Read up to `max` bytes from the end of a capture file, lossily decoded
async fn read_tail(path: &Path, max: u64) -> Result<(String, bool)> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let truncated = len > max;
    if truncated {
        file.seek(std::io::SeekFrom::Start(len - max)).await?;
    }

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).await?;
    Ok((String::from_utf8_lossy(&bytes).into_owned(), truncated))
}
