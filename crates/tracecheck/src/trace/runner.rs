//! TLC process runner.
//!
//! Launches `tlc2.TLC` on the emitted artifacts and classifies its exit
//! status. The model checker itself is an external collaborator; only its
//! exit code and output are observed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use super::emit::ArtifactPaths;

pub const DEFAULT_JAR_NAME: &str = "tla2tools.jar";
const TLC_MAIN: &str = "tlc2.TLC";
/// Output lines kept in error diagnostics
const DIAGNOSTIC_TAIL: usize = 40;

#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("tla2tools.jar not found at {path}")]
    NotFound { path: PathBuf },

    #[error("failed to start {java}: {source}")]
    Spawn {
        java: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TLC did not finish within {0:?}")]
    Timeout(Duration),

    #[error("TLC rejected the trace ({status}, exit code {code}):\n{output}")]
    Rejected {
        status: TlcExitStatus,
        code: i32,
        output: String,
    },
}

/// The exit status of TLC, as documented by `tlc2.output.EC.ExitStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TlcExitStatus {
    Success,
    AssumptionViolation,
    Deadlock,
    SafetyViolation,
    /// A trace module's temporal property failed: the trace was rejected
    LivenessViolation,
    AssertionFailure,
    SpecParseError,
    ConfigParseError,
    StateSpaceTooLarge,
    SystemError,
    GenericError,
    Unknown(i32),
}

impl TlcExitStatus {
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => TlcExitStatus::Success,
            10 => TlcExitStatus::AssumptionViolation,
            11 => TlcExitStatus::Deadlock,
            12 => TlcExitStatus::SafetyViolation,
            13 => TlcExitStatus::LivenessViolation,
            14 => TlcExitStatus::AssertionFailure,
            150 => TlcExitStatus::SpecParseError,
            151 => TlcExitStatus::ConfigParseError,
            152 => TlcExitStatus::StateSpaceTooLarge,
            153 => TlcExitStatus::SystemError,
            255 => TlcExitStatus::GenericError,
            _ => TlcExitStatus::Unknown(code),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TlcExitStatus::Success)
    }
}

impl std::fmt::Display for TlcExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TlcExitStatus::Success => f.write_str("success"),
            TlcExitStatus::AssumptionViolation => f.write_str("assumption violation"),
            TlcExitStatus::Deadlock => f.write_str("deadlock"),
            TlcExitStatus::SafetyViolation => f.write_str("safety violation"),
            TlcExitStatus::LivenessViolation => f.write_str("liveness violation"),
            TlcExitStatus::AssertionFailure => f.write_str("assertion failure"),
            TlcExitStatus::SpecParseError => f.write_str("spec parse error"),
            TlcExitStatus::ConfigParseError => f.write_str("config parse error"),
            TlcExitStatus::StateSpaceTooLarge => f.write_str("state space too large"),
            TlcExitStatus::SystemError => f.write_str("system error"),
            TlcExitStatus::GenericError => f.write_str("generic error"),
            TlcExitStatus::Unknown(code) => write!(f, "unknown status {}", code),
        }
    }
}

/// Successful TLC run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckerVerdict {
    pub status: TlcExitStatus,
    pub exit_code: i32,
    pub duration_ms: u64,
    #[serde(skip)]
    pub output: Vec<String>,
}

/// Pick the jar: configured path, else `tla2tools.jar` in the working directory.
pub fn resolve_jar(configured: Option<&Path>) -> Result<PathBuf, CheckerError> {
    let path = configured
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_JAR_NAME));
    if path.is_file() {
        Ok(path)
    } else {
        Err(CheckerError::NotFound { path })
    }
}

#[derive(Debug, Clone)]
pub struct TlcRunner {
    tla2tools_path: PathBuf,
    java: PathBuf,
    workers: u32,
    timeout: Option<Duration>,
    /// Directory holding the protocol spec the trace module extends
    library: Option<PathBuf>,
}

impl TlcRunner {
    pub fn new(tla2tools_path: impl Into<PathBuf>) -> Self {
        Self {
            tla2tools_path: tla2tools_path.into(),
            java: PathBuf::from("java"),
            workers: 1,
            timeout: None,
            library: None,
        }
    }

    pub fn with_java(mut self, java: impl Into<PathBuf>) -> Self {
        self.java = java.into();
        self
    }

    pub fn with_workers(mut self, workers: u32) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_library(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library = Some(dir.into());
        self
    }

    /// Arguments after the java executable.
    fn args(&self, artifacts: &ArtifactPaths) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(lib) = &self.library {
            args.push(format!("-DTLA-Library={}", lib.display()));
        }
        args.push("-cp".to_string());
        args.push(self.tla2tools_path.display().to_string());
        args.push(TLC_MAIN.to_string());
        args.push("-workers".to_string());
        args.push(self.workers.to_string());
        args.push("-config".to_string());
        args.push(file_name(&artifacts.config));
        args.push(file_name(&artifacts.spec));
        args
    }

    fn build_command(&self, artifacts: &ArtifactPaths) -> Command {
        let mut cmd = Command::new(&self.java);
        cmd.args(self.args(artifacts));
        if let Some(dir) = artifacts.spec.parent().filter(|p| !p.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run TLC on the artifacts and wait for its verdict.
    pub async fn check(&self, artifacts: &ArtifactPaths) -> Result<CheckerVerdict, CheckerError> {
        let start = Instant::now();

        if !self.tla2tools_path.is_file() {
            return Err(CheckerError::NotFound {
                path: self.tla2tools_path.clone(),
            });
        }

        let mut cmd = self.build_command(artifacts);
        debug!("Running TLC command: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|source| CheckerError::Spawn {
            java: self.java.clone(),
            source,
        })?;

        let stdout = child.stdout.take().map(|s| collect_lines(s, "stdout"));
        let stderr = child.stderr.take().map(|s| collect_lines(s, "stderr"));

        let waited = match self.timeout {
            Some(limit) => match timeout(limit, child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("TLC timed out after {:?}", limit);
                    let _ = child.kill().await;
                    return Err(CheckerError::Timeout(limit));
                }
            },
            None => child.wait().await,
        };

        let status = waited.map_err(|source| CheckerError::Spawn {
            java: self.java.clone(),
            source,
        })?;
        let code = status.code().unwrap_or(-1);

        let mut output = join_lines(stdout).await;
        output.extend(join_lines(stderr).await);

        let tlc_status = TlcExitStatus::from_exit_code(code);
        if !tlc_status.is_success() {
            error!("TLC rejected the trace: {} (exit code {})", tlc_status, code);
            let tail_start = output.len().saturating_sub(DIAGNOSTIC_TAIL);
            return Err(CheckerError::Rejected {
                status: tlc_status,
                code,
                output: output[tail_start..].join("\n"),
            });
        }

        info!("TLC accepted the trace");
        Ok(CheckerVerdict {
            status: tlc_status,
            exit_code: code,
            duration_ms: start.elapsed().as_millis() as u64,
            output,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn collect_lines<R>(reader: R, stream: &'static str) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = Vec::new();
        let mut reader = BufReader::new(reader).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            trace!("TLC {}: {}", stream, line);
            lines.push(line);
        }
        lines
    })
}

async fn join_lines(handle: Option<JoinHandle<Vec<String>>>) -> Vec<String> {
    match handle {
        Some(h) => h.await.unwrap_or_default(),
        None => Vec::new(),
    }
}
