//! Out-of-process extraction.
//!
//! A compiler service is any executable that takes one file path argument,
//! prints a JSON array of entities on stdout and exits 0, or prints a one
//! line diagnostic on stderr and exits non-zero. Exit code 2 means the file
//! itself is invalid; any other failure is the service's own.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::error::ExtractError;
use crate::schema::CodeEntity;

/// Default bounded wait for one service call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit code a service uses when the file itself is syntactically invalid.
pub const SYNTAX_EXIT_CODE: i32 = 2;

const SYNTAX_PREFIX: &str = "Syntax error at line ";

/// Invokes a compiler-service executable once per file.
#[derive(Debug, Clone)]
pub struct ProcessBridge {
    program: PathBuf,
    timeout: Duration,
}

impl ProcessBridge {
    /// `program` is resolved through `PATH` when it is a bare name.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Blocking invocation.
    ///
    /// Runs on a private single-threaded runtime on a helper thread, so it is
    /// safe to call from synchronous code and from inside another runtime.
    pub fn invoke(&self, path: &Path) -> Result<Vec<CodeEntity>, ExtractError> {
        std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .map_err(|e| ExtractError::RuntimeUnavailable {
                            program: self.program.clone(),
                            message: format!("failed to start async runtime: {}", e),
                        })?;
                    runtime.block_on(self.invoke_async(path))
                })
                .join()
                .unwrap_or_else(|_| {
                    Err(ExtractError::ServiceFailed {
                        status: "panicked".to_string(),
                        message: "bridge thread panicked".to_string(),
                    })
                })
        })
    }

    /// Spawn the service, wait at most `timeout`, decode its output.
    ///
    /// The child is killed if the wait expires. No retries.
    pub async fn invoke_async(&self, path: &Path) -> Result<Vec<CodeEntity>, ExtractError> {
        let started = Instant::now();

        let mut cmd = Command::new(&self.program);
        cmd.arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            program = %self.program.display(),
            path = %path.display(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Spawning compiler service"
        );

        let child = cmd.spawn().map_err(|e| ExtractError::RuntimeUnavailable {
            program: self.program.clone(),
            message: e.to_string(),
        })?;

        // Dropping the wait future on expiry drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ExtractError::ServiceFailed {
                status: "unknown".to_string(),
                message: format!("failed to collect service output: {}", e),
            })?,
            Err(_) => {
                tracing::debug!(path = %path.display(), "Compiler service timed out");
                return Err(ExtractError::Timeout {
                    timeout: self.timeout,
                });
            }
        };

        tracing::debug!(
            path = %path.display(),
            status = %output.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Compiler service exited"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("no diagnostic on stderr")
                .to_string();
            if output.status.code() == Some(SYNTAX_EXIT_CODE) {
                return Err(syntax_error(message));
            }
            return Err(ExtractError::ServiceFailed {
                status: describe_status(&output.status),
                message,
            });
        }

        // Warnings from a successful run are relayed, not turned into failures.
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            let line = line.trim();
            if !line.is_empty() {
                tracing::warn!(path = %path.display(), "Compiler service: {}", line);
            }
        }

        serde_json::from_slice::<Vec<CodeEntity>>(&output.stdout)
            .map_err(|e| ExtractError::InvalidOutput(e.to_string()))
    }
}

/// Recover the line from `Syntax error at line N: message` when present.
fn syntax_error(message: String) -> ExtractError {
    let parsed = message
        .strip_prefix(SYNTAX_PREFIX)
        .and_then(|rest| rest.split_once(':'))
        .and_then(|(line, rest)| Some((line.trim().parse::<u32>().ok()?, rest.trim().to_string())));
    match parsed {
        Some((line, rest)) => ExtractError::Syntax { line, message: rest },
        None => ExtractError::ServiceSyntax { message },
    }
}

fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    #[test]
    fn test_defaults() {
        let bridge = ProcessBridge::new("codemeta-tsc");
        assert_eq!(bridge.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(bridge.program(), Path::new("codemeta-tsc"));

        let bridge = bridge.with_timeout(Duration::from_millis(500));
        assert_eq!(bridge.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_program_is_runtime_unavailable() {
        let bridge = ProcessBridge::new("/nonexistent/codemeta-service-binary");
        let err = bridge.invoke(Path::new("a.ts")).unwrap_err();
        assert!(matches!(err, ExtractError::RuntimeUnavailable { .. }), "{err:?}");
    }

    #[test]
    fn test_syntax_error_line_is_recovered() {
        let err = ExtractError::Syntax {
            line: 7,
            message: "unexpected `}`".to_string(),
        };
        match syntax_error(err.to_string()) {
            ExtractError::Syntax { line, message } => {
                assert_eq!(line, 7);
                assert_eq!(message, "unexpected `}`");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = syntax_error("missing semicolon".to_string());
        assert!(matches!(err, ExtractError::ServiceSyntax { .. }));
        assert_eq!(err.kind(), DiagnosticKind::SyntaxError);
        assert_eq!(err.line(), None);
    }

    #[tokio::test]
    async fn test_invoke_inside_runtime() {
        // The blocking entry point must not panic when a runtime is already running.
        let bridge = ProcessBridge::new("/nonexistent/codemeta-service-binary");
        let err = bridge.invoke(Path::new("a.ts")).unwrap_err();
        assert!(matches!(err, ExtractError::RuntimeUnavailable { .. }));
    }
}
