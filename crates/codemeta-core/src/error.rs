//! Extraction error and diagnostic types.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while extracting entities from one file.
///
/// None of these escape [`crate::EntityParser::parse_file`]; they are
/// turned into a [`Diagnostic`] and an empty (or partial) entity list.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No extractor is registered for the file's extension.
    #[error("No extractor registered for {}", path.display())]
    UnsupportedExtension { path: PathBuf },

    /// The file could not be read at all.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exceeds the configured size limit.
    #[error("{} is {size} bytes, above the {limit} byte limit", path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// The content is not valid for its language variant.
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: u32, message: String },

    /// The grammar could not be loaded into the parser.
    #[error("Grammar error: {0}")]
    Grammar(String),

    /// The compiler service could not be located or started.
    #[error("Compiler service {} is unavailable: {message}", program.display())]
    RuntimeUnavailable { program: PathBuf, message: String },

    /// The compiler service did not finish within the bounded wait.
    #[error("Compiler service timed out after {}ms", timeout.as_millis())]
    Timeout { timeout: Duration },

    /// The compiler service exited unsuccessfully.
    #[error("Compiler service failed ({status}): {message}")]
    ServiceFailed { status: String, message: String },

    /// The compiler service rejected the file as syntactically invalid
    /// without reporting a line.
    #[error("Syntax error reported by compiler service: {message}")]
    ServiceSyntax { message: String },

    /// The compiler service exited successfully but its output was unusable.
    #[error("Compiler service produced invalid output: {0}")]
    InvalidOutput(String),
}

impl ExtractError {
    /// Diagnostic category for this error.
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::UnsupportedExtension { .. } => DiagnosticKind::UnsupportedExtension,
            Self::Read { .. } => DiagnosticKind::ReadFailure,
            Self::FileTooLarge { .. } => DiagnosticKind::FileTooLarge,
            Self::Syntax { .. } | Self::ServiceSyntax { .. } | Self::Grammar(_) => {
                DiagnosticKind::SyntaxError
            }
            Self::RuntimeUnavailable { .. } => DiagnosticKind::RuntimeUnavailable,
            Self::Timeout { .. } => DiagnosticKind::Timeout,
            Self::ServiceFailed { .. } | Self::InvalidOutput(_) => DiagnosticKind::ServiceFailure,
        }
    }

    /// Source line the error points at, if any.
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Category of a recovered failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnsupportedExtension,
    ReadFailure,
    FileTooLarge,
    SyntaxError,
    RuntimeUnavailable,
    Timeout,
    ServiceFailure,
    /// Stylesheet scanning stopped at a structural break; earlier entities kept.
    PartialStructure,
    /// The file was not valid UTF-8 and was decoded as Latin-1.
    EncodingFallback,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedExtension => "unsupported_extension",
            Self::ReadFailure => "read_failure",
            Self::FileTooLarge => "file_too_large",
            Self::SyntaxError => "syntax_error",
            Self::RuntimeUnavailable => "runtime_unavailable",
            Self::Timeout => "timeout",
            Self::ServiceFailure => "service_failure",
            Self::PartialStructure => "partial_structure",
            Self::EncodingFallback => "encoding_fallback",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded, non-fatal problem encountered during one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

impl From<&ExtractError> for Diagnostic {
    fn from(err: &ExtractError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            line: err.line(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "[{}] line {}: {}", self.kind, line, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let unavailable = ExtractError::RuntimeUnavailable {
            program: PathBuf::from("codemeta-tsc"),
            message: "not found".to_string(),
        };
        let syntax = ExtractError::Syntax {
            line: 4,
            message: "unexpected `}`".to_string(),
        };
        let timeout = ExtractError::Timeout {
            timeout: Duration::from_secs(30),
        };

        assert_eq!(unavailable.kind(), DiagnosticKind::RuntimeUnavailable);
        assert_eq!(syntax.kind(), DiagnosticKind::SyntaxError);
        assert_eq!(timeout.kind(), DiagnosticKind::Timeout);
        assert_ne!(unavailable.kind(), syntax.kind());
    }

    #[test]
    fn test_diagnostic_from_error() {
        let err = ExtractError::Syntax {
            line: 7,
            message: "missing `)`".to_string(),
        };
        let diag = Diagnostic::from(&err);
        assert_eq!(diag.kind, DiagnosticKind::SyntaxError);
        assert_eq!(diag.line, Some(7));
        assert!(diag.message.contains("line 7"));
        assert_eq!(diag.to_string(), format!("[syntax_error] line 7: {}", err));
    }

    #[test]
    fn test_timeout_message() {
        let err = ExtractError::Timeout {
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Compiler service timed out after 250ms");
    }
}
