use std::fmt;

use thiserror::Error;

use crate::diagnostic::{Diagnostic, Severity};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("toolchain i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected session or link-unit construction arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("define `{name}` is given more than once")]
    DuplicateDefine { name: String },
    #[error("`{name}` is not a valid preprocessor identifier")]
    InvalidDefineName { name: String },
}

/// A diagnostic line that does not have the `<file>:<line>: <severity>: <text>` shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed diagnostic ({reason}): {line:?}")]
pub struct ParseError {
    pub line: String,
    pub reason: &'static str,
}

impl ParseError {
    pub(crate) fn new(line: &str, reason: &'static str) -> Self {
        Self {
            line: line.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilePhase {
    Compile,
    Link,
}

impl CompilePhase {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for CompilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fatal compiler or linker diagnostic.
///
/// Displays as the full toolchain message. When the message came from a
/// located diagnostic line, the parsed fields are available through the
/// accessors; linker and driver failures carry only the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    phase: CompilePhase,
    message: String,
    diagnostic: Option<Diagnostic>,
}

impl CompileError {
    /// Builds a compile-phase error from one diagnostic line.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let diagnostic = Diagnostic::parse(line)?;
        Ok(Self::located(CompilePhase::Compile, line, diagnostic))
    }

    pub fn located(phase: CompilePhase, message: impl Into<String>, diagnostic: Diagnostic) -> Self {
        Self {
            phase,
            message: message.into(),
            diagnostic: Some(diagnostic),
        }
    }

    pub fn unlocated(phase: CompilePhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            diagnostic: None,
        }
    }

    pub fn phase(&self) -> CompilePhase {
        self.phase
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }

    pub fn filename(&self) -> Option<&str> {
        self.diagnostic.as_ref().map(|d| d.filename.as_str())
    }

    pub fn lineno(&self) -> Option<u32> {
        self.diagnostic.as_ref().map(|d| d.lineno)
    }

    pub fn severity(&self) -> Option<Severity> {
        self.diagnostic.as_ref().map(|d| d.severity)
    }

    /// The diagnostic text without location and severity, or the whole
    /// message when it was not located.
    pub fn text(&self) -> &str {
        match &self.diagnostic {
            Some(diagnostic) => &diagnostic.text,
            None => &self.message,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CompileError {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("no link units were given")]
    NoLinkUnits,
    #[error("entry point `{symbol}` is not defined by any link unit")]
    MissingEntryPoint { symbol: String },
    #[error("linked image could not be loaded: {message}")]
    Load { message: String },
}
