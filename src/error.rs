//! Error types and error handling strategy for the task board.
//!
//! Errors are explicit and typed. Every public board operation that can fail
//! returns [`Result`]; task functions themselves never surface errors to the
//! executor. A task function returning normally is "completed", full stop,
//! and panics are contained at the resume boundary.

use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The admission limit was reached; the task was not created.
    ///
    /// Callers typically retry after a yield or a short backoff.
    AdmissionDenied,
    /// An in-task operation was called from outside a running task.
    NotInTask,
    /// The underlying coroutine (stack) could not be created.
    CoroutineCreate,
    /// The board is shutting down.
    Shutdown,
    /// Internal protocol violation (a bug in the board itself).
    Internal,
}

impl ErrorKind {
    /// A short static description of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdmissionDenied => "admission limit reached",
            Self::NotInTask => "not called from within a task",
            Self::CoroutineCreate => "coroutine creation failed",
            Self::Shutdown => "task board shutting down",
            Self::Internal => "internal task board error",
        }
    }
}

/// The error type for task board operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    context: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Attaches a human-readable context string.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attaches an underlying source error.
    #[must_use]
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// True if this error is the admission limit being reached.
    #[must_use]
    pub const fn is_admission_denied(&self) -> bool {
        matches!(self.kind, ErrorKind::AdmissionDenied)
    }

    /// True if this error is a misuse of an in-task-only operation.
    #[must_use]
    pub const fn is_not_in_task(&self) -> bool {
        matches!(self.kind, ErrorKind::NotInTask)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if let Some(context) = &self.context {
            write!(f, ": {context}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Result alias for task board operations.
pub type Result<T> = std::result::Result<T, Error>;
