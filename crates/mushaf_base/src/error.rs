use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Better control over error handling
- No dependencies to compile and integrate
- The HTTP layer needs to tell "not found" and "invalid argument" apart from
  genuine failures, which is easiest with a closed set of kinds
 */

/// Error variants that can occur in mushaf operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A chapter, verse or translation does not exist in the loaded data
    NotFound { what: String },

    /// Caller supplied an unusable argument; `valid` lists accepted alternatives
    InvalidArgument { message: String, valid: Vec<String> },

    /// Corpus or translation data is malformed or inconsistent
    LoadFailure { source_name: String, message: String },

    /// Multiple errors occurred during batch operations
    Multiple {
        errors: Vec<MushafError>,
        count: usize,
    },

    /// Catch-all for other errors with a message
    Message { message: String },
}

/* 📖 # Why separate ErrorKind and MushafError?
ErrorKind carries the structural variant callers match on (the API maps
NotFound to 404 and InvalidArgument to 400). MushafError wraps it with a
context stack and the span trace captured at creation time.
*/

/// Error type wrapping [`ErrorKind`] with context and a captured span trace.
pub struct MushafError {
    kind: ErrorKind,
    context: Vec<String>,
    span_trace: SpanTrace,
}

impl MushafError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a catch-all message error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates a not found error for the described item.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound { what: what.into() })
    }

    /// Creates an invalid argument error listing the accepted alternatives.
    pub fn invalid_argument(message: impl Into<String>, valid: Vec<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument {
            message: message.into(),
            valid,
        })
    }

    /// Creates a load failure for the named data source.
    pub fn load_failure(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LoadFailure {
            source_name: source_name.into(),
            message: message.into(),
        })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the context entries in the order they were attached.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidArgument { .. })
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_kind(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::NotFound { what } => write!(f, "{} not found", what),
            ErrorKind::InvalidArgument { message, valid } => {
                if valid.is_empty() {
                    write!(f, "{}", message)
                } else {
                    write!(f, "{} (valid: {})", message, valid.join(", "))
                }
            }
            ErrorKind::LoadFailure {
                source_name,
                message,
            } => write!(f, "Failed to load {}: {}", source_name, message),
            ErrorKind::Multiple { errors, count } => match errors.first() {
                Some(first) => write!(f, "Multiple errors occurred ({} total): {}", count, first),
                None => write!(f, "Multiple errors occurred ({} total)", count),
            },
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

impl From<ErrorKind> for MushafError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for MushafError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            ErrorKind::Multiple { errors, .. } => errors.first().and_then(|e| e.source()),
            _ => None,
        }
    }
}

impl fmt::Display for MushafError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        self.fmt_kind(f)
    }
}

/* 📖 # Why a hand-written Debug implementation?
`main` returning an error and `unwrap()` in tests both print the Debug form.
The derived output would dump the raw SpanTrace struct; instead we print the
message, the context stack as a tree and the span trace when one was captured.
*/
impl fmt::Debug for MushafError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_kind(f)?;
        writeln!(f)?;
        let last = self.context.len().saturating_sub(1);
        for (i, ctx) in self.context.iter().enumerate() {
            let branch = if i == last { "└─" } else { "├─" };
            writeln!(f, "{} {}", branch, ctx)?;
        }
        if let Some(source) = self.source() {
            writeln!(f, "Caused by: {}", source)?;
        }
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/* 📖 # Why use Box<MushafError> in the result type?

Boxing the error reduces the size of the result type, making it more efficient
to return in the common case. Every lookup on the hot request path returns a
MushafResult, so keeping Ok values small matters.
*/

/// Standard result type for mushaf operations.
pub type MushafResult<T> = std::result::Result<T, Box<MushafError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> MushafResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> MushafResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for MushafResult<T> {
    fn context(self, context: impl Into<String>) -> MushafResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> MushafResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Build a boxed message error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::MushafError::message(format!($($arg)*)))
    };
}

/// Return early with a boxed message error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
