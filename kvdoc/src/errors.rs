use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::{atomic, Atomic};

/// Error kinds for kvdoc operations
///
/// Each kind describes one category of failure so callers can decide whether an
/// error aborts the whole operation or only concerns a single document.
///
/// # Examples
///
/// ```rust,ignore
/// use kvdoc::errors::{KvDocError, ErrorKind, KvDocResult};
///
/// fn example() -> KvDocResult<()> {
///     Err(KvDocError::new("Unknown operator $foo", ErrorKind::InvalidOperator))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Store Errors
    /// The backing key-value store could not be reached or rejected the call
    StoreUnavailable,
    /// The caller supplied deadline passed before the store answered
    StoreTimeout,

    // Record Errors
    /// A stored value could not be decoded back into a document
    CorruptRecord,
    /// Error serializing a document into its stored form
    EncodingError,

    // Input Errors
    /// The filter uses an unknown operator or a malformed operand
    InvalidOperator,
    /// The document or patch violates the document model
    InvalidDocument,
    /// The repository configuration was rejected at build time
    InvalidConfiguration,

    // Generic/Internal Errors - used as fallback
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::StoreUnavailable => write!(f, "Store unavailable"),
            ErrorKind::StoreTimeout => write!(f, "Store timeout"),
            ErrorKind::CorruptRecord => write!(f, "Corrupt record"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::InvalidOperator => write!(f, "Invalid operator"),
            ErrorKind::InvalidDocument => write!(f, "Invalid document"),
            ErrorKind::InvalidConfiguration => write!(f, "Invalid configuration"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom kvdoc error type.
///
/// `KvDocError` carries the error message, its kind and an optional cause. A
/// backtrace is captured on creation for debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use kvdoc::errors::{KvDocError, ErrorKind};
///
/// let err = KvDocError::new("connection refused", ErrorKind::StoreUnavailable);
///
/// let cause = KvDocError::new("unknown tag", ErrorKind::CorruptRecord);
/// let err = KvDocError::new_with_cause("Failed to read users:doc:n:1", ErrorKind::CorruptRecord, cause);
/// ```
///
/// # Type alias
///
/// The `KvDocResult<T>` type alias is equivalent to `Result<T, KvDocError>` and is used
/// throughout the codebase for operations that can fail.
#[derive(Clone)]
pub struct KvDocError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<KvDocError>>,
    backtrace: Atomic<Backtrace>,
}

impl KvDocError {
    /// Creates a new `KvDocError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        KvDocError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `KvDocError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: KvDocError) -> Self {
        KvDocError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&KvDocError> {
        self.cause.as_deref()
    }

    /// Returns `true` when the error only concerns a single document and must not
    /// abort a multi-document read.
    pub fn is_item_local(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::CorruptRecord | ErrorKind::StoreTimeout
        )
    }
}

impl Display for KvDocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for KvDocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for KvDocError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for kvdoc operations.
pub type KvDocResult<T> = Result<T, KvDocError>;

impl From<regex::Error> for KvDocError {
    fn from(err: regex::Error) -> Self {
        KvDocError::new(
            &format!("Invalid regex pattern: {}", err),
            ErrorKind::InvalidOperator,
        )
    }
}

impl From<bincode::error::EncodeError> for KvDocError {
    fn from(err: bincode::error::EncodeError) -> Self {
        KvDocError::new(
            &format!("Failed to encode document: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<bincode::error::DecodeError> for KvDocError {
    fn from(err: bincode::error::DecodeError) -> Self {
        KvDocError::new(
            &format!("Failed to decode document: {}", err),
            ErrorKind::CorruptRecord,
        )
    }
}

impl From<String> for KvDocError {
    fn from(msg: String) -> Self {
        KvDocError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for KvDocError {
    fn from(msg: &str) -> Self {
        KvDocError::new(msg, ErrorKind::InternalError)
    }
}
