//! Error types for the mpstream crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for building multipart streams.
#[derive(Error, Debug)]
pub enum Error {
    /// Boundary is empty or longer than 69 characters.
    #[error("invalid boundary length {0}, must be between 1 and 69")]
    InvalidBoundaryLength(usize),

    /// Boundary contains a character outside the RFC 2046 set.
    #[error("invalid boundary character: {0:?}")]
    InvalidBoundaryCharacter(char),

    /// The random source could not produce a boundary.
    #[error("random source failure: {0}")]
    Random(getrandom::Error),

    /// A form needs at least one part.
    #[error("multipart form has no parts")]
    NoParts,

    /// The total body length does not fit in a u64.
    #[error("content length overflows u64")]
    LengthOverflow,

    /// A file part was requested for a directory.
    #[error("cannot make file part for directory {}", .0.display())]
    IsDirectory(PathBuf),

    /// Stat or open failure for a file part.
    #[error("file part {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A structured value could not be encoded as JSON.
    #[error("error marshalling field {field:?} to json: {source}")]
    Json {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    /// A deferred part failed to build.
    #[error("error building part[{index}]: {source}")]
    BuildPart {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// MIME type table error
    #[error("MIME type error: {0}")]
    MimeType(String),
}

/// Specialized Result type for mpstream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A single part body that failed to close.
#[derive(Error, Debug)]
#[error("part[{index}]: {source}")]
pub struct PartCloseFailure {
    /// Position of the part in the form.
    pub index: usize,
    #[source]
    pub source: io::Error,
}

/// Failures collected while closing every part of a form.
///
/// Closing never stops at the first failure, so this holds either the one
/// failure that happened or all of them in part order.
#[derive(Error, Debug)]
pub enum CloseError {
    /// Exactly one part failed to close.
    #[error(transparent)]
    Single(PartCloseFailure),

    /// More than one part failed to close.
    #[error("encountered {} errors while closing parts: {}", .0.len(), join_failures(.0))]
    Multiple(Vec<PartCloseFailure>),
}

impl CloseError {
    /// Aggregates collected failures, `None` when there are none.
    pub fn from_failures(mut failures: Vec<PartCloseFailure>) -> Option<Self> {
        match failures.len() {
            0 => None,
            1 => failures.pop().map(CloseError::Single),
            _ => Some(CloseError::Multiple(failures)),
        }
    }

    /// Number of parts that failed to close.
    pub fn len(&self) -> usize {
        match self {
            CloseError::Single(_) => 1,
            CloseError::Multiple(failures) => failures.len(),
        }
    }

    /// Always false; an empty aggregate is never constructed.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates over the wrapped failures in part order.
    pub fn iter(&self) -> std::slice::Iter<'_, PartCloseFailure> {
        match self {
            CloseError::Single(failure) => std::slice::from_ref(failure).iter(),
            CloseError::Multiple(failures) => failures.iter(),
        }
    }

    /// Consumes the aggregate and returns the wrapped failures.
    pub fn into_failures(self) -> Vec<PartCloseFailure> {
        match self {
            CloseError::Single(failure) => vec![failure],
            CloseError::Multiple(failures) => failures,
        }
    }
}

fn join_failures(failures: &[PartCloseFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}]: {}", f.index, f.source))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A part body yielded a different number of bytes than it declared.
///
/// Only produced when size verification is enabled in the config; it travels
/// inside an `io::Error` of kind `InvalidData`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("part[{index}] declared {declared} bytes but its body yielded {actual}")]
pub struct SizeMismatch {
    pub index: usize,
    pub declared: u64,
    pub actual: u64,
}

impl From<SizeMismatch> for io::Error {
    fn from(err: SizeMismatch) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn failure(index: usize, msg: &str) -> PartCloseFailure {
        PartCloseFailure {
            index,
            source: io::Error::new(io::ErrorKind::Other, msg.to_string()),
        }
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidBoundaryLength(70);
        assert_eq!(
            err.to_string(),
            "invalid boundary length 70, must be between 1 and 69"
        );

        let err = Error::InvalidBoundaryCharacter(' ');
        assert_eq!(err.to_string(), "invalid boundary character: ' '");

        let err = Error::IsDirectory(PathBuf::from("/tmp"));
        assert_eq!(err.to_string(), "cannot make file part for directory /tmp");

        let err = Error::BuildPart {
            index: 2,
            source: Box::new(Error::NoParts),
        };
        assert_eq!(err.to_string(), "error building part[2]: multipart form has no parts");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_close_error_aggregation() {
        assert!(CloseError::from_failures(Vec::new()).is_none());

        let single = CloseError::from_failures(vec![failure(1, "boom")]).unwrap();
        assert!(matches!(single, CloseError::Single(_)));
        assert_eq!(single.len(), 1);
        assert_eq!(single.to_string(), "part[1]: boom");

        let multiple =
            CloseError::from_failures(vec![failure(0, "e1"), failure(2, "e3")]).unwrap();
        assert_eq!(multiple.len(), 2);
        assert_eq!(
            multiple.to_string(),
            "encountered 2 errors while closing parts: [0]: e1, [2]: e3"
        );
        let indexes: Vec<_> = multiple.iter().map(|f| f.index).collect();
        assert_eq!(indexes, vec![0, 2]);
        assert_eq!(multiple.into_failures().len(), 2);
    }

    #[test]
    fn test_size_mismatch_into_io() {
        let err: io::Error = SizeMismatch {
            index: 0,
            declared: 3,
            actual: 2,
        }
        .into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let inner = err.get_ref().unwrap().downcast_ref::<SizeMismatch>().unwrap();
        assert_eq!(inner.actual, 2);
    }
}
