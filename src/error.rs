use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    // The underlying error is kept untouched as the source
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WalkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WalkError::Io {
            path: path.into(),
            source,
        }
    }

    /// POSIX-style code for machine inspection, when one applies.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            WalkError::InvalidArgument(_) => Some("EINVAL"),
            WalkError::NotADirectory { .. } => Some("ENOTDIR"),
            WalkError::Io { .. } => None,
        }
    }

    pub fn kind(&self) -> io::ErrorKind {
        match self {
            WalkError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            WalkError::NotADirectory { .. } => io::ErrorKind::NotADirectory,
            WalkError::Io { source, .. } => source.kind(),
        }
    }

    /// Path the failure relates to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            WalkError::InvalidArgument(_) => None,
            WalkError::NotADirectory { path } | WalkError::Io { path, .. } => Some(path),
        }
    }
}

impl From<WalkError> for io::Error {
    fn from(e: WalkError) -> Self {
        match e {
            WalkError::Io { source, .. } => source,
            other => io::Error::new(other.kind(), other),
        }
    }
}

pub type WalkResult<T> = Result<T, WalkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_directory_code() {
        let err = WalkError::NotADirectory {
            path: PathBuf::from("/tmp/file.txt"),
        };
        assert_eq!(err.code(), Some("ENOTDIR"));
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);
        assert_eq!(err.to_string(), "not a directory: /tmp/file.txt");
    }

    #[test]
    fn test_io_error_is_verbatim() {
        let err = WalkError::io(
            "/locked",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(err.code(), None);

        let back: io::Error = err.into();
        assert_eq!(back.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(back.to_string(), "denied");
    }
}
