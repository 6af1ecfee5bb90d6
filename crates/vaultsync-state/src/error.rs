//! State backend error types.

/// Errors produced by [`StateBackend`](crate::StateBackend) and
/// [`RecordSink`](crate::RecordSink) operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// `SQLite` failure with operation context.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// File-system I/O failure (e.g. creating the database directory).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal mutex was poisoned by a panicked thread.
    #[error("state backend lock poisoned")]
    LockPoisoned,
}

impl StateError {
    /// Wrap a `SQLite` error with the failing operation's name.
    pub fn context(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Context {
            context: context.into(),
            source,
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_poisoned_displays() {
        assert_eq!(StateError::LockPoisoned.to_string(), "state backend lock poisoned");
    }

    #[test]
    fn context_displays_operation() {
        let err = StateError::context("persist_records: begin tx", rusqlite::Error::InvalidQuery);
        assert!(err.to_string().contains("persist_records"));
    }

    #[test]
    fn io_error_wraps() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = StateError::Io(inner);
        assert!(err.to_string().contains("i/o"));
    }
}
