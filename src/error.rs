use thiserror::Error;

/// The error taxonomy a `RemoteClient` or engine task can surface.
///
/// `Network` and `RateLimited` are retried internally by the remote client up to its backoff
/// cap; every other kind is expected to propagate all the way to a `TaskFailure`.
#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("rate limited after {attempts} attempt(s)")]
    RateLimited { attempts: u32 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("name already in use: {0}")]
    NameCollision(String),
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{0} contains both files and subdirectories")]
    MixedContent(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("local I/O error: {0}")]
    LocalIO(String),
    #[error("canceled")]
    Canceled,
}

impl ErrorKind {
    /// Whether this error kind should be retried by `RemoteClient` internally rather than
    /// surfaced to the task that issued the request.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Network(_) | ErrorKind::RateLimited { .. }
        )
    }

}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        ErrorKind::LocalIO(err.to_string())
    }
}

/// One failure attached to a run-wide `SyncReport`. Never aborts sibling tasks.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub path: String,
    pub kind: ErrorKind,
    pub detail: String,
}

impl TaskFailure {
    pub fn new(path: impl Into<String>, kind: ErrorKind) -> Self {
        let detail = kind.to_string();
        Self {
            path: path.into(),
            kind,
            detail,
        }
    }
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_and_rate_limited_are_retriable() {
        assert!(ErrorKind::Network("timeout".into()).is_retriable());
        assert!(ErrorKind::RateLimited { attempts: 2 }.is_retriable());
    }

    #[test]
    fn validation_errors_are_not_retriable() {
        assert!(!ErrorKind::NameCollision("dup".into()).is_retriable());
        assert!(!ErrorKind::Auth("bad token".into()).is_retriable());
        assert!(!ErrorKind::Canceled.is_retriable());
    }

    #[test]
    fn task_failure_display_includes_path_and_detail() {
        let failure = TaskFailure::new("root/2015/a.jpg", ErrorKind::PayloadTooLarge("51MB".into()));
        assert!(failure.to_string().starts_with("root/2015/a.jpg: "));
    }
}
