//! Errors surfaced by namespace operations.

use thiserror::Error;

/// Context attached to a namespace error: the path and/or id involved.
///
/// Mirrors the builder-style context structs the rest of this codebase's
/// lineage uses for error reporting (set only the fields you have).
#[derive(Debug, Clone, Default)]
pub struct PathContext {
    pub path: Option<String>,
    pub id: Option<i32>,
}

impl PathContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }
}

impl std::fmt::Display for PathContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.path, self.id) {
            (Some(path), Some(id)) => write!(f, "path={path} id={id}"),
            (Some(path), None) => write!(f, "path={path}"),
            (None, Some(id)) => write!(f, "id={id}"),
            (None, None) => write!(f, "<no context>"),
        }
    }
}

/// Caller-facing errors from namespace and worker-registry operations.
///
/// These are the error kinds listed in the RPC error columns of the
/// external interface contract; the master never retries them internally.
#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("invalid path ({0})")]
    InvalidPath(PathContext),

    #[error("file already exists ({0})")]
    FileAlreadyExists(PathContext),

    #[error("file does not exist ({0})")]
    FileDoesNotExist(PathContext),

    #[error("invalid column count for raw table ({0})")]
    TableColumn(PathContext),

    #[error("raw table does not exist ({0})")]
    TableDoesNotExist(PathContext),

    #[error("suspected file size mismatch for {context}: expected {expected}, got {actual}")]
    SuspectedFileSize {
        context: PathContext,
        expected: i64,
        actual: i64,
    },

    #[error("no local worker for host {host}")]
    NoLocalWorker { host: String },
}

pub type NamespaceResult<T> = Result<T, NamespaceError>;
