//! Errors surfaced by worker-registry operations.
//!
//! `cachedFile`/`addCheckpoint` reuse [`crate::namespace::error::NamespaceError`]
//! for `FileDoesNotExist`/`SuspectedFileSize` per the RPC contract in
//! `SPEC_FULL.md` §6 — there is no separate worker-specific variant for
//! those two, only for conditions unique to the registry itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker {id} is not registered")]
    UnknownWorker { id: i64 },

    #[error("no local worker for host {host}")]
    NoLocalWorker { host: String },

    #[error(transparent)]
    Namespace(#[from] crate::namespace::error::NamespaceError),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
