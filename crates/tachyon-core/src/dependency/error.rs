//! Errors surfaced by dependency-graph operations.
//!
//! `createDependency`'s path-resolution failures reuse
//! [`crate::namespace::error::NamespaceError`] for `InvalidPath`/
//! `FileDoesNotExist` per the RPC contract in `SPEC_FULL.md` §6/§7 — there
//! is no separate dependency-specific variant for those two, only for
//! conditions unique to the dependency graph itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("dependency {id} does not exist")]
    DependencyDoesNotExist { id: i32 },

    #[error(transparent)]
    Namespace(#[from] crate::namespace::error::NamespaceError),

    #[error("journal error while recording dependency")]
    Journal(#[from] crate::journal::error::JournalError),
}

pub type DependencyResult<T> = Result<T, DependencyError>;
