//! Crate-root re-export of every subsystem's error type, mirroring
//! `oxcrypt-core/src/error/mod.rs`'s pure re-export module.

pub use crate::dependency::error::{DependencyError, DependencyResult};
pub use crate::journal::error::{JournalError, JournalResult};
pub use crate::namespace::error::{NamespaceError, NamespaceResult, PathContext};
pub use crate::worker::error::{WorkerError, WorkerResult};
