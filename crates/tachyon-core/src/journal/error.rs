//! Journal I/O and recovery errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal record corrupt: {reason}")]
    Corrupt { reason: String },

    #[error("failed to encode journal record: {0}")]
    Encode(#[from] bincode::Error),
}

pub type JournalResult<T> = Result<T, JournalError>;
