//! Journal record types.
//!
//! Every record is self-delimiting (length-prefixed) and carries its type
//! tag via the `JournalRecord` enum discriminant, encoded with `bincode`.
//! Inode records carry full current state, including tombstones via a
//! negative id in the header.

use serde::{Deserialize, Serialize};

use crate::dependency::model::Dependency;
use crate::inode::{File, Folder, Inode, InodeHeader, InodeKind, RawTable};

/// One entry in the write-ahead log or checkpoint file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JournalRecord {
    /// Marks the start of a logically atomic group of records (see
    /// `SPEC_FULL.md` §9, "Atomicity of multi-record operations").
    TxnBegin { txn_id: u64 },
    /// Marks the successful end of that group. A `TxnBegin` with no
    /// matching `TxnCommit` at end-of-stream is a torn write and its
    /// in-between records are discarded on replay.
    TxnCommit { txn_id: u64 },
    InodeFile { header: InodeHeader, file: File },
    InodeFolder { header: InodeHeader, folder: Folder },
    InodeRawTable { header: InodeHeader, table: RawTable },
    Dependency(Dependency),
    CheckpointInfo {
        inode_counter: i32,
        dependency_counter: i32,
    },
}

impl From<&Inode> for JournalRecord {
    fn from(inode: &Inode) -> Self {
        match &inode.kind {
            InodeKind::File(file) => JournalRecord::InodeFile {
                header: inode.header.clone(),
                file: file.clone(),
            },
            InodeKind::Folder(folder) => JournalRecord::InodeFolder {
                header: inode.header.clone(),
                folder: folder.clone(),
            },
            InodeKind::RawTable(table) => JournalRecord::InodeRawTable {
                header: inode.header.clone(),
                table: table.clone(),
            },
        }
    }
}

impl JournalRecord {
    /// Reconstructs the `Inode` carried by an `InodeFile`/`InodeFolder`/
    /// `InodeRawTable` record, for recovery. `None` for every other variant.
    pub fn into_inode(self) -> Option<Inode> {
        match self {
            JournalRecord::InodeFile { header, file } => Some(Inode {
                header,
                kind: InodeKind::File(file),
            }),
            JournalRecord::InodeFolder { header, folder } => Some(Inode {
                header,
                kind: InodeKind::Folder(folder),
            }),
            JournalRecord::InodeRawTable { header, table } => Some(Inode {
                header,
                kind: InodeKind::RawTable(table),
            }),
            _ => None,
        }
    }
}
