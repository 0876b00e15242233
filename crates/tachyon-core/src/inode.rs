//! The inode model: files, folders, and raw tables.
//!
//! Inodes form a tree, never a graph with cycles, so they are represented
//! with an id map and parent/child id references rather than shared
//! ownership. See [`crate::namespace`] for the map that owns them.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// The root inode's fixed id. Never reallocated, never tombstoned.
pub const ROOT_ID: i32 = 1;

/// Parent id of the root inode.
pub const ROOT_PARENT_ID: i32 = -1;

/// A worker's network address, as seen from the namespace side.
pub type NetAddress = String;

/// Milliseconds since the Unix epoch, used for all timestamps in this crate.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as i64
}

/// Common header fields shared by every inode variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InodeHeader {
    /// Positive while live; negated as a tombstone marker.
    pub id: i32,
    pub name: String,
    pub parent_id: i32,
    pub creation_time_ms: i64,
}

impl InodeHeader {
    pub fn new(id: i32, name: impl Into<String>, parent_id: i32) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
            creation_time_ms: now_ms(),
        }
    }

    pub fn is_tombstoned(&self) -> bool {
        self.id < 0
    }
}

/// A plain directory: a name → child-id index.
///
/// Child name uniqueness within a folder is an invariant enforced by
/// [`crate::namespace::Namespace`], not by this type itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Folder {
    pub children: BTreeMap<String, i32>,
}

/// A raw table: a folder specialization with `columns` pre-created column
/// sub-folders and opaque metadata bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    pub folder: Folder,
    pub columns: u32,
    pub metadata: Vec<u8>,
}

/// A file's in-memory presence at a worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileLocation {
    pub worker_id: i64,
    pub address: NetAddress,
}

/// A regular file inode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    /// -1 until the first `cachedFile`/`addCheckpoint` call sets it.
    pub length: i64,
    pub ready: bool,
    pub checkpoint_path: String,
    /// -1 if this file is independent of any dependency.
    pub dependency_id: i32,
    pub pin: bool,
    pub cache: bool,
    pub locations: Vec<FileLocation>,
}

impl File {
    pub fn new(pin: bool, cache: bool) -> Self {
        Self {
            length: -1,
            ready: false,
            checkpoint_path: String::new(),
            dependency_id: -1,
            pin,
            cache,
            locations: Vec::new(),
        }
    }

    /// Derived: true iff any location exists.
    pub fn in_memory(&self) -> bool {
        !self.locations.is_empty()
    }

    pub fn has_checkpoint(&self) -> bool {
        !self.checkpoint_path.is_empty()
    }

    pub fn has_dependency(&self) -> bool {
        self.dependency_id >= 0
    }
}

/// One of the three inode kinds, tagged by variant rather than by any
/// dynamic-dispatch/inheritance mechanism (there is no vtable here: a
/// `RawTable` "is a" `Folder` only in the sense that it embeds one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InodeKind {
    File(File),
    Folder(Folder),
    RawTable(RawTable),
}

impl InodeKind {
    pub fn is_file(&self) -> bool {
        matches!(self, InodeKind::File(_))
    }

    pub fn is_folder_like(&self) -> bool {
        matches!(self, InodeKind::Folder(_) | InodeKind::RawTable(_))
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            InodeKind::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut File> {
        match self {
            InodeKind::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            InodeKind::Folder(f) => Some(f),
            InodeKind::RawTable(t) => Some(&t.folder),
            _ => None,
        }
    }

    pub fn as_folder_mut(&mut self) -> Option<&mut Folder> {
        match self {
            InodeKind::Folder(f) => Some(f),
            InodeKind::RawTable(t) => Some(&mut t.folder),
            _ => None,
        }
    }

    pub fn as_raw_table(&self) -> Option<&RawTable> {
        match self {
            InodeKind::RawTable(t) => Some(t),
            _ => None,
        }
    }
}

/// A complete inode: identity header plus its kind-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inode {
    pub header: InodeHeader,
    pub kind: InodeKind,
}

impl Inode {
    pub fn new_root() -> Self {
        Self {
            header: InodeHeader {
                id: ROOT_ID,
                name: String::new(),
                parent_id: ROOT_PARENT_ID,
                creation_time_ms: now_ms(),
            },
            kind: InodeKind::Folder(Folder::default()),
        }
    }

    pub fn id(&self) -> i32 {
        self.header.id
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn parent_id(&self) -> i32 {
        self.header.parent_id
    }

    /// Returns a tombstoned copy of this inode (id negated).
    pub fn tombstoned(mut self) -> Self {
        self.header.id = -self.header.id.abs();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_inode_is_a_folder_with_fixed_identity() {
        let root = Inode::new_root();
        assert_eq!(root.id(), ROOT_ID);
        assert_eq!(root.parent_id(), ROOT_PARENT_ID);
        assert_eq!(root.name(), "");
        assert!(root.kind.is_folder_like());
    }

    #[test]
    fn tombstoning_negates_the_id() {
        let mut inode = Inode::new_root();
        inode.header.id = 42;
        let tomb = inode.tombstoned();
        assert_eq!(tomb.header.id, -42);
    }

    #[test]
    fn file_in_memory_is_derived_from_locations() {
        let mut file = File::new(false, true);
        assert!(!file.in_memory());
        file.locations.push(FileLocation {
            worker_id: 1,
            address: "10.0.0.1:9000".into(),
        });
        assert!(file.in_memory());
    }

    #[test]
    fn raw_table_embeds_a_folder_without_inheritance() {
        let table = RawTable {
            folder: Folder::default(),
            columns: 3,
            metadata: b"m".to_vec(),
        };
        let kind = InodeKind::RawTable(table);
        assert!(kind.as_folder().is_some());
        assert!(kind.as_raw_table().is_some());
    }
}
