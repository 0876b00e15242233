//! The namespace: id → inode mapping, path resolution, and the coarse `ns`
//! lock that guards the inode map, the children indices embedded in it,
//! `id_pin_list`, and per-file worker locations.

pub mod error;
pub mod path;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;

pub use error::{NamespaceError, NamespaceResult, PathContext};

use crate::inode::{
    File, FileLocation, Folder, Inode, InodeHeader, InodeKind, RawTable, ROOT_ID,
};
use crate::journal::{Journal, JournalRecord};
use crate::prefix_list::PrefixList;

/// Read-only projection of a `File` inode for client consumption.
#[derive(Debug, Clone)]
pub struct ClientFileInfo {
    pub id: i32,
    pub name: String,
    pub path: String,
    pub folder: bool,
    pub length: i64,
    pub ready: bool,
    pub in_memory: bool,
    pub checkpoint_path: String,
    pub dependency_id: i32,
    pub pin: bool,
    pub cache: bool,
}

/// Read-only projection of a `RawTable` inode for client consumption.
#[derive(Debug, Clone)]
pub struct ClientRawTableInfo {
    pub id: i32,
    pub path: String,
    pub columns: u32,
    pub metadata: Vec<u8>,
}

struct NamespaceInner {
    inodes: HashMap<i32, Inode>,
    inode_counter: i32,
    id_pin_list: HashSet<i32>,
}

impl NamespaceInner {
    fn fresh() -> Self {
        let mut inodes = HashMap::new();
        inodes.insert(ROOT_ID, Inode::new_root());
        Self {
            inodes,
            inode_counter: ROOT_ID,
            id_pin_list: HashSet::new(),
        }
    }

    fn next_id(&mut self) -> i32 {
        self.inode_counter += 1;
        self.inode_counter
    }

    fn resolve(&self, components: &[&str]) -> Option<i32> {
        let mut current = ROOT_ID;
        for name in components {
            let inode = self.inodes.get(&current)?;
            let folder = inode.kind.as_folder()?;
            current = *folder.children.get(*name)?;
        }
        Some(current)
    }

    fn absolute_path(&self, id: i32) -> Option<String> {
        let mut names = Vec::new();
        let mut current = id;
        while current != ROOT_ID {
            let inode = self.inodes.get(&current)?;
            names.push(inode.name().to_string());
            current = inode.parent_id();
        }
        names.reverse();
        Some(path::join(names.iter().map(String::as_str)))
    }
}

/// The namespace component: owns the inode map and its coarse lock.
pub struct Namespace {
    inner: RwLock<NamespaceInner>,
    journal: Arc<Journal>,
    pin_list: PrefixList,
    whitelist: PrefixList,
    max_columns: u32,
}

impl Namespace {
    pub fn new(journal: Arc<Journal>, pin_list: PrefixList, whitelist: PrefixList, max_columns: u32) -> Self {
        Self {
            inner: RwLock::new(NamespaceInner::fresh()),
            journal,
            pin_list,
            whitelist,
            max_columns,
        }
    }

    /// Rebuilds the namespace purely from already-decoded journal records
    /// (checkpoint then log), used by `MasterState::recover`.
    pub fn install_recovered(&self, inodes: Vec<Inode>, inode_counter: i32) {
        let mut inner = self.inner.write();
        for inode in inodes {
            if inode.header.is_tombstoned() {
                inner.inodes.remove(&inode.header.id.abs());
            } else {
                if let Some(file) = inode.kind.as_file() {
                    if file.pin {
                        inner.id_pin_list.insert(inode.header.id);
                    }
                }
                inner.inodes.insert(inode.header.id, inode);
            }
        }
        inner.inode_counter = inner.inode_counter.max(inode_counter);
    }

    pub fn resolve(&self, path: &str) -> NamespaceResult<Option<i32>> {
        let components = path::split(path)?;
        Ok(self.inner.read().resolve(&components))
    }

    pub fn absolute_path(&self, id: i32) -> Option<String> {
        self.inner.read().absolute_path(id)
    }

    /// `createFile`/`createFolder`/generic `create`.
    ///
    /// If `columns >= 0`, a `RawTable` is created regardless of `directory`
    /// (matching the source contract's quirk that a raw table request is
    /// distinguished purely by a non-negative column count).
    pub fn create(
        &self,
        path: &str,
        directory: bool,
        recursive: bool,
        columns: Option<u32>,
    ) -> NamespaceResult<i32> {
        self.create_with_metadata(path, directory, recursive, columns, Vec::new())
    }

    pub fn create_with_metadata(
        &self,
        path: &str,
        directory: bool,
        recursive: bool,
        columns: Option<u32>,
        metadata: Vec<u8>,
    ) -> NamespaceResult<i32> {
        if let Some(cols) = columns {
            if cols == 0 || cols >= self.max_columns {
                return Err(NamespaceError::TableColumn(PathContext::new().with_path(path)));
            }
        }

        let (parent_components, leaf) = path::split_parent(path)?;
        let mut inner = self.inner.write();

        if inner.resolve(&path::split(path)?).is_some() {
            return Err(NamespaceError::FileAlreadyExists(
                PathContext::new().with_path(path),
            ));
        }

        let parent_id = resolve_or_create_parent(&mut inner, &parent_components, recursive, path)?;

        let id = inner.next_id();
        let mut journal_records = Vec::new();

        let kind = if let Some(cols) = columns {
            InodeKind::RawTable(RawTable {
                folder: Folder::default(),
                columns: cols,
                metadata,
            })
        } else if directory {
            InodeKind::Folder(Folder::default())
        } else {
            let absolute = inner
                .absolute_path(parent_id)
                .map(|p| join_leaf(&p, leaf))
                .unwrap_or_else(|| leaf.to_string());
            let pin = self.pin_list.matches(&absolute);
            let cache = self.whitelist.is_empty() || self.whitelist.matches(&absolute);
            if pin {
                inner.id_pin_list.insert(id);
            }
            InodeKind::File(File::new(pin, cache))
        };

        let inode = Inode {
            header: InodeHeader::new(id, leaf, parent_id),
            kind,
        };
        journal_records.push(record_for(&inode));

        attach_child(&mut inner, parent_id, leaf, id)?;
        let parent_inode = inner.inodes.get(&parent_id).expect("parent just resolved");
        journal_records.push(record_for(parent_inode));
        inner.inodes.insert(id, inode);

        drop(inner);
        self.journal
            .append_txn(&journal_records)
            .map_err(|e| NamespaceError::InvalidPath(PathContext::new().with_path(format!("journal error: {e}"))))?;

        tracing::debug!(path, id, "created inode");
        Ok(id)
    }

    /// `createRawTable`: a raw table folder plus `columns` pre-created
    /// `COL_0..COL_{columns-1}` child folders.
    pub fn create_raw_table(&self, path: &str, columns: u32, metadata: Vec<u8>) -> NamespaceResult<i32> {
        if columns == 0 || columns >= self.max_columns {
            return Err(NamespaceError::TableColumn(PathContext::new().with_path(path)));
        }
        let table_id = self.create_with_metadata(path, true, true, Some(columns), metadata)?;
        for col in 0..columns {
            let col_path = format!("{}/COL_{}", path.trim_end_matches('/'), col);
            self.create(&col_path, true, false, None)?;
        }
        Ok(table_id)
    }

    pub fn delete_by_path(&self, path: &str) -> NamespaceResult<()> {
        let id = self
            .resolve(path)?
            .ok_or_else(|| NamespaceError::FileDoesNotExist(PathContext::new().with_path(path)))?;
        self.delete_by_id(id)
    }

    /// Deletes recursively. A missing id is a no-op (idempotent). Note:
    /// this intentionally does not tear down any `Dependency` that
    /// references a deleted child file — dependencies survive so that
    /// ancestor recomputation remains possible (see `SPEC_FULL.md` §9).
    pub fn delete_by_id(&self, id: i32) -> NamespaceResult<()> {
        let mut inner = self.inner.write();
        if !inner.inodes.contains_key(&id) {
            return Ok(());
        }

        let mut journal_records = Vec::new();
        delete_recursive(&mut inner, id, &mut journal_records);

        if let Some(inode) = inner.inodes.get(&id) {
            let parent_id = inode.parent_id();
            let name = inode.name().to_string();
            if let Some(folder) = inner
                .inodes
                .get_mut(&parent_id)
                .and_then(|p| p.kind.as_folder_mut())
            {
                folder.children.remove(&name);
            }
            if let Some(parent_inode) = inner.inodes.get(&parent_id) {
                journal_records.push(record_for(parent_inode));
            }
        }

        inner.id_pin_list.remove(&id);
        if let Some(inode) = inner.inodes.remove(&id) {
            journal_records.push(record_for(&inode.tombstoned()));
        }

        drop(inner);
        self.journal
            .append_txn(&journal_records)
            .map_err(|e| NamespaceError::InvalidPath(PathContext::new().with_path(format!("journal error: {e}"))))?;
        Ok(())
    }

    pub fn rename(&self, src: &str, dst: &str) -> NamespaceResult<()> {
        let src_id = self
            .resolve(src)?
            .ok_or_else(|| NamespaceError::FileDoesNotExist(PathContext::new().with_path(src)))?;
        if self.resolve(dst)?.is_some() {
            return Err(NamespaceError::FileAlreadyExists(
                PathContext::new().with_path(dst),
            ));
        }
        let (dst_parent_components, dst_leaf) = path::split_parent(dst)?;

        let mut inner = self.inner.write();
        let dst_parent_id = inner
            .resolve(&dst_parent_components)
            .ok_or_else(|| NamespaceError::FileDoesNotExist(PathContext::new().with_path(dst)))?;
        if !inner.inodes[&dst_parent_id].kind.is_folder_like() {
            return Err(NamespaceError::FileDoesNotExist(PathContext::new().with_path(dst)));
        }

        let old_parent_id = inner.inodes[&src_id].parent_id();
        let old_name = inner.inodes[&src_id].name().to_string();

        if let Some(folder) = inner
            .inodes
            .get_mut(&old_parent_id)
            .and_then(|p| p.kind.as_folder_mut())
        {
            folder.children.remove(&old_name);
        }
        if let Some(folder) = inner
            .inodes
            .get_mut(&dst_parent_id)
            .and_then(|p| p.kind.as_folder_mut())
        {
            folder.children.insert(dst_leaf.to_string(), src_id);
        }
        if let Some(inode) = inner.inodes.get_mut(&src_id) {
            inode.header.name = dst_leaf.to_string();
            inode.header.parent_id = dst_parent_id;
        }

        let mut journal_records = Vec::new();
        journal_records.push(record_for(&inner.inodes[&old_parent_id]));
        journal_records.push(record_for(&inner.inodes[&dst_parent_id]));
        journal_records.push(record_for(&inner.inodes[&src_id]));

        drop(inner);
        self.journal
            .append_txn(&journal_records)
            .map_err(|e| NamespaceError::InvalidPath(PathContext::new().with_path(format!("journal error: {e}"))))?;
        Ok(())
    }

    /// Breadth-first listing of entry ids under `path` (or `path` itself if
    /// it is a file). Order within a folder is unspecified by contract.
    pub fn list_files(&self, path: &str, recursive: bool) -> NamespaceResult<Vec<i32>> {
        let id = self
            .resolve(path)?
            .ok_or_else(|| NamespaceError::FileDoesNotExist(PathContext::new().with_path(path)))?;
        let inner = self.inner.read();
        Ok(collect_files(&inner, id, recursive))
    }

    pub fn ls(&self, path: &str, recursive: bool) -> NamespaceResult<Vec<String>> {
        let ids = self.list_files(path, recursive)?;
        let inner = self.inner.read();
        Ok(ids
            .into_iter()
            .filter_map(|id| inner.absolute_path(id))
            .collect())
    }

    pub fn get_file_info(&self, path_or_id: PathOrId<'_>) -> NamespaceResult<ClientFileInfo> {
        let inner = self.inner.read();
        let id = resolve_path_or_id(&inner, path_or_id)?;
        let inode = inner
            .inodes
            .get(&id)
            .ok_or_else(|| not_found(path_or_id))?;
        let file = inode
            .kind
            .as_file()
            .ok_or_else(|| NamespaceError::FileDoesNotExist(PathContext::new().with_id(id)))?;
        Ok(ClientFileInfo {
            id,
            name: inode.name().to_string(),
            path: inner.absolute_path(id).unwrap_or_default(),
            folder: false,
            length: file.length,
            ready: file.ready,
            in_memory: file.in_memory(),
            checkpoint_path: file.checkpoint_path.clone(),
            dependency_id: file.dependency_id,
            pin: file.pin,
            cache: file.cache,
        })
    }

    pub fn get_raw_table_info(&self, path_or_id: PathOrId<'_>) -> NamespaceResult<ClientRawTableInfo> {
        let inner = self.inner.read();
        let id = resolve_path_or_id(&inner, path_or_id)?;
        let inode = inner
            .inodes
            .get(&id)
            .ok_or_else(|| not_found(path_or_id))?;
        let table = inode
            .kind
            .as_raw_table()
            .ok_or_else(|| NamespaceError::TableDoesNotExist(PathContext::new().with_id(id)))?;
        Ok(ClientRawTableInfo {
            id,
            path: inner.absolute_path(id).unwrap_or_default(),
            columns: table.columns,
            metadata: table.metadata.clone(),
        })
    }

    pub fn get_file_locations(&self, path_or_id: PathOrId<'_>) -> NamespaceResult<Vec<FileLocation>> {
        let inner = self.inner.read();
        let id = resolve_path_or_id(&inner, path_or_id)?;
        let inode = inner
            .inodes
            .get(&id)
            .ok_or_else(|| not_found(path_or_id))?;
        let file = inode
            .kind
            .as_file()
            .ok_or_else(|| NamespaceError::FileDoesNotExist(PathContext::new().with_id(id)))?;
        Ok(file.locations.clone())
    }

    /// Breadth-first traversal collecting absolute paths of File inodes
    /// whose `in_memory` is true.
    pub fn get_in_memory_files(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        let mut queue = VecDeque::from([ROOT_ID]);
        while let Some(id) = queue.pop_front() {
            let Some(inode) = inner.inodes.get(&id) else { continue };
            match &inode.kind {
                InodeKind::File(file) if file.in_memory() => {
                    if let Some(path) = inner.absolute_path(id) {
                        out.push(path);
                    }
                }
                InodeKind::File(_) => {}
                InodeKind::Folder(folder) => queue.extend(folder.children.values().copied()),
                InodeKind::RawTable(table) => queue.extend(table.folder.children.values().copied()),
            }
        }
        out
    }

    pub fn pin_list(&self) -> &PrefixList {
        &self.pin_list
    }

    pub fn whitelist(&self) -> &PrefixList {
        &self.whitelist
    }

    pub fn pin_id_list(&self) -> Vec<i32> {
        self.inner.read().id_pin_list.iter().copied().collect()
    }

    pub fn unpin_file(&self, file_id: i32) -> NamespaceResult<()> {
        let mut inner = self.inner.write();
        let inode = inner
            .inodes
            .get_mut(&file_id)
            .ok_or_else(|| NamespaceError::FileDoesNotExist(PathContext::new().with_id(file_id)))?;
        let file = inode
            .kind
            .as_file_mut()
            .ok_or_else(|| NamespaceError::FileDoesNotExist(PathContext::new().with_id(file_id)))?;
        file.pin = false;
        inner.id_pin_list.remove(&file_id);
        Ok(())
    }

    /// Checks whether `id` names a live File inode.
    pub fn is_file(&self, id: i32) -> bool {
        self.inner
            .read()
            .inodes
            .get(&id)
            .is_some_and(|inode| inode.kind.is_file())
    }

    /// Applies `f` to the file at `id` under the write lock, used by the
    /// worker-registry and dependency components that need to mutate a
    /// file's locations/dependency fields while holding `ns`.
    pub fn with_file_mut<R>(&self, id: i32, f: impl FnOnce(&mut File) -> R) -> Option<R> {
        let mut inner = self.inner.write();
        let file = inner.inodes.get_mut(&id)?.kind.as_file_mut()?;
        Some(f(file))
    }

    pub fn with_file<R>(&self, id: i32, f: impl FnOnce(&File) -> R) -> Option<R> {
        let inner = self.inner.read();
        let file = inner.inodes.get(&id)?.kind.as_file()?;
        Some(f(file))
    }

    /// Builds the current journal record for inode `id`, for callers (the
    /// dependency graph's `createDependency`) that need to journal a batch
    /// of child inodes they just mutated through [`Namespace::with_file_mut`].
    pub fn journal_record_for(&self, id: i32) -> Option<JournalRecord> {
        let inner = self.inner.read();
        inner.inodes.get(&id).map(record_for)
    }

    /// Snapshot of every live inode, in BFS order from the root, for
    /// checkpoint writing.
    pub fn snapshot_bfs(&self) -> Vec<Inode> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        let mut queue = VecDeque::from([ROOT_ID]);
        while let Some(id) = queue.pop_front() {
            let Some(inode) = inner.inodes.get(&id) else { continue };
            match &inode.kind {
                InodeKind::Folder(folder) => queue.extend(folder.children.values().copied()),
                InodeKind::RawTable(table) => queue.extend(table.folder.children.values().copied()),
                InodeKind::File(_) => {}
            }
            out.push(inode.clone());
        }
        out
    }

    pub fn inode_counter(&self) -> i32 {
        self.inner.read().inode_counter
    }

    pub fn bump_inode_counter(&self, at_least: i32) {
        let mut inner = self.inner.write();
        inner.inode_counter = inner.inode_counter.max(at_least);
    }
}

/// Either a numeric id or a path, as accepted by several client calls per
/// `SPEC_FULL.md` §6 ("id OR path").
#[derive(Debug, Clone, Copy)]
pub enum PathOrId<'a> {
    Id(i32),
    Path(&'a str),
}

fn resolve_path_or_id(inner: &NamespaceInner, target: PathOrId<'_>) -> NamespaceResult<i32> {
    match target {
        PathOrId::Id(id) => Ok(id),
        PathOrId::Path(path) => {
            let components = path::split(path)?;
            inner
                .resolve(&components)
                .ok_or_else(|| NamespaceError::FileDoesNotExist(PathContext::new().with_path(path)))
        }
    }
}

fn not_found(target: PathOrId<'_>) -> NamespaceError {
    match target {
        PathOrId::Id(id) => NamespaceError::FileDoesNotExist(PathContext::new().with_id(id)),
        PathOrId::Path(path) => NamespaceError::FileDoesNotExist(PathContext::new().with_path(path)),
    }
}

fn join_leaf(parent: &str, leaf: &str) -> String {
    if parent == "/" {
        format!("/{leaf}")
    } else {
        format!("{parent}/{leaf}")
    }
}

fn record_for(inode: &Inode) -> JournalRecord {
    JournalRecord::from(inode)
}

fn resolve_or_create_parent(
    inner: &mut NamespaceInner,
    parent_components: &[&str],
    recursive: bool,
    original_path: &str,
) -> NamespaceResult<i32> {
    if let Some(id) = inner.resolve(parent_components) {
        if !inner.inodes[&id].kind.is_folder_like() {
            return Err(NamespaceError::InvalidPath(
                PathContext::new().with_path(original_path),
            ));
        }
        return Ok(id);
    }
    if !recursive {
        return Err(NamespaceError::InvalidPath(
            PathContext::new().with_path(original_path),
        ));
    }

    let mut current = ROOT_ID;
    let mut built = Vec::new();
    for name in parent_components {
        built.push(*name);
        if let Some(next) = inner.resolve(&built) {
            if !inner.inodes[&next].kind.is_folder_like() {
                return Err(NamespaceError::InvalidPath(
                    PathContext::new().with_path(original_path),
                ));
            }
            current = next;
            continue;
        }
        let id = inner.next_id();
        let inode = Inode {
            header: InodeHeader::new(id, *name, current),
            kind: InodeKind::Folder(Folder::default()),
        };
        attach_child(inner, current, name, id)?;
        inner.inodes.insert(id, inode);
        current = id;
    }
    Ok(current)
}

fn attach_child(inner: &mut NamespaceInner, parent_id: i32, name: &str, child_id: i32) -> NamespaceResult<()> {
    let parent = inner
        .inodes
        .get_mut(&parent_id)
        .ok_or_else(|| NamespaceError::InvalidPath(PathContext::new().with_id(parent_id)))?;
    let folder = parent
        .kind
        .as_folder_mut()
        .ok_or_else(|| NamespaceError::InvalidPath(PathContext::new().with_id(parent_id)))?;
    folder.children.insert(name.to_string(), child_id);
    Ok(())
}

fn delete_recursive(inner: &mut NamespaceInner, id: i32, journal_records: &mut Vec<JournalRecord>) {
    let child_ids: Vec<i32> = inner
        .inodes
        .get(&id)
        .and_then(|inode| inode.kind.as_folder())
        .map(|folder| folder.children.values().copied().collect())
        .unwrap_or_default();
    for child_id in child_ids {
        delete_recursive(inner, child_id, journal_records);
        inner.id_pin_list.remove(&child_id);
        if let Some(child) = inner.inodes.remove(&child_id) {
            journal_records.push(record_for(&child.tombstoned()));
        }
    }
}

/// Returns `[id]` if `id` is a File; otherwise lists its directory entries
/// (files and folders alike — e.g. a raw table's `COL_*` sub-folders are
/// listed entries, not expanded into their own contents unless
/// `recursive`).
fn collect_files(inner: &NamespaceInner, id: i32, recursive: bool) -> Vec<i32> {
    let Some(inode) = inner.inodes.get(&id) else { return Vec::new() };
    match &inode.kind {
        InodeKind::File(_) => vec![id],
        InodeKind::Folder(folder) => collect_from_folder(inner, folder.children.values().copied(), recursive),
        InodeKind::RawTable(table) => {
            collect_from_folder(inner, table.folder.children.values().copied(), recursive)
        }
    }
}

fn collect_from_folder(
    inner: &NamespaceInner,
    children: impl Iterator<Item = i32>,
    recursive: bool,
) -> Vec<i32> {
    let mut out = Vec::new();
    let mut queue: VecDeque<i32> = children.collect();
    while let Some(id) = queue.pop_front() {
        let Some(inode) = inner.inodes.get(&id) else { continue };
        out.push(id);
        if !recursive {
            continue;
        }
        match &inode.kind {
            InodeKind::Folder(folder) => queue.extend(folder.children.values().copied()),
            InodeKind::RawTable(table) => queue.extend(table.folder.children.values().copied()),
            InodeKind::File(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_namespace() -> (tempfile::TempDir, Namespace) {
        let dir = tempdir().unwrap();
        let journal = Arc::new(Journal::open(dir.path().join("log"), dir.path().join("checkpoint")).unwrap());
        let ns = Namespace::new(journal, PrefixList::default(), PrefixList::default(), 1000);
        (dir, ns)
    }

    #[test]
    fn simple_create_and_list_scenario() {
        let (_dir, ns) = test_namespace();
        let id = ns.create("/a/b", false, true, None).unwrap();
        assert_eq!(id, 3); // root=1, /a=2, /a/b=3
        assert_eq!(ns.ls("/a", false).unwrap(), vec!["/a/b".to_string()]);
        let info = ns.get_file_info(PathOrId::Path("/a/b")).unwrap();
        assert!(!info.folder);
    }

    #[test]
    fn raw_table_scenario() {
        let (_dir, ns) = test_namespace();
        ns.create_raw_table("/t", 3, b"m".to_vec()).unwrap();
        let mut listing = ns.ls("/t", false).unwrap();
        listing.sort();
        assert_eq!(listing, vec!["/t/COL_0", "/t/COL_1", "/t/COL_2"]);
        let info = ns.get_raw_table_info(PathOrId::Path("/t")).unwrap();
        assert_eq!(info.columns, 3);
        assert_eq!(info.metadata, b"m");
    }

    #[test]
    fn create_fails_without_recursive_when_parent_missing() {
        let (_dir, ns) = test_namespace();
        assert!(matches!(
            ns.create("/a/b", false, false, None),
            Err(NamespaceError::InvalidPath(_))
        ));
    }

    #[test]
    fn create_raw_table_rejects_zero_or_overflow_columns() {
        let (_dir, ns) = test_namespace();
        assert!(matches!(
            ns.create_raw_table("/t", 0, vec![]),
            Err(NamespaceError::TableColumn(_))
        ));
        assert!(matches!(
            ns.create_raw_table("/t2", 1000, vec![]),
            Err(NamespaceError::TableColumn(_))
        ));
    }

    #[test]
    fn delete_is_idempotent_on_missing_id() {
        let (_dir, ns) = test_namespace();
        assert!(ns.delete_by_id(999).is_ok());
    }

    #[test]
    fn rename_scenario_updates_resolution() {
        let (_dir, ns) = test_namespace();
        let id = ns.create("/x/y", false, true, None).unwrap();
        ns.rename("/x/y", "/x/z").unwrap();
        assert_eq!(ns.resolve("/x/y").unwrap(), None);
        assert_eq!(ns.resolve("/x/z").unwrap(), Some(id));
    }

    #[test]
    fn rename_fails_if_destination_exists() {
        let (_dir, ns) = test_namespace();
        ns.create("/a", false, true, None).unwrap();
        ns.create("/b", false, true, None).unwrap();
        assert!(matches!(
            ns.rename("/a", "/b"),
            Err(NamespaceError::FileAlreadyExists(_))
        ));
    }

    #[test]
    fn pin_list_drives_pin_flag() {
        let dir = tempdir().unwrap();
        let journal = Arc::new(Journal::open(dir.path().join("log"), dir.path().join("checkpoint")).unwrap());
        let ns = Namespace::new(
            journal,
            PrefixList::new(vec!["/pinned".into()]),
            PrefixList::default(),
            1000,
        );
        let id = ns.create("/pinned/f", false, true, None).unwrap();
        assert!(ns.pin_id_list().contains(&id));
        let info = ns.get_file_info(PathOrId::Id(id)).unwrap();
        assert!(info.pin);
    }

    #[test]
    fn unpin_removes_from_pin_id_list() {
        let dir = tempdir().unwrap();
        let journal = Arc::new(Journal::open(dir.path().join("log"), dir.path().join("checkpoint")).unwrap());
        let ns = Namespace::new(
            journal,
            PrefixList::new(vec!["/pinned".into()]),
            PrefixList::default(),
            1000,
        );
        let id = ns.create("/pinned/f", false, true, None).unwrap();
        ns.unpin_file(id).unwrap();
        assert!(!ns.pin_id_list().contains(&id));
    }

    #[test]
    fn delete_removes_subtree_recursively() {
        let (_dir, ns) = test_namespace();
        ns.create("/a/b", false, true, None).unwrap();
        let a_id = ns.resolve("/a").unwrap().unwrap();
        ns.delete_by_id(a_id).unwrap();
        assert_eq!(ns.resolve("/a").unwrap(), None);
        assert_eq!(ns.resolve("/a/b").unwrap(), None);
    }
}
