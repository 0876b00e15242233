//! The dependency graph: lineage records plus the bookkeeping sets that
//! drive proactive checkpointing and lost-file recomputation.

pub mod error;
pub mod model;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use parking_lot::RwLock;

pub use error::{DependencyError, DependencyResult};
pub use model::{Dependency, DependencyType};

use crate::inode::now_ms;
use crate::journal::Journal;
use crate::namespace::{Namespace, NamespaceError, PathContext};

/// Read-only projection of a `Dependency` for client consumption.
#[derive(Debug, Clone)]
pub struct ClientDependencyInfo {
    pub id: i32,
    pub parent_files: Vec<i32>,
    pub child_files: Vec<i32>,
    pub command: String,
    pub comment: String,
    pub framework: String,
    pub framework_version: String,
    pub dependency_type: DependencyType,
    pub creation_time_ms: i64,
}

impl From<&Dependency> for ClientDependencyInfo {
    fn from(dep: &Dependency) -> Self {
        Self {
            id: dep.id,
            parent_files: dep.parent_files.clone(),
            child_files: dep.child_files.clone(),
            command: dep.command.clone(),
            comment: dep.comment.clone(),
            framework: dep.framework.clone(),
            framework_version: dep.framework_version.clone(),
            dependency_type: dep.dependency_type,
            creation_time_ms: dep.creation_time_ms,
        }
    }
}

struct Bookkeeping {
    dependencies: HashMap<i32, Dependency>,
    uncheckpointed_deps: HashSet<i32>,
    priority_deps: Vec<i32>,
    lost_files: HashSet<i32>,
    being_recomputed_files: HashSet<i32>,
    must_recompute_deps: HashSet<i32>,
}

impl Bookkeeping {
    fn fresh() -> Self {
        Self {
            dependencies: HashMap::new(),
            uncheckpointed_deps: HashSet::new(),
            priority_deps: Vec::new(),
            lost_files: HashSet::new(),
            being_recomputed_files: HashSet::new(),
            must_recompute_deps: HashSet::new(),
        }
    }
}

/// The dependency component: owns the dependency map and every bookkeeping
/// set guarded by the `deps` lock (see `SPEC_FULL.md` §5). Never co-held
/// with `workers`; may be acquired while `ns` is held, in that order.
pub struct DependencyGraph {
    inner: RwLock<Bookkeeping>,
    dependency_counter: AtomicI32,
    rerun_counter: AtomicI64,
    proactive_recovery: bool,
}

impl DependencyGraph {
    pub fn new(proactive_recovery: bool) -> Self {
        Self {
            inner: RwLock::new(Bookkeeping::fresh()),
            dependency_counter: AtomicI32::new(0),
            rerun_counter: AtomicI64::new(0),
            proactive_recovery,
        }
    }

    pub fn install_recovered(&self, dependencies: Vec<Dependency>, dependency_counter: i32) {
        let mut inner = self.inner.write();
        for dep in dependencies {
            if !dep.is_checkpointed() {
                inner.uncheckpointed_deps.insert(dep.id);
            }
            inner.dependencies.insert(dep.id, dep);
        }
        drop(inner);
        self.bump_dependency_counter(dependency_counter);
    }

    pub fn snapshot_all(&self) -> Vec<Dependency> {
        self.inner.read().dependencies.values().cloned().collect()
    }

    pub fn dependency_counter(&self) -> i32 {
        self.dependency_counter.load(Ordering::Relaxed)
    }

    pub fn bump_dependency_counter(&self, at_least: i32) {
        self.dependency_counter.fetch_max(at_least, Ordering::Relaxed);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_dependency(
        &self,
        namespace: &Namespace,
        journal: &Journal,
        parent_files: Vec<i32>,
        child_files: Vec<i32>,
        command_prefix: String,
        data: Vec<Vec<u8>>,
        comment: String,
        framework: String,
        framework_version: String,
        dependency_type: DependencyType,
    ) -> DependencyResult<i32> {
        for &id in &parent_files {
            if !namespace.is_file(id) {
                return Err(NamespaceError::InvalidPath(PathContext::new().with_id(id)).into());
            }
        }
        for &id in &child_files {
            if !namespace.is_file(id) {
                return Err(NamespaceError::FileDoesNotExist(PathContext::new().with_id(id)).into());
            }
        }

        let parent_dependencies: BTreeSet<i32> = parent_files
            .iter()
            .map(|&id| namespace.with_file(id, |f| f.dependency_id).unwrap_or(-1))
            .collect();

        let dep_id = self.dependency_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut dep = Dependency::new(
            dep_id,
            parent_files,
            child_files.clone(),
            command_prefix,
            data,
            comment,
            framework,
            framework_version,
            dependency_type,
            parent_dependencies.clone(),
        );

        for &child_id in &child_files {
            let already_checkpointed = namespace
                .with_file_mut(child_id, |file| {
                    file.dependency_id = dep_id;
                    file.has_checkpoint()
                })
                .unwrap_or(false);
            if already_checkpointed {
                dep.mark_child_checkpointed(child_id);
            }
        }

        let mut inner = self.inner.write();
        for &parent_dep_id in &parent_dependencies {
            if parent_dep_id >= 0 {
                if let Some(parent_dep) = inner.dependencies.get_mut(&parent_dep_id) {
                    parent_dep.children_dependencies.insert(dep_id);
                }
            }
        }
        if !dep.is_checkpointed() {
            inner.uncheckpointed_deps.insert(dep_id);
        }
        inner.dependencies.insert(dep_id, dep);
        drop(inner);

        let mut records: Vec<_> = child_files
            .iter()
            .filter_map(|&id| namespace.journal_record_for(id))
            .collect();
        records.push(crate::journal::JournalRecord::Dependency(
            self.inner.read().dependencies[&dep_id].clone(),
        ));
        journal.append_txn(&records)?;

        tracing::info!(dep_id, "created dependency");
        Ok(dep_id)
    }

    pub fn get_client_dependency_info(&self, dep_id: i32) -> DependencyResult<ClientDependencyInfo> {
        self.inner
            .read()
            .dependencies
            .get(&dep_id)
            .map(ClientDependencyInfo::from)
            .ok_or(DependencyError::DependencyDoesNotExist { id: dep_id })
    }

    /// Marks `file_id` as checkpointed in its owning dependency, dropping
    /// the dependency from `uncheckpointed_deps`/`priority_deps` once every
    /// child is checkpointed. No-op if the file has no dependency.
    pub fn mark_file_checkpointed(&self, dependency_id: i32, file_id: i32) {
        if dependency_id < 0 {
            return;
        }
        let mut inner = self.inner.write();
        if let Some(dep) = inner.dependencies.get_mut(&dependency_id) {
            dep.mark_child_checkpointed(file_id);
            if dep.is_checkpointed() {
                inner.uncheckpointed_deps.remove(&dependency_id);
                inner.priority_deps.retain(|id| *id != dependency_id);
            }
        }
    }

    /// The shared "file is back" cleanup: clears `lost_files` and
    /// `being_recomputed_files` membership for `file_id`. Takes only a
    /// file id (see `SPEC_FULL.md` §9 on the source's unused parameter).
    pub fn clear_lost_and_recomputed(&self, file_id: i32) {
        let mut inner = self.inner.write();
        inner.lost_files.remove(&file_id);
        inner.being_recomputed_files.remove(&file_id);
    }

    /// Returns the file's `dependency_id`, or `None` if it is already
    /// fully checkpointed or has no dependency — the `cachedFile` return
    /// value semantics from `SPEC_FULL.md` §4.1.
    pub fn dependency_of_file_if_pending(&self, dependency_id: i32) -> Option<i32> {
        if dependency_id < 0 {
            return None;
        }
        let inner = self.inner.read();
        let dep = inner.dependencies.get(&dependency_id)?;
        if dep.is_checkpointed() {
            None
        } else {
            Some(dependency_id)
        }
    }

    /// Adds `file_id` to `lost_files`; if it has a dependency, adds it to
    /// that dependency's `lost_files` and queues the dependency for
    /// recomputation. Logs (but does not propagate) permanent data loss
    /// when the file has no dependency.
    ///
    /// The client-facing `reportLostFile` RPC always enqueues; the
    /// liveness sweep instead routes through [`Self::report_lost_file_from_liveness`],
    /// which skips enqueuing when `MASTER_PROACTIVE_RECOVERY` is set.
    pub fn report_lost_file(&self, file_id: i32, dependency_id: i32) {
        self.report_lost_file_inner(file_id, dependency_id, true);
    }

    /// Same bookkeeping as [`Self::report_lost_file`], but only enqueues the
    /// dependency for recomputation when proactive recovery is disabled —
    /// `SPEC_FULL.md` §4.3 step 2 leaves recomputation to the lazy,
    /// `cachedFile`-driven path when proactive recovery is on.
    pub fn report_lost_file_from_liveness(&self, file_id: i32, dependency_id: i32) {
        self.report_lost_file_inner(file_id, dependency_id, !self.proactive_recovery);
    }

    fn report_lost_file_inner(&self, file_id: i32, dependency_id: i32, enqueue: bool) {
        let mut inner = self.inner.write();
        inner.lost_files.insert(file_id);
        if dependency_id < 0 {
            tracing::error!(file_id, "permanent data loss: no checkpoint, no dependency");
            return;
        }
        if let Some(dep) = inner.dependencies.get_mut(&dependency_id) {
            dep.lost_files.insert(file_id);
        }
        if enqueue {
            inner.must_recompute_deps.insert(dependency_id);
        }
    }

    pub fn proactive_recovery(&self) -> bool {
        self.proactive_recovery
    }

    pub fn is_lost(&self, file_id: i32) -> bool {
        self.inner.read().lost_files.contains(&file_id)
    }

    pub fn is_being_recomputed(&self, file_id: i32) -> bool {
        self.inner.read().being_recomputed_files.contains(&file_id)
    }

    /// Rebuilds `priority_deps` (if currently empty) from
    /// `uncheckpointed_deps`: leaf dependencies (`is_leaf`) first, falling
    /// back to the single oldest uncheckpointed dependency if no leaf
    /// exists. Returns a snapshot.
    pub fn get_priority_dependency_list(&self) -> Vec<i32> {
        let mut inner = self.inner.write();
        if inner.priority_deps.is_empty() {
            let leaves: Vec<i32> = inner
                .uncheckpointed_deps
                .iter()
                .copied()
                .filter(|id| inner.dependencies.get(id).is_some_and(Dependency::is_leaf))
                .collect();
            inner.priority_deps = if !leaves.is_empty() {
                leaves
            } else {
                inner
                    .uncheckpointed_deps
                    .iter()
                    .copied()
                    .min_by_key(|id| inner.dependencies.get(id).map_or(i64::MAX, |d| d.creation_time_ms))
                    .into_iter()
                    .collect()
            };
        }
        inner.priority_deps.clone()
    }

    /// Snapshot of ids currently queued for recomputation.
    pub fn must_recompute_snapshot(&self) -> Vec<i32> {
        self.inner.read().must_recompute_deps.iter().copied().collect()
    }

    pub fn add_must_recompute(&self, dep_id: i32) {
        self.inner.write().must_recompute_deps.insert(dep_id);
    }

    pub fn remove_must_recompute(&self, dep_id: i32) {
        self.inner.write().must_recompute_deps.remove(&dep_id);
    }

    pub fn mark_being_recomputed(&self, file_ids: impl IntoIterator<Item = i32>) {
        let mut inner = self.inner.write();
        for id in file_ids {
            inner.being_recomputed_files.insert(id);
        }
    }

    pub fn get(&self, dep_id: i32) -> Option<Dependency> {
        self.inner.read().dependencies.get(&dep_id).cloned()
    }

    pub fn set_command(&self, dep_id: i32, command: String) {
        if let Some(dep) = self.inner.write().dependencies.get_mut(&dep_id) {
            dep.command = command;
        }
    }

    pub fn next_rerun_id(&self) -> i64 {
        self.rerun_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn creation_time_ms_now(&self) -> i64 {
        now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefix_list::PrefixList;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Namespace, Journal, DependencyGraph) {
        let dir = tempdir().unwrap();
        let journal = Journal::open(dir.path().join("log"), dir.path().join("checkpoint")).unwrap();
        let ns = Namespace::new(
            Arc::new(Journal::open(dir.path().join("log2"), dir.path().join("checkpoint2")).unwrap()),
            PrefixList::default(),
            PrefixList::default(),
            1000,
        );
        (dir, ns, journal, DependencyGraph::new(false))
    }

    #[test]
    fn create_dependency_links_children_and_parents() {
        let (_dir, ns, journal, deps) = setup();
        let parent = ns.create("/p", false, true, None).unwrap();
        let child = ns.create("/c", false, true, None).unwrap();

        let dep_id = deps
            .create_dependency(
                &ns,
                &journal,
                vec![parent],
                vec![child],
                "prog --out /c".into(),
                vec![],
                String::new(),
                "fw".into(),
                "1".into(),
                DependencyType::Narrow,
            )
            .unwrap();

        assert_eq!(ns.with_file(child, |f| f.dependency_id).unwrap(), dep_id);
        assert!(!deps.get(dep_id).unwrap().is_checkpointed());
    }

    #[test]
    fn create_dependency_rejects_missing_parent() {
        let (_dir, ns, journal, deps) = setup();
        let child = ns.create("/c", false, true, None).unwrap();
        let result = deps.create_dependency(
            &ns,
            &journal,
            vec![999],
            vec![child],
            "cmd".into(),
            vec![],
            String::new(),
            "fw".into(),
            "1".into(),
            DependencyType::Narrow,
        );
        assert!(matches!(
            result,
            Err(DependencyError::Namespace(NamespaceError::InvalidPath(_)))
        ));
    }

    #[test]
    fn lineage_recovery_scenario() {
        let (_dir, ns, journal, deps) = setup();
        let p = ns.create("/p", false, true, None).unwrap();
        let c = ns.create("/c", false, true, None).unwrap();
        let dep_id = deps
            .create_dependency(
                &ns,
                &journal,
                vec![p],
                vec![c],
                "prog --out /c".into(),
                vec![],
                String::new(),
                "fw".into(),
                "1".into(),
                DependencyType::Narrow,
            )
            .unwrap();

        // /c is reported lost (its dependency id is `dep_id`).
        deps.report_lost_file(c, dep_id);
        assert!(deps.must_recompute_snapshot().contains(&dep_id));
        assert!(deps.is_lost(c));

        // /p is also lost, but has no dependency (-1): permanent loss, logged only.
        deps.report_lost_file(p, -1);
        assert!(deps.is_lost(p));
    }

    #[test]
    fn priority_list_prefers_leaves_then_oldest() {
        let (_dir, ns, journal, deps) = setup();
        let p = ns.create("/p", false, true, None).unwrap();
        let c1 = ns.create("/c1", false, true, None).unwrap();
        let dep1 = deps
            .create_dependency(
                &ns,
                &journal,
                vec![p],
                vec![c1],
                "cmd1".into(),
                vec![],
                String::new(),
                "fw".into(),
                "1".into(),
                DependencyType::Narrow,
            )
            .unwrap();

        let priority = deps.get_priority_dependency_list();
        assert_eq!(priority, vec![dep1]);
    }

    #[test]
    fn mark_file_checkpointed_clears_uncheckpointed_once_complete() {
        let (_dir, ns, journal, deps) = setup();
        let p = ns.create("/p", false, true, None).unwrap();
        let c = ns.create("/c", false, true, None).unwrap();
        let dep_id = deps
            .create_dependency(
                &ns,
                &journal,
                vec![p],
                vec![c],
                "cmd".into(),
                vec![],
                String::new(),
                "fw".into(),
                "1".into(),
                DependencyType::Narrow,
            )
            .unwrap();

        deps.mark_file_checkpointed(dep_id, c);
        assert!(deps.get(dep_id).unwrap().is_checkpointed());
        assert!(deps.get_priority_dependency_list().is_empty());
    }
}
