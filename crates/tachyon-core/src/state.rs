//! `MasterState`/`MasterHandle`: the composed global state and the
//! cheap-`Clone` facade every call in `SPEC_FULL.md` §6 goes through.
//!
//! Grounded on `oxcrypt-core/src/vault/operations_async.rs`'s
//! `VaultOperationsAsync`, which holds `Arc<MasterKey>`, `Arc<
//! VaultLockManager>`, `Arc<VaultHandleTable>`, `Arc<VaultCache>`, `Arc<
//! LockMetrics>` as composed fields behind one cheaply-clonable handle.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::command_launcher::CommandLauncher;
use crate::config::MasterConfig;
use crate::dependency::{ClientDependencyInfo, DependencyGraph, DependencyResult, DependencyType};
use crate::inode::{now_ms, FileLocation, NetAddress};
use crate::journal::{Journal, JournalRecord, JournalResult};
use crate::metrics::{MasterMetrics, MasterMetricsSnapshot};
use crate::namespace::{ClientFileInfo, ClientRawTableInfo, Namespace, NamespaceError, NamespaceResult, PathContext, PathOrId};
use crate::worker::{HeartbeatCommand, WorkerInfo, WorkerRegistry, WorkerResult};

/// Owns every lock-guarded component plus the background thread handles.
/// No process-wide singletons: everything reachable only through an
/// instance of this struct (see `SPEC_FULL.md` §9 "Global mutable state").
pub struct MasterState {
    namespace: Arc<Namespace>,
    deps: Arc<DependencyGraph>,
    workers: Arc<WorkerRegistry>,
    journal: Arc<Journal>,
    metrics: Arc<MasterMetrics>,
    config: MasterConfig,
    launcher: Arc<dyn CommandLauncher>,
    start_time_ms: i64,
    user_id_counter: AtomicI64,
    shutdown: Arc<AtomicBool>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

/// A cheap `Clone`-able facade over `Arc<MasterState>`, through which every
/// client/worker call in `SPEC_FULL.md` §6 is made. Stands in for what an
/// RPC server's dispatch layer would call.
#[derive(Clone)]
pub struct MasterHandle(Arc<MasterState>);

impl MasterHandle {
    /// Opens the journal, replays checkpoint-then-log into fresh namespace
    /// and dependency components, writes a consolidated checkpoint, and
    /// truncates the log — `SPEC_FULL.md` §4.2 recovery steps 1-3. Always
    /// runs, even against an empty journal (a first boot is recovery from
    /// nothing).
    pub fn recover(config: MasterConfig, launcher: Arc<dyn CommandLauncher>) -> JournalResult<Self> {
        let start_time_ms = now_ms();
        let journal = Arc::new(Journal::open(&config.log_file, &config.checkpoint_file)?);

        let checkpoint_records = Journal::read_all(journal.checkpoint_path())?;
        let log_records = Journal::read_all(journal.log_path())?;

        let namespace = Arc::new(Namespace::new(
            journal.clone(),
            config.pinlist.clone(),
            config.whitelist.clone(),
            config.max_columns,
        ));
        let deps = Arc::new(DependencyGraph::new(config.proactive_recovery));

        let mut inodes = Vec::new();
        let mut dependencies = Vec::new();
        let mut inode_counter = 0i32;
        let mut dependency_counter = 0i32;

        for record in checkpoint_records.into_iter().chain(log_records) {
            match record {
                JournalRecord::Dependency(dep) => {
                    dependency_counter = dependency_counter.max(dep.id);
                    dependencies.push(dep);
                }
                JournalRecord::CheckpointInfo {
                    inode_counter: ic,
                    dependency_counter: dc,
                } => {
                    inode_counter = inode_counter.max(ic);
                    dependency_counter = dependency_counter.max(dc);
                }
                JournalRecord::TxnBegin { .. } | JournalRecord::TxnCommit { .. } => {}
                record => {
                    if let Some(inode) = record.into_inode() {
                        inode_counter = inode_counter.max(inode.header.id.abs());
                        inodes.push(inode);
                    }
                }
            }
        }

        namespace.install_recovered(inodes, inode_counter);
        deps.install_recovered(dependencies, dependency_counter);

        let mut checkpoint: Vec<JournalRecord> = namespace.snapshot_bfs().iter().map(JournalRecord::from).collect();
        checkpoint.extend(deps.snapshot_all().into_iter().map(JournalRecord::Dependency));
        checkpoint.push(JournalRecord::CheckpointInfo {
            inode_counter: namespace.inode_counter(),
            dependency_counter: deps.dependency_counter(),
        });
        journal.compact(&checkpoint)?;

        let workers = Arc::new(WorkerRegistry::new(start_time_ms));
        let metrics = Arc::new(MasterMetrics::new());

        tracing::info!(
            inode_counter = namespace.inode_counter(),
            dependency_counter = deps.dependency_counter(),
            "master recovered"
        );

        Ok(Self(Arc::new(MasterState {
            namespace,
            deps,
            workers,
            journal,
            metrics,
            config,
            launcher,
            start_time_ms,
            user_id_counter: AtomicI64::new(0),
            shutdown: Arc::new(AtomicBool::new(false)),
            background: Mutex::new(Vec::new()),
        })))
    }

    /// Spawns the liveness monitor and recomputation scheduler on their own
    /// dedicated OS threads (`SPEC_FULL.md` §5). Idempotent only in the
    /// sense that calling it twice spawns a second pair of threads reading
    /// the same state — callers should call this once.
    pub fn start_background(&self) {
        let state = &self.0;
        let restart_hook_command = Some(state.config.restart_hook_path().display().to_string());
        let restart_hook_log = state.config.logs_dir().join("restart-hook.log");

        let liveness = crate::liveness::spawn(
            state.workers.clone(),
            state.namespace.clone(),
            state.deps.clone(),
            state.config.worker_timeout_ms,
            state.config.heartbeat_interval_ms,
            restart_hook_command,
            restart_hook_log,
            state.launcher.clone(),
            state.shutdown.clone(),
        );
        let scheduler = crate::scheduler::spawn(
            state.namespace.clone(),
            state.deps.clone(),
            state.launcher.clone(),
            state.config.tachyon_home.clone(),
            state.shutdown.clone(),
        );
        state.background.lock().extend([liveness, scheduler]);
    }

    /// Signals both background threads to stop and joins them.
    pub fn shutdown(&self) {
        self.0.shutdown.store(true, Ordering::Relaxed);
        for handle in self.0.background.lock().drain(..) {
            let _ = handle.join();
        }
    }

    /// Operator-facing manual checkpoint compaction, outside of recovery
    /// (`SPEC_FULL.md` §4.2, "may also be triggered manually").
    pub fn compact(&self) -> JournalResult<()> {
        let state = &self.0;
        let mut records: Vec<JournalRecord> = state.namespace.snapshot_bfs().iter().map(JournalRecord::from).collect();
        records.extend(state.deps.snapshot_all().into_iter().map(JournalRecord::Dependency));
        records.push(JournalRecord::CheckpointInfo {
            inode_counter: state.namespace.inode_counter(),
            dependency_counter: state.deps.dependency_counter(),
        });
        state.journal.compact(&records)?;
        state.metrics.record_checkpoint_written();
        Ok(())
    }

    pub fn metrics_snapshot(&self) -> MasterMetricsSnapshot {
        self.0.metrics.snapshot()
    }

    // ---- Client calls (SPEC_FULL.md §6) ----

    pub fn create_file(
        &self,
        path: &str,
        directory: bool,
        recursive: bool,
        columns: Option<u32>,
        metadata: Vec<u8>,
    ) -> NamespaceResult<i32> {
        let id = self
            .0
            .namespace
            .create_with_metadata(path, directory, recursive, columns, metadata)?;
        self.0.metrics.record_file_created();
        Ok(id)
    }

    pub fn create_raw_table(&self, path: &str, columns: u32, metadata: Vec<u8>) -> NamespaceResult<i32> {
        let id = self.0.namespace.create_raw_table(path, columns, metadata)?;
        self.0.metrics.record_file_created();
        Ok(id)
    }

    pub fn delete(&self, target: PathOrId<'_>) -> NamespaceResult<()> {
        match target {
            PathOrId::Id(id) => self.0.namespace.delete_by_id(id)?,
            PathOrId::Path(path) => self.0.namespace.delete_by_path(path)?,
        }
        self.0.metrics.record_file_deleted();
        Ok(())
    }

    pub fn rename(&self, src: &str, dst: &str) -> NamespaceResult<()> {
        self.0.namespace.rename(src, dst)?;
        self.0.metrics.record_rename();
        Ok(())
    }

    /// Returns `-1` rather than an error if `path` does not resolve, per
    /// the §6 RPC table's `id or -1` return contract.
    pub fn get_file_id(&self, path: &str) -> NamespaceResult<i32> {
        Ok(self.0.namespace.resolve(path)?.unwrap_or(-1))
    }

    pub fn get_file_info(&self, target: PathOrId<'_>) -> NamespaceResult<ClientFileInfo> {
        self.0.namespace.get_file_info(target)
    }

    pub fn get_raw_table_info(&self, target: PathOrId<'_>) -> NamespaceResult<ClientRawTableInfo> {
        self.0.namespace.get_raw_table_info(target)
    }

    pub fn get_file_locations(&self, target: PathOrId<'_>) -> NamespaceResult<Vec<FileLocation>> {
        self.0.namespace.get_file_locations(target)
    }

    pub fn list_files(&self, path: &str, recursive: bool) -> NamespaceResult<Vec<i32>> {
        self.0.namespace.list_files(path, recursive)
    }

    pub fn ls(&self, path: &str, recursive: bool) -> NamespaceResult<Vec<String>> {
        self.0.namespace.ls(path, recursive)
    }

    pub fn get_in_memory_files(&self) -> Vec<String> {
        self.0.namespace.get_in_memory_files()
    }

    pub fn get_pin_list(&self) -> Vec<String> {
        self.0.namespace.pin_list().prefixes().to_vec()
    }

    pub fn get_white_list(&self) -> Vec<String> {
        self.0.namespace.whitelist().prefixes().to_vec()
    }

    pub fn get_pin_id_list(&self) -> Vec<i32> {
        self.0.namespace.pin_id_list()
    }

    pub fn get_priority_dependency_list(&self) -> Vec<i32> {
        self.0.deps.get_priority_dependency_list()
    }

    pub fn get_new_user_id(&self) -> i64 {
        self.0.user_id_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Resolves `parents`/`children` paths to file-ids before delegating,
    /// per `SPEC_FULL.md` §4.4: a parent path that fails to resolve to a
    /// File is `InvalidPath`; a child path that fails to resolve is
    /// `FileDoesNotExist` (children must be pre-existing empty files).
    #[allow(clippy::too_many_arguments)]
    pub fn create_dependency(
        &self,
        parents: &[String],
        children: &[String],
        command_prefix: String,
        data: Vec<Vec<u8>>,
        comment: String,
        framework: String,
        framework_version: String,
        dependency_type: DependencyType,
    ) -> DependencyResult<i32> {
        let state = &self.0;

        let parent_ids = parents
            .iter()
            .map(|path| {
                state
                    .namespace
                    .resolve(path)?
                    .ok_or_else(|| NamespaceError::InvalidPath(PathContext::new().with_path(path.as_str())))
            })
            .collect::<NamespaceResult<Vec<i32>>>()?;
        let child_ids = children
            .iter()
            .map(|path| {
                state
                    .namespace
                    .resolve(path)?
                    .ok_or_else(|| NamespaceError::FileDoesNotExist(PathContext::new().with_path(path.as_str())))
            })
            .collect::<NamespaceResult<Vec<i32>>>()?;

        let dep_id = state.deps.create_dependency(
            &state.namespace,
            &state.journal,
            parent_ids,
            child_ids,
            command_prefix,
            data,
            comment,
            framework,
            framework_version,
            dependency_type,
        )?;
        state.metrics.record_dependency_created();
        state.metrics.record_journal_append();
        Ok(dep_id)
    }

    pub fn get_client_dependency_info(&self, dep_id: i32) -> DependencyResult<ClientDependencyInfo> {
        self.0.deps.get_client_dependency_info(dep_id)
    }

    /// `reportLostFile(file_id)`: looks up the file's own `dependency_id`
    /// (not supplied by the caller) before delegating, per `SPEC_FULL.md`
    /// §4.4.
    pub fn report_lost_file(&self, file_id: i32) {
        let state = &self.0;
        let dependency_id = state.namespace.with_file(file_id, |f| f.dependency_id).unwrap_or(-1);
        state.deps.report_lost_file(file_id, dependency_id);
        if dependency_id < 0 {
            state.metrics.record_file_lost();
        }
    }

    pub fn unpin_file(&self, file_id: i32) -> NamespaceResult<()> {
        self.0.namespace.unpin_file(file_id)
    }

    pub fn get_worker(&self, random: bool, host: &str) -> WorkerResult<NetAddress> {
        self.0.workers.get_worker(random, host)
    }

    pub fn get_capacity_bytes(&self) -> u64 {
        self.0.workers.capacity_bytes()
    }

    pub fn get_used_bytes(&self) -> u64 {
        self.0.workers.used_bytes()
    }

    pub fn get_worker_count(&self) -> usize {
        self.0.workers.worker_count()
    }

    pub fn get_start_time_ms(&self) -> i64 {
        self.0.start_time_ms
    }

    pub fn get_workers_info(&self) -> Vec<WorkerInfo> {
        self.0.workers.workers_info()
    }

    // ---- Worker calls (SPEC_FULL.md §6) ----

    pub fn register_worker(&self, address: NetAddress, capacity_bytes: u64, used_bytes: u64, current_files: Vec<i32>) -> i64 {
        let state = &self.0;
        let id = state
            .workers
            .register_worker(address, capacity_bytes, used_bytes, current_files, &state.namespace);
        state.metrics.record_worker_registered();
        id
    }

    pub fn worker_heartbeat(&self, worker_id: i64, used_bytes: u64, removed_file_ids: &[i32]) -> HeartbeatCommand {
        let state = &self.0;
        state
            .workers
            .worker_heartbeat(worker_id, used_bytes, removed_file_ids, &state.namespace)
    }

    pub fn cached_file(&self, worker_id: i64, used_bytes: u64, file_id: i32, size_bytes: i64) -> WorkerResult<i32> {
        let state = &self.0;
        state
            .workers
            .cached_file(worker_id, used_bytes, file_id, size_bytes, &state.namespace, &state.deps)
    }

    pub fn add_checkpoint(
        &self,
        worker_id: i64,
        file_id: i32,
        size_bytes: i64,
        checkpoint_path: String,
    ) -> WorkerResult<bool> {
        let state = &self.0;
        let result =
            state
                .workers
                .add_checkpoint(worker_id, file_id, size_bytes, checkpoint_path, &state.namespace, &state.deps);
        if result.is_ok() {
            state.metrics.record_checkpoint_written();
        }
        result
    }
}
