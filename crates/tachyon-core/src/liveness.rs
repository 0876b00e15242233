//! The liveness monitor: times out stale workers and tears down their
//! file locations, escalating orphaned files into the dependency graph's
//! lost/must-recompute bookkeeping.
//!
//! Modeled on `oxcrypt-mount`'s stale-mount classification
//! (`stale_detection.rs`'s match-based status dispatch) and its cleanup
//! pass's result-reporting shape (`cleanup.rs`'s `CleanupAction`/
//! `CleanupResult`), retargeted from "is this mount still backed by a
//! live process" to "is this worker still heartbeating".

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::command_launcher::CommandLauncher;
use crate::dependency::DependencyGraph;
use crate::namespace::Namespace;
use crate::worker::WorkerRegistry;

/// What happened to one file while cleaning up a lost worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCleanupAction {
    /// Dropped the worker's location; the file is still in memory elsewhere
    /// or has a checkpoint.
    LocationDropped,
    /// The file had no checkpoint and no surviving copy, and no
    /// dependency: an unrecoverable, permanent loss (logged as ERROR).
    PermanentLoss,
    /// The file had no checkpoint and no surviving copy, but does have a
    /// dependency: queued for recomputation.
    QueuedForRecomputation,
    /// The file had no checkpoint and no surviving copy, and does have a
    /// dependency, but `MASTER_PROACTIVE_RECOVERY` is on: recomputation is
    /// left to the lazy `cachedFile`-driven path instead of being enqueued.
    DeferredToProactiveRecovery,
}

/// Report of a single liveness sweep, for logging/metrics.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub workers_timed_out: usize,
    pub files_affected: usize,
    pub permanent_losses: usize,
    pub queued_for_recomputation: usize,
    pub deferred_to_proactive_recovery: usize,
}

/// Runs one liveness sweep: timeout detection, then draining and cleaning
/// up each lost worker's files, per `SPEC_FULL.md` §4.3.
pub fn run_sweep(
    workers: &WorkerRegistry,
    namespace: &Namespace,
    deps: &DependencyGraph,
    timeout_ms: i64,
    restart_hook_command: Option<&str>,
    restart_hook_log: &std::path::Path,
    launcher: &dyn CommandLauncher,
) -> SweepReport {
    let mut report = SweepReport::default();
    report.workers_timed_out = workers.sweep_timeouts(timeout_ms);

    let lost_workers = workers.drain_lost_queue();
    for worker in &lost_workers {
        for &file_id in &worker.files {
            let action = clean_up_file_location(namespace, deps, worker.id, file_id);
            report.files_affected += 1;
            match action {
                FileCleanupAction::PermanentLoss => report.permanent_losses += 1,
                FileCleanupAction::QueuedForRecomputation => report.queued_for_recomputation += 1,
                FileCleanupAction::DeferredToProactiveRecovery => report.deferred_to_proactive_recovery += 1,
                FileCleanupAction::LocationDropped => {}
            }
        }
    }

    if !lost_workers.is_empty() {
        if let Some(command) = restart_hook_command {
            if let Err(error) = launcher.launch(command, restart_hook_log) {
                tracing::warn!(%error, "worker-restart hook launch failed");
            }
        }
    }

    report
}

/// Drops `worker_id`'s location from `file_id`; if the file now has no
/// checkpoint and no surviving in-memory copy, escalates it into the
/// dependency graph's loss-tracking.
fn clean_up_file_location(
    namespace: &Namespace,
    deps: &DependencyGraph,
    worker_id: i64,
    file_id: i32,
) -> FileCleanupAction {
    let orphaned = namespace
        .with_file_mut(file_id, |file| {
            file.locations.retain(|loc| loc.worker_id != worker_id);
            (!file.has_checkpoint() && !file.in_memory()).then_some(file.dependency_id)
        })
        .flatten();

    match orphaned {
        None => FileCleanupAction::LocationDropped,
        Some(dependency_id) => {
            deps.report_lost_file_from_liveness(file_id, dependency_id);
            if dependency_id < 0 {
                FileCleanupAction::PermanentLoss
            } else if deps.proactive_recovery() {
                FileCleanupAction::DeferredToProactiveRecovery
            } else {
                FileCleanupAction::QueuedForRecomputation
            }
        }
    }
}

/// Spawns the liveness monitor's dedicated background thread. Runs one
/// [`run_sweep`] per `interval_ms` until `shutdown` is set, matching
/// [`crate::scheduler::spawn`]'s shutdown-flag-plus-dedicated-thread shape.
#[allow(clippy::too_many_arguments)]
pub fn spawn(
    workers: Arc<WorkerRegistry>,
    namespace: Arc<Namespace>,
    deps: Arc<DependencyGraph>,
    timeout_ms: i64,
    interval_ms: u64,
    restart_hook_command: Option<String>,
    restart_hook_log: PathBuf,
    launcher: Arc<dyn CommandLauncher>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("liveness-monitor".into())
        .spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                let report = run_sweep(
                    &workers,
                    &namespace,
                    &deps,
                    timeout_ms,
                    restart_hook_command.as_deref(),
                    &restart_hook_log,
                    launcher.as_ref(),
                );
                if report.workers_timed_out > 0 {
                    tracing::info!(?report, "liveness sweep");
                }
                std::thread::sleep(Duration::from_millis(interval_ms));
            }
        })
        .expect("failed to spawn liveness-monitor thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_launcher::RecordingCommandLauncher;
    use crate::dependency::DependencyType;
    use crate::prefix_list::PrefixList;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Namespace, WorkerRegistry, DependencyGraph) {
        let dir = tempdir().unwrap();
        let journal = Arc::new(Journal::open(dir.path().join("log"), dir.path().join("checkpoint")).unwrap());
        let ns = Namespace::new(journal, PrefixList::default(), PrefixList::default(), 1000);
        (dir, ns, WorkerRegistry::new(1_000_000_000), DependencyGraph::new(false))
    }

    use crate::journal::Journal;

    #[test]
    fn sweep_detects_permanent_loss_for_independent_file() {
        let (dir, ns, workers, deps) = setup();
        let file = ns.create("/f", false, true, None).unwrap();
        let worker_id = workers.register_worker("10.0.0.1:9000".into(), 1000, 0, vec![file], &ns);
        assert!(ns.with_file(file, |f| f.in_memory()).unwrap());

        if let Some(mut w) = workers_get_mut_for_test(&workers, worker_id) {
            w.last_updated_ms = 0;
        }

        let launcher = RecordingCommandLauncher::new();
        let report = run_sweep(&workers, &ns, &deps, 1, None, &dir.path().join("restart.log"), &launcher);

        assert_eq!(report.workers_timed_out, 1);
        assert_eq!(report.permanent_losses, 1);
        assert!(!ns.with_file(file, |f| f.in_memory()).unwrap());
    }

    #[test]
    fn sweep_queues_recomputation_for_dependent_file() {
        let (dir, ns, workers, deps) = setup();
        let parent = ns.create("/p", false, true, None).unwrap();
        let child = ns.create("/c", false, true, None).unwrap();
        let journal = Journal::open(dir.path().join("log3"), dir.path().join("checkpoint3")).unwrap();
        deps.create_dependency(
            &ns,
            &journal,
            vec![parent],
            vec![child],
            "cmd".into(),
            vec![],
            String::new(),
            "fw".into(),
            "1".into(),
            DependencyType::Narrow,
        )
        .unwrap();

        let worker_id = workers.register_worker("10.0.0.1:9000".into(), 1000, 0, vec![child], &ns);
        if let Some(mut w) = workers_get_mut_for_test(&workers, worker_id) {
            w.last_updated_ms = 0;
        }

        let launcher = RecordingCommandLauncher::new();
        let restart_log = dir.path().join("restart.log");
        let report = run_sweep(
            &workers,
            &ns,
            &deps,
            1,
            Some("restart.sh"),
            &restart_log,
            &launcher,
        );

        assert_eq!(report.queued_for_recomputation, 1);
        assert!(deps.must_recompute_snapshot().len() == 1);
        assert_eq!(launcher.launches().len(), 1);
    }

    #[test]
    fn sweep_defers_recomputation_when_proactive_recovery_is_on() {
        let (dir, ns, workers, _) = setup();
        let deps = DependencyGraph::new(true);
        let parent = ns.create("/p", false, true, None).unwrap();
        let child = ns.create("/c", false, true, None).unwrap();
        let journal = Journal::open(dir.path().join("log3"), dir.path().join("checkpoint3")).unwrap();
        deps.create_dependency(
            &ns,
            &journal,
            vec![parent],
            vec![child],
            "cmd".into(),
            vec![],
            String::new(),
            "fw".into(),
            "1".into(),
            DependencyType::Narrow,
        )
        .unwrap();

        let worker_id = workers.register_worker("10.0.0.1:9000".into(), 1000, 0, vec![child], &ns);
        if let Some(mut w) = workers_get_mut_for_test(&workers, worker_id) {
            w.last_updated_ms = 0;
        }

        let launcher = RecordingCommandLauncher::new();
        let restart_log = dir.path().join("restart.log");
        let report = run_sweep(&workers, &ns, &deps, 1, None, &restart_log, &launcher);

        assert_eq!(report.queued_for_recomputation, 0);
        assert_eq!(report.deferred_to_proactive_recovery, 1);
        assert!(deps.must_recompute_snapshot().is_empty());
    }

    fn workers_get_mut_for_test(
        workers: &WorkerRegistry,
        id: i64,
    ) -> Option<dashmap::mapref::one::RefMut<'_, i64, crate::worker::WorkerInfo>> {
        workers.test_get_mut(id)
    }
}
