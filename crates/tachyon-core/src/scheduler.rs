//! The recomputation scheduler: finds dependencies whose parent files are
//! all present (or themselves being recomputed), launches their commands,
//! and cascades the need to recompute up to ancestors whose own inputs are
//! lost.
//!
//! Modeled on `oxcrypt-fuse/src/scheduler/executor.rs`'s dedicated-thread,
//! `Arc<AtomicBool>`-shutdown-flag shape, simplified from a bounded job
//! queue to a plain poll loop since this scheduler has no submitters other
//! than itself.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::command_launcher::CommandLauncher;
use crate::dependency::DependencyGraph;
use crate::namespace::Namespace;

const SLEEP_WHEN_IDLE: Duration = Duration::from_millis(1000);

/// One pass: BFS over `must_recompute_deps`, launching everything
/// launchable, per `SPEC_FULL.md` §4.4 steps 2-4. Returns the number of
/// dependencies launched.
pub fn run_once(
    namespace: &Namespace,
    deps: &DependencyGraph,
    launcher: &dyn CommandLauncher,
    tachyon_home: &Path,
) -> usize {
    let mut queue: VecDeque<i32> = deps.must_recompute_snapshot().into_iter().collect();
    let mut visited: HashSet<i32> = queue.iter().copied().collect();
    let mut launchable = Vec::new();

    while let Some(dep_id) = queue.pop_front() {
        let Some(dep) = deps.get(dep_id) else { continue };
        let mut can_launch = true;

        for &parent_file in &dep.parent_files {
            if deps.is_lost(parent_file) && !deps.is_being_recomputed(parent_file) {
                can_launch = false;
                let parent_dep_id = namespace.with_file(parent_file, |f| f.dependency_id).unwrap_or(-1);
                if parent_dep_id >= 0 && visited.insert(parent_dep_id) {
                    deps.add_must_recompute(parent_dep_id);
                    queue.push_back(parent_dep_id);
                }
            }
        }

        if can_launch {
            launchable.push(dep_id);
        }
    }

    for dep_id in &launchable {
        launch(*dep_id, deps, launcher, tachyon_home);
    }
    launchable.len()
}

fn launch(dep_id: i32, deps: &DependencyGraph, launcher: &dyn CommandLauncher, tachyon_home: &Path) {
    let Some(dep) = deps.get(dep_id) else { return };
    deps.remove_must_recompute(dep_id);
    deps.mark_being_recomputed(dep.lost_files.iter().copied());

    let rerun_id = deps.next_rerun_id();
    let log_path = tachyon_home.join("logs").join(format!("rerun{rerun_id}"));
    let command = format!("{} &> {}", dep.command, log_path.display());
    deps.set_command(dep_id, command.clone());

    tracing::info!(dep_id, %command, "launching recomputation");
    if let Err(error) = launcher.launch(&command, &log_path) {
        tracing::warn!(dep_id, %error, "recomputation launch failed");
    }
}

/// Spawns the scheduler's dedicated background thread. Runs until
/// `shutdown` is set, sleeping `SLEEP_WHEN_IDLE` outside any lock whenever
/// a pass launched nothing but `must_recompute_deps` is still non-empty.
pub fn spawn(
    namespace: Arc<Namespace>,
    deps: Arc<DependencyGraph>,
    launcher: Arc<dyn CommandLauncher>,
    tachyon_home: PathBuf,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("recomputation-scheduler".into())
        .spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                let launched = run_once(&namespace, &deps, launcher.as_ref(), &tachyon_home);
                let work_remains = !deps.must_recompute_snapshot().is_empty();
                if launched == 0 && work_remains {
                    std::thread::sleep(SLEEP_WHEN_IDLE);
                }
            }
        })
        .expect("failed to spawn recomputation-scheduler thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_launcher::RecordingCommandLauncher;
    use crate::dependency::DependencyType;
    use crate::journal::Journal;
    use crate::prefix_list::PrefixList;
    use tempfile::tempdir;

    #[test]
    fn launches_dependency_once_parent_is_present_again() {
        let dir = tempdir().unwrap();
        let journal = Journal::open(dir.path().join("log"), dir.path().join("checkpoint")).unwrap();
        let ns = Namespace::new(
            Arc::new(Journal::open(dir.path().join("log2"), dir.path().join("checkpoint2")).unwrap()),
            PrefixList::default(),
            PrefixList::default(),
            1000,
        );
        let deps = DependencyGraph::new(false);

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

        // `/c` lost, independent parent `/p` also lost (no dependency):
        // not launchable, permanent loss on the parent side.
        deps.report_lost_file(child, dep_id);
        assert!(deps.must_recompute_snapshot().contains(&dep_id));
        deps.report_lost_file(parent, -1);

        let launcher = RecordingCommandLauncher::new();
        let launched = run_once(&ns, &deps, &launcher, dir.path());
        assert_eq!(launched, 0); // parent lost and not being recomputed
        assert!(deps.must_recompute_snapshot().contains(&dep_id));

        // Parent comes back (cleared from lost_files).
        deps.clear_lost_and_recomputed(parent);
        let launched = run_once(&ns, &deps, &launcher, dir.path());
        assert_eq!(launched, 1);
        assert!(deps.must_recompute_snapshot().is_empty());
        assert_eq!(launcher.launches().len(), 1);
        assert!(launcher.launches()[0].0.contains("prog --out /c"));
    }
}
