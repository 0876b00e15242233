//! End-to-end scenarios against the public `MasterHandle` surface, one per
//! literal scenario in `SPEC_FULL.md` §8. Rename-survives-restart and
//! lineage-recovery scenarios are covered as unit tests in `state.rs` and
//! `liveness.rs` respectively, where test-only hooks for forcing worker
//! timeouts are available.

use std::sync::Arc;

use tachyon_core::command_launcher::RecordingCommandLauncher;
use tachyon_core::dependency::DependencyType;
use tachyon_core::namespace::PathOrId;
use tachyon_core::{CommandLauncher, MasterConfig, MasterHandle};
use tempfile::tempdir;

fn handle(dir: &std::path::Path) -> MasterHandle {
    let config = MasterConfig::default()
        .tachyon_home(dir.to_path_buf())
        .log_file(dir.join("journal.log"))
        .checkpoint_file(dir.join("journal.checkpoint"))
        .max_columns(1000);
    let launcher: Arc<dyn CommandLauncher> = Arc::new(RecordingCommandLauncher::new());
    MasterHandle::recover(config, launcher).unwrap()
}

#[test]
fn simple_create_and_list() {
    let dir = tempdir().unwrap();
    let master = handle(dir.path());

    let id = master.create_file("/a/b", false, true, None, vec![]).unwrap();
    assert_eq!(id, 3); // root=1, /a=2, /a/b=3

    assert_eq!(master.ls("/a", false).unwrap(), vec!["/a/b".to_string()]);
    let info = master.get_file_info(PathOrId::Path("/a/b")).unwrap();
    assert!(!info.folder);
}

#[test]
fn raw_table_gets_one_column_file_per_column() {
    let dir = tempdir().unwrap();
    let master = handle(dir.path());

    master.create_raw_table("/t", 3, b"m".to_vec()).unwrap();

    let mut listed = master.ls("/t", false).unwrap();
    listed.sort();
    assert_eq!(listed, vec!["/t/COL_0", "/t/COL_1", "/t/COL_2"]);

    let info = master.get_raw_table_info(PathOrId::Path("/t")).unwrap();
    assert_eq!(info.columns, 3);
    assert_eq!(info.metadata, b"m");
}

#[test]
fn cache_then_checkpoint_then_resize_mismatch() {
    let dir = tempdir().unwrap();
    let master = handle(dir.path());

    let address = "10.0.0.1:9000".to_string();
    let worker = master.register_worker(address.clone(), 1000, 0, vec![]);
    let file = master.create_file("/f", false, true, None, vec![]).unwrap();

    let dep = master.cached_file(worker, 100, file, 42).unwrap();
    assert_eq!(dep, -1); // no dependency

    let locations = master.get_file_locations(PathOrId::Path("/f")).unwrap();
    assert!(locations.iter().any(|loc| loc.address == address));

    assert!(master.add_checkpoint(worker, file, 42, "hdfs://cluster/f".into()).unwrap());
    assert_eq!(
        master.get_file_info(PathOrId::Path("/f")).unwrap().checkpoint_path,
        "hdfs://cluster/f"
    );

    let result = master.cached_file(worker, 100, file, 43);
    assert!(result.is_err());
}

#[test]
fn journal_compaction_survives_many_creates_and_deletes_without_reusing_ids() {
    let dir = tempdir().unwrap();
    let launcher: Arc<dyn CommandLauncher> = Arc::new(RecordingCommandLauncher::new());
    let config = MasterConfig::default()
        .tachyon_home(dir.path().to_path_buf())
        .log_file(dir.path().join("journal.log"))
        .checkpoint_file(dir.path().join("journal.checkpoint"))
        .max_columns(1000);

    let max_id = {
        let master = MasterHandle::recover(config.clone(), launcher.clone()).unwrap();
        let mut ids = Vec::new();
        for i in 0..100 {
            ids.push(master.create_file(&format!("/f{i}"), false, true, None, vec![]).unwrap());
        }
        for id in ids.iter().take(50) {
            master.delete(PathOrId::Id(*id)).unwrap();
        }
        master.compact().unwrap();
        *ids.iter().max().unwrap()
    };

    let master = MasterHandle::recover(config, launcher).unwrap();
    let next = master.create_file("/after-recovery", false, true, None, vec![]).unwrap();
    assert!(next > max_id);
}

#[test]
fn create_dependency_resolves_parent_and_child_paths() {
    let dir = tempdir().unwrap();
    let master = handle(dir.path());

    master.create_file("/p", false, true, None, vec![]).unwrap();
    master.create_file("/c", false, true, None, vec![]).unwrap();

    let dep_id = master
        .create_dependency(
            &["/p".to_string()],
            &["/c".to_string()],
            "prog --out /c".to_string(),
            vec![],
            String::new(),
            "fw".to_string(),
            "1".to_string(),
            DependencyType::Narrow,
        )
        .unwrap();

    let info = master.get_file_info(PathOrId::Path("/c")).unwrap();
    assert_eq!(info.dependency_id, dep_id);
}

#[test]
fn create_dependency_rejects_unresolvable_parent_path() {
    let dir = tempdir().unwrap();
    let master = handle(dir.path());

    master.create_file("/c", false, true, None, vec![]).unwrap();

    let result = master.create_dependency(
        &["/missing-parent".to_string()],
        &["/c".to_string()],
        "prog".to_string(),
        vec![],
        String::new(),
        "fw".to_string(),
        "1".to_string(),
        DependencyType::Narrow,
    );
    assert!(result.is_err());
}

#[test]
fn create_dependency_rejects_unresolvable_child_path() {
    let dir = tempdir().unwrap();
    let master = handle(dir.path());

    master.create_file("/p", false, true, None, vec![]).unwrap();

    let result = master.create_dependency(
        &["/p".to_string()],
        &["/missing-child".to_string()],
        "prog".to_string(),
        vec![],
        String::new(),
        "fw".to_string(),
        "1".to_string(),
        DependencyType::Narrow,
    );
    assert!(result.is_err());
}
