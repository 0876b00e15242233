//! The `Dependency` record: lineage of a set of child files from a set of
//! parent files via a command.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::inode::now_ms;

/// Whether a dependency narrows its parents into fewer children (`Narrow`,
/// e.g. a filter) or spreads them into more (`Wide`, e.g. a shuffle). Pure
/// bookkeeping metadata; it does not affect scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyType {
    Narrow,
    Wide,
}

/// A record of the command that produced `child_files` from `parent_files`,
/// enabling lineage-based recomputation if the children's in-memory copies
/// are lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub id: i32,
    pub parent_files: Vec<i32>,
    pub child_files: Vec<i32>,
    /// Command prefix plus resolved arguments; mutated in place by the
    /// scheduler to append a rerun-log redirection before launch.
    pub command: String,
    pub data: Vec<Vec<u8>>,
    pub comment: String,
    pub framework: String,
    pub framework_version: String,
    pub dependency_type: DependencyType,
    pub creation_time_ms: i64,
    pub parent_dependencies: BTreeSet<i32>,
    pub children_dependencies: BTreeSet<i32>,
    /// Children not yet checkpointed. Empty iff this dependency is
    /// "checkpointed".
    pub unfinished_children: BTreeSet<i32>,
    pub lost_files: BTreeSet<i32>,
}

impl Dependency {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i32,
        parent_files: Vec<i32>,
        child_files: Vec<i32>,
        command: String,
        data: Vec<Vec<u8>>,
        comment: String,
        framework: String,
        framework_version: String,
        dependency_type: DependencyType,
        parent_dependencies: BTreeSet<i32>,
    ) -> Self {
        let unfinished_children = child_files.iter().copied().collect();
        Self {
            id,
            parent_files,
            child_files,
            command,
            data,
            comment,
            framework,
            framework_version,
            dependency_type,
            creation_time_ms: now_ms(),
            parent_dependencies,
            children_dependencies: BTreeSet::new(),
            unfinished_children,
            lost_files: BTreeSet::new(),
        }
    }

    /// A dependency is checkpointed iff every child file has been
    /// checkpointed.
    pub fn is_checkpointed(&self) -> bool {
        self.unfinished_children.is_empty()
    }

    pub fn mark_child_checkpointed(&mut self, file_id: i32) {
        self.unfinished_children.remove(&file_id);
    }

    /// A dependency belongs in `priority_deps` only if it has no children
    /// of its own in the lineage DAG (a leaf), per spec §4.4.
    pub fn is_leaf(&self) -> bool {
        self.children_dependencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dependency {
        Dependency::new(
            1,
            vec![10],
            vec![20, 21],
            "prog --out /c".into(),
            vec![],
            String::new(),
            "fw".into(),
            "1".into(),
            DependencyType::Narrow,
            BTreeSet::new(),
        )
    }

    #[test]
    fn new_dependency_starts_unchecked() {
        let dep = sample();
        assert!(!dep.is_checkpointed());
        assert_eq!(dep.unfinished_children.len(), 2);
    }

    #[test]
    fn checkpointing_all_children_completes_it() {
        let mut dep = sample();
        dep.mark_child_checkpointed(20);
        assert!(!dep.is_checkpointed());
        dep.mark_child_checkpointed(21);
        assert!(dep.is_checkpointed());
    }

    #[test]
    fn leaf_dependency_has_no_children_dependencies() {
        let dep = sample();
        assert!(dep.is_leaf());
    }
}
