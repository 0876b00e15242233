//! The worker registry: worker table, address index, lost-worker queue,
//! and the host-matching/random-pick logic behind `getWorker`.

pub mod error;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use error::{WorkerError, WorkerResult};

use crate::inode::{now_ms, FileLocation, NetAddress};
use crate::namespace::{Namespace, NamespaceError};

/// A per-worker RPC response telling the worker whether to keep going or
/// re-register from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatCommand {
    Nothing,
    Register,
}

#[derive(Debug, Clone)]
pub struct WorkerInfo {
    pub id: i64,
    pub address: NetAddress,
    pub capacity_bytes: u64,
    pub used_bytes: u64,
    pub files: std::collections::HashSet<i32>,
    pub last_updated_ms: i64,
}

struct RegistryAux {
    address_to_id: HashMap<NetAddress, i64>,
    lost_queue: VecDeque<WorkerInfo>,
}

/// Everything the `workers` lock guards, split between a `DashMap` for
/// independent per-worker entries and one `Mutex` for the two pieces of
/// state (`address_to_id`, `lost_queue`) that `registerWorker` must
/// mutate together with the map in a single critical section.
pub struct WorkerRegistry {
    workers: DashMap<i64, WorkerInfo>,
    aux: Mutex<RegistryAux>,
    worker_counter: AtomicI64,
    id_prefix: i64,
    rng: Mutex<StdRng>,
}

impl WorkerRegistry {
    /// `id_prefix` is the master's start time in milliseconds, rounded
    /// down to the nearest `1_000_000`, so worker ids from a previous
    /// master incarnation never collide with the current one.
    pub fn new(start_time_ms: i64) -> Self {
        Self {
            workers: DashMap::new(),
            aux: Mutex::new(RegistryAux {
                address_to_id: HashMap::new(),
                lost_queue: VecDeque::new(),
            }),
            worker_counter: AtomicI64::new(0),
            id_prefix: (start_time_ms / 1_000_000) * 1_000_000,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn start_time_prefix(&self) -> i64 {
        self.id_prefix
    }

    #[tracing::instrument(skip(self, namespace, current_files))]
    pub fn register_worker(
        &self,
        address: NetAddress,
        capacity_bytes: u64,
        used_bytes: u64,
        current_files: Vec<i32>,
        namespace: &Namespace,
    ) -> i64 {
        let id = {
            let mut aux = self.aux.lock();
            if let Some(old_id) = aux.address_to_id.remove(&address) {
                if let Some((_, info)) = self.workers.remove(&old_id) {
                    tracing::warn!(old_id, %address, "worker re-registered, evicting prior record");
                    aux.lost_queue.push_back(info);
                }
            }
            let id = self.id_prefix + self.worker_counter.fetch_add(1, Ordering::Relaxed) + 1;
            self.workers.insert(
                id,
                WorkerInfo {
                    id,
                    address: address.clone(),
                    capacity_bytes,
                    used_bytes,
                    files: current_files.iter().copied().collect(),
                    last_updated_ms: now_ms(),
                },
            );
            aux.address_to_id.insert(address.clone(), id);
            id
        };

        for file_id in current_files {
            namespace.with_file_mut(file_id, |file| {
                file.locations.push(FileLocation {
                    worker_id: id,
                    address: address.clone(),
                });
            });
        }
        id
    }

    pub fn worker_heartbeat(
        &self,
        worker_id: i64,
        used_bytes: u64,
        removed_file_ids: &[i32],
        namespace: &Namespace,
    ) -> HeartbeatCommand {
        let Some(mut worker) = self.workers.get_mut(&worker_id) else {
            return HeartbeatCommand::Register;
        };
        worker.used_bytes = used_bytes;
        worker.last_updated_ms = now_ms();
        for id in removed_file_ids {
            worker.files.remove(id);
        }
        drop(worker);

        for &file_id in removed_file_ids {
            namespace.with_file_mut(file_id, |file| {
                file.locations.retain(|loc| loc.worker_id != worker_id);
            });
        }
        HeartbeatCommand::Nothing
    }

    /// Returns `-1` if already checkpointed, else the file's
    /// `dependency_id` (`-1` if none) — the caller uses this to decide
    /// whether to schedule a checkpoint upload.
    pub fn cached_file(
        &self,
        worker_id: i64,
        used_bytes: u64,
        file_id: i32,
        size_bytes: i64,
        namespace: &Namespace,
        deps: &crate::dependency::DependencyGraph,
    ) -> WorkerResult<i32> {
        let address = self.workers.get(&worker_id).map(|w| w.address.clone());
        if let Some(mut worker) = self.workers.get_mut(&worker_id) {
            worker.used_bytes = used_bytes;
            worker.files.insert(file_id);
            worker.last_updated_ms = now_ms();
        }

        let dependency_id = namespace
            .with_file_mut(file_id, |file| -> Result<i32, NamespaceError> {
                if file.ready {
                    if file.length != size_bytes {
                        return Err(NamespaceError::SuspectedFileSize {
                            context: crate::namespace::PathContext::new().with_id(file_id),
                            expected: file.length,
                            actual: size_bytes,
                        });
                    }
                } else {
                    file.length = size_bytes;
                }
                if let Some(address) = &address {
                    let location = FileLocation {
                        worker_id,
                        address: address.clone(),
                    };
                    if !file.locations.contains(&location) {
                        file.locations.push(location);
                    }
                }
                Ok(file.dependency_id)
            })
            .ok_or_else(|| NamespaceError::FileDoesNotExist(crate::namespace::PathContext::new().with_id(file_id)))??;

        deps.clear_lost_and_recomputed(file_id);
        Ok(deps.dependency_of_file_if_pending(dependency_id).unwrap_or(-1))
    }

    /// Sets `length`/`checkpoint_path`, flips `ready`, and notifies the
    /// dependency graph that this child is checkpointed. `worker_id` is
    /// part of the call contract (the checkpointing worker identifies
    /// itself) but is only used for logging here: ownership of a
    /// checkpoint path is not tracked per worker.
    pub fn add_checkpoint(
        &self,
        worker_id: i64,
        file_id: i32,
        size_bytes: i64,
        checkpoint_path: String,
        namespace: &Namespace,
        deps: &crate::dependency::DependencyGraph,
    ) -> WorkerResult<bool> {
        tracing::debug!(worker_id, file_id, %checkpoint_path, "checkpoint added");
        let dependency_id = namespace
            .with_file_mut(file_id, |file| -> Result<i32, NamespaceError> {
                if file.ready && file.length != size_bytes {
                    return Err(NamespaceError::SuspectedFileSize {
                        context: crate::namespace::PathContext::new().with_id(file_id),
                        expected: file.length,
                        actual: size_bytes,
                    });
                }
                file.length = size_bytes;
                file.checkpoint_path = checkpoint_path;
                file.ready = true;
                Ok(file.dependency_id)
            })
            .ok_or_else(|| NamespaceError::FileDoesNotExist(crate::namespace::PathContext::new().with_id(file_id)))??;

        deps.mark_file_checkpointed(dependency_id, file_id);
        deps.clear_lost_and_recomputed(file_id);
        Ok(true)
    }

    /// `random`: uniformly picks one worker from the registry via a single
    /// seeded generator bounded by the registry size — no redundant
    /// fallback scan (see `SPEC_FULL.md` §9). Otherwise matches `host`
    /// against each worker address's host part (`addr` before the `:`).
    pub fn get_worker(&self, random: bool, host: &str) -> WorkerResult<NetAddress> {
        if random {
            let ids: Vec<i64> = self.workers.iter().map(|entry| *entry.key()).collect();
            if ids.is_empty() {
                return Err(WorkerError::NoLocalWorker { host: host.to_string() });
            }
            let index = self.rng.lock().random_range(0..ids.len());
            return self
                .workers
                .get(&ids[index])
                .map(|w| w.address.clone())
                .ok_or_else(|| WorkerError::NoLocalWorker { host: host.to_string() });
        }
        self.workers
            .iter()
            .find(|entry| host_part(&entry.address) == host)
            .map(|entry| entry.address.clone())
            .ok_or_else(|| WorkerError::NoLocalWorker { host: host.to_string() })
    }

    /// Step 1 of the liveness sweep: times out and removes workers whose
    /// `last_updated_ms` is stale, enqueueing each for cleanup. Returns the
    /// number removed.
    pub fn sweep_timeouts(&self, timeout_ms: i64) -> usize {
        let now = now_ms();
        let stale_ids: Vec<i64> = self
            .workers
            .iter()
            .filter(|entry| now - entry.last_updated_ms > timeout_ms)
            .map(|entry| *entry.key())
            .collect();

        let mut aux = self.aux.lock();
        for id in &stale_ids {
            if let Some((_, info)) = self.workers.remove(id) {
                aux.address_to_id.remove(&info.address);
                tracing::error!(worker_id = id, address = %info.address, "worker timed out");
                aux.lost_queue.push_back(info);
            }
        }
        stale_ids.len()
    }

    /// Step 2 of the liveness sweep: drains the lost-workers queue for the
    /// caller to process under `ns`/`deps`.
    pub fn drain_lost_queue(&self) -> Vec<WorkerInfo> {
        let mut aux = self.aux.lock();
        aux.lost_queue.drain(..).collect()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.workers.iter().map(|w| w.capacity_bytes).sum()
    }

    pub fn used_bytes(&self) -> u64 {
        self.workers.iter().map(|w| w.used_bytes).sum()
    }

    pub fn workers_info(&self) -> Vec<WorkerInfo> {
        self.workers.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Test-only escape hatch for forcing a worker's `last_updated_ms`
    /// into the past without waiting out a real timeout.
    #[cfg(test)]
    pub fn test_get_mut(&self, id: i64) -> Option<dashmap::mapref::one::RefMut<'_, i64, WorkerInfo>> {
        self.workers.get_mut(&id)
    }
}

fn host_part(address: &str) -> &str {
    address.split(':').next().unwrap_or(address)
}
