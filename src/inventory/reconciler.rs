//! Reconciliation stream processor
//!
//! Serializes all mutations for entities sharing the same natural key so
//! merges are linearizable per key, while different keys proceed fully in
//! parallel.
//!
//! ```text
//!  producers ──submit──▶ ReconcilerHandle
//!                             │ hash(natural key) % workers
//!              ┌──────────────┼──────────────┐
//!              ▼              ▼              ▼
//!          worker-0       worker-1       worker-N     (mpsc, arrival order)
//!              │              │              │
//!              └── lookup ─ merge ─ persist-if-changed ──▶ InventoryDao
//! ```
//!
//! Each worker owns its partition exclusively, so two submissions for the
//! same key are always merged by the same task in arrival order. There is no
//! cross-key ordering guarantee and none is needed.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, instrument, trace, warn};

use crate::Scope;

use super::dao::InventoryDao;
use super::entity::{InventoryRecord, NONE};

/// Queue depth per worker before submitters start to feel back-pressure.
const WORKER_QUEUE_DEPTH: usize = 1024;

enum WorkerMessage {
    Submit(InventoryRecord),
    Shutdown,
}

/// Handle for submitting records into the reconciliation stream
#[derive(Clone)]
pub struct ReconcilerHandle {
    senders: Arc<Vec<mpsc::Sender<WorkerMessage>>>,
}

impl ReconcilerHandle {
    /// Spawn the worker pool.
    ///
    /// `daos` routes each entity kind to its store; records for kinds
    /// without a wired store are dropped with a warning.
    pub fn spawn(daos: HashMap<Scope, Arc<dyn InventoryDao>>, workers: usize) -> Self {
        let workers = workers.max(1);
        let daos = Arc::new(daos);
        let mut senders = Vec::with_capacity(workers);

        for index in 0..workers {
            let (tx, rx) = mpsc::channel(WORKER_QUEUE_DEPTH);
            senders.push(tx);

            let worker = ReconcileWorker {
                index,
                daos: daos.clone(),
                rx,
            };
            tokio::spawn(worker.run());
        }

        Self {
            senders: Arc::new(senders),
        }
    }

    /// Submit a record for reconciliation.
    ///
    /// Awaits only when the owning worker's queue is full (back-pressure);
    /// per-key ordering is preserved because the shard for a key is stable.
    pub async fn submit(&self, record: InventoryRecord) {
        let shard = shard_for(&record.natural_key(), self.senders.len());

        if self.senders[shard]
            .send(WorkerMessage::Submit(record))
            .await
            .is_err()
        {
            warn!("reconcile worker {shard} is gone, dropping submission");
        }
    }

    /// Ask all workers to finish their queues and exit.
    pub async fn shutdown(&self) {
        for sender in self.senders.iter() {
            let _ = sender.send(WorkerMessage::Shutdown).await;
        }
    }
}

fn shard_for(natural_key: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    natural_key.hash(&mut hasher);
    (hasher.finish() as usize) % shards
}

struct ReconcileWorker {
    index: usize,
    daos: Arc<HashMap<Scope, Arc<dyn InventoryDao>>>,
    rx: mpsc::Receiver<WorkerMessage>,
}

impl ReconcileWorker {
    #[instrument(skip(self), fields(worker = self.index))]
    async fn run(mut self) {
        debug!("starting reconcile worker");

        while let Some(message) = self.rx.recv().await {
            match message {
                WorkerMessage::Submit(record) => self.reconcile(record).await,
                WorkerMessage::Shutdown => break,
            }
        }

        debug!("reconcile worker stopped");
    }

    async fn reconcile(&self, incoming: InventoryRecord) {
        let Some(dao) = self.daos.get(&incoming.scope()).cloned() else {
            warn!(
                "no store wired for {:?} inventory, dropping submission",
                incoming.scope()
            );
            return;
        };

        let key = incoming.natural_key();

        // Store failures degrade to "missing"; the save below is keyed by the
        // natural key, so acting on a wrong miss stays idempotent.
        let existing = match dao.lookup_id(&key).await {
            Ok(id) if id == NONE => None,
            Ok(id) => match dao.get(id).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("store read for key {key} failed, treating as missing: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("store lookup for key {key} failed, treating as missing: {e}");
                None
            }
        };

        match existing {
            None => {
                trace!("first sight of key {key}, persisting new record");
                if let Err(e) = dao.save(incoming).await {
                    warn!("store write for key {key} failed: {e}");
                }
            }
            Some(current) => {
                let (merged, changed) = current.merge(&incoming);
                if !changed {
                    trace!("merge for key {key} produced no change, suppressing write");
                    return;
                }

                if let Err(e) = dao.save(merged).await {
                    warn!("store write for key {key} failed: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::entity::EntityAttrs;
    use crate::inventory::memory::MemoryDao;
    use std::time::Duration;

    fn wiring(dao: Arc<MemoryDao>) -> HashMap<Scope, Arc<dyn InventoryDao>> {
        let mut daos: HashMap<Scope, Arc<dyn InventoryDao>> = HashMap::new();
        daos.insert(Scope::Endpoint, dao);
        daos
    }

    fn endpoint(name: &str, now: i64) -> InventoryRecord {
        InventoryRecord::new(
            EntityAttrs::Endpoint {
                service_id: 1,
                name: name.to_string(),
            },
            now,
        )
    }

    #[tokio::test]
    async fn duplicate_submissions_converge_to_one_record() {
        let dao = Arc::new(MemoryDao::new());
        let handle = ReconcilerHandle::spawn(wiring(dao.clone()), 4);

        handle.submit(endpoint("GET:/orders", 100)).await;
        handle.submit(endpoint("GET:/orders", 120)).await;
        handle.submit(endpoint("GET:/orders", 110)).await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(dao.record_count(), 1);

        let id = dao.lookup_id("1|GET:/orders").await.unwrap();
        assert_ne!(id, NONE);

        let record = dao.get(id).await.unwrap().unwrap();
        assert_eq!(record.last_update_time, 120);
        assert_eq!(record.register_time, 100);
    }

    #[tokio::test]
    async fn unchanged_resubmission_suppresses_the_write() {
        let dao = Arc::new(MemoryDao::new());
        let handle = ReconcilerHandle::spawn(wiring(dao.clone()), 2);

        let record = endpoint("GET:/orders", 100);
        handle.submit(record.clone()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dao.save_count(), 1);

        // Identical submission merges to no change.
        handle.submit(record).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dao.save_count(), 1);
    }

    #[tokio::test]
    async fn heartbeat_storm_writes_once_per_advance() {
        let dao = Arc::new(MemoryDao::new());
        let handle = ReconcilerHandle::spawn(wiring(dao.clone()), 2);

        let record = endpoint("GET:/orders", 100);
        handle.submit(record.clone()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Same heartbeat three times: one write, two suppressed.
        for _ in 0..3 {
            handle.submit(record.with_heartbeat(500)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(dao.save_count(), 2);
        let id = dao.lookup_id("1|GET:/orders").await.unwrap();
        assert_eq!(dao.get(id).await.unwrap().unwrap().heartbeat_time, 500);
    }

    #[tokio::test]
    async fn unwired_scope_is_dropped() {
        let dao = Arc::new(MemoryDao::new());
        let handle = ReconcilerHandle::spawn(wiring(dao.clone()), 2);

        handle
            .submit(InventoryRecord::new(
                EntityAttrs::Service {
                    name: "checkout".to_string(),
                },
                100,
            ))
            .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dao.record_count(), 0);
    }

    #[test]
    fn shard_is_stable_for_a_key() {
        let a = shard_for("1|GET:/orders", 8);
        for _ in 0..16 {
            assert_eq!(shard_for("1|GET:/orders", 8), a);
        }
    }
}
