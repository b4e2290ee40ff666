//! Follower-side replication manager for materialized views
//!
//! Followers never replicate. They learn how far the leader got by reading
//! lease state and mirror it onto their local index handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::ports::ReplicationManager;
use crate::config::SyncSourceConfig;
use crate::features::catalog::IndexGeneration;
use crate::features::generation::GenerationId;
use crate::features::leasing::LeaseManager;
use crate::features::resource::SupervisorHandle;
use crate::shared::utils::Teardown;

type Generations = Arc<DashMap<GenerationId, IndexGeneration>>;

/// Mirrors leader-reported status onto tracked generations
pub struct MaterializedViewFollowerManager {
    sync_source: Option<SyncSourceConfig>,
    lease_manager: Arc<dyn LeaseManager>,
    generations: Generations,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl MaterializedViewFollowerManager {
    /// Start the status refresh loop under `supervisor`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        sync_source: Option<SyncSourceConfig>,
        lease_manager: Arc<dyn LeaseManager>,
        refresh_interval: Duration,
        supervisor: &SupervisorHandle,
    ) -> Self {
        let generations: Generations = Arc::new(DashMap::new());
        let task = supervisor.spawn_supervised(
            "follower-status-refresh",
            refresh_loop(
                Arc::clone(&lease_manager),
                Arc::clone(&generations),
                refresh_interval,
            ),
        );
        info!(
            interval_ms = refresh_interval.as_millis() as u64,
            "follower status refresh started"
        );

        Self {
            sync_source,
            lease_manager,
            generations,
            refresh_task: Mutex::new(Some(task)),
            shut_down: AtomicBool::new(false),
        }
    }

    /// One refresh pass over every tracked generation
    pub async fn refresh_now(&self) {
        refresh_statuses(self.lease_manager.as_ref(), &self.generations).await;
    }

    pub fn tracked_generations(&self) -> usize {
        self.generations.len()
    }

    fn ensure_running(&self, operation: &str) {
        if self.shut_down.load(Ordering::Acquire) {
            panic!("{} called on a replication manager that was shut down", operation);
        }
    }
}

async fn refresh_loop(
    lease_manager: Arc<dyn LeaseManager>,
    generations: Generations,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        refresh_statuses(lease_manager.as_ref(), &generations).await;
    }
}

async fn refresh_statuses(lease_manager: &dyn LeaseManager, generations: &Generations) {
    // snapshot first; no map guard is held across the lease reads
    let snapshot: Vec<IndexGeneration> = generations
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    for generation in snapshot {
        let status = lease_manager
            .materialized_view_replication_status(&generation)
            .await;
        if generation.index().status() != status {
            debug!(generation = %generation, status = %status, "follower status changed");
        }
        generation.index().set_status(status);
    }
}

impl ReplicationManager for MaterializedViewFollowerManager {
    fn add(&self, generation: IndexGeneration) {
        self.ensure_running("add");
        self.generations
            .entry(generation.generation_id())
            .or_insert(generation);
    }

    fn drop_index(&self, generation_id: GenerationId) -> Teardown {
        self.ensure_running("drop_index");
        self.generations.remove(&generation_id);
        Teardown::completed()
    }

    fn sync_source_config(&self) -> Option<SyncSourceConfig> {
        self.sync_source.clone()
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn is_replication_supported(&self) -> bool {
        false
    }

    fn shutdown(&self) -> Teardown {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Teardown::completed();
        }
        info!("shutting down follower replication manager");
        match self.refresh_task.lock().take() {
            Some(task) => {
                task.abort();
                Teardown::from_future(async move {
                    // cancellation is the expected outcome
                    let _ = task.await;
                })
            }
            None => Teardown::completed(),
        }
    }
}

impl Drop for MaterializedViewFollowerManager {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::catalog::{Index, IndexDefinition, TrackedIndex};
    use crate::features::generation::{Generation, IndexKind};
    use crate::features::leasing::StaticLeaderLeaseManager;
    use crate::features::resource::{FatalSignal, Supervisor, Terminator};
    use crate::features::status::{IndexStatus, StatusCode};
    use crate::shared::models::ObjectId;
    use indexsync_storage::InMemoryLeaseStore;
    use uuid::Uuid;

    fn generation(index_id: ObjectId, status: IndexStatus) -> IndexGeneration {
        generation_over(index_id, Arc::new(TrackedIndex::new(status)))
    }

    fn generation_over(index_id: ObjectId, index: Arc<dyn Index>) -> IndexGeneration {
        IndexGeneration::new(
            IndexDefinition::new(
                index_id,
                "embeddings",
                "app",
                Uuid::new_v4(),
                "articles",
                IndexKind::MaterializedView,
            ),
            Generation::CURRENT,
            index,
        )
    }

    fn supervisor() -> SupervisorHandle {
        Supervisor::new().handle()
    }

    /// Index whose status can be read but never written
    #[derive(Debug)]
    struct ReadOnlyIndex;

    impl Index for ReadOnlyIndex {
        fn status(&self) -> IndexStatus {
            IndexStatus::not_started()
        }
        fn set_status(&self, _status: IndexStatus) {
            panic!("status is read-only");
        }
        fn is_closed(&self) -> bool {
            false
        }
        fn close(&self) -> crate::shared::models::Result<()> {
            Ok(())
        }
        fn drop_data(&self) -> crate::shared::models::Result<()> {
            Ok(())
        }
    }

    struct KeepRunning;

    impl Terminator for KeepRunning {
        fn terminate(&self, _signal: &FatalSignal) {}
    }

    fn lease_managers() -> (StaticLeaderLeaseManager, Arc<dyn LeaseManager>) {
        let store = Arc::new(InMemoryLeaseStore::new());
        let leader = StaticLeaderLeaseManager::new("leader", true, store.clone());
        let follower: Arc<dyn LeaseManager> =
            Arc::new(StaticLeaderLeaseManager::new("follower", false, store));
        (leader, follower)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Status Refresh
    // ═══════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn test_refresh_mirrors_leader_status() {
        let (leader, follower_leases) = lease_managers();
        let manager = MaterializedViewFollowerManager::start(
            None,
            follower_leases,
            Duration::from_secs(3600),
            &supervisor(),
        );

        let index_id = ObjectId::new();
        let leader_view = generation(index_id, IndexStatus::initial_sync());
        leader.add(&leader_view);
        leader
            .update_replication_status(leader_view.generation_id(), 0, &IndexStatus::steady())
            .await
            .unwrap();

        let follower_view = generation(index_id, IndexStatus::not_started());
        manager.add(follower_view.clone());
        manager.refresh_now().await;

        assert_eq!(follower_view.index().status(), IndexStatus::steady());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_loop_runs_periodically() {
        let (_leader, follower_leases) = lease_managers();
        let manager = MaterializedViewFollowerManager::start(
            None,
            follower_leases,
            Duration::from_millis(10),
            &supervisor(),
        );

        // no lease exists, so the loop reports UNKNOWN
        let view = generation(ObjectId::new(), IndexStatus::not_started());
        manager.add(view.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(view.index().status().status_code, StatusCode::Unknown);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_panic_reaches_supervisor() {
        let (_leader, follower_leases) = lease_managers();
        let supervisor = Supervisor::new();
        let manager = MaterializedViewFollowerManager::start(
            None,
            follower_leases,
            Duration::from_millis(10),
            &supervisor.handle(),
        );
        manager.add(generation_over(ObjectId::new(), Arc::new(ReadOnlyIndex)));

        let signal = tokio::time::timeout(Duration::from_secs(5), supervisor.run(&KeepRunning))
            .await
            .unwrap();

        assert!(signal.reason.contains("follower-status-refresh"));
        assert!(signal.reason.contains("status is read-only"));
        manager.shutdown().await;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn test_add_is_idempotent_and_drop_forgets() {
        let (_leader, follower_leases) = lease_managers();
        let manager = MaterializedViewFollowerManager::start(
            None,
            follower_leases,
            Duration::from_secs(3600),
            &supervisor(),
        );
        let view = generation(ObjectId::new(), IndexStatus::not_started());

        manager.add(view.clone());
        manager.add(view.clone());
        assert_eq!(manager.tracked_generations(), 1);

        manager.drop_index(view.generation_id()).await;
        assert_eq!(manager.tracked_generations(), 0);

        assert!(manager.is_initialized());
        assert!(!manager.is_replication_supported());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (_leader, follower_leases) = lease_managers();
        let sync_source = SyncSourceConfig {
            mongod_uri: "mongodb://localhost:27017".to_string(),
            mongos_uri: None,
            ssl: false,
        };
        let manager = MaterializedViewFollowerManager::start(
            Some(sync_source.clone()),
            follower_leases,
            Duration::from_millis(10),
            &supervisor(),
        );

        manager.shutdown().await;
        manager.shutdown().await;
        assert_eq!(manager.sync_source_config(), Some(sync_source));
    }

    #[tokio::test]
    #[should_panic(expected = "shut down")]
    async fn test_add_after_shutdown_panics() {
        let (_leader, follower_leases) = lease_managers();
        let manager = MaterializedViewFollowerManager::start(
            None,
            follower_leases,
            Duration::from_secs(3600),
            &supervisor(),
        );
        manager.shutdown().await;
        manager.add(generation(ObjectId::new(), IndexStatus::not_started()));
    }
}
