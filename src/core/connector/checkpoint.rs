// src/core/connector/checkpoint.rs

//! The checkpoint-side connector: discovers which consumer groups on the
//! source cluster consume from replicated topics and partitions them across
//! checkpoint tasks.

use crate::config::MirrorConfig;
use crate::core::admin::{AdminError, BrokerAdmin};
use crate::core::assignment::{self, TaskConfig};
use crate::core::connector::{ConnectorContext, connector_job};
use crate::core::errors::MirrorError;
use crate::core::filters::{GroupFilter, TopicFilter};
use crate::core::policy::SharedReplicationPolicy;
use crate::core::scheduler::Scheduler;
use crate::core::types::{NewTopic, SourceAndTarget};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The consumer-group discovery control plane for one source -> target
/// replication flow.
pub struct MirrorCheckpointConnector {
    name: String,
    config: MirrorConfig,
    source_and_target: SourceAndTarget,
    policy: SharedReplicationPolicy,
    topic_filter: TopicFilter,
    group_filter: GroupFilter,
    source_admin: Arc<dyn BrokerAdmin>,
    target_admin: Arc<dyn BrokerAdmin>,
    context: Arc<dyn ConnectorContext>,
    known_consumer_groups: RwLock<Arc<Vec<String>>>,
    scheduler: Mutex<Option<Scheduler>>,
}

impl MirrorCheckpointConnector {
    pub fn new(
        config: MirrorConfig,
        source_admin: Arc<dyn BrokerAdmin>,
        target_admin: Arc<dyn BrokerAdmin>,
        context: Arc<dyn ConnectorContext>,
    ) -> Result<Arc<Self>, MirrorError> {
        config.validate()?;
        let source_and_target = config.source_and_target();
        let policy = config.replication_policy();
        let topic_filter = config.topic_filter()?;
        let group_filter = config.group_filter()?;
        Ok(Arc::new(Self {
            name: format!("MirrorCheckpointConnector({source_and_target})"),
            config,
            source_and_target,
            policy,
            topic_filter,
            group_filter,
            source_admin,
            target_admin,
            context,
            known_consumer_groups: RwLock::new(Arc::new(Vec::new())),
            scheduler: Mutex::new(None),
        }))
    }

    /// Schedules group discovery. A disabled connector is a logged no-op.
    /// Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            info!("{} is disabled; not starting.", self.name);
            return;
        }
        let mut guard = self.scheduler.lock();
        if guard.is_some() {
            warn!("{} is already started.", self.name);
            return;
        }

        let scheduler = Scheduler::new(
            format!("Scheduler for {}", self.name),
            self.config.admin_timeout,
        );
        scheduler.execute(
            connector_job(self, |c| async move { c.create_checkpoints_topic().await }),
            "creating internal checkpoints topic",
        );
        scheduler.execute(
            connector_job(self, |c| async move { c.load_initial_consumer_groups().await }),
            "loading initial consumer groups",
        );
        scheduler.schedule_repeating_delayed(
            connector_job(self, |c| async move { c.refresh_consumer_groups().await }),
            self.config.refresh_groups_interval,
            "refreshing consumer groups",
        );

        *guard = Some(scheduler);
        info!("Started {}.", self.name);
    }

    pub async fn stop(&self) {
        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            scheduler.close().await;
        }
        if let Err(e) = self.source_admin.close().await {
            warn!("{}: failed to close source admin client: {e}", self.name);
        }
        if let Err(e) = self.target_admin.close().await {
            warn!("{}: failed to close target admin client: {e}", self.name);
        }
        info!("Stopped {}.", self.name);
    }

    /// Round-robin task configurations over the currently known consumer
    /// groups. Empty when the connector is disabled or checkpointing is
    /// switched off with a negative interval.
    pub fn task_configs(&self, max_tasks: usize) -> Vec<TaskConfig> {
        let groups = self.known_consumer_groups.read().clone();
        if !self.config.enabled
            || self.config.emit_checkpoints_interval_secs < 0
            || groups.is_empty()
        {
            return Vec::new();
        }
        assignment::consumer_group_task_configs(&groups, max_tasks)
    }

    /// The consumer groups discovered by the last tick, in discovery order.
    pub fn known_consumer_groups(&self) -> Vec<String> {
        self.known_consumer_groups.read().as_ref().clone()
    }

    /// One group-discovery tick. Membership changes replace the published
    /// list and ask the host for a task reconfiguration; reorderings alone do
    /// not.
    pub async fn refresh_consumer_groups(&self) -> Result<(), MirrorError> {
        let groups = self.find_consumer_groups().await?;
        let known = self.known_consumer_groups.read().clone();
        let known_set: HashSet<&String> = known.iter().collect();
        let group_set: HashSet<&String> = groups.iter().collect();
        let added = group_set.difference(&known_set).count();
        let removed = known_set.difference(&group_set).count();
        if added > 0 || removed > 0 {
            info!(
                "Found {} consumer groups for {}; {} new, {} removed.",
                groups.len(),
                self.source_and_target,
                added,
                removed
            );
            *self.known_consumer_groups.write() = Arc::new(groups);
            self.context.request_task_reconfiguration();
        }
        Ok(())
    }

    /// Initial discovery: records the list without requesting a task
    /// reconfiguration.
    async fn load_initial_consumer_groups(&self) -> Result<(), MirrorError> {
        let groups = self.find_consumer_groups().await?;
        info!("Loaded {} consumer groups for {}.", groups.len(), self.source_and_target);
        *self.known_consumer_groups.write() = Arc::new(groups);
        Ok(())
    }

    /// Groups that pass the group filter and have committed offsets for at
    /// least one replicated topic.
    async fn find_consumer_groups(&self) -> Result<Vec<String>, MirrorError> {
        let groups = self.source_admin.list_consumer_groups().await?;
        let mut result = Vec::new();
        for group in groups {
            if !self.group_filter.should_replicate_group(&group) {
                continue;
            }
            let offsets = self.source_admin.list_consumer_group_offsets(&group).await?;
            if offsets
                .iter()
                .any(|tp| self.topic_filter.should_replicate_topic(&tp.topic))
            {
                result.push(group);
            }
        }
        Ok(result)
    }

    async fn create_checkpoints_topic(&self) -> Result<(), MirrorError> {
        let name = self
            .policy
            .checkpoints_topic(&self.source_and_target.source);
        let topic = NewTopic::new(name.clone(), 1, self.config.replication_factor)
            .with_config("cleanup.policy", "compact");
        match self.target_admin.create_topics(&[topic]).await {
            Ok(()) => debug!(
                "Created checkpoints topic '{name}' on {}.",
                self.source_and_target.target
            ),
            Err(AdminError::AlreadyExists(_)) => {
                debug!("Checkpoints topic '{name}' already exists.");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
