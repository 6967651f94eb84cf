// src/core/connector/source.rs

//! The source-side connector: discovers the source cluster's replicable
//! topic-partitions, reconciles them onto the target cluster, and keeps topic
//! ACLs and topic configurations in sync.
//!
//! All state lives in memory and is rebuilt from the brokers after a restart.
//! Every job runs on the connector's scheduler worker, so reads and writes of
//! the known topic-partition sets need no locks beyond the snapshot swap that
//! publishes them to host threads.

use crate::config::MirrorConfig;
use crate::core::admin::{AdminError, BrokerAdmin};
use crate::core::assignment::{self, TaskConfig};
use crate::core::connector::{ConnectorContext, connector_job};
use crate::core::errors::MirrorError;
use crate::core::filters::{ConfigPropertyFilter, TopicFilter};
use crate::core::policy::{self, SharedReplicationPolicy};
use crate::core::scheduler::Scheduler;
use crate::core::types::{
    AclBinding, AclBindingFilter, AclOperation, AclPermission, NewTopic, PatternType,
    ResourcePattern, ResourceType, SourceAndTarget, TopicConfig, TopicPartition,
};
use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Topic-partition sets observed by the last reconciliation tick. Published
/// wholesale by `Arc` replacement so host-thread readers always see a
/// consistent pair.
#[derive(Debug, Clone, Default)]
struct KnownTopicPartitions {
    source: Vec<TopicPartition>,
    target: Vec<TopicPartition>,
}

/// The topic/partition, ACL, and configuration control plane for one
/// source -> target replication flow.
pub struct MirrorSourceConnector {
    name: String,
    config: MirrorConfig,
    source_and_target: SourceAndTarget,
    policy: SharedReplicationPolicy,
    topic_filter: TopicFilter,
    config_property_filter: ConfigPropertyFilter,
    source_admin: Arc<dyn BrokerAdmin>,
    target_admin: Arc<dyn BrokerAdmin>,
    context: Arc<dyn ConnectorContext>,
    known: RwLock<Arc<KnownTopicPartitions>>,
    acl_sync_disabled: AtomicBool,
    scheduler: Mutex<Option<Scheduler>>,
}

impl MirrorSourceConnector {
    /// Builds a connector from a validated configuration and the capability
    /// handles the host provides. Configuration faults are fatal here; the
    /// connector never starts half-configured.
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
        let config_property_filter = config.config_property_filter()?;
        Ok(Arc::new(Self {
            name: format!("MirrorSourceConnector({source_and_target})"),
            config,
            source_and_target,
            policy,
            topic_filter,
            config_property_filter,
            source_admin,
            target_admin,
            context,
            known: RwLock::new(Arc::new(KnownTopicPartitions::default())),
            acl_sync_disabled: AtomicBool::new(false),
            scheduler: Mutex::new(None),
        }))
    }

    /// Schedules the connector's jobs. A disabled connector is a logged
    /// no-op. Must be called from within a tokio runtime.
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
            connector_job(self, |c| async move { c.create_offset_syncs_topic().await }),
            "creating internal offset-syncs topic",
        );
        scheduler.execute(
            connector_job(self, |c| async move { c.load_topic_partitions().await }),
            "loading initial set of topic-partitions",
        );
        scheduler.execute(
            connector_job(self, |c| async move {
                c.compute_and_create_topic_partitions().await
            }),
            "creating downstream topic-partitions",
        );
        scheduler.schedule_repeating(
            connector_job(self, |c| async move { c.refresh_topic_partitions().await }),
            self.config.refresh_topics_interval,
            "refreshing topics",
        );
        if self.config.sync_topic_acls_enabled {
            scheduler.schedule_repeating(
                connector_job(self, |c| async move { c.sync_topic_acls().await }),
                self.config.sync_topic_acls_interval,
                "syncing topic ACLs",
            );
        }
        scheduler.schedule_repeating(
            connector_job(self, |c| async move { c.sync_topic_configs().await }),
            self.config.sync_topic_configs_interval,
            "syncing topic configs",
        );

        *guard = Some(scheduler);
        info!("Started {}.", self.name);
    }

    /// Closes the scheduler, then each admin client, each step independently
    /// swallowing errors so a slow broker cannot wedge shutdown.
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

    /// Round-robin task configurations over the currently known source
    /// topic-partitions.
    pub fn task_configs(&self, max_tasks: usize) -> Vec<TaskConfig> {
        let known = self.known_snapshot();
        if !self.config.enabled || known.source.is_empty() {
            return Vec::new();
        }
        assignment::topic_partition_task_configs(&known.source, max_tasks)
    }

    /// The source topic-partitions discovered by the last tick.
    pub fn known_source_topic_partitions(&self) -> Vec<TopicPartition> {
        self.known_snapshot().source.clone()
    }

    /// Whether a source topic is eligible for replication: it passes the
    /// topic filter (heartbeats bypass it), is not a checkpoints topic, and
    /// would not loop back through the target cluster.
    pub fn should_replicate_topic(&self, topic: &str) -> bool {
        (self.topic_filter.should_replicate_topic(topic) || self.policy.is_heartbeats_topic(topic))
            && !self.policy.is_checkpoints_topic(topic)
            && !policy::is_cycle(
                self.policy.as_ref(),
                &self.source_and_target.target,
                topic,
            )
    }

    /// Whether the source authorizer was found to be disabled. Reset only by
    /// rebuilding the connector.
    pub fn is_acl_sync_disabled(&self) -> bool {
        self.acl_sync_disabled.load(Ordering::SeqCst)
    }

    // --- Topic/partition reconciliation ---

    /// One reconciliation tick. Creation is triggered when the source
    /// topic-partition set changed since the last tick or when a previously
    /// scheduled creation has not yet materialized on the target. Partitions
    /// present only on the target never trigger anything, so a target that is
    /// ahead does not oscillate.
    pub async fn refresh_topic_partitions(&self) -> Result<(), MirrorError> {
        let source = self.find_source_topic_partitions().await?;
        let target = self.find_target_topic_partitions().await?;

        let source_set: HashSet<TopicPartition> = source.iter().cloned().collect();
        let known = self.known_snapshot();
        let known_source_set: HashSet<TopicPartition> = known.source.iter().cloned().collect();

        let upstream_of_target: HashSet<TopicPartition> = target
            .iter()
            .filter_map(|tp| {
                self.policy
                    .upstream_topic(&tp.topic)
                    .map(|upstream| TopicPartition::new(upstream, tp.partition))
            })
            .collect();
        let missing_on_target = source_set
            .iter()
            .filter(|tp| !upstream_of_target.contains(tp))
            .count();

        self.publish_known(|known| known.target = target);

        if known_source_set != source_set || missing_on_target > 0 {
            info!(
                "Found {} topic-partitions on {}; {} missing on {}. Reconciling.",
                source_set.len(),
                self.source_and_target.source,
                missing_on_target,
                self.source_and_target.target
            );
            self.publish_known(|known| known.source = source);
            self.compute_and_create_topic_partitions().await?;
        }
        Ok(())
    }

    /// Diffs the known source and target sets and issues the create-topic and
    /// create-partitions calls the target is behind on. Requests a task
    /// reconfiguration exactly when something had to be created.
    pub async fn compute_and_create_topic_partitions(&self) -> Result<(), MirrorError> {
        let known = self.known_snapshot();
        let mut source_counts: HashMap<String, u32> = HashMap::new();
        for tp in &known.source {
            *source_counts.entry(tp.topic.clone()).or_insert(0) += 1;
        }
        let mut target_counts: HashMap<String, u32> = HashMap::new();
        for tp in &known.target {
            *target_counts.entry(tp.topic.clone()).or_insert(0) += 1;
        }

        let source_to_remote: HashMap<String, String> = source_counts
            .keys()
            .map(|topic| {
                (
                    topic.clone(),
                    self.policy
                        .format_remote_topic(&self.source_and_target.source, topic),
                )
            })
            .collect();

        let mut new_source_topics: Vec<String> = Vec::new();
        let mut new_target_partitions: HashMap<String, u32> = HashMap::new();
        for (topic, partitions) in &source_counts {
            let remote = &source_to_remote[topic];
            match target_counts.get(remote) {
                None => new_source_topics.push(topic.clone()),
                Some(existing) if existing < partitions => {
                    new_target_partitions.insert(remote.clone(), *partitions);
                }
                Some(_) => {}
            }
        }
        new_source_topics.sort();

        let created_topics = !new_source_topics.is_empty();
        let added_partitions = !new_target_partitions.is_empty();
        if created_topics {
            self.create_new_topics(&new_source_topics, &source_counts, &source_to_remote)
                .await?;
        }
        if added_partitions {
            self.create_new_partitions(new_target_partitions).await?;
        }
        if created_topics || added_partitions {
            self.context.request_task_reconfiguration();
        }
        Ok(())
    }

    /// Initial discovery: records both sets without triggering creation or a
    /// task reconfiguration.
    async fn load_topic_partitions(&self) -> Result<(), MirrorError> {
        let source = self.find_source_topic_partitions().await?;
        let target = self.find_target_topic_partitions().await?;
        info!(
            "Found {} topic-partitions on {}.",
            source.len(),
            self.source_and_target.source
        );
        self.publish_known(|known| {
            known.source = source;
            known.target = target;
        });
        Ok(())
    }

    async fn find_source_topic_partitions(&self) -> Result<Vec<TopicPartition>, MirrorError> {
        let topics = self.source_admin.list_topics().await?;
        let mut partitions = Vec::new();
        for topic in topics {
            if !self.should_replicate_topic(&topic.name) {
                continue;
            }
            for partition in 0..topic.partitions {
                partitions.push(TopicPartition::new(topic.name.clone(), partition));
            }
        }
        Ok(partitions)
    }

    /// Target-side partitions of mirrored topics: names the policy can trace
    /// back to an upstream cluster.
    async fn find_target_topic_partitions(&self) -> Result<Vec<TopicPartition>, MirrorError> {
        let topics = self.target_admin.list_topics().await?;
        let mut partitions = Vec::new();
        for topic in topics {
            if self.policy.upstream_topic(&topic.name).is_none() {
                continue;
            }
            for partition in 0..topic.partitions {
                partitions.push(TopicPartition::new(topic.name.clone(), partition));
            }
        }
        Ok(partitions)
    }

    async fn create_new_topics(
        &self,
        topics: &[String],
        source_counts: &HashMap<String, u32>,
        source_to_remote: &HashMap<String, String>,
    ) -> Result<(), MirrorError> {
        // Config describe precedes topic creation: one batched call for all
        // new topics of this tick.
        let source_configs = self.source_admin.describe_topic_configs(topics).await?;
        let new_topics: Vec<NewTopic> = topics
            .iter()
            .map(|topic| {
                let mut new_topic = NewTopic::new(
                    source_to_remote[topic].clone(),
                    source_counts[topic],
                    self.config.replication_factor,
                );
                if let Some(config) = source_configs.get(topic) {
                    new_topic.configs = self.target_config(config);
                }
                new_topic
            })
            .collect();
        match self.target_admin.create_topics(&new_topics).await {
            Ok(()) => info!(
                "Created {} new topics on {}.",
                new_topics.len(),
                self.source_and_target.target
            ),
            Err(AdminError::AlreadyExists(name)) => debug!(
                "Topic '{name}' already exists on {}.",
                self.source_and_target.target
            ),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn create_new_partitions(
        &self,
        partitions: HashMap<String, u32>,
    ) -> Result<(), MirrorError> {
        match self.target_admin.create_partitions(&partitions).await {
            Ok(()) => info!(
                "Expanded partition counts of {} topics on {}.",
                partitions.len(),
                self.source_and_target.target
            ),
            Err(AdminError::AlreadyExists(name)) => debug!(
                "Partitions of '{name}' already exist on {}.",
                self.source_and_target.target
            ),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn create_offset_syncs_topic(&self) -> Result<(), MirrorError> {
        let name = self
            .policy
            .offset_syncs_topic(&self.source_and_target.target);
        let topic = NewTopic::new(name.clone(), 1, self.config.replication_factor)
            .with_config("cleanup.policy", "compact");
        match self.target_admin.create_topics(&[topic]).await {
            Ok(()) => debug!(
                "Created offset-syncs topic '{name}' on {}.",
                self.source_and_target.target
            ),
            Err(AdminError::AlreadyExists(_)) => {
                debug!("Offset-syncs topic '{name}' already exists.");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    // --- ACL sync ---

    /// Mirrors the source's literal-topic `ALLOW` bindings onto the target,
    /// renamed and downgraded so mirrored topics are readable but never
    /// writable by source-cluster principals.
    pub async fn sync_topic_acls(&self) -> Result<(), MirrorError> {
        let Some(bindings) = self.list_topic_acl_bindings().await? else {
            return Ok(());
        };
        let bindings: Vec<AclBinding> = bindings
            .into_iter()
            .filter(|b| b.pattern.resource_type == ResourceType::Topic)
            .filter(|b| b.pattern.pattern_type == PatternType::Literal)
            .filter(|b| self.should_replicate_acl(b))
            .filter(|b| self.should_replicate_topic(&b.pattern.name))
            .map(|b| self.target_acl_binding(b))
            .collect();
        self.update_topic_acls(bindings).await
    }

    /// `None` when the source has no ACL authorizer. The recommendation is
    /// logged once per connector lifetime; later calls log a skip instead.
    async fn list_topic_acl_bindings(&self) -> Result<Option<Vec<AclBinding>>, MirrorError> {
        match self
            .source_admin
            .describe_acls(&AclBindingFilter::any_topic_literal_allow())
            .await
        {
            Ok(bindings) => Ok(Some(bindings)),
            Err(AdminError::SecurityDisabled) => {
                if !self.acl_sync_disabled.swap(true, Ordering::SeqCst) {
                    warn!(
                        "No ACL authorizer is configured on {}, so no topic ACLs will be \
                         synced. Consider disabling topic ACL syncing by setting \
                         sync.topic.acls.enabled to 'false'.",
                        self.source_and_target.source
                    );
                } else {
                    debug!(
                        "Still no ACL authorizer on {}; skipping topic ACL sync.",
                        self.source_and_target.source
                    );
                }
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `WRITE` grants never propagate; the mirror must not be writable by
    /// source-cluster principals.
    fn should_replicate_acl(&self, binding: &AclBinding) -> bool {
        !(binding.entry.permission == AclPermission::Allow
            && binding.entry.operation == AclOperation::Write)
    }

    /// Renames the resource to its mirrored name and downgrades `ALL`/`ALLOW`
    /// to `READ`/`ALLOW`. `DENY` entries pass through unchanged.
    pub fn target_acl_binding(&self, binding: AclBinding) -> AclBinding {
        let remote_name = self
            .policy
            .format_remote_topic(&self.source_and_target.source, &binding.pattern.name);
        let mut entry = binding.entry;
        if entry.permission == AclPermission::Allow && entry.operation == AclOperation::All {
            entry.operation = AclOperation::Read;
        }
        AclBinding::new(
            ResourcePattern {
                resource_type: ResourceType::Topic,
                name: remote_name,
                pattern_type: PatternType::Literal,
            },
            entry,
        )
    }

    async fn update_topic_acls(&self, bindings: Vec<AclBinding>) -> Result<(), MirrorError> {
        if bindings.is_empty() {
            return Ok(());
        }
        debug!(
            "Syncing {} topic ACL bindings to {}.",
            bindings.len(),
            self.source_and_target.target
        );
        self.target_admin.create_acls(&bindings).await?;
        Ok(())
    }

    // --- Topic config sync ---

    /// Projects the source's explicitly-set topic configurations through the
    /// property filter and applies them to the mirrored topics.
    pub async fn sync_topic_configs(&self) -> Result<(), MirrorError> {
        let known = self.known_snapshot();
        let topics: Vec<String> = known
            .source
            .iter()
            .map(|tp| tp.topic.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        if topics.is_empty() {
            return Ok(());
        }
        let source_configs = self.source_admin.describe_topic_configs(&topics).await?;
        let target_configs: HashMap<String, IndexMap<String, String>> = source_configs
            .iter()
            .map(|(topic, config)| {
                (
                    self.policy
                        .format_remote_topic(&self.source_and_target.source, topic),
                    self.target_config(config),
                )
            })
            .collect();
        if target_configs.is_empty() {
            return Ok(());
        }
        self.target_admin.alter_topic_configs(&target_configs).await?;
        Ok(())
    }

    /// Entries set on the topic itself, minus the excluded properties, in
    /// their original order.
    pub fn target_config(&self, config: &TopicConfig) -> IndexMap<String, String> {
        config
            .entries
            .iter()
            .filter(|entry| entry.is_explicitly_set())
            .filter(|entry| {
                self.config_property_filter
                    .should_replicate_config_property(&entry.name)
            })
            .map(|entry| (entry.name.clone(), entry.value.clone()))
            .collect()
    }

    // --- Known-state snapshots ---

    fn known_snapshot(&self) -> Arc<KnownTopicPartitions> {
        self.known.read().clone()
    }

    fn publish_known<F: FnOnce(&mut KnownTopicPartitions)>(&self, mutate: F) {
        let mut guard = self.known.write();
        let mut next = (**guard).clone();
        mutate(&mut next);
        *guard = Arc::new(next);
    }
}
