// tests/integration/test_helpers.rs

//! Test helpers shared by the connector-level suites: a scriptable in-memory
//! broker admin, a reconfiguration-recording host context, and a log capture
//! buffer.

// Each test binary that includes this module uses a different subset of it.
#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use topicmirror::config::MirrorConfig;
use topicmirror::core::admin::{AdminError, AdminResult, BrokerAdmin};
use topicmirror::core::connector::{
    ConnectorContext, MirrorCheckpointConnector, MirrorSourceConnector,
};
use topicmirror::core::types::{
    AclBinding, AclBindingFilter, NewTopic, TopicConfig, TopicDescription, TopicPartition,
};
use tracing_subscriber::fmt::MakeWriter;

/// An in-memory broker admin. Reads serve scripted state; mutations are
/// recorded and, when `materialize_creates` is set, also applied to the
/// scripted topic list so follow-up discovery sees them.
#[derive(Default)]
pub struct MockAdmin {
    pub topics: Mutex<Vec<TopicDescription>>,
    pub topic_configs: Mutex<HashMap<String, TopicConfig>>,
    pub acls: Mutex<Vec<AclBinding>>,
    pub describe_acls_error: Mutex<Option<AdminError>>,
    pub groups: Mutex<Vec<String>>,
    pub group_offsets: Mutex<HashMap<String, Vec<TopicPartition>>>,
    /// Topic names that conflict on create without being listed, as when
    /// another connector instance raced this one.
    pub conflict_topics: Mutex<Vec<String>>,

    pub created_topics: Mutex<Vec<NewTopic>>,
    pub created_partitions: Mutex<Vec<HashMap<String, u32>>>,
    pub created_acls: Mutex<Vec<Vec<AclBinding>>>,
    pub altered_configs: Mutex<Vec<HashMap<String, IndexMap<String, String>>>>,

    pub create_topics_calls: AtomicUsize,
    pub create_partitions_calls: AtomicUsize,
    pub interactions: AtomicUsize,

    pub materialize_creates: bool,
}

impl MockAdmin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A mock whose created topics and partitions show up in `list_topics`.
    pub fn materializing() -> Arc<Self> {
        Arc::new(Self {
            materialize_creates: true,
            ..Self::default()
        })
    }

    pub fn add_topic(&self, name: &str, partitions: u32) {
        self.topics
            .lock()
            .push(TopicDescription::new(name, partitions));
    }

    pub fn set_topic_config(&self, topic: &str, config: TopicConfig) {
        self.topic_configs.lock().insert(topic.to_string(), config);
    }

    pub fn add_acl(&self, binding: AclBinding) {
        self.acls.lock().push(binding);
    }

    pub fn add_group(&self, group: &str, offsets: Vec<TopicPartition>) {
        self.groups.lock().push(group.to_string());
        self.group_offsets.lock().insert(group.to_string(), offsets);
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerAdmin for MockAdmin {
    async fn list_topics(&self) -> AdminResult<Vec<TopicDescription>> {
        self.interactions.fetch_add(1, Ordering::SeqCst);
        Ok(self.topics.lock().clone())
    }

    async fn describe_topic_configs(
        &self,
        topics: &[String],
    ) -> AdminResult<HashMap<String, TopicConfig>> {
        self.interactions.fetch_add(1, Ordering::SeqCst);
        let configs = self.topic_configs.lock();
        Ok(topics
            .iter()
            .filter_map(|t| configs.get(t).map(|c| (t.clone(), c.clone())))
            .collect())
    }

    async fn describe_acls(&self, _filter: &AclBindingFilter) -> AdminResult<Vec<AclBinding>> {
        self.interactions.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.describe_acls_error.lock().clone() {
            return Err(err);
        }
        // Deliberately loose: everything scripted is returned regardless of
        // the filter, so the connector-side filtering is what the tests see.
        Ok(self.acls.lock().clone())
    }

    async fn create_topics(&self, topics: &[NewTopic]) -> AdminResult<()> {
        self.interactions.fetch_add(1, Ordering::SeqCst);
        self.create_topics_calls.fetch_add(1, Ordering::SeqCst);
        self.created_topics.lock().extend(topics.iter().cloned());
        let mut existing = self.topics.lock();
        let mut conflict = None;
        for topic in topics {
            if existing.iter().any(|t| t.name == topic.name)
                || self.conflict_topics.lock().contains(&topic.name)
            {
                conflict = Some(topic.name.clone());
                continue;
            }
            if self.materialize_creates {
                existing.push(TopicDescription::new(topic.name.clone(), topic.partitions));
            }
        }
        match conflict {
            Some(name) => Err(AdminError::AlreadyExists(name)),
            None => Ok(()),
        }
    }

    async fn create_partitions(&self, counts: &HashMap<String, u32>) -> AdminResult<()> {
        self.interactions.fetch_add(1, Ordering::SeqCst);
        self.create_partitions_calls.fetch_add(1, Ordering::SeqCst);
        self.created_partitions.lock().push(counts.clone());
        if self.materialize_creates {
            let mut topics = self.topics.lock();
            for (name, partitions) in counts {
                if let Some(topic) = topics.iter_mut().find(|t| &t.name == name) {
                    topic.partitions = *partitions;
                }
            }
        }
        Ok(())
    }

    async fn create_acls(&self, bindings: &[AclBinding]) -> AdminResult<()> {
        self.interactions.fetch_add(1, Ordering::SeqCst);
        self.created_acls.lock().push(bindings.to_vec());
        Ok(())
    }

    async fn alter_topic_configs(
        &self,
        configs: &HashMap<String, IndexMap<String, String>>,
    ) -> AdminResult<()> {
        self.interactions.fetch_add(1, Ordering::SeqCst);
        self.altered_configs.lock().push(configs.clone());
        Ok(())
    }

    async fn list_consumer_groups(&self) -> AdminResult<Vec<String>> {
        self.interactions.fetch_add(1, Ordering::SeqCst);
        Ok(self.groups.lock().clone())
    }

    async fn list_consumer_group_offsets(
        &self,
        group: &str,
    ) -> AdminResult<Vec<TopicPartition>> {
        self.interactions.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .group_offsets
            .lock()
            .get(group)
            .cloned()
            .unwrap_or_default())
    }
}

/// Records task-reconfiguration requests from the connector.
#[derive(Default)]
pub struct RecordingContext {
    pub reconfigurations: AtomicUsize,
}

impl RecordingContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reconfiguration_count(&self) -> usize {
        self.reconfigurations.load(Ordering::SeqCst)
    }
}

impl ConnectorContext for RecordingContext {
    fn request_task_reconfiguration(&self) {
        self.reconfigurations.fetch_add(1, Ordering::SeqCst);
    }
}

/// A `us-west -> us-east` configuration with every other field at default.
pub fn test_config() -> MirrorConfig {
    MirrorConfig::new("us-west", "us-east")
}

pub fn source_connector(
    config: MirrorConfig,
    source: Arc<MockAdmin>,
    target: Arc<MockAdmin>,
    context: Arc<RecordingContext>,
) -> Arc<MirrorSourceConnector> {
    MirrorSourceConnector::new(config, source, target, context).expect("valid test config")
}

pub fn checkpoint_connector(
    config: MirrorConfig,
    source: Arc<MockAdmin>,
    target: Arc<MockAdmin>,
    context: Arc<RecordingContext>,
) -> Arc<MirrorCheckpointConnector> {
    MirrorCheckpointConnector::new(config, source, target, context).expect("valid test config")
}

/// Captures formatted log output for assertions on message patterns.
#[derive(Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    pub fn count_occurrences(&self, needle: &str) -> usize {
        self.contents().matches(needle).count()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
