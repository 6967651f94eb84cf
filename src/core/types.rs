// src/core/types.rs

//! Core value types shared by the discovery, sync, and assignment layers:
//! cluster pairs, topic-partitions, new-topic requests, topic configuration
//! snapshots, and ACL bindings as consumed from the brokers.

use crate::core::errors::MirrorError;
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// A pair of cluster aliases identifying one replication flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceAndTarget {
    pub source: String,
    pub target: String,
}

impl SourceAndTarget {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for SourceAndTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

/// A single partition of a named topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: u32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: u32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

/// The wire form used in task configs is `topic-partition`, with a dash.
impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

impl FromStr for TopicPartition {
    type Err = MirrorError;

    /// Splits on the last dash so topic names containing dashes survive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (topic, partition) = s
            .rsplit_once('-')
            .ok_or_else(|| MirrorError::InvalidTopicPartition(s.to_string()))?;
        if topic.is_empty() {
            return Err(MirrorError::InvalidTopicPartition(s.to_string()));
        }
        let partition: u32 = partition
            .parse()
            .map_err(|_| MirrorError::InvalidTopicPartition(s.to_string()))?;
        Ok(Self::new(topic, partition))
    }
}

/// A topic as listed by a broker admin endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescription {
    pub name: String,
    pub partitions: u32,
}

impl TopicDescription {
    pub fn new(name: impl Into<String>, partitions: u32) -> Self {
        Self {
            name: name.into(),
            partitions,
        }
    }
}

/// A request to create a topic on the target cluster.
///
/// A `replication_factor` of `-1` asks the broker to apply its own default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    pub name: String,
    pub partitions: u32,
    pub replication_factor: i16,
    pub configs: IndexMap<String, String>,
}

impl NewTopic {
    pub fn new(name: impl Into<String>, partitions: u32, replication_factor: i16) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication_factor,
            configs: IndexMap::new(),
        }
    }

    pub fn with_config(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.configs.insert(name.into(), value.into());
        self
    }
}

/// Provenance of a topic configuration entry as reported by the broker.
/// Only `DynamicTopicConfig` entries were explicitly set on the topic itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigSource {
    DefaultConfig,
    StaticBrokerConfig,
    DynamicBrokerConfig,
    DynamicDefaultBrokerConfig,
    DynamicTopicConfig,
    Unknown,
}

/// One `(name, value, source)` configuration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
    pub source: ConfigSource,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>, source: ConfigSource) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            source,
        }
    }

    /// Whether this entry was set on the topic itself rather than inherited
    /// from a broker default.
    pub fn is_explicitly_set(&self) -> bool {
        self.source == ConfigSource::DynamicTopicConfig
    }
}

/// An ordered topic configuration snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicConfig {
    pub entries: Vec<ConfigEntry>,
}

impl TopicConfig {
    pub fn new(entries: Vec<ConfigEntry>) -> Self {
        Self { entries }
    }
}

/// The kind of resource an ACL binding is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ResourceType {
    Topic,
    Group,
    Cluster,
    TransactionalId,
}

/// How the resource name of an ACL binding is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum PatternType {
    Literal,
    Prefixed,
}

/// The operation an ACL binding grants or denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum AclOperation {
    All,
    Read,
    Write,
    Create,
    Delete,
    Alter,
    Describe,
    DescribeConfigs,
    AlterConfigs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum AclPermission {
    Allow,
    Deny,
}

/// A named resource pattern an ACL entry applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePattern {
    pub resource_type: ResourceType,
    pub name: String,
    pub pattern_type: PatternType,
}

impl ResourcePattern {
    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            resource_type: ResourceType::Topic,
            name: name.into(),
            pattern_type: PatternType::Literal,
        }
    }
}

/// The principal/host/operation/permission half of an ACL binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessControlEntry {
    pub principal: String,
    pub host: String,
    pub operation: AclOperation,
    pub permission: AclPermission,
}

/// An ACL binding as described by, or created on, a broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AclBinding {
    pub pattern: ResourcePattern,
    pub entry: AccessControlEntry,
}

impl AclBinding {
    pub fn new(pattern: ResourcePattern, entry: AccessControlEntry) -> Self {
        Self { pattern, entry }
    }
}

/// The filter handed to `describe_acls`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclBindingFilter {
    pub resource_type: ResourceType,
    pub pattern_type: PatternType,
    /// `None` matches any permission.
    pub permission: Option<AclPermission>,
}

impl AclBindingFilter {
    /// Any literal topic resource, `ALLOW` entries only.
    pub const fn any_topic_literal_allow() -> Self {
        Self {
            resource_type: ResourceType::Topic,
            pattern_type: PatternType::Literal,
            permission: Some(AclPermission::Allow),
        }
    }
}
