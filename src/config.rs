// src/config.rs

//! Manages connector configuration: loading, defaults, and validation.

use crate::core::errors::MirrorError;
use crate::core::filters::{
    self, ConfigPropertyFilter, GroupFilter, TopicFilter,
};
use crate::core::policy::{
    DEFAULT_SEPARATOR, DefaultReplicationPolicy, IdentityReplicationPolicy,
    SharedReplicationPolicy,
};
use crate::core::types::SourceAndTarget;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

/// Which replication policy names mirrored topics.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReplicationPolicyKind {
    /// Prefix the source alias: `us-west.orders`.
    #[default]
    Default,
    /// Mirror under the original name. Heartbeats still accumulate prefixes.
    Identity,
}

/// Configuration shared by the source and checkpoint connectors of one
/// replication flow.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MirrorConfig {
    pub source_cluster_alias: String,
    pub target_cluster_alias: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub replication_policy: ReplicationPolicyKind,

    #[serde(default = "default_separator")]
    pub replication_policy_separator: String,

    /// Replication factor for topics created on the target. `-1` lets the
    /// target broker apply its own default.
    #[serde(default = "default_replication_factor")]
    pub replication_factor: i16,

    /// Wall-clock limit applied to each admin RPC job.
    #[serde(with = "humantime_serde", default = "default_admin_timeout")]
    pub admin_timeout: Duration,

    #[serde(with = "humantime_serde", default = "default_refresh_interval")]
    pub refresh_topics_interval: Duration,

    #[serde(with = "humantime_serde", default = "default_refresh_interval")]
    pub refresh_groups_interval: Duration,

    #[serde(default = "default_enabled")]
    pub sync_topic_acls_enabled: bool,

    #[serde(with = "humantime_serde", default = "default_refresh_interval")]
    pub sync_topic_acls_interval: Duration,

    #[serde(with = "humantime_serde", default = "default_refresh_interval")]
    pub sync_topic_configs_interval: Duration,

    /// How often checkpoint tasks emit, in seconds. Negative disables
    /// checkpointing and empties the checkpoint connector's task configs.
    #[serde(default = "default_emit_checkpoints_interval_secs")]
    pub emit_checkpoints_interval_secs: i64,

    /// Topic include patterns, matched as anchored regular expressions.
    #[serde(default = "default_topics_include")]
    pub topics: Vec<String>,

    #[serde(default = "default_topics_exclude")]
    pub topics_exclude: Vec<String>,

    /// Consumer-group include patterns.
    #[serde(default = "default_groups_include")]
    pub groups: Vec<String>,

    #[serde(default = "default_groups_exclude")]
    pub groups_exclude: Vec<String>,

    /// Extra configuration properties to withhold from the target, on top of
    /// the built-in baseline.
    #[serde(default)]
    pub config_properties_exclude: Vec<String>,
}

fn default_enabled() -> bool {
    true
}
fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}
fn default_replication_factor() -> i16 {
    -1
}
fn default_admin_timeout() -> Duration {
    Duration::from_secs(60)
}
fn default_refresh_interval() -> Duration {
    Duration::from_secs(600)
}
fn default_emit_checkpoints_interval_secs() -> i64 {
    60
}
fn default_topics_include() -> Vec<String> {
    to_owned_patterns(filters::DEFAULT_TOPICS_INCLUDE)
}
fn default_topics_exclude() -> Vec<String> {
    to_owned_patterns(filters::DEFAULT_TOPICS_EXCLUDE)
}
fn default_groups_include() -> Vec<String> {
    to_owned_patterns(filters::DEFAULT_GROUPS_INCLUDE)
}
fn default_groups_exclude() -> Vec<String> {
    to_owned_patterns(filters::DEFAULT_GROUPS_EXCLUDE)
}

fn to_owned_patterns(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

impl MirrorConfig {
    /// A configuration for the given flow with every other field at its
    /// default.
    pub fn new(source_cluster_alias: impl Into<String>, target_cluster_alias: impl Into<String>) -> Self {
        Self {
            source_cluster_alias: source_cluster_alias.into(),
            target_cluster_alias: target_cluster_alias.into(),
            enabled: default_enabled(),
            replication_policy: ReplicationPolicyKind::default(),
            replication_policy_separator: default_separator(),
            replication_factor: default_replication_factor(),
            admin_timeout: default_admin_timeout(),
            refresh_topics_interval: default_refresh_interval(),
            refresh_groups_interval: default_refresh_interval(),
            sync_topic_acls_enabled: default_enabled(),
            sync_topic_acls_interval: default_refresh_interval(),
            sync_topic_configs_interval: default_refresh_interval(),
            emit_checkpoints_interval_secs: default_emit_checkpoints_interval_secs(),
            topics: default_topics_include(),
            topics_exclude: default_topics_exclude(),
            groups: default_groups_include(),
            groups_exclude: default_groups_exclude(),
            config_properties_exclude: Vec::new(),
        }
    }

    /// Creates a `MirrorConfig` by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config: MirrorConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the connector cannot run with.
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.source_cluster_alias.is_empty() {
            return Err(MirrorError::Config(
                "source_cluster_alias must not be empty".to_string(),
            ));
        }
        if self.target_cluster_alias.is_empty() {
            return Err(MirrorError::Config(
                "target_cluster_alias must not be empty".to_string(),
            ));
        }
        if self.replication_policy_separator.is_empty() {
            return Err(MirrorError::Config(
                "replication_policy_separator must not be empty".to_string(),
            ));
        }
        if self.replication_factor < -1 || self.replication_factor == 0 {
            return Err(MirrorError::Config(format!(
                "replication_factor must be positive or -1, got {}",
                self.replication_factor
            )));
        }
        if self.admin_timeout.is_zero() {
            return Err(MirrorError::Config(
                "admin_timeout must not be zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn source_and_target(&self) -> SourceAndTarget {
        SourceAndTarget::new(&self.source_cluster_alias, &self.target_cluster_alias)
    }

    pub fn replication_policy(&self) -> SharedReplicationPolicy {
        match self.replication_policy {
            ReplicationPolicyKind::Default => Arc::new(DefaultReplicationPolicy::new(
                self.replication_policy_separator.clone(),
            )),
            ReplicationPolicyKind::Identity => Arc::new(IdentityReplicationPolicy),
        }
    }

    pub fn topic_filter(&self) -> Result<TopicFilter, MirrorError> {
        TopicFilter::new(&self.topics, &self.topics_exclude)
    }

    pub fn group_filter(&self) -> Result<GroupFilter, MirrorError> {
        GroupFilter::new(&self.groups, &self.groups_exclude)
    }

    pub fn config_property_filter(&self) -> Result<ConfigPropertyFilter, MirrorError> {
        ConfigPropertyFilter::new(&self.config_properties_exclude)
    }
}
