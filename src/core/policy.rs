// src/core/policy.rs

//! Topic-name replication policies and cycle detection.
//!
//! A policy decides what a mirrored topic is called on the target cluster and
//! how to recognize and strip the alias prefixes that earlier hops added.
//! Cycle detection walks the prefix chain of a candidate name and refuses any
//! topic that would be replicated back into the cluster it came from.

use std::sync::Arc;

/// Name of the connector's liveness topic. Heartbeats accumulate one alias
/// prefix per hop under every policy, so loops stay structurally visible.
pub const HEARTBEATS_TOPIC: &str = "heartbeats";

/// Separator used by the default policy between the alias and the topic.
pub const DEFAULT_SEPARATOR: &str = ".";

/// Maps source topic names to their mirrored names on the target and back.
///
/// Implementations must be pure: the same inputs always produce the same
/// outputs, and no method may fault on arbitrary topic names.
pub trait ReplicationPolicy: Send + Sync {
    /// The name the mirrored topic gets on the target cluster.
    fn format_remote_topic(&self, source_alias: &str, topic: &str) -> String;

    /// The alias prefix the last `format_remote_topic` hop added, or `None`
    /// when the name carries no recognizable prefix.
    fn topic_source(&self, topic: &str) -> Option<String>;

    /// The topic name as it was on the cluster the last hop copied it from,
    /// or `None` when the name carries no recognizable prefix.
    fn upstream_topic(&self, topic: &str) -> Option<String>;

    /// Strips upstream prefixes until a fixed point is reached. Terminates
    /// for arbitrary policies, including ones whose `upstream_topic` echoes
    /// its input.
    fn original_topic(&self, topic: &str) -> String {
        let mut current = topic.to_string();
        loop {
            match self.upstream_topic(&current) {
                Some(upstream) if !upstream.is_empty() && upstream != current => {
                    current = upstream;
                }
                _ => return current,
            }
        }
    }

    fn heartbeats_topic(&self) -> String {
        HEARTBEATS_TOPIC.to_string()
    }

    /// Name of the bookkeeping topic that carries offset translation data.
    fn offset_syncs_topic(&self, cluster_alias: &str) -> String {
        format!("mm2-offset-syncs.{cluster_alias}.internal")
    }

    /// Name of the bookkeeping topic that carries consumer-group checkpoints.
    fn checkpoints_topic(&self, cluster_alias: &str) -> String {
        format!("{cluster_alias}.checkpoints.internal")
    }

    /// Whether the topic is a heartbeats topic, possibly several hops
    /// downstream of the cluster that emitted it.
    fn is_heartbeats_topic(&self, topic: &str) -> bool {
        self.original_topic(topic) == self.heartbeats_topic()
    }

    fn is_checkpoints_topic(&self, topic: &str) -> bool {
        topic.ends_with(".checkpoints.internal")
    }

    /// Connector bookkeeping topics and broker-internal names.
    fn is_internal_topic(&self, topic: &str) -> bool {
        topic.ends_with(".internal") || topic.starts_with("__") || self.is_heartbeats_topic(topic)
    }
}

/// The default policy: prefix the source alias with a single separator.
///
/// `upstream_topic(format_remote_topic(s, t)) == t` for every `s` and `t`
/// that do not themselves contain the separator.
#[derive(Debug, Clone)]
pub struct DefaultReplicationPolicy {
    separator: String,
}

impl DefaultReplicationPolicy {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl Default for DefaultReplicationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl ReplicationPolicy for DefaultReplicationPolicy {
    fn format_remote_topic(&self, source_alias: &str, topic: &str) -> String {
        format!("{source_alias}{}{topic}", self.separator)
    }

    fn topic_source(&self, topic: &str) -> Option<String> {
        topic
            .split_once(&self.separator)
            .map(|(source, _)| source.to_string())
    }

    fn upstream_topic(&self, topic: &str) -> Option<String> {
        topic
            .split_once(&self.separator)
            .map(|(_, upstream)| upstream.to_string())
    }

    fn offset_syncs_topic(&self, cluster_alias: &str) -> String {
        let sep = &self.separator;
        format!("mm2-offset-syncs{sep}{cluster_alias}{sep}internal")
    }

    fn checkpoints_topic(&self, cluster_alias: &str) -> String {
        let sep = &self.separator;
        format!("{cluster_alias}{sep}checkpoints{sep}internal")
    }

    fn is_checkpoints_topic(&self, topic: &str) -> bool {
        let sep = &self.separator;
        topic.ends_with(&format!("{sep}checkpoints{sep}internal"))
    }

    fn is_internal_topic(&self, topic: &str) -> bool {
        topic.ends_with(&format!("{}internal", self.separator))
            || topic.starts_with("__")
            || self.is_heartbeats_topic(topic)
    }
}

/// A policy that mirrors topics under their original names.
///
/// Ordinary names carry no alias prefix, so their provenance is not
/// recoverable and cycles through them are not structurally detectable.
/// Heartbeats are the exception: they keep accumulating prefixes exactly as
/// under the default policy, so heartbeat loops stay forbidden.
#[derive(Debug, Clone, Default)]
pub struct IdentityReplicationPolicy;

impl IdentityReplicationPolicy {
    fn looks_like_heartbeats(topic: &str) -> bool {
        topic.ends_with(HEARTBEATS_TOPIC)
    }
}

impl ReplicationPolicy for IdentityReplicationPolicy {
    fn format_remote_topic(&self, source_alias: &str, topic: &str) -> String {
        if Self::looks_like_heartbeats(topic) {
            format!("{source_alias}{DEFAULT_SEPARATOR}{topic}")
        } else {
            topic.to_string()
        }
    }

    fn topic_source(&self, topic: &str) -> Option<String> {
        if Self::looks_like_heartbeats(topic) {
            topic
                .split_once(DEFAULT_SEPARATOR)
                .map(|(source, _)| source.to_string())
        } else {
            None
        }
    }

    fn upstream_topic(&self, topic: &str) -> Option<String> {
        if Self::looks_like_heartbeats(topic) {
            topic
                .split_once(DEFAULT_SEPARATOR)
                .map(|(_, upstream)| upstream.to_string())
        } else {
            None
        }
    }
}

/// Whether replicating `topic` onto the cluster aliased `target_alias` would
/// close a loop: some prefix in the name's upstream chain already names the
/// target cluster.
///
/// Null-safe by construction: a policy that cannot recognize a prefix at any
/// step terminates the walk with `false`. A policy whose `upstream_topic`
/// echoes its input is cut off after one step rather than looping.
pub fn is_cycle(policy: &dyn ReplicationPolicy, target_alias: &str, topic: &str) -> bool {
    let mut current = topic.to_string();
    loop {
        let Some(source) = policy.topic_source(&current) else {
            return false;
        };
        if source == target_alias {
            return true;
        }
        match policy.upstream_topic(&current) {
            Some(upstream) if !upstream.is_empty() && upstream != current => current = upstream,
            _ => return false,
        }
    }
}

/// Convenience alias used at the connector seams.
pub type SharedReplicationPolicy = Arc<dyn ReplicationPolicy>;
