// src/core/filters.rs

//! Predicates deciding which topics, consumer groups, and topic configuration
//! properties are eligible for replication.
//!
//! Every filter is built from include/exclude lists of anchored regular
//! expressions. Exclusion wins over inclusion, and an empty include list
//! matches nothing.

use crate::core::errors::MirrorError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Topic include patterns applied when the operator supplies none.
pub const DEFAULT_TOPICS_INCLUDE: &[&str] = &[".*"];

/// Topic exclude patterns applied when the operator supplies none. Connector
/// bookkeeping topics and broker-internal names are never replicated by
/// the name filter alone; heartbeats bypass it at a higher layer.
pub const DEFAULT_TOPICS_EXCLUDE: &[&str] = &[r".*[\-\.]internal", r".*\.replica", "__.*"];

/// Group include patterns applied when the operator supplies none.
pub const DEFAULT_GROUPS_INCLUDE: &[&str] = &[".*"];

/// Group exclude patterns applied when the operator supplies none.
pub const DEFAULT_GROUPS_EXCLUDE: &[&str] = &["console-consumer-.*", "connect-.*", "__.*"];

/// Configuration properties that never propagate to the target, regardless of
/// operator-supplied excludes. These are throttles and per-cluster tuning the
/// target must derive from its own brokers.
pub const DEFAULT_CONFIG_PROPERTIES_EXCLUDE: &[&str] = &[
    "follower.replication.throttled.replicas",
    "leader.replication.throttled.replicas",
    "message.timestamp.difference.max.ms",
    "message.timestamp.type",
    "unclean.leader.election.enable",
    "min.insync.replicas",
];

static BASELINE_CONFIG_EXCLUDES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_anchored(DEFAULT_CONFIG_PROPERTIES_EXCLUDE)
        .unwrap_or_else(|e| unreachable!("baseline excludes are valid patterns: {e}"))
});

/// Compiles each pattern as a full-string match: `pat` becomes `^(?:pat)$`.
fn compile_anchored<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, MirrorError> {
    patterns
        .iter()
        .map(|p| {
            let pattern = p.as_ref();
            Regex::new(&format!("^(?:{pattern})$")).map_err(|e| MirrorError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn any_match(regexes: &[Regex], name: &str) -> bool {
    regexes.iter().any(|r| r.is_match(name))
}

/// An include/exclude name filter. Exclude wins.
#[derive(Debug)]
struct NameFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl NameFilter {
    fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, MirrorError> {
        Ok(Self {
            include: compile_anchored(include)?,
            exclude: compile_anchored(exclude)?,
        })
    }

    fn matches(&self, name: &str) -> bool {
        any_match(&self.include, name) && !any_match(&self.exclude, name)
    }
}

/// Decides which source topics are candidates for replication.
#[derive(Debug)]
pub struct TopicFilter {
    filter: NameFilter,
}

impl TopicFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, MirrorError> {
        Ok(Self {
            filter: NameFilter::new(include, exclude)?,
        })
    }

    pub fn should_replicate_topic(&self, topic: &str) -> bool {
        self.filter.matches(topic)
    }
}

impl Default for TopicFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TOPICS_INCLUDE, DEFAULT_TOPICS_EXCLUDE)
            .unwrap_or_else(|e| unreachable!("default topic patterns are valid: {e}"))
    }
}

/// Decides which consumer groups the checkpoint connector tracks.
#[derive(Debug)]
pub struct GroupFilter {
    filter: NameFilter,
}

impl GroupFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, MirrorError> {
        Ok(Self {
            filter: NameFilter::new(include, exclude)?,
        })
    }

    pub fn should_replicate_group(&self, group: &str) -> bool {
        self.filter.matches(group)
    }
}

impl Default for GroupFilter {
    fn default() -> Self {
        Self::new(DEFAULT_GROUPS_INCLUDE, DEFAULT_GROUPS_EXCLUDE)
            .unwrap_or_else(|e| unreachable!("default group patterns are valid: {e}"))
    }
}

/// Decides which topic configuration properties propagate to the target.
///
/// Operator-supplied excludes extend the baseline; they never replace it.
#[derive(Debug, Default)]
pub struct ConfigPropertyFilter {
    exclude: Vec<Regex>,
}

impl ConfigPropertyFilter {
    pub fn new<S: AsRef<str>>(exclude: &[S]) -> Result<Self, MirrorError> {
        Ok(Self {
            exclude: compile_anchored(exclude)?,
        })
    }

    pub fn should_replicate_config_property(&self, property: &str) -> bool {
        !any_match(&BASELINE_CONFIG_EXCLUDES, property) && !any_match(&self.exclude, property)
    }
}
