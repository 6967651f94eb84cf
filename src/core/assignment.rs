// src/core/assignment.rs

//! Deterministic distribution of replication units across worker tasks, and
//! the string form task configs are shipped in.

use crate::core::errors::MirrorError;
use crate::core::types::TopicPartition;
use indexmap::IndexMap;

/// Task-config key carrying the topic-partitions assigned to a source task.
pub const TASK_TOPIC_PARTITIONS: &str = "task.assigned.partitions";

/// Task-config key carrying the consumer groups assigned to a checkpoint task.
pub const TASK_CONSUMER_GROUPS: &str = "task.assigned.groups";

/// A serialized per-task configuration, ordered as written.
pub type TaskConfig = IndexMap<String, String>;

/// Distributes `units` round-robin over `min(max_tasks, units.len())`
/// buckets: unit `i` lands in bucket `i % num_tasks`, preserving input order
/// within each bucket. Empty input or zero tasks yield no buckets.
pub fn round_robin<T: Clone>(units: &[T], max_tasks: usize) -> Vec<Vec<T>> {
    if units.is_empty() || max_tasks == 0 {
        return Vec::new();
    }
    let num_tasks = max_tasks.min(units.len());
    let mut buckets: Vec<Vec<T>> = vec![Vec::new(); num_tasks];
    for (i, unit) in units.iter().enumerate() {
        buckets[i % num_tasks].push(unit.clone());
    }
    buckets
}

/// Task configs for the source connector: one entry per task, each carrying
/// its topic-partitions as a CSV of `topic-partition` tokens.
pub fn topic_partition_task_configs(
    partitions: &[TopicPartition],
    max_tasks: usize,
) -> Vec<TaskConfig> {
    round_robin(partitions, max_tasks)
        .into_iter()
        .map(|bucket| {
            let mut config = TaskConfig::new();
            config.insert(
                TASK_TOPIC_PARTITIONS.to_string(),
                encode_topic_partitions(&bucket),
            );
            config
        })
        .collect()
}

/// Task configs for the checkpoint connector: one entry per task, each
/// carrying its consumer groups as a CSV.
pub fn consumer_group_task_configs(groups: &[String], max_tasks: usize) -> Vec<TaskConfig> {
    round_robin(groups, max_tasks)
        .into_iter()
        .map(|bucket| {
            let mut config = TaskConfig::new();
            config.insert(TASK_CONSUMER_GROUPS.to_string(), bucket.join(","));
            config
        })
        .collect()
}

/// Joins topic-partitions into the CSV wire form, preserving order.
pub fn encode_topic_partitions(partitions: &[TopicPartition]) -> String {
    partitions
        .iter()
        .map(TopicPartition::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses the CSV wire form back into topic-partitions. The inverse of
/// [`encode_topic_partitions`] for every non-empty input.
pub fn decode_topic_partitions(encoded: &str) -> Result<Vec<TopicPartition>, MirrorError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    encoded.split(',').map(str::parse).collect()
}
