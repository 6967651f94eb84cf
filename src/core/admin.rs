// src/core/admin.rs

//! The capability trait through which the connector core talks to a broker's
//! admin endpoint, and the error surface it observes.
//!
//! The connector never opens sockets itself. The host runtime hands it two
//! `BrokerAdmin` handles, one per cluster, and the core composes discovery
//! and mutation calls out of the operations below. Errors are a closed sum so
//! callers switch on the kind instead of downcasting causes.

use crate::core::types::{
    AclBinding, AclBindingFilter, NewTopic, TopicConfig, TopicDescription, TopicPartition,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use thiserror::Error;

/// Failure kinds surfaced by a broker admin endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    /// A retryable broker-side fault. The next scheduler tick will retry.
    #[error("transient broker error: {0}")]
    Transient(String),

    /// The broker has no ACL authorizer configured. Distinguished so the ACL
    /// sync engine can degrade instead of retrying forever.
    #[error("security features are disabled on the broker; no ACL authorizer is available")]
    SecurityDisabled,

    /// A create call collided with an existing resource. Benign.
    #[error("resource '{0}' already exists")]
    AlreadyExists(String),

    /// A non-retryable fault.
    #[error("fatal broker error: {0}")]
    Fatal(String),
}

pub type AdminResult<T> = Result<T, AdminError>;

/// Admin operations the connector core consumes.
///
/// Every call is awaited to completion within one scheduler job; the
/// scheduler's admin timeout bounds the wall-clock cost of each.
///
/// `create_topics` implementations process every topic in the request and
/// report an existence conflict as `AlreadyExists` only when no harder
/// failure occurred, so an already-present topic never masks the creation of
/// the others.
#[async_trait]
pub trait BrokerAdmin: Send + Sync {
    /// All topics on the cluster, with their current partition counts.
    async fn list_topics(&self) -> AdminResult<Vec<TopicDescription>>;

    /// Raw configuration snapshots for the named topics.
    async fn describe_topic_configs(
        &self,
        topics: &[String],
    ) -> AdminResult<HashMap<String, TopicConfig>>;

    /// ACL bindings matching the filter.
    async fn describe_acls(&self, filter: &AclBindingFilter) -> AdminResult<Vec<AclBinding>>;

    async fn create_topics(&self, topics: &[NewTopic]) -> AdminResult<()>;

    /// Raises each named topic's partition count to the given total.
    async fn create_partitions(&self, counts: &HashMap<String, u32>) -> AdminResult<()>;

    async fn create_acls(&self, bindings: &[AclBinding]) -> AdminResult<()>;

    /// Applies the given configuration entries to each named topic.
    async fn alter_topic_configs(
        &self,
        configs: &HashMap<String, IndexMap<String, String>>,
    ) -> AdminResult<()>;

    async fn list_consumer_groups(&self) -> AdminResult<Vec<String>>;

    /// The topic-partitions the group has committed offsets for.
    async fn list_consumer_group_offsets(&self, group: &str) -> AdminResult<Vec<TopicPartition>>;

    /// Releases any resources held by the handle. Called exactly once, at
    /// connector stop.
    async fn close(&self) -> AdminResult<()> {
        Ok(())
    }
}
