// src/core/errors.rs

//! Defines the primary error type for the connector core.

use crate::core::admin::AdminError;
use thiserror::Error;

/// The main error enum, representing all possible failures within the connector.
/// Using `thiserror` allows for clean error definitions and automatic `From` trait implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Invalid filter pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Admin Error: {0}")]
    Admin(#[from] AdminError),

    #[error("Invalid topic-partition token '{0}'")]
    InvalidTopicPartition(String),
}
