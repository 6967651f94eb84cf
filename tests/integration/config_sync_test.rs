// tests/integration/config_sync_test.rs

//! Topic configuration sync: provenance filtering, the property exclusion
//! baseline, and propagation to the mirrored names.

use crate::integration::test_helpers::*;
use topicmirror::core::types::{ConfigEntry, ConfigSource, TopicConfig};

fn orders_config() -> TopicConfig {
    TopicConfig::new(vec![
        ConfigEntry::new("retention.ms", "86400000", ConfigSource::DynamicTopicConfig),
        ConfigEntry::new("min.insync.replicas", "2", ConfigSource::DynamicTopicConfig),
        ConfigEntry::new("exclude_param.param1", "x", ConfigSource::DynamicTopicConfig),
        ConfigEntry::new("segment.bytes", "1048576", ConfigSource::StaticBrokerConfig),
        ConfigEntry::new("compression.type", "producer", ConfigSource::DefaultConfig),
        ConfigEntry::new("cleanup.policy", "compact", ConfigSource::DynamicTopicConfig),
    ])
}

#[tokio::test]
async fn target_config_keeps_explicit_unexcluded_entries_in_order() {
    let mut config = test_config();
    config.config_properties_exclude = vec!["exclude_param.*".to_string()];
    let connector = source_connector(
        config,
        MockAdmin::new(),
        MockAdmin::new(),
        RecordingContext::new(),
    );

    let projected = connector.target_config(&orders_config());

    let entries: Vec<(&str, &str)> = projected
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    // Broker-sourced entries, the baseline exclusion, and the user exclusion
    // are all gone; what survives keeps its order.
    assert_eq!(
        entries,
        vec![("retention.ms", "86400000"), ("cleanup.policy", "compact")]
    );
}

#[tokio::test]
async fn sync_applies_projected_configs_to_mirrored_names() {
    let source = MockAdmin::new();
    let target = MockAdmin::new();
    let context = RecordingContext::new();
    source.add_topic("orders", 1);
    source.set_topic_config("orders", orders_config());
    let mut config = test_config();
    config.config_properties_exclude = vec!["exclude_param.*".to_string()];
    let connector = source_connector(config, source, target.clone(), context);

    // Nothing known yet: the source admin is not even described.
    connector.sync_topic_configs().await.unwrap();
    assert!(target.altered_configs.lock().is_empty());

    connector.refresh_topic_partitions().await.unwrap();
    connector.sync_topic_configs().await.unwrap();

    let altered = target.altered_configs.lock().clone();
    assert_eq!(altered.len(), 1);
    let orders = altered[0].get("us-west.orders").expect("mirrored name");
    assert_eq!(orders.get("retention.ms").map(String::as_str), Some("86400000"));
    assert_eq!(orders.get("cleanup.policy").map(String::as_str), Some("compact"));
    assert!(!orders.contains_key("min.insync.replicas"));
    assert!(!orders.contains_key("exclude_param.param1"));
    assert!(!orders.contains_key("segment.bytes"));
}

#[tokio::test]
async fn new_topics_are_created_with_projected_configs() {
    let source = MockAdmin::new();
    let target = MockAdmin::materializing();
    let context = RecordingContext::new();
    source.add_topic("orders", 2);
    source.set_topic_config("orders", orders_config());
    let connector = source_connector(test_config(), source, target.clone(), context);

    connector.refresh_topic_partitions().await.unwrap();

    let created = target.created_topics.lock().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(
        created[0].configs.get("retention.ms").map(String::as_str),
        Some("86400000")
    );
    assert!(!created[0].configs.contains_key("min.insync.replicas"));
    assert!(!created[0].configs.contains_key("compression.type"));
}
