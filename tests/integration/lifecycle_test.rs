// tests/integration/lifecycle_test.rs

//! Start/stop scenarios: startup jobs run through the scheduler, periodic
//! refreshes fire, and stop drains cleanly.

use crate::integration::test_helpers::*;
use std::time::Duration;
use tokio::time;
use topicmirror::core::types::TopicPartition;

#[tokio::test(start_paused = true)]
async fn start_runs_bootstrap_jobs_and_periodic_refresh() {
    let source = MockAdmin::new();
    let target = MockAdmin::materializing();
    let context = RecordingContext::new();
    source.add_topic("orders", 2);
    let mut config = test_config();
    config.refresh_topics_interval = Duration::from_secs(60);
    let connector = source_connector(config, source.clone(), target.clone(), context.clone());

    connector.start();
    // Let the one-shot jobs and the first repeating tick drain.
    time::sleep(Duration::from_millis(50)).await;

    let created: Vec<String> = target
        .created_topics
        .lock()
        .iter()
        .map(|t| t.name.clone())
        .collect();
    assert!(created.contains(&"mm2-offset-syncs.us-east.internal".to_string()));
    assert!(created.contains(&"us-west.orders".to_string()));
    assert_eq!(
        connector.known_source_topic_partitions(),
        vec![TopicPartition::new("orders", 0), TopicPartition::new("orders", 1)]
    );

    // A new source partition appears; the next periodic refresh picks it up.
    source.topics.lock()[0].partitions = 3;
    time::sleep(Duration::from_secs(61)).await;
    assert_eq!(connector.known_source_topic_partitions().len(), 3);

    connector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn checkpoint_start_creates_bookkeeping_topic_and_loads_groups() {
    let source = MockAdmin::new();
    let target = MockAdmin::new();
    let context = RecordingContext::new();
    source.add_group("app-1", vec![TopicPartition::new("orders", 0)]);
    let connector = checkpoint_connector(test_config(), source, target.clone(), context.clone());

    connector.start();
    time::sleep(Duration::from_millis(50)).await;

    let created: Vec<String> = target
        .created_topics
        .lock()
        .iter()
        .map(|t| t.name.clone())
        .collect();
    assert_eq!(created, vec!["us-west.checkpoints.internal".to_string()]);
    assert_eq!(connector.known_consumer_groups(), vec!["app-1".to_string()]);
    // Initial discovery never requests a reconfiguration.
    assert_eq!(context.reconfiguration_count(), 0);

    connector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn disabled_connector_never_touches_the_brokers() {
    let source = MockAdmin::new();
    let target = MockAdmin::new();
    let context = RecordingContext::new();
    source.add_topic("orders", 1);
    let mut config = test_config();
    config.enabled = false;
    let connector = source_connector(config, source.clone(), target.clone(), context);

    connector.start();
    time::sleep(Duration::from_millis(50)).await;

    assert_eq!(source.interaction_count(), 0);
    assert_eq!(target.interaction_count(), 0);
    assert!(connector.task_configs(4).is_empty());

    connector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_refuses_further_refreshes() {
    let source = MockAdmin::new();
    let target = MockAdmin::materializing();
    let context = RecordingContext::new();
    source.add_topic("orders", 1);
    let mut config = test_config();
    config.refresh_topics_interval = Duration::from_secs(60);
    let connector = source_connector(config, source.clone(), target, context);

    connector.start();
    time::sleep(Duration::from_millis(50)).await;
    connector.stop().await;

    let interactions_after_stop = source.interaction_count();
    time::sleep(Duration::from_secs(300)).await;
    assert_eq!(source.interaction_count(), interactions_after_stop);
}
