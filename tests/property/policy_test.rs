// tests/property/policy_test.rs

//! Properties of the default replication policy: remote names round-trip
//! through `upstream_topic`, and cycle detection terminates with the right
//! verdict for arbitrary prefix chains.

use proptest::prelude::*;
use topicmirror::core::policy::{DefaultReplicationPolicy, ReplicationPolicy, is_cycle};

fn alias() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,9}"
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_remote_names_round_trip(source in alias(), topic in "[a-z][a-z0-9._-]{0,20}") {
        let policy = DefaultReplicationPolicy::default();
        let remote = policy.format_remote_topic(&source, &topic);
        let upstream = policy.upstream_topic(&remote);
        prop_assert_eq!(upstream.as_deref(), Some(topic.as_str()));
        let topic_source = policy.topic_source(&remote);
        prop_assert_eq!(topic_source.as_deref(), Some(source.as_str()));
    }

    #[test]
    fn test_cycle_detection_matches_the_prefix_chain(
        prefixes in proptest::collection::vec(alias(), 0..6),
        topic in "[a-z][a-z0-9]{0,10}",
        target in alias()
    ) {
        let policy = DefaultReplicationPolicy::default();
        // Build the name the way repeated mirroring would: innermost alias
        // applied first.
        let mut name = topic.clone();
        for prefix in prefixes.iter().rev() {
            name = policy.format_remote_topic(prefix, &name);
        }
        let expected = prefixes.iter().any(|p| p == &target);
        prop_assert_eq!(is_cycle(&policy, &target, &name), expected);
    }

    #[test]
    fn test_original_topic_reaches_a_fixed_point(
        prefixes in proptest::collection::vec(alias(), 0..6),
        topic in "[a-z][a-z0-9]{0,10}"
    ) {
        let policy = DefaultReplicationPolicy::default();
        let mut name = topic.clone();
        for prefix in prefixes.iter().rev() {
            name = policy.format_remote_topic(prefix, &name);
        }
        prop_assert_eq!(policy.original_topic(&name), topic);
    }
}
