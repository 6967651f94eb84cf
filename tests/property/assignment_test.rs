// tests/property/assignment_test.rs

//! Properties of the round-robin task assignment: every unit is placed
//! exactly once, buckets stay balanced, and the wire form round-trips.

use proptest::prelude::*;
use topicmirror::core::assignment::{
    decode_topic_partitions, encode_topic_partitions, round_robin,
};
use topicmirror::core::types::TopicPartition;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_round_robin_places_every_unit_exactly_once(
        units in proptest::collection::vec("[a-z]{1,8}", 0..50),
        max_tasks in 0usize..20
    ) {
        let buckets = round_robin(&units, max_tasks);

        if units.is_empty() || max_tasks == 0 {
            prop_assert!(buckets.is_empty());
        } else {
            let num_tasks = max_tasks.min(units.len());
            prop_assert_eq!(buckets.len(), num_tasks);
            // No bucket is ever empty.
            prop_assert!(buckets.iter().all(|b| !b.is_empty()));
            // Bucket sizes differ by at most one.
            let min = buckets.iter().map(Vec::len).min().unwrap();
            let max = buckets.iter().map(Vec::len).max().unwrap();
            prop_assert!(max - min <= 1);
            // Unit i sits at buckets[i % n][i / n]: the assignment is a
            // permutation-free redistribution of the input.
            for (i, unit) in units.iter().enumerate() {
                prop_assert_eq!(&buckets[i % num_tasks][i / num_tasks], unit);
            }
        }
    }

    #[test]
    fn test_wire_form_round_trips(
        tokens in proptest::collection::vec(("[a-z][a-z0-9._-]{0,12}[a-z0-9]", 0u32..1000), 1..30)
    ) {
        let partitions: Vec<TopicPartition> = tokens
            .iter()
            .map(|(topic, partition)| TopicPartition::new(topic.clone(), *partition))
            .collect();
        let encoded = encode_topic_partitions(&partitions);
        let decoded = decode_topic_partitions(&encoded).unwrap();
        prop_assert_eq!(decoded, partitions);
    }
}
