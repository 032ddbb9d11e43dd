//! End-to-end scenario 3 (group rebalance): two consumers subscribed to the
//! same topic get a full, non-overlapping split of its partitions, and
//! losing a member reassigns its partitions to whoever remains rather than
//! leaving them orphaned.

use std::collections::HashMap;

use kafka_native::cluster::{ClusterMetadata, PartitionMetadata, TopicMetadata};
use kafka_native::config::Broker;
use kafka_native::consumer::assignor::{Assigner, RoundRobinAssigner};

fn metadata_with(topics: &[(&str, u32)]) -> ClusterMetadata {
    let mut topic_map = HashMap::new();
    for (name, count) in topics {
        let partitions = (0..*count).map(|i| PartitionMetadata { leader: i as i32, leader_epoch: 0, replicas: vec![] }).collect();
        topic_map.insert(name.to_string(), TopicMetadata { id: uuid::Uuid::nil(), partitions });
    }
    let mut brokers = HashMap::new();
    brokers.insert(0, Broker::new("h", 9092));
    ClusterMetadata::new(None, brokers, topic_map)
}

fn assigned_partitions(plan: &kafka_native::consumer::assignor::AssignmentPlan, member: &str, topic: &str) -> Vec<i32> {
    plan.get(member).and_then(|t| t.get(topic)).cloned().unwrap_or_default()
}

#[test]
fn two_members_on_one_topic_cover_every_partition_with_no_overlap() {
    let metadata = metadata_with(&[("orders", 6)]);
    let mut members = HashMap::new();
    members.insert("m1".to_string(), vec!["orders".to_string()]);
    members.insert("m2".to_string(), vec!["orders".to_string()]);

    let plan = RoundRobinAssigner.assign("m1", &members, &metadata);

    let m1 = assigned_partitions(&plan, "m1", "orders");
    let m2 = assigned_partitions(&plan, "m2", "orders");

    let mut union: Vec<i32> = m1.iter().chain(m2.iter()).copied().collect();
    union.sort();
    assert_eq!(union, vec![0, 1, 2, 3, 4, 5], "union must be the full partition set");

    let intersection: Vec<&i32> = m1.iter().filter(|p| m2.contains(p)).collect();
    assert!(intersection.is_empty(), "no partition may be double-assigned");
}

#[test]
fn losing_a_member_reassigns_its_partitions_to_the_survivor() {
    let metadata = metadata_with(&[("orders", 6)]);
    let mut members = HashMap::new();
    members.insert("m1".to_string(), vec!["orders".to_string()]);
    members.insert("m2".to_string(), vec!["orders".to_string()]);
    let before = RoundRobinAssigner.assign("m1", &members, &metadata);
    assert!(!assigned_partitions(&before, "m2", "orders").is_empty());

    // m2 leaves the group; the leader recomputes with only the survivor.
    members.remove("m2");
    let after = RoundRobinAssigner.assign("m1", &members, &metadata);

    let mut survivor = assigned_partitions(&after, "m1", "orders");
    survivor.sort();
    assert_eq!(survivor, vec![0, 1, 2, 3, 4, 5], "the survivor must pick up every partition after rebalance");
}

#[test]
fn a_member_subscribed_to_only_one_of_two_topics_never_receives_the_other() {
    let metadata = metadata_with(&[("orders", 2), ("payments", 2)]);
    let mut members = HashMap::new();
    members.insert("m1".to_string(), vec!["orders".to_string()]);
    members.insert("m2".to_string(), vec!["orders".to_string(), "payments".to_string()]);

    let plan = RoundRobinAssigner.assign("m1", &members, &metadata);

    assert!(assigned_partitions(&plan, "m1", "payments").is_empty(), "m1 never subscribed to payments");
    let mut payments_for_m2 = assigned_partitions(&plan, "m2", "payments");
    payments_for_m2.sort();
    assert_eq!(payments_for_m2, vec![0, 1], "m2 is the only subscriber, so it gets every payments partition");

    let mut orders_union: Vec<i32> = assigned_partitions(&plan, "m1", "orders").into_iter().chain(assigned_partitions(&plan, "m2", "orders")).collect();
    orders_union.sort();
    assert_eq!(orders_union, vec![0, 1], "orders is still split between both subscribers");
}

#[test]
fn a_lone_member_gets_every_partition_of_every_topic_it_subscribed_to() {
    let metadata = metadata_with(&[("orders", 3), ("payments", 2)]);
    let mut members = HashMap::new();
    members.insert("solo".to_string(), vec!["orders".to_string(), "payments".to_string()]);

    let plan = RoundRobinAssigner.assign("solo", &members, &metadata);

    let mut orders = assigned_partitions(&plan, "solo", "orders");
    orders.sort();
    assert_eq!(orders, vec![0, 1, 2]);
    let mut payments = assigned_partitions(&plan, "solo", "payments");
    payments.sort();
    assert_eq!(payments, vec![0, 1]);
}
