//! Leader-side partition assignment (spec §4.8.3): the single-member
//! shortcut, the default round-robin assigner, and the pluggable hook.

use std::collections::HashMap;

use crate::cluster::ClusterMetadata;

/// `member_id -> {topic -> [partition]}`, the shape encoded into each
/// member's `SyncGroup` assignment (spec §4.8.3 step 5).
pub type AssignmentPlan = HashMap<String, HashMap<String, Vec<i32>>>;

/// Computes partition assignment for the group once this member has been
/// told it is the leader. Given `(self_member_id, members, topics, metadata)`
/// and must return one plan per member (spec §4.8.3 step 4).
pub trait Assigner: Send + Sync {
    fn assign(&self, self_member_id: &str, members: &HashMap<String, Vec<String>>, metadata: &ClusterMetadata) -> AssignmentPlan;
}

/// Single member subscribed: give it every partition of every topic it
/// asked for. Otherwise round-robin over `(topic, partition)` pairs
/// enumerated in topic-iteration order (spec §4.8.3 steps 3-4).
pub struct RoundRobinAssigner;

impl Assigner for RoundRobinAssigner {
    fn assign(&self, self_member_id: &str, members: &HashMap<String, Vec<String>>, metadata: &ClusterMetadata) -> AssignmentPlan {
        let mut plan: AssignmentPlan = members.keys().map(|m| (m.clone(), HashMap::new())).collect();

        if members.len() == 1 {
            let topics = members.get(self_member_id).cloned().unwrap_or_default();
            let mut assignment = HashMap::new();
            for topic in topics {
                let Some(count) = metadata.partition_count(&topic) else { continue };
                assignment.insert(topic, (0..count as i32).collect());
            }
            plan.insert(self_member_id.to_string(), assignment);
            return plan;
        }

        let mut member_ids: Vec<&String> = members.keys().collect();
        member_ids.sort();

        let mut topics: Vec<&String> = members.values().flatten().collect::<std::collections::BTreeSet<_>>().into_iter().collect();
        topics.sort();

        let mut cursor = 0usize;
        for topic in topics {
            let Some(count) = metadata.partition_count(topic) else { continue };
            for partition in 0..count as i32 {
                let subscribers: Vec<&&String> = member_ids.iter().filter(|m| members.get(m.as_str()).map(|t| t.contains(topic)).unwrap_or(false)).collect();
                if subscribers.is_empty() {
                    continue;
                }
                let member = subscribers[cursor % subscribers.len()];
                plan.get_mut(member.as_str()).unwrap().entry(topic.clone()).or_insert_with(Vec::new).push(partition);
                cursor += 1;
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Broker;
    use crate::cluster::{PartitionMetadata, TopicMetadata};
    use std::collections::HashMap as Map;

    fn metadata_with(topic: &str, partitions: u32) -> ClusterMetadata {
        let parts = (0..partitions).map(|i| PartitionMetadata { leader: i as i32, leader_epoch: 0, replicas: vec![] }).collect();
        let mut topics = Map::new();
        topics.insert(topic.to_string(), TopicMetadata { id: uuid::Uuid::nil(), partitions: parts });
        let mut brokers = Map::new();
        brokers.insert(0, Broker::new("h", 9092));
        ClusterMetadata::new(None, brokers, topics)
    }

    #[test]
    fn single_member_gets_every_partition() {
        let metadata = metadata_with("t", 4);
        let mut members = Map::new();
        members.insert("m1".to_string(), vec!["t".to_string()]);
        let plan = RoundRobinAssigner.assign("m1", &members, &metadata);
        assert_eq!(plan["m1"]["t"], vec![0, 1, 2, 3]);
    }

    #[test]
    fn two_members_split_round_robin() {
        let metadata = metadata_with("t", 4);
        let mut members = Map::new();
        members.insert("m1".to_string(), vec!["t".to_string()]);
        members.insert("m2".to_string(), vec!["t".to_string()]);
        let plan = RoundRobinAssigner.assign("m1", &members, &metadata);
        let mut all: Vec<i32> = plan["m1"].get("t").cloned().unwrap_or_default();
        all.extend(plan["m2"].get("t").cloned().unwrap_or_default());
        all.sort();
        assert_eq!(all, vec![0, 1, 2, 3]);
        assert_eq!(plan["m1"]["t"].len(), 2);
        assert_eq!(plan["m2"]["t"].len(), 2);
    }
}
