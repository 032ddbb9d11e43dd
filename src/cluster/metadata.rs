//! Cluster metadata cache (spec §3, §4.6.2): brokers by node id, topics by
//! name, partitions ordered by index, with TTL + explicit-invalidation
//! staleness.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::Broker;

#[derive(Debug, Clone)]
pub struct PartitionMetadata {
    pub leader: i32,
    pub leader_epoch: i32,
    pub replicas: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct TopicMetadata {
    pub id: uuid::Uuid,
    /// Ordered by `partition_index`, so `partitions[i].leader` answers
    /// partition `i`'s leader directly (spec §4.6.2 "sort each topic's
    /// partitions by partition_index").
    pub partitions: Vec<PartitionMetadata>,
}

impl TopicMetadata {
    pub fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterMetadata {
    pub cluster_id: Option<String>,
    pub brokers: HashMap<i32, Broker>,
    pub topics: HashMap<String, TopicMetadata>,
    last_update: Option<Instant>,
}

impl ClusterMetadata {
    pub fn new(cluster_id: Option<String>, brokers: HashMap<i32, Broker>, topics: HashMap<String, TopicMetadata>) -> Self {
        Self { cluster_id, brokers, topics, last_update: Some(Instant::now()) }
    }

    /// Stale iff: no cache yet, TTL expired, or a requested topic is
    /// missing from the cache (spec §3, §4.6.2).
    pub fn is_stale(&self, requested_topics: &[String], max_age: Duration) -> bool {
        let Some(last_update) = self.last_update else { return true };
        if last_update.elapsed() > max_age {
            return true;
        }
        requested_topics.iter().any(|t| !self.topics.contains_key(t))
    }

    pub fn leader_broker(&self, topic: &str, partition: i32) -> Option<&Broker> {
        let topic_meta = self.topics.get(topic)?;
        let partition_meta = topic_meta.partitions.get(partition as usize)?;
        self.brokers.get(&partition_meta.leader)
    }

    pub fn leader_node(&self, topic: &str, partition: i32) -> Option<i32> {
        let topic_meta = self.topics.get(topic)?;
        topic_meta.partitions.get(partition as usize).map(|p| p.leader)
    }

    pub fn partition_count(&self, topic: &str) -> Option<u32> {
        self.topics.get(topic).map(|t| t.partition_count())
    }

    pub fn broker(&self, node_id: i32) -> Option<&Broker> {
        self.brokers.get(&node_id)
    }
}
