//! Producer send pipeline (spec §4.7, C8): partitioning, batching, optional
//! idempotent sequencing, and ack handling.

pub mod idempotence;
pub mod partitioner;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cluster::{is_stale_metadata_code, ClusterBase, ClusterMetadata};
use crate::config::{Acks, Broker, ProducerConfig};
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::messages::{init_producer_id, produce};
use crate::protocol::record_batch::{encode_batch, EncodeOpts, OutgoingRecord};
use crate::protocol::ApiKey;
use idempotence::ProducerState;
use partitioner::{DefaultPartitioner, Partitioner};

/// A message to publish (spec §3 Record). Keys and values are already
/// serialized; headers preserve insertion order and may repeat a key.
#[derive(Debug, Clone)]
pub struct Record {
    pub topic: String,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: Vec<(String, Vec<u8>)>,
    pub partition: Option<i32>,
    pub timestamp: Option<i64>,
}

impl Record {
    pub fn new(topic: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self { topic: topic.into(), key: None, value: value.into(), headers: Vec::new(), partition: None, timestamp: None }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ProducedOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// The result of `Producer::send` (spec §4.7.3 step 5): either the accepted
/// offsets, or — for `acks=0` — the destination nodes whose socket reported
/// backpressure.
#[derive(Debug, Clone)]
pub enum ProduceOutcome {
    Offsets(Vec<ProducedOffset>),
    UnwritableNodes(Vec<i32>),
}

pub struct Producer {
    cluster: Arc<ClusterBase>,
    config: ProducerConfig,
    partitioner: Arc<dyn Partitioner>,
    state: Mutex<ProducerState>,
}

impl Producer {
    pub fn new(cluster: Arc<ClusterBase>, config: ProducerConfig) -> Self {
        Self { cluster, config, partitioner: Arc::new(DefaultPartitioner), state: Mutex::new(ProducerState::default()) }
    }

    pub fn with_partitioner(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    /// Negotiates `{producer_id, producer_epoch}` with the transaction
    /// coordinator path (here, any broker — this client does not implement
    /// transactions, spec Non-goals) on first use, deduplicated so
    /// concurrent callers share one `InitProducerId` (spec §4.7.1).
    pub async fn init_idempotent_producer(&self) -> Result<(i64, i16)> {
        {
            let state = self.state.lock().await;
            if state.initialized {
                return Ok((state.producer_id, state.producer_epoch));
            }
        }

        let request = init_producer_id::InitProducerIdRequest {
            transactional_id: None,
            transaction_timeout_ms: self.config.client.timeout.as_millis() as i32,
            producer_id: -1,
            producer_epoch: -1,
        };
        let mut body = BytesMut::new();
        request.encode(&mut body);

        let broker = self.cluster.pool.get_first_available(&self.config.client.bootstrap_brokers).await?;
        let mut response_bytes = self.cluster.request(broker.broker(), ApiKey::InitProducerId, body).await?;
        let response = init_producer_id::InitProducerIdResponse::decode(&mut response_bytes)?;
        if response.error_code != 0 {
            return Err(Error::Protocol(ProtocolError::from_code(ApiKey::InitProducerId.into(), response.error_code)));
        }

        let mut state = self.state.lock().await;
        state.producer_id = response.producer_id;
        state.producer_epoch = response.producer_epoch;
        state.initialized = true;
        Ok((response.producer_id, response.producer_epoch))
    }

    /// Send pipeline (spec §4.7.3).
    pub async fn send(&self, messages: Vec<Record>) -> Result<ProduceOutcome> {
        if messages.is_empty() {
            return Err(Error::User("send() called with no messages".to_string()));
        }
        if self.config.idempotent {
            self.init_idempotent_producer().await?;
        }

        let mut topics: Vec<String> = messages.iter().map(|m| m.topic.clone()).collect();
        topics.sort();
        topics.dedup();

        let metadata = self.cluster.metadata(Some(&topics), false, self.config.autocreate_topics).await?;
        let by_partition = self.group_by_partition(messages, &metadata).await?;
        let by_broker = self.group_by_broker(by_partition, &metadata)?;

        let sends = by_broker.into_iter().map(|(node_id, groups)| {
            let metadata = metadata.clone();
            async move { self.send_to_broker(node_id, groups, &metadata).await }
        });
        let results = futures::future::join_all(sends).await;

        let mut offsets = Vec::new();
        let mut unwritable_nodes = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(PerBrokerOutcome::Offsets(mut o)) => offsets.append(&mut o),
                Ok(PerBrokerOutcome::Unwritable(node_id)) => unwritable_nodes.push(node_id),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            return if errors.len() == 1 {
                Err(errors.pop().unwrap())
            } else {
                Err(Error::multiple("produce failed against one or more brokers", errors))
            };
        }

        if self.config.acks == Acks::None {
            Ok(ProduceOutcome::UnwritableNodes(unwritable_nodes))
        } else {
            Ok(ProduceOutcome::Offsets(offsets))
        }
    }

    /// Normalizes each message's partition (spec §4.7.2, §4.7.3 step 2),
    /// grouping by `(topic, partition)`.
    async fn group_by_partition(&self, messages: Vec<Record>, metadata: &ClusterMetadata) -> Result<HashMap<(String, i32), Vec<Record>>> {
        let mut grouped: HashMap<(String, i32), Vec<Record>> = HashMap::new();
        for msg in messages {
            let count = metadata
                .partition_count(&msg.topic)
                .ok_or_else(|| Error::User(format!("unknown topic {}", msg.topic)))?;
            if count == 0 {
                return Err(Error::User(format!("topic {} has no partitions", msg.topic)));
            }

            let raw_partition = if let Some(p) = msg.partition {
                p
            } else if let Some(key) = msg.key.as_deref() {
                self.partitioner.partition(&msg.topic, Some(key), &msg.value, count) as i32
            } else {
                let mut state = self.state.lock().await;
                (state.next_round_robin(&msg.topic) % count) as i32
            };

            // Mirrors broker behavior even for an out-of-range supplied
            // partition (spec §4.7.3 step 2).
            let partition = raw_partition.rem_euclid(count as i32);
            grouped.entry((msg.topic.clone(), partition)).or_default().push(msg);
        }
        Ok(grouped)
    }

    fn group_by_broker(
        &self,
        by_partition: HashMap<(String, i32), Vec<Record>>,
        metadata: &ClusterMetadata,
    ) -> Result<HashMap<i32, Vec<((String, i32), Vec<Record>)>>> {
        let mut by_broker: HashMap<i32, Vec<((String, i32), Vec<Record>)>> = HashMap::new();
        for (key, msgs) in by_partition {
            let leader = metadata
                .leader_node(&key.0, key.1)
                .ok_or_else(|| Error::Protocol(ProtocolError::from_code(ApiKey::Produce.into(), 6)))?;
            by_broker.entry(leader).or_default().push((key, msgs));
        }
        Ok(by_broker)
    }

    async fn send_to_broker(&self, node_id: i32, groups: Vec<((String, i32), Vec<Record>)>, metadata: &ClusterMetadata) -> Result<PerBrokerOutcome> {
        let broker = metadata.broker(node_id).cloned().ok_or_else(|| Error::network(format!("no broker known for node {node_id}")))?;

        match self.send_batches(node_id, &broker, &groups).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.has_stale_metadata() && self.config.repeat_on_stale_metadata => {
                warn!(node_id, "stale metadata on produce, invalidating and retrying once");
                self.cluster.invalidate_metadata().await;
                let fresh = self.cluster.metadata(Some(&[groups[0].0 .0.clone()]), true, self.config.autocreate_topics).await?;
                let fresh_leader = fresh
                    .leader_node(&groups[0].0 .0, groups[0].0 .1)
                    .ok_or_else(|| Error::Protocol(ProtocolError::from_code(ApiKey::Produce.into(), 6)))?;
                let fresh_broker = fresh.broker(fresh_leader).cloned().ok_or_else(|| Error::network("no broker for refreshed leader".to_string()))?;
                self.send_batches(fresh_leader, &fresh_broker, &groups).await
            }
            Err(e) => Err(e),
        }
    }

    async fn send_batches(&self, node_id: i32, broker: &Broker, groups: &[((String, i32), Vec<Record>)]) -> Result<PerBrokerOutcome> {
        let mut reserved_sequences: HashMap<(String, i32), u32> = HashMap::new();
        let (producer_id, producer_epoch) = if self.config.idempotent {
            let mut state = self.state.lock().await;
            for (key, msgs) in groups {
                reserved_sequences.insert(key.clone(), state.peek_first_sequence(&key.0, key.1));
                let _ = msgs;
            }
            (state.producer_id, state.producer_epoch)
        } else {
            (-1, -1)
        };

        let mut topic_data: HashMap<String, Vec<produce::ProducePartitionData>> = HashMap::new();
        for ((topic, partition), msgs) in groups {
            let outgoing: Vec<OutgoingRecord> = msgs
                .iter()
                .map(|m| OutgoingRecord { key: m.key.clone(), value: m.value.clone(), headers: m.headers.clone(), timestamp: m.timestamp })
                .collect();

            let first_sequence = reserved_sequences.get(&(topic.clone(), *partition)).copied().unwrap_or(0) as i32;
            let opts = EncodeOpts {
                compression: self.config.compression,
                producer_id,
                producer_epoch,
                first_sequence: if self.config.idempotent { first_sequence } else { -1 },
                base_offset: 0,
                partition_leader_epoch: -1,
            };
            let records = encode_batch(&outgoing, &opts)?;
            topic_data.entry(topic.clone()).or_default().push(produce::ProducePartitionData { index: *partition, records });
        }

        let request = produce::ProduceRequest {
            transactional_id: None,
            acks: self.config.acks.as_i16(),
            timeout_ms: self.config.client.timeout.as_millis() as i32,
            topic_data: topic_data
                .into_iter()
                .map(|(name, partition_data)| produce::ProduceTopicData { name, partition_data })
                .collect(),
        };
        let mut body = BytesMut::new();
        request.encode(&mut body);

        if self.config.acks == Acks::None {
            // spec §4.7.3 step 5: acks=0 reports destinations whose socket
            // signaled backpressure rather than offsets. This transport
            // always completes the write call itself; a `NetworkError`
            // here is the equivalent "could not hand off to this node"
            // signal, reported as an unwritable node instead of a failure.
            if let Err(e) = self.cluster.request(broker, ApiKey::Produce, body).await {
                if matches!(e, Error::Network { .. }) {
                    return Ok(PerBrokerOutcome::Unwritable(node_id));
                }
                return Err(e);
            }
            return Ok(PerBrokerOutcome::Offsets(Vec::new()));
        }

        let mut response_bytes = self.cluster.request(broker, ApiKey::Produce, body).await?;
        let response = produce::ProduceResponse::decode(&mut response_bytes)?;

        let mut offsets = Vec::new();
        let mut errors = Vec::new();
        for topic_response in response.responses {
            for partition_response in topic_response.partition_responses {
                if partition_response.error_code != 0 {
                    let mut err = ProtocolError::from_code(ApiKey::Produce.into(), partition_response.error_code);
                    err.has_stale_metadata = err.has_stale_metadata || is_stale_metadata_code(partition_response.error_code);
                    errors.push(err);
                    continue;
                }
                offsets.push(ProducedOffset { topic: topic_response.name.clone(), partition: partition_response.index, offset: partition_response.base_offset });

                if self.config.idempotent {
                    let key = (topic_response.name.clone(), partition_response.index);
                    if let Some(count) = groups.iter().find(|(k, _)| *k == key).map(|(_, msgs)| msgs.len() as u32) {
                        self.state.lock().await.advance_sequence(&key.0, key.1, count);
                    }
                }
            }
        }

        if !errors.is_empty() {
            if errors.len() == 1 {
                return Err(Error::Protocol(errors.pop().unwrap()));
            }
            return Err(Error::Response(errors));
        }

        debug!(broker = %broker, offsets = offsets.len(), "produce accepted");
        Ok(PerBrokerOutcome::Offsets(offsets))
    }

    pub async fn close(&self) {
        self.cluster.close().await;
    }
}

enum PerBrokerOutcome {
    Offsets(Vec<ProducedOffset>),
    Unwritable(i32),
}
