//! Per-stream fetch scheduler (spec §4.8.4): one `Fetch` per leader per
//! cycle, offset resolution on stream construction, autocommit bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::cluster::ClusterMetadata;
use crate::config::{ConsumerConfig, FallbackMode, OffsetMode};
use crate::error::{Error, ProtocolError, Result};
use crate::network::ConnectionPool;
use crate::protocol::messages::{fetch, list_offsets, offset_fetch};
use crate::protocol::record_batch::decode_batch;
use crate::protocol::ApiKey;

use super::stream::ConsumedMessage;

/// Negotiates and issues one request against `pool` directly, bypassing the
/// shared control-plane pool (spec §5 "fetch traffic uses a separate
/// connection pool from control traffic").
pub(super) async fn request_on(
    pool: &ConnectionPool,
    api_versions: &crate::protocol::messages::ApiVersionsTable,
    broker: &crate::config::Broker,
    api: ApiKey,
    body: BytesMut,
) -> Result<Bytes> {
    let version = api_versions.negotiate(api)?;
    let flexible = api.is_flexible(version);
    let conn = pool.get(broker).await?;
    conn.send(api.into(), version, &body, flexible).await
}

pub struct Fetcher {
    fetch_pool: Arc<ConnectionPool>,
    config: ConsumerConfig,
}

impl Fetcher {
    pub fn new(fetch_pool: Arc<ConnectionPool>, config: ConsumerConfig) -> Self {
        Self { fetch_pool, config }
    }

    /// Resolves the starting `next_offset` for every assignment according to
    /// the stream's mode (spec §4.8.4 table).
    pub async fn resolve_starting_offsets(
        &self,
        api_versions: &crate::protocol::messages::ApiVersionsTable,
        group_id: &str,
        assignments: &[(String, i32)],
        mode: OffsetMode,
        fallback: FallbackMode,
        manual_offsets: &[(String, i32, i64)],
        metadata: &ClusterMetadata,
    ) -> Result<HashMap<(String, i32), i64>> {
        match mode {
            OffsetMode::Manual => {
                let mut offsets = HashMap::new();
                for (topic, partition, offset) in manual_offsets {
                    offsets.insert((topic.clone(), *partition), *offset);
                }
                for key in assignments {
                    if !offsets.contains_key(key) {
                        return Err(Error::User(format!("manual offset mode requires an offset for {}:{}", key.0, key.1)));
                    }
                }
                Ok(offsets)
            }
            OffsetMode::Latest | OffsetMode::Earliest => {
                let timestamp = if mode == OffsetMode::Latest { list_offsets::LATEST_TIMESTAMP } else { list_offsets::EARLIEST_TIMESTAMP };
                self.list_offsets_for(api_versions, assignments, timestamp, metadata).await
            }
            OffsetMode::Committed => {
                let committed = self.offset_fetch_for(api_versions, group_id, assignments, metadata).await?;
                let mut offsets = HashMap::new();
                let mut needs_fallback = Vec::new();
                for key in assignments {
                    match committed.get(key) {
                        Some(offset) if *offset >= 0 => {
                            offsets.insert(key.clone(), *offset);
                        }
                        _ => needs_fallback.push(key.clone()),
                    }
                }
                if !needs_fallback.is_empty() {
                    match fallback {
                        FallbackMode::Fail => {
                            return Err(Error::User(format!("no committed offset for {} partition(s) and fallbackMode=FAIL", needs_fallback.len())));
                        }
                        FallbackMode::Latest | FallbackMode::Earliest => {
                            let timestamp = if fallback == FallbackMode::Latest { list_offsets::LATEST_TIMESTAMP } else { list_offsets::EARLIEST_TIMESTAMP };
                            let resolved = self.list_offsets_for(api_versions, &needs_fallback, timestamp, metadata).await?;
                            offsets.extend(resolved);
                        }
                    }
                }
                Ok(offsets)
            }
        }
    }

    async fn list_offsets_for(
        &self,
        api_versions: &crate::protocol::messages::ApiVersionsTable,
        assignments: &[(String, i32)],
        timestamp: i64,
        metadata: &ClusterMetadata,
    ) -> Result<HashMap<(String, i32), i64>> {
        let by_leader = self.group_by_leader(assignments, metadata)?;
        let mut offsets = HashMap::new();
        for (node_id, parts) in by_leader {
            let broker = metadata.broker(node_id).cloned().ok_or_else(|| Error::network(format!("no broker for node {node_id}")))?;
            let mut by_topic: HashMap<String, Vec<list_offsets::ListOffsetsRequestPartition>> = HashMap::new();
            for (topic, partition) in &parts {
                by_topic.entry(topic.clone()).or_default().push(list_offsets::ListOffsetsRequestPartition {
                    partition_index: *partition,
                    current_leader_epoch: -1,
                    timestamp,
                });
            }
            let request = list_offsets::ListOffsetsRequest {
                replica_id: -1,
                isolation_level: self.config.isolation_level,
                topics: by_topic.into_iter().map(|(name, partitions)| list_offsets::ListOffsetsRequestTopic { name, partitions }).collect(),
            };
            let mut body = BytesMut::new();
            request.encode(&mut body);
            let mut response_bytes = request_on(&self.fetch_pool, api_versions, &broker, ApiKey::ListOffsets, body).await?;
            let response = list_offsets::ListOffsetsResponse::decode(&mut response_bytes)?;
            for topic in response.topics {
                for partition in topic.partitions {
                    if partition.error_code != 0 {
                        return Err(Error::Protocol(ProtocolError::from_code(ApiKey::ListOffsets.into(), partition.error_code)));
                    }
                    offsets.insert((topic.name.clone(), partition.partition_index), partition.offset);
                }
            }
        }
        Ok(offsets)
    }

    async fn offset_fetch_for(
        &self,
        api_versions: &crate::protocol::messages::ApiVersionsTable,
        group_id: &str,
        assignments: &[(String, i32)],
        metadata: &ClusterMetadata,
    ) -> Result<HashMap<(String, i32), i64>> {
        let coordinator = metadata.brokers.values().next().cloned().ok_or_else(|| Error::network("no broker known for OffsetFetch"))?;
        let mut by_topic: HashMap<String, Vec<i32>> = HashMap::new();
        for (topic, partition) in assignments {
            by_topic.entry(topic.clone()).or_default().push(*partition);
        }
        let request = offset_fetch::OffsetFetchRequest {
            groups: vec![offset_fetch::OffsetFetchRequestGroup {
                group_id: group_id.to_string(),
                topics: by_topic.into_iter().map(|(name, partition_indexes)| offset_fetch::OffsetFetchRequestTopic { name, partition_indexes }).collect(),
            }],
            require_stable: false,
        };
        let mut body = BytesMut::new();
        request.encode(&mut body);
        let mut response_bytes = request_on(&self.fetch_pool, api_versions, &coordinator, ApiKey::OffsetFetch, body).await?;
        let response = offset_fetch::OffsetFetchResponse::decode(&mut response_bytes)?;

        let mut offsets = HashMap::new();
        for group in response.groups {
            if group.error_code != 0 {
                return Err(Error::Protocol(ProtocolError::from_code(ApiKey::OffsetFetch.into(), group.error_code)));
            }
            for topic in group.topics {
                for partition in topic.partitions {
                    offsets.insert((topic.name.clone(), partition.partition_index), partition.committed_offset);
                }
            }
        }
        Ok(offsets)
    }

    fn group_by_leader(&self, assignments: &[(String, i32)], metadata: &ClusterMetadata) -> Result<HashMap<i32, Vec<(String, i32)>>> {
        let mut by_leader: HashMap<i32, Vec<(String, i32)>> = HashMap::new();
        for (topic, partition) in assignments {
            let leader = metadata
                .leader_node(topic, *partition)
                .ok_or_else(|| Error::Protocol(ProtocolError::from_code(ApiKey::Fetch.into(), 6)))?;
            by_leader.entry(leader).or_default().push((topic.clone(), *partition));
        }
        Ok(by_leader)
    }

    /// One fetch cycle (spec §4.8.4 "per fetch cycle"): one `Fetch` per
    /// leader, concurrently, advancing `next_offsets` in place and returning
    /// every decoded message in response order.
    pub async fn fetch_cycle(
        &self,
        api_versions: &crate::protocol::messages::ApiVersionsTable,
        assignments: &[(String, i32)],
        next_offsets: &mut HashMap<(String, i32), i64>,
        metadata: &ClusterMetadata,
    ) -> Result<Vec<ConsumedMessage>> {
        let by_leader = self.group_by_leader(assignments, metadata)?;
        let offsets_snapshot = Arc::new(next_offsets.clone());

        let fetches = by_leader.into_iter().map(|(node_id, parts)| {
            let metadata = metadata;
            let next_offsets = offsets_snapshot.clone();
            async move {
                let broker = metadata.broker(node_id).cloned().ok_or_else(|| Error::network(format!("no broker for node {node_id}")))?;
                let mut by_topic: HashMap<uuid::Uuid, (String, Vec<fetch::FetchRequestPartition>)> = HashMap::new();
                for (topic, partition) in &parts {
                    let Some(topic_meta) = metadata.topics.get(topic) else { continue };
                    let offset = next_offsets.get(&(topic.clone(), *partition)).copied().unwrap_or(0);
                    by_topic.entry(topic_meta.id).or_insert_with(|| (topic.clone(), Vec::new())).1.push(fetch::FetchRequestPartition {
                        partition: *partition,
                        current_leader_epoch: -1,
                        fetch_offset: offset,
                        last_fetched_epoch: -1,
                        log_start_offset: -1,
                        partition_max_bytes: self.config.max_bytes,
                    });
                }

                let request = fetch::FetchRequest {
                    max_wait_ms: self.config.max_wait_time.as_millis() as i32,
                    min_bytes: self.config.min_bytes,
                    max_bytes: self.config.max_bytes,
                    isolation_level: self.config.isolation_level,
                    session_id: 0,
                    session_epoch: -1,
                    topics: by_topic.iter().map(|(id, (_, partitions))| fetch::FetchRequestTopic { topic_id: *id, partitions: partitions.clone() }).collect(),
                };
                let names: HashMap<uuid::Uuid, String> = by_topic.into_iter().map(|(id, (name, _))| (id, name)).collect();

                let mut body = BytesMut::new();
                request.encode(&mut body);
                let mut response_bytes = request_on(&self.fetch_pool, api_versions, &broker, ApiKey::Fetch, body).await?;
                let response = fetch::FetchResponse::decode(&mut response_bytes)?;
                if response.error_code != 0 {
                    return Err(Error::Protocol(ProtocolError::from_code(ApiKey::Fetch.into(), response.error_code)));
                }

                let mut messages = Vec::new();
                let mut advances = Vec::new();
                for topic_response in response.responses {
                    let Some(name) = names.get(&topic_response.topic_id) else { continue };
                    for partition_response in topic_response.partitions {
                        if partition_response.error_code != 0 {
                            return Err(Error::Protocol(ProtocolError::from_code(ApiKey::Fetch.into(), partition_response.error_code)));
                        }
                        let Some(mut records) = partition_response.records else { continue };
                        while let Some(batch) = decode_batch(&mut records)? {
                            for record in batch.records {
                                messages.push(ConsumedMessage {
                                    topic: name.clone(),
                                    partition: partition_response.partition_index,
                                    offset: record.offset,
                                    timestamp: record.timestamp,
                                    key: record.key,
                                    value: record.value,
                                    headers: record.headers,
                                    commit: None,
                                });
                            }
                            advances.push(((name.clone(), partition_response.partition_index), batch.next_offset));
                        }
                    }
                }
                Ok::<_, Error>((messages, advances))
            }
        });

        let results = futures::future::join_all(fetches).await;
        let mut all_messages = Vec::new();
        for result in results {
            let (messages, advances) = result?;
            all_messages.extend(messages);
            for (key, next_offset) in advances {
                next_offsets.insert(key, next_offset);
            }
        }
        Ok(all_messages)
    }
}
