//! Cluster base (spec §4.6, C7): API-version negotiation, the metadata
//! cache, the retry engine, and operation deduplication, all wired around a
//! single connection pool.

pub mod dedup;
pub mod metadata;
pub mod retry;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::config::{Broker, ClientConfig};
use crate::error::{Error, ProtocolError, Result};
use crate::network::ConnectionPool;
use crate::protocol::messages::{api_versions, find_coordinator, metadata as metadata_msg, ApiVersionsTable};
use crate::protocol::ApiKey;

pub use metadata::{ClusterMetadata, PartitionMetadata, TopicMetadata};
pub use retry::RetryConfig;

#[derive(Debug, Clone)]
pub struct CoordinatorInfo {
    pub node_id: i32,
    pub broker: Broker,
}

/// The three protocol error codes that signal the metadata cache no longer
/// reflects reality (spec §4.6.3, GLOSSARY "Stale metadata").
pub fn is_stale_metadata_code(code: i16) -> bool {
    matches!(code, 3 | 5 | 6) // UNKNOWN_TOPIC_OR_PARTITION, LEADER_NOT_AVAILABLE, NOT_LEADER_OR_FOLLOWER
}

pub struct ClusterBase {
    pub config: ClientConfig,
    pub pool: ConnectionPool,
    api_versions: OnceCell<ApiVersionsTable>,
    metadata_cache: Mutex<Option<Arc<ClusterMetadata>>>,
    dedup_api_versions: dedup::Dedup<ApiVersionsTable>,
    dedup_metadata: dedup::Dedup<Arc<ClusterMetadata>>,
    dedup_coordinator: dedup::Dedup<CoordinatorInfo>,
    retry: RetryConfig,
    closed: AtomicBool,
}

impl ClusterBase {
    pub fn new(config: ClientConfig) -> Arc<Self> {
        let retry = RetryConfig { retries: config.retries, retry_delay: config.retry_delay };
        let pool = ConnectionPool::new(config.client_id.clone());
        Arc::new(Self {
            config,
            pool,
            api_versions: OnceCell::new(),
            metadata_cache: Mutex::new(None),
            dedup_api_versions: dedup::Dedup::new(),
            dedup_metadata: dedup::Dedup::new(),
            dedup_coordinator: dedup::Dedup::new(),
            retry,
            closed: AtomicBool::new(false),
        })
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::network_closed())
        } else {
            Ok(())
        }
    }

    /// Negotiates `ApiVersions` against any bootstrap connection on first
    /// use, then caches the table for the client's lifetime (spec §4.6.1).
    pub async fn ensure_api_versions(&self) -> Result<ApiVersionsTable> {
        self.check_open()?;
        if let Some(table) = self.api_versions.get() {
            return Ok(table.clone());
        }

        let table = self
            .dedup_api_versions
            .perform("api_versions", || async {
                let conn = self.pool.get_first_available(&self.config.bootstrap_brokers).await?;
                let request = api_versions::ApiVersionsRequest {
                    client_software_name: "kafka-native".to_string(),
                    client_software_version: env!("CARGO_PKG_VERSION").to_string(),
                };
                let mut body = BytesMut::new();
                request.encode(&mut body);
                // ApiVersions is negotiated here, so the request version is
                // fixed at the client's own max and the response header is
                // always v0 (spec §4.6.1, §6.1).
                let mut response_bytes = conn.send(ApiKey::ApiVersions.into(), ApiKey::ApiVersions.max_supported_version(), &body, false).await?;
                let response = api_versions::ApiVersionsResponse::decode(&mut response_bytes)?;
                if response.error_code != 0 {
                    return Err(Error::Protocol(ProtocolError::from_code(ApiKey::ApiVersions.into(), response.error_code)));
                }
                Ok(response.into_table())
            })
            .await?;

        let _ = self.api_versions.set(table.clone());
        Ok(table)
    }

    /// Issues one request to `broker`, negotiating the version and flexible
    /// framing from the cached `ApiVersions` table, and retrying network
    /// failures and `canRetry` protocol errors per `retry_config()` (spec
    /// §4.5, §4.6.1, §4.6.3, §4.9).
    pub async fn request(&self, broker: &Broker, api: ApiKey, body: BytesMut) -> Result<Bytes> {
        self.check_open()?;
        let table = self.ensure_api_versions().await?;
        let version = table.negotiate(api)?;
        let flexible = api.is_flexible(version);
        let op_name = format!("{api:?}");
        retry::perform_with_retry(&op_name, &self.retry, |_| false, || async {
            let conn = self.pool.get(broker).await?;
            conn.send(api.into(), version, &body, flexible).await
        })
        .await
    }

    /// Resolves metadata for `topics` (or every topic when `None`),
    /// refreshing when stale (spec §4.6.2).
    pub async fn metadata(&self, topics: Option<&[String]>, force_update: bool, autocreate: bool) -> Result<Arc<ClusterMetadata>> {
        self.check_open()?;
        let requested: Vec<String> = topics.map(|t| t.to_vec()).unwrap_or_default();

        {
            let cache = self.metadata_cache.lock().await;
            if let Some(existing) = cache.as_ref() {
                if !force_update && !existing.is_stale(&requested, self.config.metadata_max_age) {
                    return Ok(existing.clone());
                }
            }
        }

        let op_id = format!("metadata:{}", requested.join(","));
        let fresh = self
            .dedup_metadata
            .perform(&op_id, || async {
                retry::perform_with_retry("Metadata", &self.retry, |_| false, || async {
                    let request_topics = topics.map(|names| {
                        names
                            .iter()
                            .map(|name| metadata_msg::MetadataRequestTopic { topic_id: uuid::Uuid::nil(), name: Some(name.clone()) })
                            .collect::<Vec<_>>()
                    });
                    let request = metadata_msg::MetadataRequest { topics: request_topics, allow_auto_topic_creation: autocreate };
                    let mut body = BytesMut::new();
                    request.encode(&mut body);

                    let conn = self.pool.get_first_available(&self.config.bootstrap_brokers).await?;
                    let table = self.ensure_api_versions().await?;
                    let version = table.negotiate(ApiKey::Metadata)?;
                    let flexible = ApiKey::Metadata.is_flexible(version);
                    let mut response_bytes = conn.send(ApiKey::Metadata.into(), version, &body, flexible).await?;
                    let response = metadata_msg::MetadataResponse::decode(&mut response_bytes)?;

                    let brokers: HashMap<i32, Broker> = response
                        .brokers
                        .into_iter()
                        .map(|b| (b.node_id, Broker::new(b.host, b.port as u16)))
                        .collect();

                    let mut topic_map = HashMap::new();
                    for topic in response.topics {
                        if topic.is_internal {
                            continue;
                        }
                        let Some(name) = topic.name else { continue };
                        if topic.error_code != 0 {
                            warn!(topic = %name, error_code = topic.error_code, "metadata refresh: topic-level error");
                            continue;
                        }
                        // Sort by partition_index (spec §4.6.2) rather than
                        // trusting wire order from the broker.
                        let mut indexed: Vec<(i32, PartitionMetadata)> = topic
                            .partitions
                            .into_iter()
                            .map(|p| (p.partition_index, PartitionMetadata { leader: p.leader_id, leader_epoch: p.leader_epoch, replicas: p.replica_nodes }))
                            .collect();
                        indexed.sort_by_key(|(idx, _)| *idx);
                        let partitions = indexed.into_iter().map(|(_, meta)| meta).collect();

                        topic_map.insert(name, TopicMetadata { id: topic.topic_id, partitions });
                    }

                    let new_metadata = Arc::new(ClusterMetadata::new(response.cluster_id, brokers, topic_map));
                    info!(topics = new_metadata.topics.len(), brokers = new_metadata.brokers.len(), "client:metadata");
                    Ok(new_metadata)
                })
                .await
            })
            .await?;

        *self.metadata_cache.lock().await = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drops the cache so the next `metadata` call force-refreshes (spec
    /// §3 Lifecycle, §4.7.4).
    pub async fn invalidate_metadata(&self) {
        *self.metadata_cache.lock().await = None;
        debug!("metadata cache invalidated");
    }

    /// `FindCoordinator`, deduplicated per group/transaction key (spec
    /// §4.6.4, §4.8.1).
    pub async fn find_coordinator(&self, key: &str, key_type: i8) -> Result<CoordinatorInfo> {
        self.check_open()?;
        let op_id = format!("find_coordinator:{key_type}:{key}");
        self.dedup_coordinator
            .perform(&op_id, || async {
                retry::perform_with_retry("FindCoordinator", &self.retry, |_| false, || async {
                    let request = find_coordinator::FindCoordinatorRequest { key_type, coordinator_keys: vec![key.to_string()] };
                    let mut body = BytesMut::new();
                    request.encode(&mut body);

                    let conn = self.pool.get_first_available(&self.config.bootstrap_brokers).await?;
                    let table = self.ensure_api_versions().await?;
                    let version = table.negotiate(ApiKey::FindCoordinator)?;
                    let flexible = ApiKey::FindCoordinator.is_flexible(version);
                    let mut response_bytes = conn.send(ApiKey::FindCoordinator.into(), version, &body, flexible).await?;
                    let response = find_coordinator::FindCoordinatorResponse::decode(&mut response_bytes)?;

                    let coordinator = response
                        .coordinators
                        .into_iter()
                        .find(|c| c.key == key)
                        .ok_or_else(|| Error::Codec("FindCoordinator response missing requested key".to_string()))?;
                    if coordinator.error_code != 0 {
                        return Err(Error::Protocol(ProtocolError::from_code(ApiKey::FindCoordinator.into(), coordinator.error_code)));
                    }

                    Ok(CoordinatorInfo { node_id: coordinator.node_id, broker: Broker::new(coordinator.host, coordinator.port as u16) })
                })
                .await
            })
            .await
    }

    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pool.close().await;
    }
}
