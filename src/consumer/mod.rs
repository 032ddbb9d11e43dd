//! Consumer group state machine (spec §4.8, C9): find-coordinator, join,
//! sync, heartbeat, fetch, commit, leave — and the `MessageStream` each
//! `consume()` call hands back.

pub mod assignor;
pub mod fetcher;
pub mod stream;

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cluster::ClusterBase;
use crate::config::{Broker, ConsumeOptions, ConsumerConfig};
use crate::error::{Error, ProtocolError, Result};
use crate::network::ConnectionPool;
use crate::protocol::messages::{heartbeat, join_group, leave_group, offset_commit, sync_group};
use crate::protocol::ApiKey;

use assignor::{Assigner, RoundRobinAssigner};
use fetcher::Fetcher;
use stream::MessageStream;

const PROTOCOL_TYPE: &str = "consumer";
const PROTOCOL_NAME: &str = "roundrobin";

/// A held group membership: member id, generation, coordinator broker, and
/// this member's partition assignment (spec §4.8.1 "stable").
#[derive(Debug, Clone)]
struct Membership {
    member_id: String,
    generation_id: i32,
    coordinator: Broker,
    assignment: HashMap<String, Vec<i32>>,
}

/// Decrements `Consumer::live_streams` when a fetch loop task ends, whether
/// by `MessageStream::close`, channel drop, or group close — so
/// `close(force=false)` (spec §5) sees an accurate live-stream count however
/// the task exits.
struct LiveStreamGuard(Arc<Consumer>);

impl Drop for LiveStreamGuard {
    fn drop(&mut self) {
        self.0.live_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Consumer {
    cluster: Arc<ClusterBase>,
    fetch_pool: Arc<ConnectionPool>,
    config: ConsumerConfig,
    assigner: Arc<dyn Assigner>,
    membership: Mutex<Option<Membership>>,
    subscribed_topics: Mutex<Vec<String>>,
    heartbeat_task: Mutex<Option<JoinHandle<()>>>,
    closing: AtomicBool,
    live_streams: AtomicUsize,
}

impl Consumer {
    /// Returns a plain `Consumer`; wrap it in `Arc::new` before calling
    /// `consume` (the fetch loop and heartbeat timer need to hold a handle
    /// back to the consumer across spawned tasks).
    pub fn new(cluster: Arc<ClusterBase>, config: ConsumerConfig) -> Self {
        let fetch_pool = Arc::new(ConnectionPool::new(config.client.client_id.clone()));
        Self {
            cluster,
            fetch_pool,
            config,
            assigner: Arc::new(RoundRobinAssigner),
            membership: Mutex::new(None),
            subscribed_topics: Mutex::new(Vec::new()),
            heartbeat_task: Mutex::new(None),
            closing: AtomicBool::new(false),
            live_streams: AtomicUsize::new(0),
        }
    }

    pub fn with_assigner(mut self, assigner: Arc<dyn Assigner>) -> Self {
        self.assigner = assigner;
        self
    }

    /// `Consumer.findGroupCoordinator` (spec §6.3).
    pub async fn find_group_coordinator(&self) -> Result<Broker> {
        Ok(self.cluster.find_coordinator(&self.config.group_id, 0).await?.broker)
    }

    pub async fn subscribed_topics(&self) -> Vec<String> {
        self.subscribed_topics.lock().await.clone()
    }

    async fn ensure_joined(self: &Arc<Self>, topics: &[String]) -> Result<Membership> {
        {
            let membership = self.membership.lock().await;
            if let Some(m) = membership.as_ref() {
                return Ok(m.clone());
            }
        }
        let membership = self.join_and_sync(topics).await?;
        *self.membership.lock().await = Some(membership.clone());
        *self.subscribed_topics.lock().await = topics.to_vec();
        self.spawn_heartbeat().await;
        Ok(membership)
    }

    /// finding-coordinator → joining → syncing → stable (spec §4.8.1).
    async fn join_and_sync(&self, topics: &[String]) -> Result<Membership> {
        let coordinator_info = self.cluster.find_coordinator(&self.config.group_id, 0).await?;
        let mut member_id = String::new();

        loop {
            let request = join_group::JoinGroupRequest {
                group_id: self.config.group_id.clone(),
                session_timeout_ms: self.config.session_timeout.as_millis() as i32,
                rebalance_timeout_ms: self.config.rebalance_timeout.as_millis() as i32,
                member_id: member_id.clone(),
                group_instance_id: None,
                protocol_type: PROTOCOL_TYPE.to_string(),
                protocols: vec![join_group::JoinGroupRequestProtocol {
                    name: PROTOCOL_NAME.to_string(),
                    metadata: sync_group::SubscriptionMetadata { topics: topics.to_vec() }.encode(),
                }],
                reason: None,
            };
            let mut body = BytesMut::new();
            request.encode(&mut body);
            let mut response_bytes = self.cluster.request(&coordinator_info.broker, ApiKey::JoinGroup, body).await?;
            let response = join_group::JoinGroupResponse::decode(&mut response_bytes)?;

            if response.error_code != 0 {
                let err = ProtocolError::from_code(ApiKey::JoinGroup.into(), response.error_code);
                if err.unknown_member_id {
                    member_id.clear();
                }
                if err.needs_rejoin || err.rebalance_in_progress {
                    info!(group = %self.config.group_id, "group:rebalance, rejoining");
                    continue;
                }
                return Err(Error::Protocol(err));
            }

            member_id = response.member_id.clone();
            let generation_id = response.generation_id;
            let is_leader = response.is_leader();
            let assignments = if is_leader {
                self.compute_leader_assignments(&member_id, &response.members).await?
            } else {
                Vec::new()
            };

            let sync_request = sync_group::SyncGroupRequest {
                group_id: self.config.group_id.clone(),
                generation_id,
                member_id: member_id.clone(),
                group_instance_id: None,
                protocol_type: Some(PROTOCOL_TYPE.to_string()),
                protocol_name: Some(PROTOCOL_NAME.to_string()),
                assignments,
            };
            let mut sync_body = BytesMut::new();
            sync_request.encode(&mut sync_body);
            let mut sync_response_bytes = self.cluster.request(&coordinator_info.broker, ApiKey::SyncGroup, sync_body).await?;
            let sync_response = sync_group::SyncGroupResponse::decode(&mut sync_response_bytes)?;

            if sync_response.error_code != 0 {
                let err = ProtocolError::from_code(ApiKey::SyncGroup.into(), sync_response.error_code);
                if err.unknown_member_id {
                    member_id.clear();
                }
                if err.needs_rejoin || err.rebalance_in_progress {
                    continue;
                }
                return Err(Error::Protocol(err));
            }

            let assignment = sync_group::AssignmentProtocol::decode(&sync_response.assignment)?;
            let assignment_map: HashMap<String, Vec<i32>> = assignment.topics.into_iter().collect();

            debug!(member_id = %member_id, generation_id, partitions = assignment_map.values().map(|v| v.len()).sum::<usize>(), "group:stable");
            return Ok(Membership { member_id, generation_id, coordinator: coordinator_info.broker.clone(), assignment: assignment_map });
        }
    }

    async fn compute_leader_assignments(&self, self_member_id: &str, members: &[join_group::JoinGroupResponseMember]) -> Result<Vec<sync_group::SyncGroupRequestAssignment>> {
        let mut subscriptions = HashMap::new();
        for m in members {
            let sub = sync_group::SubscriptionMetadata::decode(&m.metadata)?;
            subscriptions.insert(m.member_id.clone(), sub.topics);
        }
        let union_topics: Vec<String> = subscriptions.values().flatten().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        let metadata = self.cluster.metadata(Some(&union_topics), false, self.config.client.autocreate_topics).await?;
        let plan = self.assigner.assign(self_member_id, &subscriptions, &metadata);

        Ok(plan
            .into_iter()
            .map(|(member_id, topics)| sync_group::SyncGroupRequestAssignment {
                member_id,
                assignment: sync_group::AssignmentProtocol { topics: topics.into_iter().collect() }.encode(),
            })
            .collect())
    }

    /// Spawns the recurring heartbeat timer (spec §4.8.2). Cancellable by
    /// `closing`; a `needsRejoin` response clears membership so the next
    /// `consume`/`commit` call re-enters the join loop.
    async fn spawn_heartbeat(self: &Arc<Self>) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(this.config.heartbeat_interval).await;
                if this.closing.load(Ordering::SeqCst) {
                    return;
                }
                let membership = { this.membership.lock().await.clone() };
                let Some(membership) = membership else { return };

                let request = heartbeat::HeartbeatRequest {
                    group_id: this.config.group_id.clone(),
                    generation_id: membership.generation_id,
                    member_id: membership.member_id.clone(),
                    group_instance_id: None,
                };
                let mut body = BytesMut::new();
                request.encode(&mut body);

                match this.cluster.request(&membership.coordinator, ApiKey::Heartbeat, body).await {
                    Ok(mut response_bytes) => match heartbeat::HeartbeatResponse::decode(&mut response_bytes) {
                        Ok(response) if response.error_code == 0 => {}
                        Ok(response) => {
                            let err = ProtocolError::from_code(ApiKey::Heartbeat.into(), response.error_code);
                            if err.needs_rejoin || err.rebalance_in_progress {
                                warn!(group = %this.config.group_id, "heartbeat lost membership, clearing for rejoin");
                                *this.membership.lock().await = None;
                                return;
                            }
                            warn!(group = %this.config.group_id, code = response.error_code, "heartbeat error");
                        }
                        Err(e) => warn!(error = %e, "heartbeat response decode failed"),
                    },
                    Err(e) => warn!(error = %e, "heartbeat request failed"),
                }
            }
        });
        let mut slot = self.heartbeat_task.lock().await;
        if let Some(old) = slot.take() {
            old.abort();
        }
        *slot = Some(handle);
    }

    /// `Consumer.consume` (spec §6.3, §4.8.4): joins the group if needed,
    /// resolves starting offsets, and returns a live `MessageStream` fed by
    /// a background fetch loop.
    pub async fn consume(self: &Arc<Self>, options: ConsumeOptions) -> Result<MessageStream> {
        let membership = self.ensure_joined(&options.topics).await?;
        let assignments: Vec<(String, i32)> = membership
            .assignment
            .iter()
            .flat_map(|(topic, partitions)| partitions.iter().map(move |p| (topic.clone(), *p)))
            .collect();

        let metadata = self.cluster.metadata(Some(&options.topics), false, self.config.client.autocreate_topics).await?;
        let api_versions = self.cluster.ensure_api_versions().await?;
        let fetcher = Fetcher::new(self.fetch_pool.clone(), self.config.clone());

        let mut next_offsets = fetcher
            .resolve_starting_offsets(&api_versions, &self.config.group_id, &assignments, options.mode, options.fallback_mode, &options.offsets, &metadata)
            .await?;

        let (tx, mut close_rx, stream) = MessageStream::new(self.config.high_water_mark);
        let this = self.clone();
        let group_id = self.config.group_id.clone();
        let autocommit = options.autocommit;
        let topic_list: Vec<String> = assignments.iter().map(|(t, _)| t.clone()).collect::<BTreeSet<_>>().into_iter().collect();

        let offsets_to_commit: Arc<Mutex<HashMap<(String, i32), (i64, i32)>>> = Arc::new(Mutex::new(HashMap::new()));
        let stream_done = Arc::new(AtomicBool::new(false));

        // autocommit=Interval(n): a second task flushes accumulated offsets
        // every n, independent of the fetch cycle's own pace (spec §4.8.4,
        // §6.4 "autocommit = number-of-ms").
        if let crate::config::AutocommitMode::Interval(interval) = autocommit {
            let this = this.clone();
            let group_id = group_id.clone();
            let offsets_to_commit = offsets_to_commit.clone();
            let stream_done = stream_done.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    if stream_done.load(Ordering::SeqCst) {
                        return;
                    }
                    let snapshot = std::mem::take(&mut *offsets_to_commit.lock().await);
                    if !snapshot.is_empty() {
                        if let Err(e) = this.commit_offsets(&group_id, &snapshot).await {
                            warn!(error = %e, "interval autocommit failed");
                        }
                    }
                }
            });
        }

        self.live_streams.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let _guard = LiveStreamGuard(this.clone());
            loop {
                if close_rx.try_recv().is_ok() || this.closing.load(Ordering::SeqCst) {
                    break;
                }
                let metadata = match this.cluster.metadata(Some(&topic_list), false, false).await {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(error = %e, "fetch loop: metadata refresh failed");
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        continue;
                    }
                };
                let messages = match fetcher.fetch_cycle(&api_versions, &assignments, &mut next_offsets, &metadata).await {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(error = %e, "fetch cycle failed");
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        continue;
                    }
                };
                if messages.is_empty() {
                    continue;
                }
                for mut message in messages {
                    let key = (message.topic.clone(), message.partition);
                    let committed_offset = message.offset + 1;
                    match autocommit {
                        crate::config::AutocommitMode::Inline => {
                            let mut single = HashMap::new();
                            single.insert(key.clone(), (committed_offset, -1));
                            let _ = this.commit_offsets(&group_id, &single).await;
                        }
                        crate::config::AutocommitMode::Interval(_) => {
                            offsets_to_commit.lock().await.insert(key.clone(), (committed_offset, -1));
                        }
                        crate::config::AutocommitMode::Disabled => {
                            message.commit = Some(stream::CommitHandle { consumer: this.clone(), topic: key.0.clone(), partition: key.1, offset: committed_offset });
                        }
                    }
                    if tx.send(message).await.is_err() {
                        stream_done.store(true, Ordering::SeqCst);
                        return;
                    }
                }
            }
            stream_done.store(true, Ordering::SeqCst);
        });

        Ok(stream)
    }

    /// `Consumer.commit` (spec §6.3, §4.8.1): `OffsetCommit` routed through
    /// the coordinator.
    pub async fn commit(&self, offsets: &[(String, i32, i64)]) -> Result<()> {
        let offsets_map: HashMap<(String, i32), (i64, i32)> = offsets.iter().map(|(t, p, o)| ((t.clone(), *p), (*o, -1))).collect();
        self.commit_offsets(&self.config.group_id, &offsets_map).await
    }

    async fn commit_offsets(&self, group_id: &str, offsets: &HashMap<(String, i32), (i64, i32)>) -> Result<()> {
        if offsets.is_empty() {
            return Ok(());
        }
        let membership = self.membership.lock().await.clone().ok_or_else(|| Error::User("cannot commit before joining a group".to_string()))?;

        let mut by_topic: HashMap<String, Vec<offset_commit::OffsetCommitRequestPartition>> = HashMap::new();
        for ((topic, partition), (offset, leader_epoch)) in offsets {
            by_topic.entry(topic.clone()).or_default().push(offset_commit::OffsetCommitRequestPartition {
                partition_index: *partition,
                committed_offset: *offset,
                committed_leader_epoch: *leader_epoch,
                committed_metadata: None,
            });
        }
        let request = offset_commit::OffsetCommitRequest {
            group_id: group_id.to_string(),
            generation_id_or_member_epoch: membership.generation_id,
            member_id: membership.member_id.clone(),
            group_instance_id: None,
            topics: by_topic.into_iter().map(|(name, partitions)| offset_commit::OffsetCommitRequestTopic { name, partitions }).collect(),
        };
        let mut body = BytesMut::new();
        request.encode(&mut body);
        let mut response_bytes = self.cluster.request(&membership.coordinator, ApiKey::OffsetCommit, body).await?;
        let response = offset_commit::OffsetCommitResponse::decode(&mut response_bytes)?;

        let mut errors = Vec::new();
        for topic in response.topics {
            for partition in topic.partitions {
                if partition.error_code != 0 {
                    errors.push(ProtocolError::from_code(ApiKey::OffsetCommit.into(), partition.error_code));
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(Error::Protocol(errors.pop().unwrap()))
        } else {
            Err(Error::Response(errors))
        }
    }

    /// `close(force)` (spec §5): without `force`, refuses only while at
    /// least one stream this consumer handed out is still live; with none
    /// live (or `force=true`), proceeds straight to `LeaveGroup` and tears
    /// the pools down.
    pub async fn close(&self, force: bool) -> Result<()> {
        if !force && self.live_streams.load(Ordering::SeqCst) > 0 {
            return Err(Error::User("close(force=false) requires the caller to have already closed all streams".to_string()));
        }
        self.closing.store(true, Ordering::SeqCst);
        if let Some(task) = self.heartbeat_task.lock().await.take() {
            task.abort();
        }

        let membership = self.membership.lock().await.take();
        if let Some(membership) = membership {
            let request = leave_group::LeaveGroupRequest {
                group_id: self.config.group_id.clone(),
                members: vec![leave_group::LeaveGroupRequestMember { member_id: membership.member_id, group_instance_id: None, reason: Some("consumer closed".to_string()) }],
            };
            let mut body = BytesMut::new();
            request.encode(&mut body);
            match self.cluster.request(&membership.coordinator, ApiKey::LeaveGroup, body).await {
                Ok(mut response_bytes) => {
                    if let Ok(response) = leave_group::LeaveGroupResponse::decode(&mut response_bytes) {
                        // spec §4.9: unknownMemberId on the final LeaveGroup is swallowed.
                        let err = ProtocolError::from_code(ApiKey::LeaveGroup.into(), response.error_code);
                        if response.error_code != 0 && !err.unknown_member_id {
                            warn!(code = response.error_code, "LeaveGroup returned an error during close");
                        }
                    }
                }
                Err(e) => warn!(error = %e, "LeaveGroup request failed during close"),
            }
        }

        self.fetch_pool.close().await;
        self.cluster.close().await;
        Ok(())
    }
}

pub use stream::ConsumedMessage as Message;
