//! Thin admin surface (spec §6.3): topic and group management, each call a
//! single request against any available bootstrap broker.

use bytes::BytesMut;

use crate::cluster::ClusterBase;
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::messages::{create_topics, delete_groups, delete_topics, describe_groups, list_groups};
use crate::protocol::ApiKey;
use std::sync::Arc;

pub struct TopicListing {
    pub name: String,
    pub partition_count: u32,
}

pub struct Admin {
    cluster: Arc<ClusterBase>,
}

impl Admin {
    pub fn new(cluster: Arc<ClusterBase>) -> Self {
        Self { cluster }
    }

    /// Grounded on `Metadata`, the only request that enumerates topics
    /// (spec.md names `Admin.listTopics` but never a dedicated wire
    /// request for it).
    pub async fn list_topics(&self) -> Result<Vec<TopicListing>> {
        let metadata = self.cluster.metadata(None, true, false).await?;
        Ok(metadata
            .topics
            .iter()
            .map(|(name, topic)| TopicListing { name: name.clone(), partition_count: topic.partition_count() })
            .collect())
    }

    pub async fn create_topics(&self, topics: &[(String, i32, i16)], timeout_ms: i32) -> Result<()> {
        let request = create_topics::CreateTopicsRequest {
            topics: topics
                .iter()
                .map(|(name, num_partitions, replication_factor)| create_topics::CreateTopicsRequestTopic {
                    name: name.clone(),
                    num_partitions: *num_partitions,
                    replication_factor: *replication_factor,
                })
                .collect(),
            timeout_ms,
            validate_only: false,
        };
        let mut body = BytesMut::new();
        request.encode(&mut body);
        let mut response_bytes = self.request_any(ApiKey::CreateTopics, body).await?;
        let response = create_topics::CreateTopicsResponse::decode(&mut response_bytes)?;
        self.cluster.invalidate_metadata().await;

        let errors: Vec<ProtocolError> = response
            .topics
            .iter()
            .filter(|t| t.error_code != 0)
            .map(|t| ProtocolError::from_code(ApiKey::CreateTopics.into(), t.error_code))
            .collect();
        self.collapse_errors(errors)
    }

    pub async fn delete_topics(&self, names: &[String], timeout_ms: i32) -> Result<()> {
        let request = delete_topics::DeleteTopicsRequest {
            topics: names
                .iter()
                .map(|name| delete_topics::DeleteTopicsRequestTopic { name: Some(name.clone()), topic_id: uuid::Uuid::nil() })
                .collect(),
            timeout_ms,
        };
        let mut body = BytesMut::new();
        request.encode(&mut body);
        let mut response_bytes = self.request_any(ApiKey::DeleteTopics, body).await?;
        let response = delete_topics::DeleteTopicsResponse::decode(&mut response_bytes)?;
        self.cluster.invalidate_metadata().await;

        let errors: Vec<ProtocolError> = response
            .responses
            .iter()
            .filter(|t| t.error_code != 0)
            .map(|t| ProtocolError::from_code(ApiKey::DeleteTopics.into(), t.error_code))
            .collect();
        self.collapse_errors(errors)
    }

    pub async fn list_groups(&self, states_filter: &[String]) -> Result<Vec<list_groups::ListedGroup>> {
        let request = list_groups::ListGroupsRequest { states_filter: states_filter.to_vec() };
        let mut body = BytesMut::new();
        request.encode(&mut body);
        let (version, mut response_bytes) = self.request_any_versioned(ApiKey::ListGroups, body).await?;
        let response = list_groups::ListGroupsResponse::decode(&mut response_bytes, version)?;
        if response.error_code != 0 {
            return Err(Error::Protocol(ProtocolError::from_code(ApiKey::ListGroups.into(), response.error_code)));
        }
        Ok(response.groups)
    }

    pub async fn describe_groups(&self, group_ids: &[String]) -> Result<Vec<describe_groups::DescribedGroup>> {
        let request = describe_groups::DescribeGroupsRequest { groups: group_ids.to_vec(), include_authorized_operations: false };
        let mut body = BytesMut::new();
        request.encode(&mut body);
        let mut response_bytes = self.request_any(ApiKey::DescribeGroups, body).await?;
        let response = describe_groups::DescribeGroupsResponse::decode(&mut response_bytes)?;

        let errors: Vec<ProtocolError> = response
            .groups
            .iter()
            .filter(|g| g.error_code != 0)
            .map(|g| ProtocolError::from_code(ApiKey::DescribeGroups.into(), g.error_code))
            .collect();
        self.collapse_errors(errors)?;
        Ok(response.groups)
    }

    pub async fn delete_groups(&self, group_ids: &[String]) -> Result<()> {
        let request = delete_groups::DeleteGroupsRequest { groups_names: group_ids.to_vec() };
        let mut body = BytesMut::new();
        request.encode(&mut body);
        let mut response_bytes = self.request_any(ApiKey::DeleteGroups, body).await?;
        let response = delete_groups::DeleteGroupsResponse::decode(&mut response_bytes)?;

        let errors: Vec<ProtocolError> = response
            .results
            .iter()
            .filter(|r| r.error_code != 0)
            .map(|r| ProtocolError::from_code(ApiKey::DeleteGroups.into(), r.error_code))
            .collect();
        self.collapse_errors(errors)
    }

    async fn request_any(&self, api: ApiKey, body: BytesMut) -> Result<bytes::Bytes> {
        self.request_any_versioned(api, body).await.map(|(_, bytes)| bytes)
    }

    async fn request_any_versioned(&self, api: ApiKey, body: BytesMut) -> Result<(i16, bytes::Bytes)> {
        let table = self.cluster.ensure_api_versions().await?;
        let version = table.negotiate(api)?;
        let flexible = api.is_flexible(version);
        let conn = self.cluster.pool.get_first_available(&self.cluster.config.bootstrap_brokers).await?;
        let response_bytes = conn.send(api.into(), version, &body, flexible).await?;
        Ok((version, response_bytes))
    }

    fn collapse_errors(&self, mut errors: Vec<ProtocolError>) -> Result<()> {
        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(Error::Protocol(errors.pop().unwrap()))
        } else {
            Err(Error::Response(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Broker, ClientConfig};

    #[test]
    fn admin_wraps_a_shared_cluster_handle() {
        let cluster = ClusterBase::new(ClientConfig::new(vec![Broker::new("localhost", 9092)]));
        let _admin = Admin::new(cluster);
    }
}
