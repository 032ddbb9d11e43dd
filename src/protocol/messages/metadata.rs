//! `Metadata` (v12) — spec §4.6.2, §6.1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{
    read_compact_array, write_compact_array, write_tagged_fields, CompactString, KafkaUuid,
};

pub struct MetadataRequestTopic {
    pub topic_id: uuid::Uuid,
    pub name: Option<String>,
}

pub struct MetadataRequest {
    /// `None` requests metadata for every topic (a null topics array on the wire).
    pub topics: Option<Vec<MetadataRequestTopic>>,
    pub allow_auto_topic_creation: bool,
}

impl MetadataRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        match &self.topics {
            None => crate::protocol::types::write_unsigned_varint(buf, 0),
            Some(topics) => write_compact_array(buf, topics, |b, t| {
                KafkaUuid::write(b, t.topic_id);
                crate::protocol::types::CompactString::write_nullable(b, t.name.as_deref());
                write_tagged_fields(b);
            }),
        }
        buf.put_u8(self.allow_auto_topic_creation as u8);
        buf.put_u8(0); // include_cluster_authorized_operations (deprecated)
        buf.put_u8(0); // include_topic_authorized_operations
        write_tagged_fields(buf);
    }
}

pub struct MetadataBroker {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    pub rack: Option<String>,
}

pub struct MetadataPartition {
    pub error_code: i16,
    pub partition_index: i32,
    pub leader_id: i32,
    pub leader_epoch: i32,
    pub replica_nodes: Vec<i32>,
    pub isr_nodes: Vec<i32>,
}

pub struct MetadataTopic {
    pub error_code: i16,
    pub name: Option<String>,
    pub topic_id: uuid::Uuid,
    pub is_internal: bool,
    pub partitions: Vec<MetadataPartition>,
}

pub struct MetadataResponse {
    pub throttle_time_ms: i32,
    pub brokers: Vec<MetadataBroker>,
    pub cluster_id: Option<String>,
    pub controller_id: i32,
    pub topics: Vec<MetadataTopic>,
}

impl MetadataResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let brokers = read_compact_array(buf, 12, |b, _| {
            let node_id = b.get_i32();
            let host = CompactString::deserialize(b);
            let port = b.get_i32();
            let rack = CompactString::read(b)?;
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(MetadataBroker { node_id, host, port, rack })
        })?;
        let cluster_id = CompactString::read(buf)?;
        let controller_id = buf.get_i32();
        let topics = read_compact_array(buf, 12, |b, _| {
            let error_code = b.get_i16();
            let name = CompactString::read(b)?;
            let topic_id = KafkaUuid::read(b)?;
            let is_internal = b.get_u8() != 0;
            let partitions = read_compact_array(b, 12, |pb, _| {
                let error_code = pb.get_i16();
                let partition_index = pb.get_i32();
                let leader_id = pb.get_i32();
                let leader_epoch = pb.get_i32();
                let replica_nodes = read_compact_array(pb, 12, |rb, _| Ok(rb.get_i32()))?;
                let isr_nodes = read_compact_array(pb, 12, |rb, _| Ok(rb.get_i32()))?;
                let _offline_replicas: Vec<i32> = read_compact_array(pb, 12, |rb, _| Ok(rb.get_i32()))?;
                crate::protocol::types::skip_tagged_fields(pb)?;
                Ok(MetadataPartition { error_code, partition_index, leader_id, leader_epoch, replica_nodes, isr_nodes })
            })?;
            let _topic_authorized_operations = b.get_i32();
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(MetadataTopic { error_code, name, topic_id, is_internal, partitions })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, brokers, cluster_id, controller_id, topics })
    }
}
