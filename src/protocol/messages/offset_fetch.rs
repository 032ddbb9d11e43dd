//! `OffsetFetch` (v9) — spec §4.8.4, §6.1. Implements the single-group shape
//! (the common case for this client, one group per `Consumer`); the v8+
//! wire format batches groups, so a single-element `groups` array is sent.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactString};

pub struct OffsetFetchRequestTopic {
    pub name: String,
    pub partition_indexes: Vec<i32>,
}

pub struct OffsetFetchRequestGroup {
    pub group_id: String,
    pub topics: Vec<OffsetFetchRequestTopic>,
}

pub struct OffsetFetchRequest {
    pub groups: Vec<OffsetFetchRequestGroup>,
    pub require_stable: bool,
}

impl OffsetFetchRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        write_compact_array(buf, &self.groups, |b, group| {
            CompactString::write(b, &group.group_id);
            write_compact_array(b, &group.topics, |tb, topic| {
                CompactString::write(tb, &topic.name);
                crate::protocol::types::write_compact_array(tb, &topic.partition_indexes, |pb, idx| {
                    pb.put_i32(*idx);
                });
                write_tagged_fields(tb);
            });
            write_tagged_fields(b);
        });
        buf.put_u8(self.require_stable as u8);
        write_tagged_fields(buf);
    }
}

pub struct OffsetFetchResponsePartition {
    pub partition_index: i32,
    pub committed_offset: i64,
    pub committed_leader_epoch: i32,
    pub metadata: Option<String>,
    pub error_code: i16,
}

pub struct OffsetFetchResponseTopic {
    pub name: String,
    pub partitions: Vec<OffsetFetchResponsePartition>,
}

pub struct OffsetFetchResponseGroup {
    pub group_id: String,
    pub topics: Vec<OffsetFetchResponseTopic>,
    pub error_code: i16,
}

pub struct OffsetFetchResponse {
    pub throttle_time_ms: i32,
    pub groups: Vec<OffsetFetchResponseGroup>,
}

impl OffsetFetchResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let groups = read_compact_array(buf, 9, |b, _| {
            let group_id = CompactString::deserialize(b);
            let topics = read_compact_array(b, 9, |tb, _| {
                let name = CompactString::deserialize(tb);
                let partitions = read_compact_array(tb, 9, |pb, _| {
                    let partition_index = pb.get_i32();
                    let committed_offset = pb.get_i64();
                    let committed_leader_epoch = pb.get_i32();
                    let metadata = CompactString::read(pb)?;
                    let error_code = pb.get_i16();
                    crate::protocol::types::skip_tagged_fields(pb)?;
                    Ok(OffsetFetchResponsePartition {
                        partition_index,
                        committed_offset,
                        committed_leader_epoch,
                        metadata,
                        error_code,
                    })
                })?;
                crate::protocol::types::skip_tagged_fields(tb)?;
                Ok(OffsetFetchResponseTopic { name, partitions })
            })?;
            let error_code = b.get_i16();
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(OffsetFetchResponseGroup { group_id, topics, error_code })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, groups })
    }
}
