//! `OffsetCommit` (v9) — spec §4.8.1, §6.1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactString};

pub struct OffsetCommitRequestPartition {
    pub partition_index: i32,
    pub committed_offset: i64,
    pub committed_leader_epoch: i32,
    pub committed_metadata: Option<String>,
}

pub struct OffsetCommitRequestTopic {
    pub name: String,
    pub partitions: Vec<OffsetCommitRequestPartition>,
}

pub struct OffsetCommitRequest {
    pub group_id: String,
    pub generation_id_or_member_epoch: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub topics: Vec<OffsetCommitRequestTopic>,
}

impl OffsetCommitRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        CompactString::write(buf, &self.group_id);
        buf.put_i32(self.generation_id_or_member_epoch);
        CompactString::write(buf, &self.member_id);
        CompactString::write_nullable(buf, self.group_instance_id.as_deref());
        write_compact_array(buf, &self.topics, |b, topic| {
            CompactString::write(b, &topic.name);
            write_compact_array(b, &topic.partitions, |pb, part| {
                pb.put_i32(part.partition_index);
                pb.put_i64(part.committed_offset);
                pb.put_i32(part.committed_leader_epoch);
                CompactString::write_nullable(pb, part.committed_metadata.as_deref());
                write_tagged_fields(pb);
            });
            write_tagged_fields(b);
        });
        write_tagged_fields(buf);
    }
}

pub struct OffsetCommitResponsePartition {
    pub partition_index: i32,
    pub error_code: i16,
}

pub struct OffsetCommitResponseTopic {
    pub name: String,
    pub partitions: Vec<OffsetCommitResponsePartition>,
}

pub struct OffsetCommitResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetCommitResponseTopic>,
}

impl OffsetCommitResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let topics = read_compact_array(buf, 9, |b, _| {
            let name = CompactString::deserialize(b);
            let partitions = read_compact_array(b, 9, |pb, _| {
                let partition_index = pb.get_i32();
                let error_code = pb.get_i16();
                crate::protocol::types::skip_tagged_fields(pb)?;
                Ok(OffsetCommitResponsePartition { partition_index, error_code })
            })?;
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(OffsetCommitResponseTopic { name, partitions })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, topics })
    }
}
