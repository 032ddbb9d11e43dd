//! `ListOffsets` (v9) — spec §4.8.4, §6.1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactString};

pub const LATEST_TIMESTAMP: i64 = -1;
pub const EARLIEST_TIMESTAMP: i64 = -2;

pub struct ListOffsetsRequestPartition {
    pub partition_index: i32,
    pub current_leader_epoch: i32,
    pub timestamp: i64,
}

pub struct ListOffsetsRequestTopic {
    pub name: String,
    pub partitions: Vec<ListOffsetsRequestPartition>,
}

pub struct ListOffsetsRequest {
    pub replica_id: i32,
    pub isolation_level: i8,
    pub topics: Vec<ListOffsetsRequestTopic>,
}

impl ListOffsetsRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_i32(self.replica_id);
        buf.put_i8(self.isolation_level);
        write_compact_array(buf, &self.topics, |b, topic| {
            CompactString::write(b, &topic.name);
            write_compact_array(b, &topic.partitions, |pb, part| {
                pb.put_i32(part.partition_index);
                pb.put_i32(part.current_leader_epoch);
                pb.put_i64(part.timestamp);
                write_tagged_fields(pb);
            });
            write_tagged_fields(b);
        });
        write_tagged_fields(buf);
    }
}

pub struct ListOffsetsResponsePartition {
    pub partition_index: i32,
    pub error_code: i16,
    pub timestamp: i64,
    pub offset: i64,
    pub leader_epoch: i32,
}

pub struct ListOffsetsResponseTopic {
    pub name: String,
    pub partitions: Vec<ListOffsetsResponsePartition>,
}

pub struct ListOffsetsResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<ListOffsetsResponseTopic>,
}

impl ListOffsetsResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let topics = read_compact_array(buf, 9, |b, _| {
            let name = CompactString::deserialize(b);
            let partitions = read_compact_array(b, 9, |pb, _| {
                let partition_index = pb.get_i32();
                let error_code = pb.get_i16();
                let timestamp = pb.get_i64();
                let offset = pb.get_i64();
                let leader_epoch = pb.get_i32();
                crate::protocol::types::skip_tagged_fields(pb)?;
                Ok(ListOffsetsResponsePartition { partition_index, error_code, timestamp, offset, leader_epoch })
            })?;
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(ListOffsetsResponseTopic { name, partitions })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, topics })
    }
}
