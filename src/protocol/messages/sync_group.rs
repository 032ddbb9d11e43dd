//! `SyncGroup` (v5) — spec §4.8.1, §4.8.3, §6.2.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{
    read_compact_array, write_compact_array, write_tagged_fields, CompactNullableBytes, CompactString,
};

pub struct SyncGroupRequestAssignment {
    pub member_id: String,
    pub assignment: Vec<u8>,
}

pub struct SyncGroupRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub protocol_type: Option<String>,
    pub protocol_name: Option<String>,
    pub assignments: Vec<SyncGroupRequestAssignment>,
}

impl SyncGroupRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        CompactString::write(buf, &self.group_id);
        buf.put_i32(self.generation_id);
        CompactString::write(buf, &self.member_id);
        CompactString::write_nullable(buf, self.group_instance_id.as_deref());
        CompactString::write_nullable(buf, self.protocol_type.as_deref());
        CompactString::write_nullable(buf, self.protocol_name.as_deref());
        write_compact_array(buf, &self.assignments, |b, a| {
            CompactString::write(b, &a.member_id);
            CompactNullableBytes::write(b, Some(&a.assignment));
            write_tagged_fields(b);
        });
        write_tagged_fields(buf);
    }
}

pub struct SyncGroupResponse {
    pub throttle_time_ms: i32,
    pub error_code: i16,
    pub protocol_type: Option<String>,
    pub protocol_name: Option<String>,
    pub assignment: Vec<u8>,
}

impl SyncGroupResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let error_code = buf.get_i16();
        let protocol_type = CompactString::read(buf)?;
        let protocol_name = CompactString::read(buf)?;
        let assignment = CompactNullableBytes::read(buf)?.map(|b| b.to_vec()).unwrap_or_default();
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, error_code, protocol_type, protocol_name, assignment })
    }
}

/// The `SyncGroup` assignment-protocol payload itself (spec §6.2):
/// `i16 version=0, array<{compact-string topic, array<i32 partitions>}>, i32 user_data_length=0`.
pub struct AssignmentProtocol {
    pub topics: Vec<(String, Vec<i32>)>,
}

impl AssignmentProtocol {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_i16(0); // version
        crate::protocol::types::write_array(&mut buf, &self.topics, |b, (topic, partitions)| {
            // Protocol assignment payloads are plain (non-flexible) arrays
            // embedded in an opaque byte blob (spec §6.2).
            b.put_i16(topic.len() as i16);
            b.put_slice(topic.as_bytes());
            crate::protocol::types::write_array(b, partitions, |pb, p| pb.put_i32(*p));
        });
        buf.put_i32(0); // user_data_length
        buf.to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let _version = buf.get_i16();
        let topics = crate::protocol::types::read_array(&mut buf, 0, |b, _| {
            let len = b.get_i16() as usize;
            let topic = String::from_utf8_lossy(&b.copy_to_bytes(len)).into_owned();
            let partitions = crate::protocol::types::read_array(b, 0, |pb, _| Ok(pb.get_i32()))?;
            Ok((topic, partitions))
        })?;
        Ok(Self { topics })
    }
}

/// The subscription metadata a member sends as its `JoinGroup` protocol
/// metadata (spec §6.2): `i16 version, array<string> topics, bytes user_data`.
pub struct SubscriptionMetadata {
    pub topics: Vec<String>,
}

impl SubscriptionMetadata {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_i16(0);
        crate::protocol::types::write_array(&mut buf, &self.topics, |b, t| {
            b.put_i16(t.len() as i16);
            b.put_slice(t.as_bytes());
        });
        buf.put_i32(0); // empty user_data
        buf.to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let _version = buf.get_i16();
        let topics = crate::protocol::types::read_array(&mut buf, 0, |b, _| {
            let len = b.get_i16() as usize;
            Ok(String::from_utf8_lossy(&b.copy_to_bytes(len)).into_owned())
        })?;
        Ok(Self { topics })
    }
}
