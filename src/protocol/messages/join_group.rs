//! `JoinGroup` (v9) — spec §4.8.1, §4.8.3, §6.1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{
    read_compact_array, write_compact_array, write_tagged_fields, CompactNullableBytes, CompactString,
};

pub struct JoinGroupRequestProtocol {
    pub name: String,
    pub metadata: Vec<u8>,
}

pub struct JoinGroupRequest {
    pub group_id: String,
    pub session_timeout_ms: i32,
    pub rebalance_timeout_ms: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub protocol_type: String,
    pub protocols: Vec<JoinGroupRequestProtocol>,
    pub reason: Option<String>,
}

impl JoinGroupRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        CompactString::write(buf, &self.group_id);
        buf.put_i32(self.session_timeout_ms);
        buf.put_i32(self.rebalance_timeout_ms);
        CompactString::write(buf, &self.member_id);
        CompactString::write_nullable(buf, self.group_instance_id.as_deref());
        CompactString::write(buf, &self.protocol_type);
        write_compact_array(buf, &self.protocols, |b, proto| {
            CompactString::write(b, &proto.name);
            CompactNullableBytes::write(b, Some(&proto.metadata));
            write_tagged_fields(b);
        });
        CompactString::write_nullable(buf, self.reason.as_deref());
        write_tagged_fields(buf);
    }
}

pub struct JoinGroupResponseMember {
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub metadata: Vec<u8>,
}

pub struct JoinGroupResponse {
    pub throttle_time_ms: i32,
    pub error_code: i16,
    pub generation_id: i32,
    pub protocol_type: Option<String>,
    pub protocol_name: Option<String>,
    pub leader: String,
    pub member_id: String,
    pub members: Vec<JoinGroupResponseMember>,
}

impl JoinGroupResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let error_code = buf.get_i16();
        let generation_id = buf.get_i32();
        let protocol_type = CompactString::read(buf)?;
        let protocol_name = CompactString::read(buf)?;
        let leader = CompactString::deserialize(buf);
        let _skip_assignment = buf.get_u8();
        let member_id = CompactString::deserialize(buf);
        let members = read_compact_array(buf, 9, |b, _| {
            let member_id = CompactString::deserialize(b);
            let group_instance_id = CompactString::read(b)?;
            let metadata = CompactNullableBytes::read(b)?.map(|m| m.to_vec()).unwrap_or_default();
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(JoinGroupResponseMember { member_id, group_instance_id, metadata })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self {
            throttle_time_ms,
            error_code,
            generation_id,
            protocol_type,
            protocol_name,
            leader,
            member_id,
            members,
        })
    }

    pub fn is_leader(&self) -> bool {
        self.leader == self.member_id
    }
}
