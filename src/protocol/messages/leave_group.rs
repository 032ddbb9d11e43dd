//! `LeaveGroup` (v5) — spec §4.8.1, §4.9, §6.1.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactString};

pub struct LeaveGroupRequestMember {
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub reason: Option<String>,
}

pub struct LeaveGroupRequest {
    pub group_id: String,
    pub members: Vec<LeaveGroupRequestMember>,
}

impl LeaveGroupRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        CompactString::write(buf, &self.group_id);
        write_compact_array(buf, &self.members, |b, m| {
            CompactString::write(b, &m.member_id);
            CompactString::write_nullable(b, m.group_instance_id.as_deref());
            CompactString::write_nullable(b, m.reason.as_deref());
            write_tagged_fields(b);
        });
        write_tagged_fields(buf);
    }
}

pub struct LeaveGroupResponseMember {
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub error_code: i16,
}

pub struct LeaveGroupResponse {
    pub throttle_time_ms: i32,
    pub error_code: i16,
    pub members: Vec<LeaveGroupResponseMember>,
}

impl LeaveGroupResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let error_code = buf.get_i16();
        let members = read_compact_array(buf, 5, |b, _| {
            let member_id = CompactString::deserialize(b);
            let group_instance_id = CompactString::read(b)?;
            let error_code = b.get_i16();
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(LeaveGroupResponseMember { member_id, group_instance_id, error_code })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, error_code, members })
    }
}
