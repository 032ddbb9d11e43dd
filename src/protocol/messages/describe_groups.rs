//! `DescribeGroups` (v5) — spec §6.1, §6.3 (admin surface).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactNullableBytes, CompactString};

pub struct DescribeGroupsRequest {
    pub groups: Vec<String>,
    pub include_authorized_operations: bool,
}

impl DescribeGroupsRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        write_compact_array(buf, &self.groups, |b, g| CompactString::write(b, g));
        buf.put_u8(self.include_authorized_operations as u8);
        write_tagged_fields(buf);
    }
}

pub struct DescribedGroupMember {
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub client_id: String,
    pub client_host: String,
    pub member_metadata: Vec<u8>,
    pub member_assignment: Vec<u8>,
}

pub struct DescribedGroup {
    pub error_code: i16,
    pub group_id: String,
    pub group_state: String,
    pub protocol_type: String,
    pub protocol_data: String,
    pub members: Vec<DescribedGroupMember>,
}

pub struct DescribeGroupsResponse {
    pub throttle_time_ms: i32,
    pub groups: Vec<DescribedGroup>,
}

impl DescribeGroupsResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let groups = read_compact_array(buf, 5, |b, _| {
            let error_code = b.get_i16();
            let group_id = CompactString::deserialize(b);
            let group_state = CompactString::deserialize(b);
            let protocol_type = CompactString::deserialize(b);
            let protocol_data = CompactString::deserialize(b);
            let members = read_compact_array(b, 5, |mb, _| {
                let member_id = CompactString::deserialize(mb);
                let group_instance_id = CompactString::read(mb)?;
                let client_id = CompactString::deserialize(mb);
                let client_host = CompactString::deserialize(mb);
                let member_metadata = CompactNullableBytes::read(mb)?.map(|m| m.to_vec()).unwrap_or_default();
                let member_assignment = CompactNullableBytes::read(mb)?.map(|m| m.to_vec()).unwrap_or_default();
                crate::protocol::types::skip_tagged_fields(mb)?;
                Ok(DescribedGroupMember { member_id, group_instance_id, client_id, client_host, member_metadata, member_assignment })
            })?;
            let _authorized_operations = b.get_i32();
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(DescribedGroup { error_code, group_id, group_state, protocol_type, protocol_data, members })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, groups })
    }
}
