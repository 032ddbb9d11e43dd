//! `ListGroups` (v4|v5) — spec §6.1, §6.3 (admin surface).

use bytes::{Buf, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactString};

pub struct ListGroupsRequest {
    pub states_filter: Vec<String>,
}

impl ListGroupsRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        write_compact_array(buf, &self.states_filter, |b, s| CompactString::write(b, s));
        write_tagged_fields(buf);
    }
}

pub struct ListedGroup {
    pub group_id: String,
    pub protocol_type: String,
    pub group_state: Option<String>,
}

pub struct ListGroupsResponse {
    pub throttle_time_ms: i32,
    pub error_code: i16,
    pub groups: Vec<ListedGroup>,
}

impl ListGroupsResponse {
    pub fn decode(buf: &mut Bytes, version: i16) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let error_code = buf.get_i16();
        let groups = read_compact_array(buf, version, |b, v| {
            let group_id = CompactString::deserialize(b);
            let protocol_type = CompactString::deserialize(b);
            let group_state = if v >= 4 { CompactString::read(b)? } else { None };
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(ListedGroup { group_id, protocol_type, group_state })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, error_code, groups })
    }
}
