//! `DeleteGroups` (v2) — spec §6.3 (admin surface).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactString};

pub struct DeleteGroupsRequest {
    pub groups_names: Vec<String>,
}

impl DeleteGroupsRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        write_compact_array(buf, &self.groups_names, |b, g| CompactString::write(b, g));
        write_tagged_fields(buf);
    }
}

pub struct DeletableGroupResult {
    pub group_id: String,
    pub error_code: i16,
}

pub struct DeleteGroupsResponse {
    pub throttle_time_ms: i32,
    pub results: Vec<DeletableGroupResult>,
}

impl DeleteGroupsResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let results = read_compact_array(buf, 2, |b, _| {
            let group_id = CompactString::deserialize(b);
            let error_code = b.get_i16();
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(DeletableGroupResult { group_id, error_code })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, results })
    }
}
