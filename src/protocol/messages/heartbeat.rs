//! `Heartbeat` (v4) — spec §4.8.2, §6.1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{write_tagged_fields, CompactString};

pub struct HeartbeatRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
}

impl HeartbeatRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        CompactString::write(buf, &self.group_id);
        buf.put_i32(self.generation_id);
        CompactString::write(buf, &self.member_id);
        CompactString::write_nullable(buf, self.group_instance_id.as_deref());
        write_tagged_fields(buf);
    }
}

pub struct HeartbeatResponse {
    pub throttle_time_ms: i32,
    pub error_code: i16,
}

impl HeartbeatResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let error_code = buf.get_i16();
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, error_code })
    }
}
