//! `FindCoordinator` (v6) — spec §4.8.1, §6.1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactString};

pub struct FindCoordinatorRequest {
    pub key_type: i8, // 0 = group, 1 = transaction
    pub coordinator_keys: Vec<String>,
}

impl FindCoordinatorRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_i8(self.key_type);
        write_compact_array(buf, &self.coordinator_keys, |b, k| CompactString::write(b, k));
        write_tagged_fields(buf);
    }
}

pub struct Coordinator {
    pub key: String,
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    pub error_code: i16,
    pub error_message: Option<String>,
}

pub struct FindCoordinatorResponse {
    pub throttle_time_ms: i32,
    pub coordinators: Vec<Coordinator>,
}

impl FindCoordinatorResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let coordinators = read_compact_array(buf, 6, |b, _| {
            let key = CompactString::deserialize(b);
            let node_id = b.get_i32();
            let host = CompactString::deserialize(b);
            let port = b.get_i32();
            let error_code = b.get_i16();
            let error_message = CompactString::read(b)?;
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(Coordinator { key, node_id, host, port, error_code, error_message })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, coordinators })
    }
}
