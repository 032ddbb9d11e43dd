//! `InitProducerId` (v5) — spec §4.7.1, §6.1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{write_tagged_fields, CompactString};

pub struct InitProducerIdRequest {
    pub transactional_id: Option<String>,
    pub transaction_timeout_ms: i32,
    pub producer_id: i64,
    pub producer_epoch: i16,
}

impl InitProducerIdRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        CompactString::write_nullable(buf, self.transactional_id.as_deref());
        buf.put_i32(self.transaction_timeout_ms);
        buf.put_i64(self.producer_id);
        buf.put_i16(self.producer_epoch);
        write_tagged_fields(buf);
    }
}

pub struct InitProducerIdResponse {
    pub throttle_time_ms: i32,
    pub error_code: i16,
    pub producer_id: i64,
    pub producer_epoch: i16,
}

impl InitProducerIdResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let error_code = buf.get_i16();
        let producer_id = buf.get_i64();
        let producer_epoch = buf.get_i16();
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, error_code, producer_id, producer_epoch })
    }
}
