//! `DeleteTopics` (v6) — spec §6.3 (admin surface).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactString, KafkaUuid};

pub struct DeleteTopicsRequestTopic {
    pub name: Option<String>,
    pub topic_id: uuid::Uuid,
}

pub struct DeleteTopicsRequest {
    pub topics: Vec<DeleteTopicsRequestTopic>,
    pub timeout_ms: i32,
}

impl DeleteTopicsRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        write_compact_array(buf, &self.topics, |b, t| {
            CompactString::write_nullable(b, t.name.as_deref());
            KafkaUuid::write(b, t.topic_id);
            write_tagged_fields(b);
        });
        buf.put_i32(self.timeout_ms);
        write_tagged_fields(buf);
    }
}

pub struct DeleteTopicsResponseTopic {
    pub name: Option<String>,
    pub topic_id: uuid::Uuid,
    pub error_code: i16,
    pub error_message: Option<String>,
}

pub struct DeleteTopicsResponse {
    pub throttle_time_ms: i32,
    pub responses: Vec<DeleteTopicsResponseTopic>,
}

impl DeleteTopicsResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let responses = read_compact_array(buf, 6, |b, _| {
            let name = CompactString::read(b)?;
            let topic_id = KafkaUuid::read(b)?;
            let error_code = b.get_i16();
            let error_message = CompactString::read(b)?;
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(DeleteTopicsResponseTopic { name, topic_id, error_code, error_message })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, responses })
    }
}
