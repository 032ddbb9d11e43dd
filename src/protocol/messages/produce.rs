//! `Produce` (v11) — spec §4.7.3, §6.1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{
    read_compact_array, write_compact_array, write_tagged_fields, CompactNullableBytes, CompactString,
};

pub struct ProducePartitionData {
    pub index: i32,
    pub records: Bytes,
}

pub struct ProduceTopicData {
    pub name: String,
    pub partition_data: Vec<ProducePartitionData>,
}

pub struct ProduceRequest {
    pub transactional_id: Option<String>,
    pub acks: i16,
    pub timeout_ms: i32,
    pub topic_data: Vec<ProduceTopicData>,
}

impl ProduceRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        CompactString::write_nullable(buf, self.transactional_id.as_deref());
        buf.put_i16(self.acks);
        buf.put_i32(self.timeout_ms);
        write_compact_array(buf, &self.topic_data, |b, topic| {
            CompactString::write(b, &topic.name);
            write_compact_array(b, &topic.partition_data, |pb, part| {
                pb.put_i32(part.index);
                CompactNullableBytes::write(pb, Some(&part.records));
                write_tagged_fields(pb);
            });
            write_tagged_fields(b);
        });
        write_tagged_fields(buf);
    }
}

pub struct ProducePartitionResponse {
    pub index: i32,
    pub error_code: i16,
    pub base_offset: i64,
    pub log_append_time_ms: i64,
    pub log_start_offset: i64,
    pub error_message: Option<String>,
}

pub struct ProduceTopicResponse {
    pub name: String,
    pub partition_responses: Vec<ProducePartitionResponse>,
}

pub struct ProduceResponse {
    pub responses: Vec<ProduceTopicResponse>,
    pub throttle_time_ms: i32,
}

impl ProduceResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let responses = read_compact_array(buf, 11, |b, _| {
            let name = CompactString::deserialize(b);
            let partition_responses = read_compact_array(b, 11, |pb, _| {
                let index = pb.get_i32();
                let error_code = pb.get_i16();
                let base_offset = pb.get_i64();
                let log_append_time_ms = pb.get_i64();
                let log_start_offset = pb.get_i64();
                let _record_errors: Vec<()> = read_compact_array(pb, 11, |rb, _| {
                    let _index = rb.get_i32();
                    let _message = CompactString::read(rb)?;
                    crate::protocol::types::skip_tagged_fields(rb)?;
                    Ok(())
                })?;
                let error_message = CompactString::read(pb)?;
                crate::protocol::types::skip_tagged_fields(pb)?;
                Ok(ProducePartitionResponse {
                    index,
                    error_code,
                    base_offset,
                    log_append_time_ms,
                    log_start_offset,
                    error_message,
                })
            })?;
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(ProduceTopicResponse { name, partition_responses })
        })?;
        let throttle_time_ms = buf.get_i32();
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { responses, throttle_time_ms })
    }
}
