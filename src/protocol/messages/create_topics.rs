//! `CreateTopics` (v7) — spec §6.3 (admin surface).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactString, KafkaUuid};

pub struct CreateTopicsRequestTopic {
    pub name: String,
    pub num_partitions: i32,
    pub replication_factor: i16,
}

pub struct CreateTopicsRequest {
    pub topics: Vec<CreateTopicsRequestTopic>,
    pub timeout_ms: i32,
    pub validate_only: bool,
}

impl CreateTopicsRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        write_compact_array(buf, &self.topics, |b, t| {
            CompactString::write(b, &t.name);
            b.put_i32(t.num_partitions);
            b.put_i16(t.replication_factor);
            write_compact_array::<()>(b, &[], |_, _| {}); // assignments
            write_compact_array::<()>(b, &[], |_, _| {}); // configs
            write_tagged_fields(b);
        });
        buf.put_i32(self.timeout_ms);
        buf.put_u8(self.validate_only as u8);
        write_tagged_fields(buf);
    }
}

pub struct CreateTopicsResponseTopic {
    pub name: String,
    pub topic_id: uuid::Uuid,
    pub error_code: i16,
    pub error_message: Option<String>,
    pub num_partitions: i32,
    pub replication_factor: i16,
}

pub struct CreateTopicsResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<CreateTopicsResponseTopic>,
}

impl CreateTopicsResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let topics = read_compact_array(buf, 7, |b, _| {
            let name = CompactString::deserialize(b);
            let topic_id = KafkaUuid::read(b)?;
            let error_code = b.get_i16();
            let error_message = CompactString::read(b)?;
            let num_partitions = b.get_i32();
            let replication_factor = b.get_i16();
            let _configs: Vec<()> = read_compact_array(b, 7, |cb, _| {
                let _name = CompactString::deserialize(cb);
                let _value = CompactString::read(cb)?;
                let _read_only = cb.get_u8();
                let _config_source = cb.get_i8();
                let _is_sensitive = cb.get_u8();
                crate::protocol::types::skip_tagged_fields(cb)?;
                Ok(())
            })?;
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(CreateTopicsResponseTopic { name, topic_id, error_code, error_message, num_partitions, replication_factor })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, topics })
    }
}
