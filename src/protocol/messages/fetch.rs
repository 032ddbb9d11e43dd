//! `Fetch` (v17) — spec §4.8.4, §6.1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{read_compact_array, write_compact_array, write_tagged_fields, CompactNullableBytes, CompactString, KafkaUuid};

pub struct FetchRequestPartition {
    pub partition: i32,
    pub current_leader_epoch: i32,
    pub fetch_offset: i64,
    pub last_fetched_epoch: i32,
    pub log_start_offset: i64,
    pub partition_max_bytes: i32,
}

pub struct FetchRequestTopic {
    pub topic_id: uuid::Uuid,
    pub partitions: Vec<FetchRequestPartition>,
}

pub struct FetchRequest {
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub isolation_level: i8,
    pub session_id: i32,
    pub session_epoch: i32,
    pub topics: Vec<FetchRequestTopic>,
}

impl FetchRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_i32(self.max_wait_ms);
        buf.put_i32(self.min_bytes);
        buf.put_i32(self.max_bytes);
        buf.put_i8(self.isolation_level);
        buf.put_i32(self.session_id);
        buf.put_i32(self.session_epoch);
        write_compact_array(buf, &self.topics, |b, topic| {
            KafkaUuid::write(b, topic.topic_id);
            write_compact_array(b, &topic.partitions, |pb, part| {
                pb.put_i32(part.partition);
                pb.put_i32(part.current_leader_epoch);
                pb.put_i64(part.fetch_offset);
                pb.put_i32(part.last_fetched_epoch);
                pb.put_i64(part.log_start_offset);
                pb.put_i32(part.partition_max_bytes);
                write_tagged_fields(pb);
            });
            write_tagged_fields(b);
        });
        write_compact_array::<()>(buf, &[], |_, _| {}); // forgotten_topics_data
        CompactString::write(buf, ""); // rack_id
        write_tagged_fields(buf);
    }
}

pub struct AbortedTransaction {
    pub producer_id: i64,
    pub first_offset: i64,
}

pub struct FetchResponsePartition {
    pub partition_index: i32,
    pub error_code: i16,
    pub high_watermark: i64,
    pub last_stable_offset: i64,
    pub log_start_offset: i64,
    pub aborted_transactions: Vec<AbortedTransaction>,
    pub preferred_read_replica: i32,
    pub records: Option<Bytes>,
}

pub struct FetchResponseTopic {
    pub topic_id: uuid::Uuid,
    pub partitions: Vec<FetchResponsePartition>,
}

pub struct FetchResponse {
    pub throttle_time_ms: i32,
    pub error_code: i16,
    pub session_id: i32,
    pub responses: Vec<FetchResponseTopic>,
}

impl FetchResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let throttle_time_ms = buf.get_i32();
        let error_code = buf.get_i16();
        let session_id = buf.get_i32();
        let responses = read_compact_array(buf, 17, |b, _| {
            let topic_id = KafkaUuid::read(b)?;
            let partitions = read_compact_array(b, 17, |pb, _| {
                let partition_index = pb.get_i32();
                let error_code = pb.get_i16();
                let high_watermark = pb.get_i64();
                let last_stable_offset = pb.get_i64();
                let log_start_offset = pb.get_i64();
                let aborted_transactions = read_compact_array(pb, 17, |ab, _| {
                    let producer_id = ab.get_i64();
                    let first_offset = ab.get_i64();
                    crate::protocol::types::skip_tagged_fields(ab)?;
                    Ok(AbortedTransaction { producer_id, first_offset })
                })?;
                let preferred_read_replica = pb.get_i32();
                let records = CompactNullableBytes::read(pb)?;
                crate::protocol::types::skip_tagged_fields(pb)?;
                Ok(FetchResponsePartition {
                    partition_index,
                    error_code,
                    high_watermark,
                    last_stable_offset,
                    log_start_offset,
                    aborted_transactions,
                    preferred_read_replica,
                    records,
                })
            })?;
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok(FetchResponseTopic { topic_id, partitions })
        })?;
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { throttle_time_ms, error_code, session_id, responses })
    }
}
