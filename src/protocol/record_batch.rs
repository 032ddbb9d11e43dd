//! Records batch v2 codec (spec §3, §4.2, §6.1). Encodes a slice of
//! `OutgoingRecord`s into the on-wire batch format used by `Produce` and
//! understood by `Fetch`, with optional en-bloc compression selected by the
//! attribute bitmask.
//!
//! Layout (spec §6.1):
//! ```text
//! i64 first_offset
//! i32 length
//! i32 partition_leader_epoch
//! i8  magic = 2
//! u32 crc32c                 ; over bytes from attributes to end
//! i16 attributes
//! i32 last_offset_delta
//! i64 first_timestamp, max_timestamp
//! i64 producer_id, i16 producer_epoch, i32 first_sequence
//! i32 records_count
//! records[N]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::compression::Compression;
use crate::protocol::types::{read_varint, read_varint_array, write_varint, write_varint_array};

const MAGIC: i8 = 2;

/// A record as the producer hands it to the batch codec, already
/// partitioned but not yet timestamped relative to the batch.
#[derive(Debug, Clone)]
pub struct OutgoingRecord {
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: Vec<(String, Vec<u8>)>,
    pub timestamp: Option<i64>,
}

/// A record as decoded off the wire, offsets and timestamp already resolved
/// against the batch's base offset/timestamp.
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub offset: i64,
    pub timestamp: i64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: Vec<(String, Vec<u8>)>,
}

pub struct EncodeOpts {
    pub compression: Compression,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub first_sequence: i32,
    pub base_offset: i64,
    pub partition_leader_epoch: i32,
}

impl Default for EncodeOpts {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            producer_id: -1,
            producer_epoch: -1,
            first_sequence: -1,
            base_offset: 0,
            partition_leader_epoch: -1,
        }
    }
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Encodes `messages` into a single records batch (spec §4.2 step 1-4).
pub fn encode_batch(messages: &[OutgoingRecord], opts: &EncodeOpts) -> Result<Bytes> {
    if messages.is_empty() {
        return Err(Error::User("cannot encode an empty records batch".to_string()));
    }

    let first_timestamp = messages[0].timestamp.unwrap_or_else(now_millis);
    let max_timestamp = messages
        .iter()
        .map(|m| m.timestamp.unwrap_or(first_timestamp))
        .max()
        .unwrap_or(first_timestamp);

    let mut records_buf = BytesMut::new();
    for (i, msg) in messages.iter().enumerate() {
        encode_record(&mut records_buf, msg, i as i64, first_timestamp);
    }

    let (attributes_compression, record_bytes) = if opts.compression != Compression::None {
        let compressed = opts.compression.compress(&records_buf)?;
        (opts.compression.bitmask(), Bytes::from(compressed))
    } else {
        (0, records_buf.freeze())
    };

    let mut body = BytesMut::new();
    body.put_i16(attributes_compression);
    body.put_i32((messages.len() - 1) as i32); // last_offset_delta
    body.put_i64(first_timestamp);
    body.put_i64(max_timestamp);
    body.put_i64(opts.producer_id);
    body.put_i16(opts.producer_epoch);
    body.put_i32(opts.first_sequence);
    body.put_i32(messages.len() as i32);
    body.put_slice(&record_bytes);

    let crc = crate::protocol::crc32c::crc32c(&body);

    let mut out = BytesMut::new();
    out.put_i64(opts.base_offset);
    // length = everything after this field: partition_leader_epoch(4) + magic(1) + crc(4) + body
    let length = 4 + 1 + 4 + body.len() as i32;
    out.put_i32(length);
    out.put_i32(opts.partition_leader_epoch);
    out.put_i8(MAGIC);
    out.put_u32(crc);
    out.put_slice(&body);

    Ok(out.freeze())
}

fn encode_record(buf: &mut BytesMut, msg: &OutgoingRecord, offset_delta: i64, first_timestamp: i64) {
    let timestamp_delta = msg.timestamp.unwrap_or(first_timestamp) - first_timestamp;

    let mut body = BytesMut::new();
    body.put_i8(0); // attributes, unused
    write_varint(&mut body, timestamp_delta as i32);
    write_varint(&mut body, offset_delta as i32);

    match &msg.key {
        Some(k) => {
            write_varint(&mut body, k.len() as i32);
            body.put_slice(k);
        }
        None => write_varint(&mut body, -1),
    }

    write_varint(&mut body, msg.value.len() as i32);
    body.put_slice(&msg.value);

    write_varint_array(&mut body, &msg.headers, |b, (k, v)| {
        write_varint(b, k.len() as i32);
        b.put_slice(k.as_bytes());
        write_varint(b, v.len() as i32);
        b.put_slice(v);
    });

    write_varint(buf, body.len() as i32);
    buf.put_slice(&body);
}

/// A single decoded batch plus the offset the fetch loop should advance to
/// (spec §4.8.4: `next_offset = first_offset + last_offset_delta + 1`).
pub struct DecodedBatch {
    pub records: Vec<DecodedRecord>,
    pub next_offset: i64,
}

/// Decodes one records batch from `buf`, advancing `buf` past it. A
/// truncated tail (fewer declared bytes than remain, or a batch whose
/// declared length exceeds the remaining bytes) is reported distinctly so
/// the caller can stop without treating it as corruption (spec §4.9 Open
/// Questions: server-side truncation to honor `partitionMaxBytes`).
pub fn decode_batch(buf: &mut Bytes) -> Result<Option<DecodedBatch>> {
    if buf.remaining() < 12 {
        return Ok(None);
    }
    let mut peek = buf.clone();
    let base_offset = peek.get_i64();
    let length = peek.get_i32();

    if length < 0 || (length as usize) > peek.remaining() {
        // Declared length runs past what the broker actually sent: this is
        // the truncated-tail case (spec §4.9), not corruption. Stop here.
        return Ok(None);
    }

    buf.advance(12); // base_offset + length already consumed from peek
    let mut body = buf.copy_to_bytes(length as usize);

    let partition_leader_epoch = body.get_i32();
    let magic = body.get_i8();
    if magic != MAGIC {
        return Err(Error::Response(vec![crate::error::ProtocolError {
            api_id: 1,
            api_code: -1,
            message: format!("unsupported record batch magic byte {magic}"),
            can_retry: false,
            has_stale_metadata: false,
            needs_rejoin: false,
            rebalance_in_progress: false,
            unknown_member_id: false,
            member_id: None,
        }]));
    }
    let expected_crc = body.get_u32();
    let crc_checked_region = body.clone();
    let actual_crc = crate::protocol::crc32c::crc32c(&crc_checked_region);
    if actual_crc != expected_crc {
        return Err(Error::Response(vec![crate::error::ProtocolError {
            api_id: 1,
            api_code: -1,
            message: "records batch CRC-32C mismatch".to_string(),
            can_retry: false,
            has_stale_metadata: false,
            needs_rejoin: false,
            rebalance_in_progress: false,
            unknown_member_id: false,
            member_id: None,
        }]));
    }

    let attributes = body.get_i16();
    let last_offset_delta = body.get_i32();
    let first_timestamp = body.get_i64();
    let _max_timestamp = body.get_i64();
    let _producer_id = body.get_i64();
    let _producer_epoch = body.get_i16();
    let _base_sequence = body.get_i32();
    let records_count = body.get_i32();

    let compression = Compression::from_bitmask(attributes)?;
    let mut record_area = if compression != Compression::None {
        Bytes::from(compression.decompress(&body)?)
    } else {
        body
    };

    let mut records = Vec::with_capacity(records_count.max(0) as usize);
    for _ in 0..records_count {
        if record_area.remaining() == 0 {
            // Concatenated-batches tail truncation inside the records area
            // itself: stop without erroring (spec §4.2).
            break;
        }
        match decode_record(&mut record_area, base_offset, first_timestamp) {
            Ok(record) => records.push(record),
            Err(_) => break,
        }
    }

    let _ = partition_leader_epoch;
    Ok(Some(DecodedBatch {
        records,
        next_offset: base_offset + last_offset_delta as i64 + 1,
    }))
}

fn decode_record(buf: &mut Bytes, base_offset: i64, first_timestamp: i64) -> Result<DecodedRecord> {
    let length = read_varint(buf)?;
    if length < 0 || (length as usize) > buf.remaining() {
        return Err(Error::OutOfBounds("record body"));
    }
    let mut body = buf.copy_to_bytes(length as usize);

    let _attributes = body.get_i8();
    let timestamp_delta = read_varint(&mut body)?;
    let offset_delta = read_varint(&mut body)?;
    let key_length = read_varint(&mut body)?;
    let key = if key_length < 0 {
        None
    } else {
        Some(body.copy_to_bytes(key_length as usize).to_vec())
    };
    let value_length = read_varint(&mut body)?;
    let value = if value_length > 0 {
        body.copy_to_bytes(value_length as usize).to_vec()
    } else {
        Vec::new()
    };
    let headers = read_varint_array(&mut body, |b| {
        let klen = read_varint(b)?;
        let key = if klen > 0 {
            String::from_utf8_lossy(&b.copy_to_bytes(klen as usize)).into_owned()
        } else {
            String::new()
        };
        let vlen = read_varint(b)?;
        let value = if vlen > 0 {
            b.copy_to_bytes(vlen as usize).to_vec()
        } else {
            Vec::new()
        };
        Ok((key, value))
    })?;

    Ok(DecodedRecord {
        offset: base_offset + offset_delta as i64,
        timestamp: first_timestamp + timestamp_delta,
        key,
        value,
        headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_messages() -> Vec<OutgoingRecord> {
        vec![
            OutgoingRecord {
                key: Some(b"k0".to_vec()),
                value: b"v0".to_vec(),
                headers: vec![("h1".to_string(), b"hv1".to_vec())],
                timestamp: Some(1_000),
            },
            OutgoingRecord {
                key: None,
                value: b"v1".to_vec(),
                headers: vec![],
                timestamp: Some(1_050),
            },
        ]
    }

    #[test]
    fn roundtrip_uncompressed() {
        let msgs = sample_messages();
        let encoded = encode_batch(&msgs, &EncodeOpts::default()).unwrap();
        let mut buf = encoded;
        let decoded = decode_batch(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].key.as_deref(), Some(&b"k0"[..]));
        assert_eq!(decoded.records[0].value, b"v0");
        assert_eq!(decoded.records[0].headers, vec![("h1".to_string(), b"hv1".to_vec())]);
        assert_eq!(decoded.records[1].key, None);
        assert_eq!(decoded.next_offset, 2);
    }

    #[test]
    fn roundtrip_compressed_zstd() {
        let msgs = sample_messages();
        let opts = EncodeOpts { compression: Compression::Zstd, ..Default::default() };
        let encoded = encode_batch(&msgs, &opts).unwrap();
        let mut buf = encoded;
        let decoded = decode_batch(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[1].value, b"v1");
    }

    #[test]
    fn crc_is_verified() {
        let msgs = sample_messages();
        let mut encoded = encode_batch(&msgs, &EncodeOpts::default()).unwrap().to_vec();
        // Flip a byte after the CRC field (offset 8+4+4+1+4 = 21).
        encoded[25] ^= 0xff;
        let mut buf = Bytes::from(encoded);
        assert!(decode_batch(&mut buf).is_err());
    }

    #[test]
    fn truncated_tail_is_not_an_error() {
        let msgs = sample_messages();
        let encoded = encode_batch(&msgs, &EncodeOpts::default()).unwrap();
        let truncated = encoded.slice(..encoded.len() - 3);
        let mut buf = truncated;
        assert!(decode_batch(&mut buf).unwrap().is_none());
    }

    #[test]
    fn first_sequence_progression() {
        // spec P5: sizes [3,2,4] all to (T,0) => first_sequence [0,3,5], final sequences=9
        let sizes = [3usize, 2, 4];
        let mut next_sequence = 0i32;
        let mut first_sequences = Vec::new();
        for size in sizes {
            first_sequences.push(next_sequence);
            next_sequence += size as i32;
        }
        assert_eq!(first_sequences, vec![0, 3, 5]);
        assert_eq!(next_sequence, 9);
    }
}
