//! `ApiVersions` (v3) — spec §4.6.1. Note the response uses the v0 header
//! (just a correlation id) even though the body itself is flexible
//! (spec §6.1).

use bytes::{Buf, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::messages::ApiVersionsTable;
use crate::protocol::types::{read_compact_array, write_tagged_fields, CompactString};

pub struct ApiVersionsRequest {
    pub client_software_name: String,
    pub client_software_version: String,
}

impl ApiVersionsRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        CompactString::write(buf, &self.client_software_name);
        CompactString::write(buf, &self.client_software_version);
        write_tagged_fields(buf);
    }
}

pub struct ApiVersionsResponse {
    pub error_code: i16,
    pub api_keys: Vec<(i16, i16, i16)>,
    pub throttle_time_ms: i32,
}

impl ApiVersionsResponse {
    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        let error_code = buf.get_i16();
        let api_keys = read_compact_array(buf, 3, |b, _| {
            let api_key = b.get_i16();
            let min_version = b.get_i16();
            let max_version = b.get_i16();
            crate::protocol::types::skip_tagged_fields(b)?;
            Ok((api_key, min_version, max_version))
        })?;
        let throttle_time_ms = buf.get_i32();
        crate::protocol::types::skip_tagged_fields(buf)?;
        Ok(Self { error_code, api_keys, throttle_time_ms })
    }

    pub fn into_table(self) -> ApiVersionsTable {
        let mut table = ApiVersionsTable::default();
        for (key, min, max) in self.api_keys {
            table.insert(key, min, max);
        }
        table
    }
}
