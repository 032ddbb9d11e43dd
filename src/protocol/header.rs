//! Request header v2 and response header v0/v1 (spec §4.3, §6.1).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::types::{skip_tagged_fields, write_tagged_fields, NullableString};

/// ```text
/// i16 api_key
/// i16 api_version
/// i32 correlation_id
/// nullable_string client_id
/// tagged_fields
/// ```
pub struct RequestHeader {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

impl RequestHeader {
    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_i16(self.api_key);
        buf.put_i16(self.api_version);
        buf.put_i32(self.correlation_id);
        NullableString::write(buf, self.client_id.as_deref());
        write_tagged_fields(buf);
    }

    pub fn read(buf: &mut Bytes) -> Result<Self> {
        let api_key = buf.get_i16();
        let api_version = buf.get_i16();
        let correlation_id = buf.get_i32();
        let client_id = NullableString::read(buf)?;
        skip_tagged_fields(buf)?;
        Ok(Self { api_key, api_version, correlation_id, client_id })
    }
}

/// Response header v0: just the correlation id (used by `ApiVersions`, spec §4.3).
pub struct ResponseHeaderV0 {
    pub correlation_id: i32,
}

impl ResponseHeaderV0 {
    pub fn read(buf: &mut Bytes) -> Self {
        Self { correlation_id: buf.get_i32() }
    }
}

/// Response header v1: correlation id plus tagged fields, used by every
/// other "flexible" response.
pub struct ResponseHeaderV1 {
    pub correlation_id: i32,
}

impl ResponseHeaderV1 {
    pub fn read(buf: &mut Bytes) -> Result<Self> {
        let correlation_id = buf.get_i32();
        skip_tagged_fields(buf)?;
        Ok(Self { correlation_id })
    }
}

/// Reads the response header appropriate for whether the API/version in use
/// is flexible, returning just the correlation id (the caller already knows
/// it from the pending-map lookup; this exists to advance the cursor).
pub fn read_response_header(buf: &mut Bytes, flexible: bool) -> Result<i32> {
    if flexible {
        Ok(ResponseHeaderV1::read(buf)?.correlation_id)
    } else {
        Ok(ResponseHeaderV0::read(buf).correlation_id)
    }
}
