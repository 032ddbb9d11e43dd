//! Wire-level primitives (spec §4.1, §6.1): big-endian fixed ints, zig-zag
//! varints, regular/compact strings and bytes, arrays in all three shapes,
//! and the tagged-fields skip marker. Everything here is infallible to write
//! and fallible to read — a short buffer is `Error::OutOfBounds`.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Implemented by every wire type that can serialize itself into a growable
/// buffer. Mirrors the teacher's `Serialize` trait but returns `()` and
/// writes directly, avoiding the intermediate `Bytes` allocation per field.
pub trait Encode {
    fn encode(&self, buf: &mut BytesMut);
}

/// Implemented by every wire type that can parse itself from a cursor over
/// the response body. `version` lets versioned messages branch internally
/// rather than needing one struct per version (the teacher's per-version
/// struct approach doesn't scale to the ~18 APIs this client speaks).
pub trait Decode: Sized {
    fn decode(buf: &mut Bytes, version: i16) -> Result<Self>;
}

fn need(buf: &Bytes, n: usize, what: &'static str) -> Result<()> {
    if buf.remaining() < n {
        Err(Error::OutOfBounds(what))
    } else {
        Ok(())
    }
}

/// Unsigned base-128 varint, little-endian group order (protocol "UNSIGNED_VARINT").
pub fn read_unsigned_varint(buf: &mut Bytes) -> Result<u32> {
    let mut value: u32 = 0;
    let mut shift = 0;
    loop {
        need(buf, 1, "unsigned varint")?;
        let b = buf.get_u8();
        value |= ((b & 0x7f) as u32) << shift;
        if b & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 28 {
            return Err(Error::OutOfBounds("unsigned varint too long"));
        }
    }
    Ok(value)
}

pub fn write_unsigned_varint(buf: &mut BytesMut, mut value: u32) {
    loop {
        if value & !0x7f == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8(((value & 0x7f) | 0x80) as u8);
        value >>= 7;
    }
}

pub fn read_unsigned_varlong(buf: &mut Bytes) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift = 0;
    loop {
        need(buf, 1, "unsigned varlong")?;
        let b = buf.get_u8();
        value |= ((b & 0x7f) as u64) << shift;
        if b & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 63 {
            return Err(Error::OutOfBounds("unsigned varlong too long"));
        }
    }
    Ok(value)
}

pub fn write_unsigned_varlong(buf: &mut BytesMut, mut value: u64) {
    loop {
        if value & !0x7f == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8(((value & 0x7f) | 0x80) as u8);
        value >>= 7;
    }
}

/// Zig-zag signed varint, 32-bit: `(n<<1) XOR (n>>31)`.
pub fn read_varint(buf: &mut Bytes) -> Result<i32> {
    let raw = read_unsigned_varint(buf)?;
    Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
}

pub fn write_varint(buf: &mut BytesMut, value: i32) {
    let zigzag = ((value << 1) ^ (value >> 31)) as u32;
    write_unsigned_varint(buf, zigzag);
}

/// Zig-zag signed varint, 64-bit.
pub fn read_varlong(buf: &mut Bytes) -> Result<i64> {
    let raw = read_unsigned_varlong(buf)?;
    Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
}

pub fn write_varlong(buf: &mut BytesMut, value: i64) {
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    write_unsigned_varlong(buf, zigzag);
}

/// Regular (non-compact) nullable string: `i16 length` then UTF-8 bytes,
/// `-1` means null (decoded as `None`; callers that need a non-nullable
/// string unwrap with a default).
pub struct NullableString;

impl NullableString {
    pub fn write(buf: &mut BytesMut, s: Option<&str>) {
        match s {
            None => buf.put_i16(-1),
            Some(s) => {
                buf.put_i16(s.len() as i16);
                buf.put_slice(s.as_bytes());
            }
        }
    }

    pub fn read(buf: &mut Bytes) -> Result<Option<String>> {
        need(buf, 2, "string length")?;
        let len = buf.get_i16();
        if len < 0 {
            return Ok(None);
        }
        let len = len as usize;
        need(buf, len, "string bytes")?;
        let bytes = buf.copy_to_bytes(len);
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Convenience for the common non-nullable case (e.g. header client_id).
    pub fn deserialize(buf: &mut Bytes) -> String {
        Self::read(buf).ok().flatten().unwrap_or_default()
    }
}

/// Compact string: `uvarint(length+1)` then UTF-8 bytes, `0` means null.
pub struct CompactString;

impl CompactString {
    pub fn write(buf: &mut BytesMut, s: &str) {
        write_unsigned_varint(buf, s.len() as u32 + 1);
        buf.put_slice(s.as_bytes());
    }

    pub fn write_nullable(buf: &mut BytesMut, s: Option<&str>) {
        match s {
            None => write_unsigned_varint(buf, 0),
            Some(s) => Self::write(buf, s),
        }
    }

    pub fn read(buf: &mut Bytes) -> Result<Option<String>> {
        let len = read_unsigned_varint(buf)?;
        if len == 0 {
            return Ok(None);
        }
        let len = (len - 1) as usize;
        need(buf, len, "compact string bytes")?;
        let bytes = buf.copy_to_bytes(len);
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub fn deserialize(buf: &mut Bytes) -> String {
        Self::read(buf).ok().flatten().unwrap_or_default()
    }

    pub fn serialize(s: &str) -> Bytes {
        let mut b = BytesMut::new();
        Self::write(&mut b, s);
        b.freeze()
    }
}

/// Regular nullable bytes: `i32 length` + raw bytes, `-1` ⇒ null.
pub struct NullableBytes;

impl NullableBytes {
    pub fn write(buf: &mut BytesMut, b: Option<&[u8]>) {
        match b {
            None => buf.put_i32(-1),
            Some(b) => {
                buf.put_i32(b.len() as i32);
                buf.put_slice(b);
            }
        }
    }

    pub fn read(buf: &mut Bytes) -> Result<Option<Bytes>> {
        need(buf, 4, "bytes length")?;
        let len = buf.get_i32();
        if len < 0 {
            return Ok(None);
        }
        let len = len as usize;
        need(buf, len, "bytes")?;
        Ok(Some(buf.copy_to_bytes(len)))
    }
}

/// Compact nullable bytes: `uvarint(length+1)` + raw bytes, `0` ⇒ null.
pub struct CompactNullableBytes;

impl CompactNullableBytes {
    pub fn write(buf: &mut BytesMut, b: Option<&[u8]>) {
        match b {
            None => write_unsigned_varint(buf, 0),
            Some(b) => {
                write_unsigned_varint(buf, b.len() as u32 + 1);
                buf.put_slice(b);
            }
        }
    }

    pub fn read(buf: &mut Bytes) -> Result<Option<Bytes>> {
        let len = read_unsigned_varint(buf)?;
        if len == 0 {
            return Ok(None);
        }
        let len = (len - 1) as usize;
        need(buf, len, "compact bytes")?;
        Ok(Some(buf.copy_to_bytes(len)))
    }

    /// The shape used inside a record (key/value): a varint-length byte
    /// string where `-1` (encoded as zig-zag `1`) means null.
    pub fn deserialize(src: &mut Bytes) -> Vec<u8> {
        match read_varint(src) {
            Ok(len) if len >= 0 => {
                let len = len as usize;
                if src.remaining() < len {
                    return Vec::new();
                }
                src.copy_to_bytes(len).to_vec()
            }
            _ => Vec::new(),
        }
    }
}

/// Regular array: `i32 length` + elements (`-1` ⇒ null, surfaced as empty vec).
pub fn read_array<T>(buf: &mut Bytes, version: i16, read_one: impl Fn(&mut Bytes, i16) -> Result<T>) -> Result<Vec<T>> {
    need(buf, 4, "array length")?;
    let len = buf.get_i32();
    if len < 0 {
        return Ok(Vec::new());
    }
    let len = len as usize;
    let mut items = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        items.push(read_one(buf, version)?);
    }
    Ok(items)
}

pub fn write_array<T>(buf: &mut BytesMut, items: &[T], write_one: impl Fn(&mut BytesMut, &T)) {
    buf.put_i32(items.len() as i32);
    for item in items {
        write_one(buf, item);
    }
}

/// Compact array: `uvarint(length+1)` + elements, `0` ⇒ null (empty vec).
pub fn read_compact_array<T>(
    buf: &mut Bytes,
    version: i16,
    read_one: impl Fn(&mut Bytes, i16) -> Result<T>,
) -> Result<Vec<T>> {
    let len = read_unsigned_varint(buf)?;
    if len == 0 {
        return Ok(Vec::new());
    }
    let len = (len - 1) as usize;
    let mut items = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        items.push(read_one(buf, version)?);
    }
    Ok(items)
}

pub fn write_compact_array<T>(buf: &mut BytesMut, items: &[T], write_one: impl Fn(&mut BytesMut, &T)) {
    write_unsigned_varint(buf, items.len() as u32 + 1);
    for item in items {
        write_one(buf, item);
    }
}

/// Varint-length array, used only inside a record's header list: `zig-zag
/// varint length` + elements.
pub fn read_varint_array<T>(buf: &mut Bytes, read_one: impl Fn(&mut Bytes) -> Result<T>) -> Result<Vec<T>> {
    let len = read_varint(buf)?;
    if len < 0 {
        return Ok(Vec::new());
    }
    let len = len as usize;
    let mut items = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        items.push(read_one(buf)?);
    }
    Ok(items)
}

pub fn write_varint_array<T>(buf: &mut BytesMut, items: &[T], write_one: impl Fn(&mut BytesMut, &T)) {
    write_varint(buf, items.len() as i32);
    for item in items {
        write_one(buf, item);
    }
}

/// Appends an empty tagged-fields marker: a single zero byte.
pub fn write_tagged_fields(buf: &mut BytesMut) {
    buf.put_u8(0);
}

/// Reads and discards tagged fields, whatever they contain (spec §4.1: "skip").
pub fn skip_tagged_fields(buf: &mut Bytes) -> Result<()> {
    let count = read_unsigned_varint(buf)?;
    for _ in 0..count {
        let _tag = read_unsigned_varint(buf)?;
        let size = read_unsigned_varint(buf)? as usize;
        need(buf, size, "tagged field body")?;
        buf.advance(size);
    }
    Ok(())
}

/// A 16-byte Kafka topic UUID, written/read big-endian like every other
/// fixed-width field on the wire.
pub struct KafkaUuid;

impl KafkaUuid {
    pub fn write(buf: &mut BytesMut, id: uuid::Uuid) {
        buf.put_slice(id.as_bytes());
    }

    pub fn read(buf: &mut Bytes) -> Result<uuid::Uuid> {
        need(buf, 16, "uuid")?;
        let mut bytes = [0u8; 16];
        buf.copy_to_slice(&mut bytes);
        Ok(uuid::Uuid::from_bytes(bytes))
    }

    /// Legacy string-returning accessor kept for call sites that still want
    /// a displayable id rather than a typed `Uuid`.
    pub fn deserialize(buf: &mut Bytes) -> String {
        Self::read(buf).map(|u| u.to_string()).unwrap_or_default()
    }

    pub fn serialize(id: &str) -> Bytes {
        let uuid = uuid::Uuid::parse_str(id).unwrap_or_default();
        Bytes::copy_from_slice(uuid.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_varint_roundtrip() {
        for v in [0u32, 1, 127, 128, 16383, 16384, u32::MAX] {
            let mut buf = BytesMut::new();
            write_unsigned_varint(&mut buf, v);
            let mut bytes = buf.freeze();
            assert_eq!(read_unsigned_varint(&mut bytes).unwrap(), v);
        }
    }

    #[test]
    fn zigzag_varint_roundtrip() {
        for v in [0i32, -1, 1, -64, 64, i32::MIN, i32::MAX] {
            let mut buf = BytesMut::new();
            write_varint(&mut buf, v);
            let mut bytes = buf.freeze();
            assert_eq!(read_varint(&mut bytes).unwrap(), v);
        }
    }

    #[test]
    fn zigzag_varlong_roundtrip() {
        for v in [0i64, -1, 1, i64::MIN, i64::MAX] {
            let mut buf = BytesMut::new();
            write_varlong(&mut buf, v);
            let mut bytes = buf.freeze();
            assert_eq!(read_varlong(&mut bytes).unwrap(), v);
        }
    }

    #[test]
    fn compact_string_roundtrip() {
        let mut buf = BytesMut::new();
        CompactString::write(&mut buf, "hello-kafka");
        let mut bytes = buf.freeze();
        assert_eq!(CompactString::read(&mut bytes).unwrap().as_deref(), Some("hello-kafka"));
    }

    #[test]
    fn compact_string_null() {
        let mut buf = BytesMut::new();
        CompactString::write_nullable(&mut buf, None);
        let mut bytes = buf.freeze();
        assert_eq!(CompactString::read(&mut bytes).unwrap(), None);
    }

    #[test]
    fn out_of_bounds_read() {
        let mut bytes = Bytes::from_static(&[0x01]);
        assert!(NullableBytes::read(&mut bytes).is_err());
    }

    #[test]
    fn tagged_fields_skip() {
        let mut buf = BytesMut::new();
        write_unsigned_varint(&mut buf, 1);
        write_unsigned_varint(&mut buf, 5); // tag
        write_unsigned_varint(&mut buf, 2); // size
        buf.put_slice(&[1, 2]);
        let mut bytes = buf.freeze();
        assert!(skip_tagged_fields(&mut bytes).is_ok());
        assert_eq!(bytes.remaining(), 0);
    }
}
