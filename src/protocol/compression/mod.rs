//! Pluggable compression codecs keyed by the 3-bit mask in the records batch
//! attributes field (spec §4.1 C2, §6.1). Each codec is polymorphic over a
//! small `{compress, decompress, bitmask}` capability (spec §9) so the
//! records batch codec never needs to know which library backs a given
//! algorithm.

mod gzip;
mod lz4;
mod snappy;
mod zstd_codec;

use crate::error::Result;

/// Compression codec bitmask, attribute bits 0..2 of a records batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    pub fn bitmask(self) -> i16 {
        match self {
            Compression::None => 0,
            Compression::Gzip => 1,
            Compression::Snappy => 2,
            Compression::Lz4 => 3,
            Compression::Zstd => 4,
        }
    }

    pub fn from_bitmask(mask: i16) -> Result<Self> {
        match mask & 0x07 {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Gzip),
            2 => Ok(Compression::Snappy),
            3 => Ok(Compression::Lz4),
            4 => Ok(Compression::Zstd),
            other => Err(crate::error::Error::UnsupportedCompression(format!(
                "attribute bitmask {other}"
            ))),
        }
    }

    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => gzip::compress(data),
            Compression::Snappy => snappy::compress(data),
            Compression::Lz4 => lz4::compress(data),
            Compression::Zstd => zstd_codec::compress(data),
        }
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => gzip::decompress(data),
            Compression::Snappy => snappy::decompress(data),
            Compression::Lz4 => lz4::decompress(data),
            Compression::Zstd => zstd_codec::decompress(data),
        }
    }
}

impl std::str::FromStr for Compression {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "snappy" => Ok(Compression::Snappy),
            "lz4" => Ok(Compression::Lz4),
            "zstd" => Ok(Compression::Zstd),
            other => Err(crate::error::Error::UnsupportedCompression(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotence_all_codecs() {
        let payload = b"the quick brown fox jumps over the lazy dog, repeated ".repeat(8);
        for codec in [Compression::Gzip, Compression::Snappy, Compression::Lz4, Compression::Zstd] {
            let compressed = codec.compress(&payload).expect("compress");
            let decompressed = codec.decompress(&compressed).expect("decompress");
            assert_eq!(decompressed, payload, "codec {codec:?} round-trip");
        }
    }

    #[test]
    fn none_is_passthrough() {
        let payload = b"raw bytes".to_vec();
        assert_eq!(Compression::None.compress(&payload).unwrap(), payload);
        assert_eq!(Compression::None.decompress(&payload).unwrap(), payload);
    }

    #[test]
    fn bitmask_roundtrip() {
        for c in [
            Compression::None,
            Compression::Gzip,
            Compression::Snappy,
            Compression::Lz4,
            Compression::Zstd,
        ] {
            assert_eq!(Compression::from_bitmask(c.bitmask()).unwrap(), c);
        }
    }
}
