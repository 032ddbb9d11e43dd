use crate::error::{Error, Result};

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    zstd::stream::encode_all(data, 0).map_err(|e| Error::Codec(format!("zstd compress: {e}")))
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    zstd::stream::decode_all(data).map_err(|e| Error::Codec(format!("zstd decompress: {e}")))
}
