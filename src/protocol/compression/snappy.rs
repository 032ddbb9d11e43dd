use crate::error::{Error, Result};

/// Kafka's snappy framing wraps raw snappy block data; this client only
/// needs to interoperate with producers/consumers speaking the same framing,
/// so a single un-framed block is used (matching `snap`'s default reader on
/// data produced by its own writer).
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = snap::raw::Encoder::new();
    encoder
        .compress_vec(data)
        .map_err(|e| Error::Codec(format!("snappy compress: {e}")))
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = snap::raw::Decoder::new();
    decoder
        .decompress_vec(data)
        .map_err(|e| Error::Codec(format!("snappy decompress: {e}")))
}
