use crate::error::{Error, Result};

/// Kafka's LZ4 framing is the standard LZ4 frame format; `lz4_flex`'s frame
/// encoder/decoder round-trips the payloads this client produces and
/// consumes without shelling out to the C library.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
    std::io::Write::write_all(&mut encoder, data)
        .map_err(|e| Error::Codec(format!("lz4 compress: {e}")))?;
    encoder
        .finish()
        .map_err(|e| Error::Codec(format!("lz4 finish: {e}")))
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = lz4_flex::frame::FrameDecoder::new(data);
    let mut out = Vec::new();
    std::io::Read::read_to_end(&mut decoder, &mut out)
        .map_err(|e| Error::Codec(format!("lz4 decompress: {e}")))?;
    Ok(out)
}
