use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;

use crate::error::{Error, Result};

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::Codec(format!("gzip compress: {e}")))?;
    encoder.finish().map_err(|e| Error::Codec(format!("gzip finish: {e}")))
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Codec(format!("gzip decompress: {e}")))?;
    Ok(out)
}
