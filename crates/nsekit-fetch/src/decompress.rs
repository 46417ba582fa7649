//! Content-sniffing decompression for response bodies.
//!
//! The exchange may answer with gzip, deflate, brotli or zstd bodies, and the
//! HTTP layer may or may not have decoded them already. [`decompress`] tries
//! each codec in a fixed order and returns the input untouched when none
//! applies.

use flate2::read::MultiGzDecoder;
use flate2::{Decompress, FlushDecompress, Status};
use std::io::Read;
use thiserror::Error;

/// Gzip member header magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Internal buffer size for the brotli reader.
const BROTLI_BUFFER: usize = 4096;

/// Codec that produced a decompressed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Gzip (RFC 1952).
    Gzip,
    /// Zlib-wrapped deflate (RFC 1950).
    Zlib,
    /// Raw deflate stream without a header (RFC 1951).
    Deflate,
    /// Brotli (RFC 7932).
    Brotli,
    /// Zstandard frames.
    Zstd,
    /// No codec matched; the bytes are returned as-is.
    Identity,
}

impl Codec {
    /// Returns the codec name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
            Self::Deflate => "deflate",
            Self::Brotli => "brotli",
            Self::Zstd => "zstd",
            Self::Identity => "identity",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reasons a single codec attempt was rejected.
#[derive(Error, Debug)]
enum DecompressError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("deflate error: {0}")]
    Deflate(#[from] flate2::DecompressError),

    #[error("stream ended before its end marker")]
    Truncated,

    #[error("{0} trailing bytes after end of stream")]
    TrailingData(usize),

    #[error("codec produced no output")]
    EmptyOutput,
}

/// Decompresses a response body, returning the input unchanged when no
/// codec applies.
///
/// The order is gzip (only when the magic bytes match), zlib, raw deflate,
/// brotli, zstd. The first codec that decodes the whole input wins. A codec
/// that yields nothing from non-empty input does not count as a match.
///
/// # Example
///
/// ```
/// use nsekit_fetch::decompress;
///
/// let plain = br#"{"s":"Ok"}"#;
/// assert_eq!(decompress(plain), plain.to_vec());
/// ```
#[must_use]
pub fn decompress(data: &[u8]) -> Vec<u8> {
    decompress_with_codec(data).0
}

/// Returns which codec [`decompress`] would use for the given bytes.
#[must_use]
pub fn detect_codec(data: &[u8]) -> Codec {
    decompress_with_codec(data).1
}

/// Decompresses a response body and reports the codec that matched.
#[must_use]
pub fn decompress_with_codec(data: &[u8]) -> (Vec<u8>, Codec) {
    if data.is_empty() {
        return (Vec::new(), Codec::Identity);
    }

    if data.starts_with(&GZIP_MAGIC) {
        match non_empty(gunzip(data)) {
            Ok(out) => return (out, Codec::Gzip),
            Err(e) => tracing::trace!(error = %e, "gzip magic present but decoding failed"),
        }
    }

    let attempts: [(Codec, fn(&[u8]) -> Result<Vec<u8>, DecompressError>); 4] = [
        (Codec::Zlib, |d| inflate(d, true)),
        (Codec::Deflate, |d| inflate(d, false)),
        (Codec::Brotli, unbrotli),
        (Codec::Zstd, unzstd),
    ];

    for (codec, attempt) in attempts {
        match non_empty(attempt(data)) {
            Ok(out) => return (out, codec),
            Err(e) => tracing::trace!(%codec, error = %e, "codec rejected"),
        }
    }

    (data.to_vec(), Codec::Identity)
}

fn non_empty(result: Result<Vec<u8>, DecompressError>) -> Result<Vec<u8>, DecompressError> {
    match result {
        Ok(out) if out.is_empty() => Err(DecompressError::EmptyOutput),
        other => other,
    }
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>, DecompressError> {
    let mut out = Vec::new();
    MultiGzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Inflates a zlib (`zlib_header = true`) or raw deflate stream.
///
/// The stream must reach its end marker and consume every input byte.
fn inflate(data: &[u8], zlib_header: bool) -> Result<Vec<u8>, DecompressError> {
    let mut inflater = Decompress::new(zlib_header);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).max(256));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
        }

        let consumed = usize::try_from(inflater.total_in()).unwrap_or(data.len());
        let before = (inflater.total_in(), inflater.total_out());
        let input = data.get(consumed..).unwrap_or_default();

        match inflater.decompress_vec(input, &mut out, FlushDecompress::None)? {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                // Spare output room and no progress: the input ran out early.
                if (inflater.total_in(), inflater.total_out()) == before
                    && out.len() < out.capacity()
                {
                    return Err(DecompressError::Truncated);
                }
            }
        }
    }

    let consumed = usize::try_from(inflater.total_in()).unwrap_or(0);
    if consumed != data.len() {
        return Err(DecompressError::TrailingData(data.len().saturating_sub(consumed)));
    }
    Ok(out)
}

fn unbrotli(data: &[u8]) -> Result<Vec<u8>, DecompressError> {
    let mut out = Vec::new();
    brotli::Decompressor::new(data, BROTLI_BUFFER).read_to_end(&mut out)?;
    Ok(out)
}

fn unzstd(data: &[u8]) -> Result<Vec<u8>, DecompressError> {
    Ok(zstd::stream::decode_all(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use std::io::Write;

    const PLAIN: &[u8] = br#"{"s":"Ok","t":[1705310279,1705310459],"o":[2500.5,2501.0],"h":[2502.0,2503.5],"l":[2499.0,2500.0],"c":[2501.0,2503.0],"v":[1200,900]}"#;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn brotli(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
            writer.write_all(data).unwrap();
        }
        out
    }

    fn zstd(data: &[u8]) -> Vec<u8> {
        zstd::stream::encode_all(data, 3).unwrap()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decompress_with_codec(&[]), (Vec::new(), Codec::Identity));
    }

    #[test]
    fn test_gzip() {
        assert_eq!(decompress_with_codec(&gzip(PLAIN)), (PLAIN.to_vec(), Codec::Gzip));
    }

    #[test]
    fn test_zlib() {
        assert_eq!(decompress_with_codec(&zlib(PLAIN)), (PLAIN.to_vec(), Codec::Zlib));
    }

    #[test]
    fn test_raw_deflate() {
        assert_eq!(
            decompress_with_codec(&deflate(PLAIN)),
            (PLAIN.to_vec(), Codec::Deflate)
        );
    }

    #[test]
    fn test_brotli() {
        assert_eq!(
            decompress_with_codec(&brotli(PLAIN)),
            (PLAIN.to_vec(), Codec::Brotli)
        );
    }

    #[test]
    fn test_zstd() {
        assert_eq!(decompress_with_codec(&zstd(PLAIN)), (PLAIN.to_vec(), Codec::Zstd));
    }

    #[test]
    fn test_plain_passthrough() {
        assert_eq!(decompress_with_codec(PLAIN), (PLAIN.to_vec(), Codec::Identity));
    }

    #[test]
    fn test_corrupted_blob_returned_verbatim() {
        let blob = [0x11, 0x00, 0x00, 0x00, 0x00, 0xde, 0xad, 0xbe, 0xef];
        assert_eq!(decompress(&blob), blob.to_vec());
        assert_eq!(detect_codec(&blob), Codec::Identity);
    }

    #[test]
    fn test_zlib_with_trailing_garbage_is_rejected() {
        let mut data = zlib(PLAIN);
        data.extend_from_slice(b"garbage");
        assert!(inflate(&data, true).is_err());
    }

    #[test]
    fn test_large_payload_grows_output_buffer() {
        let large = PLAIN.repeat(500);
        let zlib_body = zlib(&large);
        assert!(large.len() > zlib_body.len() * 4);
        assert_eq!(inflate(&zlib_body, true).unwrap(), large);
        assert_eq!(decompress_with_codec(&zlib_body), (large.clone(), Codec::Zlib));
        assert_eq!(decompress_with_codec(&deflate(&large)), (large, Codec::Deflate));
    }

    #[test]
    fn test_truncated_zlib_is_rejected() {
        let data = zlib(&PLAIN.repeat(50));
        let cut = &data[..data.len() / 2];
        assert!(matches!(inflate(cut, true), Err(DecompressError::Truncated)));
    }
}
