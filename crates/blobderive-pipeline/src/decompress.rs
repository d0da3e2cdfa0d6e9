//! Channel payload decompression.
//!
//! The compression algorithm is discriminated by the payload's first byte:
//! zlib headers carry the DEFLATE method (8) or the reserved method (15)
//! in their low nibble, while brotli has no header magic, so the OP Stack
//! prefixes brotli payloads with a 0x01 version byte. Payloads matching
//! neither pattern are tried as a bare brotli stream before giving up.

use std::fmt;
use std::io::Read;

use thiserror::Error;

/// Low nibble of a zlib CMF byte using the DEFLATE method.
const ZLIB_DEFLATE_METHOD: u8 = 8;
/// Low nibble of a zlib CMF byte using the reserved method.
const ZLIB_RESERVED_METHOD: u8 = 15;
/// Version byte prefixing brotli channel payloads.
const BROTLI_VERSION: u8 = 0x01;
/// Internal buffer size for the brotli decoder.
const BROTLI_BUFFER_SIZE: usize = 4096;

/// Which decoder produced a decompressed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgo {
    Zlib,
    /// Brotli behind the 0x01 version prefix.
    BrotliV1,
    /// Bare brotli stream, no version prefix.
    Brotli,
}

impl fmt::Display for CompressionAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Zlib => "zlib",
            Self::BrotliV1 => "brotli(v1)",
            Self::Brotli => "brotli",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecompressError {
    #[error("empty channel payload")]
    EmptyInput,
    #[error("unknown compression (first byte {0:#04x})")]
    UnknownCompression(u8),
    #[error("corrupt {algo} stream: {inner}")]
    CorruptStream { algo: CompressionAlgo, inner: String },
}

/// Decompresses a channel payload, returning the inner bytes and the
/// algorithm that decoded them.
pub fn decompress(payload: &[u8]) -> Result<(Vec<u8>, CompressionAlgo), DecompressError> {
    let first = match payload.first() {
        Some(byte) => *byte,
        None => return Err(DecompressError::EmptyInput),
    };

    if first & 0x0F == ZLIB_DEFLATE_METHOD || first & 0x0F == ZLIB_RESERVED_METHOD {
        // zlib includes its own header, decompress the whole payload
        let out = miniz_oxide::inflate::decompress_to_vec_zlib(payload).map_err(|e| {
            DecompressError::CorruptStream { algo: CompressionAlgo::Zlib, inner: e.to_string() }
        })?;
        return Ok((out, CompressionAlgo::Zlib));
    }

    if first == BROTLI_VERSION {
        if let Ok(out) = decompress_brotli(&payload[1..]) {
            return Ok((out, CompressionAlgo::BrotliV1));
        }
    } else if let Ok(out) = decompress_brotli(payload) {
        return Ok((out, CompressionAlgo::Brotli));
    }

    Err(DecompressError::UnknownCompression(first))
}

fn decompress_brotli(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = brotli::Decompressor::new(data, BROTLI_BUFFER_SIZE);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
