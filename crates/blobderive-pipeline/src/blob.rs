//! Blob data decoding.
//!
//! Reverses the OP v0 field element packing that fits arbitrary bytes into
//! 4096 BLS12-381 scalars. Each 32-byte field element carries 31 payload
//! bytes plus 6 bits in its first byte (the top two bits must stay clear of
//! the field modulus); every group of 4 field elements therefore yields
//! 4 * 31 + 3 = 127 payload bytes per round. The first field element of the
//! blob additionally reserves bytes 1..5 for the encoding version and a
//! big-endian 24-bit payload length.

use alloy_eips::eip4844::BYTES_PER_BLOB;
use thiserror::Error;

/// Raw blob size: 4096 field elements of 32 bytes.
pub const BLOB_SIZE: usize = BYTES_PER_BLOB;

/// Maximum payload a blob can carry: (4 * 31 + 3) * 1024 - 4 = 130044 bytes.
pub const MAX_BLOB_DATA_SIZE: usize = (4 * 31 + 3) * 1024 - 4;

/// Offset of the encoding version byte within the blob.
const VERSION_OFFSET: usize = 1;

/// The only supported encoding version.
const ENCODING_VERSION: u8 = 0;

/// Number of decode rounds (groups of 4 field elements).
const ROUNDS: usize = 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobDecodeError {
    #[error("invalid blob size: got {got}, want {}", BLOB_SIZE)]
    WrongSize { got: usize },
    #[error("invalid encoding version: expected {}, got {got}", ENCODING_VERSION)]
    WrongVersion { got: u8 },
    #[error("declared output length too large: {got} (max {})", MAX_BLOB_DATA_SIZE)]
    OutputLengthTooLarge { got: u32 },
    #[error("invalid field element: high order bits set at offset {offset}")]
    FieldElementHighBitsSet { offset: usize },
    #[error("extraneous data in output past declared length (fe={fe_index})")]
    TrailingNonzeroOutput { fe_index: usize },
    #[error("extraneous data in blob tail at position {position}")]
    TrailingNonzeroBlobTail { position: usize },
}

/// Decodes one blob into the raw bytes it carries.
///
/// The input must be exactly [`BLOB_SIZE`] bytes. The declared payload
/// length is trusted only after validating that every output byte past it
/// and every blob byte past the last consumed field element is zero, so a
/// tampered blob cannot smuggle data past the header.
pub fn decode_blob(blob: &[u8]) -> Result<Vec<u8>, BlobDecodeError> {
    if blob.len() != BLOB_SIZE {
        return Err(BlobDecodeError::WrongSize { got: blob.len() });
    }
    if blob[VERSION_OFFSET] != ENCODING_VERSION {
        return Err(BlobDecodeError::WrongVersion { got: blob[VERSION_OFFSET] });
    }

    // 3-byte big-endian length at bytes 2..5
    let output_len = u32::from_be_bytes([0, blob[2], blob[3], blob[4]]);
    if output_len > MAX_BLOB_DATA_SIZE as u32 {
        return Err(BlobDecodeError::OutputLengthTooLarge { got: output_len });
    }

    let mut output = vec![0u8; MAX_BLOB_DATA_SIZE];

    // Round 0: the first 5 bytes of the first field element hold the
    // version/length header, the remaining 27 bytes go straight to the
    // front of the output.
    output[0..27].copy_from_slice(&blob[5..32]);

    let mut opos = 28;
    let mut ipos = 32;
    let mut encoded_byte = [0u8; 4];
    encoded_byte[0] = blob[0];

    // Remaining 3 field elements of round 0.
    for b in encoded_byte.iter_mut().skip(1) {
        let (first, new_opos, new_ipos) = decode_field_element(blob, opos, ipos, &mut output)?;
        *b = first;
        opos = new_opos;
        ipos = new_ipos;
    }
    opos = reassemble_bytes(opos, &encoded_byte, &mut output);

    // Each remaining round turns 4 field elements (128 input bytes) into
    // 127 output bytes.
    for _ in 1..ROUNDS {
        if opos >= output_len as usize {
            break;
        }
        for b in &mut encoded_byte {
            let (first, new_opos, new_ipos) = decode_field_element(blob, opos, ipos, &mut output)?;
            *b = first;
            opos = new_opos;
            ipos = new_ipos;
        }
        opos = reassemble_bytes(opos, &encoded_byte, &mut output);
    }

    for (i, b) in output.iter().enumerate().skip(output_len as usize) {
        if *b != 0 {
            return Err(BlobDecodeError::TrailingNonzeroOutput { fe_index: i / 32 });
        }
    }
    for position in ipos..BLOB_SIZE {
        if blob[position] != 0 {
            return Err(BlobDecodeError::TrailingNonzeroBlobTail { position });
        }
    }

    output.truncate(output_len as usize);
    Ok(output)
}

/// Copies the 31-byte tail of the field element at `ipos` into the output
/// and returns its first byte along with both advanced cursors.
fn decode_field_element(
    blob: &[u8],
    opos: usize,
    ipos: usize,
    output: &mut [u8],
) -> Result<(u8, usize, usize), BlobDecodeError> {
    // the two high order bits of every field element's first byte must be 0
    if blob[ipos] & 0b1100_0000 != 0 {
        return Err(BlobDecodeError::FieldElementHighBitsSet { offset: ipos });
    }
    output[opos..opos + 31].copy_from_slice(&blob[ipos + 1..ipos + 32]);
    Ok((blob[ipos], opos + 32, ipos + 32))
}

/// Reassembles the four 6-bit chunks collected from a round's field element
/// first bytes into 3 output bytes, placing them in the gap positions left
/// by the 32-stride tail copies.
fn reassemble_bytes(mut opos: usize, encoded_byte: &[u8; 4], output: &mut [u8]) -> usize {
    opos -= 1; // a round outputs 127 bytes, not 128
    let x = (encoded_byte[0] & 0b0011_1111) | ((encoded_byte[1] & 0b0011_0000) << 2);
    let y = (encoded_byte[1] & 0b0000_1111) | ((encoded_byte[3] & 0b0000_1111) << 4);
    let z = (encoded_byte[2] & 0b0011_1111) | ((encoded_byte[3] & 0b0011_0000) << 2);
    output[opos - 32] = z;
    output[opos - 32 * 2] = y;
    output[opos - 32 * 3] = x;
    opos
}
