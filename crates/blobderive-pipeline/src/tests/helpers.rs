//! Shared test fixtures: a reference blob encoder and small builders.

use std::io::Write;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::{ChannelId, Frame, BLOB_SIZE, MAX_BLOB_DATA_SIZE};

const ENCODING_VERSION: u8 = 0;
const ROUNDS: usize = 1024;

/// Reference implementation of the OP v0 blob encoding, used to exercise
/// the decoder. Each round packs 4x31 payload bytes into field element
/// tails and splits 3 more bytes into the 4 leading 6-bit chunks; round 0
/// additionally writes the version byte and the 24-bit payload length.
///
/// Returns `None` when the payload exceeds [`MAX_BLOB_DATA_SIZE`].
pub fn encode_blob(data: &[u8]) -> Option<Vec<u8>> {
    if data.len() > MAX_BLOB_DATA_SIZE {
        return None;
    }

    fn read1(data: &[u8], read_offset: &mut usize) -> u8 {
        if *read_offset >= data.len() {
            return 0;
        }
        let byte = data[*read_offset];
        *read_offset += 1;
        byte
    }

    fn read31(data: &[u8], read_offset: &mut usize, buf31: &mut [u8; 31]) {
        buf31.fill(0);
        if *read_offset < data.len() {
            let n = (data.len() - *read_offset).min(31);
            buf31[..n].copy_from_slice(&data[*read_offset..*read_offset + n]);
            *read_offset += n;
        }
    }

    fn write1(blob: &mut [u8], write_offset: &mut usize, value: u8) {
        assert_eq!(*write_offset % 32, 0, "misaligned 6-bit chunk write");
        assert_eq!(value & 0b1100_0000, 0, "6-bit chunk has high bits set");
        blob[*write_offset] = value;
        *write_offset += 1;
    }

    fn write31(blob: &mut [u8], write_offset: &mut usize, buf31: &[u8; 31]) {
        assert_eq!(*write_offset % 32, 1, "misaligned tail write");
        blob[*write_offset..*write_offset + 31].copy_from_slice(buf31);
        *write_offset += 31;
    }

    let mut blob = vec![0u8; BLOB_SIZE];
    let mut read_offset = 0usize;
    let mut write_offset = 0usize;
    let mut buf31 = [0u8; 31];

    for round in 0..ROUNDS {
        if read_offset >= data.len() {
            break;
        }

        if round == 0 {
            // version byte and big-endian 24-bit length, then up to 27
            // payload bytes
            buf31[0] = ENCODING_VERSION;
            let ilen = data.len() as u32;
            buf31[1] = (ilen >> 16) as u8;
            buf31[2] = (ilen >> 8) as u8;
            buf31[3] = ilen as u8;
            buf31[4..].fill(0);
            let n = data.len().min(27);
            buf31[4..4 + n].copy_from_slice(&data[..n]);
            read_offset += n;
        } else {
            read31(data, &mut read_offset, &mut buf31);
        }

        let x = read1(data, &mut read_offset);
        write1(&mut blob, &mut write_offset, x & 0b0011_1111);
        write31(&mut blob, &mut write_offset, &buf31);

        read31(data, &mut read_offset, &mut buf31);
        let y = read1(data, &mut read_offset);
        write1(&mut blob, &mut write_offset, (y & 0b0000_1111) | ((x & 0b1100_0000) >> 2));
        write31(&mut blob, &mut write_offset, &buf31);

        read31(data, &mut read_offset, &mut buf31);
        let z = read1(data, &mut read_offset);
        write1(&mut blob, &mut write_offset, z & 0b0011_1111);
        write31(&mut blob, &mut write_offset, &buf31);

        read31(data, &mut read_offset, &mut buf31);
        write1(&mut blob, &mut write_offset, ((z & 0b1100_0000) >> 2) | ((y & 0b1111_0000) >> 4));
        write31(&mut blob, &mut write_offset, &buf31);
    }

    assert_eq!(read_offset, data.len(), "payload did not fit in {ROUNDS} rounds");
    Some(blob)
}

pub fn channel_id(byte: u8) -> ChannelId {
    [byte; 16]
}

pub fn frame(id: u8, number: u64, data: &[u8], is_last: bool) -> Frame {
    Frame { channel_id: channel_id(id), number, data: data.to_vec(), is_last }
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn random_bytes(rng: &mut StdRng, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
}

pub fn zlib_compress(data: &[u8]) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec_zlib(data, 6)
}

pub fn brotli_compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 11, 22);
        writer.write_all(data).expect("in-memory write");
    }
    out
}
