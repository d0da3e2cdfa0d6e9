//! Frame parsing from the derivation stream.
//!
//! A decoded blob yields one derivation stream fragment: a single version
//! byte followed by zero or more length-delimited frames. Each frame is a
//! chunk of channel data identified by `channel_id` and `frame_number`;
//! `is_last` marks the terminal frame of its channel.

use thiserror::Error;

/// Length of a channel identifier in bytes.
pub const CHANNEL_ID_LEN: usize = 16;

/// Upper bound on a single frame's data field.
pub const MAX_FRAME_DATA_LEN: u32 = 1_000_000;

/// Version byte every derivation stream fragment starts with.
pub const DERIVATION_VERSION: u8 = 0x00;

pub type ChannelId = [u8; CHANNEL_ID_LEN];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame stream must not be empty")]
    EmptyInput,
    #[error("invalid derivation version byte: got {0:#04x}")]
    BadVersion(u8),
    #[error("no frames found after version byte")]
    NoFrames,
    #[error("parsing frame {index}: {kind}")]
    Frame { index: usize, kind: FrameDecodeError },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecodeError {
    #[error("frame_data_length too large: {0}")]
    DataLenTooLarge(u32),
    #[error("invalid is_last byte: {0:#04x}")]
    InvalidIsLast(u8),
    #[error("unexpected end of stream reading {0}")]
    UnexpectedEnd(&'static str),
}

/// A single frame carrying a chunk of channel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub channel_id: ChannelId,
    pub number: u64,
    pub data: Vec<u8>,
    pub is_last: bool,
}

impl Frame {
    /// Serializes the frame in the wire format parsed by [`FrameParser`]
    /// (big-endian fields, no version byte).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FrameParser::HEADER_LEN + self.data.len() + 1);
        out.extend_from_slice(&self.channel_id);
        out.extend_from_slice(&self.number.to_be_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
        out.push(self.is_last as u8);
        out
    }
}

/// Serializes frames into one derivation stream fragment, version byte
/// included.
pub fn encode_frames(frames: &[Frame]) -> Vec<u8> {
    let mut out = vec![DERIVATION_VERSION];
    for frame in frames {
        out.extend_from_slice(&frame.encode());
    }
    out
}

/// Parses derivation stream fragments into frames. Handles the version
/// byte and frame boundaries.
pub struct FrameParser;

impl FrameParser {
    /// channel_id (16) + frame_number (8) + frame_data_length (4)
    const HEADER_LEN: usize = CHANNEL_ID_LEN + 8 + 4;

    /// Parses a whole stream fragment: version byte, then frames until the
    /// input is exhausted. Partial trailing bytes are an error, as is a
    /// fragment with no frames at all.
    pub fn parse_frames(stream: &[u8]) -> Result<Vec<Frame>, FrameError> {
        if stream.is_empty() {
            return Err(FrameError::EmptyInput);
        }
        if stream[0] != DERIVATION_VERSION {
            return Err(FrameError::BadVersion(stream[0]));
        }

        let mut frames = Vec::new();
        let mut rest = &stream[1..];

        while !rest.is_empty() {
            let (frame, consumed) = Self::decode_single_frame(rest)
                .map_err(|kind| FrameError::Frame { index: frames.len(), kind })?;
            frames.push(frame);
            rest = &rest[consumed..];
        }

        if frames.is_empty() {
            return Err(FrameError::NoFrames);
        }

        Ok(frames)
    }

    fn decode_single_frame(data: &[u8]) -> Result<(Frame, usize), FrameDecodeError> {
        if data.len() < CHANNEL_ID_LEN {
            return Err(FrameDecodeError::UnexpectedEnd("channel_id"));
        }
        let mut channel_id = [0u8; CHANNEL_ID_LEN];
        channel_id.copy_from_slice(&data[..CHANNEL_ID_LEN]);
        let mut offset = CHANNEL_ID_LEN;

        if data.len() < offset + 8 {
            return Err(FrameDecodeError::UnexpectedEnd("frame_number"));
        }
        let number =
            u64::from_be_bytes(data[offset..offset + 8].try_into().expect("range is 8 bytes"));
        offset += 8;

        if data.len() < offset + 4 {
            return Err(FrameDecodeError::UnexpectedEnd("frame_data_length"));
        }
        let data_len =
            u32::from_be_bytes(data[offset..offset + 4].try_into().expect("range is 4 bytes"));
        offset += 4;

        if data_len > MAX_FRAME_DATA_LEN {
            return Err(FrameDecodeError::DataLenTooLarge(data_len));
        }
        let data_len = data_len as usize;

        if data.len() < offset + data_len {
            return Err(FrameDecodeError::UnexpectedEnd("frame_data"));
        }
        let frame_data = data[offset..offset + data_len].to_vec();
        offset += data_len;

        let is_last = match data.get(offset).copied() {
            Some(0) => false,
            Some(1) => true,
            Some(byte) => return Err(FrameDecodeError::InvalidIsLast(byte)),
            None => return Err(FrameDecodeError::UnexpectedEnd("is_last")),
        };
        offset += 1;

        Ok((Frame { channel_id, number, data: frame_data, is_last }, offset))
    }
}
