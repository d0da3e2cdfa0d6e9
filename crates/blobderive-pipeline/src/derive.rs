//! End-to-end decode pipeline: blobs → stream pieces → frames → channels →
//! decompressed payloads.
//!
//! Each blob decodes to its own derivation stream piece and frames are
//! parsed per piece: every piece starts with its own derivation version
//! byte, so parsing a concatenation would trip over the version byte of
//! the second piece. Frames from all pieces are then reassembled together,
//! and every complete channel is decompressed independently.

use std::collections::HashMap;

use bon::Builder;
use thiserror::Error;

use crate::blob::{decode_blob, BlobDecodeError};
use crate::channel::{reassemble_channels, Channel};
use crate::decompress::{decompress, CompressionAlgo, DecompressError};
use crate::frame::{ChannelId, Frame, FrameError, FrameParser};

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Builder)]
pub struct PipelineConfig {
    /// Per-channel payload cap in bytes. 0 disables the cap.
    #[builder(default = 0)]
    pub max_bytes_per_channel: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no blobs to decode")]
    Empty,
    #[error("decoding blob {index}: {source}")]
    Blob { index: usize, source: BlobDecodeError },
    #[error("no piece yielded frames; first failure: {0}")]
    AllPiecesFailed(FrameError),
}

/// Cheap per-frame summary retained after the frames themselves move into
/// the reassembler.
#[derive(Debug, Clone)]
pub struct FrameSummary {
    pub channel_id: ChannelId,
    pub number: u64,
    pub is_last: bool,
    pub data_len: usize,
}

impl From<&Frame> for FrameSummary {
    fn from(frame: &Frame) -> Self {
        Self {
            channel_id: frame.channel_id,
            number: frame.number,
            is_last: frame.is_last,
            data_len: frame.data.len(),
        }
    }
}

/// A complete channel's payload after decompression.
#[derive(Debug, Clone)]
pub struct DecompressedChannel {
    pub channel_id: ChannelId,
    pub algorithm: CompressionAlgo,
    pub bytes: Vec<u8>,
}

/// Everything a pipeline run produced.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    /// Decoded derivation stream piece per input blob, in input order.
    pub pieces: Vec<Vec<u8>>,
    /// Summaries of every parsed frame, in stream order.
    pub frames: Vec<FrameSummary>,
    /// Pieces that failed frame parsing, with the reason each was skipped.
    pub skipped_pieces: Vec<(usize, FrameError)>,
    /// Channel ids by first occurrence across all parsed frames.
    pub order: Vec<ChannelId>,
    pub channels: HashMap<ChannelId, Channel>,
    /// Decompressed complete channels, in channel order.
    pub decompressed: Vec<DecompressedChannel>,
    /// Complete channels whose payload failed to decompress.
    pub decompress_failures: Vec<(ChannelId, DecompressError)>,
}

impl PipelineOutput {
    /// Concatenation of all decoded stream pieces, in input order.
    pub fn concatenated_stream(&self) -> Vec<u8> {
        let mut stream = Vec::with_capacity(self.pieces.iter().map(Vec::len).sum());
        for piece in &self.pieces {
            stream.extend_from_slice(piece);
        }
        stream
    }
}

/// Single-threaded decode pipeline over a set of blobs.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Runs the full pipeline.
    ///
    /// A blob that fails to decode is fatal. A piece that fails frame
    /// parsing is skipped with a warning as long as at least one other
    /// piece parses; if every piece fails, the first failure is returned.
    pub fn run(&self, blobs: &[impl AsRef<[u8]>]) -> Result<PipelineOutput, PipelineError> {
        if blobs.is_empty() {
            return Err(PipelineError::Empty);
        }

        let mut pieces = Vec::with_capacity(blobs.len());
        for (index, blob) in blobs.iter().enumerate() {
            let piece = decode_blob(blob.as_ref())
                .map_err(|source| PipelineError::Blob { index, source })?;
            tracing::debug!(
                target: "blobderive::pipeline",
                piece = index,
                bytes = piece.len(),
                "decoded blob"
            );
            pieces.push(piece);
        }

        let mut frames: Vec<Frame> = Vec::new();
        let mut skipped_pieces = Vec::new();
        for (index, piece) in pieces.iter().enumerate() {
            match FrameParser::parse_frames(piece) {
                Ok(piece_frames) => frames.extend(piece_frames),
                Err(error) => {
                    tracing::warn!(
                        target: "blobderive::pipeline",
                        piece = index,
                        error = %error,
                        "skipping piece with unparseable frames"
                    );
                    skipped_pieces.push((index, error));
                }
            }
        }
        if frames.is_empty() {
            let (_, first_error) =
                skipped_pieces.first().cloned().expect("at least one piece was attempted");
            return Err(PipelineError::AllPiecesFailed(first_error));
        }

        let summaries: Vec<FrameSummary> = frames.iter().map(FrameSummary::from).collect();
        let (order, channels) = reassemble_channels(frames, self.config.max_bytes_per_channel);

        let mut decompressed = Vec::new();
        let mut decompress_failures = Vec::new();
        for id in &order {
            let channel = &channels[id];
            if !channel.stats.complete {
                continue;
            }
            match decompress(&channel.payload) {
                Ok((bytes, algorithm)) => {
                    tracing::debug!(
                        target: "blobderive::pipeline",
                        channel_id = %hex::encode(&id[..8]),
                        algo = %algorithm,
                        bytes = bytes.len(),
                        "decompressed channel"
                    );
                    decompressed.push(DecompressedChannel { channel_id: *id, algorithm, bytes });
                }
                Err(error) => {
                    tracing::warn!(
                        target: "blobderive::pipeline",
                        channel_id = %hex::encode(&id[..8]),
                        error = %error,
                        "failed to decompress channel"
                    );
                    decompress_failures.push((*id, error));
                }
            }
        }

        Ok(PipelineOutput {
            pieces,
            frames: summaries,
            skipped_pieces,
            order,
            channels,
            decompressed,
            decompress_failures,
        })
    }
}
