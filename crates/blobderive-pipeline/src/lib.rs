//! OP Stack blob decode pipeline: blobs → frames → channels → batch payloads.
//!
//! This crate reconstructs rollup batch data from EIP-4844 blobs:
//! - Blob decoding (reversing the field element packing of the OP v0 format)
//! - Frame parsing (extracting channel frames from the derivation stream)
//! - Channel reassembly (ordering and concatenating frames per channel)
//! - Payload decompression (zlib or brotli, discriminated by magic bytes)
//!
//! The stages compose into a single [`Pipeline`] but are each usable on
//! their own. Everything is synchronous and pure over its inputs; callers
//! that want parallelism can run independent pipelines on independent
//! blob sets.

mod blob;
mod channel;
mod decompress;
mod derive;
mod frame;

#[cfg(test)]
mod tests;

pub use blob::{decode_blob, BlobDecodeError, BLOB_SIZE, MAX_BLOB_DATA_SIZE};
pub use channel::{reassemble_channels, Channel, ChannelStats};
pub use decompress::{decompress, CompressionAlgo, DecompressError};
pub use derive::{
    DecompressedChannel, FrameSummary, Pipeline, PipelineConfig, PipelineError, PipelineOutput,
};
pub use frame::{
    encode_frames, ChannelId, Frame, FrameDecodeError, FrameError, FrameParser, CHANNEL_ID_LEN,
    DERIVATION_VERSION, MAX_FRAME_DATA_LEN,
};
