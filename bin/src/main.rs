use std::fs;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use blobderive_pipeline::{ChannelId, Pipeline, PipelineConfig, DERIVATION_VERSION};

/// Bytes of decompressed payload to dump as a hex head per channel.
const PAYLOAD_HEAD_LEN: usize = 256;

#[derive(Parser)]
#[command(name = "blobderive")]
#[command(about = "Decode OP Stack batcher blobs into frames, channels, and batch payloads")]
struct Args {
    /// Blob files (raw 131072-byte binary), decoded in order
    #[arg(required = true, value_name = "BLOB")]
    blobs: Vec<PathBuf>,

    /// Write the concatenated derivation stream to this path
    #[arg(long, value_name = "PATH")]
    save_stream: Option<PathBuf>,

    /// Number of frames to summarize
    #[arg(short = 'n', long = "frames", default_value_t = 5)]
    summary_frames: usize,

    /// Per-channel payload cap in bytes (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_channel_bytes: u64,
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut blobs = Vec::with_capacity(args.blobs.len());
    for path in &args.blobs {
        let raw = fs::read(path).wrap_err_with(|| format!("reading {}", path.display()))?;
        blobs.push(raw);
    }

    let config = PipelineConfig::builder().max_bytes_per_channel(args.max_channel_bytes).build();
    let output = Pipeline::new(config).run(&blobs).wrap_err("decoding blobs")?;

    let stream = output.concatenated_stream();
    info!(bytes = stream.len(), blobs = blobs.len(), "stream rebuilt");
    if let Some(head) = stream.first() {
        info!(
            head = %hex::encode(&stream[..stream.len().min(32)]),
            version = %format!("{:#04x} (expect {:#04x})", head, DERIVATION_VERSION),
            "stream head"
        );
    }

    if let Some(path) = &args.save_stream {
        fs::write(path, &stream).wrap_err_with(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "stream saved");
    }

    println!("frames parsed: {}", output.frames.len());
    for (i, frame) in output.frames.iter().take(args.summary_frames).enumerate() {
        println!(
            "  #{i}: ch={}.. n={} last={} data={}B",
            short_id(&frame.channel_id),
            frame.number,
            frame.is_last,
            frame.data_len
        );
    }
    for (index, error) in &output.skipped_pieces {
        println!("  [!] piece {index} skipped: {error}");
    }

    for id in &output.order {
        let stats = &output.channels[id].stats;
        print!(
            "channel {}..: frames={}/{} range=[{},{}] complete={} gaps={} dup={} bytes={}",
            short_id(id),
            stats.frames_used,
            stats.frames_total,
            stats.first_number,
            stats.last_number,
            stats.complete,
            stats.has_gaps,
            stats.has_duplicate,
            stats.bytes_concatenated,
        );
        match &stats.error {
            Some(error) => println!(" error={error}"),
            None => println!(),
        }
    }

    for channel in &output.decompressed {
        println!(
            "channel {}.. decompressed: {} bytes ({})",
            short_id(&channel.channel_id),
            channel.bytes.len(),
            channel.algorithm
        );
        let head = &channel.bytes[..channel.bytes.len().min(PAYLOAD_HEAD_LEN)];
        println!("  head: {}", hex::encode(head));
    }
    for (id, error) in &output.decompress_failures {
        println!("channel {}.. decompression failed: {error}", short_id(id));
    }

    Ok(())
}

fn short_id(id: &ChannelId) -> String {
    hex::encode(&id[..4])
}
