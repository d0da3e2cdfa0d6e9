//! Channel reassembly.
//!
//! Frames sharing a channel id are collected, ordered by frame number, and
//! concatenated into the channel payload. Anomalies (duplicates, gaps,
//! oversize) never abort reassembly; they are recorded in per-channel
//! stats so the caller can decide what to surface. A payload is only
//! emitted for a channel that is complete: terminal frame seen, frame
//! numbers contiguous from 0, size cap not exceeded.

use std::collections::HashMap;

use crate::frame::{ChannelId, Frame};

/// Per-channel reassembly diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// All input frames seen for this channel, duplicates included.
    pub frames_total: usize,
    /// Frames contributing to the payload after duplicate removal.
    pub frames_used: usize,
    pub first_number: u64,
    pub last_number: u64,
    pub complete: bool,
    pub has_gaps: bool,
    pub has_duplicate: bool,
    /// Length of the would-be payload from used frames, even when no
    /// payload is emitted.
    pub bytes_concatenated: usize,
    pub error: Option<String>,
}

/// A reassembled channel. `payload` is empty unless the channel is
/// complete and within the size cap; incomplete channels are retained for
/// their stats only.
#[derive(Debug, Clone, Default)]
pub struct Channel {
    pub id: ChannelId,
    pub payload: Vec<u8>,
    pub stats: ChannelStats,
}

/// Groups frames by channel id and reassembles each channel.
///
/// The returned order vector lists channel ids by first occurrence in the
/// input. Within a channel, frames are sorted by number (stable, so the
/// earlier input occurrence wins on equal numbers) and later duplicates
/// are dropped. `max_bytes_per_channel` caps the concatenated payload;
/// 0 disables the cap.
pub fn reassemble_channels(
    frames: impl IntoIterator<Item = Frame>,
    max_bytes_per_channel: u64,
) -> (Vec<ChannelId>, HashMap<ChannelId, Channel>) {
    let mut order: Vec<ChannelId> = Vec::new();
    let mut grouped: HashMap<ChannelId, Vec<Frame>> = HashMap::new();

    for frame in frames {
        let id = frame.channel_id;
        grouped
            .entry(id)
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(frame);
    }

    let mut channels = HashMap::with_capacity(order.len());
    for id in &order {
        let mut parts = grouped.remove(id).expect("every ordered id was grouped");

        let mut stats = ChannelStats {
            frames_total: parts.len(),
            first_number: parts.iter().map(|f| f.number).min().unwrap_or(0),
            last_number: parts.iter().map(|f| f.number).max().unwrap_or(0),
            ..Default::default()
        };

        parts.sort_by_key(|f| f.number);

        let mut payload = Vec::new();
        let mut total: u64 = 0;
        let mut prev: Option<u64> = None;
        let mut closed = false;

        for part in &parts {
            match prev {
                Some(p) if part.number == p => {
                    stats.has_duplicate = true;
                    continue;
                }
                Some(p) if part.number != p + 1 => stats.has_gaps = true,
                // the contiguous range must start at frame 0
                None if part.number != 0 => stats.has_gaps = true,
                _ => {}
            }

            stats.frames_used += 1;
            total += part.data.len() as u64;
            if stats.error.is_none() {
                if max_bytes_per_channel > 0 && total > max_bytes_per_channel {
                    stats.error = Some("channel oversize".to_owned());
                    payload.clear();
                } else {
                    payload.extend_from_slice(&part.data);
                }
            }
            if part.is_last {
                closed = true;
            }
            prev = Some(part.number);
        }

        stats.bytes_concatenated = total as usize;
        stats.complete = closed && !stats.has_gaps && stats.error.is_none();

        let payload = if stats.complete { payload } else { Vec::new() };
        channels.insert(*id, Channel { id: *id, payload, stats });
    }

    (order, channels)
}
