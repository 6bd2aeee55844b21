//! Sample encoder
//!
//! Turns PCM from any [`PcmSource`] into the byte layout of a sample object,
//! ready to be appended to a bank.

use super::{format, PADDING_FRAMES, SAMPLE_HEADER_SIZE, SAMPLE_PARAMETERS};
use crate::image::MAX_IMAGE_SIZE;
use crate::name;
use crate::pcm::PcmSource;
use crate::{Error, Result};

/// Rate written into every encoded sample header.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// First frame of the default loop.
pub const LOOP_START: usize = 4;

/// Distance between the default loop end and the last frame.
pub const LOOP_END_MARGIN: usize = 10;

const PADDING_WORDS: usize = 2 * PADDING_FRAMES;

/// A sample object serialized into its own buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSample {
    /// Sanitized name as stored.
    pub name: String,
    /// Channel count.
    pub channels: usize,
    /// Frames per channel.
    pub frames: usize,
    /// Offset and loop parameters as written.
    pub parameters: [u32; SAMPLE_PARAMETERS],
    /// Complete object, header included.
    pub bytes: Vec<u8>,
}

impl EncodedSample {
    /// Object size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Offset and loop parameter words for `frames` frames.
pub fn parameters(frames: usize, stereo: bool) -> [u32; SAMPLE_PARAMETERS] {
    let data_size = 2 * (frames + PADDING_WORDS);
    let mono_size = SAMPLE_HEADER_SIZE + data_size;
    let size = mono_size + if stereo { data_size } else { 0 };
    let loop_end = frames.saturating_sub(LOOP_END_MARGIN).max(LOOP_START);

    let mut p = [0usize; SAMPLE_PARAMETERS];
    p[1] = SAMPLE_HEADER_SIZE;
    p[2] = if stereo { mono_size } else { 0 };
    p[3] = mono_size - 2;
    p[4] = if stereo { size - 2 } else { 0 };
    p[5] = (LOOP_START + 2) * 2 + SAMPLE_HEADER_SIZE;
    p[6] = if stereo { frames * 2 + p[5] + 8 } else { 12 };
    p[7] = (loop_end + 1) * 2 + SAMPLE_HEADER_SIZE;
    p[8] = if stereo {
        frames * 2 + p[7] + 8
    } else {
        (loop_end + 1) * 2
    };
    // callers bound `frames` by MAX_IMAGE_SIZE, so every word fits
    p.map(|v| v as u32)
}

/// Encodes a mono or stereo source as a sample object.
///
/// The stored name is the sanitized source name; the rate is always
/// [`DEFAULT_SAMPLE_RATE`].
pub fn encode(source: &mut dyn PcmSource) -> Result<EncodedSample> {
    let channels = source.channels() as usize;
    if channels != 1 && channels != 2 {
        return Err(Error::Pcm(format!(
            "{} has {} channels; only mono and stereo are supported",
            source.name(),
            channels
        )));
    }
    let samples = source.read_interleaved()?;
    if samples.len() % channels != 0 {
        return Err(Error::Pcm(format!(
            "{} delivered {} samples for {} channels",
            source.name(),
            samples.len(),
            channels
        )));
    }
    let frames = samples.len() / channels;
    if frames != source.frame_count() {
        return Err(Error::Pcm(format!(
            "{} announced {} frames but delivered {}",
            source.name(),
            source.frame_count(),
            frames
        )));
    }
    let stereo = channels == 2;

    let data_size = 2 * (frames + PADDING_WORDS);
    let size = SAMPLE_HEADER_SIZE + channels * data_size;
    if size > MAX_IMAGE_SIZE {
        return Err(Error::ImageTooLarge {
            size,
            max: MAX_IMAGE_SIZE,
        });
    }

    let stored_name = name::sanitize(source.name());
    let parameters = parameters(frames, stereo);

    let mut bytes = Vec::with_capacity(size);
    bytes.extend_from_slice(&name::encode(&stored_name));
    for word in parameters {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes.extend_from_slice(&DEFAULT_SAMPLE_RATE.to_le_bytes());
    let tag = if stereo {
        format::STEREO_SAMPLE_1
    } else {
        format::MONO_SAMPLE_1
    };
    bytes.extend_from_slice(&tag.to_le_bytes());
    bytes.resize(SAMPLE_HEADER_SIZE, 0);

    for channel in 0..channels {
        push_region(&mut bytes, samples.iter().skip(channel).step_by(channels));
    }
    debug_assert_eq!(bytes.len(), size);

    Ok(EncodedSample {
        name: stored_name,
        channels,
        frames,
        parameters,
        bytes,
    })
}

fn push_region<'a>(bytes: &mut Vec<u8>, data: impl Iterator<Item = &'a i16>) {
    bytes.extend_from_slice(&[0u8; PADDING_FRAMES * 2]);
    for sample in data {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes.extend_from_slice(&[0u8; PADDING_FRAMES * 2]);
}
