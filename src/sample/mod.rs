//! Samples
//!
//! A sample object is a 0x60 byte header followed by 16-bit PCM. Each channel
//! lives in its own region framed by two zero frames on both sides; the right
//! region of a stereo sample starts right after the padded left region.
//!
//! ```text
//! header | 0 0 L0 L1 .. Ln-1 0 0 | 0 0 R0 R1 .. Rn-1 0 0
//! ```

pub mod codec;

pub use codec::{encode, EncodedSample, DEFAULT_SAMPLE_RATE};

use crate::image::BankImage;
use crate::pcm::{Frame, PcmSink};
use crate::table::ObjectLocation;
use crate::{Error, Result};

/// Size of the fixed sample header.
pub const SAMPLE_HEADER_SIZE: usize = 0x60;

/// Number of offset/loop parameter words.
pub const SAMPLE_PARAMETERS: usize = 9;

/// Number of reserved words after the format tag.
pub const MORE_SAMPLE_PARAMETERS: usize = 9;

/// Zero frames before and after the data of each channel region.
pub const PADDING_FRAMES: usize = 2;

const NAME: usize = 0x00;
const PARAMETERS: usize = 0x10;
const SAMPLE_RATE: usize = 0x34;
const FORMAT: usize = 0x38;

/// Format tags written by the samplers.
pub mod format {
    /// Mono, as written by this crate.
    pub const MONO_SAMPLE_1: u32 = 0x0038_0001;
    /// Mono variant.
    pub const MONO_SAMPLE_2: u32 = 0x0039_0001;
    /// Stereo, as written by this crate.
    pub const STEREO_SAMPLE_1: u32 = 0x0078_0001;
    /// Stereo variant.
    pub const STEREO_SAMPLE_2: u32 = 0x0079_0001;
    /// Mono tags found in Emulator 3X banks.
    pub const MONO_SAMPLE_EMULATOR_3X: [u32; 5] = [
        0x0030_0001,
        0x0031_0001,
        0x0032_0001,
        0x0033_0001,
        0x0034_0001,
    ];
}

/// Channel count implied by a format tag. Unknown tags are mono.
pub fn channels_for_format(tag: u32) -> usize {
    match tag {
        format::STEREO_SAMPLE_1 | format::STEREO_SAMPLE_2 => 2,
        _ => 1,
    }
}

/// Frame count of a sample object of `size` bytes.
pub fn frame_count(size: usize, channels: usize) -> Option<usize> {
    size.checked_sub(SAMPLE_HEADER_SIZE + 8 * channels)
        .map(|data| data / (2 * channels))
}

/// Read-only view of a sample object.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    image: &'a BankImage,
    location: ObjectLocation,
    channels: usize,
    frames: usize,
}

impl<'a> Sample<'a> {
    pub(crate) fn new(image: &'a BankImage, location: ObjectLocation) -> Result<Self> {
        image.slice(location.address, location.size)?;
        let channels = channels_for_format(image.read_u32(location.address + FORMAT)?);
        let frames = frame_count(location.size, channels).ok_or_else(|| {
            Error::Format(format!(
                "sample {} spans {} bytes, less than its header and padding",
                location.index, location.size
            ))
        })?;
        Ok(Sample {
            image,
            location,
            channels,
            frames,
        })
    }

    /// Slot index in the sample table.
    pub fn index(&self) -> usize {
        self.location.index
    }

    /// Absolute address and size.
    pub fn location(&self) -> ObjectLocation {
        self.location
    }

    /// Sample name, trailing spaces dropped.
    pub fn name(&self) -> Result<String> {
        self.image.read_name(self.location.address + NAME)
    }

    /// Offset and loop parameter words.
    pub fn parameters(&self) -> Result<[u32; SAMPLE_PARAMETERS]> {
        let words = self
            .image
            .read_u32_words(self.location.address + PARAMETERS, SAMPLE_PARAMETERS)?;
        let mut parameters = [0u32; SAMPLE_PARAMETERS];
        parameters.copy_from_slice(&words);
        Ok(parameters)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> Result<u32> {
        self.image.read_u32(self.location.address + SAMPLE_RATE)
    }

    /// Raw format tag.
    pub fn format(&self) -> Result<u32> {
        self.image.read_u32(self.location.address + FORMAT)
    }

    /// 1 or 2.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames per channel, padding excluded.
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Loop-in frame, from the absolute loop start word.
    pub fn loop_start(&self) -> Result<i64> {
        let word = self.parameters()?[5] as i64;
        Ok((word - SAMPLE_HEADER_SIZE as i64) / 2 - PADDING_FRAMES as i64)
    }

    /// Loop-out frame, from the absolute loop end word.
    pub fn loop_end(&self) -> Result<i64> {
        let word = self.parameters()?[7] as i64;
        Ok((word - SAMPLE_HEADER_SIZE as i64) / 2 - 1)
    }

    /// Lazily decodes the frames. Each call starts from the first frame.
    pub fn frames(&self) -> SampleFrames<'a> {
        let start = self.location.address + SAMPLE_HEADER_SIZE;
        let end = self.location.address + self.location.size;
        // `new` checked the object against the image and the frame count
        // against the object size.
        let data = &self.image.as_bytes()[start..end];
        SampleFrames {
            data,
            // right data follows the padded left region and its own lead-in
            right: (self.channels == 2).then_some(self.frames + PADDING_FRAMES * 3),
            position: 0,
            len: self.frames,
        }
    }

    /// Sends every frame to `sink`.
    pub fn extract(&self, sink: &mut dyn PcmSink) -> Result<()> {
        let rate = self.sample_rate()?;
        sink.consume(self.channels as u16, rate, &mut self.frames())
    }
}

/// Restartable iterator over the frames of one sample.
#[derive(Debug, Clone)]
pub struct SampleFrames<'a> {
    data: &'a [u8],
    right: Option<usize>,
    position: usize,
    len: usize,
}

impl SampleFrames<'_> {
    fn word(&self, index: usize) -> i16 {
        let b = &self.data[index * 2..index * 2 + 2];
        i16::from_le_bytes([b[0], b[1]])
    }
}

impl Iterator for SampleFrames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.position >= self.len {
            return None;
        }
        let left = self.word(PADDING_FRAMES + self.position);
        let frame = match self.right {
            Some(right) => Frame::Stereo(left, self.word(right + self.position)),
            None => Frame::Mono(left),
        };
        self.position += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SampleFrames<'_> {}
