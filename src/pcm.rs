//! PCM sources and sinks
//!
//! The bank only ever stores interleaved 16-bit frames. Anything that can
//! produce or consume such frames plugs in here: an in-memory [`PcmBuffer`],
//! or WAV files through `hound` when the `wav` feature is enabled.

use crate::{Error, Result};

/// One decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Single channel.
    Mono(i16),
    /// Left and right.
    Stereo(i16, i16),
}

impl Frame {
    /// Left (or only) channel.
    pub fn left(&self) -> i16 {
        match *self {
            Frame::Mono(s) | Frame::Stereo(s, _) => s,
        }
    }

    /// Right channel, if any.
    pub fn right(&self) -> Option<i16> {
        match *self {
            Frame::Mono(_) => None,
            Frame::Stereo(_, r) => Some(r),
        }
    }
}

/// Supplier of audio to append to a bank.
pub trait PcmSource {
    /// Name the stored sample should carry (before sanitizing).
    fn name(&self) -> &str;

    /// Channel count (the bank accepts 1 or 2).
    fn channels(&self) -> u16;

    /// Sample rate of the source.
    fn sample_rate(&self) -> u32;

    /// Number of frames the source will deliver.
    fn frame_count(&self) -> usize;

    /// Reads every frame, channels interleaved.
    fn read_interleaved(&mut self) -> Result<Vec<i16>>;
}

/// Consumer of frames decoded from a bank.
pub trait PcmSink {
    /// Consumes a whole sample.
    fn consume(
        &mut self,
        channels: u16,
        sample_rate: u32,
        frames: &mut dyn Iterator<Item = Frame>,
    ) -> Result<()>;
}

/// Interleaved frames held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcmBuffer {
    /// Sample name.
    pub name: String,
    /// Channel count.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved samples.
    pub samples: Vec<i16>,
}

impl PcmBuffer {
    /// Mono buffer.
    pub fn mono(name: &str, sample_rate: u32, samples: Vec<i16>) -> Self {
        PcmBuffer {
            name: name.to_string(),
            channels: 1,
            sample_rate,
            samples,
        }
    }

    /// Stereo buffer from separate channels of equal length.
    pub fn stereo(name: &str, sample_rate: u32, left: &[i16], right: &[i16]) -> Result<Self> {
        if left.len() != right.len() {
            return Err(Error::Pcm(format!(
                "channel lengths differ ({} vs {})",
                left.len(),
                right.len()
            )));
        }
        let samples = left
            .iter()
            .zip(right)
            .flat_map(|(&l, &r)| [l, r])
            .collect();
        Ok(PcmBuffer {
            name: name.to_string(),
            channels: 2,
            sample_rate,
            samples,
        })
    }

    /// Samples of one channel.
    pub fn channel(&self, channel: usize) -> Vec<i16> {
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.channels.max(1) as usize)
            .copied()
            .collect()
    }
}

impl PcmSource for PcmBuffer {
    fn name(&self) -> &str {
        &self.name
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    fn read_interleaved(&mut self) -> Result<Vec<i16>> {
        Ok(self.samples.clone())
    }
}

impl PcmSink for PcmBuffer {
    fn consume(
        &mut self,
        channels: u16,
        sample_rate: u32,
        frames: &mut dyn Iterator<Item = Frame>,
    ) -> Result<()> {
        self.channels = channels;
        self.sample_rate = sample_rate;
        self.samples.clear();
        for frame in frames {
            self.samples.push(frame.left());
            if let Some(right) = frame.right() {
                self.samples.push(right);
            }
        }
        Ok(())
    }
}

#[cfg(feature = "wav")]
pub use wav::{WavSink, WavSource};

#[cfg(feature = "wav")]
mod wav {
    use super::{Frame, PcmSink, PcmSource};
    use crate::name;
    use crate::{Error, Result};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::{Path, PathBuf};

    /// 16-bit PCM WAV file read through `hound`.
    pub struct WavSource {
        name: String,
        reader: hound::WavReader<BufReader<File>>,
    }

    impl WavSource {
        /// Opens a WAV file. Only 16-bit integer PCM is accepted.
        pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
            let path = path.as_ref();
            let reader = hound::WavReader::open(path)?;
            let spec = reader.spec();
            if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
                return Err(Error::Pcm(format!(
                    "{} is not 16-bit PCM ({} bit {:?})",
                    path.display(),
                    spec.bits_per_sample,
                    spec.sample_format
                )));
            }
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(WavSource {
                name: name::strip_wav_ext(&file_name).to_string(),
                reader,
            })
        }
    }

    impl PcmSource for WavSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn channels(&self) -> u16 {
            self.reader.spec().channels
        }

        fn sample_rate(&self) -> u32 {
            self.reader.spec().sample_rate
        }

        fn frame_count(&self) -> usize {
            self.reader.duration() as usize
        }

        fn read_interleaved(&mut self) -> Result<Vec<i16>> {
            let samples = self
                .reader
                .samples::<i16>()
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(samples)
        }
    }

    /// Writes 16-bit PCM WAV files through `hound`.
    pub struct WavSink {
        path: PathBuf,
    }

    impl WavSink {
        /// Sink writing to `path` (created or truncated on consume).
        pub fn new<P: Into<PathBuf>>(path: P) -> Self {
            WavSink { path: path.into() }
        }

        /// Target path.
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl PcmSink for WavSink {
        fn consume(
            &mut self,
            channels: u16,
            sample_rate: u32,
            frames: &mut dyn Iterator<Item = Frame>,
        ) -> Result<()> {
            let spec = hound::WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::create(&self.path, spec)?;
            for frame in frames {
                writer.write_sample(frame.left())?;
                if let Some(right) = frame.right() {
                    writer.write_sample(right)?;
                }
            }
            writer.finalize()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_buffer_interleaves() {
        let buffer = PcmBuffer::stereo("s", 44_100, &[1, 2, 3], &[-1, -2, -3]).unwrap();
        assert_eq!(buffer.samples, vec![1, -1, 2, -2, 3, -3]);
        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.channel(1), vec![-1, -2, -3]);
        assert!(PcmBuffer::stereo("s", 44_100, &[1], &[]).is_err());
    }

    #[test]
    fn test_buffer_as_sink() {
        let mut sink = PcmBuffer::default();
        let mut frames = vec![Frame::Stereo(1, 2), Frame::Stereo(3, 4)].into_iter();
        sink.consume(2, 22_050, &mut frames).unwrap();
        assert_eq!(sink.samples, vec![1, 2, 3, 4]);
        assert_eq!(sink.sample_rate, 22_050);
    }

    #[cfg(feature = "wav")]
    #[test]
    fn test_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Kick 1.wav");
        let mut frames = (0..50).map(|i| Frame::Mono(i * 100));
        WavSink::new(&path).consume(1, 44_100, &mut frames).unwrap();

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(source.name(), "Kick 1");
        assert_eq!(source.channels(), 1);
        assert_eq!(source.frame_count(), 50);
        let samples = source.read_interleaved().unwrap();
        assert_eq!(samples[49], 4900);
    }
}
