//! Bank
//!
//! A [`Bank`] is a loaded image together with the dialect resolved from its
//! tag. All object access goes through the address tables, which are read
//! fresh for every call so that views always reflect the current image.

use crate::append::{append_object, Appended};
use crate::dialect::{Dialect, SAMPLE_OFFSET};
use crate::image::{BankHeader, BankImage};
use crate::name;
use crate::pcm::PcmSource;
use crate::preset::{
    self, FootswitchDestination, FootswitchSource, Preset, PresetMut, RtDestination, RtSource,
    ZoneParams,
};
use crate::report::{Level, Reporter, TracingReporter};
use crate::sample::{self, Sample};
use crate::table::{AddressTable, ObjectKind};
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// An opened bank.
pub struct Bank {
    dialect: Dialect,
    image: BankImage,
    reporter: Box<dyn Reporter>,
}

impl fmt::Debug for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bank")
            .field("dialect", &self.dialect)
            .field("len", &self.image.len())
            .finish()
    }
}

impl Bank {
    /// Loads a bank from disk, reporting through `tracing`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, TracingReporter)
    }

    /// Loads a bank from disk with a custom reporter.
    pub fn open_with<P, R>(path: P, reporter: R) -> Result<Self>
    where
        P: AsRef<Path>,
        R: Reporter + 'static,
    {
        Self::from_image(BankImage::load(path)?, Box::new(reporter))
    }

    /// Wraps an in-memory image, reporting through `tracing`.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with(bytes, TracingReporter)
    }

    /// Wraps an in-memory image with a custom reporter.
    pub fn from_bytes_with<R: Reporter + 'static>(bytes: Vec<u8>, reporter: R) -> Result<Self> {
        Self::from_image(BankImage::from_bytes(bytes)?, Box::new(reporter))
    }

    fn from_image(image: BankImage, reporter: Box<dyn Reporter>) -> Result<Self> {
        let dialect = Dialect::resolve(image.as_bytes())?;
        let bank = Bank {
            dialect,
            image,
            reporter,
        };
        let header = bank.header()?;
        let presets = bank.preset_table()?;
        let samples = bank.sample_table()?;
        bank.check_header(&header, &presets, &samples);
        Ok(bank)
    }

    fn check_header(&self, header: &BankHeader, presets: &AddressTable, samples: &AddressTable) {
        let r = &self.reporter;
        r.report(
            Level::Info,
            format_args!("bank '{}' ({})", header.name, self.dialect),
        );
        if header.name != header.name_copy {
            r.report(
                Level::Warning,
                format_args!(
                    "bank name '{}' differs from its copy '{}'",
                    header.name, header.name_copy
                ),
            );
        }
        if !header.checksum_ok() {
            r.report(
                Level::Warning,
                format_args!(
                    "geometry parameters do not add up: 0x{:08x} + 0x{:08x} != 0x{:08x}",
                    header.parameters[1], header.parameters[2], header.parameters[4]
                ),
            );
        }
        let live = presets.live_count() + samples.live_count();
        if live != header.objects as usize {
            r.report(
                Level::Warning,
                format_args!(
                    "header counts {} objects but the tables hold {}",
                    header.objects, live
                ),
            );
        }
        if header.next.checked_add(SAMPLE_OFFSET) != Some(samples.sentinel()) {
            r.report(
                Level::Warning,
                format_args!(
                    "next 0x{:08x} does not match sample table end 0x{:08x}",
                    header.next,
                    samples.sentinel()
                ),
            );
        }
        r.report(
            Level::Detail,
            format_args!(
                "preset table 0x{:08x}, sample table 0x{:08x}, current preset {}, current sample {}",
                self.dialect.geometry().preset_table,
                self.dialect.geometry().sample_table,
                header.current_preset(),
                header.current_sample()
            ),
        );
    }

    /// Resolved dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Underlying image.
    pub fn image(&self) -> &BankImage {
        &self.image
    }

    /// Current header snapshot.
    pub fn header(&self) -> Result<BankHeader> {
        self.image.header()
    }

    /// Preset address table.
    pub fn preset_table(&self) -> Result<AddressTable> {
        AddressTable::read(&self.image, self.dialect, ObjectKind::Preset)
    }

    /// Sample address table.
    pub fn sample_table(&self) -> Result<AddressTable> {
        AddressTable::read(&self.image, self.dialect, ObjectKind::Sample)
    }

    /// Live presets in slot order.
    pub fn presets(&self) -> Result<impl Iterator<Item = Result<Preset<'_>>> + '_> {
        let locations: Vec<_> = self.preset_table()?.live().collect();
        Ok(locations
            .into_iter()
            .map(move |location| Preset::new(&self.image, location)))
    }

    /// Preset in slot `index`, `None` if the slot is empty or out of range.
    pub fn preset(&self, index: usize) -> Result<Option<Preset<'_>>> {
        match self.preset_table()?.locate(index) {
            Some(location) => Preset::new(&self.image, location).map(Some),
            None => Ok(None),
        }
    }

    /// Editable preset in slot `index`.
    pub fn preset_mut(&mut self, index: usize) -> Result<Option<PresetMut<'_>>> {
        match self.preset_table()?.locate(index) {
            Some(location) => PresetMut::new(&mut self.image, location).map(Some),
            None => Ok(None),
        }
    }

    /// Live samples in slot order.
    pub fn samples(&self) -> Result<impl Iterator<Item = Result<Sample<'_>>> + '_> {
        let locations: Vec<_> = self.sample_table()?.live().collect();
        Ok(locations
            .into_iter()
            .map(move |location| Sample::new(&self.image, location)))
    }

    /// Sample in slot `index`, `None` if the slot is empty or out of range.
    pub fn sample(&self, index: usize) -> Result<Option<Sample<'_>>> {
        match self.sample_table()?.locate(index) {
            Some(location) => Sample::new(&self.image, location).map(Some),
            None => Ok(None),
        }
    }

    /// Encodes `source` and appends it as a new sample.
    ///
    /// The source is fully read and validated before the image changes.
    pub fn append_sample(&mut self, source: &mut dyn PcmSource) -> Result<Appended> {
        let encoded = sample::encode(source)?;
        let appended = append_object(
            &mut self.image,
            self.dialect,
            ObjectKind::Sample,
            &encoded.bytes,
            self.reporter.as_ref(),
        )?;
        self.reporter.report(
            Level::Info,
            format_args!(
                "added sample {} '{}' ({} frames, {} channel(s))",
                appended.slot,
                encoded.name,
                encoded.frames,
                encoded.channels
            ),
        );
        Ok(appended)
    }

    /// Appends a blank preset with no zones.
    pub fn append_preset(&mut self, preset_name: &str) -> Result<Appended> {
        let stored = name::sanitize(preset_name);
        let appended = append_object(
            &mut self.image,
            self.dialect,
            ObjectKind::Preset,
            &preset::encode_blank(&stored),
            self.reporter.as_ref(),
        )?;
        self.reporter.report(
            Level::Info,
            format_args!("added preset {} '{}'", appended.slot, stored),
        );
        Ok(appended)
    }

    /// Number of bytes that make up the bank on disk.
    pub fn used_len(&self) -> Result<usize> {
        let header = self.header()?;
        let presets = self.preset_table()?;
        Ok(header.next as usize + self.dialect.geometry().sample_region_base(presets.sentinel()))
    }

    /// Image bytes up to the used length.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.image.slice(0, self.used_len()?)?.to_vec())
    }

    /// Writes the used part of the image to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let len = self.used_len()?;
        self.image.save(&path, len)?;
        self.reporter.report(
            Level::Detail,
            format_args!("wrote {} bytes to {}", len, path.as_ref().display()),
        );
        Ok(())
    }

    /// Serializable overview of the whole bank.
    pub fn summary(&self) -> Result<BankSummary> {
        let header = self.header()?;
        let presets = self
            .presets()?
            .map(|p| p.and_then(|p| PresetSummary::of(&p)))
            .collect::<Result<Vec<_>>>()?;
        let samples = self
            .samples()?
            .map(|s| s.and_then(|s| SampleSummary::of(&s)))
            .collect::<Result<Vec<_>>>()?;
        Ok(BankSummary {
            name: header.name.clone(),
            dialect: self.dialect,
            objects: header.objects,
            next: header.next,
            current_preset: header.current_preset(),
            current_sample: header.current_sample(),
            checksum_ok: header.checksum_ok(),
            presets,
            samples,
        })
    }
}

/// Overview of a bank.
#[derive(Debug, Clone, Serialize)]
pub struct BankSummary {
    /// Display name.
    pub name: String,
    /// Dialect.
    pub dialect: Dialect,
    /// Object count from the header.
    pub objects: u32,
    /// End of the used sample region.
    pub next: u32,
    /// Preset selected on the instrument.
    pub current_preset: u32,
    /// Sample selected on the instrument.
    pub current_sample: u32,
    /// Whether the geometry parameters add up.
    pub checksum_ok: bool,
    /// Live presets.
    pub presets: Vec<PresetSummary>,
    /// Live samples.
    pub samples: Vec<SampleSummary>,
}

/// One routed continuous controller.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Routing {
    /// Controller.
    pub source: RtSource,
    /// Where it is routed.
    pub destination: RtDestination,
}

/// One footswitch.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FootswitchRouting {
    /// Footswitch.
    pub source: FootswitchSource,
    /// Where it is routed; `None` for values outside the known set.
    pub destination: Option<FootswitchDestination>,
}

/// Overview of a preset.
#[derive(Debug, Clone, Serialize)]
pub struct PresetSummary {
    /// Slot index.
    pub index: usize,
    /// Name.
    pub name: String,
    /// Pitch bend range in semitones.
    pub pitch_bend_range: u8,
    /// Continuous controller routing.
    pub rt_controls: Vec<Routing>,
    /// Footswitch routing.
    pub footswitches: Vec<FootswitchRouting>,
    /// Zones in order.
    pub zones: Vec<ZoneParams>,
}

impl PresetSummary {
    fn of(preset: &Preset<'_>) -> Result<Self> {
        let rt = preset.rt_controls()?;
        Ok(PresetSummary {
            index: preset.index(),
            name: preset.name()?,
            pitch_bend_range: preset.pitch_bend_range()?,
            rt_controls: rt
                .mappings()
                .into_iter()
                .map(|(source, destination)| Routing {
                    source,
                    destination,
                })
                .collect(),
            footswitches: FootswitchSource::ALL
                .iter()
                .map(|&source| FootswitchRouting {
                    source,
                    destination: rt.footswitch(source),
                })
                .collect(),
            zones: preset
                .zones()
                .map(|z| z.and_then(|z| z.params()))
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// Overview of a sample.
#[derive(Debug, Clone, Serialize)]
pub struct SampleSummary {
    /// Slot index.
    pub index: usize,
    /// Name.
    pub name: String,
    /// Channel count.
    pub channels: usize,
    /// Frames per channel.
    pub frames: usize,
    /// Rate in Hz.
    pub sample_rate: u32,
    /// Raw format tag.
    pub format: u32,
    /// Loop-in frame.
    pub loop_start: i64,
    /// Loop-out frame.
    pub loop_end: i64,
}

impl SampleSummary {
    fn of(sample: &Sample<'_>) -> Result<Self> {
        Ok(SampleSummary {
            index: sample.index(),
            name: sample.name()?,
            channels: sample.channels(),
            frames: sample.frame_count(),
            sample_rate: sample.sample_rate()?,
            format: sample.format()?,
            loop_start: sample.loop_start()?,
            loop_end: sample.loop_end()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::{Frame, PcmBuffer};
    use crate::report::{MemoryReporter, NullReporter};
    use crate::test_support::empty_bank_bytes;
    use crate::Error;
    use std::rc::Rc;

    fn bank(dialect: Dialect) -> Bank {
        Bank::from_bytes_with(empty_bank_bytes(dialect), NullReporter).unwrap()
    }

    #[test]
    fn test_empty_bank() {
        let bank = bank(Dialect::Emulator3x);
        assert_eq!(bank.dialect(), Dialect::Emulator3x);
        assert_eq!(bank.presets().unwrap().count(), 0);
        assert_eq!(bank.samples().unwrap().count(), 0);
        assert!(bank.preset(0).unwrap().is_none());
        assert!(bank.sample(9999).unwrap().is_none());
        assert_eq!(bank.to_bytes().unwrap(), empty_bank_bytes(Dialect::Emulator3x));
    }

    #[test]
    fn test_unknown_tag() {
        let mut bytes = empty_bank_bytes(Dialect::Emulator3x);
        bytes[..8].copy_from_slice(b"EMULATOR");
        bytes[8..16].fill(0);
        assert!(matches!(Bank::from_bytes(bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_header_diagnostics() {
        let mut bytes = empty_bank_bytes(Dialect::EmulatorThree);
        bytes[0x10] = b'X';
        bytes[0x30 + 4 * 4] ^= 1;
        let reporter = Rc::new(MemoryReporter::new());
        Bank::from_bytes_with(bytes, Rc::clone(&reporter)).unwrap();
        let warnings = reporter.at(Level::Warning);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("differs from its copy"));
        assert!(warnings[1].contains("do not add up"));
    }

    #[test]
    fn test_append_sample_and_read_back() {
        let mut bank = bank(Dialect::EmulatorThree);
        let data: Vec<i16> = (0..100).map(|i| i * 11).collect();
        let mut source = PcmBuffer::mono("Kick/1", 44_100, data.clone());
        let appended = bank.append_sample(&mut source).unwrap();
        assert_eq!(appended.slot, 0);

        let sample = bank.sample(0).unwrap().unwrap();
        assert_eq!(sample.name().unwrap(), "Kick?1");
        let frames: Vec<i16> = sample.frames().map(|f: Frame| f.left()).collect();
        assert_eq!(frames, data);
        assert_eq!(bank.header().unwrap().objects, 1);
        assert_eq!(bank.used_len().unwrap(), bank.image().len());
    }

    #[test]
    fn test_append_preset_keeps_samples() {
        let mut bank = bank(Dialect::Emulator3x);
        let mut source = PcmBuffer::stereo("Pad", 44_100, &[1, 2, 3], &[4, 5, 6]).unwrap();
        bank.append_sample(&mut source).unwrap();
        bank.append_preset("Init").unwrap();
        bank.append_preset("Init 2").unwrap();

        let names: Vec<String> = bank
            .presets()
            .unwrap()
            .map(|p| p.unwrap().name().unwrap())
            .collect();
        assert_eq!(names, vec!["Init", "Init 2"]);
        let sample = bank.sample(0).unwrap().unwrap();
        let frames: Vec<Frame> = sample.frames().collect();
        assert_eq!(frames, vec![Frame::Stereo(1, 4), Frame::Stereo(2, 5), Frame::Stereo(3, 6)]);

        let summary = bank.summary().unwrap();
        assert_eq!(summary.objects, 3);
        assert_eq!(summary.presets.len(), 2);
        assert_eq!(summary.samples[0].channels, 2);
        assert_eq!(summary.samples[0].frames, 3);
    }

    #[test]
    fn test_rejected_source_leaves_bank_unchanged() {
        let mut bank = bank(Dialect::Esi32V3);
        let before = bank.to_bytes().unwrap();
        let mut source = PcmBuffer {
            name: "quad".to_string(),
            channels: 4,
            sample_rate: 44_100,
            samples: vec![0; 16],
        };
        assert!(matches!(bank.append_sample(&mut source), Err(Error::Pcm(_))));
        assert_eq!(bank.to_bytes().unwrap(), before);
    }

    #[test]
    fn test_append_messages_use_zero_based_slots() {
        let reporter = Rc::new(MemoryReporter::new());
        let mut bank =
            Bank::from_bytes_with(empty_bank_bytes(Dialect::Esi32V3), Rc::clone(&reporter))
                .unwrap();
        bank.append_sample(&mut PcmBuffer::mono("Kick", 44_100, vec![1; 16]))
            .unwrap();
        bank.append_preset("Lead").unwrap();
        let info = reporter.at(Level::Info);
        assert!(info.iter().any(|m| m.starts_with("added sample 0 'Kick'")), "{:?}", info);
        assert!(info.iter().any(|m| m.starts_with("added preset 0 'Lead'")), "{:?}", info);
    }
}
