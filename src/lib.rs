//! Bank file engine for E-mu Emulator 3X, ESI-32 and Emulator Three samplers
//!
//! A bank is a single binary image holding a header, two address tables and
//! two regions of variable length objects: presets (with their zones) and
//! samples. This crate loads such images, walks the tables, edits preset and
//! zone parameters in place, decodes samples and appends new objects while
//! keeping the tables and header consistent.
//!
//! # Crate feature flags
//! - `wav` (default): WAV import/export through `hound` (`pcm::WavSource`, `pcm::WavSink`)
//! - `cli`: the `e3bank` command line tool
//!
//! # Quick start
//! ```no_run
//! use e3bank::Bank;
//!
//! let bank = Bank::open("MYBANK").unwrap();
//! for preset in bank.presets().unwrap() {
//!     let preset = preset.unwrap();
//!     println!("{}: {} zones", preset.name().unwrap(), preset.zone_count());
//! }
//! ```
//!
//! ## Appending a sample
//! ```no_run
//! use e3bank::{Bank, PcmBuffer};
//!
//! let mut bank = Bank::open("MYBANK").unwrap();
//! let mut source = PcmBuffer::mono("Sine", 44_100, vec![0; 4410]);
//! let appended = bank.append_sample(&mut source).unwrap();
//! println!("stored in slot {}", appended.slot);
//! bank.save("MYBANK").unwrap();
//! ```

#![warn(missing_docs)]

pub mod append; // Append Engine
pub mod bank; // Open/Save & Iteration
pub mod dialect; // Format Dialects
pub mod error;
pub mod image; // Bank Image & Header
pub mod name; // Stored Names
pub mod pcm; // PCM Sources & Sinks
pub mod preset; // Presets, Zones & Routing
pub mod report; // Diagnostics
pub mod sample; // Samples & Codec
pub mod table; // Address Tables
pub mod template; // New Banks

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};

// Public API exports
pub use append::{AppendStage, Appended};
pub use bank::{Bank, BankSummary, PresetSummary, SampleSummary};
pub use dialect::{Dialect, Geometry, SAMPLE_OFFSET};
pub use image::{BankHeader, BankImage, MAX_IMAGE_SIZE};
pub use pcm::{Frame, PcmBuffer, PcmSink, PcmSource};
#[cfg(feature = "wav")]
pub use pcm::{WavSink, WavSource};
pub use preset::{
    FootswitchDestination, FootswitchSource, LfoShape, Preset, PresetMut, RtControls,
    RtDestination, RtSource, VcfType, Zone, ZoneMut, ZoneParams,
};
pub use report::{Level, MemoryReporter, NullReporter, Reporter, TracingReporter};
pub use sample::{Sample, SampleFrames};
pub use table::{AddressTable, ObjectKind, ObjectLocation, Slot};
pub use template::create_bank;
