//! Presets
//!
//! Layout of a preset object:
//! - 0x00: name (16 bytes, space padded)
//! - 0x10: realtime control routing (12 bytes, see [`controls`])
//! - 0x1C: unknown parameters (16 bytes)
//! - 0x2C: pitch bend range
//! - 0x2E: zone count (u16)
//! - 0x30: one u32 size word per zone, then the zone records

pub mod controls;
pub mod zone;

pub use controls::{
    FootswitchDestination, FootswitchSource, RtControls, RtDestination, RtSource,
};
pub use zone::{LfoShape, VcfType, Zone, ZoneMut, ZoneParams, ZONE_SIZE};

use crate::image::BankImage;
use crate::name::{self, NAME_SIZE};
use crate::table::ObjectLocation;
use crate::{Error, Result};
use controls::RT_TABLE_SIZE;

/// Size of the fixed preset header.
pub const PRESET_HEADER_SIZE: usize = 0x30;

/// Number of unknown parameter bytes in the preset header.
pub const UNKNOWN_PARAMETERS_SIZE: usize = 16;

/// Largest accepted pitch bend range in semitones.
pub const MAX_PITCH_BEND_RANGE: i64 = 36;

const NAME: usize = 0x00;
const RT_CONTROLS: usize = 0x10;
const UNKNOWN_PARAMETERS: usize = 0x1c;
const PITCH_BEND_RANGE: usize = 0x2c;
const NZONES: usize = 0x2e;

/// Byte offset of zone `index` inside a preset with `nzones` zones.
fn zone_offset(nzones: usize, index: usize) -> usize {
    PRESET_HEADER_SIZE + nzones * 4 + index * ZONE_SIZE
}

fn check_zone_table(image: &BankImage, location: &ObjectLocation) -> Result<usize> {
    image.slice(location.address, location.size)?;
    if location.size < PRESET_HEADER_SIZE {
        return Err(Error::Format(format!(
            "preset {} spans {} bytes, less than its header",
            location.index, location.size
        )));
    }
    let nzones = image.read_u16(location.address + NZONES)? as usize;
    let needed = zone_offset(nzones, nzones);
    if needed > location.size {
        return Err(Error::Format(format!(
            "preset {} declares {} zones ({} bytes) but spans {} bytes",
            location.index, nzones, needed, location.size
        )));
    }
    Ok(nzones)
}

/// Builds a blank preset object: named, no zones, nothing routed.
pub fn encode_blank(preset_name: &str) -> Vec<u8> {
    let mut object = vec![0u8; PRESET_HEADER_SIZE];
    object[NAME..NAME + NAME_SIZE].copy_from_slice(&name::encode(preset_name));
    object
}

/// Read-only view of a preset.
#[derive(Debug, Clone, Copy)]
pub struct Preset<'a> {
    image: &'a BankImage,
    location: ObjectLocation,
    nzones: usize,
}

impl<'a> Preset<'a> {
    pub(crate) fn new(image: &'a BankImage, location: ObjectLocation) -> Result<Self> {
        let nzones = check_zone_table(image, &location)?;
        Ok(Preset {
            image,
            location,
            nzones,
        })
    }

    /// Slot index in the preset table.
    pub fn index(&self) -> usize {
        self.location.index
    }

    /// Absolute address and size.
    pub fn location(&self) -> ObjectLocation {
        self.location
    }

    /// Preset name, trailing spaces dropped.
    pub fn name(&self) -> Result<String> {
        self.image.read_name(self.location.address + NAME)
    }

    /// Realtime control routing.
    pub fn rt_controls(&self) -> Result<RtControls> {
        let mut raw = [0u8; RT_TABLE_SIZE];
        let address = self.location.address + RT_CONTROLS;
        raw.copy_from_slice(self.image.slice(address, RT_TABLE_SIZE)?);
        Ok(RtControls::from_raw(raw))
    }

    /// Unknown header parameters, as stored.
    pub fn unknown_parameters(&self) -> Result<&'a [u8]> {
        self.image
            .slice(self.location.address + UNKNOWN_PARAMETERS, UNKNOWN_PARAMETERS_SIZE)
    }

    /// Pitch bend range in semitones.
    pub fn pitch_bend_range(&self) -> Result<u8> {
        self.image.read_u8(self.location.address + PITCH_BEND_RANGE)
    }

    /// Number of zones.
    pub fn zone_count(&self) -> usize {
        self.nzones
    }

    /// Zone `index`.
    pub fn zone(&self, index: usize) -> Result<Zone<'a>> {
        if index >= self.nzones {
            return Err(Error::range("zone", index as i64, 0, self.nzones as i64 - 1));
        }
        Zone::new(
            self.image,
            self.location.address + zone_offset(self.nzones, index),
            index,
        )
    }

    /// All zones in order.
    pub fn zones(&self) -> impl Iterator<Item = Result<Zone<'a>>> + 'a {
        let preset = *self;
        (0..self.nzones).map(move |i| preset.zone(i))
    }
}

/// Mutable view of a preset.
#[derive(Debug)]
pub struct PresetMut<'a> {
    image: &'a mut BankImage,
    location: ObjectLocation,
    nzones: usize,
}

impl<'a> PresetMut<'a> {
    pub(crate) fn new(image: &'a mut BankImage, location: ObjectLocation) -> Result<Self> {
        let nzones = check_zone_table(image, &location)?;
        Ok(PresetMut {
            image,
            location,
            nzones,
        })
    }

    /// Read-only view of the same preset.
    pub fn as_preset(&self) -> Preset<'_> {
        Preset {
            image: &*self.image,
            location: self.location,
            nzones: self.nzones,
        }
    }

    fn write_rt_controls(&mut self, rt: RtControls) -> Result<()> {
        self.image
            .slice_mut(self.location.address + RT_CONTROLS, RT_TABLE_SIZE)?
            .copy_from_slice(&rt.raw());
        Ok(())
    }

    /// Renames the preset. The name is sanitized and padded.
    pub fn set_name(&mut self, preset_name: &str) -> Result<()> {
        self.image
            .write_name(self.location.address + NAME, &name::sanitize(preset_name))
    }

    /// Routes a continuous controller; `destination` is an index in `[0, 10]`
    /// where 0 unroutes the source.
    pub fn set_rt_control(&mut self, source: RtSource, destination: i64) -> Result<()> {
        let destination = RtDestination::from_index(destination)?;
        let mut rt = self.as_preset().rt_controls()?;
        rt.assign(source, destination);
        self.write_rt_controls(rt)
    }

    /// Routes a footswitch; `destination` is an index in `[0, 9]`.
    pub fn set_footswitch_control(&mut self, source: FootswitchSource, destination: i64) -> Result<()> {
        let destination = FootswitchDestination::from_index(destination)?;
        let mut rt = self.as_preset().rt_controls()?;
        rt.assign_footswitch(source, destination);
        self.write_rt_controls(rt)
    }

    /// Applies a list of destinations in source order: six continuous
    /// controllers, then two footswitches. `None` leaves a source untouched.
    /// Every value is validated before anything is written.
    pub fn set_rt_controls(&mut self, destinations: &[Option<i64>]) -> Result<()> {
        let max = RtSource::ALL.len() + FootswitchSource::ALL.len();
        if destinations.len() > max {
            return Err(Error::range(
                "realtime control count",
                destinations.len() as i64,
                0,
                max as i64,
            ));
        }

        let mut rt = self.as_preset().rt_controls()?;
        for (i, destination) in destinations.iter().enumerate() {
            let Some(destination) = *destination else {
                continue;
            };
            match RtSource::ALL.get(i) {
                Some(&source) => rt.assign(source, RtDestination::from_index(destination)?),
                None => rt.assign_footswitch(
                    FootswitchSource::ALL[i - RtSource::ALL.len()],
                    FootswitchDestination::from_index(destination)?,
                ),
            }
        }
        self.write_rt_controls(rt)
    }

    /// Sets the pitch bend range in semitones.
    pub fn set_pitch_bend_range(&mut self, range: i64) -> Result<()> {
        Error::check_range("pitch bend range", range, 0, MAX_PITCH_BEND_RANGE)?;
        self.image
            .write_u8(self.location.address + PITCH_BEND_RANGE, range as u8)
    }

    /// Mutable view of zone `index`.
    pub fn zone_mut(&mut self, index: usize) -> Result<ZoneMut<'_>> {
        if index >= self.nzones {
            return Err(Error::range("zone", index as i64, 0, self.nzones as i64 - 1));
        }
        let address = self.location.address + zone_offset(self.nzones, index);
        ZoneMut::new(self.image, address, index)
    }

    /// Runs `edit` on every zone, stopping at the first error.
    pub fn for_each_zone<F>(&mut self, mut edit: F) -> Result<()>
    where
        F: FnMut(&mut ZoneMut<'_>) -> Result<()>,
    {
        for index in 0..self.nzones {
            let mut zone = self.zone_mut(index)?;
            edit(&mut zone)?;
        }
        Ok(())
    }
}
