//! Realtime control routing
//!
//! A preset routes six continuous controllers and two footswitches. The
//! continuous part of the table is indexed by destination: slot `d - 1` holds
//! `source + 1` (or 0 when nothing drives that destination). The footswitch
//! part holds one destination index per footswitch.

use crate::{Error, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::Serialize;
use std::fmt;

/// Number of destination-indexed continuous slots.
pub const RT_CONTROLS_SIZE: usize = 10;

/// Number of footswitch slots.
pub const RT_CONTROLS_FS_SIZE: usize = 2;

/// Total routing table width in bytes.
pub const RT_TABLE_SIZE: usize = RT_CONTROLS_SIZE + RT_CONTROLS_FS_SIZE;

/// Continuous realtime controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize)]
pub enum RtSource {
    /// Pitch wheel.
    Pitch = 0,
    /// Modulation wheel.
    Mod = 1,
    /// Channel pressure.
    Pressure = 2,
    /// Pedal.
    Pedal = 3,
    /// Assignable MIDI controller A.
    MidiA = 4,
    /// Assignable MIDI controller B.
    MidiB = 5,
}

/// Destination of a continuous controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize)]
pub enum RtDestination {
    /// Not routed.
    Off = 0,
    /// Pitch.
    Pitch = 1,
    /// Filter cutoff.
    VcfCutoff = 2,
    /// Amplifier level.
    VcaLevel = 3,
    /// LFO depth on pitch.
    LfoToPitch = 4,
    /// LFO depth on cutoff.
    LfoToCutoff = 5,
    /// LFO depth on level.
    LfoToVca = 6,
    /// Pan.
    Pan = 7,
    /// Envelope attack.
    Attack = 8,
    /// Zone crossfade.
    Crossfade = 9,
    /// Filter resonance at note on.
    VcfNoteOnQ = 10,
}

/// Footswitch input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize)]
pub enum FootswitchSource {
    /// First footswitch.
    Footswitch1 = 0,
    /// Second footswitch.
    Footswitch2 = 1,
}

/// Destination of a footswitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize)]
pub enum FootswitchDestination {
    /// Not routed.
    Off = 0,
    /// Sustain.
    Sustain = 1,
    /// Zone cross-switch.
    CrossSwitch = 2,
    /// Unused 1.
    Unused1 = 3,
    /// Unused 2.
    Unused2 = 4,
    /// Unused 3.
    Unused3 = 5,
    /// Unused A.
    UnusedA = 6,
    /// Unused B.
    UnusedB = 7,
    /// Step to the next preset.
    PresetIncrement = 8,
    /// Step to the previous preset.
    PresetDecrement = 9,
}

impl RtSource {
    /// All sources in table order.
    pub const ALL: [RtSource; 6] = [
        RtSource::Pitch,
        RtSource::Mod,
        RtSource::Pressure,
        RtSource::Pedal,
        RtSource::MidiA,
        RtSource::MidiB,
    ];

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            RtSource::Pitch => "Pitch Control",
            RtSource::Mod => "Mod Control",
            RtSource::Pressure => "Pressure Control",
            RtSource::Pedal => "Pedal Control",
            RtSource::MidiA => "MIDI A Control",
            RtSource::MidiB => "MIDI B Control",
        }
    }
}

impl RtDestination {
    /// Highest valid destination index.
    pub const MAX: i64 = RtDestination::VcfNoteOnQ as i64;

    /// Converts an external index, rejecting values outside `[0, 10]`.
    pub fn from_index(index: i64) -> Result<Self> {
        Self::from_i64(index)
            .ok_or_else(|| Error::range("realtime control destination", index, 0, Self::MAX))
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            RtDestination::Off => "Off",
            RtDestination::Pitch => "Pitch",
            RtDestination::VcfCutoff => "VCF Cutoff",
            RtDestination::VcaLevel => "VCA Level",
            RtDestination::LfoToPitch => "LFO -> Pitch",
            RtDestination::LfoToCutoff => "LFO -> Cutoff",
            RtDestination::LfoToVca => "LFO -> VCA",
            RtDestination::Pan => "Pan",
            RtDestination::Attack => "Attack",
            RtDestination::Crossfade => "Crossfade",
            RtDestination::VcfNoteOnQ => "VCF NoteOn Q",
        }
    }
}

impl FootswitchSource {
    /// Both footswitches in table order.
    pub const ALL: [FootswitchSource; 2] =
        [FootswitchSource::Footswitch1, FootswitchSource::Footswitch2];

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            FootswitchSource::Footswitch1 => "Footswitch 1",
            FootswitchSource::Footswitch2 => "Footswitch 2",
        }
    }
}

impl FootswitchDestination {
    /// Highest valid destination index.
    pub const MAX: i64 = FootswitchDestination::PresetDecrement as i64;

    /// Converts an external index, rejecting values outside `[0, 9]`.
    pub fn from_index(index: i64) -> Result<Self> {
        Self::from_i64(index)
            .ok_or_else(|| Error::range("footswitch destination", index, 0, Self::MAX))
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            FootswitchDestination::Off => "Off",
            FootswitchDestination::Sustain => "Sustain",
            FootswitchDestination::CrossSwitch => "Cross-Switch",
            FootswitchDestination::Unused1 => "Unused 1",
            FootswitchDestination::Unused2 => "Unused 2",
            FootswitchDestination::Unused3 => "Unused 3",
            FootswitchDestination::UnusedA => "Unused A",
            FootswitchDestination::UnusedB => "Unused B",
            FootswitchDestination::PresetIncrement => "Preset Increment",
            FootswitchDestination::PresetDecrement => "Preset Decrement",
        }
    }
}

macro_rules! display_by_name {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        })*
    };
}

display_by_name!(RtSource, RtDestination, FootswitchSource, FootswitchDestination);

/// Decoded routing table of one preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtControls {
    raw: [u8; RT_TABLE_SIZE],
}

impl RtControls {
    /// Wraps the raw table bytes.
    pub fn from_raw(raw: [u8; RT_TABLE_SIZE]) -> Self {
        RtControls { raw }
    }

    /// Raw table bytes.
    pub fn raw(&self) -> [u8; RT_TABLE_SIZE] {
        self.raw
    }

    /// Current destination of a continuous source.
    pub fn destination(&self, source: RtSource) -> RtDestination {
        let code = source as u8 + 1;
        self.raw[..RT_CONTROLS_SIZE]
            .iter()
            .position(|&slot| slot == code)
            .and_then(|i| RtDestination::from_usize(i + 1))
            .unwrap_or(RtDestination::Off)
    }

    /// Source currently driving `destination`, if any.
    pub fn source_for(&self, destination: RtDestination) -> Option<RtSource> {
        if destination == RtDestination::Off {
            return None;
        }
        let code = self.raw[destination as usize - 1];
        code.checked_sub(1).and_then(RtSource::from_u8)
    }

    /// Routes `source` to `destination`. The source leaves its previous
    /// destination and replaces whatever source drove `destination`.
    pub fn assign(&mut self, source: RtSource, destination: RtDestination) {
        let code = source as u8 + 1;
        for slot in &mut self.raw[..RT_CONTROLS_SIZE] {
            if *slot == code {
                *slot = 0;
            }
        }
        if destination != RtDestination::Off {
            self.raw[destination as usize - 1] = code;
        }
    }

    /// Current destination of a footswitch, `None` for unknown stored values.
    pub fn footswitch(&self, source: FootswitchSource) -> Option<FootswitchDestination> {
        FootswitchDestination::from_u8(self.raw[RT_CONTROLS_SIZE + source as usize])
    }

    /// Routes a footswitch.
    pub fn assign_footswitch(&mut self, source: FootswitchSource, destination: FootswitchDestination) {
        self.raw[RT_CONTROLS_SIZE + source as usize] = destination as u8;
    }

    /// `(source, destination)` for every continuous source.
    pub fn mappings(&self) -> Vec<(RtSource, RtDestination)> {
        RtSource::ALL
            .iter()
            .map(|&s| (s, self.destination(s)))
            .collect()
    }
}
