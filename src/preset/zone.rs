//! Preset zones
//!
//! A zone is a fixed 0x34 byte record of synthesis parameters. Values are
//! stored in the sampler's native ranges; the getters and setters here convert
//! to and from the percentages shown on the front panel.

use crate::image::BankImage;
use crate::{Error, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::Serialize;

/// Size of one zone record.
pub const ZONE_SIZE: usize = 0x34;

const ROOT_NOTE: usize = 0x00;
const SAMPLE_INDEX: usize = 0x02;
const VCA_ENVELOPE: usize = 0x08;
const AUX_ENVELOPE: usize = 0x0e;
const AUX_ENVELOPE_AMOUNT: usize = 0x13;
const VCF_ENVELOPE: usize = 0x14;
const VCF_ENVELOPE_AMOUNT: usize = 0x19;
const VCF_TYPE_LFO_SHAPE: usize = 0x1a;
const VCA_LEVEL: usize = 0x1b;
const VCA_PAN: usize = 0x1c;
const VCF_CUTOFF: usize = 0x1d;
const VCF_Q: usize = 0x1e;
const LFO_TO_PITCH: usize = 0x1f;
const LFO_TO_CUTOFF: usize = 0x20;
const LFO_TO_VCA: usize = 0x21;
const LFO_TO_PAN: usize = 0x22;
const VEL_TO_PITCH: usize = 0x23;
const VEL_TO_VCA_LEVEL: usize = 0x24;
const VEL_TO_VCA_ATTACK: usize = 0x25;
const VEL_TO_VCF_CUTOFF: usize = 0x26;
const VEL_TO_VCF_Q: usize = 0x27;
const VEL_TO_VCF_ATTACK: usize = 0x28;
const VEL_TO_VCA_PAN: usize = 0x29;
const VEL_TO_SAMPLE_START: usize = 0x2a;
const VEL_TO_AUX_ENV: usize = 0x2b;

/// Stored Q values start here; below it the filter has no resonance.
const Q_BIAS: i64 = 0x80;

/// Filter models, in stored order. The last entry stands in for any stored
/// value past the known list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize)]
#[allow(missing_docs)]
pub enum VcfType {
    TwoPoleLowpass = 0,
    FourPoleLowpass,
    SixPoleLowpass,
    SecondOrderHipass,
    FourthOrderHipass,
    SecondOrderBandpass,
    FourthOrderBandpass,
    ContraryBandpass,
    SweptEq1Oct,
    SweptEq2To1,
    SweptEq3To1,
    Phaser1,
    Phaser2,
    BatPhaser,
    FlangerLite,
    VocalAhAyEe,
    VocalOoAh,
    BottomFeeder,
    EsiLopass,
    Unknown,
}

impl VcfType {
    /// Highest index a setter accepts ("Unknown" cannot be written).
    pub const MAX_SETTABLE: i64 = VcfType::EsiLopass as i64;

    /// Decodes the filter bits, clamping out-of-range values to `Unknown`.
    pub fn from_bits(bits: u8) -> Self {
        Self::from_u8(bits).unwrap_or(VcfType::Unknown)
    }

    /// Front panel name.
    pub fn name(&self) -> &'static str {
        match self {
            VcfType::TwoPoleLowpass => "2 Pole Lowpass",
            VcfType::FourPoleLowpass => "4 Pole Lowpass",
            VcfType::SixPoleLowpass => "6 Pole Lowpass",
            VcfType::SecondOrderHipass => "2nd Ord Hipass",
            VcfType::FourthOrderHipass => "4th Ord Hipass",
            VcfType::SecondOrderBandpass => "2nd O Bandpass",
            VcfType::FourthOrderBandpass => "4th O Bandpass",
            VcfType::ContraryBandpass => "Contrary BandP",
            VcfType::SweptEq1Oct => "Swept EQ 1 oct",
            VcfType::SweptEq2To1 => "Swept EQ 2->1",
            VcfType::SweptEq3To1 => "Swept EQ 3->1",
            VcfType::Phaser1 => "Phaser 1",
            VcfType::Phaser2 => "Phaser 2",
            VcfType::BatPhaser => "Bat-Phaser",
            VcfType::FlangerLite => "Flanger Lite",
            VcfType::VocalAhAyEe => "Vocal Ah-Ay-Ee",
            VcfType::VocalOoAh => "Vocal Oo-Ah",
            VcfType::BottomFeeder => "Bottom Feeder",
            VcfType::EsiLopass => "ESi/E3x Lopass",
            VcfType::Unknown => "Unknown",
        }
    }
}

/// LFO waveform, stored in the low two bits of the filter type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize)]
#[allow(missing_docs)]
pub enum LfoShape {
    Triangle = 0,
    Sine = 1,
    Sawtooth = 2,
    Square = 3,
}

impl LfoShape {
    /// Decodes the low two bits of the filter type byte.
    pub fn from_bits(byte: u8) -> Self {
        match byte & 0x3 {
            0 => LfoShape::Triangle,
            1 => LfoShape::Sine,
            2 => LfoShape::Sawtooth,
            _ => LfoShape::Square,
        }
    }

    /// Waveform name.
    pub fn name(&self) -> &'static str {
        match self {
            LfoShape::Triangle => "triangle",
            LfoShape::Sine => "sine",
            LfoShape::Sawtooth => "sawtooth",
            LfoShape::Square => "square",
        }
    }
}

/// `[0, 127]` → `[0, 100]`, rounding down.
pub fn percent_from_raw(raw: u8) -> i32 {
    raw as i32 * 100 / 127
}

/// `[0, 100]` → `[0, 127]`, rounding down (50 maps to 63).
pub fn level_to_raw(level: i64) -> Result<u8> {
    Error::check_range("VCA level", level, 0, 100)?;
    Ok((level * 127 / 100) as u8)
}

/// `[0, 0x80]` biased at 0x40 → `[-100, 100]`.
pub fn pan_from_raw(raw: u8) -> i32 {
    ((raw as i32 - 0x40) as f64 * 1.5625) as i32
}

/// `[0, 100]` → `[0x80, 0xff]`.
pub fn q_to_raw(q: i64) -> Result<u8> {
    Error::check_range("VCF Q", q, 0, 100)?;
    Ok((q * 127 / 100 + Q_BIAS) as u8)
}

/// Stored Q back to `[0, 100]`. Values below 0x80 come out negative.
pub fn q_from_raw(raw: u8) -> i32 {
    (raw as i32 - Q_BIAS as i32) * 100 / 127
}

/// Replaces the filter bits of the combined byte, keeping the LFO bits.
pub fn compose_filter(byte: u8, filter: u8) -> u8 {
    (filter << 3) | (byte & 0x3)
}

/// Replaces the LFO bits of the combined byte, keeping the filter bits.
pub fn compose_lfo_shape(byte: u8, shape: LfoShape) -> u8 {
    (byte & !0x3) | shape as u8
}

/// Five stage envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Envelope {
    /// Attack time (raw).
    pub attack: u8,
    /// Hold time (raw).
    pub hold: u8,
    /// Decay time (raw).
    pub decay: u8,
    /// Sustain level in percent.
    pub sustain: i32,
    /// Release time (raw).
    pub release: u8,
}

/// Velocity modulation amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct VelocityMod {
    pub to_pitch: i8,
    /// Percent.
    pub to_vca_level: i32,
    pub to_vca_attack: i8,
    pub to_vcf_cutoff: i8,
    pub to_vcf_q: i8,
    pub to_vcf_attack: i8,
    /// Percent, pan scaled.
    pub to_pan: i32,
    pub to_sample_start: i8,
    pub to_aux_env: i8,
}

/// Every zone parameter in external units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct ZoneParams {
    pub root_note: u8,
    pub sample_index: u16,
    pub vca_level: i32,
    pub vca_pan: i32,
    pub vca_envelope: Envelope,
    pub vcf_type: VcfType,
    pub vcf_cutoff: u8,
    pub vcf_q: i32,
    pub vcf_envelope_amount: i32,
    pub vcf_envelope: Envelope,
    pub aux_envelope_amount: i32,
    pub aux_envelope: Envelope,
    pub velocity: VelocityMod,
    pub lfo_shape: LfoShape,
    pub lfo_to_pitch: i32,
    pub lfo_to_cutoff: i32,
    pub lfo_to_vca: i32,
    pub lfo_to_pan: i32,
}

/// Read-only view of a zone record.
#[derive(Debug, Clone, Copy)]
pub struct Zone<'a> {
    image: &'a BankImage,
    address: usize,
    index: usize,
}

impl<'a> Zone<'a> {
    pub(crate) fn new(image: &'a BankImage, address: usize, index: usize) -> Result<Self> {
        image.slice(address, ZONE_SIZE)?;
        Ok(Zone {
            image,
            address,
            index,
        })
    }

    /// Zone index inside its preset.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Absolute address of the record.
    pub fn address(&self) -> usize {
        self.address
    }

    fn byte(&self, field: usize) -> Result<u8> {
        self.image.read_u8(self.address + field)
    }

    fn signed(&self, field: usize) -> Result<i8> {
        Ok(self.byte(field)? as i8)
    }

    fn envelope(&self, field: usize) -> Result<Envelope> {
        let b = self.image.slice(self.address + field, 5)?;
        Ok(Envelope {
            attack: b[0],
            hold: b[1],
            decay: b[2],
            sustain: percent_from_raw(b[3]),
            release: b[4],
        })
    }

    /// Raw VCA level byte.
    pub fn vca_level_raw(&self) -> Result<u8> {
        self.byte(VCA_LEVEL)
    }

    /// VCA level in percent.
    pub fn vca_level(&self) -> Result<i32> {
        Ok(percent_from_raw(self.vca_level_raw()?))
    }

    /// Pan in percent, negative is left.
    pub fn vca_pan(&self) -> Result<i32> {
        Ok(pan_from_raw(self.byte(VCA_PAN)?))
    }

    /// Filter cutoff (raw, identity mapped).
    pub fn vcf_cutoff(&self) -> Result<u8> {
        self.byte(VCF_CUTOFF)
    }

    /// Filter resonance in percent.
    pub fn vcf_q(&self) -> Result<i32> {
        Ok(q_from_raw(self.byte(VCF_Q)?))
    }

    /// Combined filter type / LFO shape byte.
    pub fn vcf_type_lfo_shape_raw(&self) -> Result<u8> {
        self.byte(VCF_TYPE_LFO_SHAPE)
    }

    /// Filter model.
    pub fn vcf_type(&self) -> Result<VcfType> {
        Ok(VcfType::from_bits(self.vcf_type_lfo_shape_raw()? >> 3))
    }

    /// LFO waveform.
    pub fn lfo_shape(&self) -> Result<LfoShape> {
        Ok(LfoShape::from_bits(self.vcf_type_lfo_shape_raw()?))
    }

    /// Reads every parameter at once.
    pub fn params(&self) -> Result<ZoneParams> {
        Ok(ZoneParams {
            root_note: self.byte(ROOT_NOTE)?,
            sample_index: self.image.read_u16(self.address + SAMPLE_INDEX)?,
            vca_level: self.vca_level()?,
            vca_pan: self.vca_pan()?,
            vca_envelope: self.envelope(VCA_ENVELOPE)?,
            vcf_type: self.vcf_type()?,
            vcf_cutoff: self.vcf_cutoff()?,
            vcf_q: self.vcf_q()?,
            vcf_envelope_amount: percent_from_raw(self.byte(VCF_ENVELOPE_AMOUNT)?),
            vcf_envelope: self.envelope(VCF_ENVELOPE)?,
            aux_envelope_amount: percent_from_raw(self.byte(AUX_ENVELOPE_AMOUNT)?),
            aux_envelope: self.envelope(AUX_ENVELOPE)?,
            velocity: VelocityMod {
                to_pitch: self.signed(VEL_TO_PITCH)?,
                to_vca_level: percent_from_raw(self.byte(VEL_TO_VCA_LEVEL)?),
                to_vca_attack: self.signed(VEL_TO_VCA_ATTACK)?,
                to_vcf_cutoff: self.signed(VEL_TO_VCF_CUTOFF)?,
                to_vcf_q: self.signed(VEL_TO_VCF_Q)?,
                to_vcf_attack: self.signed(VEL_TO_VCF_ATTACK)?,
                to_pan: pan_from_raw(self.byte(VEL_TO_VCA_PAN)?),
                to_sample_start: self.signed(VEL_TO_SAMPLE_START)?,
                to_aux_env: self.signed(VEL_TO_AUX_ENV)?,
            },
            lfo_shape: self.lfo_shape()?,
            lfo_to_pitch: percent_from_raw(self.byte(LFO_TO_PITCH)?),
            lfo_to_cutoff: percent_from_raw(self.byte(LFO_TO_CUTOFF)?),
            lfo_to_vca: percent_from_raw(self.byte(LFO_TO_VCA)?),
            lfo_to_pan: percent_from_raw(self.byte(LFO_TO_PAN)?),
        })
    }
}

/// Mutable view of a zone record. Every setter validates its argument before
/// touching the image.
#[derive(Debug)]
pub struct ZoneMut<'a> {
    image: &'a mut BankImage,
    address: usize,
    index: usize,
}

impl<'a> ZoneMut<'a> {
    pub(crate) fn new(image: &'a mut BankImage, address: usize, index: usize) -> Result<Self> {
        image.slice(address, ZONE_SIZE)?;
        Ok(ZoneMut {
            image,
            address,
            index,
        })
    }

    /// Read-only view of the same record.
    pub fn as_zone(&self) -> Zone<'_> {
        Zone {
            image: &*self.image,
            address: self.address,
            index: self.index,
        }
    }

    fn set_byte(&mut self, field: usize, value: u8) -> Result<()> {
        self.image.write_u8(self.address + field, value)
    }

    /// Sets the VCA level from a percentage in `[0, 100]`.
    pub fn set_level(&mut self, level: i64) -> Result<()> {
        let raw = level_to_raw(level)?;
        self.set_byte(VCA_LEVEL, raw)
    }

    /// Sets the filter cutoff in `[0, 255]`.
    pub fn set_cutoff(&mut self, cutoff: i64) -> Result<()> {
        Error::check_range("VCF cutoff", cutoff, 0, 255)?;
        self.set_byte(VCF_CUTOFF, cutoff as u8)
    }

    /// Sets the filter resonance from a percentage in `[0, 100]`.
    pub fn set_q(&mut self, q: i64) -> Result<()> {
        let raw = q_to_raw(q)?;
        self.set_byte(VCF_Q, raw)
    }

    /// Sets the filter model by index, keeping the LFO shape.
    pub fn set_filter(&mut self, filter: i64) -> Result<()> {
        Error::check_range("VCF type", filter, 0, VcfType::MAX_SETTABLE)?;
        let byte = self.as_zone().vcf_type_lfo_shape_raw()?;
        self.set_byte(VCF_TYPE_LFO_SHAPE, compose_filter(byte, filter as u8))
    }

    /// Sets the LFO waveform by index, keeping the filter model.
    pub fn set_lfo_shape(&mut self, shape: i64) -> Result<()> {
        let shape = LfoShape::from_i64(shape)
            .ok_or_else(|| Error::range("LFO shape", shape, 0, 3))?;
        let byte = self.as_zone().vcf_type_lfo_shape_raw()?;
        self.set_byte(VCF_TYPE_LFO_SHAPE, compose_lfo_shape(byte, shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn zone_image() -> BankImage {
        BankImage::from_bytes(vec![0u8; ZONE_SIZE]).unwrap()
    }

    #[test]
    fn test_level_transform() {
        assert_eq!(level_to_raw(0).unwrap(), 0);
        assert_eq!(level_to_raw(100).unwrap(), 127);
        assert_eq!(level_to_raw(50).unwrap(), 63);
        assert!(level_to_raw(-1).is_err());
        assert!(level_to_raw(101).is_err());
        assert_eq!(percent_from_raw(127), 100);
        assert_eq!(percent_from_raw(63), 49);
    }

    #[test]
    fn test_pan_transform() {
        assert_abs_diff_eq!(pan_from_raw(0x40), 0, epsilon = 1);
        assert_abs_diff_eq!(pan_from_raw(0x00), -100, epsilon = 1);
        assert_abs_diff_eq!(pan_from_raw(0x80), 100, epsilon = 1);
    }

    #[test]
    fn test_q_transform() {
        assert_eq!(q_to_raw(0).unwrap(), 0x80);
        assert_eq!(q_to_raw(100).unwrap(), 0xff);
        assert_eq!(q_from_raw(0xff), 100);
        assert_eq!(q_from_raw(0x80), 0);
        assert!(q_to_raw(101).is_err());
    }

    #[test]
    fn test_filter_type_clamps_to_unknown() {
        assert_eq!(VcfType::from_bits(3), VcfType::SecondOrderHipass);
        assert_eq!(VcfType::from_bits(18), VcfType::EsiLopass);
        assert_eq!(VcfType::from_bits(25), VcfType::Unknown);
        assert_eq!(VcfType::from_bits(31).name(), "Unknown");
    }

    #[test]
    fn test_filter_and_lfo_share_a_byte() {
        let mut image = zone_image();
        let mut zone = ZoneMut::new(&mut image, 0, 0).unwrap();
        zone.set_filter(3).unwrap();
        zone.set_lfo_shape(2).unwrap();
        assert_eq!(zone.as_zone().vcf_type_lfo_shape_raw().unwrap(), (3 << 3) | 2);
        zone.set_lfo_shape(1).unwrap();
        let view = zone.as_zone();
        assert_eq!(view.vcf_type_lfo_shape_raw().unwrap(), (3 << 3) | 1);
        assert_eq!(view.vcf_type().unwrap(), VcfType::SecondOrderHipass);
        assert_eq!(view.lfo_shape().unwrap(), LfoShape::Sine);
    }

    #[test]
    fn test_rejected_setters_leave_zone_unchanged() {
        let mut image = zone_image();
        let mut zone = ZoneMut::new(&mut image, 0, 0).unwrap();
        zone.set_level(50).unwrap();
        assert!(matches!(
            zone.set_level(101),
            Err(Error::Range { field: "VCA level", value: 101, min: 0, max: 100 })
        ));
        assert!(zone.set_level(-1).is_err());
        assert!(zone.set_cutoff(256).is_err());
        assert!(zone.set_filter(19).is_err());
        assert!(zone.set_lfo_shape(4).is_err());
        assert!(zone.set_q(-5).is_err());
        drop(zone);
        let mut expected = vec![0u8; ZONE_SIZE];
        expected[VCA_LEVEL] = 63;
        assert_eq!(image.as_bytes(), &expected[..]);
    }

    #[test]
    fn test_params_snapshot() {
        let mut bytes = vec![0u8; ZONE_SIZE];
        bytes[ROOT_NOTE] = 60;
        bytes[SAMPLE_INDEX] = 2;
        bytes[VCA_LEVEL] = 127;
        bytes[VCA_PAN] = 0x40;
        bytes[VCA_ENVELOPE + 3] = 127;
        bytes[VCF_CUTOFF] = 200;
        bytes[VCF_Q] = 0x80;
        bytes[VEL_TO_PITCH] = 0xff;
        let image = BankImage::from_bytes(bytes).unwrap();
        let params = Zone::new(&image, 0, 0).unwrap().params().unwrap();
        assert_eq!(params.root_note, 60);
        assert_eq!(params.sample_index, 2);
        assert_eq!(params.vca_level, 100);
        assert_eq!(params.vca_pan, 0);
        assert_eq!(params.vca_envelope.sustain, 100);
        assert_eq!(params.vcf_cutoff, 200);
        assert_eq!(params.vcf_q, 0);
        assert_eq!(params.velocity.to_pitch, -1);
        assert_eq!(params.vcf_type, VcfType::TwoPoleLowpass);
    }

    #[test]
    fn test_zone_outside_image_is_rejected() {
        let image = zone_image();
        assert!(Zone::new(&image, 1, 0).is_err());
    }
}
