//! Synthetic banks shared by the integration tests.
#![allow(dead_code)]

use e3bank::name;
use e3bank::preset::{PRESET_HEADER_SIZE, ZONE_SIZE};
use e3bank::{Dialect, SAMPLE_OFFSET};

/// Zone record with the given type/LFO, level and pan bytes.
pub fn zone(type_lfo: u8, level: u8, pan: u8) -> [u8; ZONE_SIZE] {
    let mut zone = [0u8; ZONE_SIZE];
    zone[0x00] = 60;
    zone[0x1a] = type_lfo;
    zone[0x1b] = level;
    zone[0x1c] = pan;
    zone[0x1e] = 0x80;
    zone
}

/// Preset object: header, one size word per zone, zone records.
pub fn preset(preset_name: &str, zones: &[[u8; ZONE_SIZE]]) -> Vec<u8> {
    let mut object = vec![0u8; PRESET_HEADER_SIZE];
    object[..16].copy_from_slice(&name::encode(preset_name));
    object[0x2e..0x30].copy_from_slice(&(zones.len() as u16).to_le_bytes());
    for _ in zones {
        object.extend_from_slice(&(ZONE_SIZE as u32).to_le_bytes());
    }
    for zone in zones {
        object.extend_from_slice(zone);
    }
    object
}

/// Consistent bank image holding `presets` and no samples.
pub fn bank_bytes(dialect: Dialect, presets: &[Vec<u8>]) -> Vec<u8> {
    let geometry = dialect.geometry();
    let bias = geometry.preset_bias;
    let presets_len: usize = presets.iter().map(Vec::len).sum();
    let sentinel = bias + presets_len as u32;
    let mut bytes = vec![0u8; geometry.sample_region_base(sentinel)];

    bytes[..16].copy_from_slice(&dialect.encode_tag());
    bytes[0x10..0x20].copy_from_slice(&name::encode("Synthetic"));
    bytes[0x50..0x60].copy_from_slice(&name::encode("Synthetic"));
    bytes[0x20..0x24].copy_from_slice(&(presets.len() as u32).to_le_bytes());
    for (i, word) in [(1usize, 0x40u32), (2, 0x2), (4, 0x42)] {
        bytes[0x30 + i * 4..0x34 + i * 4].copy_from_slice(&word.to_le_bytes());
    }

    let mut offset = bias;
    for i in 0..=geometry.max_presets {
        let at = geometry.preset_table + i * 4;
        bytes[at..at + 4].copy_from_slice(&offset.to_le_bytes());
        if let Some(object) = presets.get(i) {
            let address = geometry.preset_address(offset);
            bytes[address..address + object.len()].copy_from_slice(object);
            offset += object.len() as u32;
        }
    }
    let at = geometry.sample_table + geometry.max_samples * 4;
    bytes[at..at + 4].copy_from_slice(&SAMPLE_OFFSET.to_le_bytes());

    if bias == 0 {
        bytes[geometry.preset_address(sentinel)] = 0xee;
    }
    bytes
}
