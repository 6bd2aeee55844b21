//! Synthetic banks for unit tests.

use crate::dialect::{Dialect, SAMPLE_OFFSET};
use crate::image::{BankImage, NAME_COPY_OFFSET, NAME_OFFSET};
use crate::name;

/// A consistent bank with empty tables and no objects.
pub(crate) fn empty_bank_bytes(dialect: Dialect) -> Vec<u8> {
    let geometry = dialect.geometry();
    let bias = geometry.preset_bias;
    let mut bytes = vec![0u8; geometry.sample_region_base(bias)];

    bytes[..16].copy_from_slice(&dialect.encode_tag());
    bytes[NAME_COPY_OFFSET..NAME_COPY_OFFSET + 16].copy_from_slice(&name::encode("Test bank"));
    bytes[NAME_OFFSET..NAME_OFFSET + 16].copy_from_slice(&name::encode("Test bank"));
    // geometry words with parameters[1] + parameters[2] == parameters[4]
    for (i, word) in [(1, 0x100u32), (2, 0x20), (4, 0x120)] {
        bytes[0x30 + i * 4..0x34 + i * 4].copy_from_slice(&word.to_le_bytes());
    }

    for i in 0..=geometry.max_presets {
        let at = geometry.preset_table + i * 4;
        bytes[at..at + 4].copy_from_slice(&bias.to_le_bytes());
    }
    let sentinel = geometry.sample_table + geometry.max_samples * 4;
    bytes[sentinel..sentinel + 4].copy_from_slice(&SAMPLE_OFFSET.to_le_bytes());

    if bias == 0 {
        bytes[geometry.preset_address(bias)] = 0xee;
    }
    bytes
}

pub(crate) fn empty_bank_image(dialect: Dialect) -> BankImage {
    BankImage::from_bytes(empty_bank_bytes(dialect)).unwrap()
}
