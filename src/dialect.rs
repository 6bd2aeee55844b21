//! Bank dialect detection
//!
//! Three sampler generations share the bank container but place the address
//! tables and object regions at different offsets. The dialect is read from the
//! tag field at the start of the image and resolved exactly once; every
//! table and region lookup takes the resolved [`Geometry`] explicitly.
//!
//! | Dialect | Preset table | Sample table | Preset base | Bias | Presets | Samples |
//! |---|---|---|---|---|---|---|
//! | Emulator 3X | 0x17CA | 0x1BD2 | 0x2B72 | 0 | 256 | 999 |
//! | ESI-32 v3 | 0x17CA | 0x1BD2 | 0x2B72 | 0 | 256 | 999 |
//! | Emulator Three | 0x160C | 0x1A7A | 0x207E | 0x200 | 128 | 256 |

use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Size of the dialect tag field at the start of the image.
pub const TAG_SIZE: usize = 16;

/// Offset of sample table entries relative to the sample region base.
pub const SAMPLE_OFFSET: u32 = 0x0018_0000;

/// On-disk geometry variant of a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    /// Emulator 3X banks.
    Emulator3x,
    /// ESI-32 banks written by OS v3 (same geometry as the 3X).
    Esi32V3,
    /// Original Emulator Three banks.
    EmulatorThree,
}

/// Absolute offsets and table sizes for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Absolute offset of the preset address table.
    pub preset_table: usize,
    /// Absolute offset of the sample address table.
    pub sample_table: usize,
    /// Absolute address a preset table offset of `preset_bias` maps to.
    pub preset_base: usize,
    /// Value subtracted from preset table entries before adding `preset_base`.
    pub preset_bias: u32,
    /// Sample region base before adding the preset region length. There is
    /// always one marker byte between the last preset and the first sample.
    pub sample_base: usize,
    /// Number of preset slots.
    pub max_presets: usize,
    /// Number of sample slots.
    pub max_samples: usize,
}

const EMU_3X_GEOMETRY: Geometry = Geometry {
    preset_table: 0x17ca,
    sample_table: 0x1bd2,
    preset_base: 0x2b72,
    preset_bias: 0,
    sample_base: 0x2b72 + 1,
    max_presets: 0x100,
    max_samples: 999,
};

const EMU_THREE_GEOMETRY: Geometry = Geometry {
    preset_table: 0x160c,
    sample_table: 0x1a7a,
    preset_base: 0x207e,
    preset_bias: 0x200,
    sample_base: 0x207e + 1 - 0x200,
    max_presets: 0x80,
    max_samples: 0x100,
};

impl Dialect {
    /// All recognized dialects.
    pub const ALL: [Dialect; 3] = [
        Dialect::Emulator3x,
        Dialect::Esi32V3,
        Dialect::EmulatorThree,
    ];

    /// Resolves the dialect from the first bytes of an image.
    ///
    /// The tag must match byte for byte and be followed by a NUL inside the
    /// tag field. Anything else is a format error; there is no fallback.
    pub fn resolve(image: &[u8]) -> Result<Dialect> {
        let field = image.get(..TAG_SIZE).ok_or_else(|| {
            Error::Format(format!(
                "image of {} bytes is too small for the dialect tag",
                image.len()
            ))
        })?;

        Self::ALL
            .into_iter()
            .find(|dialect| {
                let tag = dialect.tag().as_bytes();
                field.starts_with(tag) && field[tag.len()] == 0
            })
            .ok_or_else(|| {
                let shown: String = field
                    .iter()
                    .take_while(|&&b| b != 0)
                    .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                    .collect();
                Error::Format(format!("unsupported bank format '{}'", shown))
            })
    }

    /// ASCII tag stored at the start of banks of this dialect.
    pub fn tag(&self) -> &'static str {
        match self {
            Dialect::Emulator3x => "EMULATOR 3X",
            Dialect::Esi32V3 => "ESI-32 v3",
            Dialect::EmulatorThree => "EMULATOR THREE",
        }
    }

    /// Table and region layout for this dialect.
    pub fn geometry(&self) -> Geometry {
        match self {
            Dialect::Emulator3x | Dialect::Esi32V3 => EMU_3X_GEOMETRY,
            Dialect::EmulatorThree => EMU_THREE_GEOMETRY,
        }
    }

    /// Writes this dialect's tag into a tag field, NUL padding the rest.
    pub fn encode_tag(&self) -> [u8; TAG_SIZE] {
        let mut field = [0u8; TAG_SIZE];
        let tag = self.tag().as_bytes();
        field[..tag.len()].copy_from_slice(tag);
        field
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Geometry {
    /// Absolute address of a preset from its table entry.
    pub fn preset_address(&self, entry: u32) -> usize {
        self.preset_base + entry as usize - self.preset_bias as usize
    }

    /// Absolute sample region base given the preset table sentinel.
    pub fn sample_region_base(&self, preset_sentinel: u32) -> usize {
        self.sample_base + preset_sentinel as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_field(tag: &[u8]) -> Vec<u8> {
        let mut field = vec![0u8; TAG_SIZE];
        field[..tag.len()].copy_from_slice(tag);
        field
    }

    #[test]
    fn test_resolve_each_tag() {
        for dialect in Dialect::ALL {
            let resolved = Dialect::resolve(&dialect.encode_tag()).unwrap();
            assert_eq!(resolved, dialect);
        }
    }

    #[test]
    fn test_geometry_constants() {
        let g = Dialect::Emulator3x.geometry();
        assert_eq!(g.preset_table, 0x17ca);
        assert_eq!(g.sample_table, 0x1bd2);
        assert_eq!(g.max_presets, 256);
        assert_eq!(g.max_samples, 999);
        assert_eq!(Dialect::Esi32V3.geometry(), g);

        let g = Dialect::EmulatorThree.geometry();
        assert_eq!(g.preset_table, 0x160c);
        assert_eq!(g.sample_table, 0x1a7a);
        assert_eq!(g.max_presets, 128);
        assert_eq!(g.max_samples, 256);
        assert_eq!(g.preset_address(0x200), 0x207e);
    }

    #[test]
    fn test_tables_do_not_overlap_regions() {
        for dialect in Dialect::ALL {
            let g = dialect.geometry();
            assert!(g.preset_table + (g.max_presets + 1) * 4 <= g.sample_table);
            assert!(g.sample_table + (g.max_samples + 1) * 4 <= g.preset_base);
        }
    }

    #[test]
    fn test_unknown_eight_byte_tag_is_rejected() {
        let result = Dialect::resolve(&tag_field(b"EMULATOR"));
        assert!(matches!(result, Err(Error::Format(_))));
        let result = Dialect::resolve(&tag_field(b"EMU SYS "));
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_tag_must_be_terminated() {
        let result = Dialect::resolve(&tag_field(b"EMULATOR 3XL"));
        assert!(result.is_err());
    }

    #[test]
    fn test_short_image_is_rejected() {
        assert!(Dialect::resolve(b"EMULATOR 3X").is_err());
    }
}
