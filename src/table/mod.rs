//! Address tables
//!
//! Presets and samples are located through tables of `max + 1` cumulative
//! u32 offsets. The last entry is a sentinel marking the end of the region.
//! Objects carry no length field: the size of a live object is the distance
//! from its offset to the next entry that starts another object.
//!
//! The two tables mark empty slots differently:
//! - the preset table is fully cumulative, so an empty slot repeats the
//!   offset of the following slot;
//! - the sample table is zero filled past the last sample; an entry of zero
//!   (or one equal to the next live offset) is empty.
//!
//! In memory both become a tagged [`Slot`].

use crate::dialect::{Dialect, Geometry, SAMPLE_OFFSET};
use crate::image::BankImage;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Kind of object an address table locates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    /// Presets (with their zones).
    Preset,
    /// Samples.
    Sample,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Preset => f.write_str("preset"),
            ObjectKind::Sample => f.write_str("sample"),
        }
    }
}

/// How a table encodes empty slots on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEncoding {
    /// Empty slots repeat the next offset.
    Cumulative,
    /// Empty slots hold zero.
    ZeroFilled,
}

impl ObjectKind {
    /// On-disk empty slot encoding for this table.
    pub fn encoding(&self) -> SlotEncoding {
        match self {
            ObjectKind::Preset => SlotEncoding::Cumulative,
            ObjectKind::Sample => SlotEncoding::ZeroFilled,
        }
    }
}

/// Decoded table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// No object in this slot.
    Empty,
    /// Object at `offset` (table relative) spanning `size` bytes.
    Live {
        /// Raw table offset.
        offset: u32,
        /// Size inferred from the next offset.
        size: u32,
    },
}

/// Absolute location of a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLocation {
    /// Slot index in the table.
    pub index: usize,
    /// Absolute address in the image.
    pub address: usize,
    /// Object size in bytes.
    pub size: usize,
}

/// In-memory copy of one address table.
#[derive(Debug, Clone)]
pub struct AddressTable {
    kind: ObjectKind,
    table_offset: usize,
    region_base: usize,
    bias: u32,
    entries: Vec<u32>,
}

impl AddressTable {
    /// Reads and validates the `kind` table of a bank.
    pub fn read(image: &BankImage, dialect: Dialect, kind: ObjectKind) -> Result<Self> {
        let geometry = dialect.geometry();
        let (table_offset, max, region_base, bias) = match kind {
            ObjectKind::Preset => (
                geometry.preset_table,
                geometry.max_presets,
                geometry.preset_base,
                geometry.preset_bias,
            ),
            ObjectKind::Sample => {
                let preset_sentinel = Self::preset_sentinel(image, &geometry)?;
                (
                    geometry.sample_table,
                    geometry.max_samples,
                    geometry.sample_region_base(preset_sentinel),
                    SAMPLE_OFFSET,
                )
            }
        };
        let entries = image.read_u32_words(table_offset, max + 1)?;
        let table = AddressTable {
            kind,
            table_offset,
            region_base,
            bias,
            entries,
        };
        table.validate()?;
        Ok(table)
    }

    fn preset_sentinel(image: &BankImage, geometry: &Geometry) -> Result<u32> {
        image.read_u32(geometry.preset_table + geometry.max_presets * 4)
    }

    fn validate(&self) -> Result<()> {
        let sentinel = self.sentinel();
        if sentinel < self.bias {
            return Err(Error::Format(format!(
                "{} table sentinel 0x{:08x} below region offset 0x{:08x}",
                self.kind, sentinel, self.bias
            )));
        }

        let mut previous = self.bias;
        for (index, &entry) in self.entries.iter().enumerate() {
            if entry == 0 && self.kind.encoding() == SlotEncoding::ZeroFilled {
                continue;
            }
            if entry < previous {
                return Err(Error::Format(format!(
                    "{} table entry {} (0x{:08x}) is below the previous offset 0x{:08x}",
                    self.kind, index, entry, previous
                )));
            }
            previous = entry;
        }
        Ok(())
    }

    /// Table kind.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Number of slots, excluding the sentinel.
    pub fn max_count(&self) -> usize {
        self.entries.len() - 1
    }

    /// Raw table entries including the sentinel.
    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    /// Sentinel entry marking the end of the region.
    pub fn sentinel(&self) -> u32 {
        self.entries[self.max_count()]
    }

    /// Absolute address a table offset maps to. `read` guarantees every
    /// live offset and the sentinel are at least the bias.
    pub(crate) fn address_of(&self, offset: u32) -> usize {
        self.region_base + (offset - self.bias) as usize
    }

    /// Absolute end of the region (first byte after the last object).
    pub fn region_end(&self) -> usize {
        self.address_of(self.sentinel())
    }

    fn next_offset(&self, index: usize) -> u32 {
        match self.kind.encoding() {
            SlotEncoding::Cumulative => self.entries[index + 1],
            SlotEncoding::ZeroFilled => self.entries[index + 1..]
                .iter()
                .copied()
                .find(|&e| e != 0)
                .unwrap_or_else(|| self.sentinel()),
        }
    }

    /// Decodes slot `index`, `None` past the last slot.
    pub fn slot(&self, index: usize) -> Option<Slot> {
        if index >= self.max_count() {
            return None;
        }
        let offset = self.entries[index];
        if offset == 0 && self.kind.encoding() == SlotEncoding::ZeroFilled {
            return Some(Slot::Empty);
        }
        let end = self.next_offset(index);
        if end == offset {
            Some(Slot::Empty)
        } else {
            Some(Slot::Live {
                offset,
                size: end - offset,
            })
        }
    }

    /// Iterates over the live objects in slot order. Can be restarted by
    /// calling it again.
    pub fn live(&self) -> LiveObjects<'_> {
        LiveObjects {
            table: self,
            index: 0,
        }
    }

    /// Location of the object in slot `index`, if any.
    pub fn locate(&self, index: usize) -> Option<ObjectLocation> {
        match self.slot(index)? {
            Slot::Empty => None,
            Slot::Live { offset, size } => Some(ObjectLocation {
                index,
                address: self.address_of(offset),
                size: size as usize,
            }),
        }
    }

    /// Number of live slots.
    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    /// First slot of the trailing run of empty slots, where a new object can
    /// be placed at the end of the region without breaking offset order.
    pub fn insertion_slot(&self) -> Option<usize> {
        let after_last_live = (0..self.max_count())
            .rev()
            .find(|&i| matches!(self.slot(i), Some(Slot::Live { .. })))
            .map_or(0, |i| i + 1);
        (after_last_live < self.max_count()).then_some(after_last_live)
    }

    /// Number of empty slots anywhere in the table.
    pub fn empty_count(&self) -> usize {
        self.max_count() - self.live_count()
    }

    /// Links an object of `size` bytes, placed at the old region end, into
    /// slot `index`.
    pub(crate) fn link(&mut self, index: usize, size: u32) -> Result<()> {
        let max = self.max_count();
        let old_sentinel = self.sentinel();
        let new_sentinel = old_sentinel.checked_add(size).ok_or_else(|| {
            Error::Format(format!("{} table offset overflow", self.kind))
        })?;
        match self.kind.encoding() {
            SlotEncoding::ZeroFilled => {
                self.entries[index] = old_sentinel;
                self.entries[max] = new_sentinel;
            }
            SlotEncoding::Cumulative => {
                for entry in &mut self.entries[index + 1..=max] {
                    *entry = new_sentinel;
                }
            }
        }
        Ok(())
    }

    /// Writes the entries back into the image.
    pub(crate) fn write(&self, image: &mut BankImage) -> Result<()> {
        for (i, &entry) in self.entries.iter().enumerate() {
            image.write_u32(self.table_offset + i * 4, entry)?;
        }
        Ok(())
    }
}

/// Restartable walk over live table slots.
#[derive(Debug, Clone)]
pub struct LiveObjects<'a> {
    table: &'a AddressTable,
    index: usize,
}

impl Iterator for LiveObjects<'_> {
    type Item = ObjectLocation;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.table.max_count() {
            let index = self.index;
            self.index += 1;
            if let Some(location) = self.table.locate(index) {
                return Some(location);
            }
        }
        None
    }
}
