//! Appending objects
//!
//! Banks only ever grow at the end of a region. One primitive handles both
//! kinds of object and runs through four stages in order:
//!
//! 1. scanning the address table for the insertion slot,
//! 2. placing the serialized object at the end of its region,
//! 3. linking the slot into the table,
//! 4. updating the header counters.
//!
//! Everything that can fail for a reason other than an internal bug is
//! checked before the image is touched, so a failed append leaves the bank
//! exactly as it was.

use crate::dialect::{Dialect, SAMPLE_OFFSET};
use crate::image::{BankImage, MAX_IMAGE_SIZE, NEXT_OFFSET, OBJECTS_OFFSET};
use crate::report::{Level, Reporter};
use crate::table::{AddressTable, ObjectKind};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Stage of an append, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AppendStage {
    /// Looking for a free slot.
    Scanning,
    /// Writing the object bytes.
    Placing,
    /// Updating the address table.
    LinkingTable,
    /// Updating the object count and the `next` field.
    LinkingHeader,
}

impl fmt::Display for AppendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppendStage::Scanning => "scanning",
            AppendStage::Placing => "placing",
            AppendStage::LinkingTable => "linking table",
            AppendStage::LinkingHeader => "linking header",
        };
        f.write_str(name)
    }
}

/// Where an appended object ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Appended {
    /// Object kind.
    pub kind: ObjectKind,
    /// Zero-based table slot.
    pub slot: usize,
    /// Absolute address in the image.
    pub address: usize,
    /// Object size in bytes.
    pub size: usize,
}

/// Appends a serialized object of `kind` and links it into its table.
pub fn append_object(
    image: &mut BankImage,
    dialect: Dialect,
    kind: ObjectKind,
    object: &[u8],
    reporter: &dyn Reporter,
) -> Result<Appended> {
    let stage = |s: AppendStage| reporter.report(Level::Detail, format_args!("{} {}", kind, s));

    stage(AppendStage::Scanning);
    let mut table = AddressTable::read(image, dialect, kind)?;
    let slot = match table.insertion_slot() {
        Some(slot) => slot,
        None if table.empty_count() > 0 => {
            return Err(Error::Fragmented {
                kind,
                free: table.empty_count(),
            })
        }
        None => {
            return Err(Error::Capacity {
                kind,
                max: table.max_count(),
            })
        }
    };

    stage(AppendStage::Placing);
    let size = object.len();
    let address = table.region_end();
    let used = AddressTable::read(image, dialect, ObjectKind::Sample)?.region_end();
    if used > image.len() {
        return Err(Error::Format(format!(
            "used region ends at 0x{:08x} but the image holds only {} bytes",
            used,
            image.len()
        )));
    }
    let new_len = used + size;
    if new_len > MAX_IMAGE_SIZE {
        return Err(Error::ImageTooLarge {
            size: new_len,
            max: MAX_IMAGE_SIZE,
        });
    }
    let size_word = u32::try_from(size)
        .ok()
        .filter(|s| table.sentinel().checked_add(*s).is_some())
        .ok_or_else(|| Error::Format(format!("{} table offset overflow", kind)))?;
    let objects = image.read_u32(OBJECTS_OFFSET)?;

    // Bytes past the used region are never saved; drop them so the new
    // object sits directly at the end.
    image.truncate(used);
    image.insert(address, object)?;
    reporter.report(
        Level::Detail,
        format_args!("{} {} placed at 0x{:08x} ({} bytes)", kind, slot, address, size),
    );

    stage(AppendStage::LinkingTable);
    table.link(slot, size_word)?;
    table.write(image)?;

    stage(AppendStage::LinkingHeader);
    image.write_u32(OBJECTS_OFFSET, objects.wrapping_add(1))?;
    if kind == ObjectKind::Sample {
        image.write_u32(NEXT_OFFSET, table.sentinel() - SAMPLE_OFFSET)?;
    }

    Ok(Appended {
        kind,
        slot,
        address,
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{MemoryReporter, NullReporter};
    use crate::test_support::empty_bank_image;

    #[test]
    fn test_append_sample_into_empty_bank() {
        let mut image = empty_bank_image(Dialect::Emulator3x);
        let used = AddressTable::read(&image, Dialect::Emulator3x, ObjectKind::Sample)
            .unwrap()
            .region_end();
        let object = vec![0xabu8; 0x80];
        let appended = append_object(
            &mut image,
            Dialect::Emulator3x,
            ObjectKind::Sample,
            &object,
            &NullReporter,
        )
        .unwrap();

        assert_eq!(appended.slot, 0);
        assert_eq!(appended.address, used);
        assert_eq!(image.len(), used + 0x80);
        let header = image.header().unwrap();
        assert_eq!(header.objects, 1);
        assert_eq!(header.next, 0x80);

        let table = AddressTable::read(&image, Dialect::Emulator3x, ObjectKind::Sample).unwrap();
        assert_eq!(table.entries()[0], SAMPLE_OFFSET);
        assert_eq!(table.sentinel(), SAMPLE_OFFSET + 0x80);
        let location = table.locate(0).unwrap();
        assert_eq!(location.address, used);
        assert_eq!(location.size, 0x80);
    }

    #[test]
    fn test_stages_run_in_order() {
        let mut image = empty_bank_image(Dialect::EmulatorThree);
        let reporter = MemoryReporter::new();
        append_object(
            &mut image,
            Dialect::EmulatorThree,
            ObjectKind::Preset,
            &[0u8; 0x30],
            &reporter,
        )
        .unwrap();
        let details = reporter.at(Level::Detail);
        let order: Vec<usize> = [
            "scanning",
            "placing",
            "linking table",
            "linking header",
        ]
        .iter()
        .map(|s| details.iter().position(|m| m.ends_with(s)).unwrap())
        .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_preset_append_moves_sample_region() {
        let dialect = Dialect::Esi32V3;
        let mut image = empty_bank_image(dialect);
        append_object(&mut image, dialect, ObjectKind::Sample, &[7u8; 0x70], &NullReporter)
            .unwrap();
        let before = AddressTable::read(&image, dialect, ObjectKind::Sample).unwrap();
        let sample_before = before.locate(0).unwrap();

        let appended =
            append_object(&mut image, dialect, ObjectKind::Preset, &[1u8; 0x40], &NullReporter)
                .unwrap();
        let after = AddressTable::read(&image, dialect, ObjectKind::Sample).unwrap();
        assert_eq!(after.entries(), before.entries());
        let sample_after = after.locate(0).unwrap();
        assert_eq!(sample_after.address, sample_before.address + 0x40);
        assert_eq!(image.slice(sample_after.address, 0x70).unwrap(), &[7u8; 0x70][..]);
        assert_eq!(image.slice(appended.address, 0x40).unwrap(), &[1u8; 0x40][..]);
        assert_eq!(image.header().unwrap().objects, 2);
        // `next` is relative to the sample region and does not move
        assert_eq!(image.header().unwrap().next, 0x70);
    }

    #[test]
    fn test_taken_last_slot_is_fragmented() {
        let dialect = Dialect::EmulatorThree;
        let mut image = empty_bank_image(dialect);
        let geometry = dialect.geometry();
        // occupy the last slot so the trailing empty run is gone
        let mut table = AddressTable::read(&image, dialect, ObjectKind::Sample).unwrap();
        table.link(geometry.max_samples - 1, 0x10).unwrap();
        table.write(&mut image).unwrap();
        let used = table.region_end();
        let mut bytes = image.as_bytes().to_vec();
        bytes.resize(used, 0);
        let mut image = BankImage::from_bytes(bytes).unwrap();
        let snapshot = image.as_bytes().to_vec();

        let err = append_object(&mut image, dialect, ObjectKind::Sample, &[0; 0x80], &NullReporter)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Fragmented {
                kind: ObjectKind::Sample,
                free: 255
            }
        ));
        assert_eq!(image.as_bytes(), &snapshot[..]);
    }

    #[test]
    fn test_full_table_leaves_image_untouched() {
        let dialect = Dialect::EmulatorThree;
        let mut image = empty_bank_image(dialect);
        for _ in 0..dialect.geometry().max_presets {
            append_object(&mut image, dialect, ObjectKind::Preset, &[0u8; 0x10], &NullReporter)
                .unwrap();
        }
        let snapshot = image.as_bytes().to_vec();

        let err = append_object(&mut image, dialect, ObjectKind::Preset, &[0u8; 0x10], &NullReporter)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Capacity {
                kind: ObjectKind::Preset,
                ..
            }
        ));
        assert_eq!(image.as_bytes(), &snapshot[..]);
    }

    #[test]
    fn test_placement_message_uses_zero_based_slot() {
        let mut image = empty_bank_image(Dialect::Emulator3x);
        let reporter = MemoryReporter::new();
        append_object(
            &mut image,
            Dialect::Emulator3x,
            ObjectKind::Sample,
            &[0u8; 0x20],
            &reporter,
        )
        .unwrap();
        let details = reporter.at(Level::Detail);
        assert!(details.iter().any(|m| m.starts_with("sample 0 placed at")), "{:?}", details);
    }

    #[test]
    fn test_oversized_object_is_rejected_up_front() {
        let dialect = Dialect::Emulator3x;
        let mut image = empty_bank_image(dialect);
        let snapshot = image.as_bytes().to_vec();
        let object = vec![0u8; MAX_IMAGE_SIZE];
        let err = append_object(&mut image, dialect, ObjectKind::Sample, &object, &NullReporter)
            .unwrap_err();
        assert!(matches!(err, Error::ImageTooLarge { .. }));
        assert_eq!(image.as_bytes(), &snapshot[..]);
    }
}
