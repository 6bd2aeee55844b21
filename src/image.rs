//! Bank image buffer
//!
//! The whole bank is loaded into memory once and edited in place. Every read
//! and write goes through an offset+length accessor that checks the range
//! against the current image length first; nothing is reinterpreted as a
//! typed record.

use crate::dialect::TAG_SIZE;
use crate::name::{self, NAME_SIZE};
use crate::{Error, Result};
use nom::bytes::complete::take;
use nom::number::complete::le_u32;
use nom::sequence::tuple;
use nom::IResult;
use std::fs;
use std::path::Path;

/// Largest image the samplers can address (128 MiB).
pub const MAX_IMAGE_SIZE: usize = 0x0800_0000;

/// Size of the fixed bank header.
pub const HEADER_SIZE: usize = 0x70;

/// Number of geometry parameter words in the header.
pub const BANK_PARAMETERS: usize = 8;

/// Number of secondary parameter words in the header.
pub const MORE_BANK_PARAMETERS: usize = 4;

pub(crate) const NAME_COPY_OFFSET: usize = 0x10;
pub(crate) const OBJECTS_OFFSET: usize = 0x20;
pub(crate) const NEXT_OFFSET: usize = 0x2c;
pub(crate) const NAME_OFFSET: usize = 0x50;

/// Snapshot of the bank header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankHeader {
    /// Raw dialect tag field.
    pub tag: [u8; TAG_SIZE],
    /// Second copy of the display name, trimmed.
    pub name_copy: String,
    /// Object count as stored.
    pub objects: u32,
    /// End of the used sample region, relative to the sample region base.
    pub next: u32,
    /// Geometry parameter words.
    pub parameters: [u32; BANK_PARAMETERS],
    /// Display name, trimmed.
    pub name: String,
    /// Secondary parameter words.
    pub more_parameters: [u32; MORE_BANK_PARAMETERS],
}

impl BankHeader {
    /// Index of the currently selected preset.
    pub fn current_preset(&self) -> u32 {
        self.more_parameters[0]
    }

    /// Index of the currently selected sample.
    pub fn current_sample(&self) -> u32 {
        self.more_parameters[1]
    }

    /// The samplers keep `parameters[4] == parameters[1] + parameters[2]`.
    pub fn checksum_ok(&self) -> bool {
        self.parameters[1].wrapping_add(self.parameters[2]) == self.parameters[4]
    }

    /// Parses the fixed header from the start of an image.
    pub fn parse(input: &[u8]) -> IResult<&[u8], BankHeader> {
        let (input, (tag, name_copy, objects, _reserved, next)) = tuple((
            take(TAG_SIZE),
            take(NAME_SIZE),
            le_u32,
            take(8usize),
            le_u32,
        ))(input)?;
        let (input, parameters) = le_u32_array::<BANK_PARAMETERS>(input)?;
        let (input, name) = take(NAME_SIZE)(input)?;
        let (input, more_parameters) = le_u32_array::<MORE_BANK_PARAMETERS>(input)?;

        let mut tag_field = [0u8; TAG_SIZE];
        tag_field.copy_from_slice(tag);

        Ok((
            input,
            BankHeader {
                tag: tag_field,
                name_copy: name::decode(name_copy),
                objects,
                next,
                parameters,
                name: name::decode(name),
                more_parameters,
            },
        ))
    }
}

fn le_u32_array<const N: usize>(mut input: &[u8]) -> IResult<&[u8], [u32; N]> {
    let mut words = [0u32; N];
    for word in words.iter_mut() {
        let (rest, value) = le_u32(input)?;
        *word = value;
        input = rest;
    }
    Ok((input, words))
}

/// Owned, bounds-checked bank bytes.
#[derive(Debug, Clone)]
pub struct BankImage {
    bytes: Vec<u8>,
}

impl BankImage {
    /// Wraps raw bytes, rejecting images larger than [`MAX_IMAGE_SIZE`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(Error::ImageTooLarge {
                size: bytes.len(),
                max: MAX_IMAGE_SIZE,
            });
        }
        Ok(BankImage { bytes })
    }

    /// Reads a whole image from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(fs::read(path)?)
    }

    /// Writes the first `len` bytes of the image to disk in one pass.
    pub fn save<P: AsRef<Path>>(&self, path: P, len: usize) -> Result<()> {
        fs::write(path, self.slice(0, len)?)?;
        Ok(())
    }

    /// Current image length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the image holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whole image as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn check(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(offset..end),
            _ => Err(Error::OutOfBounds {
                offset,
                len,
                image_len: self.bytes.len(),
            }),
        }
    }

    /// Borrows `len` bytes at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.check(offset, len)?;
        Ok(&self.bytes[range])
    }

    /// Mutably borrows `len` bytes at `offset`.
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let range = self.check(offset, len)?;
        Ok(&mut self.bytes[range])
    }

    /// Reads one byte.
    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    /// Writes one byte.
    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        self.slice_mut(offset, 1)?[0] = value;
        Ok(())
    }

    /// Reads a little-endian u16.
    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        let b = self.slice(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Writes a little-endian u16.
    pub fn write_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        self.slice_mut(offset, 2)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Reads a little-endian u32.
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let b = self.slice(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Writes a little-endian u32.
    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.slice_mut(offset, 4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Reads `count` consecutive u32 words.
    pub fn read_u32_words(&self, offset: usize, count: usize) -> Result<Vec<u32>> {
        let bytes = self.slice(offset, count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Reads a fixed-width name field, trailing spaces dropped.
    pub fn read_name(&self, offset: usize) -> Result<String> {
        Ok(name::decode(self.slice(offset, NAME_SIZE)?))
    }

    /// Writes a fixed-width name field, space padded.
    pub fn write_name(&mut self, offset: usize, value: &str) -> Result<()> {
        self.slice_mut(offset, NAME_SIZE)?
            .copy_from_slice(&name::encode(value));
        Ok(())
    }

    /// Parses the header snapshot.
    pub fn header(&self) -> Result<BankHeader> {
        let bytes = self.slice(0, HEADER_SIZE)?;
        BankHeader::parse(bytes)
            .map(|(_, header)| header)
            .map_err(|e| Error::Format(format!("bank header: {}", e)))
    }

    /// Drops everything past `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Inserts `data` at `offset`, shifting the tail of the image.
    ///
    /// The resulting size is checked against [`MAX_IMAGE_SIZE`] before the
    /// buffer is touched.
    pub(crate) fn insert(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.check(offset, 0)?;
        let size = self.bytes.len() + data.len();
        if size > MAX_IMAGE_SIZE {
            return Err(Error::ImageTooLarge {
                size,
                max: MAX_IMAGE_SIZE,
            });
        }
        self.bytes.splice(offset..offset, data.iter().copied());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes() -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..11].copy_from_slice(b"EMULATOR 3X");
        data[0x10..0x20].copy_from_slice(b"MY BANK         ");
        data[0x20..0x24].copy_from_slice(&7u32.to_le_bytes());
        data[0x2c..0x30].copy_from_slice(&0x1234u32.to_le_bytes());
        data[0x34..0x38].copy_from_slice(&10u32.to_le_bytes());
        data[0x38..0x3c].copy_from_slice(&20u32.to_le_bytes());
        data[0x40..0x44].copy_from_slice(&30u32.to_le_bytes());
        data[0x50..0x60].copy_from_slice(b"MY BANK         ");
        data[0x60..0x64].copy_from_slice(&3u32.to_le_bytes());
        data[0x64..0x68].copy_from_slice(&5u32.to_le_bytes());
        data
    }

    #[test]
    fn test_parse_header() {
        let image = BankImage::from_bytes(header_bytes()).unwrap();
        let header = image.header().unwrap();
        assert_eq!(&header.tag[..11], b"EMULATOR 3X");
        assert_eq!(header.name, "MY BANK");
        assert_eq!(header.name_copy, "MY BANK");
        assert_eq!(header.objects, 7);
        assert_eq!(header.next, 0x1234);
        assert_eq!(header.current_preset(), 3);
        assert_eq!(header.current_sample(), 5);
        assert!(header.checksum_ok());
    }

    #[test]
    fn test_header_too_short() {
        let image = BankImage::from_bytes(vec![0u8; 0x20]).unwrap();
        assert!(image.header().is_err());
    }

    #[test]
    fn test_bounds_checked_access() {
        let mut image = BankImage::from_bytes(vec![0u8; 8]).unwrap();
        image.write_u32(4, 0xdead_beef).unwrap();
        assert_eq!(image.read_u32(4).unwrap(), 0xdead_beef);
        assert_eq!(image.read_u16(4).unwrap(), 0xbeef);
        assert!(matches!(
            image.read_u32(5),
            Err(Error::OutOfBounds { offset: 5, len: 4, image_len: 8 })
        ));
        assert!(image.write_u8(8, 1).is_err());
        assert!(image.slice(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_insert_shifts_tail() {
        let mut image = BankImage::from_bytes(vec![1, 2, 3]).unwrap();
        image.insert(1, &[9, 9]).unwrap();
        assert_eq!(image.as_bytes(), &[1, 9, 9, 2, 3]);
        assert!(image.insert(6, &[0]).is_err());
    }

    #[test]
    fn test_names_round_trip_through_fields() {
        let mut image = BankImage::from_bytes(vec![0u8; 32]).unwrap();
        image.write_name(16, "Piano").unwrap();
        assert_eq!(image.slice(16, 16).unwrap(), b"Piano           ");
        assert_eq!(image.read_name(16).unwrap(), "Piano");
    }
}
