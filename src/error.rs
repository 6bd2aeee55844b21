//! Error handling for bank parsing, editing and persistence.

use crate::table::ObjectKind;
use thiserror::Error;

/// Convenient result alias for bank operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that may occur while reading, editing or writing a bank.
#[derive(Debug, Error)]
pub enum Error {
    /// The image is not a bank this crate understands (unknown dialect tag,
    /// corrupt address table, truncated header).
    #[error("bank format error: {0}")]
    Format(String),

    /// A computed byte range falls outside the loaded image.
    #[error("range 0x{offset:08x}..+{len} lies outside the {image_len} byte image")]
    OutOfBounds {
        /// Absolute start of the requested range.
        offset: usize,
        /// Requested length in bytes.
        len: usize,
        /// Length of the loaded image.
        image_len: usize,
    },

    /// A setter argument is outside its documented bound. No state was changed.
    #[error("value {value} for {field} not in range [{min}, {max}]")]
    Range {
        /// Name of the rejected field.
        field: &'static str,
        /// Offending value.
        value: i64,
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },

    /// The address table has no free slot left. Nothing was written.
    #[error("no free {kind} slot left (maximum {max})")]
    Capacity {
        /// Table that is full.
        kind: ObjectKind,
        /// Slot count of the table.
        max: usize,
    },

    /// The last slot is taken but earlier slots are empty. New objects go
    /// after the last live one to keep offsets increasing, so the earlier
    /// slots cannot be reused. Nothing was written.
    #[error("no free {kind} slot after the last {kind} ({free} earlier slots are empty but cannot be reused)")]
    Fragmented {
        /// Table whose trailing slot is taken.
        kind: ObjectKind,
        /// Empty slots before the last live one.
        free: usize,
    },

    /// Growing the image would exceed the fixed maximum image size.
    #[error("bank image of {size} bytes exceeds the {max} byte limit")]
    ImageTooLarge {
        /// Size the image would reach.
        size: usize,
        /// Fixed maximum image size.
        max: usize,
    },

    /// IO error from the filesystem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure in the PCM source or sink.
    #[error("PCM error: {0}")]
    Pcm(String),
}

impl Error {
    /// Builds a [`Error::Range`] for `field`.
    pub(crate) fn range(field: &'static str, value: i64, min: i64, max: i64) -> Self {
        Error::Range {
            field,
            value,
            min,
            max,
        }
    }

    /// Returns an error unless `min <= value <= max`.
    pub(crate) fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<()> {
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(Self::range(field, value, min, max))
        }
    }
}

#[cfg(feature = "wav")]
impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => Error::Io(io),
            other => Error::Pcm(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_message_names_field_and_bounds() {
        let err = Error::range("VCA level", 101, 0, 100);
        assert_eq!(err.to_string(), "value 101 for VCA level not in range [0, 100]");
    }

    #[test]
    fn test_check_range_accepts_bounds() {
        assert!(Error::check_range("cutoff", 0, 0, 255).is_ok());
        assert!(Error::check_range("cutoff", 255, 0, 255).is_ok());
        assert!(Error::check_range("cutoff", 256, 0, 255).is_err());
    }

    #[test]
    fn test_fragmented_message_differs_from_capacity() {
        let fragmented = Error::Fragmented {
            kind: ObjectKind::Sample,
            free: 255,
        };
        let full = Error::Capacity {
            kind: ObjectKind::Sample,
            max: 256,
        };
        assert!(fragmented.to_string().contains("255 earlier slots are empty"));
        assert_ne!(fragmented.to_string(), full.to_string());
    }
}
