//! New banks from a template
//!
//! The samplers expect a lot of header state this crate does not model, so
//! new banks are never synthesized from scratch. Instead an empty bank saved
//! by an instrument is copied and renamed.

use crate::dialect::Dialect;
use crate::image::{BankImage, NAME_COPY_OFFSET, NAME_OFFSET};
use crate::name;
use crate::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Renames a template image in memory. Returns the stored name and the
/// renamed image.
pub fn rename_template(template: Vec<u8>, bank_name: &str) -> Result<(String, BankImage)> {
    let mut image = BankImage::from_bytes(template)?;
    let dialect = Dialect::resolve(image.as_bytes())?;
    image.header()?;

    // what the name field will hold after padding and truncation
    let stored = name::decode(&name::encode(&name::sanitize(bank_name)));
    image.write_name(NAME_OFFSET, &stored)?;
    image.write_name(NAME_COPY_OFFSET, &stored)?;
    tracing::debug!("renamed {} template to '{}'", dialect, stored);
    Ok((stored, image))
}

/// Copies the bank at `template` into `dir`, named after `bank_name`.
///
/// The file name is the stored bank name. An existing file is never
/// overwritten.
pub fn create_bank<P, Q>(template: P, bank_name: &str, dir: Q) -> Result<PathBuf>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let bytes = std::fs::read(template)?;
    let (stored, image) = rename_template(bytes, bank_name)?;
    let path = dir.as_ref().join(name::to_filename(&stored));
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)?;
    file.write_all(image.as_bytes())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::empty_bank_bytes;
    use crate::Error;

    #[test]
    fn test_rename_template() {
        let (stored, image) =
            rename_template(empty_bank_bytes(Dialect::Emulator3x), "My bank: drums & more").unwrap();
        assert_eq!(stored, "My bank? drums ?");
        let header = image.header().unwrap();
        assert_eq!(header.name, stored);
        assert_eq!(header.name_copy, stored);
    }

    #[test]
    fn test_template_must_be_a_bank() {
        let err = rename_template(vec![0u8; 0x200], "x").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_create_bank_writes_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("empty bank");
        std::fs::write(&template, empty_bank_bytes(Dialect::EmulatorThree)).unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let path = create_bank(&template, "Strings", &out).unwrap();
        assert_eq!(path, out.join("Strings"));
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), empty_bank_bytes(Dialect::EmulatorThree).len());
        assert_eq!(&written[0x50..0x57], b"Strings");

        assert!(matches!(
            create_bank(&template, "Strings", &out),
            Err(Error::Io(_))
        ));
    }
}
