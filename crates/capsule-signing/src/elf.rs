//! Minimal ELF section access for self-contained packages.
//!
//! A package is a single ELF image whose signing sections were reserved
//! at build time. Only the section header table is parsed; program
//! headers, relocations and symbols are irrelevant here. Both ELF
//! classes and both byte orders are handled.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::debug;

use crate::error::SigningError;
use crate::section::SectionStore;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const CLASS_32: u8 = 1;
const CLASS_64: u8 = 2;
const DATA_LE: u8 = 1;
const DATA_BE: u8 = 2;

/// An ELF package opened from disk, with its section table resolved.
#[derive(Debug)]
pub struct ElfPackage {
    path: PathBuf,
    data: Vec<u8>,
    sections: Vec<(String, Range<usize>)>,
}

impl ElfPackage {
    /// Reads and parses the package at `path`.
    pub fn open(path: &Path) -> Result<Self, SigningError> {
        let data = fs::read(path)?;
        let sections = parse_sections(&data)?;
        debug!(
            "opened {} with {} section(s)",
            path.display(),
            sections.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            data,
            sections,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw bytes of the whole image.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// The byte range a named section occupies, if present.
    pub fn section_range(&self, name: &str) -> Option<Range<usize>> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, range)| range.clone())
    }
}

impl SectionStore for ElfPackage {
    fn section(&self, name: &str) -> Result<Option<Vec<u8>>, SigningError> {
        Ok(self
            .section_range(name)
            .map(|range| self.data[range].to_vec()))
    }

    fn embed(&mut self, name: &str, text: &str) -> Result<(), SigningError> {
        let range = self.section_range(name).ok_or_else(|| SigningError::Embed {
            section: name.to_string(),
            reason: "section not present in package".into(),
        })?;
        if text.len() > range.len() {
            return Err(SigningError::Embed {
                section: name.to_string(),
                reason: format!(
                    "payload of {} bytes exceeds reserved {} bytes",
                    text.len(),
                    range.len()
                ),
            });
        }

        let slot = &mut self.data[range];
        slot[..text.len()].copy_from_slice(text.as_bytes());
        slot[text.len()..].fill(0);

        fs::write(&self.path, &self.data).map_err(|e| SigningError::Embed {
            section: name.to_string(),
            reason: format!("could not rewrite package: {e}"),
        })?;
        Ok(())
    }
}

fn parse_sections(data: &[u8]) -> Result<Vec<(String, Range<usize>)>, SigningError> {
    if data.len() < 0x40 {
        return Err(SigningError::MalformedPackage("image too short".into()));
    }
    if data[..4] != ELF_MAGIC {
        return Err(SigningError::MalformedPackage("missing ELF magic".into()));
    }

    let class = data[4];
    match data[5] {
        DATA_LE => parse_sections_ordered::<LittleEndian>(data, class),
        DATA_BE => parse_sections_ordered::<BigEndian>(data, class),
        other => Err(SigningError::MalformedPackage(format!(
            "unknown data encoding {other}"
        ))),
    }
}

fn parse_sections_ordered<O: ByteOrder>(
    data: &[u8],
    class: u8,
) -> Result<Vec<(String, Range<usize>)>, SigningError> {
    let (shoff, shentsize, shnum, shstrndx) = match class {
        CLASS_64 => (
            O::read_u64(&data[0x28..]) as usize,
            O::read_u16(&data[0x3a..]) as usize,
            O::read_u16(&data[0x3c..]) as usize,
            O::read_u16(&data[0x3e..]) as usize,
        ),
        CLASS_32 => (
            O::read_u32(&data[0x20..]) as usize,
            O::read_u16(&data[0x2e..]) as usize,
            O::read_u16(&data[0x30..]) as usize,
            O::read_u16(&data[0x32..]) as usize,
        ),
        other => {
            return Err(SigningError::MalformedPackage(format!(
                "unknown ELF class {other}"
            )))
        }
    };

    if shnum == 0 || shentsize == 0 {
        return Err(SigningError::MalformedPackage(
            "image has no section header table".into(),
        ));
    }
    // Headers must at least reach the sh_size field for their class.
    let min_entsize = if class == CLASS_64 { 0x28 } else { 0x18 };
    if shentsize < min_entsize {
        return Err(SigningError::MalformedPackage(format!(
            "section header entries of {shentsize} bytes are too small"
        )));
    }
    let table_end = shoff
        .checked_add(shnum.checked_mul(shentsize).ok_or_else(malformed_table)?)
        .ok_or_else(malformed_table)?;
    if table_end > data.len() {
        return Err(malformed_table());
    }
    if shstrndx >= shnum {
        return Err(SigningError::MalformedPackage(
            "section name table index out of range".into(),
        ));
    }

    let header = |index: usize| &data[shoff + index * shentsize..shoff + (index + 1) * shentsize];
    let extent = |hdr: &[u8]| -> (usize, usize, usize) {
        match class {
            CLASS_64 => (
                O::read_u32(&hdr[0x00..]) as usize,
                O::read_u64(&hdr[0x18..]) as usize,
                O::read_u64(&hdr[0x20..]) as usize,
            ),
            _ => (
                O::read_u32(&hdr[0x00..]) as usize,
                O::read_u32(&hdr[0x10..]) as usize,
                O::read_u32(&hdr[0x14..]) as usize,
            ),
        }
    };

    let (_, names_off, names_size) = extent(header(shstrndx));
    let names_end = names_off.checked_add(names_size).ok_or_else(malformed_table)?;
    if names_end > data.len() {
        return Err(SigningError::MalformedPackage(
            "section name table out of bounds".into(),
        ));
    }
    let names = &data[names_off..names_end];

    let mut sections = Vec::with_capacity(shnum);
    for index in 0..shnum {
        let (name_off, offset, size) = extent(header(index));
        let end = offset.checked_add(size).ok_or_else(malformed_table)?;
        if end > data.len() {
            return Err(SigningError::MalformedPackage(format!(
                "section {index} extends past the image"
            )));
        }
        let name = section_name(names, name_off)?;
        sections.push((name, offset..end));
    }
    Ok(sections)
}

fn section_name(names: &[u8], offset: usize) -> Result<String, SigningError> {
    let tail = names.get(offset..).ok_or_else(|| {
        SigningError::MalformedPackage("section name offset out of bounds".into())
    })?;
    let len = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
    String::from_utf8(tail[..len].to_vec())
        .map_err(|_| SigningError::MalformedPackage("section name is not valid text".into()))
}

fn malformed_table() -> SigningError {
    SigningError::MalformedPackage("section header table out of bounds".into())
}


#[cfg(test)]
mod tests {
    use super::testutil::write_elf;
    use super::*;
    use crate::section::{PUBKEY_SECTION, SIGNATURE_SECTION};

    #[test]
    fn open_resolves_reserved_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg");
        write_elf(
            &path,
            &[
                (".text", b"payload".to_vec()),
                (PUBKEY_SECTION, vec![0; 128]),
                (SIGNATURE_SECTION, vec![0; 64]),
            ],
        );

        let package = ElfPackage::open(&path).unwrap();
        assert_eq!(
            package.section(PUBKEY_SECTION).unwrap().unwrap(),
            vec![0; 128]
        );
        assert_eq!(package.section(".text").unwrap().unwrap(), b"payload");
        assert!(package.section(".absent").unwrap().is_none());
    }

    #[test]
    fn embed_rewrites_the_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg");
        write_elf(
            &path,
            &[
                (".text", b"payload".to_vec()),
                (SIGNATURE_SECTION, vec![0xff; 32]),
            ],
        );

        let mut package = ElfPackage::open(&path).unwrap();
        package.embed(SIGNATURE_SECTION, "sig").unwrap();

        let reopened = ElfPackage::open(&path).unwrap();
        let mut expected = vec![0u8; 32];
        expected[..3].copy_from_slice(b"sig");
        assert_eq!(
            reopened.section(SIGNATURE_SECTION).unwrap().unwrap(),
            expected
        );
        // Surrounding content is untouched.
        assert_eq!(reopened.section(".text").unwrap().unwrap(), b"payload");
    }

    #[test]
    fn embed_rejects_payloads_larger_than_the_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg");
        write_elf(&path, &[(SIGNATURE_SECTION, vec![0; 4])]);

        let mut package = ElfPackage::open(&path).unwrap();
        let err = package.embed(SIGNATURE_SECTION, "too large").unwrap_err();
        assert!(matches!(err, SigningError::Embed { .. }));
    }

    #[test]
    fn non_elf_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg");
        std::fs::write(&path, b"#!/bin/sh\necho hi\n").unwrap();

        let err = ElfPackage::open(&path).unwrap_err();
        assert!(matches!(err, SigningError::MalformedPackage(_)));
    }

    #[test]
    fn undersized_section_header_entries_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg");
        write_elf(&path, &[(".text", b"payload".to_vec())]);

        // Shrink e_shentsize below the ELF64 header layout.
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0x3a..0x3c].copy_from_slice(&8u16.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let err = ElfPackage::open(&path).unwrap_err();
        assert!(matches!(err, SigningError::MalformedPackage(_)));
    }

    #[test]
    fn truncated_section_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg");
        write_elf(&path, &[(".text", b"payload".to_vec())]);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 8);
        std::fs::write(&path, &bytes).unwrap();

        let err = ElfPackage::open(&path).unwrap_err();
        assert!(matches!(err, SigningError::MalformedPackage(_)));
    }
}
