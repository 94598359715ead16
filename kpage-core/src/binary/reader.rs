//! Image reader

use super::codec::CodecError;
use super::header::{BuildId, FileHeader, HeaderError, HEADER_SIZE};
use super::section::{SectionDirectory, SectionEntry, SectionError, SectionKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("header error: {0}")]
    Header(#[from] HeaderError),
    #[error("section error: {0}")]
    Section(#[from] SectionError),
    #[error("malformed section data: {0}")]
    Codec(#[from] CodecError),
    #[error("section directory out of bounds")]
    InvalidOffset,
    #[error("section {0:?} out of bounds")]
    InvalidSectionSize(SectionKind),
    #[error("build id mismatch: image content is corrupted")]
    ChecksumMismatch,
    #[error("section not found: {0:?}")]
    SectionNotFound(SectionKind),
    #[error("{table} index {index} out of range")]
    InvalidIndex { table: &'static str, index: u32 },
}

pub struct BinaryReader {
    data: Vec<u8>,
    header: FileHeader,
    sections: SectionDirectory,
}

impl BinaryReader {
    /// Parse and validate an image: header, directory bounds, section
    /// bounds and build id.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ReadError> {
        let header = FileHeader::from_bytes(&data)?;

        let dir_start = header.section_dir_offset as usize;
        let dir_end = dir_start + header.section_count as usize * SectionEntry::ENTRY_SIZE;
        if dir_start < HEADER_SIZE || dir_end > data.len() {
            return Err(ReadError::InvalidOffset);
        }
        let sections = SectionDirectory::from_bytes(&data[dir_start..dir_end], header.section_count as usize)?;
        for entry in &sections.entries {
            let range = entry.range();
            if range.start < HEADER_SIZE || range.end > dir_start {
                return Err(ReadError::InvalidSectionSize(entry.kind));
            }
        }

        if BuildId::compute(&data[HEADER_SIZE..dir_start]) != header.build_id {
            return Err(ReadError::ChecksumMismatch);
        }

        Ok(Self {
            data,
            header,
            sections,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn sections(&self) -> &SectionDirectory {
        &self.sections
    }

    pub fn read_section(&self, kind: SectionKind) -> Result<&[u8], ReadError> {
        let entry = self
            .sections
            .find(kind)
            .ok_or(ReadError::SectionNotFound(kind))?;
        Ok(&self.data[entry.range()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::writer::BinaryWriter;
    use kpage_config::BuildMode;

    fn sample() -> Vec<u8> {
        let mut writer = BinaryWriter::new(BuildMode::Debug);
        writer.write_section(SectionKind::StringPool, b"abc");
        writer.write_section(SectionKind::Code, &[6]);
        writer.finish().0
    }

    #[test]
    fn test_read_written_sections() {
        let reader = BinaryReader::from_bytes(sample()).unwrap();
        assert_eq!(reader.header().section_count, 2);
        assert_eq!(reader.read_section(SectionKind::StringPool).unwrap(), b"abc");
        assert_eq!(reader.read_section(SectionKind::Code).unwrap(), &[6]);
        assert_eq!(
            reader.read_section(SectionKind::TypeRefs),
            Err(ReadError::SectionNotFound(SectionKind::TypeRefs))
        );
        // Sections start 8-aligned
        let code = reader.sections().find(SectionKind::Code).unwrap();
        assert_eq!(code.offset % 8, 0);
    }

    #[test]
    fn test_detects_tampering() {
        let mut bytes = sample();
        bytes[HEADER_SIZE] ^= 0xff;
        assert_eq!(
            BinaryReader::from_bytes(bytes).err(),
            Some(ReadError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_detects_truncation() {
        let mut bytes = sample();
        bytes.truncate(bytes.len() - 1);
        assert_eq!(
            BinaryReader::from_bytes(bytes).err(),
            Some(ReadError::InvalidOffset)
        );
    }
}
