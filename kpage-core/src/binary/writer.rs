//! Image writer

use super::header::{BuildId, FileHeader, HEADER_SIZE};
use super::section::{SectionDirectory, SectionEntry, SectionKind};
use kpage_config::BuildMode;

pub struct BinaryWriter {
    header: FileHeader,
    sections: SectionDirectory,
    buffer: Vec<u8>,
}

impl BinaryWriter {
    pub fn new(build_mode: BuildMode) -> Self {
        let mut buffer = Vec::with_capacity(1024);
        // Header is written last
        buffer.resize(HEADER_SIZE, 0);
        Self {
            header: FileHeader::new(build_mode),
            sections: SectionDirectory::new(),
            buffer,
        }
    }

    pub fn set_flag(&mut self, flag: u8) {
        self.header.flags.insert(flag);
    }

    fn align_to(&mut self, alignment: usize) {
        let rem = self.buffer.len() % alignment;
        if rem != 0 {
            self.buffer.resize(self.buffer.len() + alignment - rem, 0);
        }
    }

    /// Append a section; returns its file offset.
    pub fn write_section(&mut self, kind: SectionKind, data: &[u8]) -> u32 {
        self.align_to(8);
        let offset = self.buffer.len() as u32;
        self.sections
            .add(SectionEntry::new(kind, offset, data.len() as u32));
        self.buffer.extend_from_slice(data);
        offset
    }

    /// Append the directory, stamp the build id and write the header.
    pub fn finish(mut self) -> (Vec<u8>, BuildId) {
        self.align_to(8);
        let section_dir_offset = self.buffer.len();
        let build_id = BuildId::compute(&self.buffer[HEADER_SIZE..section_dir_offset]);

        let directory = self.sections.to_bytes();
        self.buffer.extend_from_slice(&directory);

        self.header.section_count = self.sections.count() as u16;
        self.header.section_dir_offset = section_dir_offset as u32;
        self.header.build_id = build_id;
        self.buffer[..HEADER_SIZE].copy_from_slice(&self.header.to_bytes());

        (self.buffer, build_id)
    }
}
