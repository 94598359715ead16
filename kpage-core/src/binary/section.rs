//! Section directory

/// Section kinds
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Module name
    ModuleInfo = 0x01,
    StringPool = 0x02,
    /// Referenced component types
    TypeRefs = 0x03,
    ClassTable = 0x04,
    /// Concatenated bytecode of every class
    Code = 0x05,
}

impl SectionKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(SectionKind::ModuleInfo),
            0x02 => Some(SectionKind::StringPool),
            0x03 => Some(SectionKind::TypeRefs),
            0x04 => Some(SectionKind::ClassTable),
            0x05 => Some(SectionKind::Code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SectionError {
    #[error("section directory too short")]
    TooShort,
    #[error("invalid section kind {0:#04x}")]
    InvalidKind(u8),
}

/// Directory entry (12 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionEntry {
    /// Kind (1 byte), then 3 padding bytes
    pub kind: SectionKind,
    /// File offset (4 bytes)
    pub offset: u32,
    /// Payload size (4 bytes)
    pub size: u32,
}

impl SectionEntry {
    pub const ENTRY_SIZE: usize = 12;

    pub fn new(kind: SectionKind, offset: u32, size: u32) -> Self {
        Self { kind, offset, size }
    }

    pub fn to_bytes(&self) -> [u8; Self::ENTRY_SIZE] {
        let mut bytes = [0u8; Self::ENTRY_SIZE];
        bytes[0] = self.kind as u8;
        bytes[4..8].copy_from_slice(&self.offset.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.size.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SectionError> {
        if bytes.len() < Self::ENTRY_SIZE {
            return Err(SectionError::TooShort);
        }
        let kind = SectionKind::from_u8(bytes[0]).ok_or(SectionError::InvalidKind(bytes[0]))?;
        Ok(Self {
            kind,
            offset: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            size: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }

    /// Byte range covered by the payload
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.size as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionDirectory {
    pub entries: Vec<SectionEntry>,
}

impl SectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: SectionEntry) {
        self.entries.push(entry);
    }

    pub fn find(&self, kind: SectionKind) -> Option<&SectionEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|e| e.to_bytes()).collect()
    }

    /// Parse `count` consecutive entries.
    pub fn from_bytes(bytes: &[u8], count: usize) -> Result<Self, SectionError> {
        if bytes.len() < count * SectionEntry::ENTRY_SIZE {
            return Err(SectionError::TooShort);
        }
        let entries = bytes
            .chunks_exact(SectionEntry::ENTRY_SIZE)
            .take(count)
            .map(SectionEntry::from_bytes)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }
}
