//! Image file header
//!
//! 32-byte fixed header: magic, format version, build mode, flags, section
//! directory location and the build id.

use kpage_config::BuildMode;
use sha2::{Digest, Sha256};
use std::fmt;

/// File magic: "KPGM"
pub const MAGIC: [u8; 4] = *b"KPGM";

/// Current format version
pub const FORMAT_VERSION: u16 = 1;

/// Header size: 32 bytes
pub const HEADER_SIZE: usize = 32;

/// Identity of one compiled image; shared by the image and its symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BuildId(pub [u8; 16]);

impl BuildId {
    /// Truncated SHA-256 of `payload`.
    pub fn compute(payload: &[u8]) -> Self {
        let digest = Sha256::digest(payload);
        let mut id = [0u8; 16];
        id.copy_from_slice(&digest[..16]);
        BuildId(id)
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Header flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderFlags(pub u8);

impl HeaderFlags {
    /// A symbol stream was produced alongside the image
    pub const HAS_SYMBOLS: u8 = 0x01;
    /// Adjacent text writes were merged (release build)
    pub const MERGED_WRITES: u8 = 0x02;

    pub fn contains(&self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    pub fn insert(&mut self, flag: u8) {
        self.0 |= flag;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("header too short")]
    TooShort,
    #[error("invalid magic number")]
    InvalidMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),
    #[error("invalid build mode {0}")]
    InvalidBuildMode(u8),
}

/// File header (32 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version (2 bytes)
    pub version: u16,
    /// Build mode (1 byte)
    pub build_mode: BuildMode,
    /// Flags (1 byte)
    pub flags: HeaderFlags,
    /// Section count (2 bytes), then 2 reserved bytes
    pub section_count: u16,
    /// Section directory offset (4 bytes)
    pub section_dir_offset: u32,
    /// Build id (16 bytes)
    pub build_id: BuildId,
}

impl FileHeader {
    pub fn new(build_mode: BuildMode) -> Self {
        Self {
            version: FORMAT_VERSION,
            build_mode,
            flags: HeaderFlags::default(),
            section_count: 0,
            section_dir_offset: 0,
            build_id: BuildId::default(),
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6] = self.build_mode.as_u8();
        bytes[7] = self.flags.0;
        bytes[8..10].copy_from_slice(&self.section_count.to_le_bytes());
        // 10..12 reserved
        bytes[12..16].copy_from_slice(&self.section_dir_offset.to_le_bytes());
        bytes[16..32].copy_from_slice(&self.build_id.0);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::TooShort);
        }
        if bytes[0..4] != MAGIC {
            return Err(HeaderError::InvalidMagic);
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(HeaderError::UnsupportedVersion(version));
        }
        let build_mode = BuildMode::from_u8(bytes[6]).ok_or(HeaderError::InvalidBuildMode(bytes[6]))?;
        let mut build_id = [0u8; 16];
        build_id.copy_from_slice(&bytes[16..32]);

        Ok(Self {
            version,
            build_mode,
            flags: HeaderFlags(bytes[7]),
            section_count: u16::from_le_bytes([bytes[8], bytes[9]]),
            section_dir_offset: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            build_id: BuildId(build_id),
        })
    }
}
