//! Binary module image and debug-symbol formats
//!
//! Image layout:
//! ```text
//! +--------------------+ 0
//! | FileHeader (32 B)  |
//! +--------------------+
//! | sections (8-aligned)|
//! +--------------------+ section_dir_offset
//! | SectionDirectory   |
//! +--------------------+
//! ```
//! The build id in the header is the truncated SHA-256 of the section
//! payload region. The separate symbol stream repeats it so a loader can
//! refuse mismatched pairs.

pub mod codec;
pub mod header;
pub mod image;
pub mod reader;
pub mod section;
pub mod symbols;
pub mod writer;

pub use header::{BuildId, FileHeader, HeaderError, HeaderFlags, HEADER_SIZE, MAGIC};
pub use image::{ClassEntry, ModuleImage, TypeRefEntry};
pub use reader::{BinaryReader, ReadError};
pub use section::{SectionDirectory, SectionEntry, SectionError, SectionKind};
pub use symbols::{ClassSymbols, DebugSymbols, Document, DocumentKind, SequencePoint, SymbolsError};
pub use writer::BinaryWriter;
