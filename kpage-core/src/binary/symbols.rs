//! Debug-symbol stream
//!
//! ```text
//! "KPGS" | version u16 | build id [16] | module name
//! documents: count u32, { kind u8, has_text u8, path, [text] }*
//! classes:   count u32, { name, points: count u32, { instr, doc, line, col }* }*
//! ```

use super::codec::{ByteSink, ByteSource, CodecError};
use super::header::BuildId;
use crate::diagnostic::SourceLocation;

/// Symbol stream magic: "KPGS"
pub const SYMBOLS_MAGIC: [u8; 4] = *b"KPGS";
pub const SYMBOLS_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolsError {
    #[error("invalid symbol stream magic")]
    InvalidMagic,
    #[error("unsupported symbol stream version {0}")]
    UnsupportedVersion(u16),
    #[error("invalid document kind {0}")]
    InvalidDocumentKind(u8),
    #[error("malformed symbol stream: {0}")]
    Codec(#[from] CodecError),
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Generated page script
    Generated = 1,
    /// Original markup
    Markup = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: String,
    pub kind: DocumentKind,
    /// Embedded source text, if it was requested at compile time
    pub text: Option<String>,
}

/// Instruction `instruction` of a class starts at this position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePoint {
    pub instruction: u32,
    pub document: u32,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSymbols {
    pub class: String,
    pub points: Vec<SequencePoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSymbols {
    pub build_id: BuildId,
    pub module_name: String,
    pub documents: Vec<Document>,
    pub classes: Vec<ClassSymbols>,
}

impl DebugSymbols {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            build_id: BuildId::default(),
            module_name: module_name.into(),
            documents: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Index of the document at `path`, adding it when missing.
    pub fn document_index(&mut self, path: &str, kind: DocumentKind) -> u32 {
        if let Some(index) = self.documents.iter().position(|d| d.path == path) {
            return index as u32;
        }
        self.documents.push(Document {
            path: path.to_string(),
            kind,
            text: None,
        });
        (self.documents.len() - 1) as u32
    }

    pub fn document(&self, path: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.path == path)
    }

    /// Source position of instruction `instruction` of `class`.
    pub fn locate(&self, class: &str, instruction: usize) -> Option<SourceLocation> {
        let symbols = self.classes.iter().find(|c| c.class == class)?;
        let point = symbols
            .points
            .iter()
            .rev()
            .find(|p| p.instruction as usize <= instruction)?;
        let document = self.documents.get(point.document as usize)?;
        Some(SourceLocation {
            path: document.path.clone(),
            line: point.line,
            column: point.column,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut sink = ByteSink::new();
        sink.put_bytes(&SYMBOLS_MAGIC);
        sink.put_u16(SYMBOLS_VERSION);
        sink.put_bytes(&self.build_id.0);
        sink.put_str(&self.module_name);

        sink.put_u32(self.documents.len() as u32);
        for document in &self.documents {
            sink.put_u8(document.kind as u8);
            sink.put_u8(u8::from(document.text.is_some()));
            sink.put_str(&document.path);
            if let Some(text) = &document.text {
                sink.put_str(text);
            }
        }

        sink.put_u32(self.classes.len() as u32);
        for class in &self.classes {
            sink.put_str(&class.class);
            sink.put_u32(class.points.len() as u32);
            for point in &class.points {
                sink.put_u32(point.instruction);
                sink.put_u32(point.document);
                sink.put_u32(point.line);
                sink.put_u32(point.column);
            }
        }
        sink.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SymbolsError> {
        let mut source = ByteSource::new(bytes);
        if source.get_bytes(4)? != SYMBOLS_MAGIC {
            return Err(SymbolsError::InvalidMagic);
        }
        let version = source.get_u16()?;
        if version != SYMBOLS_VERSION {
            return Err(SymbolsError::UnsupportedVersion(version));
        }
        let mut build_id = [0u8; 16];
        build_id.copy_from_slice(source.get_bytes(16)?);
        let module_name = source.get_str()?;

        let document_count = source.get_u32()?;
        let mut documents = Vec::new();
        for _ in 0..document_count {
            let kind = match source.get_u8()? {
                1 => DocumentKind::Generated,
                2 => DocumentKind::Markup,
                other => return Err(SymbolsError::InvalidDocumentKind(other)),
            };
            let has_text = source.get_u8()? != 0;
            let path = source.get_str()?;
            let text = if has_text { Some(source.get_str()?) } else { None };
            documents.push(Document { path, kind, text });
        }

        let class_count = source.get_u32()?;
        let mut classes = Vec::new();
        for _ in 0..class_count {
            let class = source.get_str()?;
            let point_count = source.get_u32()?;
            let mut points = Vec::new();
            for _ in 0..point_count {
                points.push(SequencePoint {
                    instruction: source.get_u32()?,
                    document: source.get_u32()?,
                    line: source.get_u32()?,
                    column: source.get_u32()?,
                });
            }
            classes.push(ClassSymbols { class, points });
        }

        Ok(Self {
            build_id: BuildId(build_id),
            module_name,
            documents,
            classes,
        })
    }
}
