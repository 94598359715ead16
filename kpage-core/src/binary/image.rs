//! In-memory form of a compiled module image

use super::codec::{ByteSink, ByteSource, CodecError};
use super::header::{BuildId, HeaderFlags};
use super::reader::{BinaryReader, ReadError};
use super::section::SectionKind;
use super::writer::BinaryWriter;
use kpage_config::BuildMode;

/// `module.name` reference, both pooled strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeRefEntry {
    pub module: u32,
    pub name: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassEntry {
    /// Pooled class name
    pub name: u32,
    /// Index into the type-reference table
    pub base: u32,
    pub slot_count: u32,
    /// Byte range inside the code section
    pub code_offset: u32,
    pub code_len: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImage {
    pub name: String,
    pub build_mode: BuildMode,
    pub flags: HeaderFlags,
    pub strings: Vec<String>,
    pub type_refs: Vec<TypeRefEntry>,
    pub classes: Vec<ClassEntry>,
    pub code: Vec<u8>,
}

impl ModuleImage {
    pub fn new(name: impl Into<String>, build_mode: BuildMode) -> Self {
        Self {
            name: name.into(),
            build_mode,
            flags: HeaderFlags::default(),
            strings: Vec::new(),
            type_refs: Vec::new(),
            classes: Vec::new(),
            code: Vec::new(),
        }
    }

    pub fn string(&self, index: u32) -> Result<&str, ReadError> {
        self.strings
            .get(index as usize)
            .map(String::as_str)
            .ok_or(ReadError::InvalidIndex {
                table: "string pool",
                index,
            })
    }

    pub fn type_ref(&self, index: u32) -> Result<(&str, &str), ReadError> {
        let entry = self.type_refs.get(index as usize).ok_or(ReadError::InvalidIndex {
            table: "type reference",
            index,
        })?;
        Ok((self.string(entry.module)?, self.string(entry.name)?))
    }

    pub fn class_name(&self, index: usize) -> Result<&str, ReadError> {
        let entry = self.classes.get(index).ok_or(ReadError::InvalidIndex {
            table: "class",
            index: index as u32,
        })?;
        self.string(entry.name)
    }

    pub fn find_class(&self, name: &str) -> Option<usize> {
        self.classes
            .iter()
            .position(|c| self.string(c.name).map(|n| n == name).unwrap_or(false))
    }

    pub fn class_code(&self, index: usize) -> Result<&[u8], ReadError> {
        let entry = self.classes.get(index).ok_or(ReadError::InvalidIndex {
            table: "class",
            index: index as u32,
        })?;
        let start = entry.code_offset as usize;
        let end = start + entry.code_len as usize;
        self.code
            .get(start..end)
            .ok_or(ReadError::InvalidSectionSize(SectionKind::Code))
    }

    /// Serialize into the sectioned image format.
    pub fn encode(&self) -> (Vec<u8>, BuildId) {
        let mut writer = BinaryWriter::new(self.build_mode);
        writer.set_flag(self.flags.0);

        let mut info = ByteSink::new();
        info.put_str(&self.name);
        writer.write_section(SectionKind::ModuleInfo, &info.into_bytes());

        let mut pool = ByteSink::new();
        pool.put_u32(self.strings.len() as u32);
        for s in &self.strings {
            pool.put_str(s);
        }
        writer.write_section(SectionKind::StringPool, &pool.into_bytes());

        let mut refs = ByteSink::new();
        refs.put_u32(self.type_refs.len() as u32);
        for r in &self.type_refs {
            refs.put_u32(r.module);
            refs.put_u32(r.name);
        }
        writer.write_section(SectionKind::TypeRefs, &refs.into_bytes());

        let mut table = ByteSink::new();
        table.put_u32(self.classes.len() as u32);
        for c in &self.classes {
            table.put_u32(c.name);
            table.put_u32(c.base);
            table.put_u32(c.slot_count);
            table.put_u32(c.code_offset);
            table.put_u32(c.code_len);
        }
        writer.write_section(SectionKind::ClassTable, &table.into_bytes());

        writer.write_section(SectionKind::Code, &self.code);
        writer.finish()
    }

    /// Parse and validate an image produced by [`ModuleImage::encode`].
    pub fn decode(bytes: Vec<u8>) -> Result<(Self, BuildId), ReadError> {
        let reader = BinaryReader::from_bytes(bytes)?;
        let header = reader.header().clone();

        let name = ByteSource::new(reader.read_section(SectionKind::ModuleInfo)?).get_str()?;

        let mut pool = ByteSource::new(reader.read_section(SectionKind::StringPool)?);
        let strings = read_list(&mut pool, |s| s.get_str())?;

        let mut refs = ByteSource::new(reader.read_section(SectionKind::TypeRefs)?);
        let type_refs = read_list(&mut refs, |s| {
            Ok(TypeRefEntry {
                module: s.get_u32()?,
                name: s.get_u32()?,
            })
        })?;

        let mut table = ByteSource::new(reader.read_section(SectionKind::ClassTable)?);
        let classes = read_list(&mut table, |s| {
            Ok(ClassEntry {
                name: s.get_u32()?,
                base: s.get_u32()?,
                slot_count: s.get_u32()?,
                code_offset: s.get_u32()?,
                code_len: s.get_u32()?,
            })
        })?;

        let code = reader.read_section(SectionKind::Code)?.to_vec();

        let image = Self {
            name,
            build_mode: header.build_mode,
            flags: header.flags,
            strings,
            type_refs,
            classes,
            code,
        };
        image.validate()?;
        Ok((image, header.build_id))
    }

    /// Every table index must be in range.
    fn validate(&self) -> Result<(), ReadError> {
        for index in 0..self.type_refs.len() {
            self.type_ref(index as u32)?;
        }
        for (index, class) in self.classes.iter().enumerate() {
            self.class_name(index)?;
            self.type_ref(class.base)?;
            self.class_code(index)?;
        }
        Ok(())
    }
}

fn read_list<T>(
    source: &mut ByteSource<'_>,
    mut item: impl FnMut(&mut ByteSource<'_>) -> Result<T, CodecError>,
) -> Result<Vec<T>, CodecError> {
    let count = source.get_u32()? as usize;
    let mut items = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        items.push(item(source)?);
    }
    Ok(items)
}
