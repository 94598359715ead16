//! Loaded modules
//!
//! A [`LoadedModule`] is an image decoded into executable form, optionally
//! paired with its debug symbols. Operand indices are validated once at load
//! time so the executor can trust them.

use crate::binary::{BuildId, DebugSymbols, ModuleImage, ReadError, SymbolsError};
use crate::bytecode::{decode_all, DecodeError, Instruction};
use crate::diagnostic::SourceLocation;
use kpage_config::BuildMode;
use std::io::Read;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read module stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid module image: {0}")]
    Image(#[from] ReadError),
    #[error("invalid symbol stream: {0}")]
    Symbols(#[from] SymbolsError),
    #[error("symbol stream belongs to build {symbols}, image is build {image}")]
    SymbolMismatch { image: BuildId, symbols: BuildId },
    #[error("invalid code in class '{class}': {source}")]
    Code { class: String, source: DecodeError },
    #[error("class '{class}': {reason}")]
    InvalidOperand { class: String, reason: String },
}

#[derive(Debug)]
pub struct LoadedModule {
    image: ModuleImage,
    build_id: BuildId,
    code: Vec<Vec<Instruction>>,
    symbols: Option<DebugSymbols>,
}

impl LoadedModule {
    /// Read an image stream and an optional symbol stream to the end.
    pub fn load(image: &mut dyn Read, symbols: Option<&mut dyn Read>) -> Result<Self, LoadError> {
        let mut image_bytes = Vec::new();
        image.read_to_end(&mut image_bytes)?;
        let symbol_bytes = match symbols {
            Some(stream) => {
                let mut bytes = Vec::new();
                stream.read_to_end(&mut bytes)?;
                Some(bytes)
            }
            None => None,
        };
        Self::from_bytes(image_bytes, symbol_bytes.as_deref())
    }

    pub fn from_bytes(image: Vec<u8>, symbols: Option<&[u8]>) -> Result<Self, LoadError> {
        let (image, build_id) = ModuleImage::decode(image)?;
        let symbols = match symbols {
            Some(bytes) => {
                let symbols = DebugSymbols::decode(bytes)?;
                if symbols.build_id != build_id {
                    return Err(LoadError::SymbolMismatch {
                        image: build_id,
                        symbols: symbols.build_id,
                    });
                }
                Some(symbols)
            }
            None => None,
        };

        let mut code = Vec::with_capacity(image.classes.len());
        for index in 0..image.classes.len() {
            let class = image.class_name(index)?.to_string();
            let instructions = decode_all(image.class_code(index)?).map_err(|source| LoadError::Code {
                class: class.clone(),
                source,
            })?;
            validate_operands(&image, index, &instructions).map_err(|reason| LoadError::InvalidOperand {
                class,
                reason,
            })?;
            code.push(instructions);
        }

        debug!(
            target: "kpage::loader",
            module = %image.name,
            %build_id,
            classes = code.len(),
            symbols = symbols.is_some(),
            "module decoded"
        );
        Ok(Self {
            image,
            build_id,
            code,
            symbols,
        })
    }

    pub fn name(&self) -> &str {
        &self.image.name
    }

    pub fn build_id(&self) -> BuildId {
        self.build_id
    }

    pub fn build_mode(&self) -> BuildMode {
        self.image.build_mode
    }

    pub fn image(&self) -> &ModuleImage {
        &self.image
    }

    pub fn symbols(&self) -> Option<&DebugSymbols> {
        self.symbols.as_ref()
    }

    pub fn class_count(&self) -> usize {
        self.code.len()
    }

    pub fn find_class(&self, name: &str) -> Option<usize> {
        self.image.find_class(name)
    }

    pub fn class_name(&self, class: usize) -> Result<&str, ReadError> {
        self.image.class_name(class)
    }

    pub fn instructions(&self, class: usize) -> &[Instruction] {
        self.code.get(class).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn slot_count(&self, class: usize) -> u32 {
        self.image.classes.get(class).map(|c| c.slot_count).unwrap_or(0)
    }

    /// `(module, type)` of a class's base type
    pub fn base_type(&self, class: usize) -> Result<(&str, &str), ReadError> {
        let base = self
            .image
            .classes
            .get(class)
            .map(|c| c.base)
            .ok_or(ReadError::InvalidIndex {
                table: "class",
                index: class as u32,
            })?;
        self.image.type_ref(base)
    }

    /// Source position of an instruction, when symbols are loaded.
    pub fn locate(&self, class: usize, instruction: usize) -> Option<SourceLocation> {
        let name = self.image.class_name(class).ok()?;
        self.symbols.as_ref()?.locate(name, instruction)
    }
}

fn validate_operands(image: &ModuleImage, class: usize, code: &[Instruction]) -> Result<(), String> {
    let slots = image.classes[class].slot_count;
    let check_slot = |slot: u32| {
        if slot < slots {
            Ok(())
        } else {
            Err(format!("slot {} out of range ({} slots)", slot, slots))
        }
    };
    let check_string = |index: u32| image.string(index).map(|_| ()).map_err(|e| e.to_string());

    for instruction in code {
        match *instruction {
            Instruction::Write { text } => check_string(text)?,
            Instruction::New { type_ref, slot } => {
                image.type_ref(type_ref).map_err(|e| e.to_string())?;
                check_slot(slot)?;
            }
            Instruction::Set {
                slot,
                property,
                value,
            } => {
                check_slot(slot)?;
                check_string(property)?;
                check_string(value)?;
            }
            Instruction::Render { slot } => check_slot(slot)?,
            Instruction::Include { class } => {
                if class as usize >= image.classes.len() {
                    return Err(format!("include of unknown class {}", class));
                }
            }
            Instruction::Return => {}
        }
    }
    Ok(())
}
