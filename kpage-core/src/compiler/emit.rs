//! Bytecode emission
//!
//! Lowers a [`BoundModule`] into a [`ModuleImage`] plus [`DebugSymbols`].
//! Strings and type references are pooled; each class gets one contiguous
//! code block ending in `Return`.

use super::binder::{BoundModule, BoundOp, BoundStmt, TypeRef};
use super::SourceText;
use crate::binary::{
    ClassEntry, ClassSymbols, DebugSymbols, DocumentKind, HeaderFlags, ModuleImage, SequencePoint,
    TypeRefEntry,
};
use crate::bytecode::Instruction;
use kpage_config::BuildMode;
use std::collections::HashMap;

/// Emission settings
#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub module_name: String,
    pub build_mode: BuildMode,
    pub emit_symbols: bool,
    pub embed_markup: bool,
}

struct Emitter {
    image: ModuleImage,
    symbols: DebugSymbols,
    string_index: HashMap<String, u32>,
    type_index: HashMap<TypeRef, u32>,
    class_index: HashMap<String, u32>,
}

impl Emitter {
    fn intern(&mut self, value: &str) -> u32 {
        if let Some(&index) = self.string_index.get(value) {
            return index;
        }
        let index = self.image.strings.len() as u32;
        self.image.strings.push(value.to_string());
        self.string_index.insert(value.to_string(), index);
        index
    }

    fn type_ref(&mut self, ty: &TypeRef) -> u32 {
        if let Some(&index) = self.type_index.get(ty) {
            return index;
        }
        let entry = TypeRefEntry {
            module: self.intern(&ty.module),
            name: self.intern(&ty.name),
        };
        let index = self.image.type_refs.len() as u32;
        self.image.type_refs.push(entry);
        self.type_index.insert(ty.clone(), index);
        index
    }

    fn lower(&mut self, stmt: &BoundStmt) -> Instruction {
        match &stmt.op {
            BoundOp::Write(text) => Instruction::Write {
                text: self.intern(text),
            },
            BoundOp::New { ty, slot } => Instruction::New {
                type_ref: self.type_ref(ty),
                slot: *slot,
            },
            BoundOp::Set {
                slot,
                property,
                value,
            } => Instruction::Set {
                slot: *slot,
                property: self.intern(property),
                value: self.intern(value),
            },
            BoundOp::Render { slot } => Instruction::Render { slot: *slot },
            BoundOp::Include { class } => Instruction::Include {
                // Binding guarantees the class exists
                class: self.class_index.get(class).copied().unwrap_or(u32::MAX),
            },
        }
    }
}

/// Adjacent writes collapse into one; the merged write keeps the first
/// statement's location.
fn merge_writes(body: &[BoundStmt]) -> Vec<BoundStmt> {
    let mut merged: Vec<BoundStmt> = Vec::with_capacity(body.len());
    for stmt in body {
        if let (Some(BoundStmt { op: BoundOp::Write(previous), .. }), BoundOp::Write(text)) =
            (merged.last_mut(), &stmt.op)
        {
            previous.push_str(text);
            continue;
        }
        merged.push(stmt.clone());
    }
    merged
}

/// Emit the image and symbols of `module`.
///
/// `generated` and `markup` are indexed like the units the module was bound
/// from; they become the symbol documents.
pub fn emit(
    module: &BoundModule,
    generated: &[SourceText],
    markup: &[SourceText],
    options: &EmitOptions,
) -> (ModuleImage, DebugSymbols) {
    let mut emitter = Emitter {
        image: ModuleImage::new(&options.module_name, options.build_mode),
        symbols: DebugSymbols::new(&options.module_name),
        string_index: HashMap::new(),
        type_index: HashMap::new(),
        class_index: HashMap::new(),
    };
    if options.build_mode == BuildMode::Release {
        emitter.image.flags.insert(HeaderFlags::MERGED_WRITES);
    }
    if options.emit_symbols {
        emitter.image.flags.insert(HeaderFlags::HAS_SYMBOLS);
    }

    // Generated documents come first, keeping unit indices and document
    // indices aligned.
    for source in generated {
        let index = emitter.symbols.document_index(&source.path, DocumentKind::Generated);
        if options.emit_symbols {
            emitter.symbols.documents[index as usize].text = Some(source.text.clone());
        }
    }
    for source in markup {
        let index = emitter.symbols.document_index(&source.path, DocumentKind::Markup);
        if options.embed_markup {
            emitter.symbols.documents[index as usize].text = Some(source.text.clone());
        }
    }

    for (index, class) in module.classes.iter().enumerate() {
        emitter.class_index.insert(class.name.clone(), index as u32);
    }

    for class in &module.classes {
        let body = match options.build_mode {
            BuildMode::Release => merge_writes(&class.body),
            BuildMode::Debug => class.body.clone(),
        };

        let code_offset = emitter.image.code.len() as u32;
        let mut points = Vec::with_capacity(body.len());
        for (instruction, stmt) in body.iter().enumerate() {
            let lowered = emitter.lower(stmt);
            lowered.encode(&mut emitter.image.code);
            let document = emitter
                .symbols
                .document_index(&stmt.location.path, DocumentKind::Markup);
            points.push(SequencePoint {
                instruction: instruction as u32,
                document,
                line: stmt.location.line,
                column: stmt.location.column,
            });
        }
        Instruction::Return.encode(&mut emitter.image.code);

        let entry = ClassEntry {
            name: emitter.intern(&class.name),
            base: emitter.type_ref(&class.base),
            slot_count: class.slot_count,
            code_offset,
            code_len: emitter.image.code.len() as u32 - code_offset,
        };
        emitter.image.classes.push(entry);
        emitter.symbols.classes.push(ClassSymbols {
            class: class.name.clone(),
            points,
        });
    }

    (emitter.image, emitter.symbols)
}
