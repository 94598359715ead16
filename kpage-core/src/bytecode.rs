//! Page bytecode
//!
//! Every operand is a little-endian `u32` index into one of the image's
//! tables (string pool, type references, class table) or a local slot.

/// Opcode byte values
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Append a pooled string to the output
    Write = 0x01,
    /// Instantiate a component type into a local slot
    New = 0x02,
    /// Assign a pooled string to a property of a local
    Set = 0x03,
    /// Render a local into the output
    Render = 0x04,
    /// Run another class of the same module
    Include = 0x05,
    Return = 0x06,
}

impl OpCode {
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        let op = match byte {
            0x01 => OpCode::Write,
            0x02 => OpCode::New,
            0x03 => OpCode::Set,
            0x04 => OpCode::Render,
            0x05 => OpCode::Include,
            0x06 => OpCode::Return,
            _ => return None,
        };
        Some(op)
    }

    fn operand_count(self) -> usize {
        match self {
            OpCode::Write | OpCode::Render | OpCode::Include => 1,
            OpCode::New => 2,
            OpCode::Set => 3,
            OpCode::Return => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Write { text: u32 },
    New { type_ref: u32, slot: u32 },
    Set { slot: u32, property: u32, value: u32 },
    Render { slot: u32 },
    Include { class: u32 },
    Return,
}

impl Instruction {
    pub fn opcode(&self) -> OpCode {
        match self {
            Instruction::Write { .. } => OpCode::Write,
            Instruction::New { .. } => OpCode::New,
            Instruction::Set { .. } => OpCode::Set,
            Instruction::Render { .. } => OpCode::Render,
            Instruction::Include { .. } => OpCode::Include,
            Instruction::Return => OpCode::Return,
        }
    }

    /// Append the encoded instruction to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode() as u8);
        let (operands, count) = match *self {
            Instruction::Write { text } => ([text, 0, 0], 1),
            Instruction::New { type_ref, slot } => ([type_ref, slot, 0], 2),
            Instruction::Set {
                slot,
                property,
                value,
            } => ([slot, property, value], 3),
            Instruction::Render { slot } => ([slot, 0, 0], 1),
            Instruction::Include { class } => ([class, 0, 0], 1),
            Instruction::Return => ([0, 0, 0], 0),
        };
        for operand in &operands[..count] {
            out.extend_from_slice(&operand.to_le_bytes());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid opcode 0x{opcode:02x} at offset {offset}")]
    InvalidOpcode { opcode: u8, offset: usize },
    #[error("truncated instruction at offset {offset}")]
    Truncated { offset: usize },
}

/// Decode a whole code block.
pub fn decode_all(code: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut instructions = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        let opcode = OpCode::from_u8(code[offset]).ok_or(DecodeError::InvalidOpcode {
            opcode: code[offset],
            offset,
        })?;
        let count = opcode.operand_count();
        let end = offset + 1 + count * 4;
        if end > code.len() {
            return Err(DecodeError::Truncated { offset });
        }
        let mut operands = [0u32; 3];
        for (i, chunk) in code[offset + 1..end].chunks_exact(4).enumerate() {
            operands[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let instruction = match opcode {
            OpCode::Write => Instruction::Write { text: operands[0] },
            OpCode::New => Instruction::New {
                type_ref: operands[0],
                slot: operands[1],
            },
            OpCode::Set => Instruction::Set {
                slot: operands[0],
                property: operands[1],
                value: operands[2],
            },
            OpCode::Render => Instruction::Render { slot: operands[0] },
            OpCode::Include => Instruction::Include { class: operands[0] },
            OpCode::Return => Instruction::Return,
        };
        instructions.push(instruction);
        offset = end;
    }
    Ok(instructions)
}
