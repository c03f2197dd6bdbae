use core::fmt;

use crate::runtime::{BinaryOp, UnaryOp};

/// Instruction operand addressing either a constant-table entry or a temp
/// slot (see [`crate::ir::Temp`] for the index encoding).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Value(u32),
    Temp(i32),
}

impl Param {
    const VALUE_TAG: u32 = 0;
    const TEMP_TAG: u32 = 1;

    pub fn is_temp(self) -> bool {
        matches!(self, Param::Temp(_))
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Param::Value(index) => write!(f, "#{}", index),
            Param::Temp(index) if index < 0 => write!(f, "a{}", -index - 1),
            Param::Temp(index) => write!(f, "t{}", index),
        }
    }
}

/// Fixed-width little-endian encoding of an instruction field.
pub trait Operand: Copy {
    const SIZE: usize;

    fn write(self, out: &mut [u8]);

    fn read(bytes: &[u8]) -> Self;
}

fn read_word(bytes: &[u8]) -> [u8; 4] {
    let mut word = [0; 4];
    word.copy_from_slice(&bytes[..4]);
    word
}

impl Operand for u32 {
    const SIZE: usize = 4;

    fn write(self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn read(bytes: &[u8]) -> Self {
        u32::from_le_bytes(read_word(bytes))
    }
}

impl Operand for i32 {
    const SIZE: usize = 4;

    fn write(self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn read(bytes: &[u8]) -> Self {
        i32::from_le_bytes(read_word(bytes))
    }
}

impl Operand for bool {
    const SIZE: usize = 4;

    fn write(self, out: &mut [u8]) {
        u32::from(self).write(out);
    }

    fn read(bytes: &[u8]) -> Self {
        u32::read(bytes) != 0
    }
}

impl Operand for Param {
    const SIZE: usize = 8;

    fn write(self, out: &mut [u8]) {
        match self {
            Param::Value(index) => {
                Self::VALUE_TAG.write(out);
                index.write(&mut out[4..]);
            }
            Param::Temp(index) => {
                Self::TEMP_TAG.write(out);
                index.write(&mut out[4..]);
            }
        }
    }

    fn read(bytes: &[u8]) -> Self {
        match u32::read(bytes) {
            Self::VALUE_TAG => Param::Value(u32::read(&bytes[4..])),
            Self::TEMP_TAG => Param::Temp(i32::read(&bytes[4..])),
            tag => panic!("corrupted bytecode: invalid operand tag {}", tag),
        }
    }
}

impl Operand for BinaryOp {
    const SIZE: usize = 4;

    fn write(self, out: &mut [u8]) {
        u32::from(self.tag()).write(out);
    }

    fn read(bytes: &[u8]) -> Self {
        let tag = u32::read(bytes);
        u8::try_from(tag)
            .ok()
            .and_then(BinaryOp::from_tag)
            .unwrap_or_else(|| panic!("corrupted bytecode: invalid binary operator {}", tag))
    }
}

impl Operand for UnaryOp {
    const SIZE: usize = 4;

    fn write(self, out: &mut [u8]) {
        u32::from(self.tag()).write(out);
    }

    fn read(bytes: &[u8]) -> Self {
        let tag = u32::read(bytes);
        u8::try_from(tag)
            .ok()
            .and_then(UnaryOp::from_tag)
            .unwrap_or_else(|| panic!("corrupted bytecode: invalid unary operator {}", tag))
    }
}
