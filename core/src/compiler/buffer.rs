use crate::instruction::{Instr, Operand};
use crate::{Box, Vec, vec};

/// Growable byte buffer instructions are encoded into.
///
/// Starts at [`CodeBuffer::INITIAL_CAPACITY`] bytes and doubles whenever an
/// instruction would not fit. [`CodeBuffer::finish`] trims the unused tail.
pub struct CodeBuffer {
    bytes: Vec<u8>,
    len: usize,
}

impl CodeBuffer {
    pub const INITIAL_CAPACITY: usize = 4096;

    pub fn new() -> Self {
        Self {
            bytes: vec![0; Self::INITIAL_CAPACITY],
            len: 0,
        }
    }

    /// Bytes written so far; also the offset of the next instruction.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Encodes `instr` with the given header and returns its offset.
    pub fn append(&mut self, instr: &Instr, header: u64) -> usize {
        let size = instr.opcode().size();
        while self.bytes.len() - self.len < size {
            let doubled = self.bytes.len() * 2;
            self.bytes.resize(doubled, 0);
        }
        let at = self.len;
        instr.encode(header, &mut self.bytes[at..at + size]);
        self.len += size;
        at
    }

    pub fn patch_i32(&mut self, at: usize, value: i32) {
        assert!(at + 4 <= self.len, "patch at {} past end of code", at);
        value.write(&mut self.bytes[at..]);
    }

    pub fn finish(mut self) -> Box<[u8]> {
        self.bytes.truncate(self.len);
        self.bytes.into_boxed_slice()
    }
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Opcode, Param, read_header};

    #[test]
    fn doubles_when_full_and_trims_on_finish() {
        let mut buffer = CodeBuffer::new();
        let instr = Instr::MoveTemp {
            source: Param::Temp(0),
            result: Param::Temp(1),
        };
        let size = Opcode::MoveTemp.size();
        let count = CodeBuffer::INITIAL_CAPACITY / size + 1;
        for i in 0..count {
            assert_eq!(buffer.append(&instr, 3), i * size);
        }
        assert_eq!(buffer.capacity(), 2 * CodeBuffer::INITIAL_CAPACITY);

        let bytes = buffer.finish();
        assert_eq!(bytes.len(), count * size);
        assert_eq!(read_header(&bytes[size..]), 3);
    }

    #[test]
    fn patch_rewrites_in_place() {
        let mut buffer = CodeBuffer::new();
        let at = buffer.append(&Instr::Jump { offset: 0 }, 0);
        buffer.patch_i32(at + 8, -8);
        let bytes = buffer.finish();
        assert_eq!(i32::read(&bytes[8..]), -8);
    }
}
