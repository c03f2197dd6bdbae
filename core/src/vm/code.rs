use alloc::rc::Rc;
use core::fmt;

use hashbrown::{HashMap, HashSet};

use crate::instruction::{DispatchMode, Instr, JUMP_OFFSET_POSITION, Opcode, read_header};
use crate::runtime::Value;
use crate::vm::dispatch;
use crate::{Box, Vec};

/// Encoded instruction stream of one function.
pub struct Bytecode {
    bytes: Box<[u8]>,
    dispatch: DispatchMode,
}

impl Bytecode {
    /// Wraps an encoded stream.
    ///
    /// # Panics
    ///
    /// Panics unless the stream is a sequence of whole instructions with
    /// valid headers for `dispatch` and every jump targets the start of one
    /// of them. The VM relies on this to dispatch without rechecking headers.
    pub fn new(bytes: Box<[u8]>, dispatch: DispatchMode) -> Self {
        let bytecode = Self { bytes, dispatch };
        let mut starts = HashSet::new();
        let mut jumps = Vec::new();
        let mut ip = 0;
        while ip < bytecode.len() {
            let opcode = bytecode.opcode_at(ip);
            assert!(
                ip + opcode.size() <= bytecode.len(),
                "truncated {} at {}",
                opcode.name(),
                ip
            );
            if let Some(offset) = bytecode.decode_at(ip).jump_offset() {
                jumps.push((ip, Self::jump_target(ip, offset)));
            }
            starts.insert(ip);
            ip += opcode.size();
        }
        for (at, target) in jumps {
            assert!(
                starts.contains(&target),
                "jump at {} targets {}, which is not an instruction",
                at,
                target
            );
        }
        bytecode
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn dispatch(&self) -> DispatchMode {
        self.dispatch
    }

    /// Opcode of the instruction starting at `ip`.
    ///
    /// # Panics
    ///
    /// Panics if `ip` does not start an instruction of this stream.
    pub fn opcode_at(&self, ip: usize) -> Opcode {
        let header = read_header(&self.bytes[ip..]);
        let opcode = match self.dispatch {
            DispatchMode::Switch => Opcode::from_tag(header),
            DispatchMode::Threaded => dispatch::opcode_for_handler(header),
        };
        opcode.unwrap_or_else(|| panic!("corrupted bytecode: bad header {:#x} at {}", header, ip))
    }

    pub fn decode_at(&self, ip: usize) -> Instr {
        Instr::decode(self.opcode_at(ip), &self.bytes[ip..])
    }

    /// Decodes the whole stream as `(offset, instruction)` pairs.
    pub fn instructions(&self) -> impl Iterator<Item = (usize, Instr)> + '_ {
        let mut ip = 0;
        core::iter::from_fn(move || {
            if ip >= self.bytes.len() {
                return None;
            }
            let opcode = self.opcode_at(ip);
            let at = ip;
            ip += opcode.size();
            Some((at, Instr::decode(opcode, &self.bytes[at..])))
        })
    }

    /// Absolute target of a jump instruction at `at`.
    pub fn jump_target(at: usize, offset: i32) -> usize {
        (at + JUMP_OFFSET_POSITION).wrapping_add_signed(offset as isize)
    }
}

/// A function ready to run: bytecode plus the tables its operands index.
pub struct CompiledFunction {
    pub name: Option<Rc<str>>,
    pub formals: Box<[Rc<str>]>,
    pub locals: Box<[Rc<str>]>,
    pub identifiers: Box<[Rc<str>]>,
    pub constants: Box<[Value]>,
    /// Functions instantiated by `LoadClosure`.
    pub closures: Box<[Rc<CompiledFunction>]>,
    pub code: Bytecode,
    /// Slots in the stack area: temps, outgoing call arguments and one
    /// scratch slot.
    pub frame_size: u32,
    /// Temp index space after compression, locals included.
    pub temp_count: u32,
    /// Code offset of each IR basic block, in layout order.
    pub block_offsets: Box<[u32]>,
    pub strict: bool,
}

impl CompiledFunction {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// Output of compiling an IR module.
pub struct CompiledModule {
    pub root: Rc<CompiledFunction>,
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Function {} {{", self.display_name())?;
        writeln!(f, "  formals: {:?}", self.formals)?;
        writeln!(f, "  locals: {:?}", self.locals)?;
        writeln!(f, "  temp_count: {}", self.temp_count)?;
        writeln!(f, "  frame_size: {}", self.frame_size)?;
        writeln!(f, "  dispatch: {:?}", self.code.dispatch())?;

        if self.constants.is_empty() {
            writeln!(f, "  constants: []")?;
        } else {
            writeln!(f, "  constants: [")?;
            for (i, constant) in self.constants.iter().enumerate() {
                writeln!(f, "    #{} = {:?}", i, constant)?;
            }
            writeln!(f, "  ]")?;
        }

        if !self.identifiers.is_empty() {
            writeln!(f, "  identifiers: {:?}", self.identifiers)?;
        }

        writeln!(f, "  instructions:")?;
        write!(f, "{:?}", self.code)?;
        write!(f, "}}")
    }
}

impl fmt::Debug for Bytecode {
    /// One line per instruction: offset, label if something jumps there,
    /// and the decoded operands.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Label every jump target, numbered by address.
        let targets: HashSet<usize> = self
            .instructions()
            .filter_map(|(at, instr)| instr.jump_offset().map(|o| Self::jump_target(at, o)))
            .collect();
        let mut sorted: Vec<usize> = targets.into_iter().collect();
        sorted.sort_unstable();
        let labels: HashMap<usize, usize> =
            sorted.into_iter().enumerate().map(|(i, addr)| (addr, i)).collect();

        for (at, instr) in self.instructions() {
            let label = labels
                .get(&at)
                .map(|l| crate::format!("L{}:", l))
                .unwrap_or_default();
            match instr.jump_offset() {
                Some(offset) => {
                    let target = Self::jump_target(at, offset);
                    let target = labels
                        .get(&target)
                        .map(|l| crate::format!("L{}", l))
                        .unwrap_or_else(|| crate::format!("@{}", target));
                    writeln!(f, "    {:5} {:>4}  {:?} (to {})", at, label, instr, target)?;
                }
                None => writeln!(f, "    {:5} {:>4}  {:?}", at, label, instr)?,
            }
        }
        Ok(())
    }
}
