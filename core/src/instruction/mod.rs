//! The bytecode instruction set.
//!
//! Every instruction is a fixed-size record: an 8-byte header followed by
//! its operands, padded to a multiple of [`INSTRUCTION_ALIGNMENT`]. The
//! header holds either the opcode tag ([`DispatchMode::Switch`]) or the
//! address of the opcode's handler ([`DispatchMode::Threaded`]).
//!
//! The list of instructions lives in a single table,
//! [`for_each_instruction!`], from which the opcode enum, the typed
//! [`Instr`] representation, its encoder and decoder, and the threaded
//! handler table are all generated, so they cannot drift apart.
//!
//! Jump instructions carry their offset as the first operand; the offset is
//! relative to the address of that operand.

mod operand;


pub use operand::{Operand, Param};

use static_assertions::const_assert;

use crate::runtime::{BinaryOp, UnaryOp};

pub const HEADER_SIZE: usize = 8;
pub const INSTRUCTION_ALIGNMENT: usize = 8;

/// Byte offset of a jump's offset field from the start of the instruction.
pub const JUMP_OFFSET_POSITION: usize = HEADER_SIZE;

const_assert!(HEADER_SIZE % INSTRUCTION_ALIGNMENT == 0);
const_assert!(core::mem::size_of::<usize>() <= HEADER_SIZE);
const_assert!(<Param as Operand>::SIZE == 8);

const fn padded(size: usize) -> usize {
    (size + INSTRUCTION_ALIGNMENT - 1) & !(INSTRUCTION_ALIGNMENT - 1)
}

/// How the VM finds the code for the next instruction. Fixed per compiled
/// function at selection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Header is the opcode tag; the loop matches on it.
    #[default]
    Switch,
    /// Header is the handler's address; the loop calls it directly.
    Threaded,
}

/// Invokes `$m!` with the full instruction table.
///
/// Operand names are part of the table: `args` is the stack index of the
/// first outgoing argument, `argc` the argument count, `name`/`member`/
/// `var_name` index the function's identifier table and `function` indexes
/// its closure table.
macro_rules! for_each_instruction {
    ($m:ident) => {
        $m! {
            MoveTemp { source: Param, result: Param },
            LoadValue { value: Param, result: Param },
            LoadClosure { function: u32, result: Param },
            LoadName { name: u32, result: Param },
            StoreName { name: u32, source: Param },
            LoadElement { base: Param, index: Param, result: Param },
            StoreElement { base: Param, index: Param, source: Param },
            LoadProperty { base: Param, name: u32, result: Param },
            StoreProperty { base: Param, name: u32, source: Param },
            /// Sizes the frame's stack area. Always the first instruction.
            Push { value: u32 },
            CallValue { dest: Param, argc: u32, args: u32, result: Param },
            CallProperty { base: Param, name: u32, argc: u32, args: u32, result: Param },
            CallElement { base: Param, index: Param, argc: u32, args: u32, result: Param },
            CallActivationProperty { name: u32, argc: u32, args: u32, result: Param },
            CallBuiltinThrow { arg: Param },
            /// Writes `false` to `result` now and `true` when resumed after a throw.
            CallBuiltinCreateExceptionHandler { result: Param },
            CallBuiltinDeleteExceptionHandler {},
            CallBuiltinGetException { result: Param },
            CallBuiltinForeachIteratorObject { arg: Param, result: Param },
            /// Writes the next key, or `null` once the iterator is exhausted.
            CallBuiltinForeachNextPropertyName { arg: Param, result: Param },
            CallBuiltinPushScope { arg: Param },
            /// Binds the pending exception to `var_name` in a new catch scope.
            CallBuiltinPushCatchScope { var_name: u32 },
            CallBuiltinPopScope {},
            CallBuiltinDeleteMember { base: Param, member: u32, result: Param },
            CallBuiltinDeleteSubscript { base: Param, index: Param, result: Param },
            CallBuiltinDeleteName { name: u32, result: Param },
            CallBuiltinTypeofMember { base: Param, member: u32, result: Param },
            CallBuiltinTypeofSubscript { base: Param, index: Param, result: Param },
            CallBuiltinTypeofName { name: u32, result: Param },
            CallBuiltinTypeofValue { value: Param, result: Param },
            CallBuiltinPostIncMember { base: Param, member: u32, result: Param },
            CallBuiltinPostIncSubscript { base: Param, index: Param, result: Param },
            CallBuiltinPostIncName { name: u32, result: Param },
            CallBuiltinPostIncValue { value: Param, result: Param },
            CallBuiltinPostDecMember { base: Param, member: u32, result: Param },
            CallBuiltinPostDecSubscript { base: Param, index: Param, result: Param },
            CallBuiltinPostDecName { name: u32, result: Param },
            CallBuiltinPostDecValue { value: Param, result: Param },
            CallBuiltinDeclareVar { is_deletable: bool, var_name: u32 },
            CallBuiltinDefineProperty { object: Param, name: u32, value: Param },
            CallBuiltinDefineArrayProperty { object: Param, index: u32, value: Param },
            CreateValue { func: Param, argc: u32, args: u32, result: Param },
            CreateProperty { base: Param, name: u32, argc: u32, args: u32, result: Param },
            CreateActivationProperty { name: u32, argc: u32, args: u32, result: Param },
            Jump { offset: i32 },
            CJump { offset: i32, condition: Param },
            Unop { alu: UnaryOp, source: Param, result: Param },
            Binop { alu: BinaryOp, lhs: Param, rhs: Param, result: Param },
            LoadThis { result: Param },
            InplaceElementOp { alu: BinaryOp, base: Param, index: Param, source: Param },
            InplaceMemberOp { alu: BinaryOp, base: Param, member: u32, source: Param },
            InplaceNameOp { alu: BinaryOp, name: u32, source: Param },
            Ret { result: Param },
        }
    };
}
pub(crate) use for_each_instruction;

macro_rules! define_instruction_set {
    ($( $(#[$meta:meta])* $name:ident { $($field:ident : $ty:ty),* $(,)? } ),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($name),*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name),*];
            pub const COUNT: usize = Self::ALL.len();

            /// Encoded size in bytes, header and padding included.
            pub const fn size(self) -> usize {
                match self {
                    $(Opcode::$name => padded(HEADER_SIZE $(+ <$ty as Operand>::SIZE)*)),*
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name)),*
                }
            }

            pub fn from_tag(tag: u64) -> Option<Self> {
                usize::try_from(tag).ok().and_then(|t| Self::ALL.get(t).copied())
            }
        }

        /// A decoded instruction.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum Instr {
            $( $(#[$meta])* $name { $($field: $ty),* } ),*
        }

        impl Instr {
            pub fn opcode(&self) -> Opcode {
                match self {
                    $(Instr::$name { .. } => Opcode::$name),*
                }
            }

            /// Writes header and operands into `out`, which must hold at
            /// least `self.opcode().size()` bytes. Padding is left as is.
            #[allow(unused_mut, unused_assignments)]
            pub fn encode(&self, header: u64, out: &mut [u8]) {
                assert!(out.len() >= self.opcode().size(), "instruction buffer too small");
                out[..HEADER_SIZE].copy_from_slice(&header.to_le_bytes());
                match *self {
                    $(Instr::$name { $($field),* } => {
                        let mut at = HEADER_SIZE;
                        $(
                            Operand::write($field, &mut out[at..]);
                            at += <$ty as Operand>::SIZE;
                        )*
                    }),*
                }
            }

            /// Reads the operands of an `opcode` instruction starting at
            /// `bytes[0]`.
            #[inline(always)]
            #[allow(unused_mut, unused_assignments, unused_variables)]
            pub fn decode(opcode: Opcode, bytes: &[u8]) -> Instr {
                match opcode {
                    $(Opcode::$name => {
                        let mut at = HEADER_SIZE;
                        $(
                            let $field = <$ty as Operand>::read(&bytes[at..]);
                            at += <$ty as Operand>::SIZE;
                        )*
                        Instr::$name { $($field),* }
                    }),*
                }
            }
        }
    };
}

for_each_instruction!(define_instruction_set);

impl Instr {
    /// Jump offset operand, for `Jump` and `CJump`.
    pub fn jump_offset(&self) -> Option<i32> {
        match *self {
            Instr::Jump { offset } | Instr::CJump { offset, .. } => Some(offset),
            _ => None,
        }
    }
}

pub fn read_header(bytes: &[u8]) -> u64 {
    let mut header = [0; HEADER_SIZE];
    header.copy_from_slice(&bytes[..HEADER_SIZE]);
    u64::from_le_bytes(header)
}
