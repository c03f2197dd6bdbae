//! Threaded dispatch: one handler function per opcode, addressed directly
//! from the instruction header.

use once_cell::race::OnceBox;

use crate::Box;
use crate::instruction::{Opcode, for_each_instruction};
use crate::runtime::Throw;
use crate::vm::interpreter::{Interpreter, Step};

pub(crate) type Handler = for<'a> fn(&mut Interpreter<'a>, usize) -> Result<Step, Throw>;

macro_rules! define_handlers {
    ($( $(#[$meta:meta])* $name:ident { $($field:ident : $ty:ty),* $(,)? } ),* $(,)?) => {
        #[allow(non_snake_case)]
        mod handlers {
            use super::*;

            $(
                pub(super) fn $name(vm: &mut Interpreter<'_>, at: usize) -> Result<Step, Throw> {
                    vm.execute_at(Opcode::$name, at)
                }
            )*
        }

        fn build_table() -> Box<[Handler; Opcode::COUNT]> {
            Box::new([$(handlers::$name as Handler),*])
        }
    };
}

for_each_instruction!(define_handlers);

static TABLE: OnceBox<[Handler; Opcode::COUNT]> = OnceBox::new();

fn table() -> &'static [Handler; Opcode::COUNT] {
    TABLE.get_or_init(build_table)
}

/// Header value for `opcode` in threaded bytecode.
pub(crate) fn handler_address(opcode: Opcode) -> u64 {
    table()[opcode as usize] as usize as u64
}

/// Reverse lookup of [`handler_address`]; `None` for anything that is not
/// a handler.
pub(crate) fn opcode_for_handler(header: u64) -> Option<Opcode> {
    table()
        .iter()
        .position(|h| *h as usize as u64 == header)
        .map(|i| Opcode::ALL[i])
}

/// # Safety
///
/// `header` must have been produced by [`handler_address`] in this process.
pub(crate) unsafe fn handler_from_header(header: u64) -> Handler {
    debug_assert!(
        opcode_for_handler(header).is_some(),
        "header {:#x} is not a handler address",
        header
    );
    // SAFETY: per the contract, `header` is the address of one of the
    // `Handler` functions in `TABLE`.
    unsafe { core::mem::transmute::<usize, Handler>(header as usize) }
}
