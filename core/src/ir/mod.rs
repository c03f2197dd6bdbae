//! Intermediate representation handed to the instruction selector.
//!
//! A [`Module`] is a list of [`Function`]s, each a list of basic blocks of
//! three-address statements. Operands of calls and ALU operations are
//! already reduced to temps or constants by the front end; the selector
//! only has to pick instructions and allocate frame slots.

mod bitset;
mod builder;
mod liveness;
mod tree;

#[cfg(test)]
mod liveness_test;

pub use bitset::BitSet;
pub use builder::{FunctionBuilder, ModuleBuilder, TempId};
pub use liveness::{Liveness, StmtLiveness};
pub use tree::{
    AluOp, BasicBlock, BlockId, Builtin, Const, Expr, Function, FunctionId, Module, Name, Stmt,
    Temp,
};
