//! Convenience constructors for IR functions.
//!
//! Front ends (and tests) use [`FunctionBuilder`] to lay out blocks and
//! statements without hand-allocating every node. Each expression helper
//! returns a freshly allocated node; temp compression rewrites nodes in
//! place, so a node must not be shared between two statements.

use bumpalo::Bump;

use crate::Vec;
use crate::ir::tree::{
    AluOp, BasicBlock, BlockId, Builtin, Const, Expr, Function, FunctionId, Module, Name, Stmt,
    Temp,
};

/// Handle for a virtual temp allocated by [`FunctionBuilder::new_temp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempId(i32);

pub struct FunctionBuilder<'a> {
    arena: &'a Bump,
    name: Option<&'a str>,
    formals: &'a [&'a str],
    locals: &'a [&'a str],
    next_temp: i32,
    blocks: Vec<Vec<Stmt<'a>>>,
    strict: bool,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(arena: &'a Bump, name: Option<&str>, formals: &[&str], locals: &[&str]) -> Self {
        let intern = |names: &[&str]| -> &'a [&'a str] {
            arena.alloc_slice_fill_iter(names.iter().map(|n| &*arena.alloc_str(n)))
        };
        Self {
            arena,
            name: name.map(|n| &*arena.alloc_str(n)),
            formals: intern(formals),
            locals: intern(locals),
            next_temp: locals.len() as i32,
            blocks: Vec::new(),
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn new_block(&mut self) -> BlockId {
        self.blocks.push(Vec::new());
        BlockId(self.blocks.len() - 1)
    }

    pub fn new_temp(&mut self) -> TempId {
        let id = TempId(self.next_temp);
        self.next_temp += 1;
        id
    }

    // Expressions.

    pub fn temp(&self, id: TempId) -> &'a Expr<'a> {
        self.temp_at(id.0)
    }

    pub fn local(&self, index: usize) -> &'a Expr<'a> {
        assert!(index < self.locals.len(), "local {} out of range", index);
        self.temp_at(index as i32)
    }

    pub fn arg(&self, index: usize) -> &'a Expr<'a> {
        assert!(index < self.formals.len(), "argument {} out of range", index);
        self.temp_at(-1 - index as i32)
    }

    fn temp_at(&self, index: i32) -> &'a Expr<'a> {
        let temp = self.arena.alloc(Temp::new(index));
        self.arena.alloc(Expr::Temp(temp))
    }

    pub fn undefined(&self) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Const(Const::Undefined))
    }

    pub fn null(&self) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Const(Const::Null))
    }

    pub fn boolean(&self, value: bool) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Const(Const::Boolean(value)))
    }

    pub fn number(&self, value: f64) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Const(Const::Number(value)))
    }

    pub fn string(&self, value: &str) -> &'a Expr<'a> {
        let value = self.arena.alloc_str(value);
        self.arena.alloc(Expr::String(value))
    }

    pub fn name(&self, id: &str) -> &'a Expr<'a> {
        let id = self.arena.alloc_str(id);
        self.arena.alloc(Expr::Name(Name::Id(id)))
    }

    pub fn this(&self) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Name(Name::This))
    }

    pub fn closure(&self, function: FunctionId) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Closure(function))
    }

    pub fn unop(&self, op: AluOp, expr: &'a Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Unop { op, expr })
    }

    pub fn binop(&self, op: AluOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Binop { op, left, right })
    }

    pub fn call(&self, base: &'a Expr<'a>, args: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        let args = self.arena.alloc_slice_copy(args);
        self.arena.alloc(Expr::Call { base, args })
    }

    pub fn construct(&self, base: &'a Expr<'a>, args: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        let args = self.arena.alloc_slice_copy(args);
        self.arena.alloc(Expr::New { base, args })
    }

    pub fn builtin(&self, builtin: Builtin, args: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        let base = self.arena.alloc(Expr::Name(Name::Builtin(builtin)));
        self.call(base, args)
    }

    pub fn member(&self, base: &'a Expr<'a>, name: &str) -> &'a Expr<'a> {
        let name = self.arena.alloc_str(name);
        self.arena.alloc(Expr::Member { base, name })
    }

    pub fn subscript(&self, base: &'a Expr<'a>, index: &'a Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Subscript { base, index })
    }

    // Statements.

    fn push(&mut self, block: BlockId, stmt: Stmt<'a>) {
        let statements = &mut self.blocks[block.0];
        assert!(
            statements.last().is_none_or(|s| !s.is_terminator()),
            "block L{} already terminated",
            block.0
        );
        statements.push(stmt);
    }

    pub fn exp(&mut self, block: BlockId, expr: &'a Expr<'a>) {
        self.push(block, Stmt::Exp(expr));
    }

    pub fn mov(&mut self, block: BlockId, target: &'a Expr<'a>, source: &'a Expr<'a>) {
        self.push(
            block,
            Stmt::Move {
                target,
                source,
                op: None,
            },
        );
    }

    pub fn inplace(
        &mut self,
        block: BlockId,
        op: AluOp,
        target: &'a Expr<'a>,
        source: &'a Expr<'a>,
    ) {
        self.push(
            block,
            Stmt::Move {
                target,
                source,
                op: Some(op),
            },
        );
    }

    pub fn jump(&mut self, block: BlockId, target: BlockId) {
        self.push(block, Stmt::Jump { target });
    }

    pub fn cjump(&mut self, block: BlockId, cond: &'a Expr<'a>, iftrue: BlockId, iffalse: BlockId) {
        self.push(
            block,
            Stmt::CJump {
                cond,
                iftrue,
                iffalse,
            },
        );
    }

    pub fn ret(&mut self, block: BlockId, expr: &'a Expr<'a>) {
        self.push(block, Stmt::Ret(expr));
    }

    pub fn build(self) -> &'a Function<'a> {
        let arena = self.arena;
        let blocks = arena.alloc_slice_fill_iter(self.blocks.into_iter().map(|statements| {
            BasicBlock {
                statements: arena.alloc_slice_fill_iter(statements),
            }
        }));
        arena.alloc(Function::new(
            self.name,
            self.formals,
            self.locals,
            blocks,
            self.next_temp as u32,
            self.strict,
        ))
    }
}

/// Collects functions into a [`Module`]. Nested functions must be added
/// before the closures referencing them are built so their id is known.
#[derive(Default)]
pub struct ModuleBuilder<'a> {
    functions: Vec<&'a Function<'a>>,
}

impl<'a> ModuleBuilder<'a> {
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    pub fn add(&mut self, function: &'a Function<'a>) -> FunctionId {
        self.functions.push(function);
        FunctionId(self.functions.len() - 1)
    }

    pub fn finish(self, root: FunctionId) -> Module<'a> {
        Module::new(self.functions, root)
    }
}
