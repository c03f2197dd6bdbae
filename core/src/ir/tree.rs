//! Three-address IR consumed by the instruction selector.
//!
//! All nodes live in a `bumpalo` arena owned by whoever built the module.
//! Temp nodes carry their index in a [`Cell`] so that temp compression can
//! renumber them in place without needing mutable access to the tree.

use core::cell::Cell;
use core::fmt;

use crate::Vec;

/// Operators appearing in `Unop`, `Binop` and in-place `Move` statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    /// Only valid as a conditional-jump condition; never lowered to an instruction.
    IfTrue,
    Not,
    UMinus,
    UPlus,
    Compl,
    Increment,
    Decrement,

    BitAnd,
    BitOr,
    BitXor,

    Add,
    Sub,
    Mul,
    Div,
    Mod,

    LShift,
    RShift,
    URShift,

    Gt,
    Lt,
    Ge,
    Le,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,

    InstanceOf,
    In,

    /// Short-circuit operators are expected to be lowered to control flow
    /// before selection.
    And,
    Or,
}

/// Literal constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Const {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
}

/// A temp slot reference.
///
/// Index encoding: `-1 - i` is formal argument `i`, `0..locals` are the
/// function's declared locals and everything above addresses the frame's
/// stack area.
pub struct Temp {
    index: Cell<i32>,
}

impl Temp {
    pub fn new(index: i32) -> Self {
        Self {
            index: Cell::new(index),
        }
    }

    pub fn index(&self) -> i32 {
        self.index.get()
    }

    pub(crate) fn set_index(&self, index: i32) {
        self.index.set(index);
    }
}

impl fmt::Debug for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = self.index();
        if index < 0 {
            write!(f, "a{}", -index - 1)
        } else {
            write!(f, "t{}", index)
        }
    }
}

/// Runtime operations the IR expresses as calls to a builtin name.
///
/// The selector picks the concrete instruction from the shape of the first
/// argument, e.g. `typeof` of a member expression becomes
/// `CallBuiltinTypeofMember`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Typeof,
    Delete,
    PostIncrement,
    PostDecrement,
    Throw,
    CreateExceptionHandler,
    DeleteExceptionHandler,
    GetException,
    ForeachIteratorObject,
    ForeachNextPropertyName,
    PushWithScope,
    PushCatchScope,
    PopScope,
    /// Arguments: `Const::Boolean(deletable)`, `String(name)`.
    DeclareVar,
    /// Arguments: object temp, `String(name)`, value.
    DefineProperty,
    /// Arguments: object temp, `Const::Number(index)`, value.
    DefineArrayProperty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Name<'a> {
    Id(&'a str),
    Builtin(Builtin),
    This,
}

/// Index of a function inside its [`Module`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub usize);

/// Index of a basic block inside its function, in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

#[derive(Debug)]
pub enum Expr<'a> {
    Const(Const),
    String(&'a str),
    Name(Name<'a>),
    Temp(&'a Temp),
    Closure(FunctionId),
    Unop {
        op: AluOp,
        expr: &'a Expr<'a>,
    },
    Binop {
        op: AluOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Call {
        base: &'a Expr<'a>,
        args: &'a [&'a Expr<'a>],
    },
    New {
        base: &'a Expr<'a>,
        args: &'a [&'a Expr<'a>],
    },
    Subscript {
        base: &'a Expr<'a>,
        index: &'a Expr<'a>,
    },
    Member {
        base: &'a Expr<'a>,
        name: &'a str,
    },
}

impl<'a> Expr<'a> {
    pub fn as_temp(&self) -> Option<&'a Temp> {
        match self {
            Expr::Temp(t) => Some(t),
            _ => None,
        }
    }

    /// Calls `f` on every temp node reachable from this expression, in
    /// evaluation order.
    pub fn for_each_temp(&self, f: &mut impl FnMut(&'a Temp)) {
        match self {
            Expr::Const(_) | Expr::String(_) | Expr::Name(_) | Expr::Closure(_) => {}
            Expr::Temp(t) => f(t),
            Expr::Unop { expr, .. } => expr.for_each_temp(f),
            Expr::Binop { left, right, .. } => {
                left.for_each_temp(f);
                right.for_each_temp(f);
            }
            Expr::Call { base, args } | Expr::New { base, args } => {
                base.for_each_temp(f);
                for arg in args.iter() {
                    arg.for_each_temp(f);
                }
            }
            Expr::Subscript { base, index } => {
                base.for_each_temp(f);
                index.for_each_temp(f);
            }
            Expr::Member { base, .. } => base.for_each_temp(f),
        }
    }
}

#[derive(Debug)]
pub enum Stmt<'a> {
    /// Expression evaluated for its side effects; only calls are meaningful.
    Exp(&'a Expr<'a>),
    /// `target = source`, or `target op= source` when `op` is set.
    Move {
        target: &'a Expr<'a>,
        source: &'a Expr<'a>,
        op: Option<AluOp>,
    },
    Jump {
        target: BlockId,
    },
    CJump {
        cond: &'a Expr<'a>,
        iftrue: BlockId,
        iffalse: BlockId,
    },
    Ret(&'a Expr<'a>),
}

impl Stmt<'_> {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Stmt::Jump { .. } | Stmt::CJump { .. } | Stmt::Ret(_)
        )
    }

    /// Control-flow successors of a terminator; empty for anything else.
    pub fn successors(&self) -> impl Iterator<Item = BlockId> {
        let (a, b) = match self {
            Stmt::Jump { target } => (Some(*target), None),
            Stmt::CJump {
                iftrue, iffalse, ..
            } => (Some(*iftrue), Some(*iffalse)),
            _ => (None, None),
        };
        a.into_iter().chain(b)
    }
}

#[derive(Debug)]
pub struct BasicBlock<'a> {
    pub statements: &'a [Stmt<'a>],
}

impl<'a> BasicBlock<'a> {
    pub fn terminator(&self) -> Option<&'a Stmt<'a>> {
        self.statements.last().filter(|s| s.is_terminator())
    }
}

#[derive(Debug)]
pub struct Function<'a> {
    pub name: Option<&'a str>,
    pub formals: &'a [&'a str],
    pub locals: &'a [&'a str],
    pub blocks: &'a [BasicBlock<'a>],
    pub strict: bool,
    /// Size of the non-negative temp index space, locals included.
    temp_count: Cell<u32>,
}

impl<'a> Function<'a> {
    pub fn new(
        name: Option<&'a str>,
        formals: &'a [&'a str],
        locals: &'a [&'a str],
        blocks: &'a [BasicBlock<'a>],
        temp_count: u32,
        strict: bool,
    ) -> Self {
        assert!(
            temp_count as usize >= locals.len(),
            "temp count {} smaller than local count {}",
            temp_count,
            locals.len()
        );
        Self {
            name,
            formals,
            locals,
            blocks,
            strict,
            temp_count: Cell::new(temp_count),
        }
    }

    pub fn temp_count(&self) -> u32 {
        self.temp_count.get()
    }

    pub(crate) fn set_temp_count(&self, count: u32) {
        self.temp_count.set(count);
    }

    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Functions referenced by `Closure` expressions in this body.
    pub fn nested_functions(&self) -> Vec<FunctionId> {
        fn visit(expr: &Expr<'_>, out: &mut Vec<FunctionId>) {
            match expr {
                Expr::Closure(id) => {
                    if !out.contains(id) {
                        out.push(*id);
                    }
                }
                Expr::Unop { expr, .. } => visit(expr, out),
                Expr::Binop { left, right, .. } => {
                    visit(left, out);
                    visit(right, out);
                }
                Expr::Call { base, args } | Expr::New { base, args } => {
                    visit(base, out);
                    args.iter().for_each(|a| visit(a, out));
                }
                Expr::Subscript { base, index } => {
                    visit(base, out);
                    visit(index, out);
                }
                Expr::Member { base, .. } => visit(base, out),
                Expr::Const(_) | Expr::String(_) | Expr::Name(_) | Expr::Temp(_) => {}
            }
        }

        let mut out = Vec::new();
        for stmt in self.blocks.iter().flat_map(|b| b.statements.iter()) {
            match stmt {
                Stmt::Exp(e) | Stmt::Ret(e) | Stmt::CJump { cond: e, .. } => visit(e, &mut out),
                Stmt::Move { target, source, .. } => {
                    visit(target, &mut out);
                    visit(source, &mut out);
                }
                Stmt::Jump { .. } => {}
            }
        }
        out
    }
}

/// A compilation unit: a root function plus every function it (transitively)
/// creates closures for.
#[derive(Debug)]
pub struct Module<'a> {
    pub functions: Vec<&'a Function<'a>>,
    pub root: FunctionId,
}

impl<'a> Module<'a> {
    pub fn new(functions: Vec<&'a Function<'a>>, root: FunctionId) -> Self {
        assert!(root.0 < functions.len(), "root function {:?} out of range", root);
        Self { functions, root }
    }

    pub fn function(&self, id: FunctionId) -> &'a Function<'a> {
        self.functions[id.0]
    }
}
