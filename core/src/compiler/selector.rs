//! Instruction selection: lowers IR functions to bytecode.
//!
//! Each function is selected in one pass over its blocks in layout order.
//! Forward jumps are emitted with a zero offset and recorded in a patch
//! table keyed by target block; once every block's start offset is known
//! the offsets are filled in.
//!
//! Frame layout of the stack area (indices relative to the stack area):
//!
//! ```text
//! [0 .. temps)                      IR temps after compression
//! [temps .. temps + max_call_args)  outgoing call arguments
//! [temps + max_call_args]           scratch slot for discarded results
//! ```

use alloc::rc::Rc;

use hashbrown::HashMap;

use crate::{Box, Vec};
use crate::api::CompilationOptions;
use crate::compiler::buffer::CodeBuffer;
use crate::compiler::compress_temps::compress_temps;
use crate::instruction::{DispatchMode, Instr, JUMP_OFFSET_POSITION, Param};
use crate::ir::{AluOp, BlockId, Builtin, Const, Expr, Function, FunctionId, Liveness, Module, Name, Stmt, Temp};
use crate::runtime::{BinaryOp, UnaryOp, Value};
use crate::vm::{self, Bytecode, CompiledFunction, CompiledModule};

/// Compiles every function reachable from the module root. Nested
/// functions are compiled before the functions that create closures of
/// them.
pub fn compile_module(module: &Module<'_>, options: &CompilationOptions) -> CompiledModule {
    let mut compiled: HashMap<FunctionId, Rc<CompiledFunction>> = HashMap::new();
    let root = compile_function(module, module.root, options, &mut compiled, &mut Vec::new());
    CompiledModule { root }
}

fn compile_function(
    module: &Module<'_>,
    id: FunctionId,
    options: &CompilationOptions,
    compiled: &mut HashMap<FunctionId, Rc<CompiledFunction>>,
    in_progress: &mut Vec<FunctionId>,
) -> Rc<CompiledFunction> {
    if let Some(done) = compiled.get(&id) {
        return done.clone();
    }
    assert!(
        !in_progress.contains(&id),
        "function {:?} creates a closure of itself; closures must be acyclic",
        id
    );
    in_progress.push(id);

    let function = module.function(id);
    let closures: HashMap<FunctionId, Rc<CompiledFunction>> = function
        .nested_functions()
        .into_iter()
        .map(|nested| (nested, compile_function(module, nested, options, compiled, in_progress)))
        .collect();

    let result = Rc::new(select_function(function, options, &closures));
    in_progress.pop();
    compiled.insert(id, result.clone());
    result
}

/// Selects instructions for a single function. `closures` must hold the
/// compiled form of every function `function` creates closures of.
pub fn select_function(
    function: &Function<'_>,
    options: &CompilationOptions,
    closures: &HashMap<FunctionId, Rc<CompiledFunction>>,
) -> CompiledFunction {
    assert!(!function.blocks.is_empty(), "function without basic blocks");

    let temps_before = function.temp_count();
    let temp_count = if options.compress_temps {
        let liveness = Liveness::compute(function);
        compress_temps(function, &liveness)
    } else {
        temps_before
    };

    let local_count = function.local_count() as u32;
    let stack_temps = temp_count - local_count;
    let max_call_args = max_call_args(function);
    let frame_size = stack_temps + max_call_args + 1;

    let mut selector = InstructionSelection {
        dispatch: options.dispatch,
        buffer: CodeBuffer::new(),
        patches: HashMap::new(),
        block_offsets: Vec::with_capacity(function.blocks.len()),
        current_block: 0,
        block_count: function.blocks.len(),
        local_count: local_count as i32,
        args_base: stack_temps,
        scratch: Param::Temp((local_count + stack_temps + max_call_args) as i32),
        identifiers: Vec::new(),
        identifier_index: HashMap::new(),
        constants: Vec::new(),
        constant_index: HashMap::new(),
        closures: Vec::new(),
        closure_index: HashMap::new(),
        nested: closures,
    };

    selector.add_instruction(Instr::Push { value: frame_size });
    for (index, block) in function.blocks.iter().enumerate() {
        assert!(
            block.terminator().is_some(),
            "block L{} of {} does not end in a jump or return",
            index,
            function.name.unwrap_or("<anonymous>")
        );
        selector.current_block = index;
        selector.block_offsets.push(selector.buffer.len());
        for stmt in block.statements {
            selector.visit_stmt(stmt);
        }
    }
    selector.patch_jump_addresses();

    let code = Bytecode::new(selector.buffer.finish(), options.dispatch);
    tracing::debug!(
        function = function.name.unwrap_or("<anonymous>"),
        code_size = code.len(),
        frame_size,
        temps_before,
        temps_after = temp_count,
        "selected"
    );

    let names = |names: &[&str]| -> Box<[Rc<str>]> {
        names.iter().map(|n| Rc::<str>::from(*n)).collect()
    };
    CompiledFunction {
        name: function.name.map(Rc::from),
        formals: names(function.formals),
        locals: names(function.locals),
        identifiers: selector.identifiers.into(),
        constants: selector.constants.into(),
        closures: selector.closures.into(),
        code,
        frame_size,
        temp_count,
        block_offsets: selector.block_offsets.iter().map(|o| *o as u32).collect(),
        strict: function.strict,
    }
}

/// Largest argument count of any call or `new` in the function.
fn max_call_args(function: &Function<'_>) -> u32 {
    fn visit(expr: &Expr<'_>, max: &mut usize) {
        match expr {
            Expr::Call { base, args } | Expr::New { base, args } => {
                *max = (*max).max(args.len());
                visit(base, max);
            }
            _ => {}
        }
    }

    let mut max = 0;
    for stmt in function.blocks.iter().flat_map(|b| b.statements.iter()) {
        match stmt {
            Stmt::Exp(e) => visit(e, &mut max),
            Stmt::Move { source, .. } => visit(source, &mut max),
            _ => {}
        }
    }
    max as u32
}

/// Stack index of a lone call argument that can be passed in place, i.e.
/// a temp in the stack area. Arguments and locals live elsewhere and must
/// be copied into the outgoing window.
pub fn single_arg_fast_path(args: &[&Expr<'_>], local_count: i32) -> Option<u32> {
    match args {
        [Expr::Temp(t)] if t.index() >= local_count => Some((t.index() - local_count) as u32),
        _ => None,
    }
}

#[derive(Hash, PartialEq, Eq)]
enum ConstKey<'a> {
    Undefined,
    Null,
    Boolean(bool),
    Number(u64),
    String(&'a str),
}

struct InstructionSelection<'a, 'c> {
    dispatch: DispatchMode,
    buffer: CodeBuffer,
    /// Offsets of jump offset fields waiting for their target block.
    patches: HashMap<usize, Vec<usize>>,
    block_offsets: Vec<usize>,
    current_block: usize,
    block_count: usize,
    local_count: i32,
    /// Stack index of the outgoing argument window.
    args_base: u32,
    scratch: Param,
    identifiers: Vec<Rc<str>>,
    identifier_index: HashMap<&'a str, u32>,
    constants: Vec<Value>,
    constant_index: HashMap<ConstKey<'a>, u32>,
    closures: Vec<Rc<CompiledFunction>>,
    closure_index: HashMap<FunctionId, u32>,
    nested: &'c HashMap<FunctionId, Rc<CompiledFunction>>,
}

impl<'a> InstructionSelection<'a, '_> {
    fn add_instruction(&mut self, instr: Instr) -> usize {
        let header = match self.dispatch {
            DispatchMode::Switch => instr.opcode() as u64,
            DispatchMode::Threaded => vm::handler_address(instr.opcode()),
        };
        self.buffer.append(&instr, header)
    }

    // Operand tables.

    fn identifier(&mut self, name: &'a str) -> u32 {
        if let Some(&index) = self.identifier_index.get(name) {
            return index;
        }
        let index = self.identifiers.len() as u32;
        self.identifiers.push(Rc::from(name));
        self.identifier_index.insert(name, index);
        index
    }

    fn constant(&mut self, key: ConstKey<'a>) -> Param {
        if let Some(&index) = self.constant_index.get(&key) {
            return Param::Value(index);
        }
        let value = match key {
            ConstKey::Undefined => Value::Undefined,
            ConstKey::Null => Value::Null,
            ConstKey::Boolean(b) => Value::Boolean(b),
            ConstKey::Number(bits) => Value::Number(f64::from_bits(bits)),
            ConstKey::String(s) => Value::string(s),
        };
        let index = self.constants.len() as u32;
        self.constants.push(value);
        self.constant_index.insert(key, index);
        Param::Value(index)
    }

    fn closure(&mut self, id: FunctionId) -> u32 {
        if let Some(&index) = self.closure_index.get(&id) {
            return index;
        }
        let Some(compiled) = self.nested.get(&id) else {
            panic!("closure of {:?} was not compiled first", id);
        };
        let index = self.closures.len() as u32;
        self.closures.push(compiled.clone());
        self.closure_index.insert(id, index);
        index
    }

    fn temp(&self, temp: &Temp) -> Param {
        Param::Temp(temp.index())
    }

    /// Operand for a constant or temp expression.
    fn param(&mut self, expr: &'a Expr<'a>) -> Param {
        match expr {
            Expr::Temp(t) => self.temp(t),
            Expr::String(s) => self.constant(ConstKey::String(s)),
            Expr::Const(c) => self.constant(match *c {
                Const::Undefined => ConstKey::Undefined,
                Const::Null => ConstKey::Null,
                Const::Boolean(b) => ConstKey::Boolean(b),
                Const::Number(n) => ConstKey::Number(n.to_bits()),
            }),
            other => panic!("operand must be a temp or a constant, found {:?}", other),
        }
    }

    fn result(&self, target: Option<&Temp>) -> Param {
        target.map_or(self.scratch, |t| self.temp(t))
    }

    /// Places call arguments and returns `(argc, args)`.
    fn prepare_call_args(&mut self, args: &'a [&'a Expr<'a>]) -> (u32, u32) {
        if let Some(index) = single_arg_fast_path(args, self.local_count) {
            return (1, index);
        }
        for (i, arg) in args.iter().enumerate() {
            let source = self.param(arg);
            let slot = self.local_count + (self.args_base as usize + i) as i32;
            let result = Param::Temp(slot);
            match source {
                Param::Temp(_) => self.add_instruction(Instr::MoveTemp { source, result }),
                Param::Value(_) => self.add_instruction(Instr::LoadValue {
                    value: source,
                    result,
                }),
            };
        }
        (args.len() as u32, self.args_base)
    }

    // Statements.

    fn visit_stmt(&mut self, stmt: &'a Stmt<'a>) {
        match stmt {
            Stmt::Exp(Expr::Call { base, args }) => self.visit_call(base, args, None),
            Stmt::Exp(other) => panic!("expression statement must be a call, found {:?}", other),
            Stmt::Move {
                target,
                source,
                op: None,
            } => self.visit_move(target, source),
            Stmt::Move {
                target,
                source,
                op: Some(op),
            } => self.visit_inplace(*op, target, source),
            Stmt::Jump { target } => self.visit_jump(*target),
            Stmt::CJump {
                cond,
                iftrue,
                iffalse,
            } => self.visit_cjump(cond, *iftrue, *iffalse),
            Stmt::Ret(expr) => {
                let result = self.param(expr);
                self.add_instruction(Instr::Ret { result });
            }
        }
    }

    fn visit_move(&mut self, target: &'a Expr<'a>, source: &'a Expr<'a>) {
        match target {
            Expr::Temp(t) => self.visit_move_to_temp(t, source),
            Expr::Name(Name::Id(id)) => {
                let source = self.param(source);
                let name = self.identifier(id);
                self.add_instruction(Instr::StoreName { name, source });
            }
            Expr::Member { base, name } => {
                let (base, source) = (self.param(base), self.param(source));
                let name = self.identifier(name);
                self.add_instruction(Instr::StoreProperty { base, name, source });
            }
            Expr::Subscript { base, index } => {
                let (base, index, source) = (self.param(base), self.param(index), self.param(source));
                self.add_instruction(Instr::StoreElement {
                    base,
                    index,
                    source,
                });
            }
            other => panic!("invalid move target {:?}", other),
        }
    }

    fn visit_move_to_temp(&mut self, target: &'a Temp, source: &'a Expr<'a>) {
        let result = self.temp(target);
        match source {
            Expr::Const(_) | Expr::String(_) => {
                let value = self.param(source);
                self.add_instruction(Instr::LoadValue { value, result });
            }
            Expr::Temp(t) => {
                let source = self.temp(t);
                self.add_instruction(Instr::MoveTemp { source, result });
            }
            Expr::Name(Name::This) => {
                self.add_instruction(Instr::LoadThis { result });
            }
            Expr::Name(Name::Id(id)) => {
                let name = self.identifier(id);
                self.add_instruction(Instr::LoadName { name, result });
            }
            Expr::Name(Name::Builtin(builtin)) => {
                panic!("builtin {:?} used as a value", builtin)
            }
            Expr::Closure(id) => {
                let function = self.closure(*id);
                self.add_instruction(Instr::LoadClosure { function, result });
            }
            Expr::Unop { op, expr } => {
                let source = self.param(expr);
                let alu = unary_op(*op);
                self.add_instruction(Instr::Unop { alu, source, result });
            }
            Expr::Binop { op, left, right } => {
                let (lhs, rhs) = (self.param(left), self.param(right));
                let alu = binary_op(*op);
                self.add_instruction(Instr::Binop {
                    alu,
                    lhs,
                    rhs,
                    result,
                });
            }
            Expr::Call { base, args } => self.visit_call(base, args, Some(target)),
            Expr::New { base, args } => self.visit_new(base, args, Some(target)),
            Expr::Member { base, name } => {
                let base = self.param(base);
                let name = self.identifier(name);
                self.add_instruction(Instr::LoadProperty { base, name, result });
            }
            Expr::Subscript { base, index } => {
                let (base, index) = (self.param(base), self.param(index));
                self.add_instruction(Instr::LoadElement {
                    base,
                    index,
                    result,
                });
            }
        }
    }

    fn visit_inplace(&mut self, op: AluOp, target: &'a Expr<'a>, source: &'a Expr<'a>) {
        let alu = binary_op(op);
        assert!(
            alu.is_compound_assignable(),
            "{:?} cannot be used in an in-place assignment",
            op
        );
        let source = self.param(source);
        match target {
            Expr::Name(Name::Id(id)) => {
                let name = self.identifier(id);
                self.add_instruction(Instr::InplaceNameOp { alu, name, source });
            }
            Expr::Member { base, name } => {
                let base = self.param(base);
                let member = self.identifier(name);
                self.add_instruction(Instr::InplaceMemberOp {
                    alu,
                    base,
                    member,
                    source,
                });
            }
            Expr::Subscript { base, index } => {
                let (base, index) = (self.param(base), self.param(index));
                self.add_instruction(Instr::InplaceElementOp {
                    alu,
                    base,
                    index,
                    source,
                });
            }
            Expr::Temp(t) => {
                let temp = self.temp(t);
                self.add_instruction(Instr::Binop {
                    alu,
                    lhs: temp,
                    rhs: source,
                    result: temp,
                });
            }
            other => panic!("invalid in-place target {:?}", other),
        }
    }

    fn visit_call(&mut self, base: &'a Expr<'a>, args: &'a [&'a Expr<'a>], target: Option<&'a Temp>) {
        match base {
            Expr::Name(Name::Builtin(builtin)) => self.visit_builtin(*builtin, args, target),
            Expr::Name(Name::Id(id)) => {
                let name = self.identifier(id);
                let (argc, args) = self.prepare_call_args(args);
                let result = self.result(target);
                self.add_instruction(Instr::CallActivationProperty {
                    name,
                    argc,
                    args,
                    result,
                });
            }
            Expr::Member { base, name } => {
                let base = self.param(base);
                let name = self.identifier(name);
                let (argc, args) = self.prepare_call_args(args);
                let result = self.result(target);
                self.add_instruction(Instr::CallProperty {
                    base,
                    name,
                    argc,
                    args,
                    result,
                });
            }
            Expr::Subscript { base, index } => {
                let (base, index) = (self.param(base), self.param(index));
                let (argc, args) = self.prepare_call_args(args);
                let result = self.result(target);
                self.add_instruction(Instr::CallElement {
                    base,
                    index,
                    argc,
                    args,
                    result,
                });
            }
            Expr::Temp(t) => {
                let dest = self.temp(t);
                let (argc, args) = self.prepare_call_args(args);
                let result = self.result(target);
                self.add_instruction(Instr::CallValue {
                    dest,
                    argc,
                    args,
                    result,
                });
            }
            other => panic!("invalid call target {:?}", other),
        }
    }

    fn visit_new(&mut self, base: &'a Expr<'a>, args: &'a [&'a Expr<'a>], target: Option<&'a Temp>) {
        match base {
            Expr::Name(Name::Id(id)) => {
                let name = self.identifier(id);
                let (argc, args) = self.prepare_call_args(args);
                let result = self.result(target);
                self.add_instruction(Instr::CreateActivationProperty {
                    name,
                    argc,
                    args,
                    result,
                });
            }
            Expr::Member { base, name } => {
                let base = self.param(base);
                let name = self.identifier(name);
                let (argc, args) = self.prepare_call_args(args);
                let result = self.result(target);
                self.add_instruction(Instr::CreateProperty {
                    base,
                    name,
                    argc,
                    args,
                    result,
                });
            }
            Expr::Temp(t) => {
                let func = self.temp(t);
                let (argc, args) = self.prepare_call_args(args);
                let result = self.result(target);
                self.add_instruction(Instr::CreateValue {
                    func,
                    argc,
                    args,
                    result,
                });
            }
            other => panic!("invalid constructor {:?}", other),
        }
    }

    fn visit_builtin(&mut self, builtin: Builtin, args: &'a [&'a Expr<'a>], target: Option<&'a Temp>) {
        let result = self.result(target);
        let arg = move |i: usize| -> &'a Expr<'a> {
            match args.get(i) {
                Some(arg) => *arg,
                None => panic!("builtin {:?} is missing argument {}", builtin, i),
            }
        };

        let instr = match builtin {
            Builtin::Typeof => match arg(0) {
                Expr::Member { base, name } => Instr::CallBuiltinTypeofMember {
                    base: self.param(base),
                    member: self.identifier(name),
                    result,
                },
                Expr::Subscript { base, index } => Instr::CallBuiltinTypeofSubscript {
                    base: self.param(base),
                    index: self.param(index),
                    result,
                },
                Expr::Name(Name::Id(id)) => Instr::CallBuiltinTypeofName {
                    name: self.identifier(id),
                    result,
                },
                value => Instr::CallBuiltinTypeofValue {
                    value: self.param(value),
                    result,
                },
            },
            Builtin::Delete => match arg(0) {
                Expr::Member { base, name } => Instr::CallBuiltinDeleteMember {
                    base: self.param(base),
                    member: self.identifier(name),
                    result,
                },
                Expr::Subscript { base, index } => Instr::CallBuiltinDeleteSubscript {
                    base: self.param(base),
                    index: self.param(index),
                    result,
                },
                Expr::Name(Name::Id(id)) => Instr::CallBuiltinDeleteName {
                    name: self.identifier(id),
                    result,
                },
                // Deleting anything that is not a reference is a no-op.
                _ => Instr::LoadValue {
                    value: self.constant(ConstKey::Boolean(false)),
                    result,
                },
            },
            Builtin::PostIncrement => match arg(0) {
                Expr::Member { base, name } => Instr::CallBuiltinPostIncMember {
                    base: self.param(base),
                    member: self.identifier(name),
                    result,
                },
                Expr::Subscript { base, index } => Instr::CallBuiltinPostIncSubscript {
                    base: self.param(base),
                    index: self.param(index),
                    result,
                },
                Expr::Name(Name::Id(id)) => Instr::CallBuiltinPostIncName {
                    name: self.identifier(id),
                    result,
                },
                value => Instr::CallBuiltinPostIncValue {
                    value: self.param(value),
                    result,
                },
            },
            Builtin::PostDecrement => match arg(0) {
                Expr::Member { base, name } => Instr::CallBuiltinPostDecMember {
                    base: self.param(base),
                    member: self.identifier(name),
                    result,
                },
                Expr::Subscript { base, index } => Instr::CallBuiltinPostDecSubscript {
                    base: self.param(base),
                    index: self.param(index),
                    result,
                },
                Expr::Name(Name::Id(id)) => Instr::CallBuiltinPostDecName {
                    name: self.identifier(id),
                    result,
                },
                value => Instr::CallBuiltinPostDecValue {
                    value: self.param(value),
                    result,
                },
            },
            Builtin::Throw => Instr::CallBuiltinThrow {
                arg: self.param(arg(0)),
            },
            Builtin::CreateExceptionHandler => Instr::CallBuiltinCreateExceptionHandler { result },
            Builtin::DeleteExceptionHandler => Instr::CallBuiltinDeleteExceptionHandler {},
            Builtin::GetException => Instr::CallBuiltinGetException { result },
            Builtin::ForeachIteratorObject => Instr::CallBuiltinForeachIteratorObject {
                arg: self.param(arg(0)),
                result,
            },
            Builtin::ForeachNextPropertyName => Instr::CallBuiltinForeachNextPropertyName {
                arg: self.param(arg(0)),
                result,
            },
            Builtin::PushWithScope => Instr::CallBuiltinPushScope {
                arg: self.param(arg(0)),
            },
            Builtin::PushCatchScope => Instr::CallBuiltinPushCatchScope {
                var_name: self.identifier(string_arg(arg(0), builtin)),
            },
            Builtin::PopScope => Instr::CallBuiltinPopScope {},
            Builtin::DeclareVar => {
                let Expr::Const(Const::Boolean(is_deletable)) = arg(0) else {
                    panic!("DeclareVar expects a boolean constant, found {:?}", arg(0));
                };
                Instr::CallBuiltinDeclareVar {
                    is_deletable: *is_deletable,
                    var_name: self.identifier(string_arg(arg(1), builtin)),
                }
            }
            Builtin::DefineProperty => Instr::CallBuiltinDefineProperty {
                object: self.param(arg(0)),
                name: self.identifier(string_arg(arg(1), builtin)),
                value: self.param(arg(2)),
            },
            Builtin::DefineArrayProperty => {
                let index = match arg(1) {
                    Expr::Const(Const::Number(n)) if *n >= 0.0 && *n == (*n as u32) as f64 => *n as u32,
                    other => panic!("DefineArrayProperty expects an index constant, found {:?}", other),
                };
                Instr::CallBuiltinDefineArrayProperty {
                    object: self.param(arg(0)),
                    index,
                    value: self.param(arg(2)),
                }
            }
        };
        self.add_instruction(instr);
    }

    // Control flow.

    fn record_patch(&mut self, at: usize, target: BlockId) {
        assert!(
            target.0 < self.block_count,
            "jump to L{} past the last block",
            target.0
        );
        self.patches
            .entry(target.0)
            .or_default()
            .push(at + JUMP_OFFSET_POSITION);
    }

    fn visit_jump(&mut self, target: BlockId) {
        let at = self.add_instruction(Instr::Jump { offset: 0 });
        self.record_patch(at, target);
    }

    fn visit_cjump(&mut self, cond: &'a Expr<'a>, iftrue: BlockId, iffalse: BlockId) {
        let condition = match cond {
            Expr::Temp(t) => self.temp(t),
            Expr::Binop { op, left, right } => {
                let (lhs, rhs) = (self.param(left), self.param(right));
                let result = self.scratch;
                self.add_instruction(Instr::Binop {
                    alu: binary_op(*op),
                    lhs,
                    rhs,
                    result,
                });
                result
            }
            other => panic!("branch condition must be a temp or a binary operation, found {:?}", other),
        };

        let at = self.add_instruction(Instr::CJump {
            offset: 0,
            condition,
        });
        self.record_patch(at, iftrue);
        if iffalse.0 != self.current_block + 1 {
            self.visit_jump(iffalse);
        }
    }

    fn patch_jump_addresses(&mut self) {
        let patches = core::mem::take(&mut self.patches);
        for (block, locations) in patches {
            let target = self.block_offsets[block];
            for at in locations {
                let offset = target as i64 - at as i64;
                let offset = i32::try_from(offset)
                    .unwrap_or_else(|_| panic!("jump offset {} does not fit in 32 bits", offset));
                self.buffer.patch_i32(at, offset);
            }
        }
    }
}

fn string_arg<'a>(expr: &'a Expr<'a>, builtin: Builtin) -> &'a str {
    match expr {
        Expr::String(s) => *s,
        other => panic!("{:?} expects a string constant, found {:?}", builtin, other),
    }
}

fn unary_op(op: AluOp) -> UnaryOp {
    match op {
        AluOp::Not => UnaryOp::Not,
        AluOp::UMinus => UnaryOp::UMinus,
        AluOp::UPlus => UnaryOp::UPlus,
        AluOp::Compl => UnaryOp::Compl,
        AluOp::Increment => UnaryOp::Increment,
        AluOp::Decrement => UnaryOp::Decrement,
        other => panic!("{:?} is not a unary operator", other),
    }
}

fn binary_op(op: AluOp) -> BinaryOp {
    match op {
        AluOp::BitAnd => BinaryOp::BitAnd,
        AluOp::BitOr => BinaryOp::BitOr,
        AluOp::BitXor => BinaryOp::BitXor,
        AluOp::Add => BinaryOp::Add,
        AluOp::Sub => BinaryOp::Sub,
        AluOp::Mul => BinaryOp::Mul,
        AluOp::Div => BinaryOp::Div,
        AluOp::Mod => BinaryOp::Mod,
        AluOp::LShift => BinaryOp::LShift,
        AluOp::RShift => BinaryOp::RShift,
        AluOp::URShift => BinaryOp::URShift,
        AluOp::Gt => BinaryOp::Gt,
        AluOp::Lt => BinaryOp::Lt,
        AluOp::Ge => BinaryOp::Ge,
        AluOp::Le => BinaryOp::Le,
        AluOp::Equal => BinaryOp::Equal,
        AluOp::NotEqual => BinaryOp::NotEqual,
        AluOp::StrictEqual => BinaryOp::StrictEqual,
        AluOp::StrictNotEqual => BinaryOp::StrictNotEqual,
        AluOp::InstanceOf => BinaryOp::InstanceOf,
        AluOp::In => BinaryOp::In,
        other => panic!("{:?} is not a binary operator", other),
    }
}
