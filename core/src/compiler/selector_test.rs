//! Tests for instruction selection.

use bumpalo::Bump;
use pretty_assertions::assert_eq;

use crate::Vec;
use crate::api::CompilationOptions;
use crate::compiler::{compile_module, single_arg_fast_path};
use crate::instruction::{DispatchMode, Instr, Opcode, Param, read_header};
use crate::ir::{AluOp, Builtin, FunctionBuilder, Module, ModuleBuilder};
use crate::runtime::Value;
use crate::vm::{Bytecode, CompiledFunction, handler_address};

fn options(dispatch: DispatchMode, compress_temps: bool) -> CompilationOptions {
    CompilationOptions {
        dispatch,
        compress_temps,
    }
}

fn instructions(function: &CompiledFunction) -> Vec<Instr> {
    function.code.instructions().map(|(_, instr)| instr).collect()
}

/// `sum(n)`: adds `0 + 1 + ... + n-1` in a loop.
fn sum_loop(arena: &Bump) -> Module<'_> {
    let mut f = FunctionBuilder::new(arena, Some("sum"), &["n"], &["acc"]);
    let entry = f.new_block();
    let header = f.new_block();
    let body = f.new_block();
    let exit = f.new_block();
    let i = f.new_temp();
    let cond = f.new_temp();

    f.mov(entry, f.local(0), f.number(0.0));
    f.mov(entry, f.temp(i), f.number(0.0));
    f.jump(entry, header);
    f.mov(header, f.temp(cond), f.binop(AluOp::Lt, f.temp(i), f.arg(0)));
    f.cjump(header, f.temp(cond), body, exit);
    f.inplace(body, AluOp::Add, f.local(0), f.temp(i));
    f.inplace(body, AluOp::Add, f.temp(i), f.number(1.0));
    f.jump(body, header);
    f.ret(exit, f.local(0));

    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    module.finish(root)
}

#[test]
fn frame_starts_with_push_of_frame_size() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, Some("calls"), &["a"], &[]);
    let entry = f.new_block();
    let t0 = f.new_temp();
    let t1 = f.new_temp();
    f.mov(entry, f.temp(t0), f.binop(AluOp::Add, f.arg(0), f.number(1.0)));
    f.mov(
        entry,
        f.temp(t1),
        f.call(f.name("g"), &[f.temp(t0), f.arg(0), f.number(3.0)]),
    );
    f.ret(entry, f.temp(t1));
    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    let compiled = compile_module(&module.finish(root), &CompilationOptions::default());

    let function = &compiled.root;
    // Two temps, three outgoing arguments and the scratch slot.
    assert_eq!(function.temp_count, 2);
    assert_eq!(function.frame_size, 2 + 3 + 1);
    assert_eq!(instructions(function)[0], Instr::Push { value: 6 });
}

#[test]
fn arguments_are_copied_into_the_outgoing_window() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, Some("f"), &["a"], &[]);
    let entry = f.new_block();
    let t0 = f.new_temp();
    let t1 = f.new_temp();
    f.mov(entry, f.temp(t0), f.number(1.0));
    f.mov(entry, f.temp(t1), f.call(f.name("g"), &[f.temp(t0), f.arg(0)]));
    f.ret(entry, f.temp(t1));
    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    let compiled = compile_module(&module.finish(root), &options(DispatchMode::Switch, false));

    let code = instructions(&compiled.root);
    assert_eq!(
        code[2..5],
        [
            Instr::MoveTemp {
                source: Param::Temp(0),
                result: Param::Temp(2),
            },
            Instr::MoveTemp {
                source: Param::Temp(-1),
                result: Param::Temp(3),
            },
            Instr::CallActivationProperty {
                name: 0,
                argc: 2,
                args: 2,
                result: Param::Temp(1),
            },
        ]
    );
}

#[test]
fn fast_path_only_takes_a_lone_stack_temp() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, None, &["a"], &["x", "y"]);
    let t0 = f.new_temp();
    let t1 = f.new_temp();

    // Stack temps are numbered after the two locals.
    assert_eq!(single_arg_fast_path(&[f.temp(t0)], 2), Some(0));
    assert_eq!(single_arg_fast_path(&[f.temp(t1)], 2), Some(1));

    assert_eq!(single_arg_fast_path(&[f.arg(0)], 2), None);
    assert_eq!(single_arg_fast_path(&[f.local(1)], 2), None);
    assert_eq!(single_arg_fast_path(&[f.number(1.0)], 2), None);
    assert_eq!(single_arg_fast_path(&[], 2), None);
    assert_eq!(single_arg_fast_path(&[f.temp(t0), f.temp(t1)], 2), None);
}

#[test]
fn single_stack_temp_argument_is_passed_in_place() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, Some("f"), &["a"], &["x"]);
    let entry = f.new_block();
    let t0 = f.new_temp();
    f.mov(entry, f.temp(t0), f.binop(AluOp::Mul, f.arg(0), f.number(2.0)));
    f.exp(entry, f.call(f.name("print"), &[f.temp(t0)]));
    f.exp(entry, f.call(f.name("print"), &[f.local(0)]));
    f.ret(entry, f.undefined());
    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    let compiled = compile_module(&module.finish(root), &options(DispatchMode::Switch, false));

    let function = &compiled.root;
    let scratch = Param::Temp((function.locals.len() + 1 + 1) as i32);
    let code = instructions(function);
    // The temp sits at stack index 0 and is handed over without a copy.
    assert_eq!(
        code[2],
        Instr::CallActivationProperty {
            name: 0,
            argc: 1,
            args: 0,
            result: scratch,
        }
    );
    // A local lives outside the stack area and must be copied.
    assert_eq!(
        code[3],
        Instr::MoveTemp {
            source: Param::Temp(0),
            result: Param::Temp(2),
        }
    );
    assert_eq!(
        code[4],
        Instr::CallActivationProperty {
            name: 0,
            argc: 1,
            args: 1,
            result: scratch,
        }
    );
}

#[test]
fn every_jump_lands_on_a_block_start() {
    let arena = Bump::new();
    let compiled = compile_module(&sum_loop(&arena), &CompilationOptions::default());
    let function = &compiled.root;
    assert_eq!(function.block_offsets.len(), 4);

    let mut jumps = 0;
    for (at, instr) in function.code.instructions() {
        if let Some(offset) = instr.jump_offset() {
            jumps += 1;
            let target = Bytecode::jump_target(at, offset) as u32;
            assert!(
                function.block_offsets.contains(&target),
                "jump at {} lands on {}",
                at,
                target
            );
        }
    }
    // entry -> header, header -> body, body -> header. The branch to the
    // exit block falls through only if it is next, which it is not.
    assert_eq!(jumps, 4);
}

#[test]
fn disassembly_labels_jump_targets() {
    let arena = Bump::new();
    let compiled = compile_module(&sum_loop(&arena), &CompilationOptions::default());
    let code = &compiled.root.code;
    let listing = crate::format!("{:?}", code);
    let lines: Vec<&str> = listing.lines().collect();

    assert_eq!(lines.len(), code.instructions().count());
    assert!(lines[0].contains("Push"), "{}", listing);
    assert!(listing.contains("L0:"), "{}", listing);
    for line in lines.iter().filter(|l| l.contains("Jump")) {
        assert!(line.contains("(to L"), "unlabelled jump: {}", line);
    }
}

#[test]
fn false_branch_to_next_block_falls_through() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, Some("abs"), &["a"], &[]);
    let entry = f.new_block();
    let positive = f.new_block();
    let negative = f.new_block();
    let t0 = f.new_temp();
    f.cjump(entry, f.binop(AluOp::Lt, f.arg(0), f.number(0.0)), negative, positive);
    f.ret(positive, f.arg(0));
    f.mov(negative, f.temp(t0), f.unop(AluOp::UMinus, f.arg(0)));
    f.ret(negative, f.temp(t0));
    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    let compiled = compile_module(&module.finish(root), &CompilationOptions::default());

    let opcodes: Vec<Opcode> = instructions(&compiled.root).iter().map(Instr::opcode).collect();
    assert_eq!(
        opcodes,
        [
            Opcode::Push,
            Opcode::Binop,
            Opcode::CJump,
            Opcode::Ret,
            Opcode::Unop,
            Opcode::Ret,
        ]
    );
}

#[test]
fn unary_source_is_lowered_through_a_temp() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, Some("neg"), &["a"], &[]);
    let entry = f.new_block();
    let t0 = f.new_temp();
    f.mov(entry, f.temp(t0), f.unop(AluOp::UMinus, f.arg(0)));
    f.ret(entry, f.temp(t0));
    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    let compiled = compile_module(&module.finish(root), &CompilationOptions::default());

    assert_eq!(
        instructions(&compiled.root)[1],
        Instr::Unop {
            alu: crate::runtime::UnaryOp::UMinus,
            source: Param::Temp(-1),
            result: Param::Temp(0),
        }
    );
}

#[test]
fn constants_and_identifiers_are_interned() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, None, &[], &[]);
    let entry = f.new_block();
    let t0 = f.new_temp();
    let t1 = f.new_temp();
    f.mov(entry, f.name("x"), f.number(1.0));
    f.mov(entry, f.temp(t0), f.name("x"));
    f.mov(entry, f.temp(t1), f.binop(AluOp::Add, f.temp(t0), f.number(1.0)));
    f.mov(entry, f.name("y"), f.string("hi"));
    f.ret(entry, f.temp(t1));
    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    let compiled = compile_module(&module.finish(root), &CompilationOptions::default());

    let function = &compiled.root;
    assert_eq!(&*function.constants, &[Value::Number(1.0), Value::string("hi")]);
    let identifiers: Vec<&str> = function.identifiers.iter().map(|s| &**s).collect();
    assert_eq!(identifiers, ["x", "y"]);
}

#[test]
fn builtins_dispatch_on_argument_shape() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, None, &["o"], &[]);
    let entry = f.new_block();
    let t0 = f.new_temp();
    let t1 = f.new_temp();
    let t2 = f.new_temp();
    let t3 = f.new_temp();
    f.mov(entry, f.temp(t0), f.builtin(Builtin::Typeof, &[f.name("missing")]));
    f.mov(entry, f.temp(t1), f.builtin(Builtin::Typeof, &[f.member(f.arg(0), "p")]));
    let element = f.subscript(f.arg(0), f.number(0.0));
    f.mov(entry, f.temp(t2), f.builtin(Builtin::PostIncrement, &[element]));
    f.mov(entry, f.temp(t3), f.builtin(Builtin::Delete, &[f.name("g")]));
    f.exp(entry, f.builtin(Builtin::DeclareVar, &[f.boolean(true), f.string("v")]));
    f.ret(entry, f.temp(t0));
    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    let compiled = compile_module(&module.finish(root), &options(DispatchMode::Switch, false));

    let opcodes: Vec<Opcode> = instructions(&compiled.root).iter().map(Instr::opcode).collect();
    assert_eq!(
        opcodes,
        [
            Opcode::Push,
            Opcode::CallBuiltinTypeofName,
            Opcode::CallBuiltinTypeofMember,
            Opcode::CallBuiltinPostIncSubscript,
            Opcode::CallBuiltinDeleteName,
            Opcode::CallBuiltinDeclareVar,
            Opcode::Ret,
        ]
    );
}

#[test]
fn nested_functions_are_compiled_first_and_shared() {
    let arena = Bump::new();
    let mut inner = FunctionBuilder::new(&arena, Some("inner"), &[], &[]);
    let entry = inner.new_block();
    inner.ret(entry, inner.number(7.0));
    let mut module = ModuleBuilder::new();
    let inner_id = module.add(inner.build());

    let mut outer = FunctionBuilder::new(&arena, Some("outer"), &[], &[]);
    let entry = outer.new_block();
    let a = outer.new_temp();
    let b = outer.new_temp();
    outer.mov(entry, outer.temp(a), outer.closure(inner_id));
    outer.mov(entry, outer.temp(b), outer.closure(inner_id));
    outer.ret(entry, outer.temp(a));
    let root = module.add(outer.build());
    let compiled = compile_module(&module.finish(root), &CompilationOptions::default());

    let root = &compiled.root;
    assert_eq!(root.closures.len(), 1);
    assert_eq!(root.closures[0].display_name(), "inner");
    let code = instructions(root);
    assert_eq!(
        code[1..3],
        [
            Instr::LoadClosure {
                function: 0,
                result: Param::Temp(0),
            },
            Instr::LoadClosure {
                function: 0,
                result: Param::Temp(1),
            },
        ]
    );
}

#[test]
fn threaded_headers_hold_handler_addresses() {
    let switch_arena = Bump::new();
    let threaded_arena = Bump::new();
    let switch = compile_module(&sum_loop(&switch_arena), &options(DispatchMode::Switch, true));
    let threaded = compile_module(
        &sum_loop(&threaded_arena),
        &options(DispatchMode::Threaded, true),
    );

    assert_eq!(instructions(&switch.root), instructions(&threaded.root));
    assert_eq!(threaded.root.code.dispatch(), DispatchMode::Threaded);
    for (at, instr) in threaded.root.code.instructions() {
        let header = read_header(&threaded.root.code.bytes()[at..]);
        assert_eq!(header, handler_address(instr.opcode()));
    }
    for (at, instr) in switch.root.code.instructions() {
        let header = read_header(&switch.root.code.bytes()[at..]);
        assert_eq!(header, instr.opcode() as u64);
    }
}

#[test]
#[should_panic(expected = "IfTrue is not a binary operator")]
fn front_end_only_operator_is_rejected() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, None, &["a"], &[]);
    let entry = f.new_block();
    let t0 = f.new_temp();
    f.mov(entry, f.temp(t0), f.binop(AluOp::IfTrue, f.arg(0), f.arg(0)));
    f.ret(entry, f.temp(t0));
    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    compile_module(&module.finish(root), &CompilationOptions::default());
}

#[test]
#[should_panic(expected = "does not end in a jump or return")]
fn unterminated_block_is_rejected() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, Some("open"), &[], &[]);
    let entry = f.new_block();
    let t0 = f.new_temp();
    f.mov(entry, f.temp(t0), f.number(1.0));
    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    compile_module(&module.finish(root), &options(DispatchMode::Switch, false));
}
