//! Tests for the liveness analysis.

use bumpalo::Bump;
use pretty_assertions::assert_eq;

use crate::Vec;
use crate::ir::{AluOp, FunctionBuilder, Liveness};

fn ones(bits: &crate::ir::BitSet) -> Vec<usize> {
    bits.iter().collect()
}

#[test]
fn straight_line_temp_dies_after_last_use() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, Some("f"), &["a"], &[]);
    let entry = f.new_block();
    let t0 = f.new_temp();
    let t1 = f.new_temp();
    f.mov(entry, f.temp(t0), f.arg(0));
    f.mov(entry, f.temp(t1), f.binop(AluOp::Add, f.temp(t0), f.number(1.0)));
    f.ret(entry, f.temp(t1));
    let function = f.build();

    let liveness = Liveness::compute(function);
    let block = liveness.block(0);
    assert_eq!(ones(&block[0].live_in), Vec::<usize>::new());
    assert_eq!(ones(&block[0].live_out), vec![0]);
    assert_eq!(ones(&block[1].live_in), vec![0]);
    assert_eq!(ones(&block[1].live_out), vec![1]);
    assert_eq!(ones(&block[2].live_out), Vec::<usize>::new());
}

#[test]
fn value_live_across_loop_back_edge() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, Some("loop"), &[], &["i"]);
    let entry = f.new_block();
    let header = f.new_block();
    let body = f.new_block();
    let exit = f.new_block();
    let cond = f.new_temp();

    f.mov(entry, f.local(0), f.number(0.0));
    f.jump(entry, header);
    f.mov(header, f.temp(cond), f.binop(AluOp::Lt, f.local(0), f.number(3.0)));
    f.cjump(header, f.temp(cond), body, exit);
    f.inplace(body, AluOp::Add, f.local(0), f.number(1.0));
    f.jump(body, header);
    f.ret(exit, f.local(0));
    let function = f.build();

    let liveness = Liveness::compute(function);
    // The local is read by the loop header, so it is live around the back edge.
    assert_eq!(ones(&liveness.statement(2, 1).live_out), vec![0]);
    assert_eq!(ones(&liveness.statement(1, 0).live_in), vec![0]);
    // The condition temp is consumed by the branch and dead on both successors.
    assert_eq!(ones(&liveness.statement(1, 1).live_in), vec![0, 1]);
    assert_eq!(ones(&liveness.statement(1, 1).live_out), vec![0]);
}

#[test]
fn branch_keeps_temp_live_only_on_using_path() {
    let arena = Bump::new();
    let mut f = FunctionBuilder::new(&arena, None, &["c"], &[]);
    let entry = f.new_block();
    let left = f.new_block();
    let right = f.new_block();
    let t = f.new_temp();
    let u = f.new_temp();

    f.mov(entry, f.temp(t), f.number(7.0));
    f.cjump(entry, f.arg(0), left, right);
    f.ret(left, f.temp(t));
    f.mov(right, f.temp(u), f.number(1.0));
    f.ret(right, f.temp(u));
    let function = f.build();

    let liveness = Liveness::compute(function);
    assert_eq!(ones(&liveness.statement(0, 1).live_out), vec![0]);
    assert_eq!(ones(&liveness.statement(2, 0).live_in), Vec::<usize>::new());
}
