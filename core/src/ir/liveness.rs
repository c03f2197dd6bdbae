//! Per-statement temp liveness.
//!
//! Standard backward dataflow over the block graph, followed by a backward
//! walk of each block to derive statement-level live-in/live-out sets.
//! Only non-negative temp indices (locals and stack temps) are tracked;
//! argument slots are never renumbered and so never need liveness.

use crate::Vec;
use crate::ir::bitset::BitSet;
use crate::ir::tree::{Expr, Function, Stmt};

#[derive(Debug, Clone)]
pub struct StmtLiveness {
    pub live_in: BitSet,
    pub live_out: BitSet,
}

#[derive(Debug)]
pub struct Liveness {
    statements: Vec<Vec<StmtLiveness>>,
}

impl Liveness {
    pub fn compute(function: &Function<'_>) -> Self {
        let width = function.temp_count() as usize;
        let block_count = function.blocks.len();

        let mut uses = Vec::with_capacity(block_count);
        let mut defs = Vec::with_capacity(block_count);
        for block in function.blocks {
            let mut block_use = BitSet::new_empty(width);
            let mut block_def = BitSet::new_empty(width);
            for stmt in block.statements {
                let (stmt_use, stmt_def) = use_def(stmt, width);
                // Uses already defined earlier in the block are not upward exposed.
                let mut exposed = stmt_use;
                exposed.subtract_with(&block_def);
                block_use.union_with(&exposed);
                block_def.union_with(&stmt_def);
            }
            uses.push(block_use);
            defs.push(block_def);
        }

        let mut live_in: Vec<BitSet> = (0..block_count).map(|_| BitSet::new_empty(width)).collect();
        let mut live_out: Vec<BitSet> = live_in.clone();

        let mut changed = true;
        while changed {
            changed = false;
            for (index, block) in function.blocks.iter().enumerate().rev() {
                let mut out = BitSet::new_empty(width);
                if let Some(terminator) = block.terminator() {
                    for succ in terminator.successors() {
                        out.union_with(&live_in[succ.0]);
                    }
                }
                let mut inn = out.clone();
                inn.subtract_with(&defs[index]);
                inn.union_with(&uses[index]);

                live_out[index] = out;
                changed |= live_in[index].union_with(&inn);
            }
        }

        let statements = function
            .blocks
            .iter()
            .enumerate()
            .map(|(index, block)| {
                let mut live = live_out[index].clone();
                let mut lives = Vec::with_capacity(block.statements.len());
                for stmt in block.statements.iter().rev() {
                    let live_out = live.clone();
                    let (stmt_use, stmt_def) = use_def(stmt, width);
                    live.subtract_with(&stmt_def);
                    live.union_with(&stmt_use);
                    lives.push(StmtLiveness {
                        live_in: live.clone(),
                        live_out,
                    });
                }
                lives.reverse();
                lives
            })
            .collect();

        tracing::trace!(blocks = block_count, width, "computed liveness");
        Self { statements }
    }

    pub fn statement(&self, block: usize, index: usize) -> &StmtLiveness {
        &self.statements[block][index]
    }

    pub fn block(&self, block: usize) -> &[StmtLiveness] {
        &self.statements[block]
    }
}

fn use_def(stmt: &Stmt<'_>, width: usize) -> (BitSet, BitSet) {
    let mut uses = BitSet::new_empty(width);
    let mut defs = BitSet::new_empty(width);
    let mut add_uses = |expr: &Expr<'_>| {
        expr.for_each_temp(&mut |t| {
            if t.index() >= 0 {
                uses.set(t.index() as usize);
            }
        })
    };
    match stmt {
        Stmt::Exp(e) | Stmt::Ret(e) | Stmt::CJump { cond: e, .. } => add_uses(e),
        Stmt::Move { target, source, op } => {
            match target.as_temp() {
                Some(t) if t.index() >= 0 => {
                    // An in-place update reads its target before writing it.
                    if op.is_some() {
                        add_uses(target);
                    }
                    defs.set(t.index() as usize);
                }
                Some(_) => {}
                None => add_uses(target),
            }
            add_uses(source);
        }
        Stmt::Jump { .. } => {}
    }
    (uses, defs)
}
