//! Temp slot compression.
//!
//! Renumbers the stack-area temps of a function so that temps whose live
//! ranges do not overlap share a slot. A linear-scan allocator walks the
//! statements in layout order, keeping an `active` list of
//! (virtual, physical) slot pairs:
//!
//! - Temps live out of any block terminator are pinned to dedicated slots
//!   up front, since they cross block boundaries.
//! - At the start of each block, and whenever a temp needs a slot, pairs
//!   whose virtual temp is no longer live are expired and their slots
//!   become free.
//! - A temp keeps its slot for as long as it stays in the active list.
//!
//! Arguments and locals are never renumbered.

use hashbrown::HashSet;

use crate::Vec;
use crate::ir::{Expr, Function, Liveness, Stmt, StmtLiveness, Temp};

/// Renumbers temps in place and returns the new temp count (locals
/// included). The function's recorded temp count is updated too.
pub fn compress_temps(function: &Function<'_>, liveness: &Liveness) -> u32 {
    let local_count = function.local_count();
    let mut state = CompressTemps {
        active: Vec::new(),
        seen: HashSet::new(),
        local_count: local_count as i32,
        next_free: 0,
        pinned: 0,
    };

    let mut pinned = HashSet::new();
    for (index, block) in function.blocks.iter().enumerate() {
        if block.terminator().is_none() {
            continue;
        }
        let life = liveness.statement(index, block.statements.len() - 1);
        for temp in life.live_out.iter() {
            if temp >= local_count && pinned.insert(temp) {
                let slot = state.next_free;
                state.add((temp - local_count) as i32, slot);
            }
        }
    }
    state.pinned = state.next_free;

    let mut max_used = state.next_free;
    for (index, block) in function.blocks.iter().enumerate() {
        for (position, stmt) in block.statements.iter().enumerate() {
            let life = liveness.statement(index, position);
            if position == 0 {
                state.expire_old(life);
            }
            state.visit_stmt(stmt, life);
            max_used = max_used.max(state.next_free);
        }
    }

    let temp_count = max_used + local_count as u32;
    tracing::debug!(
        function = function.name.unwrap_or("<anonymous>"),
        before = function.temp_count(),
        after = temp_count,
        pinned = state.pinned,
        "compressed temps"
    );
    function.set_temp_count(temp_count);
    temp_count
}

struct CompressTemps {
    /// (virtual, physical) pairs, both relative to the stack area. Most
    /// recently added last.
    active: Vec<(i32, u32)>,
    /// Temp nodes already renumbered.
    seen: HashSet<*const Temp>,
    local_count: i32,
    next_free: u32,
    /// Slots `0..pinned` are reserved for temps live across blocks.
    pinned: u32,
}

impl CompressTemps {
    fn add(&mut self, virtual_slot: i32, physical: u32) {
        if self.next_free <= physical {
            self.next_free = physical + 1;
        }
        tracing::trace!(virtual_slot, physical, "assign temp slot");
        self.active.push((virtual_slot, physical));
    }

    /// Drops pairs whose temp is dead at `life` and returns the lowest free
    /// slot (or `next_free` when all are taken).
    fn expire_old(&mut self, life: &StmtLiveness) -> u32 {
        let mut in_use = crate::vec![false; self.next_free as usize];
        let (pinned, local_count) = (self.pinned, self.local_count);
        self.active.retain(|&(virtual_slot, physical)| {
            let keep = physical < pinned || life.live_in.get((virtual_slot + local_count) as usize);
            if keep {
                in_use[physical as usize] = true;
            }
            keep
        });
        in_use
            .iter()
            .position(|used| !used)
            .map_or(self.next_free, |slot| slot as u32)
    }

    fn remap(&mut self, virtual_slot: i32, life: &StmtLiveness) -> u32 {
        if let Some(&(_, physical)) = self.active.iter().rev().find(|(v, _)| *v == virtual_slot) {
            return physical;
        }
        let slot = self.expire_old(life);
        self.add(virtual_slot, slot);
        slot
    }

    fn visit_temp(&mut self, temp: &Temp, life: &StmtLiveness) {
        if !self.seen.insert(temp as *const Temp) {
            return;
        }
        let index = temp.index();
        if index < self.local_count {
            return;
        }
        let physical = self.remap(index - self.local_count, life);
        temp.set_index(physical as i32 + self.local_count);
    }

    fn visit_expr(&mut self, expr: &Expr<'_>, life: &StmtLiveness) {
        let mut temps = Vec::new();
        expr.for_each_temp(&mut |t| temps.push(t));
        for temp in temps {
            self.visit_temp(temp, life);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt<'_>, life: &StmtLiveness) {
        match stmt {
            Stmt::Exp(e) | Stmt::Ret(e) | Stmt::CJump { cond: e, .. } => self.visit_expr(e, life),
            Stmt::Move { target, source, .. } => {
                self.visit_expr(target, life);
                self.visit_expr(source, life);
            }
            Stmt::Jump { .. } => {}
        }
    }
}
