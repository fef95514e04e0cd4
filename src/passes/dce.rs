//! Dead-code elimination: remove every computing instruction not reachable,
//! by the "inputs" relation, from some non-computing instruction.
//!
//! Grounded on the original reference implementation's
//! `DeadCodeElimination` pass: a first pass seeds `used` with every
//! non-computing instruction (terminators, stores, `rstore` — anything whose
//! execution has an effect beyond producing a value) and closes it under
//! inputs; a second pass removes everything not marked, in reverse index
//! order per block so earlier removals don't shift the indices of instructions
//! still to be removed.

use std::collections::HashSet;

use crate::function::Function;
use crate::instruction::InstId;
use crate::types::Context;

fn mark_used(function: &Function, id: InstId, used: &mut HashSet<InstId>) {
    if !used.insert(id) {
        return;
    }
    for input in function.inst(id).inputs() {
        if let Some(producer) = input.producer() {
            mark_used(function, producer, used);
        }
    }
}

/// Remove every computing instruction not transitively reachable from a
/// non-computing root.
#[tracing::instrument(skip(function, ctx))]
pub fn process_function(function: &mut Function, ctx: &Context) {
    let mut used = HashSet::new();
    let roots: Vec<InstId> = function
        .iter_live_insts()
        .filter(|&(_, _, id)| !function.inst(id).produces_value(ctx))
        .map(|(_, _, id)| id)
        .collect();
    for root in roots {
        mark_used(function, root, &mut used);
    }

    let mut removed = 0;
    for &block in function.blocks_in_order().to_vec().iter() {
        let mut to_remove = Vec::new();
        for (i, &id) in function.block(block).insts().iter().enumerate() {
            if !used.contains(&id) {
                to_remove.push(i);
            }
        }
        for i in to_remove.into_iter().rev() {
            function.remove_inst_at(block, i);
            removed += 1;
        }
    }
    tracing::trace!(removed, "dead code elimination pass complete");
}
