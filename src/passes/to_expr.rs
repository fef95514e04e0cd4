//! to-expr: inline every single-use computing instruction into its unique
//! consumer's expression tree, then promote the function to FORM_EXPR.
//!
//! Grounded on the original reference implementation's `ToExpr` pass, with
//! two exclusions the distilled spec adds on top of it (see below): for
//! every instruction used exactly once, flag it `inline` and remove it
//! from its block's live instruction list. The instruction's arena record
//! survives, reachable only through its consumer's input edge — analyses
//! that dive into inlined expression trees (`crate::analysis::inlined`) still
//! see it.
//!
//! The distilled spec excludes `load`/`rload` from inlining eligibility
//! (their value can be invalidated by an intervening store that a pure
//! expression-tree splice would silently reorder past); the original Python
//! source does not implement this exclusion, but this crate follows the
//! distilled spec here since it supersedes the original on this point.
//!
//! `phi` is excluded the same way, for a reason specific to this crate's
//! interpreter rather than the original: a phi's semantics depend on the
//! block it resides in (it picks the pair whose predecessor is the block
//! last executed *before entering that block*). The interpreter evaluates
//! an inlined instruction lazily, on demand, at the point its consumer's
//! value is requested — which happens in whatever block the consumer
//! itself (transitively) ends up resident in, not necessarily the phi's
//! own block, since a single-use SSA value routinely crosses block
//! boundaries. Splicing a phi into a different block's expression tree
//! would evaluate it against the wrong "previously executed block" and
//! either mismatch or silently pick the wrong arm. Keeping every phi
//! block-resident (never `inline`) sidesteps the question entirely: a phi
//! is always executed as an ordinary block instruction, in its own block.

use crate::analysis::uses::UseMap;
use crate::function::{Form, Function};
use crate::instruction::Op;

fn is_excluded_from_inlining(op: &Op) -> bool {
    matches!(op, Op::Load { .. } | Op::RLoad { .. } | Op::Phi { .. })
}

/// Inline every eligible single-use instruction and promote the function to
/// FORM_EXPR.
#[tracing::instrument(skip(function))]
pub fn process_function(function: &mut Function) {
    let uses = UseMap::compute(function);

    let mut inlined_count = 0;
    for &block in function.blocks_in_order().to_vec().iter() {
        let mut to_remove = Vec::new();
        for (i, &id) in function.block(block).insts().iter().enumerate() {
            if !uses.is_used_exactly_once(id) {
                continue;
            }
            if is_excluded_from_inlining(&function.inst(id).op) {
                continue;
            }
            to_remove.push(i);
        }
        for &i in &to_remove {
            let id = function.block(block).insts()[i];
            function.inst_mut(id).inline = true;
        }
        for &i in to_remove.iter().rev() {
            function.remove_inst_at(block, i);
            inlined_count += 1;
        }
    }

    function.form = Form::Expr;
    tracing::trace!(inlined = inlined_count, "to-expr pass complete");
}
