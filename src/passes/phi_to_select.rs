//! phi -> select: turn two-predecessor phi nodes into `select` where an
//! if/then(/else) pattern can be recovered from the CFG shape.
//!
//! Grounded on the original reference implementation's
//! `BinaryPhiToSelect`: for a block with exactly two predecessors, try
//! matching one of them as the unique predecessor of the other (an
//! else-less if), or both sharing a unique predecessor whose terminator is a
//! `branch` (a complete if/else). On a match, the branch's condition and the
//! arm each predecessor corresponds to are extracted, and every phi in the
//! block becomes a `select`.
//!
//! Per the distilled spec: deliberately breaks strict SSA domination (the
//! select's operands may be defined in blocks that don't dominate the block
//! the select now lives in) in exchange for being absorbable into an
//! expression tree by the following `to_expr` pass. Refuses to run on
//! FORM_EXPR functions — this is a `PassPrecondition` error, mirroring the
//! original's `assert self.function.form == FORM_PURE`.

use crate::error::IrError;
use crate::function::{BlockId, Form, Function};
use crate::instruction::{InstData, Op};

struct PatternMatch {
    condition: crate::value::Value,
    then_pred: BlockId,
    else_pred: BlockId,
}

fn branch_condition_of(function: &Function, block: BlockId) -> Option<(crate::value::Value, BlockId, BlockId)> {
    let term = function.terminator(block)?;
    match &function.inst(term).op {
        Op::Branch { cond, if_true, if_false } => Some((*cond, *if_true, *if_false)),
        _ => None,
    }
}

/// Try matching `left` as the THEN block and `right` as the ELSE block (or
/// the absent-ELSE join point) of an if/then(/else) pattern.
fn match_if_pattern(function: &Function, left: BlockId, right: BlockId) -> Option<PatternMatch> {
    let left_preds = function.block(left).predecessors();
    if left_preds.len() != 1 {
        return None;
    }
    let origin_bb = *left_preds.iter().next().unwrap();

    let right_preds = function.block(right).predecessors();
    let is_else_less = origin_bb == right;
    let is_complete = right_preds.len() == 1 && *right_preds.iter().next().unwrap() == origin_bb;
    if !(is_else_less || is_complete) {
        return None;
    }

    let (condition, if_true, if_false) = branch_condition_of(function, origin_bb)?;
    // `left` must actually be one arm of `origin_bb`'s branch, matched to the
    // predecessor that corresponds to it being taken.
    if if_true == left {
        Some(PatternMatch { condition, then_pred: left, else_pred: right })
    } else if if_false == left {
        Some(PatternMatch { condition, then_pred: right, else_pred: left })
    } else {
        None
    }
}

/// Replace every two-predecessor phi whose block matches an if/then(/else)
/// pattern with a `select`. Returns a [`IrError::PassPrecondition`] if
/// `function` is already in FORM_EXPR.
#[tracing::instrument(skip(function))]
pub fn process_function(function: &mut Function) -> Result<(), IrError> {
    if function.form != Form::Pure {
        return Err(IrError::PassPrecondition("phi_to_select requires a FORM_PURE function"));
    }

    let mut rewritten = 0;
    for &block in function.blocks_in_order().to_vec().iter() {
        let preds: Vec<BlockId> = function.block(block).predecessors().iter().copied().collect();
        if preds.len() != 2 {
            continue;
        }
        let (p0, p1) = (preds[0], preds[1]);
        let Some(matched) = match_if_pattern(function, p0, p1).or_else(|| match_if_pattern(function, p1, p0)) else {
            continue;
        };

        let phi_indices: Vec<usize> = function
            .block(block)
            .insts()
            .iter()
            .enumerate()
            .filter(|&(_, &id)| matches!(function.inst(id).op, Op::Phi { .. }))
            .map(|(i, _)| i)
            .collect();

        for &i in &phi_indices {
            let inst_id = function.block(block).insts()[i];
            let pairs = match &function.inst(inst_id).op {
                Op::Phi { pairs } => pairs.clone(),
                _ => continue,
            };
            let then_value = pairs.iter().find(|(b, _)| *b == matched.then_pred).map(|(_, v)| *v);
            let else_value = pairs.iter().find(|(b, _)| *b == matched.else_pred).map(|(_, v)| *v);
            let (Some(then_value), Some(else_value)) = (then_value, else_value) else {
                continue;
            };
            let origin = function.inst(inst_id).origin.clone();
            let new_id = function.replace_inst_at(
                block,
                i,
                InstData::with_origin(
                    Op::Select { cond: matched.condition, if_true: then_value, if_false: else_value },
                    origin,
                ),
            );
            let ty = then_value.ty;
            let old_value = crate::value::Value::from_inst(ty, inst_id);
            let new_value = crate::value::Value::from_inst(ty, new_id);
            function.replace_value(old_value, new_value);
            rewritten += 1;
        }
    }
    tracing::trace!(rewritten, "phi-to-select pass complete");
    Ok(())
}
