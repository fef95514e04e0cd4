//! Copy elimination: rebind every operand to its ultimate non-copy source.
//!
//! Grounded on the original reference implementation's `CopyElimination`
//! pass, which walks `value.value` while it is a `CopyInstruction` and
//! rewrites every instruction's inputs with `map_inputs`. This leaves
//! orphaned `copy` instructions behind for [`crate::passes::dce`] to remove —
//! the same division of labor the original relies on (it never removes the
//! now-dead copies itself).

use crate::function::Function;
use crate::instruction::Op;
use crate::value::Value;

/// Follow `value -> value.producer() if copy else stop` to the ultimate
/// non-copy source.
fn ultimate_source(function: &Function, mut value: Value) -> Value {
    while let Some(producer) = value.producer() {
        match &function.inst(producer).op {
            Op::Copy { value: inner } => value = *inner,
            _ => break,
        }
    }
    value
}

/// Rebind every input operand of every live instruction to its ultimate
/// non-copy source.
#[tracing::instrument(skip(function))]
pub fn process_function(function: &mut Function) {
    let ids: Vec<_> = function.iter_live_insts().map(|(_, _, id)| id).collect();
    let count = ids.len();
    for id in ids {
        let mut data = function.inst(id).clone();
        data.map_inputs(&mut |v| ultimate_source(function, v));
        *function.inst_mut(id) = data;
    }
    tracing::trace!(visited = count, "copy elimination pass complete");
}
