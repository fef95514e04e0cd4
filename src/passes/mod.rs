//! Optimization passes, run in the fixed sequence the reference pipeline
//! uses: SSA construction, then copy elimination, dead-code elimination,
//! phi-to-select, to-expr, strip-unused-branches, merge-basic-block-sequences,
//! and a final to-expr to absorb whatever the last two passes exposed.

pub mod copy_elim;
pub mod dce;
pub mod merge_sequences;
pub mod phi_to_select;
pub mod ssa_construction;
pub mod strip_unused_branches;
pub mod to_expr;

use crate::error::IrError;
use crate::function::Function;
use crate::types::Context;

/// Run the full, fixed optimization pipeline over `function`:
/// SSA construction, copy elimination, dead-code elimination, phi-to-select,
/// to-expr, strip-unused-branches, merge-basic-block-sequences, and a final
/// to-expr pass.
#[tracing::instrument(skip(function, ctx))]
pub fn run_pipeline(function: &mut Function, ctx: &Context) -> Result<(), IrError> {
    ssa_construction::run(function);
    copy_elim::process_function(function);
    dce::process_function(function, ctx);
    phi_to_select::process_function(function)?;
    to_expr::process_function(function);
    strip_unused_branches::process_function(function);
    merge_sequences::process_function(function);
    to_expr::process_function(function);
    Ok(())
}
