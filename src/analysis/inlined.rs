//! The inlined-expression walk: given a root instruction, the set of
//! instructions consisting of the root plus, transitively, every computing
//! instruction flagged `inline` reachable through its input edges.
//!
//! In FORM_PURE every such walk is trivially `[root]` (nothing is inlined
//! yet). In FORM_EXPR this is how a pass or the renderer examines an
//! expression tree as a single atomic unit, since an inlined instruction is
//! no longer present in any block's live instruction list and is only
//! reachable this way.

use crate::function::Function;
use crate::instruction::InstId;

/// The root plus every `inline`-flagged instruction transitively reachable
/// through its inputs. The root itself is always first; order after that is
/// unspecified.
pub fn walk(function: &Function, root: InstId) -> Vec<InstId> {
    let mut out = vec![root];
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        for input in function.inst(id).inputs() {
            if let Some(producer) = input.producer() {
                if function.inst(producer).inline {
                    out.push(producer);
                    stack.push(producer);
                }
            }
        }
    }
    out
}
