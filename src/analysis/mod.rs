//! Derived, read-only views computed over a [`Function`](crate::function::Function):
//! predecessors (cached on the function itself), DFS spanning trees,
//! dominator trees, dominance frontiers, use maps, and the inlined-expression
//! walk. Every analysis here is a value object: computed on demand, never
//! mutated after it is returned, and invalidated by any subsequent pass that
//! mutates the function.

pub mod dominance;
pub mod dominance_frontiers;
pub mod inlined;
pub mod predecessors;
pub mod uses;

pub use dominance::{DfsTree, DominatorTree};
pub use dominance_frontiers::DominanceFrontiers;
pub use uses::UseMap;
