//! DFS spanning trees and dominator trees.
//!
//! The dominator tree is computed with the "simple" (no union-by-rank)
//! Lengauer–Tarjan formulation, per Appel's *Modern Compiler Implementation*
//! algorithms 19.9/19.10: a DFS numbering and spanning tree, a semidominator
//! pass walking DFS-reverse order with path-compressing `eval`/`link` over an
//! ancestor forest, and a final pass resolving semidominators into true
//! immediate dominators. Ties between candidate semidominators are broken by
//! DFS number, which falls out of the algorithm directly (it always keeps
//! the candidate with the smaller DFS-numbered semidominator).

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::function::{BlockId, Function};

use super::predecessors;

/// A depth-first pre-order spanning tree over a function's reachable
/// blocks, rooted at the entry.
pub struct DfsTree {
    preorder: Vec<BlockId>,
    dfnum: IndexMap<BlockId, u32>,
    parent: IndexMap<BlockId, BlockId>,
}

impl DfsTree {
    pub fn compute(function: &Function) -> Self {
        let entry = function.entry();
        let mut preorder = Vec::new();
        let mut dfnum = IndexMap::new();
        let mut parent = IndexMap::new();
        let mut visited = HashSet::new();
        let mut work = vec![(entry, None)];
        while let Some((block, via)) = work.pop() {
            if visited.contains(&block) {
                continue;
            }
            visited.insert(block);
            dfnum.insert(block, preorder.len() as u32 + 1);
            preorder.push(block);
            if let Some(p) = via {
                parent.insert(block, p);
            }
            for succ in function.successors(block, false).into_iter().rev() {
                if !visited.contains(&succ) {
                    work.push((succ, Some(block)));
                }
            }
        }
        DfsTree { preorder, dfnum, parent }
    }

    /// Blocks in DFS pre-order; `preorder()[0]` is always the entry.
    pub fn preorder(&self) -> &[BlockId] {
        &self.preorder
    }

    pub fn dfnum(&self, block: BlockId) -> Option<u32> {
        self.dfnum.get(&block).copied()
    }

    pub fn parent_in_tree(&self, block: BlockId) -> Option<BlockId> {
        self.parent.get(&block).copied()
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.dfnum.contains_key(&block)
    }
}

/// A function's dominator tree: edges run from immediate dominator to
/// dominated block, rooted at the entry (whose immediate dominator is
/// undefined). Blocks unreachable from the entry never appear.
pub struct DominatorTree {
    root: BlockId,
    idom: IndexMap<BlockId, BlockId>,
    children: IndexMap<BlockId, Vec<BlockId>>,
}

impl DominatorTree {
    pub fn compute(function: &Function) -> Self {
        let dfs = DfsTree::compute(function);
        let n = dfs.preorder.len();
        let vertex = dfs.preorder.clone();
        let dfnum_of = |b: BlockId| dfs.dfnum(b).expect("block unreachable from entry");
        let preds_all = predecessors::compute(function, false);

        let mut semi: Vec<u32> = (0..=n as u32).collect();
        let mut label: Vec<u32> = (0..=n as u32).collect();
        let mut ancestor: Vec<Option<usize>> = vec![None; n + 1];
        let mut idom_i: Vec<usize> = vec![0; n + 1];
        let mut bucket: Vec<Vec<usize>> = vec![Vec::new(); n + 1];

        let mut parent_i = vec![0usize; n + 1];
        for i in 1..=n {
            if let Some(p) = dfs.parent_in_tree(vertex[i - 1]) {
                parent_i[i] = dfnum_of(p) as usize;
            }
        }

        fn compress(v: usize, ancestor: &mut [Option<usize>], label: &mut [u32], semi: &[u32]) {
            if let Some(a) = ancestor[v] {
                if ancestor[a].is_some() {
                    compress(a, ancestor, label, semi);
                    if semi[label[a] as usize] < semi[label[v] as usize] {
                        label[v] = label[a];
                    }
                    ancestor[v] = ancestor[a];
                }
            }
        }

        fn eval(v: usize, ancestor: &mut [Option<usize>], label: &mut [u32], semi: &[u32]) -> usize {
            if ancestor[v].is_none() {
                v
            } else {
                compress(v, ancestor, label, semi);
                label[v] as usize
            }
        }

        for i in (2..=n).rev() {
            let block = vertex[i - 1];
            for pred in preds_all.get(&block).into_iter().flatten() {
                if !dfs.is_reachable(*pred) {
                    continue;
                }
                let p_i = dfnum_of(*pred) as usize;
                let u = eval(p_i, &mut ancestor, &mut label, &semi);
                if semi[u] < semi[i] {
                    semi[i] = semi[u];
                }
            }
            bucket[semi[i] as usize].push(i);
            ancestor[i] = Some(parent_i[i]);
            let p = parent_i[i];
            let bucketed = std::mem::take(&mut bucket[p]);
            for v in bucketed {
                let u = eval(v, &mut ancestor, &mut label, &semi);
                idom_i[v] = if semi[u] < semi[v] { u } else { p };
            }
        }
        for i in 2..=n {
            if idom_i[i] != semi[i] as usize {
                idom_i[i] = idom_i[idom_i[i]];
            }
        }

        let mut idom = IndexMap::new();
        let mut children: IndexMap<BlockId, Vec<BlockId>> = IndexMap::new();
        for &b in &vertex {
            children.insert(b, Vec::new());
        }
        for i in 2..=n {
            let block = vertex[i - 1];
            let idom_block = vertex[idom_i[i] - 1];
            idom.insert(block, idom_block);
            children.entry(idom_block).or_default().push(block);
        }

        DominatorTree { root: function.entry(), idom, children }
    }

    pub fn root(&self) -> BlockId {
        self.root
    }

    /// `None` for the root; otherwise the block's immediate dominator.
    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        self.idom.get(&block).copied()
    }

    pub fn children(&self, block: BlockId) -> &[BlockId] {
        self.children.get(&block).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Every block reachable from the entry, i.e. every block in the tree.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.children.keys().copied()
    }

    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let mut cur = b;
        while let Some(id) = self.idom(cur) {
            if id == a {
                return true;
            }
            cur = id;
        }
        false
    }

    pub fn strictly_dominates(&self, a: BlockId, b: BlockId) -> bool {
        a != b && self.dominates(a, b)
    }
}
