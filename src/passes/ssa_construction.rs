//! Register-lifting SSA construction: eliminates `rload`/`rstore` traffic by
//! ϕ-insertion over dominance frontiers followed by dominator-tree renaming.
//!
//! Grounded directly on the original reference implementation's
//! `registers_to_ssa` pass, translated from its mutable-object/worklist
//! style into an arena-addressed, borrow-checker-friendly version: the same
//! five steps (store-site collection, synthetic seeding entry, iterated
//! dominance frontier ϕ placement with `DummyPhiArgument` sentinels,
//! dominator-tree DFS renaming with per-register definition stacks, and
//! register-barrier store/reload bracketing) in the same order.

use std::collections::HashMap;

use crate::analysis::dominance::DominatorTree;
use crate::analysis::dominance_frontiers::DominanceFrontiers;
use crate::function::{BlockId, Function};
use crate::instruction::{InstData, InstId, Op};
use crate::register::Register;
use crate::value::Value;

fn collect_registers(function: &Function) -> Vec<Register> {
    let mut out: Vec<Register> = Vec::new();
    for &block in function.blocks_in_order() {
        for &inst_id in function.block(block).insts() {
            let reg = match &function.inst(inst_id).op {
                Op::RLoad { reg } => Some(reg),
                Op::RStore { reg, .. } => Some(reg),
                _ => None,
            };
            if let Some(reg) = reg {
                if !out.iter().any(|r| r == reg) {
                    out.push(reg.clone());
                }
            }
        }
    }
    out
}

/// Eliminate every `rload`/`rstore` in `function`, replacing per-register
/// load/store traffic with SSA values and ϕ-nodes. A function with no
/// register traffic is left untouched.
pub fn run(function: &mut Function) {
    let registers = collect_registers(function);
    if registers.is_empty() {
        return;
    }

    // Step 1: store sites, including every register-barrier block for every
    // register (a barrier may opaquely write any register).
    let mut store_sites: HashMap<Register, indexmap::IndexSet<BlockId>> =
        registers.iter().map(|r| (r.clone(), indexmap::IndexSet::new())).collect();
    for &block in function.blocks_in_order() {
        let mut has_barrier = false;
        for &inst_id in function.block(block).insts() {
            match &function.inst(inst_id).op {
                Op::RStore { reg, .. } => {
                    store_sites.get_mut(reg).unwrap().insert(block);
                }
                op if op.is_register_barrier() => has_barrier = true,
                _ => {}
            }
        }
        if has_barrier {
            for r in &registers {
                store_sites.get_mut(r).unwrap().insert(block);
            }
        }
    }

    // Step 2: synthetic entry seeding every register with an `rload`,
    // falling through to the former entry.
    let old_entry = function.entry();
    let new_entry = function.create_entry_block();
    for r in &registers {
        function.append_inst(new_entry, InstData::new(Op::RLoad { reg: r.clone() }));
    }
    function.append_inst(new_entry, InstData::new(Op::Jump { dest: old_entry }));
    for r in &registers {
        store_sites.get_mut(r).unwrap().insert(new_entry);
    }

    // Step 3: dominance over the rebuilt CFG.
    let dom = DominatorTree::compute(function);
    let df = DominanceFrontiers::compute(function, &dom);

    // Step 4: ϕ placement over the iterated dominance frontier of each
    // register's store sites, seeded with `DummyPhiArgument` sentinels.
    for r in &registers {
        let idf = df.iterated(store_sites[r].iter().copied());
        for block in idf {
            let preds: Vec<BlockId> = function.block(block).predecessors().iter().copied().collect();
            let mut pairs = Vec::with_capacity(preds.len());
            for pred in preds {
                let dummy = function.alloc_floating_inst(InstData::new(Op::DummyPhiArgument { register: r.clone() }));
                pairs.push((pred, Value::from_inst(r.ty(), dummy)));
            }
            function.insert_inst_at(block, 0, InstData::new(Op::Phi { pairs }));
        }
    }

    // Step 5: dominator-tree DFS renaming from the synthetic entry.
    let mut stacks: HashMap<Register, Vec<Value>> = registers.iter().map(|r| (r.clone(), Vec::new())).collect();
    rename(function, &dom, new_entry, &mut stacks, &registers, true);

    debug_assert!(no_dummy_arguments_remain(function), "SSA construction left an unresolved DummyPhiArgument sentinel");
}

fn rename(
    function: &mut Function,
    dom: &DominatorTree,
    block: BlockId,
    stacks: &mut HashMap<Register, Vec<Value>>,
    registers: &[Register],
    is_synthetic_entry: bool,
) {
    let mut pushed: Vec<Register> = Vec::new();

    if is_synthetic_entry {
        // The synthetic entry's `rload`s are the roots of every definition
        // chain and are not themselves rewritten.
        for &inst_id in function.block(block).insts().to_vec().iter() {
            if let Op::RLoad { reg } = function.inst(inst_id).op.clone() {
                let value = Value::from_inst(reg.ty(), inst_id);
                stacks.get_mut(&reg).unwrap().push(value);
                pushed.push(reg);
            }
        }
    } else {
        let mut i = 0;
        while i < function.block(block).len() {
            let inst_id = function.block(block).insts()[i];
            let op = function.inst(inst_id).op.clone();
            match op {
                Op::RLoad { reg } => {
                    let top = *stacks[&reg].last().expect("register read with no reaching definition");
                    let origin = function.inst(inst_id).origin.clone();
                    let new_id = function.replace_inst_at(block, i, InstData::with_origin(Op::Copy { value: top }, origin));
                    let old_value = Value::from_inst(reg.ty(), inst_id);
                    let new_value = Value::from_inst(reg.ty(), new_id);
                    function.replace_value(old_value, new_value);
                    i += 1;
                }
                Op::RStore { reg, value } => {
                    function.remove_inst_at(block, i);
                    stacks.get_mut(&reg).unwrap().push(value);
                    pushed.push(reg);
                }
                ref op if op.is_register_barrier() => {
                    let mut insert_at = i;
                    for r in registers {
                        let top = *stacks[r].last().expect("register barrier reached with no reaching definition");
                        function.insert_inst_at(block, insert_at, InstData::new(Op::RStore { reg: r.clone(), value: top }));
                        insert_at += 1;
                    }
                    i = insert_at + 1;
                    let may_return = !matches!(op, Op::Ret { .. } | Op::Undef);
                    if may_return {
                        for r in registers {
                            let rload_id = function.insert_inst_at(block, i, InstData::new(Op::RLoad { reg: r.clone() }));
                            let value = Value::from_inst(r.ty(), rload_id);
                            stacks.get_mut(r).unwrap().push(value);
                            pushed.push(r.clone());
                            i += 1;
                        }
                    }
                }
                _ => i += 1,
            }
        }
    }

    for succ in function.successors(block, false) {
        resolve_phi_operands(function, succ, block, stacks);
    }

    for &child in dom.children(block).to_vec().iter() {
        rename(function, dom, child, stacks, registers, false);
    }

    for r in pushed.iter().rev() {
        stacks.get_mut(r).unwrap().pop();
    }
}

fn resolve_phi_operands(function: &mut Function, succ: BlockId, from: BlockId, stacks: &HashMap<Register, Vec<Value>>) {
    for inst_id in function.block(succ).insts().to_vec() {
        let pairs = match &function.inst(inst_id).op {
            Op::Phi { pairs } => pairs.clone(),
            _ => continue,
        };
        let mut resolutions: Vec<(usize, Value)> = Vec::new();
        for (idx, (pred, value)) in pairs.iter().enumerate() {
            if *pred != from {
                continue;
            }
            if let Some(producer) = value.producer() {
                if let Op::DummyPhiArgument { register } = &function.inst(producer).op {
                    let top = *stacks[register].last().expect("phi predecessor reached with no reaching definition");
                    resolutions.push((idx, top));
                }
            }
        }
        if !resolutions.is_empty() {
            if let Op::Phi { pairs } = &mut function.inst_mut(inst_id).op {
                for (idx, value) in resolutions {
                    pairs[idx].1 = value;
                }
            }
        }
    }
}

fn no_dummy_arguments_remain(function: &Function) -> bool {
    for (_, _, inst_id) in function.iter_live_insts() {
        if let Op::Phi { pairs } = &function.inst(inst_id).op {
            for (_, value) in pairs {
                if let Some(producer) = value.producer() {
                    if matches!(function.inst(producer).op, Op::DummyPhiArgument { .. }) {
                        return false;
                    }
                }
            }
        }
    }
    true
}
