//! Integration tests covering the six named concrete scenarios plus a
//! property test exercising random small Builder-constructed programs for
//! interpreter equivalence across the full optimization pipeline.

use std::collections::HashMap;

use rstest::rstest;

use ssa_ir::builder::Builder;
use ssa_ir::function::Function;
use ssa_ir::instruction::InstData;
use ssa_ir::instruction::Op;
use ssa_ir::interpreter;
use ssa_ir::passes;
use ssa_ir::register::Register;
use ssa_ir::types::Context;

/// empty: `ret`. No registers read or written.
#[test]
fn empty_function_returns_nothing_and_touches_no_registers() {
    let ctx = Context::new(32);
    let mut f = Function::new(ctx.void_type, vec![]);
    let entry = f.entry();
    f.append_inst(entry, InstData::new(Op::Ret { value: None }));

    let mut regs = HashMap::new();
    let result = interpreter::run(&f, &ctx, &mut regs).unwrap();
    assert!(result.is_none());
    assert!(regs.is_empty());
}

/// simple_rstore: `rstore a, 42; ret`.
#[test]
fn simple_rstore_writes_the_constant_into_the_register() {
    let ctx = Context::new(32);
    let mut f = Function::new(ctx.void_type, vec![]);
    let entry = f.entry();
    let a = Register::atomic("a", ctx.i32_type);
    let mut bld = Builder::new(&mut f);
    bld.position_at_start(entry);
    let forty_two = ctx.const_int(ctx.i32_type, 42).unwrap();
    bld.build_rstore(a.clone(), forty_two).unwrap();
    bld.build_ret(&ctx, None).unwrap();
    drop(bld);

    let mut regs = HashMap::new();
    interpreter::run(&f, &ctx, &mut regs).unwrap();
    assert_eq!(regs[&a].as_unsigned().unwrap(), 42);
}

fn build_simple_phi(ctx: &Context, a: &Register, b: &Register, c: &Register, d: &Register) -> Function {
    let mut f = Function::new(ctx.void_type, vec![]);
    let entry = f.entry();
    let then_bb = f.create_block();
    let else_bb = f.create_block();
    let join = f.create_block();

    let mut bld = Builder::new(&mut f);
    bld.position_at_start(entry);
    let a_val = bld.build_rload(a.clone());
    let zero = ctx.const_int(ctx.i32_type, 0).unwrap();
    let cond = bld.build_ne(ctx, a_val, zero).unwrap();
    bld.build_branch(ctx, cond, then_bb, else_bb).unwrap();

    bld.position_at_start(then_bb);
    let b_val = bld.build_rload(b.clone());
    bld.build_jump(join);

    bld.position_at_start(else_bb);
    let c_val = bld.build_rload(c.clone());
    bld.build_jump(join);

    bld.position_at_start(join);
    let phi = bld.build_phi(vec![(then_bb, b_val), (else_bb, c_val)]).unwrap();
    bld.build_rstore(d.clone(), phi).unwrap();
    bld.build_ret(ctx, None).unwrap();
    drop(bld);
    f
}

/// simple_phi: branch on `rload a != 0`; true arm loads `b`, false arm loads
/// `c`; join with a phi stored into `d`. Interpreted both on the raw
/// function and on the result of the full optimization pipeline, since
/// SSA-construction and phi→select are exactly the passes this scenario is
/// meant to exercise.
#[rstest]
#[case(1, 1, 2, 1)]
#[case(0, 1, 2, 2)]
fn simple_phi_selects_the_value_from_the_taken_arm(
    #[case] a_init: i128,
    #[case] b_init: i128,
    #[case] c_init: i128,
    #[case] expected_d: u128,
) {
    let ctx = Context::new(32);
    let a = Register::atomic("a", ctx.i32_type);
    let b = Register::atomic("b", ctx.i32_type);
    let c = Register::atomic("c", ctx.i32_type);
    let d = Register::atomic("d", ctx.i32_type);

    let init_regs = || {
        let mut regs = HashMap::new();
        regs.insert(a.clone(), interpreter::LiveValue::defined(&ctx, ctx.i32_type, a_init as u128));
        regs.insert(b.clone(), interpreter::LiveValue::defined(&ctx, ctx.i32_type, b_init as u128));
        regs.insert(c.clone(), interpreter::LiveValue::defined(&ctx, ctx.i32_type, c_init as u128));
        regs
    };

    let f = build_simple_phi(&ctx, &a, &b, &c, &d);
    let mut regs = init_regs();
    interpreter::run(&f, &ctx, &mut regs).unwrap();
    assert_eq!(regs[&d].as_unsigned().unwrap(), expected_d);

    let mut optimized = build_simple_phi(&ctx, &a, &b, &c, &d);
    passes::run_pipeline(&mut optimized, &ctx).unwrap();
    let mut optimized_regs = init_regs();
    interpreter::run(&optimized, &ctx, &mut optimized_regs).unwrap();
    assert_eq!(optimized_regs[&d].as_unsigned().unwrap(), expected_d);
}

fn build_simple_loop(ctx: &Context, a: &Register, b: &Register, n: &Register) -> Function {
    let mut f = Function::new(ctx.void_type, vec![]);
    let entry = f.entry();
    let header_bb = f.create_block();
    let body_bb = f.create_block();
    let exit_bb = f.create_block();

    let mut bld = Builder::new(&mut f);
    bld.position_at_start(entry);
    let n0 = bld.build_rload(a.clone());
    bld.build_rstore(n.clone(), n0).unwrap();
    let one = ctx.const_int(ctx.i32_type, 1).unwrap();
    bld.build_rstore(b.clone(), one).unwrap();
    bld.build_jump(header_bb);

    // Checked before the body runs, so `n == 0` skips the loop entirely
    // instead of always executing the body once (a do-while shape would
    // compute the wrong result for `n == 0`).
    bld.position_at_start(header_bb);
    let n_cur = bld.build_rload(n.clone());
    let zero = ctx.const_int(ctx.i32_type, 0).unwrap();
    let done = bld.build_eq(ctx, n_cur, zero).unwrap();
    bld.build_branch(ctx, done, exit_bb, body_bb).unwrap();

    bld.position_at_start(body_bb);
    let n_cur2 = bld.build_rload(n.clone());
    let b_cur = bld.build_rload(b.clone());
    let doubled = bld.build_add(ctx, b_cur, b_cur).unwrap();
    bld.build_rstore(b.clone(), doubled).unwrap();
    let n_next = bld.build_sub(ctx, n_cur2, one).unwrap();
    bld.build_rstore(n.clone(), n_next).unwrap();
    bld.build_jump(header_bb);

    bld.position_at_start(exit_bb);
    bld.build_ret(ctx, None).unwrap();
    drop(bld);
    f
}

/// simple_loop: compute `2^n` where `n = rload a`, store to `b`. Interpreted
/// both raw and after the full pipeline, exercising SSA-construction's
/// back-edge phi placement end to end.
#[rstest]
#[case(0, 1)]
#[case(1, 2)]
#[case(2, 4)]
fn simple_loop_computes_a_power_of_two(#[case] n_init: i128, #[case] expected_b: u128) {
    let ctx = Context::new(32);
    let a = Register::atomic("a", ctx.i32_type);
    let b = Register::atomic("b", ctx.i32_type);
    let n = Register::atomic("n", ctx.i32_type);

    let init_regs = || {
        let mut regs = HashMap::new();
        regs.insert(a.clone(), interpreter::LiveValue::defined(&ctx, ctx.i32_type, n_init as u128));
        regs
    };

    let f = build_simple_loop(&ctx, &a, &b, &n);
    let mut regs = init_regs();
    interpreter::run(&f, &ctx, &mut regs).unwrap();
    assert_eq!(regs[&b].as_unsigned().unwrap(), expected_b);

    let mut optimized = build_simple_loop(&ctx, &a, &b, &n);
    passes::run_pipeline(&mut optimized, &ctx).unwrap();
    let mut optimized_regs = init_regs();
    interpreter::run(&optimized, &ctx, &mut optimized_regs).unwrap();
    assert_eq!(optimized_regs[&b].as_unsigned().unwrap(), expected_b);
}

fn build_alloca_in_loop(ctx: &mut Context, i_reg: &Register, b: &Register, c: &Register) -> Function {
    let i32_ty = ctx.i32_type;
    let mut f = Function::new(ctx.void_type, vec![]);
    let entry = f.entry();
    let loop_bb = f.create_block();
    let exit_bb = f.create_block();

    let mut bld = Builder::new(&mut f);
    bld.position_at_start(entry);
    let zero = ctx.const_int(i32_ty, 0).unwrap();
    bld.build_rstore(i_reg.clone(), zero).unwrap();
    bld.build_jump(loop_bb);
    drop(bld);

    let mut bld = Builder::new(&mut f);
    bld.position_at_start(loop_bb);
    let i = bld.build_rload(i_reg.clone());
    let ptr = bld.build_alloca(ctx, i32_ty);
    let zero_i32 = ctx.const_int(i32_ty, 0).unwrap();
    let first_iter = bld.build_eq(ctx, i, zero_i32).unwrap();
    // First iteration stores the fresh pointer into `b`, second into `c`.
    let store_b = f.create_block();
    let store_c = f.create_block();
    bld.build_branch(ctx, first_iter, store_b, store_c).unwrap();

    bld.position_at_start(store_b);
    bld.build_rstore(b.clone(), ptr).unwrap();
    let one = ctx.const_int(ctx.i32_type, 1).unwrap();
    let next_i = bld.build_add(ctx, i, one).unwrap();
    bld.build_rstore(i_reg.clone(), next_i).unwrap();
    bld.build_jump(loop_bb);

    bld.position_at_start(store_c);
    bld.build_rstore(c.clone(), ptr).unwrap();
    let two = ctx.const_int(ctx.i32_type, 2).unwrap();
    let two_check = bld.build_slt(ctx, i, two).unwrap();
    bld.build_branch(ctx, two_check, loop_bb, exit_bb).unwrap();

    bld.position_at_start(exit_bb);
    bld.build_ret(ctx, None).unwrap();
    drop(bld);
    f
}

/// alloca-in-loop: two iterations of an `alloca` inside a loop store
/// distinct pointer values into `b` and `c`. Interpreted both raw and after
/// the full pipeline: the same number of `alloca`s execute in the same
/// order either way, so the two runs must agree address-for-address, not
/// merely on `b != c` independently in each run.
#[test]
fn alloca_in_loop_yields_a_fresh_address_each_iteration() {
    let mut ctx = Context::new(32);
    let i_reg = Register::atomic("i", ctx.i32_type);
    let b = Register::atomic("b", ctx.pointer_type(ctx.i32_type));
    let c = Register::atomic("c", ctx.pointer_type(ctx.i32_type));

    let f = build_alloca_in_loop(&mut ctx, &i_reg, &b, &c);
    let mut regs = HashMap::new();
    interpreter::run(&f, &ctx, &mut regs).unwrap();
    assert_ne!(regs[&b].as_unsigned().unwrap(), regs[&c].as_unsigned().unwrap());

    let mut optimized = build_alloca_in_loop(&mut ctx, &i_reg, &b, &c);
    passes::run_pipeline(&mut optimized, &ctx).unwrap();
    let mut optimized_regs = HashMap::new();
    interpreter::run(&optimized, &ctx, &mut optimized_regs).unwrap();
    assert_ne!(optimized_regs[&b].as_unsigned().unwrap(), optimized_regs[&c].as_unsigned().unwrap());
    assert_eq!(optimized_regs[&b].as_unsigned().unwrap(), regs[&b].as_unsigned().unwrap());
    assert_eq!(optimized_regs[&c].as_unsigned().unwrap(), regs[&c].as_unsigned().unwrap());
}

fn build_merge_sequence_3(ctx: &Context, a: &Register, b: &Register) -> Function {
    let mut f = Function::new(ctx.void_type, vec![]);
    let entry = f.entry();
    let mid = f.create_block();
    let tail = f.create_block();

    let mut bld = Builder::new(&mut f);
    bld.position_at_start(entry);
    let a_val = bld.build_rload(a.clone());
    bld.build_jump(mid);

    bld.position_at_start(mid);
    let one = ctx.const_int(ctx.i32_type, 1).unwrap();
    let sum = bld.build_add(ctx, a_val, one).unwrap();
    bld.build_jump(tail);

    bld.position_at_start(tail);
    bld.build_rstore(b.clone(), sum).unwrap();
    bld.build_ret(ctx, None).unwrap();
    drop(bld);
    f
}

/// merge-sequence-3: three chained blocks each doing part of `b = a + 1`.
/// After `merge_sequences` alone the function has exactly one block and
/// still computes the same result; after the full pipeline it must still
/// agree with the unoptimized interpretation.
#[test]
fn merge_sequence_of_three_blocks_collapses_to_one_and_keeps_its_semantics() {
    let ctx = Context::new(32);
    let a = Register::atomic("a", ctx.i32_type);
    let b = Register::atomic("b", ctx.i32_type);

    let raw = build_merge_sequence_3(&ctx, &a, &b);
    let mut raw_regs = HashMap::new();
    raw_regs.insert(a.clone(), interpreter::LiveValue::defined(&ctx, ctx.i32_type, 1));
    interpreter::run(&raw, &ctx, &mut raw_regs).unwrap();
    assert_eq!(raw_regs[&a].as_unsigned().unwrap(), 1);
    assert_eq!(raw_regs[&b].as_unsigned().unwrap(), 2);

    let mut merged = build_merge_sequence_3(&ctx, &a, &b);
    passes::merge_sequences::process_function(&mut merged);
    assert_eq!(merged.blocks_in_order().len(), 1);
    let mut merged_regs = HashMap::new();
    merged_regs.insert(a.clone(), interpreter::LiveValue::defined(&ctx, ctx.i32_type, 1));
    interpreter::run(&merged, &ctx, &mut merged_regs).unwrap();
    assert_eq!(merged_regs[&a].as_unsigned().unwrap(), 1);
    assert_eq!(merged_regs[&b].as_unsigned().unwrap(), 2);

    let mut optimized = build_merge_sequence_3(&ctx, &a, &b);
    passes::run_pipeline(&mut optimized, &ctx).unwrap();
    let mut optimized_regs = HashMap::new();
    optimized_regs.insert(a.clone(), interpreter::LiveValue::defined(&ctx, ctx.i32_type, 1));
    interpreter::run(&optimized, &ctx, &mut optimized_regs).unwrap();
    assert_eq!(optimized_regs[&a].as_unsigned().unwrap(), 1);
    assert_eq!(optimized_regs[&b].as_unsigned().unwrap(), 2);
}

/// Random statements over three shared registers `r0..r2`. `IfElseStore` and
/// `BoundedLoopAdd` each introduce real control flow (a branch/join diamond,
/// or a back-edge loop with a header ϕ) so the generated programs exercise
/// SSA-construction's phi placement, phi→select, strip-unused-branches and
/// merge-basic-block-sequences end to end, not just straight-line code.
#[derive(Debug, Clone, Copy)]
enum RandomOp {
    StoreConst { reg: usize, literal: i32 },
    AddRegs { lhs: usize, rhs: usize, dest: usize },
    IfElseStore { cond_reg: usize, dest: usize, then_literal: i32, else_literal: i32 },
    BoundedLoopAdd { dest: usize, trip_count: u32, step: i32 },
}

/// Builds a single function out of `ops`, threading a "current block"
/// cursor through statements that branch or loop. Every construct that
/// opens new blocks rejoins into a single successor block before the next
/// op is appended, so the ops remain a flat sequence regardless of how much
/// internal control flow each one contributes.
fn build_from_ops(ctx: &Context, regs: &[Register; 3], ops: &[RandomOp]) -> Function {
    let mut f = Function::new(ctx.void_type, vec![]);
    let entry = f.entry();
    let mut current = entry;
    let mut loop_seq = 0usize;

    for op in ops {
        match *op {
            RandomOp::StoreConst { reg, literal } => {
                let mut bld = Builder::new(&mut f);
                bld.position_at_end(current);
                let c = ctx.const_int(ctx.i32_type, literal as i128).unwrap();
                bld.build_rstore(regs[reg].clone(), c).unwrap();
            }
            RandomOp::AddRegs { lhs, rhs, dest } => {
                let mut bld = Builder::new(&mut f);
                bld.position_at_end(current);
                let l = bld.build_rload(regs[lhs].clone());
                let r = bld.build_rload(regs[rhs].clone());
                let sum = bld.build_add(ctx, l, r).unwrap();
                bld.build_rstore(regs[dest].clone(), sum).unwrap();
            }
            RandomOp::IfElseStore { cond_reg, dest, then_literal, else_literal } => {
                let then_bb = f.create_block();
                let else_bb = f.create_block();
                let join_bb = f.create_block();

                let mut bld = Builder::new(&mut f);
                bld.position_at_end(current);
                let cond_val = bld.build_rload(regs[cond_reg].clone());
                let zero = ctx.const_int(ctx.i32_type, 0).unwrap();
                let cond = bld.build_ne(ctx, cond_val, zero).unwrap();
                bld.build_branch(ctx, cond, then_bb, else_bb).unwrap();
                drop(bld);

                let mut bld = Builder::new(&mut f);
                bld.position_at_start(then_bb);
                let then_val = ctx.const_int(ctx.i32_type, then_literal as i128).unwrap();
                bld.build_rstore(regs[dest].clone(), then_val).unwrap();
                bld.build_jump(join_bb);
                drop(bld);

                let mut bld = Builder::new(&mut f);
                bld.position_at_start(else_bb);
                let else_val = ctx.const_int(ctx.i32_type, else_literal as i128).unwrap();
                bld.build_rstore(regs[dest].clone(), else_val).unwrap();
                bld.build_jump(join_bb);
                drop(bld);

                current = join_bb;
            }
            RandomOp::BoundedLoopAdd { dest, trip_count, step } => {
                // A dedicated counter register, private to this loop, so
                // distinct `BoundedLoopAdd` ops in the same program don't
                // alias each other's trip counts.
                let counter = Register::atomic(&format!("loopctr{}", loop_seq), ctx.i32_type);
                loop_seq += 1;
                let header_bb = f.create_block();
                let body_bb = f.create_block();
                let exit_bb = f.create_block();

                let mut bld = Builder::new(&mut f);
                bld.position_at_end(current);
                let n0 = ctx.const_int(ctx.i32_type, trip_count as i128).unwrap();
                bld.build_rstore(counter.clone(), n0).unwrap();
                bld.build_jump(header_bb);
                drop(bld);

                let mut bld = Builder::new(&mut f);
                bld.position_at_start(header_bb);
                let n_cur = bld.build_rload(counter.clone());
                let zero = ctx.const_int(ctx.i32_type, 0).unwrap();
                let done = bld.build_eq(ctx, n_cur, zero).unwrap();
                bld.build_branch(ctx, done, exit_bb, body_bb).unwrap();
                drop(bld);

                let mut bld = Builder::new(&mut f);
                bld.position_at_start(body_bb);
                let n_cur2 = bld.build_rload(counter.clone());
                let dest_cur = bld.build_rload(regs[dest].clone());
                let step_val = ctx.const_int(ctx.i32_type, step as i128).unwrap();
                let updated = bld.build_add(ctx, dest_cur, step_val).unwrap();
                bld.build_rstore(regs[dest].clone(), updated).unwrap();
                let one = ctx.const_int(ctx.i32_type, 1).unwrap();
                let n_next = bld.build_sub(ctx, n_cur2, one).unwrap();
                bld.build_rstore(counter.clone(), n_next).unwrap();
                bld.build_jump(header_bb);
                drop(bld);

                current = exit_bb;
            }
        }
    }

    let mut bld = Builder::new(&mut f);
    bld.position_at_end(current);
    bld.build_ret(ctx, None).unwrap();
    drop(bld);
    f
}

proptest::proptest! {
    /// Running the full pass pipeline over a randomly generated, possibly
    /// branching and looping register-traffic program must not change the
    /// register values observed after execution: every pass is a
    /// semantics-preserving rewrite, including on multi-block CFGs with
    /// joins and back-edges, not just straight-line code.
    #[test]
    fn pipeline_preserves_register_observable_semantics(
        ops in proptest::collection::vec(
            proptest::prop_oneof![
                (0usize..3, -50i32..50).prop_map(|(reg, literal)| RandomOp::StoreConst { reg, literal }),
                (0usize..3, 0usize..3, 0usize..3).prop_map(|(lhs, rhs, dest)| RandomOp::AddRegs { lhs, rhs, dest }),
                (0usize..3, 0usize..3, -20i32..20, -20i32..20).prop_map(|(cond_reg, dest, then_literal, else_literal)| {
                    RandomOp::IfElseStore { cond_reg, dest, then_literal, else_literal }
                }),
                (0usize..3, 0u32..4, -10i32..10).prop_map(|(dest, trip_count, step)| {
                    RandomOp::BoundedLoopAdd { dest, trip_count, step }
                }),
            ],
            1..8,
        )
    ) {
        let ctx = Context::new(32);
        let regs = [
            Register::atomic("r0", ctx.i32_type),
            Register::atomic("r1", ctx.i32_type),
            Register::atomic("r2", ctx.i32_type),
        ];
        // Registers model architectural storage that always holds some
        // value; seed all three defined so an `AddRegs`/`IfElseStore` that
        // reads before any `StoreConst` targeting that register doesn't hit
        // the interpreter's (intentional) undef-use error.
        let init_regs = || {
            let mut m = HashMap::new();
            for reg in &regs {
                m.insert(reg.clone(), interpreter::LiveValue::defined(&ctx, ctx.i32_type, 0));
            }
            m
        };

        let before_fn = build_from_ops(&ctx, &regs, &ops);
        let mut before_regs = init_regs();
        interpreter::run(&before_fn, &ctx, &mut before_regs).unwrap();

        let mut after_fn = build_from_ops(&ctx, &regs, &ops);
        passes::run_pipeline(&mut after_fn, &ctx).unwrap();
        let mut after_regs = init_regs();
        interpreter::run(&after_fn, &ctx, &mut after_regs).unwrap();

        for reg in &regs {
            let before = before_regs.get(reg).map(|v| v.as_unsigned().ok()).flatten();
            let after = after_regs.get(reg).map(|v| v.as_unsigned().ok()).flatten();
            prop_assert_eq!(before, after);
        }
    }
}
