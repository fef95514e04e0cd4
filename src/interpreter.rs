//! A reference interpreter: executable semantics for the IR, used as the
//! oracle the test suite compares pipeline stages against.
//!
//! Grounded on the original reference implementation's `Interpreter`/
//! `LiveValue`: drive execution one basic block at a time, tracking the
//! block last executed (for `phi`), a register map, and a byte-addressed
//! (here, integer-addressed) memory keyed by the ever-incrementing address
//! `alloca` hands out. A computing instruction's value is recorded as it
//! executes; an `inline`d instruction (FORM_EXPR) has no slot of its own in
//! any block, so its value is instead computed on demand, recursively, the
//! moment its sole consumer asks for it.
//!
//! One correction over the original: its `handle_select` returns the raw,
//! unresolved operand `Value` of whichever arm the condition picked, rather
//! than that operand's actual live value — every other handler returns a
//! `LiveValue`. This interpreter resolves the picked operand through
//! [`Interpreter::get_value`] like any other handler would, which is what a
//! caller reading `self.values[select_inst]` back out expects.

use std::collections::HashMap;

use crate::error::InterpError;
use crate::function::{BlockId, Function};
use crate::instruction::{InstId, Op};
use crate::register::Register;
use crate::types::{Context, TypeId};
use crate::value::{Value, ValuePayload};

fn mask(value: u128, width: u32) -> u128 {
    if width >= 128 {
        value
    } else {
        value & ((1u128 << width) - 1)
    }
}

fn sign_extend(value: u128, width: u32) -> i128 {
    if width >= 128 {
        return value as i128;
    }
    let sign_bit = 1u128 << (width - 1);
    if value & sign_bit != 0 {
        (value as i128) - (1i128 << width)
    } else {
        value as i128
    }
}

fn floor_div(a: i128, b: i128) -> i128 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn shl(value: u128, amount: u128) -> u128 {
    if amount >= 128 {
        0
    } else {
        value << (amount as u32)
    }
}

fn lshr(value: u128, amount: u128) -> u128 {
    if amount >= 128 {
        0
    } else {
        value >> (amount as u32)
    }
}

fn ashr(value: i128, amount: u128) -> i128 {
    if amount >= 128 {
        if value < 0 { -1 } else { 0 }
    } else {
        value >> (amount as u32)
    }
}

/// A value as it exists at a point during execution: an integer masked to
/// its type's width, or the absence of one (`undef`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveValue {
    pub ty: TypeId,
    value: Option<u128>,
}

impl LiveValue {
    pub fn defined(ctx: &Context, ty: TypeId, raw: u128) -> Self {
        let width = ctx.width_of(ty).unwrap_or(0);
        LiveValue { ty, value: Some(mask(raw, width)) }
    }

    pub fn undef(ty: TypeId) -> Self {
        LiveValue { ty, value: None }
    }

    pub fn is_undef(&self) -> bool {
        self.value.is_none()
    }

    pub fn as_unsigned(&self) -> Result<u128, InterpError> {
        self.value.ok_or(InterpError::UndefUse)
    }

    pub fn as_signed(&self, ctx: &Context) -> Result<i128, InterpError> {
        let raw = self.as_unsigned()?;
        let width = ctx.width_of(self.ty).unwrap_or(0);
        Ok(sign_extend(raw, width))
    }
}

/// Drives a single function to completion against an initial register map.
///
/// The register map is both input and output: [`Interpreter::run`] mutates
/// it in place with whatever values registers hold when the function
/// returns, mirroring "the register map is both an input ... and an output"
/// contract.
pub struct Interpreter<'a> {
    ctx: &'a Context,
    function: &'a Function,
    registers: &'a mut HashMap<Register, LiveValue>,
    memory: HashMap<u128, LiveValue>,
    next_addr: u128,
    values: HashMap<InstId, LiveValue>,
    last_bb: Option<BlockId>,
}

impl<'a> Interpreter<'a> {
    pub fn new(function: &'a Function, ctx: &'a Context, registers: &'a mut HashMap<Register, LiveValue>) -> Self {
        Interpreter {
            ctx,
            function,
            registers,
            memory: HashMap::new(),
            next_addr: 1,
            values: HashMap::new(),
            last_bb: None,
        }
    }

    fn get_value(&mut self, value: Value) -> Result<LiveValue, InterpError> {
        match value.payload {
            ValuePayload::Const(literal) => Ok(LiveValue::defined(self.ctx, value.ty, literal as u128)),
            ValuePayload::Inst(id) => {
                if let Some(live) = self.values.get(&id) {
                    return Ok(live.clone());
                }
                let op = self.function.inst(id).op.clone();
                self.eval_op(&op)
            }
        }
    }

    fn eval_op(&mut self, op: &Op) -> Result<LiveValue, InterpError> {
        tracing::trace!(?op, "evaluating");
        match op {
            Op::Phi { pairs } => {
                let last_bb = self.last_bb.ok_or(InterpError::PhiPredecessorMismatch)?;
                let matched = pairs.iter().find(|(block, _)| *block == last_bb).map(|(_, v)| *v);
                let value = matched.ok_or(InterpError::PhiPredecessorMismatch)?;
                self.get_value(value)
            }
            Op::Zext { dst_ty, value } => {
                let raw = self.get_value(*value)?.as_unsigned()?;
                Ok(LiveValue::defined(self.ctx, *dst_ty, raw))
            }
            Op::Sext { dst_ty, value } => {
                let signed = self.get_value(*value)?.as_signed(self.ctx)?;
                Ok(LiveValue::defined(self.ctx, *dst_ty, signed as u128))
            }
            Op::Trunc { dst_ty, value } | Op::Bitcast { dst_ty, value } => {
                let raw = self.get_value(*value)?.as_unsigned()?;
                Ok(LiveValue::defined(self.ctx, *dst_ty, raw))
            }
            Op::Add { lhs, rhs } => self.binary_unsigned(*lhs, *rhs, u128::wrapping_add),
            Op::Sub { lhs, rhs } => self.binary_unsigned(*lhs, *rhs, u128::wrapping_sub),
            Op::Mul { lhs, rhs } => self.binary_unsigned(*lhs, *rhs, u128::wrapping_mul),
            Op::SDiv { lhs, rhs } => {
                let ty = lhs.ty;
                let l = self.get_value(*lhs)?.as_signed(self.ctx)?;
                let r = self.get_value(*rhs)?.as_signed(self.ctx)?;
                if r == 0 {
                    return Err(InterpError::DivisionByZero);
                }
                Ok(LiveValue::defined(self.ctx, ty, floor_div(l, r) as u128))
            }
            Op::UDiv { lhs, rhs } => {
                let ty = lhs.ty;
                let l = self.get_value(*lhs)?.as_unsigned()?;
                let r = self.get_value(*rhs)?.as_unsigned()?;
                if r == 0 {
                    return Err(InterpError::DivisionByZero);
                }
                Ok(LiveValue::defined(self.ctx, ty, l / r))
            }
            Op::Lshl { lhs, rhs } => {
                let ty = lhs.ty;
                let l = self.get_value(*lhs)?.as_unsigned()?;
                let r = self.get_value(*rhs)?.as_unsigned()?;
                Ok(LiveValue::defined(self.ctx, ty, shl(l, r)))
            }
            Op::Lshr { lhs, rhs } => {
                let ty = lhs.ty;
                let l = self.get_value(*lhs)?.as_unsigned()?;
                let r = self.get_value(*rhs)?.as_unsigned()?;
                Ok(LiveValue::defined(self.ctx, ty, lshr(l, r)))
            }
            Op::Ashr { lhs, rhs } => {
                let ty = lhs.ty;
                let l = self.get_value(*lhs)?.as_signed(self.ctx)?;
                let r = self.get_value(*rhs)?.as_unsigned()?;
                Ok(LiveValue::defined(self.ctx, ty, ashr(l, r) as u128))
            }
            Op::And { lhs, rhs } => self.binary_unsigned(*lhs, *rhs, |a, b| a & b),
            Op::Or { lhs, rhs } => self.binary_unsigned(*lhs, *rhs, |a, b| a | b),
            Op::Xor { lhs, rhs } => self.binary_unsigned(*lhs, *rhs, |a, b| a ^ b),
            Op::Cat { .. } => Err(InterpError::Unsupported("cat")),
            Op::Eq { lhs, rhs } => self.compare_unsigned(*lhs, *rhs, |a, b| a == b),
            Op::Ne { lhs, rhs } => self.compare_unsigned(*lhs, *rhs, |a, b| a != b),
            Op::Ule { lhs, rhs } => self.compare_unsigned(*lhs, *rhs, |a, b| a <= b),
            Op::Ult { lhs, rhs } => self.compare_unsigned(*lhs, *rhs, |a, b| a < b),
            Op::Uge { lhs, rhs } => self.compare_unsigned(*lhs, *rhs, |a, b| a >= b),
            Op::Ugt { lhs, rhs } => self.compare_unsigned(*lhs, *rhs, |a, b| a > b),
            Op::Sle { lhs, rhs } => self.compare_signed(*lhs, *rhs, |a, b| a <= b),
            Op::Slt { lhs, rhs } => self.compare_signed(*lhs, *rhs, |a, b| a < b),
            Op::Sge { lhs, rhs } => self.compare_signed(*lhs, *rhs, |a, b| a >= b),
            Op::Sgt { lhs, rhs } => self.compare_signed(*lhs, *rhs, |a, b| a > b),
            Op::Load { ptr } => {
                let addr_value = self.get_value(*ptr)?;
                let addr = addr_value.as_unsigned()?;
                let pointee = self.ctx.pointee_of(ptr.ty);
                let slot = self.memory.get(&addr).ok_or(InterpError::UnallocatedLoad)?;
                if slot.ty != pointee {
                    return Err(InterpError::LoadTypeMismatch);
                }
                Ok(slot.clone())
            }
            Op::RLoad { reg } => Ok(self.registers.get(reg).cloned().unwrap_or_else(|| LiveValue::undef(reg.ty()))),
            Op::Alloca { stored_ty, ptr_ty } => {
                let addr = self.next_addr;
                self.next_addr += 1;
                self.memory.insert(addr, LiveValue::undef(*stored_ty));
                Ok(LiveValue::defined(self.ctx, *ptr_ty, addr))
            }
            Op::Select { cond, if_true, if_false } => {
                let picked = if self.get_value(*cond)?.as_unsigned()? != 0 { *if_true } else { *if_false };
                self.get_value(picked)
            }
            Op::Copy { value } => self.get_value(*value),
            Op::Store { .. } | Op::RStore { .. } => {
                unreachable!("store-family instructions have no result value")
            }
            Op::Jump { .. } | Op::Branch { .. } | Op::Ret { .. } | Op::Call { .. } | Op::Undef | Op::DummyPhiArgument { .. } => {
                Err(InterpError::Unsupported(op.mnemonic()))
            }
        }
    }

    fn binary_unsigned(&mut self, lhs: Value, rhs: Value, f: impl FnOnce(u128, u128) -> u128) -> Result<LiveValue, InterpError> {
        let ty = lhs.ty;
        let l = self.get_value(lhs)?.as_unsigned()?;
        let r = self.get_value(rhs)?.as_unsigned()?;
        Ok(LiveValue::defined(self.ctx, ty, f(l, r)))
    }

    fn compare_unsigned(&mut self, lhs: Value, rhs: Value, f: impl FnOnce(u128, u128) -> bool) -> Result<LiveValue, InterpError> {
        let l = self.get_value(lhs)?.as_unsigned()?;
        let r = self.get_value(rhs)?.as_unsigned()?;
        Ok(LiveValue::defined(self.ctx, self.ctx.bool_type, f(l, r) as u128))
    }

    fn compare_signed(&mut self, lhs: Value, rhs: Value, f: impl FnOnce(i128, i128) -> bool) -> Result<LiveValue, InterpError> {
        let l = self.get_value(lhs)?.as_signed(self.ctx)?;
        let r = self.get_value(rhs)?.as_signed(self.ctx)?;
        Ok(LiveValue::defined(self.ctx, self.ctx.bool_type, f(l, r) as u128))
    }

    fn exec_store(&mut self, ptr: Value, value: Value) -> Result<(), InterpError> {
        let addr_value = self.get_value(ptr)?;
        let addr = addr_value.as_unsigned()?;
        let pointee = self.ctx.pointee_of(ptr.ty);
        if !self.memory.get(&addr).is_some_and(|slot| slot.ty == pointee) {
            return Err(InterpError::InvalidStore);
        }
        let live = self.get_value(value)?;
        self.memory.insert(addr, live);
        Ok(())
    }

    /// Run the function to completion, returning its return value (`None`
    /// for a void-returning function).
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<Option<LiveValue>, InterpError> {
        let mut current_bb = Some(self.function.entry());
        let mut return_value = None;

        while let Some(bb) = current_bb {
            let mut next_bb = None;
            for &id in self.function.block(bb).insts() {
                let op = self.function.inst(id).op.clone();
                tracing::trace!(?id, mnemonic = op.mnemonic(), "executing");
                match &op {
                    Op::Jump { dest } => next_bb = Some(*dest),
                    Op::Branch { cond, if_true, if_false } => {
                        let taken = self.get_value(*cond)?.as_unsigned()? != 0;
                        next_bb = Some(if taken { *if_true } else { *if_false });
                    }
                    Op::Ret { value } => {
                        if let Some(v) = value {
                            return_value = Some(self.get_value(*v)?);
                        }
                    }
                    Op::Call { .. } => return Err(InterpError::Unsupported("call")),
                    Op::Undef => return Err(InterpError::Unsupported("undef")),
                    Op::Store { ptr, value } => self.exec_store(*ptr, *value)?,
                    Op::RStore { reg, value } => {
                        let live = self.get_value(*value)?;
                        self.registers.insert(reg.clone(), live);
                    }
                    _ => {
                        if self.function.inst(id).produces_value(self.ctx) {
                            let live = self.eval_op(&op)?;
                            self.values.insert(id, live);
                        }
                    }
                }
            }
            self.last_bb = Some(bb);
            current_bb = next_bb;
        }

        Ok(return_value)
    }
}

/// Run `function` against the given register map, returning its return
/// value. `registers` is mutated in place with whatever values registers
/// hold at the end of execution.
pub fn run(function: &Function, ctx: &Context, registers: &mut HashMap<Register, LiveValue>) -> Result<Option<LiveValue>, InterpError> {
    Interpreter::new(function, ctx, registers).run()
}
