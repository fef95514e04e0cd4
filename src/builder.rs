//! A cursor-based instruction builder.
//!
//! `Builder<'f>` holds a `&mut Function` and a `(block, index)` cursor (plus
//! a rolling "current origin" annotation), and exposes one `build_<kind>`
//! method per instruction kind. Each validates its operand types eagerly,
//! inserts the instruction at the cursor, advances the cursor, and returns
//! the instruction's value (or nothing, for void-typed kinds).
//!
//! The original reference implementation's builder holds an implicit
//! `self.basic_block.function` back-reference — workable for an
//! untyped-at-the-border Python object graph, but not under Rust's borrow
//! checker. Here the function is held explicitly and the cursor only stores
//! ids into it, the same shape cranelift-frontend's `FunctionBuilder` uses
//! for the same reason.

use crate::error::IrError;
use crate::function::{BlockId, Function};
use crate::instruction::{InstData, Op, Origin};
use crate::register::Register;
use crate::types::Context;
use crate::value::Value;

/// A saved cursor position, returned by [`Builder::position`] and restored
/// by [`Builder::set_position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub block: BlockId,
    pub index: usize,
}

pub struct Builder<'f> {
    function: &'f mut Function,
    position: Option<Position>,
    current_origin: Option<Origin>,
}

impl<'f> Builder<'f> {
    pub fn new(function: &'f mut Function) -> Self {
        Builder { function, position: None, current_origin: None }
    }

    pub fn function(&self) -> &Function {
        self.function
    }

    pub fn function_mut(&mut self) -> &mut Function {
        self.function
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = Some(position);
    }

    pub fn position_at_entry(&mut self) {
        let entry = self.function.entry();
        self.position = Some(Position { block: entry, index: 0 });
    }

    pub fn position_at_start(&mut self, block: BlockId) {
        self.position = Some(Position { block, index: 0 });
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        let index = self.function.block(block).len();
        self.position = Some(Position { block, index });
    }

    pub fn set_origin(&mut self, origin: Option<Origin>) {
        self.current_origin = origin;
    }

    pub fn create_basic_block(&mut self) -> BlockId {
        self.function.create_block()
    }

    fn insert(&mut self, op: Op) -> crate::instruction::InstId {
        let pos = self.position.expect("builder position not set");
        let data = InstData::with_origin(op, self.current_origin.clone());
        let id = self.function.insert_inst_at(pos.block, pos.index, data);
        self.position = Some(Position { block: pos.block, index: pos.index + 1 });
        id
    }

    fn insert_value(&mut self, ctx: &Context, op: Op) -> Value {
        let ty = op.result_type(ctx);
        let id = self.insert(op);
        Value::from_inst(ty, id)
    }

    // --- Control-flow: terminators and call ---

    pub fn build_jump(&mut self, dest: BlockId) {
        self.insert(Op::Jump { dest });
    }

    pub fn build_branch(&mut self, ctx: &Context, cond: Value, if_true: BlockId, if_false: BlockId) -> Result<(), IrError> {
        if cond.ty != ctx.bool_type {
            return Err(IrError::ConditionNotBoolean);
        }
        self.insert(Op::Branch { cond, if_true, if_false });
        Ok(())
    }

    pub fn build_call(&mut self, ctx: &Context, callee: Value, args: Vec<Value>) -> Result<Option<Value>, IrError> {
        if !ctx.is_function(callee.ty) {
            return Err(IrError::NotCallable);
        }
        let expected_args = ctx.arg_types_of(callee.ty);
        if expected_args.len() != args.len() || expected_args.iter().zip(&args).any(|(t, v)| *t != v.ty) {
            return Err(IrError::CallSignatureMismatch);
        }
        let ret_ty = ctx.return_type_of(callee.ty);
        let value = self.insert_value(ctx, Op::Call { callee, args });
        Ok(if ctx.is_void(ret_ty) { None } else { Some(value) })
    }

    pub fn build_ret(&mut self, ctx: &Context, value: Option<Value>) -> Result<(), IrError> {
        match (ctx.is_void(self.function.return_type), value) {
            (true, None) => {}
            (false, Some(v)) if v.ty == self.function.return_type => {}
            _ => return Err(IrError::ReturnTypeMismatch),
        }
        self.insert(Op::Ret { value });
        Ok(())
    }

    // --- phi ---

    pub fn build_phi(&mut self, pairs: Vec<(BlockId, Value)>) -> Result<Value, IrError> {
        if pairs.is_empty() {
            return Err(IrError::EmptyPhi);
        }
        let ty = pairs[0].1.ty;
        let mut seen = std::collections::HashSet::new();
        for (block, value) in &pairs {
            if !seen.insert(*block) {
                return Err(IrError::DuplicatePhiPredecessor);
            }
            if value.ty != ty {
                return Err(IrError::TypeMismatch { expected: ty, found: value.ty });
            }
        }
        let id = self.insert(Op::Phi { pairs });
        Ok(Value::from_inst(ty, id))
    }

    // --- Conversions ---

    fn check_conversion_widths(ctx: &Context, dst_ty: crate::types::TypeId, value: Value, widening: bool) -> Result<(), IrError> {
        if !ctx.is_int(dst_ty) || !ctx.is_int(value.ty) {
            return Err(IrError::NotAnIntegerType);
        }
        let src = ctx.width_of(value.ty).unwrap();
        let dst = ctx.width_of(dst_ty).unwrap();
        if widening {
            if dst < src {
                return Err(IrError::WideningRequiresWiderDestination { src, dst });
            }
        } else if dst > src {
            return Err(IrError::TruncatingRequiresNarrowerDestination { src, dst });
        }
        Ok(())
    }

    pub fn build_zext(&mut self, ctx: &Context, dst_ty: crate::types::TypeId, value: Value) -> Result<Value, IrError> {
        Self::check_conversion_widths(ctx, dst_ty, value, true)?;
        Ok(self.insert_value(ctx, Op::Zext { dst_ty, value }))
    }

    pub fn build_sext(&mut self, ctx: &Context, dst_ty: crate::types::TypeId, value: Value) -> Result<Value, IrError> {
        Self::check_conversion_widths(ctx, dst_ty, value, true)?;
        Ok(self.insert_value(ctx, Op::Sext { dst_ty, value }))
    }

    pub fn build_trunc(&mut self, ctx: &Context, dst_ty: crate::types::TypeId, value: Value) -> Result<Value, IrError> {
        Self::check_conversion_widths(ctx, dst_ty, value, false)?;
        Ok(self.insert_value(ctx, Op::Trunc { dst_ty, value }))
    }

    pub fn build_bitcast(&mut self, ctx: &Context, dst_ty: crate::types::TypeId, value: Value) -> Result<Value, IrError> {
        if !ctx.is_int(dst_ty) || !ctx.is_int(value.ty) {
            return Err(IrError::NotAnIntegerType);
        }
        let src = ctx.width_of(value.ty).unwrap();
        let dst = ctx.width_of(dst_ty).unwrap();
        if src != dst {
            return Err(IrError::BitcastWidthMismatch { src, dst });
        }
        Ok(self.insert_value(ctx, Op::Bitcast { dst_ty, value }))
    }

    // --- Arithmetic / bitwise helpers ---

    fn require_same_type(lhs: Value, rhs: Value) -> Result<(), IrError> {
        if lhs.ty != rhs.ty {
            return Err(IrError::TypeMismatch { expected: lhs.ty, found: rhs.ty });
        }
        Ok(())
    }

    pub fn build_add(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Self::require_same_type(lhs, rhs)?;
        Ok(self.insert_value(ctx, Op::Add { lhs, rhs }))
    }

    pub fn build_sub(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Self::require_same_type(lhs, rhs)?;
        Ok(self.insert_value(ctx, Op::Sub { lhs, rhs }))
    }

    pub fn build_mul(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Self::require_same_type(lhs, rhs)?;
        Ok(self.insert_value(ctx, Op::Mul { lhs, rhs }))
    }

    pub fn build_sdiv(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Self::require_same_type(lhs, rhs)?;
        Ok(self.insert_value(ctx, Op::SDiv { lhs, rhs }))
    }

    pub fn build_udiv(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Self::require_same_type(lhs, rhs)?;
        Ok(self.insert_value(ctx, Op::UDiv { lhs, rhs }))
    }

    /// Shifts allow a shift-amount operand with a different width than the
    /// shifted value, so only the shifted (left) operand's kind is checked.
    pub fn build_lshl(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Ok(self.insert_value(ctx, Op::Lshl { lhs, rhs }))
    }

    pub fn build_lshr(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Ok(self.insert_value(ctx, Op::Lshr { lhs, rhs }))
    }

    pub fn build_ashr(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Ok(self.insert_value(ctx, Op::Ashr { lhs, rhs }))
    }

    pub fn build_and(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Self::require_same_type(lhs, rhs)?;
        Ok(self.insert_value(ctx, Op::And { lhs, rhs }))
    }

    pub fn build_or(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Self::require_same_type(lhs, rhs)?;
        Ok(self.insert_value(ctx, Op::Or { lhs, rhs }))
    }

    pub fn build_xor(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        Self::require_same_type(lhs, rhs)?;
        Ok(self.insert_value(ctx, Op::Xor { lhs, rhs }))
    }

    pub fn build_cat(&mut self, ctx: &mut Context, operands: Vec<Value>) -> Result<Value, IrError> {
        if operands.is_empty() || operands.iter().any(|v| !ctx.is_int(v.ty)) {
            return Err(IrError::NotAnIntegerType);
        }
        let width: u32 = operands.iter().map(|v| ctx.width_of(v.ty).unwrap()).sum();
        let result_ty = ctx.int_type(width);
        let id = self.insert(Op::Cat { operands, result_ty });
        Ok(Value::from_inst(result_ty, id))
    }

    // --- Comparisons ---

    fn build_cmp(&mut self, ctx: &Context, lhs: Value, rhs: Value, make: impl FnOnce(Value, Value) -> Op) -> Result<Value, IrError> {
        Self::require_same_type(lhs, rhs)?;
        Ok(self.insert_value(ctx, make(lhs, rhs)))
    }

    pub fn build_eq(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_cmp(ctx, lhs, rhs, |lhs, rhs| Op::Eq { lhs, rhs })
    }
    pub fn build_ne(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_cmp(ctx, lhs, rhs, |lhs, rhs| Op::Ne { lhs, rhs })
    }
    pub fn build_sle(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_cmp(ctx, lhs, rhs, |lhs, rhs| Op::Sle { lhs, rhs })
    }
    pub fn build_slt(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_cmp(ctx, lhs, rhs, |lhs, rhs| Op::Slt { lhs, rhs })
    }
    pub fn build_sge(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_cmp(ctx, lhs, rhs, |lhs, rhs| Op::Sge { lhs, rhs })
    }
    pub fn build_sgt(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_cmp(ctx, lhs, rhs, |lhs, rhs| Op::Sgt { lhs, rhs })
    }
    pub fn build_ule(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_cmp(ctx, lhs, rhs, |lhs, rhs| Op::Ule { lhs, rhs })
    }
    pub fn build_ult(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_cmp(ctx, lhs, rhs, |lhs, rhs| Op::Ult { lhs, rhs })
    }
    pub fn build_uge(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_cmp(ctx, lhs, rhs, |lhs, rhs| Op::Uge { lhs, rhs })
    }
    pub fn build_ugt(&mut self, ctx: &Context, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_cmp(ctx, lhs, rhs, |lhs, rhs| Op::Ugt { lhs, rhs })
    }

    // --- Memory ---

    pub fn build_load(&mut self, ctx: &Context, ptr: Value) -> Result<Value, IrError> {
        if !ctx.is_pointer(ptr.ty) {
            return Err(IrError::NotAPointer);
        }
        Ok(self.insert_value(ctx, Op::Load { ptr }))
    }

    pub fn build_store(&mut self, ctx: &Context, ptr: Value, value: Value) -> Result<(), IrError> {
        if !ctx.is_pointer(ptr.ty) {
            return Err(IrError::NotAPointer);
        }
        if ctx.pointee_of(ptr.ty) != value.ty {
            return Err(IrError::StoreTypeMismatch);
        }
        self.insert(Op::Store { ptr, value });
        Ok(())
    }

    // --- Register ---

    pub fn build_rload(&mut self, register: Register) -> Value {
        let ty = register.ty();
        let id = self.insert(Op::RLoad { reg: register });
        Value::from_inst(ty, id)
    }

    pub fn build_rstore(&mut self, register: Register, value: Value) -> Result<(), IrError> {
        if value.ty != register.ty() {
            return Err(IrError::TypeMismatch { expected: register.ty(), found: value.ty });
        }
        self.insert(Op::RStore { reg: register, value });
        Ok(())
    }

    // --- Stack ---

    pub fn build_alloca(&mut self, ctx: &mut Context, stored_ty: crate::types::TypeId) -> Value {
        let ptr_ty = ctx.pointer_type(stored_ty);
        let id = self.insert(Op::Alloca { stored_ty, ptr_ty });
        Value::from_inst(ptr_ty, id)
    }

    // --- Scalar ---

    pub fn build_select(&mut self, ctx: &Context, cond: Value, if_true: Value, if_false: Value) -> Result<Value, IrError> {
        if cond.ty != ctx.bool_type {
            return Err(IrError::ConditionNotBoolean);
        }
        if if_true.ty != if_false.ty {
            return Err(IrError::TypeMismatch { expected: if_true.ty, found: if_false.ty });
        }
        Ok(self.insert_value(ctx, Op::Select { cond, if_true, if_false }))
    }

    pub fn build_copy(&mut self, ctx: &Context, value: Value) -> Value {
        self.insert_value(ctx, Op::Copy { value })
    }

    // --- Undefined ---

    pub fn build_undef(&mut self) {
        self.insert(Op::Undef);
    }
}
