//! Machine-level registers: named, mutable storage cells read via `rload`
//! and written via `rstore`. Registers are NOT SSA values — they are the
//! thing SSA construction ([`crate::passes::ssa_construction`]) eliminates.

use std::fmt;
use std::rc::Rc;

use crate::types::TypeId;

/// How a register is composed out of others, modeling architectural
/// aliasing such as a wide accumulator built from narrower halves.
///
/// This crate's analyses and passes treat every [`Register`] — atomic or
/// composite — as an independent storage cell addressed purely by identity;
/// alias-aware load/store merging across composite parts is not implemented
/// (see DESIGN.md's note on this open question). `parts` is descriptive
/// metadata only.
#[derive(Debug, Clone)]
pub enum Composition {
    Atomic,
    Composite(Vec<(Register, u32)>),
}

#[derive(Debug)]
struct RegisterData {
    name: String,
    ty: TypeId,
    composition: Composition,
}

/// A named storage cell with an integer type. Two `Register`s are equal iff
/// they are the same cell (identity, not structural equality on name/type) —
/// this mirrors the original model, where a register is a long-lived object
/// and store-site/def-stack maps are keyed by that object's identity.
#[derive(Debug, Clone)]
pub struct Register(Rc<RegisterData>);

impl Register {
    pub fn atomic(name: impl Into<String>, ty: TypeId) -> Self {
        Register(Rc::new(RegisterData { name: name.into(), ty, composition: Composition::Atomic }))
    }

    pub fn composite(name: impl Into<String>, ty: TypeId, parts: Vec<(Register, u32)>) -> Self {
        Register(Rc::new(RegisterData {
            name: name.into(),
            ty,
            composition: Composition::Composite(parts),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> TypeId {
        self.0.ty
    }

    pub fn composition(&self) -> &Composition {
        &self.0.composition
    }
}

impl PartialEq for Register {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Register {}

impl std::hash::Hash for Register {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Context;

    #[test]
    fn identity_not_structural_equality() {
        let mut ctx = Context::new(32);
        let a = Register::atomic("a", ctx.i32_type);
        let b = Register::atomic("a", ctx.i32_type);
        assert_ne!(a, b, "two distinct registers sharing a name/type are still distinct cells");
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn composite_register_records_its_parts() {
        let mut ctx = Context::new(32);
        let lo = Register::atomic("lo", ctx.i16_type);
        let hi = Register::atomic("hi", ctx.i16_type);
        let wide = Register::composite("wide", ctx.i32_type, vec![(lo, 0), (hi, 16)]);
        match wide.composition() {
            Composition::Composite(parts) => assert_eq!(parts.len(), 2),
            Composition::Atomic => panic!("expected composite"),
        }
    }
}
