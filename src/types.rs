//! Interned types and the process-wide [`Context`] that owns them.
//!
//! Types are structural: two `Function` types with the same return type and
//! argument types are the same type. Interning makes that equality a cheap
//! index comparison instead of a recursive structural walk.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::IrError;
use crate::function::Function;
use crate::value::Value;

/// A stable handle to an interned [`TypeData`] inside a [`Context`].
///
/// Never reused or renumbered: once issued, a `TypeId` remains valid and
/// refers to the same `TypeData` for the lifetime of its `Context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TypeData {
    Void,
    Int { width: u32 },
    Pointer { pointee: TypeId },
    Function { ret: TypeId, args: Vec<TypeId> },
}

/// The process-wide factory and type registry.
///
/// Owns the pointer bit-width, the singleton void type, pre-built integer
/// types for widths 1/8/16/32/64, the type-interning table, and the mapping
/// from function address to [`Function`]. There is exactly one `Context` per
/// program being modeled; every `Type`, `Function`, and ultimately every
/// `Value` derived from them is only meaningful relative to it.
pub struct Context {
    pointer_width: u32,
    types: Vec<TypeData>,
    type_lookup: HashMap<TypeData, TypeId>,

    pub void_type: TypeId,
    pub bool_type: TypeId,
    pub i8_type: TypeId,
    pub i16_type: TypeId,
    pub i32_type: TypeId,
    pub i64_type: TypeId,

    functions: IndexMap<u64, Function>,
}

impl Context {
    /// Create a new context for a target with the given pointer width (in
    /// bits), pre-interning the void type and the integer types this crate's
    /// passes and tests reach for most often.
    pub fn new(pointer_width: u32) -> Self {
        let mut ctx = Context {
            pointer_width,
            types: Vec::new(),
            type_lookup: HashMap::new(),
            void_type: TypeId(0),
            bool_type: TypeId(0),
            i8_type: TypeId(0),
            i16_type: TypeId(0),
            i32_type: TypeId(0),
            i64_type: TypeId(0),
            functions: IndexMap::new(),
        };
        ctx.void_type = ctx.intern(TypeData::Void);
        ctx.bool_type = ctx.int_type(1);
        ctx.i8_type = ctx.int_type(8);
        ctx.i16_type = ctx.int_type(16);
        ctx.i32_type = ctx.int_type(32);
        ctx.i64_type = ctx.int_type(64);
        ctx
    }

    /// The pointer width configured for this context, in bits.
    pub fn pointer_width(&self) -> u32 {
        self.pointer_width
    }

    fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(id) = self.type_lookup.get(&data) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(data.clone());
        self.type_lookup.insert(data, id);
        id
    }

    pub(crate) fn data(&self, id: TypeId) -> &TypeData {
        &self.types[id.0 as usize]
    }

    /// Intern (or fetch) the integer type of the given bit width.
    pub fn int_type(&mut self, width: u32) -> TypeId {
        assert!(width >= 1, "integer types must be at least 1 bit wide");
        self.intern(TypeData::Int { width })
    }

    /// Intern (or fetch) a pointer type to `pointee`. Its width is always the
    /// context's pointer width, never the pointee's.
    pub fn pointer_type(&mut self, pointee: TypeId) -> TypeId {
        self.intern(TypeData::Pointer { pointee })
    }

    /// Intern (or fetch) a function type with the given return and argument
    /// types.
    pub fn function_type(&mut self, ret: TypeId, args: Vec<TypeId>) -> TypeId {
        self.intern(TypeData::Function { ret, args })
    }

    /// The bit width of an integer type, or the context's pointer width for
    /// pointer and function types. `None` for `void`.
    pub fn width_of(&self, id: TypeId) -> Option<u32> {
        match self.data(id) {
            TypeData::Void => None,
            TypeData::Int { width } => Some(*width),
            TypeData::Pointer { .. } => Some(self.pointer_width),
            TypeData::Function { .. } => Some(self.pointer_width),
        }
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.data(id), TypeData::Void)
    }

    pub fn is_int(&self, id: TypeId) -> bool {
        matches!(self.data(id), TypeData::Int { .. })
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.data(id), TypeData::Pointer { .. })
    }

    pub fn is_function(&self, id: TypeId) -> bool {
        matches!(self.data(id), TypeData::Function { .. })
    }

    /// The pointee of a pointer type. Panics if `id` is not a pointer type;
    /// callers that accept arbitrary types should check with [`Context::is_pointer`]
    /// first (the Builder does, and reports [`IrError::NotAPointer`] instead).
    pub fn pointee_of(&self, id: TypeId) -> TypeId {
        match self.data(id) {
            TypeData::Pointer { pointee } => *pointee,
            _ => panic!("pointee_of called on a non-pointer type"),
        }
    }

    /// The return type of a function type. Panics on a non-function type.
    pub fn return_type_of(&self, id: TypeId) -> TypeId {
        match self.data(id) {
            TypeData::Function { ret, .. } => *ret,
            _ => panic!("return_type_of called on a non-function type"),
        }
    }

    /// The argument types of a function type. Panics on a non-function type.
    pub fn arg_types_of(&self, id: TypeId) -> &[TypeId] {
        match self.data(id) {
            TypeData::Function { args, .. } => args,
            _ => panic!("arg_types_of called on a non-function type"),
        }
    }

    /// Build a constant integer [`Value`] of type `ty`, validating that
    /// `literal` fits in the type's signed range.
    ///
    /// This is the Rust realization of "integer types have a `create(literal)`
    /// factory producing a constant Value": since `Type` here is an opaque
    /// interned id rather than an object with methods, the factory lives on
    /// `Context` instead.
    pub fn const_int(&self, ty: TypeId, literal: i128) -> Result<Value, IrError> {
        let width = match self.data(ty) {
            TypeData::Int { width } => *width,
            _ => return Err(IrError::NotAnIntegerType),
        };
        let min = -(1i128 << (width - 1).min(126));
        let max = (1i128 << width.min(126)) - 1;
        // For width==128 the shifts above would overflow i128; the IR never
        // constructs integer types that wide, but guard rather than panic.
        if width < 128 && (literal < min || literal > max) {
            return Err(IrError::LiteralOutOfRange { literal, width });
        }
        Ok(Value::constant(ty, literal))
    }

    /// Register a new, empty function at `address` with the given signature,
    /// and return its address (the key to retrieve it again via
    /// [`Context::function`]/[`Context::function_mut`]).
    pub fn create_function(&mut self, address: u64, return_type: TypeId, arg_types: Vec<TypeId>) -> u64 {
        let func = Function::new(return_type, arg_types);
        self.functions.insert(address, func);
        address
    }

    pub fn function(&self, address: u64) -> Option<&Function> {
        self.functions.get(&address)
    }

    pub fn function_mut(&mut self, address: u64) -> Option<&mut Function> {
        self.functions.get_mut(&address)
    }

    pub fn function_addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.functions.keys().copied()
    }
}
