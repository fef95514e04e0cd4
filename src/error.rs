//! Typed error surfaces for the IR core.
//!
//! Structural errors (malformed construction, pass precondition violations)
//! are reported through [`IrError`]; runtime semantic errors raised while
//! interpreting a function are reported through [`InterpError`]. Everywhere
//! else a violated invariant indicates a bug in already-validated IR and is
//! reported with `panic!`/`debug_assert!` instead of a `Result`.

use thiserror::Error;

use crate::function::BlockId;
use crate::types::TypeId;

/// Errors produced at the Builder/Context construction boundary, and by
/// pass-precondition checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("operand type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch { expected: TypeId, found: TypeId },

    #[error("integer literal {literal} does not fit in a {width}-bit type")]
    LiteralOutOfRange { literal: i128, width: u32 },

    #[error("zext/sext/trunc/bitcast destination type is not an integer type")]
    NotAnIntegerType,

    #[error("zext/sext require the destination width ({dst}) to be >= the source width ({src})")]
    WideningRequiresWiderDestination { src: u32, dst: u32 },

    #[error("trunc requires the destination width ({dst}) to be <= the source width ({src})")]
    TruncatingRequiresNarrowerDestination { src: u32, dst: u32 },

    #[error("bitcast requires equal source and destination widths ({src} != {dst})")]
    BitcastWidthMismatch { src: u32, dst: u32 },

    #[error("condition operand of a branch/select must be a 1-bit integer")]
    ConditionNotBoolean,

    #[error("phi node must have at least one predecessor pair")]
    EmptyPhi,

    #[error("phi node has a predecessor pair with a duplicate source block")]
    DuplicatePhiPredecessor,

    #[error("phi node pairs do not have one entry per predecessor of the owning block")]
    PhiArityMismatch,

    #[error("call target is not a function-typed value")]
    NotCallable,

    #[error("call argument count or types do not match the callee signature")]
    CallSignatureMismatch,

    #[error("ret operand does not match the function's declared return type")]
    ReturnTypeMismatch,

    #[error("load source is not a pointer type")]
    NotAPointer,

    #[error("store value type does not match the pointee type of the destination")]
    StoreTypeMismatch,

    #[error("block {0:?} has no terminator and successors were requested without allow_incomplete")]
    MissingTerminator(BlockId),

    #[error("pass precondition violated: {0}")]
    PassPrecondition(&'static str),
}

/// Errors raised while interpreting a function. Distinct from [`IrError`]
/// because these are data-dependent runtime failures a caller is expected
/// to catch, not programming bugs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("use of an undefined value")]
    UndefUse,

    #[error("phi node evaluated with no pair matching the previously executed block")]
    PhiPredecessorMismatch,

    #[error("attempted to execute an unsupported instruction kind: {0}")]
    Unsupported(&'static str),

    #[error("load from an address that was never allocated")]
    UnallocatedLoad,

    #[error("store to an address that was never allocated, or with a mismatched type")]
    InvalidStore,

    #[error("load type does not match the type of the allocated cell")]
    LoadTypeMismatch,
}
