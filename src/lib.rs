//! A typed, SSA-form intermediate representation for a decompiler core.
//!
//! Models programs as basic blocks of typed instructions over a single
//! discriminated union ([`instruction::Op`]), interned types owned by a
//! process-wide [`types::Context`], and a fixed pipeline of passes that lift
//! machine-level register traffic into true SSA values, collapse control
//! flow into expressions, and remove redundancy. [`interpreter`] supplies
//! executable reference semantics for the same IR the passes transform.

pub mod analysis;
pub mod builder;
pub mod error;
pub mod function;
pub mod instruction;
pub mod interpreter;
pub mod passes;
pub mod register;
pub mod render;
pub mod types;
pub mod value;

pub use builder::Builder;
pub use error::{InterpError, IrError};
pub use function::{BasicBlock, BlockId, Form, Function};
pub use instruction::{InstData, InstId, Op, Origin};
pub use interpreter::{Interpreter, LiveValue};
pub use passes::run_pipeline;
pub use register::{Composition, Register};
pub use render::{Namer, Token, TokenKind};
pub use types::{Context, TypeId};
pub use value::{Value, ValuePayload};
