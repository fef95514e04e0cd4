//! The formatting contract: every type, value, instruction, block and
//! function can be turned into a sequence of classified tokens. This is the
//! core's half of the renderer contract — a visual/graph-emitting renderer
//! itself is an external collaborator and lives outside this crate.
//!
//! Grounded on the original reference implementation's `.format()` methods
//! across `ir.py`, which return `pygments.token`-tagged `(kind, text)`
//! pairs. This crate has no token-classification dependency to carry that
//! tagging scheme, and no example repo in the retrieval pack depends on one
//! for this purpose, so the closed, small tag set is reproduced directly as
//! a plain enum instead.

use std::collections::HashMap;

use crate::function::{BasicBlock, BlockId, Form, Function};
use crate::instruction::{InstData, InstId, Op};
use crate::register::Register;
use crate::types::{Context, TypeId};
use crate::value::{Value, ValuePayload};

/// The closed set of token classes the original tags output with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    KeywordType,
    Operator,
    OperatorWord,
    Name,
    NameLabel,
    Number,
    Punctuation,
    Text,
    Comment,
}

/// One classified chunk of output text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token { kind, text: text.into() }
    }
}

fn tok(kind: TokenKind, text: impl Into<String>) -> Token {
    Token::new(kind, text)
}

fn text(s: impl Into<String>) -> Token {
    tok(TokenKind::Text, s)
}

fn punct(s: impl Into<String>) -> Token {
    tok(TokenKind::Punctuation, s)
}

/// Join a multi-line token stream into a plain string, discarding token
/// classification. Grounded on `utils.format_to_str`.
pub fn format_to_string(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Block and value names, assigned once over a function's current layout.
///
/// The original derives a block's or instruction's name on demand by
/// linearly scanning the function looking for the object's identity,
/// numbering a value by its position among *all* instructions regardless
/// of whether they produce a value. This crate precomputes names once per
/// render instead of re-deriving them per token (since `BlockId`/`InstId`
/// already carry the identity the scan recovers), but deliberately
/// numbers values by position among only the live, value-producing
/// instructions in layout order — a void instruction ahead of a value
/// producer does not consume a number here, so the two numbering schemes
/// diverge on any block containing one. Exact textual output is out of
/// scope (§6), so this is a difference in visual output, not semantics.
pub struct Namer {
    block_names: HashMap<BlockId, String>,
    value_names: HashMap<InstId, String>,
}

impl Namer {
    pub fn compute(function: &Function, ctx: &Context) -> Self {
        let mut block_names = HashMap::new();
        for (i, &block) in function.blocks_in_order().iter().enumerate() {
            block_names.insert(block, format!("bb_{}", i));
        }

        let mut value_names = HashMap::new();
        let mut counter = 0usize;
        for &block in function.blocks_in_order() {
            for &id in function.block(block).insts() {
                if function.inst(id).produces_value(ctx) {
                    value_names.insert(id, format!("{}", counter));
                    counter += 1;
                }
            }
        }
        Namer { block_names, value_names }
    }

    pub fn block_name(&self, id: BlockId) -> &str {
        self.block_names.get(&id).map(String::as_str).unwrap_or("bb_?")
    }

    pub fn value_name(&self, id: InstId) -> &str {
        self.value_names.get(&id).map(String::as_str).unwrap_or("???")
    }
}

/// Format a type as its keyword-ish spelling (`void`, `i32`, `i32*`, a
/// function type's `ret(args)` shape). Lives on `Context` rather than on a
/// `Type` value, since types are opaque interned ids here.
impl Context {
    pub fn format_type(&self, ty: TypeId) -> Vec<Token> {
        if self.is_void(ty) {
            return vec![tok(TokenKind::KeywordType, "void")];
        }
        if self.is_pointer(ty) {
            let mut out = self.format_type(self.pointee_of(ty));
            out.push(punct("*"));
            return out;
        }
        if self.is_function(ty) {
            let mut out = self.format_type(self.return_type_of(ty));
            out.push(punct("("));
            for (i, &arg) in self.arg_types_of(ty).iter().enumerate() {
                if i > 0 {
                    out.push(punct(","));
                    out.push(text(" "));
                }
                out.extend(self.format_type(arg));
            }
            out.push(punct(")"));
            return out;
        }
        // Integer type: width_of is infallible for anything else above.
        let width = self.width_of(ty).expect("non-void, non-aggregate type must have a width");
        vec![tok(TokenKind::KeywordType, format!("i{}", width))]
    }
}

impl Register {
    pub fn format_tokens(&self) -> Vec<Token> {
        vec![tok(TokenKind::Name, format!("%{}", self.name()))]
    }
}

impl Value {
    /// A constant is rendered as its type followed by a hex literal; a
    /// value produced by an instruction is rendered as that instruction's
    /// assigned variable name.
    pub fn format_tokens(&self, ctx: &Context, namer: &Namer) -> Vec<Token> {
        match self.payload {
            ValuePayload::Const(literal) => {
                let mut out = ctx.format_type(self.ty);
                out.push(text(" "));
                let hex = if literal < 0 {
                    format!("-0x{:x}", -literal)
                } else {
                    format!("0x{:x}", literal)
                };
                out.push(tok(TokenKind::Number, hex));
                out
            }
            ValuePayload::Inst(id) => vec![tok(TokenKind::Name, format!("%{}", namer.value_name(id)))],
        }
    }
}

fn binary_operator_tokens(ctx: &Context, op_image: &str, lhs: Value, rhs: Value, namer: &Namer) -> Vec<Token> {
    let mut out = lhs.format_tokens(ctx, namer);
    out.push(text(" "));
    out.push(tok(TokenKind::Operator, op_image));
    out.push(text(" "));
    out.extend(rhs.format_tokens(ctx, namer));
    out
}

/// Format a single instruction's operation, not including the `%n = `
/// assignment prefix a value-producing instruction gets in
/// [`InstData::format_tokens`]. Grounded on the original's
/// `format_instruction` per instruction class.
fn format_op(op: &Op, ctx: &Context, namer: &Namer) -> Vec<Token> {
    match op {
        Op::Jump { dest } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "jump"), text(" ")];
            out.push(tok(TokenKind::NameLabel, format!("%{}", namer.block_name(*dest))));
            out
        }
        Op::Branch { cond, if_true, if_false } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "branch"), text(" "), tok(TokenKind::Keyword, "if"), text(" ")];
            out.extend(cond.format_tokens(ctx, namer));
            out.push(text(" "));
            out.push(tok(TokenKind::Keyword, "then"));
            out.push(text(" "));
            out.push(tok(TokenKind::NameLabel, format!("%{}", namer.block_name(*if_true))));
            out.push(text(" "));
            out.push(tok(TokenKind::Keyword, "else"));
            out.push(text(" "));
            out.push(tok(TokenKind::NameLabel, format!("%{}", namer.block_name(*if_false))));
            out
        }
        Op::Call { callee, args } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "call")];
            out.extend(ctx.format_type(ctx.return_type_of(callee.ty)));
            out.push(text(" "));
            out.extend(callee.format_tokens(ctx, namer));
            out.push(punct("("));
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push(punct(","));
                    out.push(text(" "));
                }
                out.extend(arg.format_tokens(ctx, namer));
            }
            out.push(punct(")"));
            out
        }
        Op::Ret { value } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "ret")];
            if let Some(v) = value {
                out.push(text(" "));
                out.extend(v.format_tokens(ctx, namer));
            }
            out
        }
        Op::Phi { pairs } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "phi"), text(" ")];
            for (i, (bb, value)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push(punct(","));
                    out.push(text(" "));
                }
                out.push(tok(TokenKind::NameLabel, format!("%{}", namer.block_name(*bb))));
                out.push(text(" "));
                out.push(punct("=>"));
                out.push(text(" "));
                out.extend(value.format_tokens(ctx, namer));
            }
            out
        }
        Op::Zext { dst_ty, value } => conversion_tokens("zext", *dst_ty, *value, ctx, namer),
        Op::Sext { dst_ty, value } => conversion_tokens("sext", *dst_ty, *value, ctx, namer),
        Op::Trunc { dst_ty, value } => conversion_tokens("trunc", *dst_ty, *value, ctx, namer),
        Op::Bitcast { dst_ty, value } => conversion_tokens("bitcast", *dst_ty, *value, ctx, namer),
        Op::Add { lhs, rhs } => binary_operator_tokens(ctx, "+", *lhs, *rhs, namer),
        Op::Sub { lhs, rhs } => binary_operator_tokens(ctx, "-", *lhs, *rhs, namer),
        Op::Mul { lhs, rhs } => binary_operator_tokens(ctx, "*", *lhs, *rhs, namer),
        Op::SDiv { lhs, rhs } => binary_operator_tokens(ctx, "/s", *lhs, *rhs, namer),
        Op::UDiv { lhs, rhs } => binary_operator_tokens(ctx, "/u", *lhs, *rhs, namer),
        Op::Lshl { lhs, rhs } => binary_operator_tokens(ctx, "<<", *lhs, *rhs, namer),
        Op::Lshr { lhs, rhs } => binary_operator_tokens(ctx, ">>u", *lhs, *rhs, namer),
        Op::Ashr { lhs, rhs } => binary_operator_tokens(ctx, ">>s", *lhs, *rhs, namer),
        Op::And { lhs, rhs } => binary_operator_tokens(ctx, "&", *lhs, *rhs, namer),
        Op::Or { lhs, rhs } => binary_operator_tokens(ctx, "|", *lhs, *rhs, namer),
        Op::Xor { lhs, rhs } => binary_operator_tokens(ctx, "^", *lhs, *rhs, namer),
        Op::Eq { lhs, rhs } => binary_operator_tokens(ctx, "==", *lhs, *rhs, namer),
        Op::Ne { lhs, rhs } => binary_operator_tokens(ctx, "!=", *lhs, *rhs, namer),
        Op::Sle { lhs, rhs } => binary_operator_tokens(ctx, "<=s", *lhs, *rhs, namer),
        Op::Slt { lhs, rhs } => binary_operator_tokens(ctx, "<s", *lhs, *rhs, namer),
        Op::Sge { lhs, rhs } => binary_operator_tokens(ctx, ">=s", *lhs, *rhs, namer),
        Op::Sgt { lhs, rhs } => binary_operator_tokens(ctx, ">s", *lhs, *rhs, namer),
        Op::Ule { lhs, rhs } => binary_operator_tokens(ctx, "<=u", *lhs, *rhs, namer),
        Op::Ult { lhs, rhs } => binary_operator_tokens(ctx, "<u", *lhs, *rhs, namer),
        Op::Uge { lhs, rhs } => binary_operator_tokens(ctx, ">=u", *lhs, *rhs, namer),
        Op::Ugt { lhs, rhs } => binary_operator_tokens(ctx, ">u", *lhs, *rhs, namer),
        Op::Cat { operands, .. } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "cat"), text(" ")];
            for (i, v) in operands.iter().enumerate() {
                if i > 0 {
                    out.push(punct(","));
                    out.push(text(" "));
                }
                out.extend(v.format_tokens(ctx, namer));
            }
            out
        }
        Op::Load { ptr } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "load"), text(" ")];
            out.extend(ctx.format_type(ptr.ty));
            out.push(text(" "));
            out.extend(ptr.format_tokens(ctx, namer));
            out
        }
        Op::Store { ptr, value } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "store"), text(" ")];
            out.extend(value.format_tokens(ctx, namer));
            out.push(text(" "));
            out.push(tok(TokenKind::Keyword, "to"));
            out.push(text(" "));
            out.extend(ctx.format_type(ptr.ty));
            out.push(text(" "));
            out.extend(ptr.format_tokens(ctx, namer));
            out
        }
        Op::RLoad { reg } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "rload"), text(" ")];
            out.extend(ctx.format_type(reg.ty()));
            out.push(text(" "));
            out.extend(reg.format_tokens());
            out
        }
        Op::RStore { reg, value } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "rstore"), text(" ")];
            out.extend(value.format_tokens(ctx, namer));
            out.push(text(" "));
            out.push(tok(TokenKind::Keyword, "to"));
            out.push(text(" "));
            out.extend(ctx.format_type(reg.ty()));
            out.push(text(" "));
            out.extend(reg.format_tokens());
            out
        }
        Op::Alloca { stored_ty, .. } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "alloca"), text(" ")];
            out.extend(ctx.format_type(*stored_ty));
            out
        }
        Op::Select { cond, if_true, if_false } => {
            let mut out = vec![tok(TokenKind::OperatorWord, "select"), text(" "), tok(TokenKind::Keyword, "if"), text(" ")];
            out.extend(cond.format_tokens(ctx, namer));
            out.push(text(" "));
            out.push(tok(TokenKind::Keyword, "then"));
            out.push(text(" "));
            out.extend(if_true.format_tokens(ctx, namer));
            out.push(text(" "));
            out.push(tok(TokenKind::Keyword, "else"));
            out.push(text(" "));
            out.extend(if_false.format_tokens(ctx, namer));
            out
        }
        Op::Copy { value } => {
            let mut out = vec![tok(TokenKind::Keyword, "copy"), text(" ")];
            out.extend(value.format_tokens(ctx, namer));
            out
        }
        Op::Undef => vec![tok(TokenKind::OperatorWord, "undef")],
        Op::DummyPhiArgument { .. } => vec![tok(TokenKind::Comment, "<dummy phi argument>")],
    }
}

fn conversion_tokens(mnemonic: &str, dst_ty: TypeId, value: Value, ctx: &Context, namer: &Namer) -> Vec<Token> {
    let mut out = vec![tok(TokenKind::OperatorWord, mnemonic), text(" ")];
    out.extend(value.format_tokens(ctx, namer));
    out.push(text(" "));
    out.push(tok(TokenKind::Keyword, "to"));
    out.push(text(" "));
    out.extend(ctx.format_type(dst_ty));
    out
}

impl InstData {
    /// Format this instruction, prefixed with its `%n = ` assignment when it
    /// produces a usable value. `id` is this instruction's own arena id,
    /// needed to look its assigned name up in `namer`.
    pub fn format_tokens(&self, id: InstId, ctx: &Context, namer: &Namer) -> Vec<Token> {
        let body = format_op(&self.op, ctx, namer);
        if self.produces_value(ctx) {
            let mut out = vec![tok(TokenKind::Name, format!("%{}", namer.value_name(id))), text(" "), tok(TokenKind::Operator, "="), text(" ")];
            out.extend(body);
            out
        } else {
            body
        }
    }
}

impl BasicBlock {
    pub fn format_tokens(&self, id: BlockId, function: &Function, ctx: &Context, namer: &Namer) -> Vec<Token> {
        let mut out = vec![tok(TokenKind::NameLabel, format!("%{}", namer.block_name(id))), punct(":"), text("\n")];

        if !self.predecessors().is_empty() {
            let mut names: Vec<String> = self.predecessors().iter().map(|&p| format!("%{}", namer.block_name(p))).collect();
            names.sort_unstable();
            out.push(text("    "));
            out.push(tok(TokenKind::Comment, format!("; Predecessors: {}", names.join(", "))));
            out.push(text("\n"));
        }

        let mut current_origin: Option<&Option<String>> = None;
        for &inst_id in self.insts() {
            let origin = &function.inst(inst_id).origin;
            if current_origin != Some(origin) {
                current_origin = Some(origin);
                if let Some(o) = origin {
                    out.push(text("    "));
                    out.push(tok(TokenKind::Comment, format!("; {}", o)));
                    out.push(text("\n"));
                }
            }
            out.push(text("    "));
            out.extend(function.inst(inst_id).format_tokens(inst_id, ctx, namer));
            out.push(text("\n"));
        }
        out
    }
}

impl Function {
    /// Format this function's full body, named by `address` (the key the
    /// owning `Context` registered it under).
    pub fn format_tokens(&self, address: u64, ctx: &Context) -> Vec<Token> {
        let namer = Namer::compute(self, ctx);
        let mut out = vec![
            tok(TokenKind::Name, format!("sub_{:x}", address)),
            punct("("),
            punct(")"),
            text(" "),
            punct("{"),
            text("\n"),
        ];
        for (i, &block) in self.blocks_in_order().iter().enumerate() {
            if i > 0 {
                out.push(text("\n"));
            }
            out.extend(self.block(block).format_tokens(block, self, ctx, &namer));
        }
        out.push(punct("}"));
        out.push(text("\n"));
        out
    }

    /// Whether this function has been promoted past `FORM_PURE`; purely a
    /// convenience for callers deciding whether inlined subtrees need
    /// special handling before rendering (they don't: `format_tokens`
    /// renders from each consumer's operand, never from a block's live
    /// list, so an `inline`-flagged instruction is reached exactly once,
    /// through its sole consumer).
    pub fn is_expr_form(&self) -> bool {
        matches!(self.form, Form::Expr)
    }
}

impl Context {
    /// Format every function currently registered, in insertion order,
    /// separated by a blank line. Grounded on the original's `Context.format`.
    pub fn format_tokens(&self) -> Vec<Token> {
        let addresses: Vec<u64> = self.function_addresses().collect();
        if addresses.is_empty() {
            return vec![tok(TokenKind::Comment, "; Empty context")];
        }
        let mut out = Vec::new();
        for (i, address) in addresses.into_iter().enumerate() {
            if i > 0 {
                out.push(text("\n"));
            }
            let function = self.function(address).expect("address came from function_addresses");
            out.extend(function.format_tokens(address, self));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::function::Function;
    use crate::instruction::InstData;

    #[test]
    fn a_constant_formats_as_type_and_hex() {
        let mut ctx = Context::new(32);
        let v = ctx.const_int(ctx.i32_type, 10).unwrap();
        let f = Function::new(ctx.void_type, vec![]);
        let namer = Namer::compute(&f, &ctx);
        let s = format_to_string(&v.format_tokens(&ctx, &namer));
        assert_eq!(s, "i32 0xa");
    }

    #[test]
    fn a_negative_constant_formats_with_a_leading_minus() {
        let mut ctx = Context::new(32);
        let v = ctx.const_int(ctx.i32_type, -1).unwrap();
        let f = Function::new(ctx.void_type, vec![]);
        let namer = Namer::compute(&f, &ctx);
        let s = format_to_string(&v.format_tokens(&ctx, &namer));
        assert_eq!(s, "i32 -0x1");
    }

    #[test]
    fn a_value_producing_instruction_gets_an_assignment_prefix() {
        let mut ctx = Context::new(32);
        let mut f = Function::new(ctx.i32_type, vec![]);
        let entry = f.entry();
        let a = ctx.const_int(ctx.i32_type, 1).unwrap();
        let add = f.append_inst(entry, InstData::new(Op::Add { lhs: a, rhs: a }));
        let add_v = Value::from_inst(ctx.i32_type, add);
        f.append_inst(entry, InstData::new(Op::Ret { value: Some(add_v) }));

        let namer = Namer::compute(&f, &ctx);
        let s = format_to_string(&f.inst(add).format_tokens(add, &ctx, &namer));
        assert!(s.starts_with("%0 = "));
        assert!(s.contains("i32 0x1 + i32 0x1"));
    }

    #[test]
    fn a_terminator_has_no_assignment_prefix() {
        let mut ctx = Context::new(32);
        let mut f = Function::new(ctx.void_type, vec![]);
        let entry = f.entry();
        let ret = f.append_inst(entry, InstData::new(Op::Ret { value: None }));

        let namer = Namer::compute(&f, &ctx);
        let s = format_to_string(&f.inst(ret).format_tokens(ret, &ctx, &namer));
        assert_eq!(s, "ret");
    }

    #[test]
    fn a_block_with_predecessors_emits_a_predecessor_comment() {
        let mut ctx = Context::new(32);
        let mut f = Function::new(ctx.void_type, vec![]);
        let entry = f.entry();
        let target = f.create_block();
        f.append_inst(entry, InstData::new(Op::Jump { dest: target }));
        f.append_inst(target, InstData::new(Op::Ret { value: None }));

        let namer = Namer::compute(&f, &ctx);
        let s = format_to_string(&f.block(target).format_tokens(target, &f, &ctx, &namer));
        assert!(s.contains("; Predecessors: %bb_0"));
    }

    #[test]
    fn a_function_renders_its_blocks_in_braces() {
        let mut ctx = Context::new(32);
        ctx.create_function(0x1000, ctx.void_type, vec![]);
        {
            let f = ctx.function_mut(0x1000).unwrap();
            let entry = f.entry();
            f.append_inst(entry, InstData::new(Op::Ret { value: None }));
        }
        let f = ctx.function(0x1000).unwrap();
        let s = format_to_string(&f.format_tokens(0x1000, &ctx));
        assert!(s.starts_with("sub_1000() {\n"));
        assert!(s.trim_end().ends_with("}"));
    }

    #[test]
    fn an_empty_context_formats_as_a_comment() {
        let ctx = Context::new(32);
        let s = format_to_string(&ctx.format_tokens());
        assert_eq!(s, "; Empty context");
    }

    #[test]
    fn an_rload_formats_its_register_name() {
        let mut ctx = Context::new(32);
        let mut f = Function::new(ctx.i32_type, vec![]);
        let entry = f.entry();
        let reg = Register::atomic("a", ctx.i32_type);
        let mut bld = Builder::new(&mut f);
        bld.position_at_entry();
        let rload = bld.build_rload(reg);
        drop(bld);
        let rload_id = rload.producer().unwrap();

        let namer = Namer::compute(&f, &ctx);
        let s = format_to_string(&f.inst(rload_id).format_tokens(rload_id, &ctx, &namer));
        assert!(s.contains("rload i32 %a"));
    }
}
