//! Structured RTL fragments produced by the generation passes.
//!
//! Passes emit declarations, combinational items, sequential blocks, and
//! ports as data rather than strings, so one generation result can feed
//! multiple text back ends. Every construct implements [`std::fmt::Display`]
//! producing SystemVerilog, which the external rendering collaborator
//! composes into files. Fragments are order-sensitive only within a single
//! register's emission (declare before use) and otherwise composable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Bitwise complement `~`.
    Not,
    /// Logical negation `!`.
    LogicNot,
    /// AND reduction `&`.
    RedAnd,
    /// OR reduction `|`.
    RedOr,
    /// XOR reduction `^`.
    RedXor,
}

impl UnaryOp {
    fn op_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "~",
            UnaryOp::LogicNot => "!",
            UnaryOp::RedAnd => "&",
            UnaryOp::RedOr => "|",
            UnaryOp::RedXor => "^",
        }
    }
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Bitwise AND `&`.
    BitAnd,
    /// Bitwise OR `|`.
    BitOr,
    /// Bitwise XOR `^`.
    BitXor,
    /// Logical AND `&&`.
    LogicAnd,
    /// Logical OR `||`.
    LogicOr,
    /// Addition `+`.
    Add,
    /// Subtraction `-`.
    Sub,
    /// Multiplication `*`.
    Mul,
    /// Equality `==`.
    Eq,
    /// Inequality `!=`.
    Ne,
    /// Less than `<`.
    Lt,
    /// Less than or equal `<=`.
    Le,
    /// Greater than `>`.
    Gt,
    /// Greater than or equal `>=`.
    Ge,
}

impl BinaryOp {
    fn op_str(self) -> &'static str {
        match self {
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::LogicAnd => "&&",
            BinaryOp::LogicOr => "||",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// An RTL expression tree.
///
/// Signals are referenced by their canonical generated name; the naming
/// model guarantees all passes derive identical names for the same node, so
/// expressions compose across passes without a shared symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RtlExpr {
    /// A named signal or index variable.
    Var(String),
    /// An unsized decimal literal, used in index arithmetic.
    Num(u64),
    /// A sized hexadecimal literal, used for data and address values.
    Lit {
        /// The literal value.
        value: u64,
        /// The literal width in bits.
        width: u32,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<RtlExpr>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<RtlExpr>,
        /// Right operand.
        rhs: Box<RtlExpr>,
    },
    /// A conditional `cond ? a : b`.
    Ternary {
        /// The condition.
        cond: Box<RtlExpr>,
        /// Value when the condition holds.
        then_val: Box<RtlExpr>,
        /// Value otherwise.
        else_val: Box<RtlExpr>,
    },
    /// A concatenation `{a, b, …}`, most significant part first.
    Concat(Vec<RtlExpr>),
    /// A replication `{count{operand}}`.
    Repl {
        /// Replication count.
        count: u64,
        /// The replicated expression.
        operand: Box<RtlExpr>,
    },
    /// A single bit or element select `base[index]`.
    Index {
        /// The indexed signal.
        base: Box<RtlExpr>,
        /// The index expression.
        index: Box<RtlExpr>,
    },
    /// An indexed part select `base[lsb +: width]`.
    Slice {
        /// The sliced signal.
        base: Box<RtlExpr>,
        /// The low bit position, possibly index-dependent.
        lsb: Box<RtlExpr>,
        /// The slice width in bits.
        width: u64,
    },
}

impl RtlExpr {
    /// A named signal reference.
    pub fn var(name: impl Into<String>) -> Self {
        RtlExpr::Var(name.into())
    }

    /// An unsized decimal literal.
    pub fn num(value: u64) -> Self {
        RtlExpr::Num(value)
    }

    /// A sized hexadecimal literal.
    pub fn lit(value: u64, width: u32) -> Self {
        RtlExpr::Lit { value, width }
    }

    fn unary(op: UnaryOp, operand: RtlExpr) -> Self {
        RtlExpr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    fn binary(op: BinaryOp, lhs: RtlExpr, rhs: RtlExpr) -> Self {
        RtlExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Bitwise complement.
    pub fn not(self) -> Self {
        Self::unary(UnaryOp::Not, self)
    }

    /// Logical negation.
    pub fn logic_not(self) -> Self {
        Self::unary(UnaryOp::LogicNot, self)
    }

    /// AND reduction.
    pub fn red_and(self) -> Self {
        Self::unary(UnaryOp::RedAnd, self)
    }

    /// OR reduction.
    pub fn red_or(self) -> Self {
        Self::unary(UnaryOp::RedOr, self)
    }

    /// XOR reduction.
    pub fn red_xor(self) -> Self {
        Self::unary(UnaryOp::RedXor, self)
    }

    /// Bitwise AND.
    pub fn bit_and(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::BitAnd, self, rhs)
    }

    /// Bitwise OR.
    pub fn bit_or(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::BitOr, self, rhs)
    }

    /// Bitwise XOR.
    pub fn bit_xor(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::BitXor, self, rhs)
    }

    /// Logical AND.
    pub fn logic_and(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::LogicAnd, self, rhs)
    }

    /// Logical OR.
    pub fn logic_or(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::LogicOr, self, rhs)
    }

    /// Addition.
    pub fn add(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Add, self, rhs)
    }

    /// Subtraction.
    pub fn sub(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Sub, self, rhs)
    }

    /// Multiplication.
    pub fn mul(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Mul, self, rhs)
    }

    /// Equality comparison.
    pub fn equals(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Eq, self, rhs)
    }

    /// Inequality comparison.
    pub fn neq(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Ne, self, rhs)
    }

    /// Less-than comparison.
    pub fn lt(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Lt, self, rhs)
    }

    /// Less-than-or-equal comparison.
    pub fn le(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Le, self, rhs)
    }

    /// Greater-than comparison.
    pub fn gt(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Gt, self, rhs)
    }

    /// Greater-than-or-equal comparison.
    pub fn ge(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Ge, self, rhs)
    }

    /// A conditional expression.
    pub fn ternary(cond: Self, then_val: Self, else_val: Self) -> Self {
        RtlExpr::Ternary {
            cond: Box::new(cond),
            then_val: Box::new(then_val),
            else_val: Box::new(else_val),
        }
    }

    /// A concatenation, most significant part first. A single part is
    /// returned unwrapped.
    pub fn concat(mut parts: Vec<Self>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            RtlExpr::Concat(parts)
        }
    }

    /// A replication of this expression.
    pub fn repl(self, count: u64) -> Self {
        RtlExpr::Repl {
            count,
            operand: Box::new(self),
        }
    }

    /// A single bit or element select.
    pub fn index(self, index: Self) -> Self {
        RtlExpr::Index {
            base: Box::new(self),
            index: Box::new(index),
        }
    }

    /// An indexed part select of `width` bits starting at `lsb`.
    pub fn slice(self, lsb: Self, width: u64) -> Self {
        RtlExpr::Slice {
            base: Box::new(self),
            lsb: Box::new(lsb),
            width,
        }
    }

    /// Folds terms with logical AND. An empty list is constant true.
    pub fn conjoin(terms: Vec<Self>) -> Self {
        terms
            .into_iter()
            .reduce(RtlExpr::logic_and)
            .unwrap_or(RtlExpr::Num(1))
    }

    /// Folds terms with logical OR. An empty list is constant false.
    pub fn disjoin(terms: Vec<Self>) -> Self {
        terms
            .into_iter()
            .reduce(RtlExpr::logic_or)
            .unwrap_or(RtlExpr::Num(0))
    }

    /// Folds terms with bitwise OR. An empty list is constant zero.
    pub fn fold_bit_or(terms: Vec<Self>) -> Self {
        terms
            .into_iter()
            .reduce(RtlExpr::bit_or)
            .unwrap_or(RtlExpr::Num(0))
    }

    /// Atoms and bracketing constructs never need parentheses as operands.
    fn is_primary(&self) -> bool {
        !matches!(self, RtlExpr::Binary { .. } | RtlExpr::Ternary { .. })
    }
}

/// Renders an expression in operand position, parenthesized when needed.
struct Operand<'a>(&'a RtlExpr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_primary() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

impl fmt::Display for RtlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtlExpr::Var(name) => f.write_str(name),
            RtlExpr::Num(v) => write!(f, "{v}"),
            RtlExpr::Lit { value, width } => write!(f, "{width}'h{value:x}"),
            RtlExpr::Unary { op, operand } => {
                write!(f, "{}{}", op.op_str(), Operand(operand))
            }
            RtlExpr::Binary { op, lhs, rhs } => {
                // Left-associative same-operator chains read without parens.
                if matches!(lhs.as_ref(), RtlExpr::Binary { op: lop, .. } if lop == op) {
                    write!(f, "{} {} {}", lhs, op.op_str(), Operand(rhs))
                } else {
                    write!(f, "{} {} {}", Operand(lhs), op.op_str(), Operand(rhs))
                }
            }
            RtlExpr::Ternary {
                cond,
                then_val,
                else_val,
            } => write!(
                f,
                "{} ? {} : {}",
                Operand(cond),
                Operand(then_val),
                Operand(else_val)
            ),
            RtlExpr::Concat(parts) => {
                f.write_str("{")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str("}")
            }
            RtlExpr::Repl { count, operand } => write!(f, "{{{count}{{{operand}}}}}"),
            RtlExpr::Index { base, index } => write!(f, "{}[{}]", Operand(base), index),
            RtlExpr::Slice { base, lsb, width } => {
                write!(f, "{}[{} +: {}]", Operand(base), lsb, width)
            }
        }
    }
}

/// A flat packed signal declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDecl {
    /// The canonical signal name.
    pub name: String,
    /// Total width in bits.
    pub width: u64,
}

impl SignalDecl {
    /// Creates a declaration of `width` bits.
    pub fn new(name: impl Into<String>, width: u64) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

impl fmt::Display for SignalDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == 1 {
            write!(f, "logic {};", self.name)
        } else {
            write!(f, "logic [{}:0] {};", self.width - 1, self.name)
        }
    }
}

/// A continuous assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombAssign {
    /// The assigned signal, bit, or slice.
    pub target: RtlExpr,
    /// The driven value.
    pub value: RtlExpr,
}

impl CombAssign {
    /// Creates a continuous assignment.
    pub fn new(target: RtlExpr, value: RtlExpr) -> Self {
        Self { target, value }
    }
}

impl fmt::Display for CombAssign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "assign {} = {};", self.target, self.value)
    }
}

/// A combinational fragment: either a single assignment or a generate-for
/// loop over an array dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombItem {
    /// A continuous assignment.
    Assign(CombAssign),
    /// A generate-for loop.
    For(GenFor),
}

impl CombItem {
    /// Sugar for a single assignment item.
    pub fn assign(target: RtlExpr, value: RtlExpr) -> Self {
        CombItem::Assign(CombAssign::new(target, value))
    }
}

/// A generate-for loop introducing one free index variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenFor {
    /// The genvar name.
    pub var: String,
    /// The iteration count.
    pub count: u64,
    /// The loop body.
    pub body: Vec<CombItem>,
}

impl GenFor {
    /// Wraps `items` in one loop per dimension, outermost first, with
    /// index variables numbered from `first`. No dimensions returns the
    /// items unchanged.
    pub fn nest(dims: &[u32], first: u32, items: Vec<CombItem>) -> Vec<CombItem> {
        let mut body = items;
        for (k, &d) in dims.iter().enumerate().rev() {
            body = vec![CombItem::For(GenFor {
                var: format!("i{}", first + k as u32),
                count: u64::from(d),
                body,
            })];
        }
        body
    }
}

fn pad(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("    ")?;
    }
    Ok(())
}

fn write_comb(item: &CombItem, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    match item {
        CombItem::Assign(a) => {
            pad(f, depth)?;
            writeln!(f, "{a}")
        }
        CombItem::For(gf) => {
            pad(f, depth)?;
            writeln!(
                f,
                "for (genvar {v} = 0; {v} < {c}; {v}++) begin",
                v = gf.var,
                c = gf.count
            )?;
            for inner in &gf.body {
                write_comb(inner, f, depth + 1)?;
            }
            pad(f, depth)?;
            writeln!(f, "end")
        }
    }
}

impl fmt::Display for CombItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_comb(self, f, 0)
    }
}

/// One arm of a sequential priority chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfArm {
    /// The guard condition.
    pub cond: RtlExpr,
    /// Statements executed when the guard holds.
    pub body: Vec<SeqStmt>,
}

/// A sequential if/else-if priority chain. The first arm whose guard holds
/// wins; the optional else runs when no guard does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfStmt {
    /// Guarded arms in priority order.
    pub arms: Vec<IfArm>,
    /// The terminal else body; empty means no else.
    pub else_body: Vec<SeqStmt>,
}

/// A statement inside a sequential block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeqStmt {
    /// A non-blocking assignment.
    NonBlocking {
        /// The assigned signal, bit, or slice.
        target: RtlExpr,
        /// The next value.
        value: RtlExpr,
    },
    /// A priority chain of guarded assignments.
    If(IfStmt),
    /// A procedural loop over array elements.
    For {
        /// The loop variable name.
        var: String,
        /// The iteration count.
        count: u64,
        /// The loop body.
        body: Vec<SeqStmt>,
    },
}

impl SeqStmt {
    /// Sugar for a non-blocking assignment.
    pub fn assign(target: RtlExpr, value: RtlExpr) -> Self {
        SeqStmt::NonBlocking { target, value }
    }

    /// Wraps `body` in one procedural loop per dimension, outermost
    /// first, with index variables numbered from `i0`. No dimensions
    /// returns the body unchanged.
    pub fn nest(dims: &[u32], body: Vec<SeqStmt>) -> Vec<SeqStmt> {
        let mut b = body;
        for (k, &d) in dims.iter().enumerate().rev() {
            b = vec![SeqStmt::For {
                var: format!("i{k}"),
                count: u64::from(d),
                body: b,
            }];
        }
        b
    }
}

/// The reset branch of a sequential block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqReset {
    /// The reset signal name.
    pub signal: String,
    /// The reset asserts low.
    pub active_low: bool,
    /// The reset participates in the sensitivity list.
    pub is_async: bool,
    /// Assignments applied under reset.
    pub body: Vec<SeqStmt>,
}

/// One clocked process. Reset, when present, dominates every other
/// condition in the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqBlock {
    /// The clock signal name.
    pub clock: String,
    /// The reset branch, absent for storage without reset.
    pub reset: Option<SeqReset>,
    /// The non-reset body.
    pub body: Vec<SeqStmt>,
}

fn write_seq(stmt: &SeqStmt, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    match stmt {
        SeqStmt::NonBlocking { target, value } => {
            pad(f, depth)?;
            writeln!(f, "{target} <= {value};")
        }
        SeqStmt::If(chain) => {
            // Without arms the chain degenerates to its else body.
            if chain.arms.is_empty() {
                for s in &chain.else_body {
                    write_seq(s, f, depth)?;
                }
                return Ok(());
            }
            for (i, arm) in chain.arms.iter().enumerate() {
                pad(f, depth)?;
                if i == 0 {
                    writeln!(f, "if ({}) begin", arm.cond)?;
                } else {
                    writeln!(f, "end else if ({}) begin", arm.cond)?;
                }
                for s in &arm.body {
                    write_seq(s, f, depth + 1)?;
                }
            }
            if !chain.else_body.is_empty() {
                pad(f, depth)?;
                writeln!(f, "end else begin")?;
                for s in &chain.else_body {
                    write_seq(s, f, depth + 1)?;
                }
            }
            pad(f, depth)?;
            writeln!(f, "end")
        }
        SeqStmt::For { var, count, body } => {
            pad(f, depth)?;
            writeln!(
                f,
                "for (int unsigned {var} = 0; {var} < {count}; {var}++) begin"
            )?;
            for s in body {
                write_seq(s, f, depth + 1)?;
            }
            pad(f, depth)?;
            writeln!(f, "end")
        }
    }
}

impl fmt::Display for SeqStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_seq(self, f, 0)
    }
}

impl fmt::Display for SeqBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reset {
            Some(rst) if rst.is_async => {
                let edge = if rst.active_low { "negedge" } else { "posedge" };
                writeln!(
                    f,
                    "always_ff @(posedge {} or {} {}) begin",
                    self.clock, edge, rst.signal
                )?;
            }
            _ => writeln!(f, "always_ff @(posedge {}) begin", self.clock)?,
        }
        match &self.reset {
            Some(rst) => {
                let assert = if rst.active_low {
                    format!("!{}", rst.signal)
                } else {
                    rst.signal.clone()
                };
                pad(f, 1)?;
                writeln!(f, "if ({assert}) begin")?;
                for s in &rst.body {
                    write_seq(s, f, 2)?;
                }
                pad(f, 1)?;
                writeln!(f, "end else begin")?;
                for s in &self.body {
                    write_seq(s, f, 2)?;
                }
                pad(f, 1)?;
                writeln!(f, "end")?;
            }
            None => {
                for s in &self.body {
                    write_seq(s, f, 1)?;
                }
            }
        }
        writeln!(f, "end")
    }
}

/// Port direction at the generated block boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDir {
    /// Driven by the surrounding hardware.
    In,
    /// Driven by the generated block.
    Out,
}

/// One port of the generated block's hardware interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// The canonical port name.
    pub name: String,
    /// The direction.
    pub dir: PortDir,
    /// Total width in bits.
    pub width: u64,
}

impl Port {
    /// Creates an input port.
    pub fn input(name: impl Into<String>, width: u64) -> Self {
        Self {
            name: name.into(),
            dir: PortDir::In,
            width,
        }
    }

    /// Creates an output port.
    pub fn output(name: impl Into<String>, width: u64) -> Self {
        Self {
            name: name.into(),
            dir: PortDir::Out,
            width,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.dir {
            PortDir::In => "input",
            PortDir::Out => "output",
        };
        if self.width == 1 {
            write!(f, "{dir} logic {}", self.name)
        } else {
            write!(f, "{dir} logic [{}:0] {}", self.width - 1, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_rendering() {
        let e = RtlExpr::var("cpuif_req").logic_and(
            RtlExpr::var("cpuif_addr").equals(RtlExpr::lit(0x10, 12)),
        );
        assert_eq!(format!("{e}"), "cpuif_req && (cpuif_addr == 12'h10)");
    }

    #[test]
    fn unary_wraps_compound_operand() {
        let e = RtlExpr::var("a").bit_and(RtlExpr::var("b")).not();
        assert_eq!(format!("{e}"), "~(a & b)");
        let e2 = RtlExpr::var("a").not().bit_and(RtlExpr::var("b"));
        assert_eq!(format!("{e2}"), "~a & b");
    }

    #[test]
    fn index_and_slice() {
        let idx = RtlExpr::var("i0")
            .mul(RtlExpr::num(2))
            .add(RtlExpr::num(1));
        let e = RtlExpr::var("strb").index(idx);
        assert_eq!(format!("{e}"), "strb[(i0 * 2) + 1]");
        let s = RtlExpr::var("data").slice(RtlExpr::num(8), 4);
        assert_eq!(format!("{s}"), "data[8 +: 4]");
    }

    #[test]
    fn ternary_and_concat() {
        let e = RtlExpr::ternary(
            RtlExpr::var("sel"),
            RtlExpr::var("a"),
            RtlExpr::lit(0, 32),
        );
        assert_eq!(format!("{e}"), "sel ? a : 32'h0");
        let c = RtlExpr::concat(vec![RtlExpr::lit(0, 24), RtlExpr::var("f")]);
        assert_eq!(format!("{c}"), "{24'h0, f}");
    }

    #[test]
    fn single_part_concat_unwraps() {
        let c = RtlExpr::concat(vec![RtlExpr::var("solo")]);
        assert_eq!(format!("{c}"), "solo");
    }

    #[test]
    fn fold_helpers() {
        assert_eq!(format!("{}", RtlExpr::disjoin(vec![])), "0");
        assert_eq!(format!("{}", RtlExpr::conjoin(vec![])), "1");
        let ored = RtlExpr::disjoin(vec![RtlExpr::var("a"), RtlExpr::var("b")]);
        assert_eq!(format!("{ored}"), "a || b");
    }

    #[test]
    fn same_operator_chains_stay_flat() {
        let chain = RtlExpr::disjoin(vec![
            RtlExpr::var("a"),
            RtlExpr::var("b"),
            RtlExpr::var("c"),
        ]);
        assert_eq!(format!("{chain}"), "a || b || c");
        let mixed = RtlExpr::var("x")
            .bit_or(RtlExpr::var("y"))
            .bit_and(RtlExpr::var("z"));
        assert_eq!(format!("{mixed}"), "(x | y) & z");
    }

    #[test]
    fn decl_rendering() {
        assert_eq!(format!("{}", SignalDecl::new("flag", 1)), "logic flag;");
        assert_eq!(
            format!("{}", SignalDecl::new("decoded_reg_strb_regs", 8)),
            "logic [7:0] decoded_reg_strb_regs;"
        );
    }

    #[test]
    fn genfor_nesting() {
        let inner = CombItem::assign(
            RtlExpr::var("strb").index(RtlExpr::var("i0")),
            RtlExpr::var("req"),
        );
        let item = CombItem::For(GenFor {
            var: "i0".to_string(),
            count: 4,
            body: vec![inner],
        });
        let text = format!("{item}");
        assert_eq!(
            text,
            "for (genvar i0 = 0; i0 < 4; i0++) begin\n    assign strb[i0] = req;\nend\n"
        );
    }

    #[test]
    fn seq_block_async_low_reset() {
        let block = SeqBlock {
            clock: "clk".to_string(),
            reset: Some(SeqReset {
                signal: "rst_n".to_string(),
                active_low: true,
                is_async: true,
                body: vec![SeqStmt::assign(RtlExpr::var("q"), RtlExpr::lit(0, 8))],
            }),
            body: vec![SeqStmt::assign(RtlExpr::var("q"), RtlExpr::var("d"))],
        };
        let text = format!("{block}");
        assert!(text.starts_with("always_ff @(posedge clk or negedge rst_n) begin\n"));
        assert!(text.contains("    if (!rst_n) begin\n        q <= 8'h0;\n"));
        assert!(text.contains("    end else begin\n        q <= d;\n"));
    }

    #[test]
    fn seq_block_sync_high_reset() {
        let block = SeqBlock {
            clock: "clk".to_string(),
            reset: Some(SeqReset {
                signal: "rst".to_string(),
                active_low: false,
                is_async: false,
                body: vec![],
            }),
            body: vec![],
        };
        let text = format!("{block}");
        assert!(text.starts_with("always_ff @(posedge clk) begin\n"));
        assert!(text.contains("    if (rst) begin\n"));
    }

    #[test]
    fn seq_block_without_reset() {
        let block = SeqBlock {
            clock: "clk".to_string(),
            reset: None,
            body: vec![SeqStmt::assign(RtlExpr::var("q"), RtlExpr::var("d"))],
        };
        let text = format!("{block}");
        assert_eq!(
            text,
            "always_ff @(posedge clk) begin\n    q <= d;\nend\n"
        );
    }

    #[test]
    fn if_chain_rendering() {
        let chain = SeqStmt::If(IfStmt {
            arms: vec![
                IfArm {
                    cond: RtlExpr::var("a"),
                    body: vec![SeqStmt::assign(RtlExpr::var("q"), RtlExpr::num(1))],
                },
                IfArm {
                    cond: RtlExpr::var("b"),
                    body: vec![SeqStmt::assign(RtlExpr::var("q"), RtlExpr::num(2))],
                },
            ],
            else_body: vec![SeqStmt::assign(RtlExpr::var("q"), RtlExpr::num(3))],
        });
        let block = SeqBlock {
            clock: "clk".to_string(),
            reset: None,
            body: vec![chain],
        };
        let text = format!("{block}");
        assert!(text.contains("    if (a) begin\n        q <= 1;\n"));
        assert!(text.contains("    end else if (b) begin\n        q <= 2;\n"));
        assert!(text.contains("    end else begin\n        q <= 3;\n"));
    }

    #[test]
    fn armless_if_chain_renders_bare_else_body() {
        let chain = SeqStmt::If(IfStmt {
            arms: Vec::new(),
            else_body: vec![SeqStmt::assign(RtlExpr::var("q"), RtlExpr::num(3))],
        });
        assert_eq!(format!("{chain}"), "q <= 3;\n");

        let empty = SeqStmt::If(IfStmt {
            arms: Vec::new(),
            else_body: Vec::new(),
        });
        assert_eq!(format!("{empty}"), "");
    }

    #[test]
    fn port_rendering() {
        assert_eq!(
            format!("{}", Port::input("hwif_in_ctrl_mode_next", 4)),
            "input logic [3:0] hwif_in_ctrl_mode_next"
        );
        assert_eq!(
            format!("{}", Port::output("hwif_out_status_intr", 1)),
            "output logic hwif_out_status_intr"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let e = RtlExpr::var("a").bit_or(RtlExpr::lit(3, 4));
        let json = serde_json::to_string(&e).unwrap();
        let back: RtlExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
