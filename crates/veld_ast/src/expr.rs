//! Constant-expression and type-reference nodes.
//!
//! The elaboration core only evaluates the constant subset of expressions
//! that parameter defaults, dimension ranges, and generate conditions need;
//! full expression semantics belong to a collaborator.

use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_source::Span;

/// A constant expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// An integer literal.
    IntLiteral {
        /// The literal value.
        value: i64,
        /// Source span.
        span: Span,
    },
    /// A simple identifier reference (a parameter or a net/variable name).
    Identifier {
        /// The referenced name.
        name: Ident,
        /// Source span.
        span: Span,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
        /// Source span.
        span: Span,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left-hand operand.
        lhs: Box<Expr>,
        /// Right-hand operand.
        rhs: Box<Expr>,
        /// Source span.
        span: Span,
    },
}

impl Expr {
    /// Returns the source span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLiteral { span, .. }
            | Expr::Identifier { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. } => *span,
        }
    }

    /// Convenience constructor for an integer literal with a dummy span.
    pub fn int(value: i64) -> Self {
        Expr::IntLiteral {
            value,
            span: Span::DUMMY,
        }
    }

    /// Convenience constructor for an identifier reference with a dummy span.
    pub fn ident(name: Ident) -> Self {
        Expr::Identifier {
            name,
            span: Span::DUMMY,
        }
    }
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`).
    Neg,
    /// Logical negation (`!`).
    LogNot,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// A `[msb:lsb]` range with constant bound expressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Range {
    /// The left (most significant) bound.
    pub msb: Expr,
    /// The right (least significant) bound.
    pub lsb: Expr,
    /// Source span.
    pub span: Span,
}

impl Range {
    /// Convenience constructor for a literal range with a dummy span.
    pub fn literal(msb: i64, lsb: i64) -> Self {
        Range {
            msb: Expr::int(msb),
            lsb: Expr::int(lsb),
            span: Span::DUMMY,
        }
    }
}

/// A reference to a type, used by type parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeRef {
    /// A named (user-defined) type.
    Named(Ident),
    /// The `logic` type, optionally with a packed width.
    Logic {
        /// Optional `[msb:lsb]` width, already constant-folded by the parser.
        width: Option<(i32, i32)>,
    },
    /// The `int` type.
    Int,
}
