//! Minimal constant evaluation for parameter values, dimension ranges, and
//! generate conditions.

use std::collections::HashMap;
use veld_ast::{BinaryOp, Expr, Range, UnaryOp};
use veld_common::Ident;
use veld_hier::{ConstantRange, ParamValue, ParamSym};

/// Constant-evaluation environment mapping parameter names to values.
#[derive(Debug, Clone, Default)]
pub struct ConstEnv {
    values: HashMap<Ident, ParamValue>,
}

impl ConstEnv {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an environment from resolved parameter symbols.
    pub fn from_params(params: &[ParamSym]) -> Self {
        let mut env = Self::new();
        for param in params {
            env.insert(param.name, param.value.clone());
        }
        env
    }

    /// Binds a name to a value.
    pub fn insert(&mut self, name: Ident, value: ParamValue) {
        self.values.insert(name, value);
    }

    /// Looks up a bound value.
    pub fn get(&self, name: Ident) -> Option<&ParamValue> {
        self.values.get(&name)
    }
}

/// Evaluates a constant integer expression.
///
/// Returns `None` when the expression references an unbound or non-integral
/// name, or divides by zero. The caller decides which diagnostic (if any)
/// the failure warrants.
pub fn eval_expr(expr: &Expr, env: &ConstEnv) -> Option<i64> {
    match expr {
        Expr::IntLiteral { value, .. } => Some(*value),
        Expr::Identifier { name, .. } => env.get(*name)?.as_int(),
        Expr::Unary { op, operand, .. } => {
            let v = eval_expr(operand, env)?;
            Some(match op {
                UnaryOp::Neg => v.wrapping_neg(),
                UnaryOp::LogNot => i64::from(v == 0),
            })
        }
        Expr::Binary { op, lhs, rhs, .. } => {
            let l = eval_expr(lhs, env)?;
            let r = eval_expr(rhs, env)?;
            Some(match op {
                BinaryOp::Add => l.wrapping_add(r),
                BinaryOp::Sub => l.wrapping_sub(r),
                BinaryOp::Mul => l.wrapping_mul(r),
                BinaryOp::Div => l.checked_div(r)?,
                BinaryOp::Mod => l.checked_rem(r)?,
                BinaryOp::Eq => i64::from(l == r),
                BinaryOp::Ne => i64::from(l != r),
                BinaryOp::Lt => i64::from(l < r),
                BinaryOp::Le => i64::from(l <= r),
                BinaryOp::Gt => i64::from(l > r),
                BinaryOp::Ge => i64::from(l >= r),
            })
        }
    }
}

/// Evaluates a `[msb:lsb]` dimension into a constant range.
///
/// Bounds must fit in `i32`.
pub fn eval_range(range: &Range, env: &ConstEnv) -> Option<ConstantRange> {
    let left = i32::try_from(eval_expr(&range.msb, env)?).ok()?;
    let right = i32::try_from(eval_expr(&range.lsb, env)?).ok()?;
    Some(ConstantRange { left, right })
}

/// Evaluates a generate condition: nonzero means taken.
pub fn eval_condition(expr: &Expr, env: &ConstEnv) -> Option<bool> {
    eval_expr(expr, env).map(|v| v != 0)
}
