//! Resolved parameter values.

use serde::{Deserialize, Serialize};
use veld_ast::TypeRef;

/// The resolved value of a parameter symbol.
///
/// `Invalid` marks a value that failed to evaluate, or a parameter of an
/// uninstantiated body where evaluation is deliberately short-circuited so
/// that no further diagnostics cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    /// An integral value parameter.
    Int(i64),
    /// A resolved type parameter.
    Type(TypeRef),
    /// Evaluation failed or was suppressed.
    Invalid,
}

impl ParamValue {
    /// Returns the integral value, if this is a valid `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `true` if this value failed to evaluate.
    pub fn is_invalid(&self) -> bool {
        matches!(self, ParamValue::Invalid)
    }
}
