//! # Expression evaluator
//!
//! Evaluates the text of `If` / `While` guards and computed `PutParam`
//! values. The grammar is deliberately small:
//!
//! - literals: numbers, `'single'` / `"double"` quoted strings, `true`,
//!   `false`, `null`
//! - arithmetic: `+ - * / %`, unary `-` and `+`, parentheses
//! - comparison: `< <= > >=`, loose `== !=` and strict `=== !==`
//! - logic: `&& || !` (short-circuiting, returning an operand)
//!
//! Expressions run in a sandbox: they see no variables. Parameters reach an
//! expression only through template expansion, which happens before parsing,
//! so `"${count} < 3"` arrives here as `"2 < 3"`.

mod ast;
mod eval;
mod parser;
mod value;


pub use ast::{BinaryOp, Expr, UnaryOp};
pub use parser::{parse_expression, MAX_NESTING, MAX_TREE_DEPTH};
pub use value::Val;

use thiserror::Error;

/// Expression parse / evaluation failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("cannot parse expression '{expression}': {message}")]
    Parse { expression: String, message: String },

    #[error("unknown identifier '{0}' (expressions cannot read variables; use ${{name}} templates)")]
    UnknownIdentifier(String),

    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,
}

/// Parse and evaluate an expression to its native value
pub fn evaluate(source: &str) -> Result<Val, EvalError> {
    let expr = parse_expression(source)?;
    eval::eval(&expr)
}

/// Parse and evaluate an expression, coerced to a boolean
pub fn evaluate_condition(source: &str) -> Result<bool, EvalError> {
    Ok(evaluate(source)?.is_truthy())
}
