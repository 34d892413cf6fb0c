//! Expression evaluation
//!
//! Walks an `Expr` tree. There is no environment: identifiers always fail,
//! which is what keeps evaluation sandboxed from host state.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::value::Val;
use super::EvalError;

/// Evaluate an expression to a value
pub fn eval(expr: &Expr) -> Result<Val, EvalError> {
    match expr {
        Expr::Lit(v) => Ok(v.clone()),

        Expr::Ident(name) => Err(EvalError::UnknownIdentifier(name.clone())),

        Expr::Unary { op, operand } => {
            let v = eval(operand)?;
            match op {
                UnaryOp::Not => Ok(Val::Bool(!v.is_truthy())),
                UnaryOp::Neg => unary_number("-", &v).map(|n| Val::Num(-n)),
                UnaryOp::Plus => unary_number("+", &v).map(Val::Num),
            }
        }

        Expr::Binary { op, left, right } => {
            let l = eval(left)?;

            // Short-circuit operators hand back an operand, not a boolean
            match op {
                BinaryOp::Or if l.is_truthy() => return Ok(l),
                BinaryOp::And if !l.is_truthy() => return Ok(l),
                BinaryOp::Or | BinaryOp::And => return eval(right),
                _ => {}
            }

            let r = eval(right)?;
            eval_binary(*op, l, r)
        }
    }
}

fn eval_binary(op: BinaryOp, l: Val, r: Val) -> Result<Val, EvalError> {
    match op {
        BinaryOp::StrictEq => Ok(Val::Bool(l == r)),
        BinaryOp::StrictNe => Ok(Val::Bool(l != r)),
        BinaryOp::Eq => Ok(Val::Bool(loose_eq(&l, &r))),
        BinaryOp::Ne => Ok(Val::Bool(!loose_eq(&l, &r))),

        BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => compare(op, &l, &r),

        BinaryOp::Add => match (&l, &r) {
            (Val::Str(_), _) | (_, Val::Str(_)) => Ok(Val::Str(format!("{}{}", l, r))),
            _ => numbers(op, &l, &r).map(|(a, b)| Val::Num(a + b)),
        },
        BinaryOp::Sub => numbers(op, &l, &r).map(|(a, b)| Val::Num(a - b)),
        BinaryOp::Mul => numbers(op, &l, &r).map(|(a, b)| Val::Num(a * b)),
        BinaryOp::Div => {
            let (a, b) = numbers(op, &l, &r)?;
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Val::Num(a / b))
        }
        BinaryOp::Mod => {
            let (a, b) = numbers(op, &l, &r)?;
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Val::Num(a % b))
        }

        BinaryOp::Or | BinaryOp::And => unreachable!("short-circuit operators handled in eval"),
    }
}

/// `==`: same-typed values compare directly, mixed scalars compare as numbers
fn loose_eq(l: &Val, r: &Val) -> bool {
    match (l, r) {
        (Val::Null, Val::Null) => true,
        (Val::Null, _) | (_, Val::Null) => false,
        (Val::Str(a), Val::Str(b)) => a == b,
        _ => match (l.to_number(), r.to_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn compare(op: BinaryOp, l: &Val, r: &Val) -> Result<Val, EvalError> {
    let ordering = match (l, r) {
        (Val::Str(a), Val::Str(b)) => a.partial_cmp(b),
        _ => {
            let (a, b) = numbers(op, l, r)?;
            a.partial_cmp(&b)
        }
    };

    // NaN never orders
    let Some(ordering) = ordering else {
        return Ok(Val::Bool(false));
    };

    let holds = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Lte => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    };
    Ok(Val::Bool(holds))
}

fn numbers(op: BinaryOp, l: &Val, r: &Val) -> Result<(f64, f64), EvalError> {
    match (l.to_number(), r.to_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(EvalError::TypeMismatch {
            op: op.symbol(),
            left: l.type_name(),
            right: r.type_name(),
        }),
    }
}

fn unary_number(op: &'static str, v: &Val) -> Result<f64, EvalError> {
    v.to_number().ok_or(EvalError::TypeMismatch {
        op,
        left: v.type_name(),
        right: v.type_name(),
    })
}
