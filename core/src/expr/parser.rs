//! PEST-based parser for step expressions
//!
//! Produces the small `Expr` tree evaluated by `eval`.

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::value::Val;
use super::EvalError;

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "expr/expression.pest"]
struct ExpressionParser;

type ParseResult<T> = Result<T, EvalError>;

fn parse_error(source: &str, message: impl Into<String>) -> EvalError {
    EvalError::Parse {
        expression: source.to_string(),
        message: message.into(),
    }
}

fn from_pest(source: &str, err: pest::error::Error<Rule>) -> EvalError {
    let column = match err.line_col {
        pest::error::LineColLocation::Pos((_, col)) => col,
        pest::error::LineColLocation::Span((_, col), _) => col,
    };
    parse_error(source, format!("{} at column {}", err.variant.message(), column))
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, source: &str) -> ParseResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| parse_error(source, "unexpected end of expression"))
}

/* ===================== Public API ===================== */

/// Deepest parenthesis / prefix operator nesting accepted before parsing
pub const MAX_NESTING: usize = 32;

/// Tallest expression tree the builder will produce
pub const MAX_TREE_DEPTH: usize = 256;

/// Parse an expression string into an AST
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    check_nesting(source)?;

    let mut pairs =
        ExpressionParser::parse(Rule::program, source).map_err(|e| from_pest(source, e))?;

    let program = next_pair(&mut pairs, source)?;
    let mut inner = program.into_inner();
    let expression = next_pair(&mut inner, source)?;
    build_expression(expression, source, 0)
}

/// Reject sources whose nesting would recurse too deeply in the parser.
/// Counts open parentheses plus the run of prefix operators in front of
/// the next operand; quoted text is skipped.
fn check_nesting(source: &str) -> ParseResult<()> {
    let mut parens = 0usize;
    let mut prefix = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in source.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '(' => parens += 1,
            ')' => {
                parens = parens.saturating_sub(1);
                prefix = 0;
            }
            '!' | '-' | '+' => prefix += 1,
            '"' | '\'' => {
                quote = Some(c);
                prefix = 0;
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.' => prefix = 0,
            _ => {}
        }

        if parens + prefix > MAX_NESTING {
            return Err(parse_error(
                source,
                format!("nesting deeper than {} levels", MAX_NESTING),
            ));
        }
    }
    Ok(())
}

/* ===================== AST Builder ===================== */

fn too_deep(source: &str) -> EvalError {
    parse_error(
        source,
        format!("expression tree deeper than {} levels", MAX_TREE_DEPTH),
    )
}

/// `depth` is the height of the node being built, counted from the root
fn build_expression(pair: Pair<Rule>, source: &str, depth: usize) -> ParseResult<Expr> {
    if depth > MAX_TREE_DEPTH {
        return Err(too_deep(source));
    }

    match pair.as_rule() {
        Rule::expression | Rule::primary | Rule::literal => {
            let mut inner = pair.into_inner();
            build_expression(next_pair(&mut inner, source)?, source, depth)
        }
        Rule::logical_or_expr
        | Rule::logical_and_expr
        | Rule::equality_expr
        | Rule::comparison_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => build_binary_expr(pair, source, depth),
        Rule::unary_expr => {
            let mut inner = pair.into_inner();
            let first = next_pair(&mut inner, source)?;

            let op = match first.as_rule() {
                Rule::op_not => UnaryOp::Not,
                Rule::op_neg => UnaryOp::Neg,
                Rule::op_pos => UnaryOp::Plus,
                _ => return build_expression(first, source, depth),
            };
            let operand = build_expression(next_pair(&mut inner, source)?, source, depth + 1)?;
            Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            })
        }
        Rule::number => {
            let num_str = pair.as_str();
            let value = num_str.parse::<f64>().map_err(|e| {
                parse_error(source, format!("Failed to parse number '{}': {}", num_str, e))
            })?;
            Ok(Expr::Lit(Val::Num(value)))
        }
        Rule::string => {
            let mut inner = pair.into_inner();
            let content = next_pair(&mut inner, source)?;
            Ok(Expr::Lit(Val::Str(unescape(content.as_str()))))
        }
        Rule::boolean => Ok(Expr::Lit(Val::Bool(pair.as_str() == "true"))),
        Rule::null_lit => Ok(Expr::Lit(Val::Null)),
        Rule::identifier => Ok(Expr::Ident(pair.as_str().to_string())),
        rule => Err(parse_error(
            source,
            format!("Unexpected expression rule: {:?}", rule),
        )),
    }
}

/// Folds `a op b op c` left-associatively, so with `n` operators the first
/// operand ends up `n` levels below this node.
fn build_binary_expr(pair: Pair<Rule>, source: &str, depth: usize) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let operators = inner.clone().count() / 2;
    if depth + operators > MAX_TREE_DEPTH {
        return Err(too_deep(source));
    }

    let mut left = build_expression(next_pair(&mut inner, source)?, source, depth + operators)?;
    let mut remaining = operators;

    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_rule() {
            Rule::op_or => BinaryOp::Or,
            Rule::op_and => BinaryOp::And,
            Rule::op_strict_eq => BinaryOp::StrictEq,
            Rule::op_strict_ne => BinaryOp::StrictNe,
            Rule::op_eq => BinaryOp::Eq,
            Rule::op_ne => BinaryOp::Ne,
            Rule::op_lt => BinaryOp::Lt,
            Rule::op_lte => BinaryOp::Lte,
            Rule::op_gt => BinaryOp::Gt,
            Rule::op_gte => BinaryOp::Gte,
            Rule::op_add => BinaryOp::Add,
            Rule::op_sub => BinaryOp::Sub,
            Rule::op_mul => BinaryOp::Mul,
            Rule::op_div => BinaryOp::Div,
            Rule::op_mod => BinaryOp::Mod,
            rule => {
                return Err(parse_error(
                    source,
                    format!("Expected operator rule, got {:?}", rule),
                ))
            }
        };

        let right_pair = inner
            .next()
            .ok_or_else(|| parse_error(source, "Missing right operand after operator"))?;
        let right = build_expression(right_pair, source, depth + remaining)?;
        remaining -= 1;

        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }

    Ok(left)
}

/// Resolve backslash escapes inside a quoted literal
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
