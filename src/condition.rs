//! xcspec `Condition` parser and evaluator.
//!
//! Option descriptors may carry a condition that decides whether the option
//! contributes any flags, for example:
//!
//! - `$(GCC_GENERATE_DEBUGGING_SYMBOLS) == YES`
//! - `$(COMPILER_INDEX_STORE_ENABLE) == YES || ( $(COMPILER_INDEX_STORE_ENABLE) == Default && $(GCC_OPTIMIZATION_LEVEL) == 0 )`
//! - `$(MACH_O_TYPE) != mh_object`
//!
//! `$(VAR)` references are expanded with [`crate::vars`] first; the grammar
//! below only ever sees the expanded text. Uses [`chumsky`] for parsing.
//!
//! ## Grammar
//!
//! ```text
//! expr     = or_expr
//! or_expr  = and_expr ('||' and_expr)*
//! and_expr = equality ('&&' equality)*
//! equality = operand (('==' | '!=') operand)?
//! operand  = literal | quoted | '(' expr ')'
//! literal  = [A-Za-z0-9_.+-]+          (YES / NO are booleans)
//! quoted   = "'" chars "'" | '"' chars '"'   (so are 'YES' / "NO")
//! ```
//!
//! Anything that does not fit the grammar (an operand that expanded to
//! nothing, unbalanced parentheses, a chained `a == b == c`) makes the
//! condition evaluate to `false`.

use chumsky::prelude::*;
use log::debug;

use crate::BuildSettings;
use crate::vars::expand_vars;

// ═══════════════════════════════════════════════════════════════════════════════
//  AST
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Value(Value),
    /// `lhs == rhs` or `lhs != rhs`.
    Compare {
        lhs: Box<Expression>,
        op: CompareOp,
        rhs: Box<Expression>,
    },
    /// `a && b`
    And(Box<Expression>, Box<Expression>),
    /// `a || b`
    Or(Box<Expression>, Box<Expression>),
}

/// Comparison operator used inside an [`Expression::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

/// A literal operand, or the result of evaluating a sub-expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `YES` / `NO`, quoted or not, or the outcome of a comparison.
    Bool(bool),
    /// Any other literal, unquoted or quoted.
    Str(String),
}

impl Value {
    fn from_literal(s: &str) -> Self {
        match s {
            "YES" => Value::Bool(true),
            "NO" => Value::Bool(false),
            _ => Value::Str(s.to_string()),
        }
    }

    /// Only `NO` (and a false comparison) is falsy. A bare string literal
    /// counts as true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Chumsky parser
// ═══════════════════════════════════════════════════════════════════════════════

fn is_literal_char(c: &char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.')
}

/// Build the chumsky parser for condition expressions.
fn condition_parser<'a>() -> impl Parser<'a, &'a str, Expression, extra::Err<Simple<'a, char>>> {
    recursive(|expr| {
        // ── Quoted strings; `""` and `''` both mean the empty string ─────
        let single_quoted = just('\'')
            .ignore_then(none_of('\'').repeated().to_slice())
            .then_ignore(just('\''));
        let double_quoted = just('"')
            .ignore_then(none_of('"').repeated().to_slice())
            .then_ignore(just('"'));
        let quoted = single_quoted
            .or(double_quoted)
            .map(|s: &str| Expression::Value(Value::from_literal(s)));

        // ── Bare literal: YES, NO, Default, mh_object, 10.15, c++ ... ───
        let literal = any()
            .filter(is_literal_char)
            .repeated()
            .at_least(1)
            .to_slice()
            .map(|s: &str| Expression::Value(Value::from_literal(s)));

        // ── Parenthesized expression ─────────────────────────────────────
        let paren_expr = expr.delimited_by(just('(').padded(), just(')').padded());

        let operand = choice((literal, quoted, paren_expr)).padded();

        // ── Equality: at most one operator per operand pair ──────────────
        let cmp_op = just("==")
            .to(CompareOp::Equal)
            .or(just("!=").to(CompareOp::NotEqual));

        let equality = operand
            .clone()
            .then(cmp_op.padded().then(operand).or_not())
            .map(|(lhs, rest)| match rest {
                Some((op, rhs)) => Expression::Compare {
                    lhs: Box::new(lhs),
                    op,
                    rhs: Box::new(rhs),
                },
                None => lhs,
            });

        // ── '&&' binds tighter than '||' ─────────────────────────────────
        let and_expr = equality.clone().foldl(
            just("&&").padded().ignore_then(equality).repeated(),
            |lhs, rhs| Expression::And(Box::new(lhs), Box::new(rhs)),
        );

        and_expr.clone().foldl(
            just("||").padded().ignore_then(and_expr).repeated(),
            |lhs, rhs| Expression::Or(Box::new(lhs), Box::new(rhs)),
        )
    })
}

/// Parse an already-expanded condition string into an [`Expression`].
pub fn parse_condition(input: &str) -> Result<Expression, String> {
    condition_parser()
        .parse(input)
        .into_result()
        .map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|e| format!("{e}")).collect();
            format!(
                "Failed to parse condition '{}': {}",
                input,
                messages.join("; ")
            )
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Evaluation
// ═══════════════════════════════════════════════════════════════════════════════

fn evaluate_value(expr: &Expression) -> Value {
    match expr {
        Expression::Value(v) => v.clone(),
        Expression::Compare { lhs, op, rhs } => {
            let l = evaluate_value(lhs);
            let r = evaluate_value(rhs);
            match op {
                CompareOp::Equal => Value::Bool(l == r),
                CompareOp::NotEqual => Value::Bool(l != r),
            }
        }
        Expression::And(a, b) => {
            let l = evaluate_value(a);
            if l.is_truthy() { evaluate_value(b) } else { l }
        }
        Expression::Or(a, b) => {
            let l = evaluate_value(a);
            if l.is_truthy() { l } else { evaluate_value(b) }
        }
    }
}

/// Evaluate a parsed condition.
pub fn evaluate(expr: &Expression) -> bool {
    evaluate_value(expr).is_truthy()
}

/// Expand, parse and evaluate an optional condition against `settings`.
///
/// No condition means `true`. A condition that cannot be parsed after
/// expansion means `false`.
pub fn check_condition(condition: Option<&str>, settings: &BuildSettings) -> bool {
    let Some(condition) = condition else {
        return true;
    };

    let expanded = expand_vars(condition, settings);
    match parse_condition(&expanded) {
        Ok(expr) => evaluate(&expr),
        Err(message) => {
            debug!("{message} (from '{condition}'); treating as false");
            false
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
