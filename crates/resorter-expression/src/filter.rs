//! File filters: a regular expression, or `{expression}<op><value>`.

use crate::error::{EvalError, ParseError};
use crate::eval_ctx::EvalCtx;
use crate::evaluate::Expression;
use crate::operand::Subject;
use crate::registry::Registry;
use crate::util;
use crate::value::Value;
use regex::Regex;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    Match,
}

/// Longest lexemes first.
const COMPARE_OPS: &[(&str, CompareOp)] = &[
    ("==", CompareOp::Eq),
    (">=", CompareOp::Ge),
    ("<=", CompareOp::Le),
    ("~=", CompareOp::Match),
    ("=", CompareOp::Eq),
    (">", CompareOp::Gt),
    ("<", CompareOp::Lt),
];

#[derive(Debug, Clone)]
pub enum Filter {
    /// Full match against the subject's text.
    Regex(Regex),
    Expression {
        expr: Expression,
        op: CompareOp,
        value: String,
    },
}

/// Byte offset of the `}` closing the group opened at the start of `text`.
fn group_end(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices().skip(1) {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '}' => return Some(i),
            None => {}
        }
    }
    None
}

impl Filter {
    pub fn parse(text: &str, registry: &Registry) -> Result<Self, ParseError> {
        if !text.starts_with('{') {
            let re = Regex::new(&format!("^(?:{text})$")).map_err(|e| ParseError::BadPattern {
                pattern: text.to_string(),
                message: e.to_string(),
            })?;
            return Ok(Filter::Regex(re));
        }
        let end = group_end(text).ok_or_else(|| ParseError::UnclosedGroup(text.to_string()))?;
        let expr = Expression::parse(&text[1..end], registry)?;
        let rest = &text[end + 1..];
        let (lexeme, op) = COMPARE_OPS
            .iter()
            .find(|(lexeme, _)| rest.starts_with(lexeme))
            .ok_or_else(|| ParseError::UnexpectedToken {
                token: rest.to_string(),
                text: text.to_string(),
            })?;
        let value = rest[lexeme.len()..].to_string();
        if *op == CompareOp::Match {
            Regex::new(&value).map_err(|e| ParseError::BadPattern {
                pattern: value.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(Filter::Expression {
            expr,
            op: *op,
            value,
        })
    }

    pub fn matches(&self, subject: &Subject, ctx: &mut EvalCtx) -> Result<bool, EvalError> {
        match self {
            Filter::Regex(re) => Ok(re.is_match(&subject.text())),
            Filter::Expression { expr, op, value } => {
                let left = expr.evaluate(subject, ctx)?;
                compare(ctx, &left, *op, value)
            }
        }
    }
}

/// Numeric comparison when both sides are numbers, text comparison otherwise.
fn compare(ctx: &mut EvalCtx, left: &Value, op: CompareOp, right: &str) -> Result<bool, EvalError> {
    if op == CompareOp::Match {
        let re = ctx.pattern(right)?;
        return Ok(re.is_match(&left.to_string()));
    }
    let ordering = match (util::to_float(left), util::parse_number(right)) {
        (Ok(l), Ok(r)) => l.partial_cmp(&util::to_float(&r)?).unwrap_or(Ordering::Less),
        _ => left.to_string().as_str().cmp(right),
    };
    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Match => unreachable!("handled above"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Sequence;
    use std::sync::Arc;

    fn check(filter: &str, subject: &str) -> bool {
        let registry = Registry::standard(Arc::new(Sequence::new()));
        let filter = Filter::parse(filter, &registry).unwrap();
        filter
            .matches(&Subject::scalar(subject), &mut EvalCtx::new())
            .unwrap()
    }

    #[test]
    fn regex_filters_match_the_whole_text() {
        assert!(check(r".*\.jpg", "a/b.jpg"));
        assert!(!check(r"\.jpg", "a/b.jpg"));
    }

    #[test]
    fn expression_filters() {
        assert!(check("{len}>3", "abcd"));
        assert!(!check("{len}>3", "abc"));
        assert!(check("{len}=3", "abc"));
        assert!(check("{len}>=10", "abcdefghij"));
        // text comparison when a side is not a number
        assert!(check("{up}==ABC", "abc"));
        assert!(check("{low}<b", "A"));
        assert!(check("{up}~=A.C", "abc"));
        assert!(!check("{up}~=A", "abc"));
    }

    #[test]
    fn parse_errors() {
        let registry = Registry::new();
        assert!(matches!(Filter::parse("(a", &registry), Err(ParseError::BadPattern { .. })));
        assert!(matches!(Filter::parse("{1", &registry), Err(ParseError::UnclosedGroup(_))));
        assert!(matches!(Filter::parse("{1}!", &registry), Err(ParseError::UnexpectedToken { .. })));
    }
}
