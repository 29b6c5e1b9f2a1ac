//! Coercion rules and operator semantics.

use crate::error::EvalError;
use crate::eval_ctx::EvalCtx;
use crate::lexer::BinaryOp;
use crate::value::Value;
use std::cmp::Ordering;
use std::path::Path;

// ----------------------------------------------------------------- Coercion

/// Parses text as a number: float if it contains a decimal point, integer
/// otherwise. Never defaults to zero.
pub fn parse_number(text: &str) -> Result<Value, EvalError> {
    let trimmed = text.trim();
    let parsed = if trimmed.contains('.') {
        trimmed.parse::<f64>().ok().map(Value::Float)
    } else {
        trimmed.parse::<i64>().ok().map(Value::Int)
    };
    parsed.ok_or_else(|| EvalError::NotANumber(text.to_string()))
}

/// Coerces a value to `Int` or `Float`.
pub fn to_number(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Int(_) | Value::Float(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Str(s) => parse_number(s),
        Value::Absent | Value::List(_) => Err(EvalError::NotNumeric(value.type_name())),
    }
}

pub fn to_int(value: &Value) -> Result<i64, EvalError> {
    match to_number(value)? {
        Value::Float(x) => Ok(x.trunc() as i64),
        Value::Int(n) => Ok(n),
        _ => unreachable!("to_number returns numbers"),
    }
}

pub fn to_float(value: &Value) -> Result<f64, EvalError> {
    match to_number(value)? {
        Value::Float(x) => Ok(x),
        Value::Int(n) => Ok(n as f64),
        _ => unreachable!("to_number returns numbers"),
    }
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_) | Value::Bool(_))
}

// -------------------------------------------------------------- Arithmetic

fn arith(
    a: &Value,
    b: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match (to_number(a)?, to_number(b)?) {
        (Value::Int(x), Value::Int(y)) => Ok(int_op(x, y)
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float(float_op(x as f64, y as f64)))),
        (x, y) => Ok(Value::Float(float_op(to_float(&x)?, to_float(&y)?))),
    }
}

pub fn neg(value: &Value) -> Result<Value, EvalError> {
    match to_number(value)? {
        Value::Int(n) => Ok(n.checked_neg().map(Value::Int).unwrap_or(Value::Float(-(n as f64)))),
        Value::Float(x) => Ok(Value::Float(-x)),
        _ => unreachable!("to_number returns numbers"),
    }
}

/// `+`: string concatenation for two strings, list concatenation for two
/// lists, numeric addition otherwise.
pub fn add(a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Value::Str(format!("{x}{y}"))),
        (Value::List(x), Value::List(y)) => Ok(Value::List(x.iter().chain(y).cloned().collect())),
        _ => arith(a, b, i64::checked_add, |x, y| x + y),
    }
}

pub fn sub(a: &Value, b: &Value) -> Result<Value, EvalError> {
    arith(a, b, i64::checked_sub, |x, y| x - y)
}

pub fn mul(a: &Value, b: &Value) -> Result<Value, EvalError> {
    arith(a, b, i64::checked_mul, |x, y| x * y)
}

/// `/`: path join for two strings; numeric division otherwise. Integer
/// division stays integer only when it is exact.
pub fn div(a: &Value, b: &Value) -> Result<Value, EvalError> {
    if let (Value::Str(x), Value::Str(y)) = (a, b) {
        return Ok(path_join(x, y));
    }
    match (to_number(a)?, to_number(b)?) {
        (_, Value::Int(0)) => Err(EvalError::DivisionByZero),
        (_, Value::Float(y)) if y == 0.0 => Err(EvalError::DivisionByZero),
        (Value::Int(x), Value::Int(y)) if x.checked_rem(y) == Some(0) => Ok(Value::Int(x / y)),
        (x, y) => Ok(Value::Float(to_float(&x)? / to_float(&y)?)),
    }
}

/// `\`: path join for two strings; floor division otherwise.
pub fn floor_div(a: &Value, b: &Value) -> Result<Value, EvalError> {
    if let (Value::Str(x), Value::Str(y)) = (a, b) {
        return Ok(path_join(x, y));
    }
    match (to_number(a)?, to_number(b)?) {
        (_, Value::Int(0)) => Err(EvalError::DivisionByZero),
        (_, Value::Float(y)) if y == 0.0 => Err(EvalError::DivisionByZero),
        (Value::Int(x), Value::Int(y)) if x.checked_div(y).is_some() => {
            let q = x / y;
            Ok(Value::Int(if x % y != 0 && (x < 0) != (y < 0) { q - 1 } else { q }))
        }
        (x, y) => Ok(Value::Float((to_float(&x)? / to_float(&y)?).floor())),
    }
}

/// `%`: remainder with the sign of the divisor.
pub fn rem(a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (to_number(a)?, to_number(b)?) {
        (_, Value::Int(0)) => Err(EvalError::DivisionByZero),
        (_, Value::Float(y)) if y == 0.0 => Err(EvalError::DivisionByZero),
        (Value::Int(x), Value::Int(y)) => {
            let r = x.wrapping_rem(y);
            Ok(Value::Int(if r != 0 && (r < 0) != (y < 0) { r + y } else { r }))
        }
        (x, y) => {
            let (x, y) = (to_float(&x)?, to_float(&y)?);
            Ok(Value::Float(x - y * (x / y).floor()))
        }
    }
}

pub fn pow(a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (to_number(a)?, to_number(b)?) {
        (Value::Int(x), Value::Int(y)) if y >= 0 => Ok(u32::try_from(y)
            .ok()
            .and_then(|y| x.checked_pow(y))
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float((x as f64).powf(y as f64)))),
        (x, y) => Ok(Value::Float(to_float(&x)?.powf(to_float(&y)?))),
    }
}

pub fn bit_and(a: &Value, b: &Value) -> Result<Value, EvalError> {
    Ok(Value::Int(to_int(a)? & to_int(b)?))
}

pub fn bit_or(a: &Value, b: &Value) -> Result<Value, EvalError> {
    Ok(Value::Int(to_int(a)? | to_int(b)?))
}

/// `:` concatenates the string forms of any two values.
pub fn concat(a: &Value, b: &Value) -> Value {
    Value::Str(format!("{a}{b}"))
}

pub fn path_join(a: &str, b: &str) -> Value {
    Value::Str(Path::new(a).join(b).to_string_lossy().into_owned())
}

// -------------------------------------------------------------- Comparison

/// Brings a string and a number to a common numeric type. Both sides come
/// back unchanged unless exactly one of them is a string.
fn coerce_mixed(a: &Value, b: &Value) -> Result<(Value, Value), EvalError> {
    match (a, b) {
        (Value::Str(_), _) if is_numeric(b) => Ok((to_number(a)?, b.clone())),
        (_, Value::Str(_)) if is_numeric(a) => Ok((a.clone(), to_number(b)?)),
        _ => Ok((a.clone(), b.clone())),
    }
}

/// Equality across types: numbers compare numerically (`1 == 1.0`), a
/// string against a number is coerced to a number, lists compare
/// element-wise, everything else by variant and content.
pub fn equals(a: &Value, b: &Value) -> Result<bool, EvalError> {
    if let (Value::List(x), Value::List(y)) = (a, b) {
        if x.len() != y.len() {
            return Ok(false);
        }
        for (x, y) in x.iter().zip(y) {
            if !equals(x, y)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }
    let (a, b) = coerce_mixed(a, b)?;
    if is_numeric(&a) && is_numeric(&b) {
        return Ok(compare(&a, &b)? == Ordering::Equal);
    }
    Ok(a == b)
}

/// Ordering for `< > <= >=`: numeric when either side is a number (a string
/// on the other side must parse as one), lexical on the string forms
/// otherwise.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    let (a, b) = coerce_mixed(a, b)?;
    Ok(match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        _ if is_numeric(&a) && is_numeric(&b) => {
            let x = to_float(&a)?;
            let y = to_float(&b)?;
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        _ => a.to_string().cmp(&b.to_string()),
    })
}

/// `~=`: full-string regex match of `a` against the pattern `b`.
pub fn regex_match(ctx: &mut EvalCtx, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let subject = a.to_string();
    let re = ctx.pattern(&b.to_string())?;
    Ok(Value::Bool(re.is_match(&subject)))
}

/// Applies a binary operator to two forced operands. `.` and `,` never reach
/// this point: they work on unforced stack items.
pub fn binary(op: BinaryOp, a: &Value, b: &Value, ctx: &mut EvalCtx) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Or => Ok(Value::Bool(a.is_truthy() || b.is_truthy())),
        BinaryOp::And => Ok(Value::Bool(a.is_truthy() && b.is_truthy())),
        BinaryOp::Eq => Ok(Value::Bool(equals(a, b)?)),
        BinaryOp::Ne => Ok(Value::Bool(!equals(a, b)?)),
        BinaryOp::Lt => Ok(Value::Bool(compare(a, b)? == Ordering::Less)),
        BinaryOp::Gt => Ok(Value::Bool(compare(a, b)? == Ordering::Greater)),
        BinaryOp::Le => Ok(Value::Bool(compare(a, b)? != Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(compare(a, b)? != Ordering::Less)),
        BinaryOp::Match => regex_match(ctx, a, b),
        BinaryOp::Add => add(a, b),
        BinaryOp::Sub => sub(a, b),
        BinaryOp::BitOr => bit_or(a, b),
        BinaryOp::Concat => Ok(concat(a, b)),
        BinaryOp::Pow => pow(a, b),
        BinaryOp::Div => div(a, b),
        BinaryOp::FloorDiv => floor_div(a, b),
        BinaryOp::Mul => mul(a, b),
        BinaryOp::BitAnd => bit_and(a, b),
        BinaryOp::Rem => rem(a, b),
        BinaryOp::Comma | BinaryOp::Dot => Err(EvalError::Unsupported {
            op: op.symbol(),
            left: a.type_name(),
            right: b.type_name(),
        }),
    }
}

// ----------------------------------------------------------------- Slicing

/// Slices by character with negative indices counting from the end. An
/// absent `to` means "to the end".
pub fn slice_chars(s: &str, from: i64, to: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let clamp = |i: i64| if i < 0 { (len + i).max(0) } else { i.min(len) };
    let start = clamp(from);
    let end = to.map_or(len, clamp);
    if start >= end {
        return String::new();
    }
    chars[start as usize..end as usize].iter().collect()
}

/// The `[from, to]` slicing convention of text functions: no arguments keeps
/// the whole text, `[i]` selects one character, `[i, j]` a range.
pub fn slice_range(from: Option<i64>, to: Option<i64>, given: usize) -> (i64, Option<i64>) {
    if given == 0 {
        return (0, None);
    }
    let start = from.unwrap_or(0);
    let end = match to {
        Some(to) => Some(to),
        None if given > 1 => None,
        // [-1] is the last character, not the empty range [-1, 0)
        None => match start.checked_add(1) {
            Some(0) => None,
            Some(end) => Some(end),
            None => Some(start),
        },
    };
    (start, end)
}
