//! Conditions. `if`, `any`, `all` and `not` are lazy: they force only the
//! slots they need, so the side effects of an untaken branch never happen.

use crate::error::EvalError;
use crate::types::{Arity, CallArgs, FunctionDefinition};
use crate::util;
use crate::value::Value;

fn if_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    // `cond.if(a[, b])` has the condition in slot 0, `if(cond, a[, b])` in slot 1
    let cond = first_argument(args);
    let then_slot = cond + 1;
    let else_slot = cond + 2;
    if args.value(cond)?.is_truthy() {
        args.value(then_slot)
    } else {
        Ok(args.get(else_slot)?.unwrap_or(Value::Absent))
    }
}

/// Slot 0 only counts as an argument on the right of a `.`.
fn first_argument(args: &CallArgs<'_>) -> usize {
    if args.is_chained() {
        0
    } else {
        1
    }
}

fn any_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    for i in first_argument(args)..args.len() {
        if args.value(i)?.is_truthy() {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn all_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    for i in first_argument(args)..args.len() {
        if !args.value(i)?.is_truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn in_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let needle = args.value(0)?;
    for candidate in args.rest(1)? {
        let items = match candidate {
            Value::List(items) => items,
            other => vec![other],
        };
        for item in &items {
            if util::equals(&needle, item)? {
                return Ok(Value::Bool(true));
            }
        }
    }
    Ok(Value::Bool(false))
}

fn not_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let last = args.len() - 1;
    Ok(Value::Bool(!args.value(last)?.is_truthy()))
}

fn none_eval(_: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    Ok(Value::Absent)
}

pub fn functions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition::new("if", "a if the condition holds, else b (or nothing)", if_eval)
            .with_args(&["condition", "a", "b"])
            .with_arity(Arity::Range(1, Some(3)))
            .lazy()
            .with_example("if(len>10, \"long\", \"short\")"),
        FunctionDefinition::new("any", "true if any argument is true", any_eval)
            .with_args(&["condition", "..."])
            .with_arity(Arity::Range(1, None))
            .lazy()
            .with_example("any(1>2, 2>1)"),
        FunctionDefinition::new("all", "true if every argument is true", all_eval)
            .with_args(&["condition", "..."])
            .with_arity(Arity::Range(1, None))
            .lazy()
            .with_example("all(1>2, 2>1)"),
        FunctionDefinition::new("in", "true if the value equals one of the arguments", in_eval)
            .with_args(&["value", "..."])
            .with_arity(Arity::Range(1, None))
            .with_example("\"jpg\".in(\"jpg\",\"png\")"),
        FunctionDefinition::new("not", "negation", not_eval)
            .with_args(&["condition"])
            .with_arity(Arity::Range(0, Some(1)))
            .lazy()
            .with_example("not(1>2)"),
        FunctionDefinition::new("none", "nothing, rendered as \"?\" in paths", none_eval)
            .with_arity(Arity::Fixed(0))
            .with_example("if(1>2, 1, none)"),
    ]
}
