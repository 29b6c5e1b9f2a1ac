use crate::error::EvalError;
use crate::types::{Arity, CallArgs, FunctionDefinition};
use crate::util;
use crate::value::Value;

fn round_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let number = args.number(0)?;
    let precision = args.opt_int(1)?.unwrap_or(0);
    match number {
        Value::Int(_) if precision >= 0 => Ok(number),
        _ => {
            let x = util::to_float(&number)?;
            let scale = 10f64.powi(precision.clamp(-300, 300) as i32);
            let rounded = (x * scale).round_ties_even() / scale;
            if precision > 0 {
                Ok(Value::Float(rounded))
            } else if rounded.is_finite() && rounded.abs() < i64::MAX as f64 {
                Ok(Value::Int(rounded as i64))
            } else {
                Ok(Value::Float(rounded))
            }
        }
    }
}

fn num_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    args.number(0)
}

pub fn functions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition::new("round", "round half to even to a number of decimals", round_eval)
            .with_args(&["precision"])
            .with_arity(Arity::Range(0, Some(1)))
            .with_example("3.14159.round[2]"),
        FunctionDefinition::new("num", "convert text to a number", num_eval)
            .with_arity(Arity::Fixed(0))
            .with_example("\"41\".num+1"),
    ]
}
