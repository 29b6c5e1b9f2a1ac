use crate::error::EvalError;
use crate::types::{Arity, CallArgs, FunctionDefinition};
use crate::value::Value;

fn join_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let sep = args.opt_str(1)?.unwrap_or_else(|| "-".to_string());
    match args.value(0)? {
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(Value::to_string).collect();
            Ok(Value::Str(parts.join(&sep)))
        }
        other => Ok(Value::Str(other.to_string())),
    }
}

fn split_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let sep = args.opt_str(1)?.unwrap_or_else(|| "/".to_string());
    let text = args.str(0)?;
    if sep.is_empty() {
        return Ok(Value::List(text.chars().map(|c| Value::Str(c.to_string())).collect()));
    }
    Ok(Value::List(text.split(sep.as_str()).map(Value::from).collect()))
}

pub fn functions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition::new("join", "join list items with a separator (default \"-\")", join_eval)
            .with_args(&["separator"])
            .with_arity(Arity::Range(0, Some(1)))
            .with_example("(1,2,3).join"),
        FunctionDefinition::new("split", "split text on a separator (default \"/\")", split_eval)
            .with_args(&["separator"])
            .with_arity(Arity::Range(0, Some(1)))
            .with_example("split.join(\"+\")"),
    ]
}
