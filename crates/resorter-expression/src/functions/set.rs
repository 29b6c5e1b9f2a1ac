use crate::error::EvalError;
use crate::operand::Operand;
use crate::types::{Arity, CallArgs, FunctionDefinition};
use crate::value::Value;

/// `f.set(v)`: runs the mutator of `f` with `f`'s own slots followed by `v`.
fn set_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let Some(Operand::Deferred(call)) = args.take(0) else {
        return Err(EvalError::function(
            "set",
            "needs a function on its left, as in name.set(\"new\")",
        ));
    };
    if !call.definition().has_mutator() {
        return Err(EvalError::NoMutator(call.name().to_string()));
    }
    if !args.ctx().mutation {
        return Ok(Value::Absent);
    }
    let extra: Vec<Operand> = (1..args.len()).filter_map(|i| args.take(i)).collect();
    (*call).force_mutator(extra, args.ctx())
}

pub fn functions() -> Vec<FunctionDefinition> {
    vec![FunctionDefinition::new("set", "call the mutator of the function on its left", set_eval)
        .with_args(&["value", "..."])
        .with_arity(Arity::Any)
        .lazy()
        .with_example("name.set(\"new\")")
        .with_output("\"\" (only applied by the fix action)")]
}
