use crate::error::EvalError;
use crate::sequence::Sequence;
use crate::types::{Arity, FunctionDefinition};
use crate::value::Value;
use std::sync::Arc;

pub fn functions(sequence: Arc<Sequence>) -> Vec<FunctionDefinition> {
    vec![FunctionDefinition::new(
        "counter",
        "a number increasing by step on each call, starting at start",
        move |args| {
            let start = args.opt_int(1)?.unwrap_or(0);
            let step = args.opt_int(2)?.unwrap_or(1);
            Ok::<_, EvalError>(Value::Int(sequence.next(start, step)))
        },
    )
    .with_args(&["start", "step"])
    .with_arity(Arity::Range(0, Some(2)))
    .with_example("counter[1]")
    .with_output("\"1\"")]
}
