use crate::lexer::BinaryOp;
use crate::types::FunctionDefinition;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A function bound at parse time.
#[derive(Clone)]
pub struct Callee(pub Arc<FunctionDefinition>);

impl Callee {
    pub fn name(&self) -> &str {
        &self.0.name
    }
}

impl PartialEq for Callee {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl fmt::Debug for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FUNC({})", self.0.name)
    }
}

/// One postfix instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Push(Value),
    Neg,
    Binary(BinaryOp),
    Call(Callee),
    /// Marks the end of an argument list for the call that follows.
    Args,
}

impl Instruction {
    pub fn call(def: Arc<FunctionDefinition>) -> Self {
        Instruction::Call(Callee(def))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Push(Value::Str(s)) => write!(f, "{s:?}"),
            Instruction::Push(value) => write!(f, "{value}"),
            Instruction::Neg => f.write_str("unary-minus"),
            Instruction::Binary(op) => f.write_str(op.symbol()),
            Instruction::Call(callee) => write!(f, "FUNC({})", callee.name()),
            Instruction::Args => f.write_str("ARGS"),
        }
    }
}

/// Renders a sequence as `[2,3,4,*,+]`.
pub fn display_sequence(instructions: &[Instruction]) -> String {
    let parts: Vec<String> = instructions.iter().map(|i| i.to_string()).collect();
    format!("[{}]", parts.join(","))
}
