//! The stack machine running postfix instructions against a subject.

use crate::deferred::DeferredCall;
use crate::error::{EvalError, ParseError};
use crate::eval_ctx::EvalCtx;
use crate::instruction::{display_sequence, Instruction};
use crate::lexer::BinaryOp;
use crate::operand::{Operand, Subject};
use crate::reducer::reduce;
use crate::registry::Registry;
use crate::types::force_operand;
use crate::util;
use crate::value::Value;
use tracing::debug;

/// An expression compiled once and evaluated against many subjects.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    text: String,
    instructions: Vec<Instruction>,
}

impl Expression {
    /// Parses `text`. Function names are resolved against `registry` now;
    /// later registrations are not seen by this expression.
    pub fn parse(text: &str, registry: &Registry) -> Result<Self, ParseError> {
        let instructions = reduce(text, registry)?;
        debug!(expression = text, instructions = %display_sequence(&instructions), "parsed");
        Ok(Expression {
            text: text.to_string(),
            instructions,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn evaluate(&self, subject: &Subject, ctx: &mut EvalCtx) -> Result<Value, EvalError> {
        evaluate(&self.instructions, subject, ctx)
    }
}

/// Evaluation stack entries.
enum Item {
    Operand(Operand),
    /// A comma list. Elements stay unforced until the list is used.
    Tuple(Vec<Operand>),
    Args,
}

impl Item {
    fn force(self, ctx: &mut EvalCtx) -> Result<Value, EvalError> {
        match self {
            Item::Operand(operand) => force_operand(operand, ctx),
            Item::Tuple(items) => items
                .into_iter()
                .map(|operand| force_operand(operand, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Item::Args => Err(EvalError::StackImbalance(1)),
        }
    }

    /// The item as a single call argument. A comma list is forced into a
    /// list value.
    fn into_operand(self, ctx: &mut EvalCtx) -> Result<Operand, EvalError> {
        match self {
            Item::Operand(operand) => Ok(operand),
            other => other.force(ctx).map(Operand::Value),
        }
    }
}

fn pop(stack: &mut Vec<Item>) -> Result<Item, EvalError> {
    stack.pop().ok_or(EvalError::StackImbalance(0))
}

/// Runs `instructions` against `subject`.
///
/// Calls are pushed unforced. They run when an operator needs their value,
/// when an eager function receives them as an argument, or at the end. Lazy
/// functions get the unforced calls and decide themselves what to run.
pub fn evaluate(
    instructions: &[Instruction],
    subject: &Subject,
    ctx: &mut EvalCtx,
) -> Result<Value, EvalError> {
    let mut stack: Vec<Item> = Vec::new();
    for instruction in instructions {
        match instruction {
            Instruction::Push(value) => stack.push(Item::Operand(Operand::Value(value.clone()))),
            Instruction::Args => stack.push(Item::Args),
            Instruction::Neg => {
                let value = pop(&mut stack)?.force(ctx)?;
                stack.push(Item::Operand(Operand::Value(util::neg(&value)?)));
            }
            Instruction::Call(callee) => {
                let args = if matches!(stack.last(), Some(Item::Args)) {
                    stack.pop();
                    match pop(&mut stack)? {
                        Item::Tuple(items) => items,
                        item => vec![item.into_operand(ctx)?],
                    }
                } else {
                    Vec::new()
                };
                let call = DeferredCall::new(callee.0.clone(), subject.to_operand(), args);
                stack.push(Item::Operand(call.into()));
            }
            Instruction::Binary(BinaryOp::Dot) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?.into_operand(ctx)?;
                let Item::Operand(Operand::Deferred(mut call)) = right else {
                    return Err(EvalError::NotCallable);
                };
                call.bind_subject(left);
                stack.push(Item::Operand(Operand::Deferred(call)));
            }
            Instruction::Binary(BinaryOp::Comma) => {
                let right = pop(&mut stack)?.into_operand(ctx)?;
                let items = match pop(&mut stack)? {
                    Item::Tuple(mut items) => {
                        items.push(right);
                        items
                    }
                    left => vec![left.into_operand(ctx)?, right],
                };
                stack.push(Item::Tuple(items));
            }
            Instruction::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?.force(ctx)?;
                let right = right.force(ctx)?;
                let value = util::binary(*op, &left, &right, ctx)?;
                stack.push(Item::Operand(Operand::Value(value)));
            }
        }
    }
    let result = pop(&mut stack)?.force(ctx)?;
    if !stack.is_empty() {
        return Err(EvalError::StackImbalance(stack.len() + 1));
    }
    Ok(result)
}
