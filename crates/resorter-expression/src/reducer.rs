//! Shunting-yard reduction of infix tokens to postfix instructions.

use crate::error::ParseError;
use crate::instruction::Instruction;
use crate::lexer::{BinaryOp, Lexer, Operator, Token, NEG_PRECEDENCE};
use crate::registry::Registry;
use crate::types::FunctionDefinition;
use crate::value::Value;
use std::iter::Peekable;
use std::sync::Arc;

/// Pending calls and argument markers bind tighter than every operator.
const CALL_PRECEDENCE: u8 = 7;

enum StackItem {
    Op(BinaryOp),
    Neg,
    Call(Arc<FunctionDefinition>),
    Args,
    Open(char),
}

impl StackItem {
    /// `None` for brackets, which stop popping.
    fn precedence(&self) -> Option<u8> {
        match self {
            StackItem::Op(op) => Some(op.precedence()),
            StackItem::Neg => Some(NEG_PRECEDENCE),
            StackItem::Call(_) | StackItem::Args => Some(CALL_PRECEDENCE),
            StackItem::Open(_) => None,
        }
    }

    fn into_instruction(self) -> Option<Instruction> {
        match self {
            StackItem::Op(op) => Some(Instruction::Binary(op)),
            StackItem::Neg => Some(Instruction::Neg),
            StackItem::Call(def) => Some(Instruction::call(def)),
            StackItem::Args => Some(Instruction::Args),
            StackItem::Open(_) => None,
        }
    }
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

struct Reducer<'a, I: Iterator<Item = Result<Token, ParseError>>> {
    text: &'a str,
    registry: &'a Registry,
    tokens: Peekable<I>,
    stack: Vec<StackItem>,
    output: Vec<Instruction>,
    prev: Option<Token>,
}

impl<'a, I: Iterator<Item = Result<Token, ParseError>>> Reducer<'a, I> {
    fn run(mut self) -> Result<Vec<Instruction>, ParseError> {
        while let Some(token) = self.tokens.next() {
            let token = token?;
            self.token(&token)?;
            self.prev = Some(token);
        }
        while let Some(item) = self.stack.pop() {
            if let StackItem::Open(bracket) = item {
                return Err(ParseError::UnclosedBracket {
                    bracket,
                    text: self.text.to_string(),
                });
            }
            self.output.extend(item.into_instruction());
        }
        Ok(self.output)
    }

    fn token(&mut self, token: &Token) -> Result<(), ParseError> {
        match token {
            Token::Int(n) => self.output.push(Instruction::Push(Value::Int(*n))),
            Token::Float(x) => self.output.push(Instruction::Push(Value::Float(*x))),
            Token::Str(s) => self.output.push(Instruction::Push(Value::Str(s.clone()))),
            Token::Identifier(name) => self.identifier(name)?,
            Token::Function(name) => {
                let def = self
                    .registry
                    .get(name)
                    .ok_or_else(|| self.unknown_function(name))?;
                self.stack.push(StackItem::Call(def));
            }
            // prefix operator: nothing to its left can be popped yet
            Token::Operator(Operator::Neg) => self.stack.push(StackItem::Neg),
            Token::Operator(Operator::Binary(op)) => {
                self.pop_while(op.precedence());
                self.stack.push(StackItem::Op(*op));
            }
            Token::Bracket(b @ ('(' | '[')) => {
                if matches!(self.prev, Some(Token::Function(_))) {
                    self.stack.push(StackItem::Args);
                }
                self.stack.push(StackItem::Open(*b));
            }
            Token::Bracket(b @ (')' | ']')) => self.close(*b)?,
            Token::Bracket(_) => {
                return Err(ParseError::UnexpectedToken {
                    token: token.to_string(),
                    text: self.text.to_string(),
                })
            }
        }
        Ok(())
    }

    /// A bareword that is not a function: a string literal, unless it is
    /// used where a call is expected.
    fn identifier(&mut self, name: &str) -> Result<(), ParseError> {
        let called = matches!(self.tokens.peek(), Some(Ok(Token::Bracket('(' | '['))));
        let chained = matches!(self.prev, Some(Token::Operator(Operator::Binary(BinaryOp::Dot))));
        if called || chained {
            return Err(self.unknown_function(name));
        }
        self.output.push(Instruction::Push(Value::Str(name.to_string())));
        Ok(())
    }

    fn pop_while(&mut self, precedence: u8) {
        while let Some(top) = self.stack.last() {
            match top.precedence() {
                Some(p) if p >= precedence => {}
                _ => break,
            }
            if let Some(instruction) = self.stack.pop().and_then(StackItem::into_instruction) {
                self.output.push(instruction);
            }
        }
    }

    fn close(&mut self, close: char) -> Result<(), ParseError> {
        let empty = self.prev.as_ref().is_some_and(Token::is_opening);
        loop {
            match self.stack.pop() {
                None => {
                    return Err(ParseError::UnmatchedBracket {
                        bracket: close,
                        text: self.text.to_string(),
                    })
                }
                Some(StackItem::Open(open)) if closing_for(open) == close => break,
                Some(StackItem::Open(open)) => {
                    return Err(ParseError::MismatchedBracket {
                        open,
                        close,
                        text: self.text.to_string(),
                    })
                }
                Some(item) => self.output.extend(item.into_instruction()),
            }
        }
        // `f()` is `f`
        if empty && matches!(self.stack.last(), Some(StackItem::Args)) {
            self.stack.pop();
        }
        Ok(())
    }

    fn unknown_function(&self, name: &str) -> ParseError {
        ParseError::UnknownFunction {
            name: name.to_string(),
            text: self.text.to_string(),
        }
    }
}

/// What the evaluator would hold at a stack position.
#[derive(Clone, Copy, PartialEq)]
enum Slot {
    Value,
    Call,
    Args,
}

/// Replays the stack discipline of the evaluator without running anything,
/// so malformed operator sequences fail at parse time.
fn validate(text: &str, instructions: &[Instruction]) -> Result<(), ParseError> {
    let missing = |op: &str| ParseError::MissingOperand {
        op: op.to_string(),
        text: text.to_string(),
    };
    let mut stack: Vec<Slot> = Vec::new();
    let pop_operand = |stack: &mut Vec<Slot>, op: &str| match stack.pop() {
        Some(Slot::Args) | None => Err(missing(op)),
        Some(slot) => Ok(slot),
    };
    for instruction in instructions {
        match instruction {
            Instruction::Push(_) => stack.push(Slot::Value),
            Instruction::Args => stack.push(Slot::Args),
            Instruction::Neg => {
                pop_operand(&mut stack, "-")?;
                stack.push(Slot::Value);
            }
            Instruction::Binary(op) => {
                let right = pop_operand(&mut stack, op.symbol())?;
                pop_operand(&mut stack, op.symbol())?;
                if *op == BinaryOp::Dot {
                    if right != Slot::Call {
                        return Err(ParseError::NotCallable(text.to_string()));
                    }
                    stack.push(Slot::Call);
                } else {
                    stack.push(Slot::Value);
                }
            }
            Instruction::Call(callee) => {
                if stack.last() == Some(&Slot::Args) {
                    stack.pop();
                    pop_operand(&mut stack, callee.name())?;
                }
                stack.push(Slot::Call);
            }
        }
    }
    match stack.len() {
        0 => Err(ParseError::EmptyExpression),
        1 => Ok(()),
        _ => Err(ParseError::MissingOperator(text.to_string())),
    }
}

/// Reduces expression text to a validated postfix instruction sequence.
pub fn reduce(text: &str, registry: &Registry) -> Result<Vec<Instruction>, ParseError> {
    let reducer = Reducer {
        text,
        registry,
        tokens: Lexer::new(text, registry).peekable(),
        stack: Vec::new(),
        output: Vec::new(),
        prev: None,
    };
    let instructions = reducer.run()?;
    validate(text, &instructions)?;
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::display_sequence;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        for name in ["func", "fonc"] {
            registry.register("Test", FunctionDefinition::new(name, "", |_| Ok(Value::Absent)));
        }
        registry
    }

    fn postfix(text: &str) -> String {
        display_sequence(&reduce(text, &registry()).unwrap())
    }

    fn fails(text: &str) -> ParseError {
        reduce(text, &registry()).unwrap_err()
    }

    #[test]
    fn precedence() {
        assert_eq!(postfix("2+3*4"), "[2,3,4,*,+]");
        assert_eq!(postfix("(2+3)*4"), "[2,3,+,4,*]");
        assert_eq!(postfix("1-2-3"), "[1,2,-,3,-]");
        assert_eq!(postfix("1=1||2<3"), "[1,1,==,2,3,<,||]");
        assert_eq!(postfix("1:2,3"), "[1,2,:,3,,]");
    }

    #[test]
    fn unary_minus() {
        assert_eq!(postfix("-1"), "[1,unary-minus]");
        assert_eq!(postfix("2*(-1)"), "[2,1,unary-minus,*]");
        assert_eq!(postfix("2*-1"), "[2,1,unary-minus,*]");
        assert_eq!(postfix("-2^3"), "[2,unary-minus,3,^]");
        assert_eq!(postfix("--1"), "[1,unary-minus,unary-minus]");
    }

    #[test]
    fn calls() {
        assert_eq!(postfix("func.fonc"), "[FUNC(func),FUNC(fonc),.]");
        assert_eq!(postfix("func[3]"), "[3,ARGS,FUNC(func)]");
        assert_eq!(postfix("func(1,2)"), "[1,2,,,ARGS,FUNC(func)]");
        assert_eq!(postfix("func()"), "[FUNC(func)]");
        assert_eq!(postfix("func.fonc[2]+1"), "[FUNC(func),2,ARGS,FUNC(fonc),.,1,+]");
        assert_eq!(postfix("func[m]"), "[\"m\",ARGS,FUNC(func)]");
    }

    #[test]
    fn brackets() {
        assert!(matches!(fails("(1"), ParseError::UnclosedBracket { bracket: '(', .. }));
        assert!(matches!(fails("1)"), ParseError::UnmatchedBracket { bracket: ')', .. }));
        assert!(matches!(
            fails("(1]"),
            ParseError::MismatchedBracket { open: '(', close: ']', .. }
        ));
        assert!(matches!(fails("{1}"), ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn malformed() {
        assert!(matches!(fails("1 +"), ParseError::MissingOperand { .. }));
        assert!(matches!(fails("* 2"), ParseError::MissingOperand { .. }));
        assert!(matches!(fails("1 2"), ParseError::MissingOperator(_)));
        assert_eq!(fails(""), ParseError::EmptyExpression);
        assert!(matches!(fails("func.3"), ParseError::NotCallable(_)));
        assert_eq!(
            fails("nope[1]"),
            ParseError::UnknownFunction {
                name: "nope".into(),
                text: "nope[1]".into()
            }
        );
        assert!(matches!(fails("func.nope"), ParseError::UnknownFunction { .. }));
    }
}
