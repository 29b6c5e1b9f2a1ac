use thiserror::Error;

/// Compile-time failure: the expression text cannot be turned into an
/// instruction sequence. Fatal for the expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at {pos} in \"{text}\"")]
    UnexpectedChar { ch: char, pos: usize, text: String },

    #[error("unterminated string in \"{0}\"")]
    UnterminatedString(String),

    #[error("unexpected '{token}' in \"{text}\"")]
    UnexpectedToken { token: String, text: String },

    #[error("unmatched '{bracket}' in \"{text}\"")]
    UnmatchedBracket { bracket: char, text: String },

    #[error("'{open}' closed by '{close}' in \"{text}\"")]
    MismatchedBracket { open: char, close: char, text: String },

    #[error("'{bracket}' is never closed in \"{text}\"")]
    UnclosedBracket { bracket: char, text: String },

    #[error("unknown function \"{name}\" in \"{text}\"")]
    UnknownFunction { name: String, text: String },

    #[error("missing operand for '{op}' in \"{text}\"")]
    MissingOperand { op: String, text: String },

    #[error("'.' must be followed by a function in \"{0}\"")]
    NotCallable(String),

    #[error("missing operator in \"{0}\"")]
    MissingOperator(String),

    #[error("empty expression")]
    EmptyExpression,

    #[error("unclosed '{{' in template \"{0}\"")]
    UnclosedGroup(String),

    #[error("invalid regular expression \"{pattern}\": {message}")]
    BadPattern { pattern: String, message: String },
}

/// Per-subject failure raised while running an instruction sequence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("cannot convert \"{0}\" to a number")]
    NotANumber(String),

    #[error("cannot use {0} as a number")]
    NotNumeric(&'static str),

    #[error("'{op}' is not defined for {left} and {right}")]
    Unsupported {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid regular expression \"{pattern}\": {message}")]
    BadPattern { pattern: String, message: String },

    #[error("\"{name}\" expects {expected}, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("\"{name}\" is missing argument {index}")]
    MissingArgument { name: String, index: usize },

    #[error("'.' needs a function call on its right side")]
    NotCallable,

    #[error("\"{0}\" has no mutator")]
    NoMutator(String),

    #[error("{name}: {message}")]
    Function { name: String, message: String },

    #[error("expression left {0} values on the stack")]
    StackImbalance(usize),
}

impl EvalError {
    /// Wraps a failure reported by a registry function.
    pub fn function(name: &str, message: impl std::fmt::Display) -> Self {
        EvalError::Function {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}
