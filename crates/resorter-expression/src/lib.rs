//! The resorter expression language.
//!
//! # Overview
//!
//! Expressions compute a value from a file: `name.up`, `mtime[%Y]/name`,
//! `if(size>1000, "big", "small")`. Text is tokenized against a function
//! [`Registry`], reduced to postfix [`Instruction`]s by a shunting-yard pass,
//! and run by a stack machine. Function calls are pushed as unforced
//! [`DeferredCall`]s, so lazy functions such as `if` only run the branch they
//! take.
//!
//! # Example
//!
//! ```
//! use resorter_expression::{EvalCtx, Expression, Registry, Sequence, Subject, Value};
//! use std::sync::Arc;
//!
//! let registry = Registry::standard(Arc::new(Sequence::new()));
//! let expr = Expression::parse("up.sub[0,4]", &registry).unwrap();
//! let mut ctx = EvalCtx::new();
//! let value = expr.evaluate(&Subject::scalar("some_PATH string"), &mut ctx).unwrap();
//!
//! assert_eq!(value, Value::from("SOME"));
//! ```

pub mod cache;
pub mod deferred;
pub mod error;
pub mod eval_ctx;
pub mod evaluate;
pub mod filter;
pub mod functions;
pub mod instruction;
pub mod lexer;
pub mod operand;
pub mod reducer;
pub mod registry;
pub mod sequence;
pub mod template;
pub mod types;
pub mod util;
pub mod value;

pub use cache::SlotCache;
pub use deferred::DeferredCall;
pub use error::{EvalError, ParseError};
pub use eval_ctx::EvalCtx;
pub use evaluate::{evaluate, Expression};
pub use filter::{CompareOp, Filter};
pub use instruction::{display_sequence, Instruction};
pub use lexer::{tokenize, BinaryOp, Lexer, Token};
pub use operand::{FileEntry, Operand, Subject};
pub use reducer::reduce;
pub use registry::Registry;
pub use sequence::Sequence;
pub use template::{Template, ABSENT_MARK};
pub use types::{Arity, CallArgs, FunctionDefinition};
pub use value::Value;
