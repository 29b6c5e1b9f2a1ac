use crate::deferred::DeferredCall;
use crate::error::EvalError;
use crate::eval_ctx::EvalCtx;
use crate::operand::Operand;
use crate::util;
use crate::value::Value;
use std::fmt;
use std::path::PathBuf;

/// Function arity, counted over explicit arguments (the subject in slot 0 is
/// not counted).
#[derive(Debug, Clone, PartialEq)]
pub enum Arity {
    /// Skip the arity check.
    Any,
    /// Exactly `n` arguments.
    Fixed(usize),
    /// Between `min` and `max` arguments. `None` for max = unlimited.
    Range(usize, Option<usize>),
}

/// Checks the number of explicit arguments passed to `name`.
pub fn assert_arity(name: &str, arity: &Arity, got: usize) -> Result<(), EvalError> {
    let expected = match arity {
        Arity::Any => return Ok(()),
        Arity::Fixed(n) if got == *n => return Ok(()),
        Arity::Fixed(n) => format!("{n} arguments"),
        Arity::Range(min, max) => {
            if got >= *min && max.map_or(true, |max| got <= max) {
                return Ok(());
            }
            match max {
                Some(max) => format!("{min} to {max} arguments"),
                None => format!("at least {min} arguments"),
            }
        }
    };
    Err(EvalError::Arity {
        name: name.to_string(),
        expected,
        got,
    })
}

/// The signature shared by read functions and mutators.
pub type InvokeFn = dyn Fn(&mut CallArgs<'_>) -> Result<Value, EvalError> + Send + Sync;

/// A registry entry: a read capability, an optional write capability and the
/// metadata used by `--list-functions`.
pub struct FunctionDefinition {
    pub name: String,
    pub help: String,
    /// Names of the explicit arguments, for help output.
    pub args: Vec<String>,
    /// Example expression shown in verbose help.
    pub example: Option<String>,
    /// Example subject; `some/path/name.ext` when unset.
    pub source: Option<String>,
    /// Fixed example output for functions whose result depends on the disk.
    pub output: Option<String>,
    pub arity: Arity,
    /// Lazy functions receive their arguments unforced.
    pub lazy: bool,
    pub invoke: Box<InvokeFn>,
    pub mutate: Option<Box<InvokeFn>>,
}

impl FunctionDefinition {
    pub fn new<F>(name: &str, help: &str, invoke: F) -> Self
    where
        F: Fn(&mut CallArgs<'_>) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        FunctionDefinition {
            name: name.to_string(),
            help: help.to_string(),
            args: Vec::new(),
            example: None,
            source: None,
            output: None,
            arity: Arity::Any,
            lazy: false,
            invoke: Box::new(invoke),
            mutate: None,
        }
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_output(mut self, output: &str) -> Self {
        self.output = Some(output.to_string());
        self
    }

    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn with_mutator<F>(mut self, mutate: F) -> Self
    where
        F: Fn(&mut CallArgs<'_>) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.mutate = Some(Box::new(mutate));
        self
    }

    pub fn has_mutator(&self) -> bool {
        self.mutate.is_some()
    }
}

impl fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("lazy", &self.lazy)
            .field("mutate", &self.mutate.is_some())
            .finish()
    }
}

/// The argument slots of one invocation.
///
/// Slot 0 is the subject. Accessors force deferred slots on demand, so a lazy
/// function only pays for (and only triggers side effects of) the slots it
/// actually reads.
pub struct CallArgs<'a> {
    name: &'a str,
    slots: Vec<Operand>,
    ctx: &'a mut EvalCtx,
    chained: bool,
}

impl<'a> CallArgs<'a> {
    pub fn new(name: &'a str, slots: Vec<Operand>, ctx: &'a mut EvalCtx) -> Self {
        CallArgs {
            name,
            slots,
            ctx,
            chained: false,
        }
    }

    /// Marks slot 0 as the left side of a `.` chain.
    pub fn chained(mut self, chained: bool) -> Self {
        self.chained = chained;
        self
    }

    /// True for `left.f(...)`, false for `f(...)` on the evaluation subject.
    pub fn is_chained(&self) -> bool {
        self.chained
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Number of slots, subject included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ctx(&mut self) -> &mut EvalCtx {
        &mut *self.ctx
    }

    /// The raw slot, without forcing it.
    pub fn operand(&self, index: usize) -> Option<&Operand> {
        self.slots.get(index)
    }

    /// Removes a slot without forcing it, leaving `Absent` in its place.
    pub fn take(&mut self, index: usize) -> Option<Operand> {
        let slot = self.slots.get_mut(index)?;
        Some(std::mem::replace(slot, Operand::Value(Value::Absent)))
    }

    /// Forces slot `index` and returns its value. A file entry reads as its
    /// path. The forced result replaces the deferred call in the slot.
    pub fn get(&mut self, index: usize) -> Result<Option<Value>, EvalError> {
        let value = match self.slots.get(index) {
            None => return Ok(None),
            Some(Operand::Value(value)) => return Ok(Some(value.clone())),
            Some(Operand::Entry(entry)) => return Ok(Some(Value::Str(entry.path_str()))),
            Some(Operand::Deferred(_)) => {
                let slot = std::mem::replace(&mut self.slots[index], Operand::Value(Value::Absent));
                force_operand(slot, &mut *self.ctx)?
            }
        };
        self.slots[index] = Operand::Value(value.clone());
        Ok(Some(value))
    }

    pub fn value(&mut self, index: usize) -> Result<Value, EvalError> {
        self.get(index)?.ok_or_else(|| self.missing(index))
    }

    pub fn str(&mut self, index: usize) -> Result<String, EvalError> {
        Ok(self.value(index)?.to_string())
    }

    /// Like `str`, but a missing or `Absent` slot reads as `None`.
    pub fn opt_str(&mut self, index: usize) -> Result<Option<String>, EvalError> {
        Ok(self.get(index)?.filter(|v| !v.is_absent()).map(|v| v.to_string()))
    }

    pub fn int(&mut self, index: usize) -> Result<i64, EvalError> {
        util::to_int(&self.value(index)?)
    }

    pub fn opt_int(&mut self, index: usize) -> Result<Option<i64>, EvalError> {
        match self.get(index)? {
            None | Some(Value::Absent) => Ok(None),
            Some(v) => util::to_int(&v).map(Some),
        }
    }

    /// Numeric value of a slot: `Int` or `Float`.
    pub fn number(&mut self, index: usize) -> Result<Value, EvalError> {
        util::to_number(&self.value(index)?)
    }

    /// Path of a slot: the entry's path, or the slot's string value.
    pub fn path(&mut self, index: usize) -> Result<PathBuf, EvalError> {
        if let Some(Operand::Entry(entry)) = self.slots.get(index) {
            return Ok(entry.path().to_path_buf());
        }
        Ok(PathBuf::from(self.str(index)?))
    }

    /// Forces and returns every slot from `from` on.
    pub fn rest(&mut self, from: usize) -> Result<Vec<Value>, EvalError> {
        (from..self.slots.len()).map(|i| self.value(i)).collect()
    }

    pub fn into_slots(self) -> Vec<Operand> {
        self.slots
    }

    fn missing(&self, index: usize) -> EvalError {
        EvalError::MissingArgument {
            name: self.name.to_string(),
            index,
        }
    }
}

/// Forces every deferred slot. Used before handing slots to eager functions.
pub(crate) fn realize(slots: Vec<Operand>, ctx: &mut EvalCtx) -> Result<Vec<Operand>, EvalError> {
    slots
        .into_iter()
        .map(|slot| match slot {
            Operand::Deferred(call) => call.force(ctx).map(Operand::Value),
            other => Ok(other),
        })
        .collect()
}

/// Forces a single operand. A file entry reads as its path.
pub(crate) fn force_operand(operand: Operand, ctx: &mut EvalCtx) -> Result<Value, EvalError> {
    match operand {
        Operand::Value(value) => Ok(value),
        Operand::Entry(entry) => Ok(Value::Str(entry.path_str())),
        Operand::Deferred(call) => DeferredCall::force(*call, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_checks() {
        assert!(assert_arity("f", &Arity::Any, 7).is_ok());
        assert!(assert_arity("f", &Arity::Fixed(1), 1).is_ok());
        assert!(assert_arity("f", &Arity::Range(0, Some(2)), 2).is_ok());
        assert!(assert_arity("f", &Arity::Range(1, None), 5).is_ok());

        let err = assert_arity("up", &Arity::Fixed(0), 2).unwrap_err();
        assert_eq!(err.to_string(), "\"up\" expects 0 arguments, got 2");
        let err = assert_arity("if", &Arity::Range(2, Some(3)), 1).unwrap_err();
        assert_eq!(err.to_string(), "\"if\" expects 2 to 3 arguments, got 1");
    }

    #[test]
    fn missing_argument() {
        let mut ctx = EvalCtx::new();
        let mut args = CallArgs::new("sub", vec![Operand::Value("abc".into())], &mut ctx);
        assert_eq!(args.opt_int(1).unwrap(), None);
        assert_eq!(
            args.value(1).unwrap_err(),
            EvalError::MissingArgument {
                name: "sub".to_string(),
                index: 1
            }
        );
    }
}
