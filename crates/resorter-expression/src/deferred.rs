//! Pending function invocations.

use crate::error::EvalError;
use crate::eval_ctx::EvalCtx;
use crate::operand::Operand;
use crate::types::{assert_arity, realize, CallArgs, FunctionDefinition, InvokeFn};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A function call whose execution is postponed until forced.
///
/// The evaluator pushes calls onto its stack unforced; they run when an
/// operator or another function needs their value. `force` consumes the call,
/// so each pending invocation runs at most once. Two references to the same
/// function in one expression are two separate calls.
pub struct DeferredCall {
    def: Arc<FunctionDefinition>,
    slots: Vec<Operand>,
    /// Slot 0 came from the left of a `.` rather than the evaluation subject.
    chained: bool,
}

impl DeferredCall {
    /// Creates a call with `subject` in slot 0 followed by `args`.
    pub fn new(def: Arc<FunctionDefinition>, subject: Operand, args: Vec<Operand>) -> Self {
        let mut slots = Vec::with_capacity(args.len() + 1);
        slots.push(subject);
        slots.extend(args);
        DeferredCall {
            def,
            slots,
            chained: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn definition(&self) -> &Arc<FunctionDefinition> {
        &self.def
    }

    pub fn slots(&self) -> &[Operand] {
        &self.slots
    }

    /// Replaces the subject slot. This is how `left.call` feeds `left` to `call`.
    pub fn bind_subject(&mut self, subject: Operand) {
        self.slots[0] = subject;
        self.chained = true;
    }

    pub fn is_chained(&self) -> bool {
        self.chained
    }

    /// Runs the read capability.
    pub fn force(self, ctx: &mut EvalCtx) -> Result<Value, EvalError> {
        let DeferredCall { def, slots, chained } = self;
        run(&def, &def.invoke, slots, chained, ctx, true)
    }

    /// Runs the write capability with this call's own slots followed by `extra`.
    pub fn force_mutator(self, extra: Vec<Operand>, ctx: &mut EvalCtx) -> Result<Value, EvalError> {
        let DeferredCall {
            def,
            mut slots,
            chained,
        } = self;
        let mutate = def
            .mutate
            .as_ref()
            .ok_or_else(|| EvalError::NoMutator(def.name.clone()))?;
        slots.extend(extra);
        run(&def, mutate, slots, chained, ctx, false)
    }
}

fn run(
    def: &FunctionDefinition,
    f: &InvokeFn,
    slots: Vec<Operand>,
    chained: bool,
    ctx: &mut EvalCtx,
    check_arity: bool,
) -> Result<Value, EvalError> {
    if check_arity {
        assert_arity(&def.name, &def.arity, slots.len() - 1)?;
    }
    let slots = if def.lazy { slots } else { realize(slots, ctx)? };
    debug!(function = %def.name, slots = ?slots, "calling");
    let mut args = CallArgs::new(&def.name, slots, ctx).chained(chained);
    f(&mut args)
}

impl fmt::Debug for DeferredCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.def.name)?;
        f.debug_list().entries(self.slots.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn force_runs_once_with_subject_first() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let def = Arc::new(FunctionDefinition::new("cat", "", |args| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Str(args.rest(0)?.iter().map(|v| v.to_string()).collect()))
        }));
        let call = DeferredCall::new(def, Operand::Value("a".into()), vec![Operand::Value("b".into())]);
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
        let mut ctx = EvalCtx::new();
        assert_eq!(call.force(&mut ctx).unwrap(), Value::from("ab"));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn binding_marks_the_call_chained() {
        let def = Arc::new(FunctionDefinition::new("f", "", |_| Ok(Value::Absent)));
        let mut call = DeferredCall::new(def, Operand::Value("subject".into()), vec![]);
        assert!(!call.is_chained());
        call.bind_subject(Operand::Value("left".into()));
        assert!(call.is_chained());
    }

    #[test]
    fn mutator_missing() {
        let def = Arc::new(FunctionDefinition::new("ro", "", |_| Ok(Value::Absent)));
        let call = DeferredCall::new(def, Operand::Value(Value::Absent), vec![]);
        let mut ctx = EvalCtx::new();
        assert_eq!(
            call.force_mutator(vec![], &mut ctx).unwrap_err(),
            EvalError::NoMutator("ro".to_string())
        );
    }
}
