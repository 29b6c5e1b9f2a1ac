use crate::error::EvalError;
use regex::Regex;
use std::collections::HashMap;

/// Compiled patterns kept before the cache starts over.
const PATTERN_CACHE_LIMIT: usize = 64;

/// The execution context passed to every function call.
///
/// One context is normally reused for a whole run so compiled `~=` patterns
/// are shared between files.
#[derive(Debug, Default)]
pub struct EvalCtx {
    /// Host-controlled mutation mode. Mutators only run while this is set.
    pub mutation: bool,
    patterns: HashMap<String, Regex>,
}

impl EvalCtx {
    pub fn new() -> Self {
        EvalCtx::default()
    }

    pub fn with_mutation(mut self, mutation: bool) -> Self {
        self.mutation = mutation;
        self
    }

    /// Returns the anchored (full-string) regex for `pattern`, compiling it on
    /// first use. The cache starts over once it holds `PATTERN_CACHE_LIMIT`
    /// patterns.
    pub fn pattern(&mut self, pattern: &str) -> Result<&Regex, EvalError> {
        if !self.patterns.contains_key(pattern) {
            if self.patterns.len() >= PATTERN_CACHE_LIMIT {
                self.patterns.clear();
            }
            let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| EvalError::BadPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            self.patterns.insert(pattern.to_string(), re);
        }
        Ok(&self.patterns[pattern])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_is_anchored() {
        let mut ctx = EvalCtx::new();
        assert!(ctx.pattern("H.l+o").unwrap().is_match("Hello"));
        assert!(!ctx.pattern("H.l+o").unwrap().is_match("Hlo"));
        assert!(!ctx.pattern("ell").unwrap().is_match("Hello"));
    }

    #[test]
    fn pattern_cache_is_bounded() {
        let mut ctx = EvalCtx::new();
        for i in 0..1000 {
            assert!(ctx.pattern(&format!("x{i}")).unwrap().is_match(&format!("x{i}")));
            assert!(ctx.patterns.len() <= PATTERN_CACHE_LIMIT);
        }
        assert!(ctx.pattern("x999").unwrap().is_match("x999"));
    }

    #[test]
    fn bad_pattern() {
        let mut ctx = EvalCtx::new();
        assert!(matches!(ctx.pattern("(a"), Err(EvalError::BadPattern { .. })));
    }
}
