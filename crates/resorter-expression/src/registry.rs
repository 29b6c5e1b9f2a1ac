use crate::eval_ctx::EvalCtx;
use crate::evaluate::Expression;
use crate::functions;
use crate::operand::Subject;
use crate::sequence::Sequence;
use crate::types::FunctionDefinition;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Example subject used by `--list-functions` when a function sets none.
pub const EXAMPLE_SOURCE: &str = "some/path/name.ext";

/// The name-to-definition table, grouped for help output.
///
/// Registering a name twice replaces the earlier definition; expressions
/// parsed before that keep the definition they were bound to.
#[derive(Debug, Default)]
pub struct Registry {
    groups: Vec<(String, Vec<String>)>,
    functions: HashMap<String, Arc<FunctionDefinition>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry holding the built-in text, number, list, condition, counter
    /// and set functions.
    pub fn standard(sequence: Arc<Sequence>) -> Self {
        let mut registry = Registry::new();
        registry.register_group("Text", functions::text::functions());
        registry.register_group("Num", functions::num::functions());
        registry.register_group("List", functions::list::functions());
        registry.register_group("Conditions", functions::conditions::functions());
        registry.register_group("Counter", functions::counter::functions(sequence));
        registry.register_group("Set", functions::set::functions());
        registry
    }

    pub fn register(&mut self, group: &str, def: FunctionDefinition) -> Arc<FunctionDefinition> {
        debug!(group, function = %def.name, "registering");
        let def = Arc::new(def);
        let name = def.name.clone();
        for (_, names) in self.groups.iter_mut() {
            names.retain(|n| *n != name);
        }
        match self.groups.iter_mut().find(|(g, _)| g == group) {
            Some((_, names)) => names.push(name.clone()),
            None => self.groups.push((group.to_string(), vec![name.clone()])),
        }
        self.functions.insert(name, def.clone());
        def
    }

    pub fn register_group(&mut self, group: &str, defs: Vec<FunctionDefinition>) {
        for def in defs {
            self.register(group, def);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<FunctionDefinition>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Groups in registration order with their definitions.
    pub fn groups(&self) -> impl Iterator<Item = (&str, Vec<Arc<FunctionDefinition>>)> + '_ {
        self.groups.iter().filter(|(_, names)| !names.is_empty()).map(|(group, names)| {
            let defs = names.iter().filter_map(|n| self.get(n)).collect();
            (group.as_str(), defs)
        })
    }

    /// Help text for every group. `verbose` adds argument names and runs the
    /// examples.
    pub fn help(&self, verbose: bool) -> String {
        let mut lines = Vec::new();
        for (group, defs) in self.groups() {
            lines.push(format!("{group}:"));
            for def in defs {
                let signature = if def.args.is_empty() || !verbose {
                    def.name.clone()
                } else {
                    format!("{}[{}]", def.name, def.args.join(","))
                };
                lines.push(format!("  {signature:<24} {}", def.help));
                if verbose {
                    if let Some(example) = &def.example {
                        let source = def.source.as_deref().unwrap_or(EXAMPLE_SOURCE);
                        lines.push(format!(
                            "  {:<24} {{{example}}} on \"{source}\" -> {}",
                            "",
                            self.run_example(&def, example, source)
                        ));
                    }
                }
            }
        }
        lines.into_iter().map(|line| line + "\n").collect()
    }

    fn run_example(&self, def: &FunctionDefinition, example: &str, source: &str) -> String {
        if let Some(output) = &def.output {
            return output.clone();
        }
        let result = Expression::parse(example, self)
            .map_err(|e| e.to_string())
            .and_then(|expr| {
                expr.evaluate(&Subject::entry(source), &mut EvalCtx::new())
                    .map_err(|e| e.to_string())
            });
        match result {
            Ok(value) => format!("\"{value}\""),
            Err(e) => format!("error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn standard_registry() {
        let registry = Registry::standard(Arc::new(Sequence::new()));
        for name in ["up", "sub", "round", "join", "if", "counter", "set", "none"] {
            assert!(registry.contains(name), "{name}");
        }
        let groups: Vec<&str> = registry.groups().map(|(g, _)| g).collect();
        assert_eq!(groups, ["Text", "Num", "List", "Conditions", "Counter", "Set"]);
    }

    #[test]
    fn reregistering_moves_the_name() {
        let mut registry = Registry::new();
        registry.register("A", FunctionDefinition::new("f", "first", |_| Ok(Value::Int(1))));
        registry.register("B", FunctionDefinition::new("f", "second", |_| Ok(Value::Int(2))));
        assert_eq!(registry.get("f").unwrap().help, "second");
        let groups: Vec<&str> = registry.groups().map(|(g, _)| g).collect();
        assert_eq!(groups, ["B"]);
        assert_eq!(registry.names(), ["f"]);
    }

    #[test]
    fn help_runs_examples() {
        let registry = Registry::standard(Arc::new(Sequence::new()));
        let help = registry.help(true);
        assert!(help.contains("Text:"));
        assert!(help.contains("{\"abc\".up} on \"some/path/name.ext\" -> \"ABC\""), "{help}");
        assert!(!registry.help(false).contains(" -> "));
    }
}
