//! resorter: sort, rename and filter files with path templates.
//!
//! Each input file is matched against the filters, every template is
//! evaluated against it and the results are handed to an [`Action`]. The
//! expression language itself lives in `resorter-expression`; this crate adds
//! the file functions (`name`, `ext`, `size`, `mtime`, ...), script functions
//! and the command-line plumbing.

pub mod actions;
pub mod error;
pub mod fileinfo;
pub mod input;
pub mod pipeline;
pub mod scripts;

pub use actions::{Action, ActionKind};
pub use error::{ResortError, Result};
pub use input::Source;
pub use pipeline::{Answer, FailurePolicy, Filters, Job, Prompt, Resorter, Summary, TerminalPrompt};

use resorter_expression::{Registry, Sequence, SlotCache, Template};
use std::path::PathBuf;
use std::sync::Arc;

/// The standard functions, the file functions and one function per script.
pub fn registry(scripts: &[PathBuf]) -> Result<Registry> {
    let mut registry = Registry::standard(Arc::new(Sequence::new()));
    registry.register_group("File", fileinfo::functions(Arc::new(SlotCache::new())));
    for script in scripts {
        registry.register("Custom", scripts::script_function(script)?);
    }
    Ok(registry)
}

/// Compiles path templates. A template starting with `@` is read from the
/// named file.
pub fn compile_templates(texts: &[String], registry: &Registry) -> Result<Vec<Template>> {
    texts
        .iter()
        .map(|text| {
            let text = match text.strip_prefix('@') {
                Some(file) => std::fs::read_to_string(file)
                    .map_err(|e| ResortError::io(file, e))?
                    .trim_end_matches(['\r', '\n'])
                    .to_string(),
                None => text.clone(),
            };
            Template::parse(&text, registry).map_err(|e| ResortError::parse(&text, e))
        })
        .collect()
}
