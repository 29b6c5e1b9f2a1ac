//! Functions backed by external scripts.

use crate::error::{ResortError, Result};
use resorter_expression::{Arity, EvalError, FunctionDefinition, Value};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Builds a function named after the script's file stem. The script runs with
/// the string forms of the subject and the arguments and returns its standard
/// output with line breaks removed.
pub fn script_function(path: &Path) -> Result<FunctionDefinition> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ResortError::Script {
            path: path.to_path_buf(),
            message: "no file name".to_string(),
        })?;
    if !path.is_file() {
        return Err(ResortError::Script {
            path: path.to_path_buf(),
            message: "not a file".to_string(),
        });
    }
    let script: PathBuf = path.to_path_buf();
    let help = format!("output of {}", path.display());
    let def = FunctionDefinition::new(&name, &help, move |args| {
        let argv: Vec<String> = args.rest(0)?.iter().map(Value::to_string).collect();
        run(&script, args.name(), &argv)
    })
    .with_args(&["..."])
    .with_arity(Arity::Any);
    Ok(def)
}

fn run(script: &Path, name: &str, argv: &[String]) -> std::result::Result<Value, EvalError> {
    debug!(script = %script.display(), args = ?argv, "running script");
    let output = Command::new(script)
        .args(argv)
        .output()
        .map_err(|e| EvalError::function(name, e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EvalError::function(
            name,
            format!("{} {}", output.status, stderr.trim()),
        ));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(Value::Str(stdout.replace(['\n', '\r'], "")))
}
