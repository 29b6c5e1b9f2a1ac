//! File name and stat functions.
//!
//! `name`, `nam` and `ext` come with mutators that rename the file, so
//! `{nam.set(nam.low)}` with the fix action lower-cases file names.

use chrono::{DateTime, Local};
use resorter_expression::functions::text::slice_args;
use resorter_expression::{Arity, CallArgs, EvalError, FunctionDefinition, SlotCache, Value};
use std::ffi::OsString;
use std::fmt::Write;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

/// Format of `atime`, `mtime` and `ctime` without an argument.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stat buffers, reopened only when the file changes.
pub type StatCache = SlotCache<Metadata>;

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn stem(path: &Path) -> String {
    path.file_stem().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

fn stat(cache: &StatCache, name: &str, path: &Path) -> Result<Metadata, EvalError> {
    cache
        .get_or_open(path, |p| {
            debug!(path = %p.display(), "stat");
            fs::metadata(p)
        })
        .map_err(|e| EvalError::function(name, e))
}

/// Renames the file in slot 0 to `target` and returns the new path.
fn rename(cache: &StatCache, name: &str, from: &Path, target: PathBuf) -> Result<Value, EvalError> {
    if target != from {
        info!(from = %from.display(), to = %target.display(), "rename");
        fs::rename(from, &target).map_err(|e| EvalError::function(name, e))?;
        cache.invalidate();
    }
    Ok(Value::Str(lossy(&target)))
}

/// The replacement text of a mutator: the last slot.
fn new_text(args: &mut CallArgs<'_>) -> Result<String, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::MissingArgument {
            name: args.name().to_string(),
            index: 1,
        });
    }
    args.str(args.len() - 1)
}

fn name_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let name = file_name(&args.path(0)?);
    slice_args(args, &name).map(Value::Str)
}

fn nam_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let nam = stem(&args.path(0)?);
    slice_args(args, &nam).map(Value::Str)
}

fn ext_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let ext = extension(&args.path(0)?);
    slice_args(args, &ext).map(Value::Str)
}

fn path_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let path = args.path(0)?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let Some(last) = args.opt_int(1)? else {
        return Ok(Value::Str(lossy(dir)));
    };
    let parts: Vec<Component<'_>> = dir.components().collect();
    let start = parts.len().saturating_sub(last.max(0) as usize);
    let tail: PathBuf = parts[start..].iter().collect();
    Ok(Value::Str(lossy(&tail)))
}

fn parent_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let path = args.path(0)?;
    let index = args.opt_int(1)?.unwrap_or(1).max(0) as usize;
    let part = path
        .components()
        .rev()
        .nth(index)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Value::Str(part))
}

fn abspath_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let path = args.path(0)?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let abs = std::path::absolute(&dir).map_err(|e| EvalError::function("abspath", e))?;
    slice_args(args, &lossy(&abs)).map(Value::Str)
}

fn size_eval(cache: &StatCache, args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let path = args.path(0)?;
    let size = stat(cache, "size", &path)?.len();
    let Some(unit) = args.opt_str(1)? else {
        return Ok(Value::Int(i64::try_from(size).unwrap_or(i64::MAX)));
    };
    let power = match unit.to_ascii_lowercase().as_str() {
        "k" => 1,
        "m" => 2,
        "g" => 3,
        "t" => 4,
        "p" => 5,
        _ => {
            return Err(EvalError::function(
                "size",
                format!("unknown unit \"{unit}\", expected k, m, g, t or p"),
            ))
        }
    };
    Ok(Value::Float(size as f64 / 1024f64.powi(power)))
}

fn format_time(name: &str, time: SystemTime, format: &str) -> Result<Value, EvalError> {
    let local: DateTime<Local> = time.into();
    let mut out = String::new();
    // an invalid specifier surfaces as a fmt error here instead of a panic
    write!(out, "{}", local.format(format))
        .map_err(|_| EvalError::function(name, format!("invalid time format \"{format}\"")))?;
    Ok(Value::Str(out))
}

fn time_eval(
    cache: &StatCache,
    name: &str,
    pick: fn(&Metadata) -> io::Result<SystemTime>,
    args: &mut CallArgs<'_>,
) -> Result<Value, EvalError> {
    let path = args.path(0)?;
    let meta = stat(cache, name, &path)?;
    let time = pick(&meta).map_err(|e| EvalError::function(name, e))?;
    let format = args.opt_str(1)?;
    format_time(name, time, format.as_deref().unwrap_or(DEFAULT_TIME_FORMAT))
}

fn created(meta: &Metadata) -> io::Result<SystemTime> {
    // not every filesystem records a birth time
    meta.created().or_else(|_| meta.modified())
}

fn time_function(
    cache: &Arc<StatCache>,
    name: &'static str,
    help: &str,
    pick: fn(&Metadata) -> io::Result<SystemTime>,
) -> FunctionDefinition {
    let cache = cache.clone();
    FunctionDefinition::new(name, help, move |args| time_eval(&cache, name, pick, args))
        .with_args(&["strftime format"])
        .with_arity(Arity::Range(0, Some(1)))
        .with_example(&format!("{name}[\"%Y\"]"))
        .with_output("\"2024\"")
}

pub fn functions(cache: Arc<StatCache>) -> Vec<FunctionDefinition> {
    let (c_name, c_nam, c_ext, c_size) = (cache.clone(), cache.clone(), cache.clone(), cache.clone());
    vec![
        FunctionDefinition::new("name", "file name with extension, without path", name_eval)
            .with_args(&["from", "to"])
            .with_arity(Arity::Range(0, Some(2)))
            .with_example("name")
            .with_mutator(move |args| {
                let path = args.path(0)?;
                let target = path.with_file_name(new_text(args)?);
                rename(&c_name, "name", &path, target)
            }),
        FunctionDefinition::new("nam", "file name without extension", nam_eval)
            .with_args(&["from", "to"])
            .with_arity(Arity::Range(0, Some(2)))
            .with_example("nam")
            .with_mutator(move |args| {
                let path = args.path(0)?;
                let target = path.with_file_name(format!("{}{}", new_text(args)?, extension(&path)));
                rename(&c_nam, "nam", &path, target)
            }),
        FunctionDefinition::new("ext", "file extension with leading dot", ext_eval)
            .with_args(&["from", "to"])
            .with_arity(Arity::Range(0, Some(2)))
            .with_example("ext")
            .with_mutator(move |args| {
                let path = args.path(0)?;
                let mut target: OsString = path.with_extension("").into_os_string();
                target.push(new_text(args)?);
                rename(&c_ext, "ext", &path, PathBuf::from(target))
            }),
        FunctionDefinition::new("path", "directory of the file, or its last n parts", path_eval)
            .with_args(&["parts"])
            .with_arity(Arity::Range(0, Some(1)))
            .with_example("path[2]")
            .with_source("a/b/c/name.ext"),
        FunctionDefinition::new("parent", "name of the n-th parent directory (default 1)", parent_eval)
            .with_args(&["index"])
            .with_arity(Arity::Range(0, Some(1)))
            .with_example("parent[2]"),
        FunctionDefinition::new("abspath", "absolute directory of the file", abspath_eval)
            .with_args(&["from", "to"])
            .with_arity(Arity::Range(0, Some(2)))
            .with_example("abspath")
            .with_output("\"/home/user/some/path\""),
        FunctionDefinition::new("size", "file size in bytes, or in k/m/g/t/p units", move |args| {
            size_eval(&c_size, args)
        })
        .with_args(&["unit"])
        .with_arity(Arity::Range(0, Some(1)))
        .with_example("size[m]")
        .with_output("42"),
        time_function(&cache, "atime", "last access time", Metadata::accessed),
        time_function(&cache, "mtime", "last modification time", Metadata::modified),
        time_function(&cache, "ctime", "creation time", created),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_parts() {
        let path = Path::new("a/b/photo.tar.gz");
        assert_eq!(file_name(path), "photo.tar.gz");
        assert_eq!(stem(path), "photo.tar");
        assert_eq!(extension(path), ".gz");
        assert_eq!(extension(Path::new("a/README")), "");
    }

    #[test]
    fn time_format() {
        let value = format_time("mtime", SystemTime::UNIX_EPOCH, "%Y").unwrap();
        assert!(matches!(value, Value::Str(ref y) if y == "1970" || y == "1969"));
        assert!(format_time("mtime", SystemTime::UNIX_EPOCH, "%Q").is_err());
    }
}
