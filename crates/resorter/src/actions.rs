//! What happens to each file once its destination is known.

use crate::error::{ResortError, Result};
use crate::pipeline::Job;
use clap::ValueEnum;
use serde::Serialize;
use std::borrow::Cow;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub trait Action {
    /// Called once before the first file with the template texts.
    fn begin(&mut self, _templates: &[String]) -> Result<()> {
        Ok(())
    }

    fn act(&mut self, job: &Job) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether templates run with mutators enabled.
    fn mutation(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionKind {
    /// Print the source and the destination when they differ
    Print,
    /// Print the source paths only
    Filter,
    /// Write the source and every template value as CSV
    Csv,
    /// Write one JSON object per file
    Json,
    /// Copy files to the destination
    Copy,
    /// Move files to the destination
    Move,
    /// Allow file modifications through `set`
    Fix,
}

impl ActionKind {
    pub fn build<'a>(self, out: Box<dyn Write + 'a>, dry_run: bool) -> Box<dyn Action + 'a> {
        match self {
            ActionKind::Print => Box::new(Print { out }),
            ActionKind::Filter => Box::new(Filter { out }),
            ActionKind::Csv => Box::new(Csv { out }),
            ActionKind::Json => Box::new(Json { out }),
            ActionKind::Copy => Box::new(Transfer {
                out,
                dry_run,
                remove_source: false,
            }),
            ActionKind::Move => Box::new(Transfer {
                out,
                dry_run,
                remove_source: true,
            }),
            ActionKind::Fix => Box::new(Fix { out, dry_run }),
        }
    }
}

fn write_err(e: io::Error) -> ResortError {
    ResortError::io("<output>", e)
}

/// Quotes `s` for a POSIX shell when it contains anything beyond a safe set
/// of characters.
pub fn shell_quote(s: &str) -> Cow<'_, str> {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("'{}'", s.replace('\'', "'\"'\"'")))
    }
}

/// Quotes one CSV field.
pub fn csv_field(s: &str) -> Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

fn csv_row<'s>(out: &mut dyn Write, fields: impl IntoIterator<Item = &'s str>) -> io::Result<()> {
    let row: Vec<Cow<'_, str>> = fields.into_iter().map(csv_field).collect();
    writeln!(out, "{}", row.join(","))
}

struct Print<W> {
    out: W,
}

impl<W: Write> Action for Print<W> {
    fn act(&mut self, job: &Job) -> Result<()> {
        let source = job.source_str();
        let destination = job.destination();
        if source != destination {
            writeln!(self.out, "{} {}", shell_quote(&source), shell_quote(&destination))
                .map_err(write_err)?;
        }
        Ok(())
    }
}

struct Filter<W> {
    out: W,
}

impl<W: Write> Action for Filter<W> {
    fn act(&mut self, job: &Job) -> Result<()> {
        writeln!(self.out, "{}", shell_quote(&job.source_str())).map_err(write_err)
    }
}

struct Csv<W> {
    out: W,
}

impl<W: Write> Action for Csv<W> {
    fn begin(&mut self, templates: &[String]) -> Result<()> {
        let header = std::iter::once("file name").chain(templates.iter().map(String::as_str));
        csv_row(&mut self.out, header).map_err(write_err)
    }

    fn act(&mut self, job: &Job) -> Result<()> {
        let source = job.source_str();
        let fields = job.fields();
        let row = std::iter::once(source.as_str()).chain(fields.iter().map(String::as_str));
        csv_row(&mut self.out, row).map_err(write_err)
    }
}

#[derive(Serialize)]
struct Record<'a> {
    source: String,
    destination: String,
    values: &'a [resorter_expression::Value],
}

struct Json<W> {
    out: W,
}

impl<W: Write> Action for Json<W> {
    fn act(&mut self, job: &Job) -> Result<()> {
        let record = Record {
            source: job.source_str(),
            destination: job.destination(),
            values: &job.values,
        };
        serde_json::to_writer(&mut self.out, &record).map_err(|e| write_err(e.into()))?;
        writeln!(self.out).map_err(write_err)
    }
}

/// Copy or move.
struct Transfer<W> {
    out: W,
    dry_run: bool,
    remove_source: bool,
}

impl<W: Write> Transfer<W> {
    fn verb(&self) -> &'static str {
        if self.remove_source {
            "move"
        } else {
            "copy"
        }
    }

    fn transfer(&self, source: &Path, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ResortError::io(parent, e))?;
        }
        if self.remove_source {
            if fs::rename(source, target).is_err() {
                // rename fails across filesystems
                fs::copy(source, target).map_err(|e| ResortError::io(target, e))?;
                fs::remove_file(source).map_err(|e| ResortError::io(source, e))?;
            }
        } else {
            fs::copy(source, target).map_err(|e| ResortError::io(target, e))?;
        }
        Ok(())
    }
}

/// A destination naming an existing directory receives the file under its
/// own name.
fn target_path(source: &Path, destination: &str) -> PathBuf {
    let dest = PathBuf::from(destination);
    match source.file_name() {
        Some(name) if dest.is_dir() => dest.join(name),
        _ => dest,
    }
}

impl<W: Write> Action for Transfer<W> {
    fn act(&mut self, job: &Job) -> Result<()> {
        let source = job.source.as_path();
        let target = target_path(source, &job.destination());
        if target == source {
            debug!(path = %source.display(), "already in place");
            return Ok(());
        }
        if !source.is_file() {
            return Err(ResortError::action(source, "source file not found"));
        }
        if target.exists() {
            return Err(ResortError::action(&target, "destination already exists"));
        }
        if self.dry_run {
            return writeln!(
                self.out,
                "{} {} {}",
                self.verb(),
                shell_quote(&job.source_str()),
                shell_quote(&target.to_string_lossy())
            )
            .map_err(write_err);
        }
        info!(from = %source.display(), to = %target.display(), "{}", self.verb());
        self.transfer(source, &target)
    }
}

/// The templates' mutators do the work; the action only reports.
struct Fix<W> {
    out: W,
    dry_run: bool,
}

impl<W: Write> Action for Fix<W> {
    fn act(&mut self, job: &Job) -> Result<()> {
        if self.dry_run {
            return writeln!(self.out, "{}", shell_quote(&job.source_str())).map_err(write_err);
        }
        info!(path = %job.source.display(), "fixed");
        Ok(())
    }

    fn mutation(&self) -> bool {
        !self.dry_run
    }
}
