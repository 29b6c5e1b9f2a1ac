//! The resort loop: filter, evaluate, act, one file at a time.

use crate::actions::Action;
use crate::error::{ResortError, Result};
use resorter_expression::{
    EvalCtx, EvalError, Filter, Registry, Subject, Template, Value, ABSENT_MARK,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One file with its evaluated templates.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub source: PathBuf,
    pub values: Vec<Value>,
}

impl Job {
    pub fn source_str(&self) -> String {
        self.source.to_string_lossy().into_owned()
    }

    /// Template values as text, `?` for a missing value.
    pub fn fields(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|v| match v {
                Value::Absent => ABSENT_MARK.to_string(),
                v => v.to_string(),
            })
            .collect()
    }

    /// The fields joined by spaces.
    pub fn destination(&self) -> String {
        self.fields().join(" ")
    }
}

/// Include, exclude and output filters.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// A file passes when any include filter matches; no filters pass all.
    pub include: Vec<Filter>,
    /// A file is dropped when any exclude filter matches.
    pub exclude: Vec<Filter>,
    /// Applied to the destination; no filters pass all.
    pub output: Vec<Filter>,
}

fn parse_filters(texts: &[String], registry: &Registry) -> Result<Vec<Filter>> {
    texts
        .iter()
        .map(|text| Filter::parse(text, registry).map_err(|e| ResortError::parse(text, e)))
        .collect()
}

fn any_matches(filters: &[Filter], subject: &Subject, ctx: &mut EvalCtx) -> std::result::Result<bool, EvalError> {
    for filter in filters {
        if filter.matches(subject, ctx)? {
            return Ok(true);
        }
    }
    Ok(false)
}

impl Filters {
    pub fn parse(
        include: &[String],
        exclude: &[String],
        output: &[String],
        registry: &Registry,
    ) -> Result<Self> {
        Ok(Filters {
            include: parse_filters(include, registry)?,
            exclude: parse_filters(exclude, registry)?,
            output: parse_filters(output, registry)?,
        })
    }

    pub fn accepts(&self, subject: &Subject, ctx: &mut EvalCtx) -> std::result::Result<bool, EvalError> {
        let included = self.include.is_empty() || any_matches(&self.include, subject, ctx)?;
        Ok(included && !any_matches(&self.exclude, subject, ctx)?)
    }

    pub fn accepts_output(&self, destination: &str, ctx: &mut EvalCtx) -> std::result::Result<bool, EvalError> {
        if self.output.is_empty() {
            return Ok(true);
        }
        any_matches(&self.output, &Subject::entry(destination), ctx)
    }
}

/// What to do when a file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log at debug level and go on.
    Ignore,
    /// Abort the run with the error.
    Stop,
    /// Ask on the terminal.
    #[default]
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Confirm,
    Ignore,
    Quit,
}

impl Answer {
    fn label(self) -> &'static str {
        match self {
            Answer::Confirm => "[C]onfirm",
            Answer::Ignore => "[I]gnore",
            Answer::Quit => "[Q]uit",
        }
    }

    fn parse(input: &str) -> Option<Self> {
        match input.trim().chars().next()?.to_ascii_lowercase() {
            'c' => Some(Answer::Confirm),
            'i' => Some(Answer::Ignore),
            'q' => Some(Answer::Quit),
            _ => None,
        }
    }
}

/// Asks the user a question with a fixed set of answers.
pub trait Prompt {
    fn ask(&mut self, question: &str, choices: &[Answer], default: Answer) -> Answer;
}

/// Prompts on stderr and reads the answer from a line of input. End of input
/// picks the default.
pub struct TerminalPrompt<R> {
    input: R,
}

impl TerminalPrompt<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        TerminalPrompt {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    pub fn new(input: R) -> Self {
        TerminalPrompt { input }
    }
}

impl<R: BufRead> Prompt for TerminalPrompt<R> {
    fn ask(&mut self, question: &str, choices: &[Answer], default: Answer) -> Answer {
        let labels: Vec<&str> = choices.iter().map(|c| c.label()).collect();
        loop {
            eprint!("{question} {}? ", labels.join("/"));
            let _ = io::stderr().flush();
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return default,
                Ok(_) if line.trim().is_empty() => return default,
                Ok(_) => {
                    if let Some(answer) = Answer::parse(&line).filter(|a| choices.contains(a)) {
                        return answer;
                    }
                }
            }
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Flow {
    Continue,
    Quit,
}

/// Runs templates over files and hands the results to an action.
pub struct Resorter<'a> {
    templates: Vec<Template>,
    filters: Filters,
    policy: FailurePolicy,
    confirm: bool,
    prompt: &'a mut dyn Prompt,
    ctx: EvalCtx,
}

impl<'a> Resorter<'a> {
    pub fn new(templates: Vec<Template>, filters: Filters, prompt: &'a mut dyn Prompt) -> Self {
        Resorter {
            templates,
            filters,
            policy: FailurePolicy::default(),
            confirm: false,
            prompt,
            ctx: EvalCtx::new(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ask before acting on each file. With a mutating action the question
    /// comes before the templates run, so a refused file is left untouched.
    pub fn with_confirm(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }

    /// Evaluates the filters and templates of one file. `None` when a filter
    /// drops it.
    pub fn evaluate(&mut self, path: &Path) -> std::result::Result<Option<Job>, EvalError> {
        let subject = Subject::entry(path);
        if !self.accepts(&subject)? {
            return Ok(None);
        }
        self.job(path, &subject)
    }

    fn accepts(&mut self, subject: &Subject) -> std::result::Result<bool, EvalError> {
        let accepted = self.filters.accepts(subject, &mut self.ctx)?;
        if !accepted {
            debug!(path = %subject.text(), "filtered out");
        }
        Ok(accepted)
    }

    /// Runs the templates and the output filters.
    fn job(&mut self, path: &Path, subject: &Subject) -> std::result::Result<Option<Job>, EvalError> {
        let values = self
            .templates
            .iter()
            .map(|t| t.value(subject, &mut self.ctx))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let job = Job {
            source: path.to_path_buf(),
            values,
        };
        if !self.filters.accepts_output(&job.destination(), &mut self.ctx)? {
            debug!(path = %job.source.display(), destination = %job.destination(), "output filtered out");
            return Ok(None);
        }
        Ok(Some(job))
    }

    /// Processes `files` in order. The action is finished even when the run
    /// stops early.
    pub fn run(
        &mut self,
        files: impl IntoIterator<Item = PathBuf>,
        action: &mut dyn Action,
    ) -> Result<Summary> {
        self.ctx.mutation = action.mutation();
        let texts: Vec<String> = self.templates.iter().map(|t| t.text().to_string()).collect();
        action.begin(&texts)?;
        let outcome = self.run_files(files, action);
        let finished = action.finish();
        let summary = outcome?;
        finished?;
        Ok(summary)
    }

    fn run_files(
        &mut self,
        files: impl IntoIterator<Item = PathBuf>,
        action: &mut dyn Action,
    ) -> Result<Summary> {
        let mut summary = Summary::default();
        for path in files {
            debug!(path = %path.display(), "resorting");
            match self.process(&path, action) {
                Ok(true) => summary.processed += 1,
                Ok(false) => summary.skipped += 1,
                Err(ResortError::Aborted) => return Err(ResortError::Aborted),
                Err(e) => {
                    summary.failed += 1;
                    if let Flow::Quit = self.fail(e)? {
                        return Err(ResortError::Aborted);
                    }
                }
            }
        }
        Ok(summary)
    }

    /// `Ok(false)` when a filter dropped the file or the user skipped it.
    fn process(&mut self, path: &Path, action: &mut dyn Action) -> Result<bool> {
        let subject = Subject::entry(path);
        let eval_err = |e| ResortError::eval(path, e);
        if !self.accepts(&subject).map_err(eval_err)? {
            return Ok(false);
        }
        let mutation = self.ctx.mutation;
        if self.confirm && mutation && !self.confirm_file(&path.display().to_string())? {
            return Ok(false);
        }
        let Some(job) = self.job(path, &subject).map_err(eval_err)? else {
            return Ok(false);
        };
        if self.confirm && !mutation {
            let question = format!("{} -> {}", job.source.display(), job.destination());
            if !self.confirm_file(&question)? {
                return Ok(false);
            }
        }
        action.act(&job)?;
        Ok(true)
    }

    fn confirm_file(&mut self, question: &str) -> Result<bool> {
        let choices = [Answer::Confirm, Answer::Ignore, Answer::Quit];
        match self.prompt.ask(question, &choices, Answer::Ignore) {
            Answer::Confirm => Ok(true),
            Answer::Ignore => Ok(false),
            Answer::Quit => Err(ResortError::Aborted),
        }
    }

    fn fail(&mut self, error: ResortError) -> Result<Flow> {
        match self.policy {
            FailurePolicy::Ignore => {
                debug!(%error, "ignored");
                Ok(Flow::Continue)
            }
            FailurePolicy::Stop => {
                warn!(%error, "stopping");
                Err(error)
            }
            FailurePolicy::Ask => {
                warn!(%error, "failed");
                let question = format!("Could not process {error}.");
                match self
                    .prompt
                    .ask(&question, &[Answer::Quit, Answer::Ignore], Answer::Ignore)
                {
                    Answer::Quit => Ok(Flow::Quit),
                    _ => Ok(Flow::Continue),
                }
            }
        }
    }
}
