use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context as _};
use clap::Parser;
use resorter::{
    compile_templates, registry, ActionKind, FailurePolicy, Filters, ResortError, Resorter,
    Source, TerminalPrompt,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Sort, rename and filter files with path templates such as
/// `sorted/{mtime["%Y"]}/{name.low}`.
#[derive(Parser, Debug)]
#[command(name = "resorter", version)]
struct Cli {
    /// Action applied to every file.
    #[arg(short, long, value_enum, default_value_t = ActionKind::Print)]
    action: ActionKind,

    /// Path template; `@FILE` reads it from a file. Repeat for several fields.
    #[arg(short, long = "expression", value_name = "TEMPLATE")]
    expressions: Vec<String>,

    /// Directory to resort, a file listing paths, or `-` for stdin.
    #[arg(short, long, default_value = ".")]
    from: PathBuf,

    /// Descend into subdirectories.
    #[arg(short, long)]
    recursive: bool,

    /// Keep files matching a regex or `{expression}<op><value>`.
    #[arg(short = 'i', long)]
    ifilter: Vec<String>,

    /// Drop files matching a regex or `{expression}<op><value>`.
    #[arg(short = 'n', long)]
    nifilter: Vec<String>,

    /// Keep destinations matching a regex or `{expression}<op><value>`.
    #[arg(short = 'o', long)]
    ofilter: Vec<String>,

    /// Register a script as a function named after its file.
    #[arg(short, long)]
    script: Vec<PathBuf>,

    /// Confirm every file before acting on it. With `fix` the question comes
    /// before any rename.
    #[arg(long)]
    ask: bool,

    /// Stop at the first failure.
    #[arg(long, conflicts_with = "ignore")]
    stop: bool,

    /// Skip failing files without asking.
    #[arg(long)]
    ignore: bool,

    /// Report what copy, move and fix would do without touching files.
    #[arg(long)]
    dry_run: bool,

    /// Only log errors.
    #[arg(long, conflicts_with_all = ["verbose", "debug"])]
    silent: bool,

    /// Log every action.
    #[arg(short, long)]
    verbose: bool,

    /// Log parsing and function calls.
    #[arg(long)]
    debug: bool,

    /// List the available functions; with -v, their arguments and examples.
    #[arg(short, long)]
    list_functions: bool,
}

impl Cli {
    fn policy(&self) -> FailurePolicy {
        if self.stop {
            FailurePolicy::Stop
        } else if self.ignore {
            FailurePolicy::Ignore
        } else {
            FailurePolicy::Ask
        }
    }

    fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else if self.silent {
            "error"
        } else {
            "warn"
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_env("RESORTER_LOG")
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let registry = registry(&cli.script).context("load scripts")?;
    if cli.list_functions {
        print!("{}", registry.help(cli.verbose));
        return Ok(());
    }
    if cli.expressions.is_empty() {
        bail!("no template given, use --expression");
    }

    let templates = compile_templates(&cli.expressions, &registry)?;
    let filters = Filters::parse(&cli.ifilter, &cli.nifilter, &cli.ofilter, &registry)?;
    let files = Source::from_arg(&cli.from)
        .files(cli.recursive)
        .with_context(|| format!("read input '{}'", cli.from.display()))?;

    let stdout = io::stdout();
    let mut action = cli.action.build(Box::new(stdout.lock()), cli.dry_run);
    let mut prompt = TerminalPrompt::stdin();
    let mut resorter = Resorter::new(templates, filters, &mut prompt)
        .with_policy(cli.policy())
        .with_confirm(cli.ask);
    let summary = resorter.run(files, action.as_mut())?;
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        failed = summary.failed,
        "done"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if matches!(e.downcast_ref::<ResortError>(), Some(ResortError::Aborted)) => {
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
