//! End-to-end tests of the resort loop over temporary directories.

use resorter::input::{read_listing, walk};
use resorter::{
    compile_templates, registry, Action, ActionKind, Answer, FailurePolicy, Filters, Job, Prompt,
    ResortError, Resorter, Summary,
};
use resorter_expression::{EvalCtx, Expression, Subject, Value};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn setup(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

/// Answers prompts from a script and counts the questions.
struct Scripted {
    answers: Vec<Answer>,
    asked: usize,
}

impl Scripted {
    fn new(answers: &[Answer]) -> Self {
        Scripted {
            answers: answers.iter().rev().copied().collect(),
            asked: 0,
        }
    }
}

impl Prompt for Scripted {
    fn ask(&mut self, _question: &str, _choices: &[Answer], default: Answer) -> Answer {
        self.asked += 1;
        self.answers.pop().unwrap_or(default)
    }
}

struct Options<'a> {
    action: ActionKind,
    templates: &'a [&'a str],
    include: &'a [&'a str],
    exclude: &'a [&'a str],
    output: &'a [&'a str],
    policy: FailurePolicy,
    confirm: bool,
    dry_run: bool,
}

fn options<'a>(action: ActionKind, templates: &'a [&'a str]) -> Options<'a> {
    Options {
        action,
        templates,
        include: &[],
        exclude: &[],
        output: &[],
        policy: FailurePolicy::Ignore,
        confirm: false,
        dry_run: false,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn run(
    opts: Options<'_>,
    files: Vec<PathBuf>,
    prompt: &mut dyn Prompt,
) -> (String, Result<Summary, ResortError>) {
    let registry = registry(&[]).unwrap();
    let templates = compile_templates(&strings(opts.templates), &registry).unwrap();
    let filters = Filters::parse(
        &strings(opts.include),
        &strings(opts.exclude),
        &strings(opts.output),
        &registry,
    )
    .unwrap();
    let mut out = Vec::new();
    let result = {
        let mut action = opts.action.build(Box::new(&mut out), opts.dry_run);
        let mut resorter = Resorter::new(templates, filters, prompt)
            .with_policy(opts.policy)
            .with_confirm(opts.confirm);
        resorter.run(files, action.as_mut())
    };
    (String::from_utf8(out).unwrap(), result)
}

fn eval(text: &str, path: &Path) -> Value {
    let registry = registry(&[]).unwrap();
    let expr = Expression::parse(text, &registry).unwrap();
    expr.evaluate(&Subject::entry(path), &mut EvalCtx::new())
        .unwrap_or_else(|e| panic!("{text}: {e}"))
}

// ---------------------------------------------------------- File functions

#[test]
fn test_file_functions() {
    let dir = setup(&[("photos/beach.JPG", "hello")]);
    let path = dir.path().join("photos/beach.JPG");
    assert_eq!(eval("name", &path), Value::from("beach.JPG"));
    assert_eq!(eval("nam", &path), Value::from("beach"));
    assert_eq!(eval("ext", &path), Value::from(".JPG"));
    assert_eq!(eval("ext.low", &path), Value::from(".jpg"));
    assert_eq!(eval("name.sub[0,2]", &path), Value::from("be"));
    assert_eq!(eval("name[0,2]", &path), Value::from("be"));
    assert_eq!(eval("parent", &path), Value::from("photos"));
    assert_eq!(eval("path[1]", &path), Value::from("photos"));
    assert_eq!(eval("size", &path), Value::Int(5));
    assert_eq!(eval("size[k]", &path), Value::Float(5.0 / 1024.0));
    assert_eq!(eval("size>4", &path), Value::Bool(true));
}

#[test]
fn test_path_functions_without_disk() {
    let path = Path::new("a/b/c/name.ext");
    assert_eq!(eval("path", path), Value::from("a/b/c"));
    assert_eq!(eval("path[2]", path), Value::from("b/c"));
    assert_eq!(eval("parent[2]", path), Value::from("b"));
    assert_eq!(eval("parent[0]", path), Value::from("name.ext"));
}

#[test]
fn test_times() {
    let dir = setup(&[("a.txt", "x")]);
    let path = dir.path().join("a.txt");
    let year = chrono::Local::now().format("%Y").to_string();
    assert_eq!(eval("mtime[\"%Y\"]", &path), Value::Str(year));
    let Value::Str(stamp) = eval("mtime", &path) else {
        panic!("mtime is text");
    };
    assert_eq!(stamp.len(), "2024-01-01 00:00:00".len());

    let registry = registry(&[]).unwrap();
    let expr = Expression::parse("mtime[\"%Q\"]", &registry).unwrap();
    let err = expr.evaluate(&Subject::entry(&path), &mut EvalCtx::new()).unwrap_err();
    assert!(err.to_string().contains("invalid time format"), "got: {err}");
}

#[test]
fn test_missing_file() {
    let registry = registry(&[]).unwrap();
    let expr = Expression::parse("size", &registry).unwrap();
    let err = expr
        .evaluate(&Subject::entry("no/such/file"), &mut EvalCtx::new())
        .unwrap_err();
    assert!(err.to_string().starts_with("size: "), "got: {err}");
}

#[test]
fn test_help_lists_file_functions() {
    let help = registry(&[]).unwrap().help(true);
    assert!(help.contains("File:"));
    assert!(help.contains("{path[2]} on \"a/b/c/name.ext\" -> \"b/c\""), "{help}");
    assert!(help.contains("{size[m]} on \"some/path/name.ext\" -> 42"), "{help}");
}

// ----------------------------------------------------------------- Actions

#[test]
fn test_print_action() {
    let dir = setup(&[("a.txt", "1"), ("b.md", "2")]);
    let root = dir.path().display().to_string();
    let files = walk(dir.path(), false).unwrap();
    let template = format!("{root}/{{ext.replace(\".\",\"\")}}/{{name}}");
    let templates = [template.as_str()];
    let (out, result) = run(options(ActionKind::Print, &templates), files, &mut Scripted::new(&[]));
    assert_eq!(result.unwrap().processed, 2);
    assert_eq!(
        out,
        format!("{root}/a.txt {root}/txt/a.txt\n{root}/b.md {root}/md/b.md\n")
    );
}

#[test]
fn test_print_skips_unchanged() {
    let dir = setup(&[("a.txt", "1")]);
    let files = walk(dir.path(), false).unwrap();
    let templates = ["{path}/{name}"];
    let (out, result) = run(options(ActionKind::Print, &templates), files, &mut Scripted::new(&[]));
    assert_eq!(result.unwrap().processed, 1);
    assert_eq!(out, "");
}

#[test]
fn test_filters() {
    let dir = setup(&[("a.txt", "1"), ("big.txt", "12345"), ("c.md", "1")]);
    let files = walk(dir.path(), false).unwrap();
    let mut opts = options(ActionKind::Filter, &["{name}"]);
    opts.include = &[r".*\.txt"];
    opts.exclude = &["{size}>3"];
    let (out, result) = run(opts, files, &mut Scripted::new(&[]));
    assert_eq!(out, format!("{}\n", dir.path().join("a.txt").display()));
    assert_eq!(result.unwrap(), Summary { processed: 1, skipped: 2, failed: 0 });
}

#[test]
fn test_output_filter() {
    let dir = setup(&[("a.txt", "1"), ("c.md", "1")]);
    let expected = format!("{}\n", dir.path().join("c.md").display());
    for output in ["{ext}==.md", r".*\.md"] {
        let files = walk(dir.path(), false).unwrap();
        let outputs = [output];
        let mut opts = options(ActionKind::Filter, &["{name}"]);
        opts.output = &outputs;
        let (out, result) = run(opts, files, &mut Scripted::new(&[]));
        assert_eq!(out, expected, "{output}");
        assert_eq!(result.unwrap().skipped, 1);
    }
}

#[test]
fn test_csv_and_json() {
    let dir = setup(&[("a.txt", "abc")]);
    let files = walk(dir.path(), false).unwrap();
    let source = dir.path().join("a.txt").display().to_string();

    let (out, _) = run(options(ActionKind::Csv, &["{size}", "x,{nam}"]), files.clone(), &mut Scripted::new(&[]));
    assert_eq!(out, format!("file name,{{size}},\"x,{{nam}}\"\n{source},3,\"x,a\"\n"));

    let (out, _) = run(options(ActionKind::Json, &["{size}", "{none}"]), files, &mut Scripted::new(&[]));
    let record: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
    assert_eq!(
        record,
        serde_json::json!({ "source": source, "destination": "3 ?", "values": [3, null] })
    );
}

#[test]
fn test_move_action() {
    let dir = setup(&[("a.txt", "1"), ("b.md", "2")]);
    let root = dir.path().display().to_string();
    let files = walk(dir.path(), false).unwrap();
    let template = format!("{root}/sorted/{{ext.replace(\".\",\"\")}}");
    let templates = [template.as_str()];
    let (_, result) = run(options(ActionKind::Move, &templates), files, &mut Scripted::new(&[]));
    assert_eq!(result.unwrap().processed, 2);
    assert!(dir.path().join("sorted/txt").is_file());
    assert!(dir.path().join("sorted/md").is_file());
    assert!(!dir.path().join("a.txt").exists());
}

#[test]
fn test_copy_into_directory() {
    let dir = setup(&[("a.txt", "1"), ("out/keep", "")]);
    let root = dir.path().display().to_string();
    let files = vec![dir.path().join("a.txt")];
    let template = format!("{root}/out");
    let templates = [template.as_str()];
    let (_, result) = run(options(ActionKind::Copy, &templates), files, &mut Scripted::new(&[]));
    assert_eq!(result.unwrap().processed, 1);
    assert_eq!(fs::read_to_string(dir.path().join("out/a.txt")).unwrap(), "1");
    assert!(dir.path().join("a.txt").exists());
}

#[test]
fn test_copy_dry_run() {
    let dir = setup(&[("a.txt", "1")]);
    let root = dir.path().display().to_string();
    let files = vec![dir.path().join("a.txt")];
    let template = format!("{root}/new/{{name}}");
    let templates = [template.as_str()];
    let mut opts = options(ActionKind::Copy, &templates);
    opts.dry_run = true;
    let (out, result) = run(opts, files, &mut Scripted::new(&[]));
    assert_eq!(result.unwrap().processed, 1);
    assert_eq!(out, format!("copy {root}/a.txt {root}/new/a.txt\n"));
    assert!(!dir.path().join("new").exists());
}

#[test]
fn test_copy_refuses_to_overwrite() {
    let dir = setup(&[("a.txt", "1"), ("b.txt", "2")]);
    let root = dir.path().display().to_string();
    let files = vec![dir.path().join("a.txt")];
    let template = format!("{root}/b.txt");
    let templates = [template.as_str()];
    let mut opts = options(ActionKind::Copy, &templates);
    opts.policy = FailurePolicy::Stop;
    let (_, result) = run(opts, files, &mut Scripted::new(&[]));
    assert!(matches!(result, Err(ResortError::Action { .. })));
    assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "2");
}

#[test]
fn test_fix_renames_through_mutators() {
    let dir = setup(&[("a.txt", "1"), ("b.txt", "2")]);
    let files = walk(dir.path(), false).unwrap();
    let (_, result) = run(
        options(ActionKind::Fix, &["{nam.set(nam:\"_x\")}"]),
        files,
        &mut Scripted::new(&[]),
    );
    assert_eq!(result.unwrap().processed, 2);
    assert!(dir.path().join("a_x.txt").is_file());
    assert!(dir.path().join("b_x.txt").is_file());
    assert!(!dir.path().join("a.txt").exists());
}

#[test]
fn test_fix_dry_run_leaves_files() {
    let dir = setup(&[("a.txt", "1")]);
    let files = walk(dir.path(), false).unwrap();
    let mut opts = options(ActionKind::Fix, &["{ext.set(\".md\")}"]);
    opts.dry_run = true;
    let (_, result) = run(opts, files, &mut Scripted::new(&[]));
    assert_eq!(result.unwrap().processed, 1);
    assert!(dir.path().join("a.txt").is_file());
    assert!(!dir.path().join("a.md").exists());
}

#[test]
fn test_print_does_not_mutate() {
    let dir = setup(&[("a.txt", "1")]);
    let files = walk(dir.path(), false).unwrap();
    let (out, _) = run(options(ActionKind::Print, &["{name.set(\"b.txt\")}"]), files, &mut Scripted::new(&[]));
    assert!(dir.path().join("a.txt").is_file());
    assert!(out.ends_with(" '?'\n"), "got: {out}");
}

// --------------------------------------------------------- Failure policy

#[test]
fn test_ignore_policy() {
    let dir = setup(&[("a.txt", "1"), ("b.txt", "2")]);
    let files = walk(dir.path(), false).unwrap();
    let mut prompt = Scripted::new(&[]);
    let (out, result) = run(options(ActionKind::Print, &["{\"x\".num}"]), files, &mut prompt);
    assert_eq!(result.unwrap(), Summary { processed: 0, skipped: 0, failed: 2 });
    assert_eq!(out, "");
    assert_eq!(prompt.asked, 0);
}

#[test]
fn test_stop_policy() {
    let dir = setup(&[("a.txt", "1"), ("b.txt", "2")]);
    let files = walk(dir.path(), false).unwrap();
    let mut opts = options(ActionKind::Print, &["{\"x\".num}"]);
    opts.policy = FailurePolicy::Stop;
    let (_, result) = run(opts, files, &mut Scripted::new(&[]));
    match result {
        Err(ResortError::Eval { path, .. }) => assert_eq!(path, dir.path().join("a.txt")),
        other => panic!("expected an evaluation error, got {other:?}"),
    }
}

#[test]
fn test_ask_policy() {
    let dir = setup(&[("a.txt", "1"), ("b.txt", "2"), ("c.txt", "3")]);
    let files = walk(dir.path(), false).unwrap();
    let mut opts = options(ActionKind::Print, &["{\"x\".num}"]);
    opts.policy = FailurePolicy::Ask;
    let mut prompt = Scripted::new(&[Answer::Ignore, Answer::Quit]);
    let (_, result) = run(opts, files, &mut prompt);
    assert!(matches!(result, Err(ResortError::Aborted)));
    assert_eq!(prompt.asked, 2);
}

#[test]
fn test_confirm_each_file() {
    let dir = setup(&[("a.txt", "1"), ("b.txt", "2")]);
    let files = walk(dir.path(), false).unwrap();
    let mut opts = options(ActionKind::Filter, &["{name}"]);
    opts.confirm = true;
    let mut prompt = Scripted::new(&[Answer::Ignore, Answer::Confirm]);
    let (out, result) = run(opts, files, &mut prompt);
    assert_eq!(result.unwrap(), Summary { processed: 1, skipped: 1, failed: 0 });
    assert_eq!(out, format!("{}\n", dir.path().join("b.txt").display()));
}

#[test]
fn test_confirm_comes_before_fix() {
    let dir = setup(&[("a.txt", "1"), ("b.txt", "2")]);
    let files = walk(dir.path(), false).unwrap();
    let mut opts = options(ActionKind::Fix, &["{nam.set(nam:\"_x\")}"]);
    opts.confirm = true;
    let mut prompt = Scripted::new(&[Answer::Ignore, Answer::Confirm]);
    let (_, result) = run(opts, files, &mut prompt);
    assert_eq!(result.unwrap(), Summary { processed: 1, skipped: 1, failed: 0 });
    assert_eq!(prompt.asked, 2);
    assert!(dir.path().join("a.txt").is_file());
    assert!(!dir.path().join("a_x.txt").exists());
    assert!(dir.path().join("b_x.txt").is_file());
}

/// Records the calls it receives.
#[derive(Default)]
struct Recorder {
    acted: Vec<PathBuf>,
    finished: bool,
}

impl Action for Recorder {
    fn act(&mut self, job: &Job) -> resorter::Result<()> {
        self.acted.push(job.source.clone());
        Ok(())
    }

    fn finish(&mut self) -> resorter::Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[test]
fn test_quit_still_finishes_action() {
    let dir = setup(&[("a.txt", "1"), ("b.txt", "2")]);
    let files = walk(dir.path(), false).unwrap();
    let registry = registry(&[]).unwrap();
    let templates = compile_templates(&strings(&["{name}"]), &registry).unwrap();
    let mut prompt = Scripted::new(&[Answer::Confirm, Answer::Quit]);
    let mut recorder = Recorder::default();
    let result = Resorter::new(templates, Filters::default(), &mut prompt)
        .with_confirm(true)
        .run(files, &mut recorder);
    assert!(matches!(result, Err(ResortError::Aborted)));
    assert_eq!(recorder.acted, [dir.path().join("a.txt")]);
    assert!(recorder.finished);
}

// ------------------------------------------------------------------- Input

#[test]
fn test_walk() {
    let dir = setup(&[("b.txt", ""), ("a.txt", ""), ("sub/c.txt", "")]);
    let names = |files: Vec<PathBuf>| -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect()
    };
    assert_eq!(names(walk(dir.path(), false).unwrap()), ["a.txt", "b.txt"]);
    assert_eq!(
        names(walk(dir.path(), true).unwrap()),
        ["a.txt", "b.txt", "sub/c.txt"]
    );
}

#[test]
fn test_listing() {
    let dir = setup(&[("sub/c.txt", ""), ("sub/d.txt", "")]);
    let listing = format!("x/one.txt\n\n{}\n", dir.path().join("sub").display());
    let files = read_listing(Cursor::new(listing), false).unwrap();
    assert_eq!(
        files,
        [
            PathBuf::from("x/one.txt"),
            dir.path().join("sub/c.txt"),
            dir.path().join("sub/d.txt")
        ]
    );
}

// ----------------------------------------------------------------- Scripts

#[cfg(unix)]
#[test]
fn test_script_function() {
    use std::os::unix::fs::PermissionsExt;

    let dir = setup(&[]);
    let script = dir.path().join("tag.sh");
    fs::write(&script, "#!/bin/sh\nprintf '%s-%s\\n' \"$(basename \"$1\")\" \"$2\"\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let registry = registry(&[script]).unwrap();
    assert!(registry.contains("tag"));
    let expr = Expression::parse("tag(\"x\").up", &registry).unwrap();
    let value = expr
        .evaluate(&Subject::entry("dir/a.txt"), &mut EvalCtx::new())
        .unwrap();
    assert_eq!(value, Value::from("A.TXT-X"));
}

#[test]
fn test_missing_script() {
    let err = registry(&[PathBuf::from("no/such/script.sh")]).unwrap_err();
    assert!(matches!(err, ResortError::Script { .. }));
}
