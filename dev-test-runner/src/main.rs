//! Runs the JSON case manifests under `tests/cases` against the compiler.
//!
//! Each manifest is an array of cases. A case names a schema file (relative
//! to the manifest, possibly through a `var:` reference), an optional key
//! path, and what compiling it should produce.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use jsonschema_typed::source::{from_str_with_path, load_document};
use jsonschema_typed::{Compilation, CompileOptions, DiagnosticKind, Namespace, Session};

// ————————————————————————————————————————————————————————————————————————————
// MANIFEST
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    description: String,
    schema: String,
    #[serde(default)]
    path: Vec<String>,
    /// Other schema files `$ref`s in `schema` point into.
    #[serde(default)]
    with_schema: Vec<String>,
    /// Namespace for `var:` references in `schema` and `path`.
    #[serde(default)]
    vars: Map<String, Value>,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    options: CompileOptions,
    #[serde(default)]
    expect: Option<Expect>,
    /// `Error::kind()` of the expected failure.
    #[serde(default)]
    expect_error: Option<String>,
    #[serde(default)]
    expect_diagnostics: Vec<DiagnosticKind>,
}

/// Long renders may be split into pieces, which are concatenated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Expect {
    Whole(String),
    Pieces(Vec<String>),
}

impl Expect {
    fn render(&self) -> String {
        match self {
            Expect::Whole(s) => s.clone(),
            Expect::Pieces(pieces) => pieces.concat(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RUNNER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Parser, Debug)]
struct Settings {
    /// only run cases whose `<file>: <description>` matches
    #[arg(long)]
    filter: Option<Regex>,

    /// directory holding the case manifests
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/cases"))]
    cases: PathBuf,
}

#[derive(Debug, Default)]
struct Summary {
    passed: usize,
    failed: Vec<String>,
}

/// Outer errors are broken fixtures; inner ones are what the case is about.
fn compile_case(dir: &Path, case: &Case) -> anyhow::Result<jsonschema_typed::Result<Compilation>> {
    let namespace = Namespace::new(case.vars.clone());
    let resolved = namespace
        .resolve(&case.schema)
        .and_then(|schema| Ok((schema, namespace.resolve_all(&case.path)?)));
    let (schema, path) = match resolved {
        Ok(resolved) => resolved,
        Err(error) => return Ok(Err(error)),
    };

    let mut session = Session::new();
    for extra in &case.with_schema {
        session.add_document(load_document(&dir.join(extra))?);
    }
    let uri = session.add_document(load_document(&dir.join(schema))?);
    Ok(session.compile(&uri, &path, &case.options))
}

fn run_case(dir: &Path, case: &Case) -> anyhow::Result<()> {
    let compilation = match (compile_case(dir, case)?, &case.expect_error) {
        (Err(error), Some(kind)) if error.kind() == kind.as_str() => return Ok(()),
        (Err(error), Some(kind)) => bail!("expected a {kind} error, got {} ({error})", error.kind()),
        (Err(error), None) => return Err(error).context("compile failed"),
        (Ok(compilation), Some(kind)) => bail!("expected a {kind} error, compiled to {}", compilation.root),
        (Ok(compilation), None) if case.optional => compilation.optionalize(),
        (Ok(compilation), None) => compilation,
    };

    if let Some(expect) = case.expect.as_ref() {
        let expected = expect.render();
        let actual = compilation.root.to_string();
        if actual != expected {
            bail!("type mismatch\n    expected: {expected}\n    actual:   {actual}");
        }
    }
    for kind in &case.expect_diagnostics {
        if !compilation.diagnostics.iter().any(|d| d.kind == *kind) {
            let seen = compilation.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>();
            bail!("missing {kind:?} diagnostic; got {seen:#?}");
        }
    }
    Ok(())
}

fn run_all(dir: &Path, filter: Option<&Regex>) -> anyhow::Result<Summary> {
    let mut manifests = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            manifests.push(path);
        }
    }
    manifests.sort();

    let mut summary = Summary::default();
    for manifest in manifests {
        let src = std::fs::read_to_string(&manifest)?;
        let cases: Vec<Case> = from_str_with_path(&src, &manifest)?;
        let file = manifest.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_default();
        for case in cases {
            let label = format!("{file}: {}", case.description);
            if filter.is_some_and(|re| !re.is_match(&label)) {
                continue;
            }
            match run_case(dir, &case) {
                Ok(()) => {
                    summary.passed += 1;
                    eprintln!("{} {label}", "✅".green());
                }
                Err(error) => {
                    eprintln!("{} {label}\n    {error:#}", "❌".red());
                    summary.failed.push(label);
                }
            }
        }
    }
    Ok(summary)
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    let summary = run_all(&settings.cases, settings.filter.as_ref())?;
    let line = format!("{} passed, {} failed", summary.passed, summary.failed.len());
    if summary.failed.is_empty() {
        eprintln!("{}", line.green().bold());
        Ok(())
    } else {
        eprintln!("{}", line.red().bold());
        bail!("failing cases: {:#?}", summary.failed)
    }
}
