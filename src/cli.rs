//! CLI: schema → (type model | narrowed schema)
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;

use jsonschema_typed::source::load_document;
use jsonschema_typed::{narrow, Compilation, CompileOptions, Draft, Namespace, Session, Severity};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile JSON Schema documents into a structural type model
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile each input and print its type model
    Compile(CompileOut),
    /// print the sub-schema a key path selects, without compiling it
    Narrow(NarrowOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more schema files. May be literal paths, quoted glob patterns
    /// or `var:module:name` references into the --vars namespace
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// Key path to narrow each input to before compiling (repeatable).
    /// `#` stops at the current object; `var:` references are expanded
    #[arg(long, short)]
    path: Vec<String>,

    /// JSON file of modules that `var:module:name` references look up
    #[arg(long)]
    vars: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct OptionSettings {
    /// name for the outer record (default: sanitized `title`)
    #[arg(long)]
    name: Option<String>,

    /// force a draft instead of reading `$schema` (draft-04, draft-06, draft-07)
    #[arg(long)]
    draft: Option<Draft>,

    /// how many `$ref`s may be followed inside one another
    #[arg(long, default_value_t = jsonschema_typed::compile::DEFAULT_MAX_REF_DEPTH)]
    max_ref_depth: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    options: OptionSettings,

    /// Extra schema files that `$ref`s may point into (repeatable, globs allowed)
    #[arg(long)]
    with_schema: Vec<String>,

    /// make every field of the outer record optional
    #[arg(long)]
    optional: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct NarrowOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

/// Inputs after `var:` expansion and globbing, registered in one session.
struct LoadedInputs {
    session: Session,
    inputs: Vec<url::Url>,
    path: Vec<String>,
}

impl InputSettings {
    fn namespace(&self) -> anyhow::Result<Namespace> {
        match self.vars.as_ref() {
            Some(path) => Ok(Namespace::load(path)?),
            None => Ok(Namespace::empty()),
        }
    }

    fn load(&self, with_schema: &[String]) -> anyhow::Result<LoadedInputs> {
        let namespace = self.namespace()?;
        let input_patterns = namespace.resolve_all(&self.input)?;
        let path = namespace.resolve_all(&self.path)?;

        let mut session = Session::new();
        for extra in resolve_file_path_patterns(with_schema)? {
            session.add_document(load_document(&extra)?);
        }
        let mut inputs = Vec::new();
        for source_path in resolve_file_path_patterns(&input_patterns)? {
            let document = load_document(&source_path)?;
            inputs.push(session.add_document(document));
        }
        Ok(LoadedInputs { session, inputs, path })
    }
}

impl OptionSettings {
    fn to_options(&self) -> CompileOptions {
        CompileOptions { name: self.name.clone(), draft: self.draft, max_ref_depth: self.max_ref_depth }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Compile(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let loaded = target.input_settings.load(&target.with_schema)?;
                let options = target.options.to_options();

                // 1) compile every input against the shared session
                let results = loaded
                    .inputs
                    .par_iter()
                    .map(|uri| {
                        let compiled = loaded.session.compile(uri, &loaded.path, &options);
                        (uri, compiled)
                    })
                    .collect::<Vec<_>>();

                // 2) report
                let mut compilations = Vec::<Compilation>::new();
                let mut failed = 0usize;
                for (uri, result) in results {
                    match result {
                        Ok(compilation) if target.optional => compilations.push(compilation.optionalize()),
                        Ok(compilation) => compilations.push(compilation),
                        Err(error) => {
                            failed += 1;
                            eprintln!("{} {uri} [{}]: {error}", "error".red().bold(), error.kind());
                        }
                    }
                }
                for compilation in &compilations {
                    print_diagnostics(compilation);
                }

                // 3) emit
                let rendered = match target.format {
                    OutputFormat::Text => compilations
                        .iter()
                        .map(|c| format!("{}\n", c.root))
                        .collect::<String>(),
                    OutputFormat::Json => serde_json::to_string_pretty(&compilations)?,
                };
                write_output(target.out.as_ref(), &rendered)?;

                if failed > 0 {
                    bail!("{failed} of {} inputs failed to compile", loaded.inputs.len());
                }
                Ok(())
            }
            Command::Narrow(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let namespace = target.input_settings.namespace()?;
                let path = namespace.resolve_all(&target.input_settings.path)?;
                let patterns = namespace.resolve_all(&target.input_settings.input)?;
                let mut narrowed = Vec::new();
                for source_path in resolve_file_path_patterns(&patterns)? {
                    let document = load_document(&source_path)?;
                    let schema = narrow(&document.schema, &path)
                        .with_context(|| format!("narrowing {}", source_path.display()))?;
                    narrowed.push(schema);
                }
                let rendered = match narrowed.as_slice() {
                    [single] => serde_json::to_string_pretty(single)?,
                    many => serde_json::to_string_pretty(many)?,
                };
                write_output(target.out.as_ref(), &rendered)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_diagnostics(compilation: &Compilation) {
    for diagnostic in &compilation.diagnostics {
        let label = match diagnostic.severity {
            Severity::Warning => "warning".yellow().bold(),
            Severity::Error => "error".red().bold(),
        };
        eprintln!("{label} {}: {}", diagnostic.location.dimmed(), diagnostic.message);
    }
}

fn write_output(out: Option<&PathBuf>, rendered: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(out, rendered).with_context(|| format!("writing {}", out.display()))?;
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let mut matched_any = false;
        for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern {pattern:?}"))? {
            matched_any = true;
            out.push(entry?);
        }
        if !matched_any {
            bail!("glob pattern matched no files: {pattern}");
        }
    }
    Ok(out)
}
