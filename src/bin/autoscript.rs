//! autoscript CLI
//!
//! # Использование
//!
//! ```bash
//! # Скомпилировать сценарий в программу
//! autoscript compile scenario.yaml -o scenario.mjs
//!
//! # Показать IR
//! autoscript compile scenario.yaml --emit ir
//!
//! # Только проверить сценарий
//! autoscript check scenario.yaml
//!
//! # Проанализировать таблицы стилей
//! autoscript analyze --registry web-features.json --input css --format text site.css
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

use autoscript::compat::{emit_highlights, run_scan, AnalysisConfig, CompatRegistry, PlanSink, StyleSource};
use autoscript::config::CompileOptions;
use autoscript::error::{ScriptError, ScriptResult};
use autoscript::script::{self, Backend};
use autoscript::{generate_ir, synthesize};

/// Compiler for declarative browser-automation scripts
#[derive(Parser)]
#[command(name = "autoscript")]
#[command(version)]
#[command(about = "Compiles automation scripts to Puppeteer, Playwright and Selenium programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a script into a program
    Compile {
        /// Script file (YAML or JSON)
        script: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file (searched upward from the script when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// What to emit
        #[arg(long, value_enum, default_value = "program")]
        emit: Emit,

        /// Override the script's framework
        #[arg(long)]
        backend: Option<String>,
    },

    /// Validate a script without generating code
    Check {
        /// Script file (YAML or JSON)
        script: PathBuf,
    },

    /// Run the compatibility analyzer over stylesheets
    Analyze {
        /// Compatibility registry (web-features JSON)
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Analysis config as JSON
        #[arg(long, default_value = "{}")]
        config: String,

        /// Input kind
        #[arg(long, value_enum, default_value = "css")]
        input: Input,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// Input files (stdin when omitted)
        files: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Emit {
    Ir,
    Program,
}

#[derive(Clone, Copy, ValueEnum)]
enum Input {
    /// JSON array of {href, text}
    Json,
    /// Raw CSS
    Css,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
    /// Report plus highlight marks
    Plan,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Compile {
            script,
            output,
            config,
            emit,
            backend,
        } => compile(&script, output.as_deref(), config.as_deref(), emit, backend.as_deref()),
        Commands::Check { script } => check(&script),
        Commands::Analyze {
            registry,
            config,
            input,
            format,
            files,
        } => analyze(registry.as_deref(), &config, input, format, &files),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_options(explicit: Option<&Path>, near: &Path) -> ScriptResult<CompileOptions> {
    let options = match explicit {
        Some(path) => CompileOptions::load(path)?,
        None => {
            let start = near
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or(std::env::current_dir()?);
            CompileOptions::discover(&start)?
        }
    };
    Ok(options)
}

fn compile(
    path: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
    emit: Emit,
    backend: Option<&str>,
) -> ScriptResult<()> {
    let source = fs::read_to_string(path)?;
    let options = load_options(config, path)?;

    let mut doc = script::parse_document(&source)?;
    if let Some(tag) = backend {
        let backend = Backend::from_tag(tag)
            .ok_or_else(|| ScriptError::Syntax(format!("unknown backend '{}'", tag)))?;
        if let Some(root) = doc.as_object_mut() {
            root.insert("framework".to_string(), Value::from(backend.tag()));
        }
    }
    let script = script::decode(&doc)?;
    let ir = generate_ir(&script)?;

    let text = match emit {
        Emit::Ir => ir.to_json()? + "\n",
        Emit::Program => synthesize(&ir, &options)?.text,
    };

    match output {
        Some(out) => {
            fs::write(out, text)?;
            log::info!("wrote {}", out.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn check(path: &Path) -> ScriptResult<()> {
    let source = fs::read_to_string(path)?;
    let script = script::load(&source)?;
    println!(
        "{}: ok ({}, {} steps)",
        path.display(),
        script.framework,
        script.steps.len()
    );
    Ok(())
}

fn read_inputs(files: &[PathBuf]) -> ScriptResult<Vec<(Option<String>, String)>> {
    if files.is_empty() {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(vec![(None, text)]);
    }
    files
        .iter()
        .map(|f| Ok((Some(f.display().to_string()), fs::read_to_string(f)?)))
        .collect()
}

fn analyze(
    registry: Option<&Path>,
    config: &str,
    input: Input,
    format: Format,
    files: &[PathBuf],
) -> ScriptResult<()> {
    let config: AnalysisConfig = serde_json::from_str(config)?;

    let registry_path = match registry {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let cwd = std::env::current_dir()?;
            CompileOptions::discover(&cwd)?.analyzer.registry.map(PathBuf::from)
        }
    };
    let registry = match registry_path {
        Some(path) => CompatRegistry::load(path)?,
        None => {
            log::warn!("no compatibility registry configured, report will be empty");
            CompatRegistry::default()
        }
    };

    let mut sources = Vec::new();
    for (name, text) in read_inputs(files)? {
        match input {
            Input::Css => sources.push(StyleSource { href: name, text }),
            Input::Json => sources.extend(serde_json::from_str::<Vec<StyleSource>>(&text)?),
        }
    }

    let outcome = run_scan(&registry, &config, &sources);
    let report = outcome.report;

    match format {
        Format::Text => print!("{}", report.render_text()),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Plan => {
            let mut sink = PlanSink::default();
            let summary = emit_highlights(&report, &mut sink);
            let plan = json!({
                "report": report,
                "marks": sink.marks,
                "summary": summary,
            });
            println!("{}", plan);
        }
    }
    Ok(())
}
