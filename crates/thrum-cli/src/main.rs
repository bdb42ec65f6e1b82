//! `thrum` — toolchain driver and per-stage golden-file test runner.
//!
//! Each pipeline stage has a subcommand that consumes a list of golden
//! files (see [`golden`]); `run` drives the whole pipeline over a source
//! file and prints the produced frame.

mod golden;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use thrum_foundation::Symbol;

use golden::{diff, run_files, Golden};

#[derive(Parser, Debug)]
#[command(name = "thrum")]
#[command(about = "Thrum toolchain driver and golden-file test runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check surface parsing against expected ASTs
    Syntax { files: Vec<PathBuf> },
    /// Check that AST s-expression files reparse to equal modules
    Ast { files: Vec<PathBuf> },
    /// Check CFG construction and pruning against expected packages
    BuildCfg { files: Vec<PathBuf> },
    /// Check bytecode generation against expected listings
    Codegen { files: Vec<PathBuf> },
    /// Execute bytecode listings against expected output frames
    Eval { files: Vec<PathBuf> },
    /// Compile a source file and run it over an input frame
    Run {
        source: PathBuf,
        /// Input samples, e.g. "{ 1 2 3 }"
        #[arg(long)]
        input: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Syntax { files } => run_files(&files, check_syntax),
        Command::Ast { files } => ast_round_trips(&files),
        Command::BuildCfg { files } => run_files(&files, check_build_cfg),
        Command::Codegen { files } => run_files(&files, check_codegen),
        Command::Eval { files } => run_files(&files, check_eval),
        Command::Run { source, input } => run_source(&source, &input),
    };
    ExitCode::from(code as u8)
}

fn check_syntax(golden: &Golden) -> Result<(), String> {
    let actual = thrum_dsl::parse_module(&golden.given).map_err(|errors| {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    let expected =
        thrum_dsl::sexpr::parse_module(&golden.expect).map_err(|error| error.to_string())?;

    if actual != expected {
        return Err(diff(&expected, &actual));
    }
    Ok(())
}

fn check_build_cfg(golden: &Golden) -> Result<(), String> {
    let module = thrum_dsl::sexpr::parse_module(&golden.given).map_err(|e| e.to_string())?;
    let module = thrum_dsl::lower_module(module);

    let (mut package, root) =
        thrum_compiler::pipeline::build_module(&module).map_err(|e| e.to_string())?;
    thrum_compiler::gc(&mut package, &root).map_err(|e| e.to_string())?;

    let expected =
        thrum_compiler::sexpr::parse_package(&golden.expect).map_err(|e| e.to_string())?;
    if package != expected {
        return Err(diff(&expected, &package));
    }
    Ok(())
}

fn check_codegen(golden: &Golden) -> Result<(), String> {
    let source = thrum_compiler::sexpr::parse_package(&golden.given).map_err(|e| e.to_string())?;
    let actual = thrum_compiler::codegen(&source).map_err(|e| e.to_string())?;
    let expected = thrum_vm::sexpr::parse_package(&golden.expect).map_err(|e| e.to_string())?;

    if actual != expected {
        return Err(diff(&expected, &actual));
    }
    Ok(())
}

fn check_eval(golden: &Golden) -> Result<(), String> {
    let mut package = thrum_vm::sexpr::parse_package(&golden.given).map_err(|e| e.to_string())?;
    let input = golden
        .with
        .as_deref()
        .ok_or_else(|| "missing @with: input frame".to_string())?;
    let input = thrum_vm::sexpr::parse_frame(input).map_err(|e| e.to_string())?;
    let expected = thrum_vm::sexpr::parse_frame(&golden.expect).map_err(|e| e.to_string())?;

    let actual =
        thrum_vm::call(&mut package, &Symbol::from("main"), &input).map_err(|e| e.to_string())?;
    if actual != expected {
        return Err(diff(&expected, &actual));
    }
    Ok(())
}

/// Serialize-and-reparse check over raw AST s-expression files.
fn ast_round_trips(files: &[PathBuf]) -> i32 {
    let mut failed = 0usize;

    for path in files {
        let outcome = fs::read_to_string(path)
            .map_err(|error| format!("cannot read file: {error}"))
            .and_then(|text| {
                let module =
                    thrum_dsl::sexpr::parse_module(&text).map_err(|e| e.to_string())?;
                let reparsed = thrum_dsl::sexpr::parse_module(&module.to_string())
                    .map_err(|e| format!("serialized form does not reparse: {e}"))?;
                if module != reparsed {
                    return Err(diff(&module, &reparsed));
                }
                Ok(())
            });

        match outcome {
            Ok(()) => print!("."),
            Err(message) => {
                println!("FAILED: {}", path.display());
                println!("{message}");
                failed += 1;
            }
        }
    }

    println!();
    println!("{failed}/{} Failed", files.len());
    if failed == 0 {
        0
    } else {
        1
    }
}

fn run_source(source: &Path, input: &str) -> i32 {
    let run = || -> Result<thrum_vm::Frame, String> {
        let text =
            fs::read_to_string(source).map_err(|error| format!("cannot read file: {error}"))?;
        let input = thrum_vm::sexpr::parse_frame(input).map_err(|e| e.to_string())?;

        let mut program = thrum_compiler::compile(&text).map_err(|e| e.to_string())?;
        tracing::debug!(entry = %program.entry, instructions = program.package.code.len(), "compiled");
        thrum_vm::call(&mut program.package, &program.entry, &input).map_err(|e| e.to_string())
    };

    match run() {
        Ok(frame) => {
            println!("{frame}");
            0
        }
        Err(message) => {
            eprintln!("error: {message}");
            1
        }
    }
}
