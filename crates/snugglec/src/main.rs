//! `snugglec` -- the Snuggle compiler CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use snuggle_typeck::ReflectRegistry;

#[derive(Parser)]
#[command(name = "snugglec", about = "The Snuggle compiler", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an entry file and print the lowered program.
    Build {
        /// Path to the entry `.sng` file.
        entry: PathBuf,
        /// Output format.
        #[arg(long, value_enum, default_value = "ir")]
        emit: EmitFormat,
    },
    /// Compile an entry file, reporting errors only.
    Check {
        /// Path to the entry `.sng` file.
        entry: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EmitFormat {
    /// Human-readable instruction listing.
    Ir,
    /// JSON, for downstream tooling.
    Json,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Build { entry, emit } => run(&entry, Some(emit)),
        Command::Check { entry } => run(&entry, None),
    }
}

fn run(entry: &std::path::Path, emit: Option<EmitFormat>) -> ExitCode {
    let root = match entry.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => std::path::Path::new("."),
    };
    let sources = match snugglec::discovery::load_sources(root) {
        Ok(sources) => sources,
        Err(err) => {
            eprintln!("error: cannot read sources under {}: {err}", root.display());
            return ExitCode::FAILURE;
        }
    };
    let entry_name = snugglec::discovery::source_name(root, entry);

    // Host-bridge validation is fatal at start-up, before any compilation.
    let registry = match ReflectRegistry::new(Vec::new()) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("error: invalid reflect registry: {err}");
            return ExitCode::FAILURE;
        }
    };

    match snugglec::compile(&entry_name, &sources, &registry) {
        Ok(program) => {
            match emit {
                Some(EmitFormat::Json) => match serde_json::to_string_pretty(&program) {
                    Ok(json) => println!("{json}"),
                    Err(err) => {
                        eprintln!("error: cannot serialize program: {err}");
                        return ExitCode::FAILURE;
                    }
                },
                Some(EmitFormat::Ir) => print!("{}", snugglec::emit::dump(&program)),
                None => {}
            }
            ExitCode::SUCCESS
        }
        Err(diag) => {
            snugglec::report::render(&diag, &sources);
            ExitCode::FAILURE
        }
    }
}
