use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use jcode_interpreter::Session;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod shell;

/// Runs JCode programs, or starts an interactive shell when no program is given.
#[derive(Parser, Debug)]
#[command(name = "jcode", version)]
struct Args {
    /// Program file to run
    file: Option<PathBuf>,

    /// Run CODE instead of a file
    #[arg(short, long, value_name = "CODE", conflicts_with = "file")]
    eval: Option<String>,

    /// Print the syntax tree instead of running the program
    #[arg(long)]
    ast: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_env("JCODE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    execute(args)
}

fn execute(args: Args) -> Result<ExitCode> {
    let mut session = Session::new();

    if let Some(code) = &args.eval {
        return Ok(run_source(&mut session, "<eval>", code, args.ast));
    }

    match &args.file {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path.display()))?;
            let name = path.display().to_string();
            debug!(file = name.as_str(), bytes = text.len(), "loaded program");
            Ok(run_source(&mut session, &name, &text, args.ast))
        }
        None => {
            shell::run_shell(&mut session)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_source(session: &mut Session, name: &str, text: &str, ast: bool) -> ExitCode {
    let output = if ast {
        session.parse(name, text).map(|program| Some(program.to_string()))
    } else {
        session
            .run(name, text)
            .map(|value| shell::display_result(&value))
    };

    match output {
        Ok(Some(out)) => {
            println!("{}", out);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.render());
            ExitCode::FAILURE
        }
    }
}
