//! Compile a ground probabilistic logic program into weighted CNF:
//! read the program; parse, unloop, and complete it; print DIMACS.

use std::fs::{read_to_string, write};
use std::io::{stdin, Read};
use std::iter::once;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context as _, Result};
use atty::Stream;
use clap::{Parser, ValueEnum};

use lpwmc_semantics::{WmcCompiler, WmcProblem};
use lpwmc_syntax::{parse_program, Literal};
use lpwmc_tracer::{trace, Trace};

/// Loop breaking and completion recurse as deep as the longest chain
/// of rules, so the compiler runs on a thread with a generous stack.
const STACK_SIZE: usize = 256 * 1024 * 1024;

/// Compile a ground probabilistic logic program into weighted CNF.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Program to compile; standard input if absent or `-`.
    file: Option<PathBuf>,
    /// Write the weights of the CNF variables to this file.
    #[arg(long, value_name = "PATH")]
    weights: Option<PathBuf>,
    /// Write the atom of each CNF variable to this file.
    #[arg(long, value_name = "PATH")]
    translation: Option<PathBuf>,
    /// Add a query literal, e.g. `-q 'p(1)'`.
    #[arg(short, long = "query", value_name = "LIT", allow_hyphen_values = true)]
    queries: Vec<Literal>,
    /// Add an evidence literal, e.g. `-e '\+p(2)'`.
    #[arg(short, long, value_name = "LIT", allow_hyphen_values = true)]
    evidence: Vec<Literal>,
    /// Trace pipeline stages on standard error.
    #[arg(short, long, value_enum, value_name = "LEVEL")]
    trace: Vec<TraceLevel>,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum TraceLevel {
    All,
    Parse,
    Ground,
    Break,
    Complete,
    Encode,
}

impl From<TraceLevel> for Trace {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::All => Trace::All,
            TraceLevel::Parse => Trace::Parse,
            TraceLevel::Ground => Trace::Ground,
            TraceLevel::Break => Trace::Break,
            TraceLevel::Complete => Trace::Complete,
            TraceLevel::Encode => Trace::Encode,
        }
    }
}

impl Cli {
    fn trace(&self) -> Trace {
        self.trace
            .iter()
            .fold(Trace::none(), |trace, &level| trace | Trace::from(level))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    thread::Builder::new()
        .name(String::from("compiler"))
        .stack_size(STACK_SIZE)
        .spawn(move || run(cli))
        .context("Spawning compiler thread")?
        .join()
        .map_err(|_| anyhow!("Compiler thread panicked"))?
}

fn run(cli: Cli) -> Result<()> {
    let trace = cli.trace();
    if atty::is(Stream::Stdin) && atty::is(Stream::Stdout) && read_stdin(cli.file.as_deref()) {
        println!("Please enter a ground program, terminated with Ctrl-D.");
    }
    let input = read_file(cli.file.as_deref())?;
    trace!(trace, Parse, "Program text:\n{}", input);
    let statements = parse_program(&input).context("Parsing program")?;

    let mut compiler = WmcCompiler::new(statements, trace)?;
    for lit in cli.queries {
        compiler.add_query(lit);
    }
    for lit in cli.evidence {
        compiler.add_evidence(lit);
    }
    let problem = compiler.run()?;
    print!("{}", dimacs(&problem));

    if let Some(path) = cli.weights {
        let weights = problem.compilation.weights.to_string();
        write(&path, weights).with_context(|| format!("Writing {}", path.display()))?;
    }
    if let Some(path) = cli.translation {
        let translation = problem.compilation.translation.to_string();
        write(&path, translation).with_context(|| format!("Writing {}", path.display()))?;
    }
    Ok(())
}

/// The CNF in DIMACS format, preceded by comment lines that
/// give the signed variables of the queries and evidence.
fn dimacs(problem: &WmcProblem) -> String {
    let queries = problem.queries.iter().map(|q| format!("c query {q}\n"));
    let evidence = problem.evidence.iter().map(|e| format!("c evidence {e}\n"));
    queries
        .chain(evidence)
        .chain(once(problem.compilation.cnf.to_dimacs()))
        .collect()
}

fn read_stdin(filename: Option<&Path>) -> bool {
    filename.map_or(true, |f| f == Path::new("-"))
}

/// Read a file or standard input and return the content as a string.
fn read_file(filename: Option<&Path>) -> Result<String> {
    match filename {
        Some(filename) if !read_stdin(Some(filename)) => read_to_string(filename)
            .with_context(|| format!("Reading {}", filename.display())),
        _ => {
            let mut buffer = String::new();
            stdin()
                .read_to_string(&mut buffer)
                .context("Reading from stdin")?;
            Ok(buffer)
        }
    }
}
