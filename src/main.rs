// gos - The Gos programming language toolchain
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Command-line driver: compile, run, inspect and interpret Gos
//! programs, plus an interactive REPL over the tree-walking evaluator.

use std::io::{self, Write};
use std::path::Path;
use std::process;

use clap::{Arg, ArgAction, ArgMatches, Command};

use gos_core::{eval, eval_program, Context, Env, Error as EvalError};
use gos_parser::{optimize, Parser, Preprocessor, PrimValue, Program};
use gos_vm::{compile, Outcome, Vm, CHUNK_EXTENSION};

/// Source file extension.
const SOURCE_EXTENSION: &str = "gos";

fn main() {
    let matches = Command::new("gos")
        .version(env!("CARGO_PKG_VERSION"))
        .about("The Gos programming language toolchain")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("no_newline")
                .short('n')
                .long("no-newline")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Do not append a newline after each 'out'"),
        )
        .subcommand(
            Command::new("compile")
                .about("Compile a source file to a .gbc chunk beside it")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("run")
                .about("Execute a source file or a compiled .gbc chunk")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("ast")
                .about("Dump the optimized syntax tree")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("preprocess")
                .about("Dump the preprocessed source")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("dis")
                .about("Disassemble a source file or a compiled .gbc chunk")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("interpret")
                .about("Run a source file on the tree-walking interpreter")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(Command::new("repl").about("Interactive read-eval-print loop"))
        .get_matches();

    let newline = !matches.get_flag("no_newline");

    let result = match matches.subcommand() {
        Some(("compile", sub)) => cmd_compile(file_arg(sub)),
        Some(("run", sub)) => cmd_run(file_arg(sub), newline),
        Some(("ast", sub)) => cmd_ast(file_arg(sub)),
        Some(("preprocess", sub)) => cmd_preprocess(file_arg(sub)),
        Some(("dis", sub)) => cmd_dis(file_arg(sub)),
        Some(("interpret", sub)) => cmd_interpret(file_arg(sub), newline),
        Some(("repl", _)) => cmd_repl(newline),
        _ => unreachable!("subcommand required"),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn file_arg(matches: &ArgMatches) -> &str {
    matches
        .get_one::<String>("file")
        .expect("file argument is required")
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Preprocess, parse and optimize a source file.
fn front_end(path: &Path) -> Result<Program, Box<dyn std::error::Error>> {
    let expanded = Preprocessor::new().expand_file(path)?;
    let program = Parser::new(&expanded)?.parse()?;
    Ok(optimize(program))
}

fn require_source(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match extension(path) {
        Some(SOURCE_EXTENSION) => Ok(()),
        _ => Err(format!(
            "'{}' is not a .{} source file",
            path.display(),
            SOURCE_EXTENSION
        )
        .into()),
    }
}

/// Load a chunk: directly from a `.gbc` file, or through the full
/// pipeline for a source file.
fn load_chunk(path: &Path) -> Result<gos_vm::Chunk, Box<dyn std::error::Error>> {
    match extension(path) {
        Some(CHUNK_EXTENSION) => Ok(gos_vm::load_file(path)?),
        Some(SOURCE_EXTENSION) => Ok(compile(&front_end(path)?)?),
        _ => Err(format!(
            "'{}': expected a .{} or .{} file",
            path.display(),
            SOURCE_EXTENSION,
            CHUNK_EXTENSION
        )
        .into()),
    }
}

fn cmd_compile(file: &str) -> Result<i32, Box<dyn std::error::Error>> {
    let path = Path::new(file);
    require_source(path)?;

    let program = front_end(path)?;
    let chunk = compile(&program)?;
    let bytes = gos_vm::save(&chunk)?;
    let output = path.with_extension(CHUNK_EXTENSION);
    std::fs::write(&output, &bytes)?;

    println!(
        "Compiled {} to {} ({} bytes)",
        file,
        output.display(),
        bytes.len()
    );
    Ok(0)
}

fn cmd_run(file: &str, newline: bool) -> Result<i32, Box<dyn std::error::Error>> {
    let chunk = load_chunk(Path::new(file))?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut ctx = Context::new(&mut out, &mut input);
    ctx.newline = newline;

    match Vm::new().run(&chunk, &mut ctx)? {
        Outcome::Finished(_) => Ok(0),
        Outcome::Exited(status) => Ok(status),
    }
}

fn cmd_ast(file: &str) -> Result<i32, Box<dyn std::error::Error>> {
    let path = Path::new(file);
    require_source(path)?;
    println!("{:#?}", front_end(path)?);
    Ok(0)
}

fn cmd_preprocess(file: &str) -> Result<i32, Box<dyn std::error::Error>> {
    let path = Path::new(file);
    require_source(path)?;
    print!("{}", Preprocessor::new().expand_file(path)?);
    Ok(0)
}

fn cmd_dis(file: &str) -> Result<i32, Box<dyn std::error::Error>> {
    let chunk = load_chunk(Path::new(file))?;
    print!("{}", chunk.disassemble());
    Ok(0)
}

fn cmd_interpret(file: &str, newline: bool) -> Result<i32, Box<dyn std::error::Error>> {
    let path = Path::new(file);
    require_source(path)?;
    let program = front_end(path)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut ctx = Context::new(&mut out, &mut input);
    ctx.newline = newline;

    let mut env = Env::new();
    match eval_program(&program, &mut env, &mut ctx) {
        Ok(_) => Ok(0),
        Err(EvalError::Exit(status)) => Ok(status),
        Err(e) => Err(e.into()),
    }
}

/// Read-eval-print loop over the tree-walking evaluator. Definitions
/// persist across lines.
fn cmd_repl(newline: bool) -> Result<i32, Box<dyn std::error::Error>> {
    println!("Gos v{}", env!("CARGO_PKG_VERSION"));

    let mut env = Env::new();
    loop {
        print!("gos> ");
        io::stdout().flush()?;

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                println!();
                return Ok(0);
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Read error: {}", e);
                return Ok(1);
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let program = match Parser::new(line).and_then(|mut p| p.parse()) {
            Ok(program) => optimize(program),
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match eval_line(&program, &mut env, newline) {
            Ok(PrimValue::Unit) => {}
            Ok(value) => println!("{}", value),
            Err(EvalError::Exit(status)) => return Ok(status),
            Err(e) => eprintln!("{}", e),
        }
    }
}

/// Evaluate one REPL line against the persistent environment, returning
/// the value of the last expression.
fn eval_line(program: &Program, env: &mut Env, newline: bool) -> gos_core::Result<PrimValue> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut ctx = Context::new(&mut out, &mut input);
    ctx.newline = newline;

    let mut last = PrimValue::Unit;
    for expr in &program.body {
        let value = eval(expr, env, &mut ctx)?;
        last = if expr.is_expression() {
            value
        } else {
            PrimValue::Unit
        };
    }
    Ok(last)
}
