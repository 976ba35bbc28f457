// src/main.rs

// Command-line front end: a prompt when run bare, a script runner when given a path.

use clap::Parser as ClapParser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use loxvm::vm::disassemble_chunk;
use loxvm::{InterpretError, VM};

const EXIT_USAGE: i32 = 64;
const EXIT_IO: i32 = 74;

#[derive(ClapParser, Debug)]
#[command(version, about = "Bytecode interpreter for single expressions", long_about = None)]
struct Cli {
    /// The script file to run. If not provided, launches the REPL.
    file: Option<PathBuf>,

    /// Print the compiled bytecode before running it.
    #[arg(long)]
    disassemble: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(EXIT_USAGE);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let mut vm = VM::new();
    let code = match cli.file {
        Some(path) => run_file(&mut vm, &path, cli.disassemble),
        None => {
            repl(&mut vm, cli.disassemble);
            0
        }
    };
    process::exit(code);
}

/// Interprets one source string, printing the result or the error.
fn run_source(vm: &mut VM, source: &str, disassemble: bool) -> Result<(), InterpretError> {
    let result = vm.interpret_with(source, |chunk, heap| {
        if disassemble {
            print!("{}", disassemble_chunk(chunk, heap, "code"));
        }
    });

    match result {
        Ok(value) => {
            println!("{}", value.display(vm.heap()));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            Err(e)
        }
    }
}

// Simple REPL
fn repl(vm: &mut VM, disassemble: bool) {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
            None => {
                println!();
                break;
            }
        };
        if line.trim() == "exit" {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        // Errors were already reported; the prompt keeps going.
        let _ = run_source(vm, &line, disassemble);
    }
}

/// Runs a script file and returns the process exit code.
fn run_file(vm: &mut VM, path: &Path, disassemble: bool) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Could not read file \"{}\": {}", path.display(), e);
            return EXIT_IO;
        }
    };
    match run_source(vm, &source, disassemble) {
        Ok(()) => 0,
        Err(e) => e.exit_code(),
    }
}
