use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use clap::Subcommand;
use owo_colors::OwoColorize;

use lox::ast_printer::AstPrinter;
use lox::error::Result;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::repl;
use lox::resolver::Resolver;
use lox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Lox script to execute. Starts the REPL when omitted.
    script: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes the provided input from a given valid filepath
    Tokenize { filename: PathBuf },

    /// Parses the provided input and prints the AST
    Parse { filename: PathBuf },
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Cli = Cli::parse();

    let code: u8 = match (args.command, args.script) {
        (Some(Commands::Tokenize { filename }), _) => tokenize(&filename),

        (Some(Commands::Parse { filename }), _) => parse(&filename),

        (None, Some(script)) => run_file(&script),

        (None, None) => {
            repl::start();
            0
        }
    };

    ExitCode::from(code)
}

fn read_source(path: &PathBuf) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(File::open(path)?);
    reader.read_to_end(&mut buf)?;

    Ok(String::from_utf8(buf)?)
}

fn run_file(path: &PathBuf) -> u8 {
    let source: String = match read_source(path) {
        Ok(source) => source,

        Err(err) => {
            eprintln!("{}", err.to_string().red());
            return 1;
        }
    };

    let scanner = Scanner::new(&source);
    let parser = Parser::new(scanner);
    let (statements, diagnostics) = parser.parse();

    for err in &diagnostics {
        eprintln!("{}", err.to_string().red());
    }

    let mut resolver = Resolver::new();
    if let Err(err) = resolver.resolve(&statements) {
        eprintln!("{}", err.to_string().red());
        return 65;
    }

    let mut interpreter: Interpreter<io::Stdout> = Interpreter::new(io::stdout());
    if let Err(err) = interpreter.interpret(&statements) {
        eprintln!("{}", err.to_string().red());
        return 70;
    }

    if diagnostics.is_empty() {
        0
    } else {
        65
    }
}

fn tokenize(path: &PathBuf) -> u8 {
    let source: String = match read_source(path) {
        Ok(source) => source,

        Err(err) => {
            eprintln!("{}", err.to_string().red());
            return 1;
        }
    };

    let mut scanner = Scanner::new(&source);

    for token in scanner.by_ref() {
        println!("{}", token);
    }

    let had_error: bool = scanner.had_error();
    for err in scanner.take_diagnostics() {
        eprintln!("{}", err.to_string().red());
    }

    if had_error {
        65
    } else {
        0
    }
}

fn parse(path: &PathBuf) -> u8 {
    let source: String = match read_source(path) {
        Ok(source) => source,

        Err(err) => {
            eprintln!("{}", err.to_string().red());
            return 1;
        }
    };

    let scanner = Scanner::new(&source);
    let parser = Parser::new(scanner);
    let (statements, diagnostics) = parser.parse();

    for err in &diagnostics {
        eprintln!("{}", err.to_string().red());
    }

    for stmt in &statements {
        println!("{}", AstPrinter::print_stmt(stmt));
    }

    if diagnostics.is_empty() {
        0
    } else {
        65
    }
}
