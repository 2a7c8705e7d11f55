use std::io::{self, BufRead, Write};

use owo_colors::OwoColorize;

use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;

const PROMPT: &str = ">> ";

/// Interactive session: one interpreter shared across lines, so definitions
/// persist. Ends on EOF or the literal line `exit`.
pub fn start() {
    println!("Lox programming language.");
    println!("Feel free to type commands.");
    println!("Type \"exit\" to exit.");

    let stdin = io::stdin();
    let mut interpreter: Interpreter<io::Stdout> = Interpreter::new(io::stdout());

    loop {
        print!("{}", PROMPT.cyan());
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF

            Ok(_) => {}

            Err(err) => {
                eprintln!("{}", err.to_string().red());
                break;
            }
        }

        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if line == "exit" {
            break;
        }

        run_line(&mut interpreter, line);
    }
}

fn run_line(interpreter: &mut Interpreter<io::Stdout>, line: &str) {
    let scanner = Scanner::new(line);
    let parser = Parser::new(scanner);
    let (statements, diagnostics) = parser.parse();

    for err in &diagnostics {
        eprintln!("{}", err.to_string().red());
    }

    let mut resolver = Resolver::new();
    if let Err(err) = resolver.resolve(&statements) {
        eprintln!("{}", err.to_string().red());
        return;
    }

    // A lone expression statement echoes its value as `<type> <value>`.
    let echo: bool = statements.len() == 1 && matches!(statements[0], Stmt::Expression(_));

    match interpreter.interpret(&statements) {
        Ok(Some(value)) if echo => {
            println!("{} {}", value.type_name().bright_black(), value);
        }

        Ok(_) => {}

        Err(err) => eprintln!("{}", err.to_string().red()),
    }
}
