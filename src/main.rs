use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lontar::{EngineError, Row, Table};
use rustyline::{DefaultEditor, error::ReadlineError};

#[derive(Parser, Debug)]
#[command(name = "lontar", about = "A minimal embedded B-tree database")]
struct Args {
    /// Database file to open or create
    #[arg(default_value = "lontar.db")]
    file: PathBuf,

    /// Readline history file
    #[arg(long, default_value = ".lontar_history")]
    history: PathBuf,
}

enum ReplOutcome {
    Continue,
    Exit,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> lontar::Result<()> {
    let mut table = Table::open(&args.file)?;
    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("failed to start line editor: {err}");
            return Ok(());
        }
    };
    let _ = rl.load_history(&args.history);

    loop {
        match rl.readline("lontar> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);
                match dispatch(&mut table, input) {
                    Ok(ReplOutcome::Continue) => {}
                    Ok(ReplOutcome::Exit) => break,
                    Err(err) if err.is_fatal() => {
                        let _ = rl.save_history(&args.history);
                        return Err(err);
                    }
                    Err(err) => println!("Error: {err}"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("input error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&args.history);
    table.close()?;
    println!("Goodbye!");
    Ok(())
}

fn dispatch(table: &mut Table, input: &str) -> lontar::Result<ReplOutcome> {
    if input.starts_with('.') {
        return meta_command(table, input);
    }

    let mut parts = input.split_whitespace();
    match parts.next() {
        Some("insert") => {
            let (Some(id), Some(username), Some(email), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                println!("Syntax error. Could not parse statement.");
                return Ok(ReplOutcome::Continue);
            };
            let Ok(id) = id.parse::<u64>() else {
                println!("ID must be a non-negative integer.");
                return Ok(ReplOutcome::Continue);
            };
            table.insert(&Row::new(id, username, email))?;
            println!("Executed.");
        }
        Some("select") => {
            for row in table.select()? {
                let row = row?;
                println!("({}, {}, {})", row.id, row.username, row.email);
            }
            println!("Executed.");
        }
        Some(keyword) => println!("Unrecognized keyword at start of '{keyword}'."),
        None => {}
    }
    Ok(ReplOutcome::Continue)
}

fn meta_command(table: &mut Table, input: &str) -> lontar::Result<ReplOutcome> {
    match input {
        ".exit" | ".quit" => Ok(ReplOutcome::Exit),
        ".btree" => {
            print!("{}", table.render_tree()?);
            Ok(ReplOutcome::Continue)
        }
        ".help" => {
            println!(
                r#"
Statements:
  insert <id> <username> <email>  - insert one row
  select                          - list all rows in key order

Meta-commands:
  .btree  - print the tree structure
  .help   - show this help message
  .exit   - flush pages and quit
"#
            );
            Ok(ReplOutcome::Continue)
        }
        _ => {
            println!("Unrecognized command '{input}'");
            Ok(ReplOutcome::Continue)
        }
    }
}
