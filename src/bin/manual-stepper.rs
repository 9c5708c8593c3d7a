//! CLI for stepping through a manual function.
//!
//! Usage:
//!   manual-stepper <config.toml>                 # Interactive stepping
//!   manual-stepper <config.json> --dump          # Print the history as JSON
//!   manual-stepper <config.toml> --set a=3       # Override an external value

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use manual_stepper::session::{ManualConfig, MemoryHost, Session};

/// Step through a manual function one node at a time
#[derive(Debug, Parser)]
#[command(name = "manual-stepper", version)]
struct Args {
    /// Configuration file (.toml or .json)
    config: PathBuf,

    /// Print the whole history as JSON and exit
    #[arg(long)]
    dump: bool,

    /// Override an external value, `name=value` with a JSON value
    #[arg(long = "set", value_name = "NAME=VALUE")]
    overrides: Vec<String>,
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = match ManualConfig::from_path(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading '{}': {}", args.config.display(), e);
            process::exit(1);
        }
    };
    for assignment in &args.overrides {
        if let Err(e) = apply_override(&mut config, assignment) {
            eprintln!("Invalid --set '{}': {}", assignment, e);
            process::exit(1);
        }
    }

    let mut session = Session::new(MemoryHost::new(config.default_values()));
    if !session.load(&config) {
        eprintln!(
            "Nothing to run: {}",
            session.execution_error().unwrap_or("no manual function")
        );
        process::exit(1);
    }

    if args.dump {
        match serde_json::to_string_pretty(session.history().steps()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Could not serialize history: {}", e);
                process::exit(1);
            }
        }
        return;
    }
    run_prompt(&mut session);
}

/// `--set name=value` replaces the default of `name`. Values that are not
/// JSON are taken as strings.
fn apply_override(config: &mut ManualConfig, assignment: &str) -> Result<(), String> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| "expected NAME=VALUE".to_string())?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    match config.variables.iter_mut().find(|v| v.id == name) {
        Some(variable) => {
            variable.default = value;
            Ok(())
        }
        None => Err(format!("no variable named '{}'", name)),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  n / p      step forward / backward");
    println!("  b / B      next / previous breakpoint");
    println!("  k / K      next / previous block");
    println!("  g <index>  go to a step");
    println!("  v          show variables");
    println!("  s          show the stack");
    println!("  q          quit");
}

fn run_prompt(session: &mut Session<MemoryHost>) {
    if let Some(error) = session.execution_error() {
        println!("Execution error: {}", error);
    }
    println!(
        "{} steps, breakpoints at {:?}, blocks at {:?}",
        session.history_len(),
        session.breakpoint_points(),
        session.block_points()
    );
    print_help();
    show_current(session);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("[{}]> ", session.current_index());
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }
        let mut words = line.split_whitespace();
        let moved = match words.next() {
            Some("n") => session.step_forward(),
            Some("p") => session.step_backward(),
            Some("b") => session.step_to_next_breakpoint(),
            Some("B") => session.step_to_prev_breakpoint(),
            Some("k") => session.step_to_next_block(),
            Some("K") => session.step_to_prev_block(),
            Some("g") => match words.next().and_then(|w| w.parse().ok()) {
                Some(index) => session.step_to_index(index),
                None => {
                    println!("usage: g <index>");
                    continue;
                }
            },
            Some("v") => {
                show_variables(session);
                continue;
            }
            Some("s") => {
                show_stack(session);
                continue;
            }
            Some("q") => break,
            Some(_) => {
                print_help();
                continue;
            }
            None => continue,
        };
        if moved {
            session.flush_visual_cues();
            show_current(session);
        } else {
            println!("(no move)");
        }
    }
}

fn show_current(session: &Session<MemoryHost>) {
    let step = match session.current_step() {
        Some(step) => step,
        None => return,
    };
    let text = session.program_text();
    let snippet = text
        .get(step.highlight.start..step.highlight.end)
        .unwrap_or_default();
    let snippet = snippet.lines().next().unwrap_or_default();
    println!("#{} {}: {}", step.index, step.node_type, snippet);
    if let Some(payload) = &step.breakpoint {
        match serde_json::to_string(payload) {
            Ok(json) => println!("  breakpoint: {}", json),
            Err(e) => println!("  breakpoint: <{}>", e),
        }
    }
    if !session.host().cued.is_empty() {
        println!("  changed: {}", session.host().cued.join(", "));
    }
}

fn show_variables(session: &Session<MemoryHost>) {
    if let Some(step) = session.current_step() {
        for (name, value) in &step.variables {
            println!("  {} = {}", name, value);
        }
    }
}

fn show_stack(session: &Session<MemoryHost>) {
    if let Some(step) = session.current_step() {
        for line in &step.stack_trace {
            println!("  {}", line);
        }
    }
}
