use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use lispy::evaluator::{Environment, create_global_env_with_config};
use lispy::{EVAL_STACK_SIZE, ParseConfig, Value, eval, load_library, read_forms};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

const DEFAULT_STDLIB: &str = "stdlib.lspy";

struct Options {
    /// Library loaded before anything else, if any
    stdlib: Option<PathBuf>,
    /// Further files loaded before the prompt appears
    files: Vec<PathBuf>,
}

fn print_usage() {
    println!("Usage: lispy [options] [files...]");
    println!("Options:");
    println!("  -h, --help: Print this help message");
    println!("  --stdlib <path>: Library to load at start (default: {DEFAULT_STDLIB} if present)");
    println!("  --no-stdlib: Do not load a standard library");
}

fn parse_options() -> Result<Options, String> {
    let mut args = pico_args::Arguments::from_env();

    if args.contains(["-h", "--help"]) {
        print_usage();
        process::exit(0);
    }

    let no_stdlib = args.contains("--no-stdlib");
    let explicit_stdlib = args
        .opt_value_from_str::<_, PathBuf>("--stdlib")
        .map_err(|e| e.to_string())?;

    let stdlib = match (no_stdlib, explicit_stdlib) {
        (true, _) => None,
        (false, Some(path)) => Some(path),
        (false, None) => Some(PathBuf::from(DEFAULT_STDLIB)).filter(|path| path.exists()),
    };

    let files = args.finish().into_iter().map(PathBuf::from).collect();

    Ok(Options { stdlib, files })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let options = match parse_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {e}");
            print_usage();
            process::exit(2);
        }
    };

    init_tracing();

    // Evaluation recurses natively, so it runs on a thread with a stack sized for it
    let repl = thread::Builder::new()
        .name("lispy-repl".to_owned())
        .stack_size(EVAL_STACK_SIZE)
        .spawn(move || run_repl(&options));

    let result = match repl {
        Ok(handle) => handle.join(),
        Err(e) => {
            eprintln!("Could not start the REPL thread: {e}");
            process::exit(1);
        }
    };

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn load(env: &mut Environment, path: &Path) {
    tracing::info!(path = %path.display(), "loading");
    load_library(env, &path.to_string_lossy());
}

/// Evaluate every top-level form of a line, printing each result
fn eval_line(env: &mut Environment, config: &ParseConfig, line: &str) {
    match read_forms(line, config) {
        Ok(forms) => {
            for form in forms {
                let result: Value = eval(env, form);
                println!("{result}");
            }
        }
        Err(e) => println!("Error: {e}"),
    }
}

fn run_repl(options: &Options) {
    let config = ParseConfig::default();
    let mut env = create_global_env_with_config(config);

    if let Some(stdlib) = &options.stdlib {
        load(&mut env, stdlib);
    }
    for file in &options.files {
        load(&mut env, file);
    }

    println!("Lispy Version {}", env!("CARGO_PKG_VERSION"));
    println!("Press Ctrl+C to Exit");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Could not initialize REPL: {e}");
            return;
        }
    };

    loop {
        match rl.readline("lispy> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);
                eval_line(&mut env, &config, line);
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}
