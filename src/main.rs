// jodin-exec: run a type-resolved Jodin program tree

use std::fs;
use std::path::Path;

use jodin_exec::interpreter::{EngineConfig, Interpreter};
use jodin_exec::output::OutputSink;
use jodin_exec::tree::Program;

struct Options {
    config: EngineConfig,
    program_path: String,
    /// Arguments passed through to the program as `argv`
    program_args: Vec<String>,
}

fn usage(program_name: &str) -> ! {
    eprintln!(
        "Usage: {} [--entry NAME] [--dump-state] <program.json> [args...]",
        program_name
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --entry NAME    function to run (default: start)");
    eprintln!("  --dump-state    print the execution state when the program faults");
    eprintln!();
    eprintln!("Set RUST_LOG=jodin_exec=debug to trace calls.");
    std::process::exit(1);
}

fn parse_args(args: &[String]) -> Options {
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("jodin-exec");
    let mut config = EngineConfig::default();
    let mut rest = args.iter().skip(1);
    let program_path = loop {
        match rest.next().map(String::as_str) {
            Some("--entry") => match rest.next() {
                Some(name) => config.entry_symbol = name.clone(),
                None => {
                    eprintln!("Error: --entry needs a function name");
                    usage(program_name);
                }
            },
            Some("--dump-state") => config.dump_state_on_fault = true,
            Some("--help") | Some("-h") => usage(program_name),
            Some(path) => break path.to_string(),
            None => {
                eprintln!("Error: No program file provided");
                eprintln!();
                usage(program_name);
            }
        }
    };
    Options {
        config,
        program_path,
        program_args: rest.cloned().collect(),
    }
}

fn main() {
    jodin_exec::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args);

    if !Path::new(&options.program_path).exists() {
        eprintln!("Error: File '{}' not found", options.program_path);
        std::process::exit(1);
    }

    let source = match fs::read_to_string(&options.program_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: Cannot read '{}': {}", options.program_path, e);
            std::process::exit(1);
        }
    };

    let program = match Program::from_json(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: Invalid program tree: {}", e);
            std::process::exit(1);
        }
    };

    let mut interpreter =
        match Interpreter::with_options(program, options.config, OutputSink::stdout()) {
            Ok(interpreter) => interpreter,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };

    // argv[0] is the program file, as a native executable would see it
    let mut argv = vec![options.program_path.clone()];
    argv.extend(options.program_args);
    let status = interpreter.run(&argv);

    if let Err(e) = interpreter.output_mut().flush() {
        eprintln!("Error: Cannot flush output: {}", e);
    }
    std::process::exit(status);
}
