use clap::{Parser, Subcommand};
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tejun::prelude::*;
use tracing_subscriber::EnvFilter;

/// Validate and run business process graphs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a process definition and print every error found
    Validate {
        /// Path to the process JSON file
        process_path: String,
        /// Optional path to a JSON array of record type definitions
        #[arg(short, long)]
        catalog: Option<String>,
    },
    /// Validate and execute a process against in-memory records
    Run {
        /// Path to the process JSON file
        process_path: String,
        /// Path to a JSON object mapping process input names to values
        #[arg(short, long)]
        inputs: String,
        #[arg(short, long)]
        catalog: Option<String>,
        /// Optional path to the engine configuration JSON file
        #[arg(long)]
        config: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate {
            process_path,
            catalog,
        } => {
            let catalog = load_catalog(catalog.as_deref());
            let mut process = load_process(&process_path);
            validate_or_exit(&catalog, &mut process);
            println!("Process '{}' is valid.", process.name);
        }
        Command::Run {
            process_path,
            inputs,
            catalog,
            config,
        } => run(&process_path, &inputs, catalog.as_deref(), config.as_deref()),
    }
}

fn run(process_path: &str, inputs_path: &str, catalog: Option<&str>, config: Option<&str>) {
    let total_start = Instant::now();
    let catalog = load_catalog(catalog);
    let mut process = load_process(process_path);
    validate_or_exit(&catalog, &mut process);

    let config = config
        .map(|path| {
            EngineConfig::from_file(path)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e)))
        })
        .unwrap_or_default();

    let inputs_json = read_file(inputs_path);
    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&inputs_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse inputs JSON: {}", e)));

    // Input records become the initial contents of the record store.
    let records = Arc::new(MemoryRecordStore::new());
    let mut inputs = AHashMap::new();
    for (name, json) in raw {
        let value = match Value::from_json(json) {
            Value::Record(mut record) => {
                records
                    .save(&mut record)
                    .unwrap_or_else(|e| exit_with_error(&format!("Failed to store '{}': {}", name, e)));
                Value::Record(record)
            }
            other => other,
        };
        inputs.insert(name, value);
    }

    let mut executor = ProcessExecutor::builder(records.clone(), ActionRegistry::new())
        .with_catalog(Arc::new(catalog))
        .with_config(config)
        .build();
    let exec_start = Instant::now();
    let result = executor
        .prepare(Arc::new(process))
        .and_then(|_| executor.execute(inputs))
        .unwrap_or_else(|e| exit_with_error(&format!("Execution failed: {}", e)));
    let exec_duration = exec_start.elapsed();

    println!("\n--- Trace ---");
    print!("{}", TraceFormatter::format_trace(&result.trace));

    println!("\n--- Outputs ---");
    if !result.passed_entry_point {
        println!("  -> Trigger record rejected by the entry point");
    }
    let mut outputs: Vec<_> = result.outputs.iter().collect();
    outputs.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in outputs {
        println!("  {} = {}", name, value);
    }

    println!("\n--- Performance Summary ---");
    println!("Execution:            {:?}", exec_duration);
    println!("Total:                {:?}", total_start.elapsed());
    println!("Record saves:         {}", records.save_count());
}

fn validate_or_exit(catalog: &TypeCatalog, process: &mut Process) {
    let validation = ProcessValidator::new(catalog).validate(process);
    if !validation.is_valid() {
        eprintln!("Process '{}' is invalid:", process.name);
        for message in validation.messages() {
            eprintln!("  - {}", message);
        }
        std::process::exit(1);
    }
}

fn load_process(path: &str) -> Process {
    let json = read_file(path);
    serde_json::from_str(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse process JSON: {}", e)))
}

fn load_catalog(path: Option<&str>) -> TypeCatalog {
    let Some(path) = path else {
        return TypeCatalog::new();
    };
    let json = read_file(path);
    let types: Vec<RecordType> = serde_json::from_str(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse catalog JSON: {}", e)));
    TypeCatalog::from_types(types)
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read file '{}': {}", path, e)))
}

/// Prints an error message to stderr and exits the process.
fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
