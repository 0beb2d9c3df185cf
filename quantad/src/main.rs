//! # Quanta Host Daemon
//!
//! Main entry point for the Quanta simulator.

use quantad::{parse_args, usage, HostRuntime, ParsedArgs};
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("quantad");

    let config = match parse_args(&args) {
        Ok(ParsedArgs::Run(config)) => config,
        Ok(ParsedArgs::Help) => {
            eprint!("{}", usage(program));
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprint!("{}", usage(program));
            process::exit(1);
        }
    };

    if let Err(e) = services_logger::init(config.log_level) {
        eprintln!("Failed to install logger: {}", e);
    }

    if let Err(e) = HostRuntime::new(config).run() {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    }
}
