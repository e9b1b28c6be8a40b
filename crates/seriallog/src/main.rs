//! `serlog` - CLI for seriallog
//!
//! This binary reads line-delimited records from a serial port and logs
//! them to a CSV file until stopped with Ctrl+C.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use seriallog::cli::{Cli, Command, ConfigCommand, PortsCommand, RunCommand};
use seriallog::{init_logging, Config, Error, LoopExit, Session, SessionStats, StopHandle};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = match Config::load_from(cli.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Execute the command
    match cli.command {
        Command::Run(run_cmd) => handle_run(&config, &run_cmd),
        Command::Ports(ports_cmd) => finish(handle_ports(&ports_cmd)),
        Command::Config(config_cmd) => finish(handle_config(&config, config_cmd)),
    }
}

fn finish(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn handle_run(config: &Config, cmd: &RunCommand) -> ExitCode {
    let stop = StopHandle::new();
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_stop.stop()) {
        eprintln!("Failed to install Ctrl+C handler: {e}");
        return ExitCode::FAILURE;
    }

    if let Ok(dir) = std::env::current_dir() {
        debug!("working directory: {}", dir.display());
    }

    let mut session = Session::new(config.clone(), cmd.port.as_str(), cmd.baud);
    if let Some(output) = &cmd.output {
        session = session.with_output(output.clone());
    }

    println!(
        "Logging {} at {} baud to {}. Press Ctrl+C to stop.",
        cmd.port,
        cmd.baud,
        session.output().display()
    );

    match session.run(&stop) {
        Ok((stats, LoopExit::StopRequested)) => {
            println!("Logging stopped by user.");
            print_summary(&stats);
            ExitCode::SUCCESS
        }
        Ok((stats, LoopExit::Failed(err))) => {
            eprintln!("Unexpected error: {err}");
            print_summary(&stats);
            ExitCode::FAILURE
        }
        Err(err) => {
            report_setup_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Report a setup failure with a message specific to its category.
fn report_setup_error(err: &Error) {
    if err.is_port_unavailable() || err.is_permission_error() {
        // The display form already names the port and the cause.
        eprintln!("{err}");
    } else {
        eprintln!("Unexpected error: {err}");
    }
}

fn print_summary(stats: &SessionStats) {
    println!(
        "{} lines read, {} rows written, {} lines skipped.",
        stats.lines_read, stats.rows_written, stats.lines_skipped
    );
}

fn handle_ports(cmd: &PortsCommand) -> anyhow::Result<()> {
    let ports = seriallog::serial::available_ports()?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    println!("Available serial ports:");
    for port in ports {
        println!();
        println!("  {} ({})", port.name, port.kind);
        if let Some(manufacturer) = &port.manufacturer {
            println!("    Manufacturer: {manufacturer}");
        }
        if let Some(product) = &port.product {
            println!("    Product: {product}");
        }
        if let Some(serial_number) = &port.serial_number {
            println!("    Serial: {serial_number}");
        }
        if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            println!("    VID:PID: {vid:04x}:{pid:04x}");
        }
    }

    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Output]");
                println!("  Path:             {}", config.output_path().display());
                println!("  Header:           {}", config.output.header.join(", "));
                println!("  Delimiter:        '{}'", config.output.delimiter);
                println!("  Expected fields:  {}", config.output.expected_fields);
                println!();
                println!("[Acquisition]");
                println!(
                    "  Read timeout:     {} ms",
                    config.acquisition.read_timeout_ms
                );
                println!(
                    "  Settle delay:     {} ms",
                    config.acquisition.settle_delay_ms
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
