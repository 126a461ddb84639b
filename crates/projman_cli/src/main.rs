//! `projman` command-line host.
//!
//! # Responsibility
//! - Bind `-f key=value` input into core forms and print results as JSON.
//! - Map validation failures to exit code 2 and other failures to 1.

mod commands;
mod config;

use clap::Parser;
use projman_core::FormError;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = config::Config::parse();

    if let Some(log_dir) = config.log_dir.as_deref() {
        let level = config
            .log_level
            .as_deref()
            .unwrap_or(projman_core::default_log_level());
        if let Err(err) = projman_core::init_logging(level, log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match commands::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<FormError>() {
            Some(FormError::Invalid(errors)) => {
                match serde_json::to_string_pretty(errors) {
                    Ok(json) => println!("{json}"),
                    Err(_) => eprintln!("{errors}"),
                }
                ExitCode::from(2)
            }
            _ => {
                log::error!("event=cli_exit module=cli status=error error={err:#}");
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}
