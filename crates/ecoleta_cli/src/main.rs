//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify core and API wiring.
//! - With a config path, load it, start logging, migrate the database and
//!   print the item catalog.
//! - Keep output deterministic for quick local sanity checks.

use ecoleta_api::{list_items, ApiContext};
use ecoleta_core::{core_version, default_log_level, init_logging, ping, ServiceConfig};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("ecoleta_core ping={}", ping());
    println!("ecoleta_core version={}", core_version());

    let Some(config_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match run(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ecoleta: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &str) -> Result<(), Box<dyn Error>> {
    let config = ServiceConfig::load(config_path)?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        let level = config.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let ctx = ApiContext::from_config(config)?;
    let response = list_items(&ctx);
    println!("items status={} body={}", response.status, response.body);
    if response.is_success() {
        Ok(())
    } else {
        Err(format!("item catalog request failed with status {}", response.status).into())
    }
}
