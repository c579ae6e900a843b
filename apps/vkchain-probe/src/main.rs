//! vkchain probe
//!
//! Runs the full initialization chain (instance, debug output, surface,
//! physical device, logical device, queues, swapchain) against a small
//! window and logs what was selected.
//!
//! # Usage
//!
//! ```text
//! vkchain-probe [--headless] [--no-validation | --validation] [--no-debug] [--size WxH]
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (default: `info`). Driver messages are logged
//!   under the `vkchain::driver` target.

mod config;
mod probe;

use config::ProbeConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_help() {
    eprintln!("vkchain probe");
    eprintln!();
    eprintln!("Usage: vkchain-probe [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --headless        Skip the window, surface and swapchain");
    eprintln!("  --validation      Request the Khronos validation layer");
    eprintln!("  --no-validation   Do not request the validation layer");
    eprintln!("  --no-debug        Do not attach a debug messenger");
    eprintln!("  --size WxH        Window size (default: 200x200)");
    eprintln!("  -h, --help        Print this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG          Log filter (default: info)");
}

fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(config) = ProbeConfig::from_args(std::env::args().skip(1))? else {
        print_help();
        return Ok(());
    };

    info!(
        validation = config.validation,
        debug_output = config.debug_output,
        headless = config.headless,
        "Starting vkchain probe"
    );

    if config.headless {
        probe::run_chain(&config, None)?.log();
        Ok(())
    } else {
        probe::run_windowed(config)
    }
}
