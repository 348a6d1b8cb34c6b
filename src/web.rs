#![cfg(not(tarpaulin_include))]

use gradebook::app;
use gradebook::config::ServerConfig;
use std::env;

/// Main entry point for the grade lookup server
///
/// Usage: `website [bind] [cache_dir] [--classes file.json] [--max-age secs] [--timeout secs]`
///
/// Log verbosity follows `RUST_LOG` and defaults to `info`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = ServerConfig::from_args(&args)?;

    app::run(config).await
}
