use std::process::ExitCode;

use clap::Parser;

use winterscape::{CliArgs, ViewerConfig};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // RUST_LOG wins; otherwise the CLI or config level, resolved below.
    let config = match ViewerConfig::resolve(&args) {
        Ok(config) => config,
        Err(e) => {
            init_logging(args.log_level.as_deref().unwrap_or("info"));
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);

    log::info!(
        "Starting {} ({}x{}), assets in {}",
        config.window.title,
        config.window.width,
        config.window.height,
        config.scene.asset_root.display()
    );

    match winterscape::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}
