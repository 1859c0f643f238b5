//! wxpublish - WeatherFlow hub to weather services
//!
//! Usage:
//!   wxpublish                      # Use ./config.yaml
//!   wxpublish -c /etc/wxpublish.yaml
//!   wxpublish -v                   # Debug logging

use anyhow::Context;
use argh::FromArgs;
use tokio::sync::watch;
use wxpublish::Config;

/// Publish WeatherFlow observations to weather services
#[derive(FromArgs, Debug)]
struct Args {
    /// path to YAML configuration file
    #[argh(option, short = 'c', default = "String::from(\"config.yaml\")")]
    config: String,

    /// enable debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn setup_shutdown() -> anyhow::Result<watch::Receiver<()>> {
    let (tx, rx) = watch::channel(());
    ctrlc::set_handler(move || {
        log::info!("Shutdown signal received");
        let _ = tx.send(());
    })?;
    Ok(rx)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    log::info!("Starting wxpublish v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Loading config from: {}", args.config);
    let config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config))?;

    let shutdown = setup_shutdown()?;
    wxpublish::app::run(config, shutdown).await?;

    log::info!("wxpublish stopped");
    Ok(())
}
