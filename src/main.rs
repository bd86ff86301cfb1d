mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use fakeml::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let mut config = Config::load(args.config)?;
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            fakeml::api::run(config).await?
        }
    }

    Ok(())
}
