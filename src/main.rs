use clap::Parser;
use recordbook::{
    config::{CliArgs, Config},
    logging, server,
};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);
    logging::init(&config.logging);

    if let Err(e) = server::run(config).await {
        tracing::error!(error = %e, "Server stopped");
        std::process::exit(1);
    }
}
