mod app;
mod cli;

use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    sharefetch::observability::init_tracing(&cli.log_level);

    app::run(cli).await
}
