use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use itax::config::{Cli, Command, build_tax_input};
use itax::core::compute;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("itax=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    match Cli::parse().command {
        Command::Serve(args) => itax::api::run_http_server(&args).await?,
        Command::Calculate(args) => {
            let input = build_tax_input(args).map_err(anyhow::Error::msg)?;
            let result = compute(&input);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
