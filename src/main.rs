use clap::Parser;
use irlog_lib::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    irlog_lib::run(config).await
}
