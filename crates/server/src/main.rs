use citegraph_core::EnvConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EnvConfig::load()?;
    citegraph_server::start_server(config).await
}
