use cv_backend::config::AppConfig;
use cv_backend::run_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("hyper", LevelFilter::Warn)
        .parse_default_env()
        .init();

    println!("CV backend: CouchDB document service");

    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{} couchdb={}",
        config.server.host,
        config.server.port,
        config.couchdb.database_url()
    );

    run_server(config).await
}
