use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rendezvous=info,tower_http=debug")),
        )
        .init();

    let args = cli::Args::parse();
    let config = config::Config::load(&args.config)?;

    ensure_database_dir(&config);

    let db = rendezvous_db::create_pool(&config.database.url, config.database.max_connections)
        .await?;
    rendezvous_db::run_migrations(&db).await?;

    let state = rendezvous_core::AppState {
        db,
        config: rendezvous_core::AppConfig {
            jwt_secret: config.auth.jwt_secret.clone(),
            jwt_expiry_seconds: config.auth.jwt_expiry_seconds,
            public_url: config.server.public_url.clone(),
        },
    };

    let app = rendezvous_api::build_router().with_state(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;

    print_startup_banner(
        &config.server.bind_address,
        &config.server.public_url,
        &config.database.url,
    );

    let shutdown_signal = async {
        let _ = tokio::signal::ctrl_c().await;
        println!();
        tracing::info!("Shutting down (ctrl-c)...");
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

/// Ensure the SQLite database's parent directory exists before the pool opens it.
fn ensure_database_dir(config: &config::Config) {
    if let Some(db_path) = config
        .database
        .url
        .strip_prefix("sqlite://")
        .and_then(|s| s.split('?').next())
    {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
    }
}

fn print_startup_banner(bind_address: &str, public_url: &Option<String>, db_url: &str) {
    println!();
    println!("  Rendezvous: group meeting-point server");
    println!();
    println!("  Listening:   http://{}", bind_address);
    if let Some(url) = public_url {
        println!("  Public URL:  {}", url);
    }
    println!("  Database:    {}", db_url);
    println!();
}
