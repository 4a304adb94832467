//! authd server binary

use anyhow::Context;
use authd_core::{KeyManager, SignatureAlgorithm};
use authd_server::server::{AppState, AuthServer};
use authd_store::UserStore;
use clap::{Arg, Command};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let matches = Command::new("authd-server")
        .version("0.1.0")
        .about("Signed-identity token service")
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("PATH")
                .help("Data directory path")
                .default_value("./data"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Bind address")
                .default_value("127.0.0.1:8080"),
        )
        .arg(
            Arg::new("private-key")
                .long("private-key")
                .value_name("PEM")
                .help("Path to the RS256 private key (PEM)")
                .required(true),
        )
        .arg(
            Arg::new("public-key")
                .long("public-key")
                .value_name("PEM")
                .help("Path to the RS256 public key (PEM)")
                .required(true),
        )
        .arg(
            Arg::new("token-ttl")
                .long("token-ttl")
                .value_name("SECS")
                .help("Token lifetime in seconds")
                .default_value("3600"),
        )
        .get_matches();

    let data_dir: PathBuf = matches
        .get_one::<String>("data-dir")
        .unwrap()
        .parse()
        .context("invalid data directory path")?;

    let bind_addr: SocketAddr = matches
        .get_one::<String>("bind")
        .unwrap()
        .parse()
        .context("invalid bind address")?;

    let private_key: PathBuf = matches
        .get_one::<String>("private-key")
        .unwrap()
        .parse()
        .context("invalid private key path")?;

    let public_key: PathBuf = matches
        .get_one::<String>("public-key")
        .unwrap()
        .parse()
        .context("invalid public key path")?;

    let token_ttl: u64 = matches
        .get_one::<String>("token-ttl")
        .unwrap()
        .parse()
        .context("invalid token ttl")?;

    info!("Starting authd server");
    info!("Data directory: {}", data_dir.display());
    info!("Bind address: {}", bind_addr);

    // Create data directory if it doesn't exist
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        info!("Created data directory: {}", data_dir.display());
    }

    // Load the signing keypair; without it the service cannot issue or
    // verify anything, so a load failure aborts startup
    let keys = Arc::new(KeyManager::new(SignatureAlgorithm::Rs256));
    keys.initialize_from_files(&private_key, &public_key)
        .context("loading RS256 keypair")?;
    info!("Loaded {} keypair", keys.algorithm());

    let store = UserStore::open(&data_dir)
        .map_err(|e| anyhow::anyhow!("failed to open user store: {}", e))?;
    info!("User store opened");

    let state = AppState::new(keys, store, Duration::from_secs(token_ttl));
    let server = AuthServer::new(state);

    match server.serve(bind_addr).await {
        Ok(_) => info!("Server shutdown gracefully"),
        Err(e) => {
            warn!("Server error: {}", e);
            return Err(anyhow::anyhow!("{}", e));
        }
    }

    Ok(())
}
