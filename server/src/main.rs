use clap::Parser;
use log::info;
use server::hub::HubConfig;
use server::network;
use server::registry::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Sessions are checked for idleness this often
const REAP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Seconds a round result stays up before the next round opens
    #[arg(long, default_value_t = shared::RESET_DELAY_SECS)]
    reset_delay_secs: u64,

    /// Frames buffered per participant before it is dropped as unresponsive
    #[arg(long, default_value = "256")]
    outbound_capacity: usize,

    /// Maximum simultaneous players per hub
    #[arg(short, long, default_value_t = shared::MAX_PLAYERS)]
    max_players: usize,

    /// Seconds an empty hub is kept before it is removed
    #[arg(long, default_value = "600")]
    idle_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = HubConfig {
        reset_delay: Duration::from_secs(args.reset_delay_secs),
        outbound_capacity: args.outbound_capacity.max(1),
        ..HubConfig::default()
    };
    let registry = Arc::new(SessionRegistry::new(config, args.max_players));

    SessionRegistry::spawn_reaper(
        Arc::clone(&registry),
        Duration::from_secs(args.idle_timeout_secs),
        REAP_INTERVAL,
    );

    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server listening on {}", listener.local_addr()?);
    info!(
        "Hubs hold up to {} players, results shown for {}s",
        args.max_players, args.reset_delay_secs
    );

    axum::serve(listener, network::router(registry))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down");
        })
        .await?;

    Ok(())
}
