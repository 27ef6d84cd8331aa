use clap::Parser;
use client::network::Client;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Identifier of the hub to join
    #[arg(long)]
    hub: String,

    /// Player name shown to everyone in the hub
    #[arg(short = 'n', long)]
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Joining hub {} on {} as {}", args.hub, args.server, args.name);

    let mut client = Client::new(&args.server, &args.hub, &args.name)?;

    client.run().await?;

    Ok(())
}
