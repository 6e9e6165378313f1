use clap::Parser;
use log::info;
use server::auth::{DevTokenVerifier, StaticBlockList};
use server::network::Server;
use server::router::MessageRouter;
use server::session::SessionManager;
use shared::game::HEARTBEAT_INTERVAL_SECS;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Heartbeat probe interval in seconds
    #[arg(long, default_value_t = HEARTBEAT_INTERVAL_SECS)]
    heartbeat: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    // Standalone mode: tokens are "<userId>:<username>" and nobody is
    // blocked. Production deployments plug in the real account services
    // behind the same traits.
    let router = MessageRouter::new(
        SessionManager::new(),
        Arc::new(DevTokenVerifier),
        Arc::new(StaticBlockList::new()),
    );

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::new(&address, router, Duration::from_secs(args.heartbeat)).await?;

    info!("Session server starting on {}", address);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server stopped with error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
