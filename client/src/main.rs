use clap::Parser;
use client::network::Client;
use log::info;
use shared::GameConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server URL to connect to
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Bearer token presented in the auth message. Against a dev server
    /// this is "<userId>:<username>".
    #[arg(short = 't', long)]
    token: String,

    /// Start the game automatically once an opponent joins (host only)
    #[arg(long)]
    auto_start: bool,

    /// Steer the paddle toward the ball instead of sitting still
    #[arg(long)]
    auto_play: bool,

    /// Points needed to win (with --auto-start)
    #[arg(long, default_value = "3")]
    win_score: u32,

    /// Ball speed in units per second (with --auto-start)
    #[arg(long, default_value = "320.0")]
    ball_speed: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let mut client = Client::new(&args.server, &args.token);
    if args.auto_start {
        client.set_auto_start(GameConfig {
            ball_speed: args.ball_speed,
            win_score: args.win_score,
            ..GameConfig::default()
        });
    }
    client.set_auto_play(args.auto_play);

    client.run().await?;

    Ok(())
}
