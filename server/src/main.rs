use clap::Parser;
use env_logger::Env;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative Liar's Dice room server", long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of concurrent connections
    #[arg(short, long, default_value = "256")]
    max_clients: usize,

    /// Seconds without a heartbeat before a connection is dropped
    #[arg(long, default_value = "10")]
    client_timeout_secs: u64,

    /// Seconds a disconnected player keeps their seat
    #[arg(long, default_value = "20")]
    grace_secs: u64,

    /// Countdown before the first deal in a full room
    #[arg(long, default_value = "5")]
    prestart_secs: u64,

    /// Pause after a win before the countdown is shown again
    #[arg(long, default_value = "10")]
    win_pause_secs: u64,

    /// Delay after a win before the rematch is dealt
    #[arg(long, default_value = "15")]
    restart_secs: u64,

    /// Largest room capacity a client may request
    #[arg(long, default_value = "10")]
    max_capacity: u8,

    /// Accept any well-formed bid, not only raises
    #[arg(long)]
    lenient_bids: bool,

    /// Fixed seed for the dice RNG
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            max_clients: self.max_clients,
            client_timeout: Duration::from_secs(self.client_timeout_secs),
            grace_period: Duration::from_secs(self.grace_secs),
            prestart_delay: Duration::from_secs(self.prestart_secs),
            win_pause: Duration::from_secs(self.win_pause_secs),
            restart_delay: Duration::from_secs(self.restart_secs),
            max_capacity: self.max_capacity,
            lenient_bids: self.lenient_bids,
            seed: self.seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.config();

    if config.win_pause >= config.restart_delay {
        error!("--win-pause-secs must be shorter than --restart-secs");
        return Err("invalid timer configuration".into());
    }

    info!("Starting Liar's Dice server...");
    info!(
        "Grace: {:?}, prestart: {:?}, rematch after {:?}",
        config.grace_period, config.prestart_delay, config.restart_delay
    );

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
