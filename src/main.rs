//! socks5-udp - send a datagram through a SOCKS5 UDP relay
//!
//! Opens a UDP association, sends one datagram to the destination, waits
//! for one reply and prints it.

use anyhow::{Context, Result};
use clap::Parser;
use socks5_udp::config::load_config;
use socks5_udp::socks::Socks5Dialer;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// socks5-udp - send a datagram through a SOCKS5 UDP relay
#[derive(Parser, Debug)]
#[command(name = "socks5-udp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Destination as host:port
    #[arg(short, long)]
    dest: String,

    /// Payload to send
    #[arg(short, long)]
    message: String,

    /// Treat the payload as hex and print the reply as hex
    #[arg(long)]
    hex: bool,

    /// Seconds to wait for a reply
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    // Load configuration
    let config = load_config(&args.config)?;

    info!("socks5-udp v{}", socks5_udp::VERSION);
    info!("Configuration loaded from: {:?}", args.config);
    info!("Proxy: {}", config.proxy.server_addr);

    let payload = if args.hex {
        decode_hex(&args.message)?
    } else {
        args.message.clone().into_bytes()
    };

    let dialer = Socks5Dialer::from_config(&config.proxy)?;
    let conn = dialer
        .dial_packet(&args.dest)
        .await
        .with_context(|| format!("Failed to open UDP association to {}", args.dest))?;
    info!(
        "Association ready: local {} -> relay {} -> {}",
        conn.local_addr()?,
        conn.relay_addr(),
        conn.remote_addr()
    );

    let result = exchange(&conn, &payload, Duration::from_secs(args.timeout)).await;

    if let Err(e) = conn.close().await {
        warn!("Error closing association: {}", e);
    }

    let reply = result?;
    if args.hex {
        println!("{}", hex::encode(&reply));
    } else {
        println!("{}", String::from_utf8_lossy(&reply));
    }

    Ok(())
}

/// Send `payload` and wait for one reply
async fn exchange<S, P>(
    conn: &socks5_udp::Socks5UdpConn<S, P>,
    payload: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>>
where
    S: socks5_udp::transport::ControlStream,
    P: socks5_udp::transport::PacketConn,
{
    conn.set_deadline(Some(Instant::now() + timeout));

    let sent = conn.write(payload).await.context("Failed to send datagram")?;
    info!("Sent {} bytes to {}", sent, conn.remote_addr());

    let mut buf = vec![0u8; socks5_udp::helper::MAX_UDP_PACKET_SIZE];
    let n = conn.read(&mut buf).await.context("Failed to receive reply")?;
    info!("Received {} bytes", n);

    buf.truncate(n);
    Ok(buf)
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&s).with_context(|| format!("Invalid hex payload {:?}", s))
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
