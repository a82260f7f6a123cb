//! Standalone signaling server
//!
//! Run with: cargo run --example signal_server [BIND_ADDR] [TURN_HOST]
//!
//! Examples:
//!   cargo run --example signal_server                           # binds to 0.0.0.0:5050
//!   cargo run --example signal_server localhost                 # binds to 127.0.0.1:5050
//!   cargo run --example signal_server 0.0.0.0:5051 turn.lan    # TURN addresses from DNS
//!
//! Browsers connect to ws://<addr>/ and speak the JSON event protocol:
//!
//!   {"type":"create","username":"Alice"}
//!   {"type":"join","id":"<room id>"}
//!   {"type":"share"}
//!
//! A reverse proxy that already authenticated the user may forward the name
//! in the `X-Forwarded-User` header; it then overrides requested usernames.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use screenhub::server::handler::{AuthResult, SignalHandler};
use screenhub::tungstenite::handshake::server::Request;
use screenhub::turn::DnsTurnIps;
use screenhub::{ClientInfo, RegistryConfig, ServerConfig, SignalServer};

const DEFAULT_PORT: u16 = 5050;

/// Handler trusting a proxy-supplied user header
struct ProxyAuthHandler {
    connections: AtomicU64,
}

impl SignalHandler for ProxyAuthHandler {
    fn on_connection(&self, peer: SocketAddr, request: &Request) -> AuthResult {
        let total = self.connections.fetch_add(1, Ordering::Relaxed) + 1;

        let user = request
            .headers()
            .get("x-forwarded-user")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty());

        match user {
            Some(user) => {
                println!("[{}] {} connected as {}", total, peer, user);
                AuthResult::Authenticated(user.to_string())
            }
            None => {
                println!("[{}] {} connected anonymously", total, peer);
                AuthResult::Anonymous
            }
        }
    }

    fn on_disconnect(&self, client: &ClientInfo) {
        println!("[{}] Disconnected", client.id);
    }
}

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:5050
/// - "127.0.0.1" -> 127.0.0.1:5050
/// - "0.0.0.0:5051" -> 0.0.0.0:5051
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: signal_server [BIND_ADDR] [TURN_HOST]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:5050)");
    eprintln!("  TURN_HOST    Host name of the TURN relay, resolved via DNS");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = ServerConfig::default();
    if let Some(addr_str) = args.get(1) {
        match parse_bind_addr(addr_str) {
            Ok(addr) => config = config.bind(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("screenhub=debug".parse()?)
                .add_directive("signal_server=debug".parse()?),
        )
        .init();

    let mut registry_config = RegistryConfig::default();
    if let Some(turn_host) = args.get(2) {
        registry_config =
            registry_config.turn_provider(DnsTurnIps::new(turn_host.clone(), Duration::from_secs(60)));
    }

    println!("Starting signaling server on ws://{}", config.bind_addr);

    let handler = ProxyAuthHandler {
        connections: AtomicU64::new(0),
    };
    let server = SignalServer::with_registry_config(config, handler, registry_config);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        println!("\nShutting down...");
    };

    if let Err(e) = server.run_until(shutdown).await {
        eprintln!("Server error: {}", e);
    }

    let stats = server.rooms().metrics().snapshot();
    println!(
        "Stats: connections={} rooms={} sessions={} events={} failed={}",
        stats.connections_total,
        stats.rooms_created,
        stats.sessions_created,
        stats.events_dispatched,
        stats.events_failed,
    );

    Ok(())
}
