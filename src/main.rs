//! treedns
//!
//! Runs one name-server node: binds a loopback UDP port, registers with the
//! parent (unless this is the root), then serves registrations and queries
//! while reading operator commands from stdin.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use treedns::{DomainName, Error, LoopExit, Node, NodeConfig, PortSelection, Result};

/// How long to wait for runtime tasks after the node stops
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

// =============================================================================
// CLI Arguments
// =============================================================================

/// treedns - hierarchical name-server node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Domain this node is authoritative for ("." for the root)
    #[arg(long, env = "TREEDNS_DOMAIN")]
    domain: String,

    /// Port of the parent node (required unless this is the root)
    #[arg(long, env = "TREEDNS_PARENT_PORT")]
    parent_port: Option<u16>,

    /// Address of the parent node
    #[arg(long, env = "TREEDNS_PARENT_HOST", default_value = "127.0.0.1")]
    parent_host: IpAddr,

    /// Loopback address to bind
    #[arg(long, env = "TREEDNS_BIND_HOST", default_value = "127.0.0.1")]
    bind_host: IpAddr,

    /// Fixed port to bind (default: random in 53000-53999)
    #[arg(long, env = "TREEDNS_PORT")]
    port: Option<u16>,

    /// Seconds to wait for the parent to acknowledge registration
    #[arg(long, env = "TREEDNS_HANDSHAKE_TIMEOUT", default_value = "3")]
    handshake_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn node_config(&self) -> Result<NodeConfig> {
        let domain = DomainName::parse(&self.domain)?;

        let parent = match (domain.is_root(), self.parent_port) {
            (true, None) => None,
            (false, Some(port)) => Some(SocketAddr::new(self.parent_host, port)),
            (true, Some(_)) => {
                return Err(Error::Configuration(
                    "the root domain does not take --parent-port".to_string(),
                ))
            }
            (false, None) => {
                return Err(Error::Configuration(format!(
                    "--parent-port is required for domain {}",
                    domain
                )))
            }
        };

        Ok(NodeConfig {
            domain,
            bind_host: self.bind_host,
            port: self.port.map(PortSelection::Fixed).unwrap_or_default(),
            parent,
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
        })
    }
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(args));

    // A pending stdin read cannot be cancelled; don't wait on it
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);

    match result {
        Ok(exit) => {
            info!(reason = ?exit, "Server shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.is_handshake_failure() {
                error!("Could not register with the parent server: {}", e);
            } else {
                error!("Server failed: {}", e);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<LoopExit> {
    let config = args.node_config()?;

    let node = Node::bind(config).await?;

    info!("Starting treedns node");
    info!("  Version: {}", treedns::VERSION);
    info!("  Domain: {}", node.domain());
    if let Some(parent) = node.parent() {
        info!("  Parent: {}", parent);
    }
    info!("  Listening on: {}", node.local_addr());

    // Ctrl-C behaves like the `end` command
    let shutdown = node.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown.send(());
        }
    });

    let console = BufReader::new(tokio::io::stdin());
    node.run(console, tokio::io::stdout()).await
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("treedns").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_root_args() {
        let config = parse(&["--domain", "."]).node_config().unwrap();
        assert!(config.domain.is_root());
        assert!(config.parent.is_none());
        assert_eq!(config.port, PortSelection::default());
        assert_eq!(config.handshake_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_child_args() {
        let config = parse(&["--domain", "com", "--parent-port", "53001", "--port", "53002"])
            .node_config()
            .unwrap();
        assert_eq!(config.parent, Some("127.0.0.1:53001".parse().unwrap()));
        assert_eq!(config.port, PortSelection::Fixed(53002));
    }

    #[test]
    fn test_parent_port_required_for_child() {
        assert!(parse(&["--domain", "com"]).node_config().is_err());
        assert!(parse(&["--domain", ".", "--parent-port", "53001"]).node_config().is_err());
    }
}
