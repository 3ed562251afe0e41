//! Broker entry point
//!
//! Usage: `stompd <port> <tpc|reactor>`

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use stompd::server::{BlockingServer, ReactorServer, ServerConfig, ServerMode};
use stompd::Error;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("usage: stompd <port> <tpc|reactor>");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = serve(config) {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn parse_args(args: &[String]) -> Result<ServerConfig, Error> {
    let (port, mode) = match args {
        [port, mode] => (port, mode),
        _ => {
            return Err(Error::InvalidArgument(
                "expected exactly two arguments".to_string(),
            ))
        }
    };

    let port: u16 = port
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid port '{}'", port)))?;
    let mode = ServerMode::from_arg(mode)?;

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    Ok(ServerConfig::with_addr(addr).mode(mode))
}

fn serve(config: ServerConfig) -> stompd::Result<()> {
    match config.mode {
        ServerMode::ThreadPerConnection => BlockingServer::bind(config)?.run(),
        ServerMode::Reactor => {
            let workers = if config.worker_threads > 0 {
                config.worker_threads
            } else {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(workers)
                .enable_all()
                .build()?;
            runtime.block_on(async {
                let server = ReactorServer::bind(config).await?;
                server.run().await
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_valid_args() {
        let config = parse_args(&args(&["7777", "tpc"])).unwrap();
        assert_eq!(config.bind_addr.port(), 7777);
        assert_eq!(config.mode, ServerMode::ThreadPerConnection);

        let config = parse_args(&args(&["61613", "reactor"])).unwrap();
        assert_eq!(config.mode, ServerMode::Reactor);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["7777"])).is_err());
        assert!(parse_args(&args(&["notaport", "tpc"])).is_err());
        assert!(parse_args(&args(&["7777", "fibers"])).is_err());
    }
}
