use clap::{Parser, Subcommand};
use std::sync::Arc;

use pico_rpc::client;
use pico_rpc::logging;
use pico_rpc::rpc::{RpcServer, register_default_handlers};
use pico_rpc::transport::{HttpTransport, ShutdownCoordinator};

#[derive(Parser, Debug)]
#[command(name = "pico-rpc")]
#[command(about = "Minimal JSON-RPC 2.0 server over HTTP POST")]
struct Opts {
    #[command(subcommand)]
    cmd: Mode,
}

/// CLI modes
#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the HTTP RPC server with the demo method set
    Serve {
        #[arg(short, long, default_value = "127.0.0.1:3000")]
        addr: String,
    },

    /// Run a one-shot client request
    Call {
        #[command(flatten)]
        client: client::ClientArgs,
    },

    /// Fetch the service description document
    Discover {
        #[arg(short, long, default_value = "http://127.0.0.1:3000/")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    logging::init_logging();

    let opts = Opts::parse();
    match opts.cmd {
        Mode::Serve { addr } => {
            run_server(&addr).await?;
        }

        Mode::Call { client } => {
            client::run_client(client).await?;
        }

        Mode::Discover { url } => {
            client::run_discover(&url).await?;
        }
    }
    Ok(())
}

async fn run_server(addr: &str) -> anyhow::Result<()> {
    let server = Arc::new(RpcServer::new());

    // All registration happens before the listener starts.
    register_default_handlers(&server).await;

    let coordinator = Arc::new(ShutdownCoordinator::new());
    let signal_coordinator = coordinator.clone();
    tokio::spawn(async move {
        signal_coordinator.wait_for_signal().await;
    });

    logging::log_startup(addr);
    HttpTransport::new(server)
        .serve_with_shutdown(addr, &coordinator)
        .await?;
    logging::log_shutdown();

    Ok(())
}
