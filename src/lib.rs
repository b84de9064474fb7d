// Core RPC protocol types and dispatch
pub mod rpc;

// HTTP transport layer
pub mod transport;

// One-shot command line client
pub mod client;

// Logging setup
pub mod logging;

// Macros
pub mod macros;
pub use macros::*;

pub use rpc::{HandlerError, Registry, RpcErrorObj, RpcResponse, RpcServer, SmdDocument};
pub use transport::{HttpTransport, ShutdownCoordinator};
