// Method registry
pub mod registry;

// Envelopes, error catalog and dispatch
pub mod rpc;

// Service description document
pub mod smd;

pub use registry::{MethodDescription, ParamSpec, Registry, ReturnsSpec};
pub use rpc::{
    Handler, HandlerError, HandlerFuture, HandlerResult, INTERNAL_ERROR, INVALID_PARAMS,
    INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, RpcErrorObj, RpcResponse, RpcServer,
    register_default_handlers,
};
pub use smd::{SmdDocument, SmdService};
