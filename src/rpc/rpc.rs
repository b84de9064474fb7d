use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::macros::OptionExt;
use crate::rpc::registry::Registry;

// Protocol error catalog. Application errors reserve -32000..-32099.
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObj {
    pub code: i64,
    pub message: String,
}

/// Error channel for method handlers.
///
/// Handlers normally fail with a fully formed error object. The `Bare`
/// shape exists for callers that signal a numeric code and carry the
/// message separately; both collapse into a single [`RpcErrorObj`] before
/// serialization. New handlers should prefer [`HandlerError::structured`].
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerError {
    Structured(RpcErrorObj),
    Bare { code: i64, message: String },
}

impl HandlerError {
    pub fn structured(code: i64, message: impl Into<String>) -> Self {
        HandlerError::Structured(RpcErrorObj {
            code,
            message: message.into(),
        })
    }

    pub fn bare(code: i64, message: impl Into<String>) -> Self {
        HandlerError::Bare {
            code,
            message: message.into(),
        }
    }

    pub fn into_error_obj(self) -> RpcErrorObj {
        match self {
            HandlerError::Structured(obj) => obj,
            HandlerError::Bare { code, message } => RpcErrorObj { code, message },
        }
    }
}

impl From<RpcErrorObj> for HandlerError {
    fn from(obj: RpcErrorObj) -> Self {
        HandlerError::Structured(obj)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObj>,
    pub id: Value, // id can be string or number or null
}

impl RpcResponse {
    /// Successful response carrying `result`, correlated by `id`.
    pub fn with_result(id: Value, result: Value) -> Self {
        RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Error response with the given `code` and `message`.
    pub fn with_error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self::with_error_obj(
            id,
            RpcErrorObj {
                code,
                message: message.into(),
            },
        )
    }

    /// Error response forwarding an already-built error object.
    pub fn with_error_obj(id: Value, error: RpcErrorObj) -> Self {
        RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::with_error(Value::Null, PARSE_ERROR, "Parse error.")
    }

    pub fn invalid_request(id: Value) -> Self {
        Self::with_error(id, INVALID_REQUEST, "Invalid Request.")
    }

    pub fn method_not_found(id: Value) -> Self {
        Self::with_error(id, METHOD_NOT_FOUND, "Method not found.")
    }

    pub fn internal_error(id: Value) -> Self {
        Self::with_error(id, INTERNAL_ERROR, "Internal error.")
    }
}

// A Handler is an async function that takes params and returns
// Result<Value, HandlerError>.
pub type HandlerResult = Result<Value, HandlerError>;
pub type HandlerFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = HandlerResult> + Send>>;
pub type Handler = dyn Fn(Value) -> HandlerFuture + Send + Sync + 'static;

/// JSON-RPC 2.0 request dispatcher over an owned method [`Registry`].
///
/// One instance per server; tests can build as many as they need. All
/// registration happens before the transport starts listening, after which
/// the registry is only read.
pub struct RpcServer {
    registry: Registry,
}

impl RpcServer {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Passthrough to [`Registry::register`].
    pub async fn register<F, Fut>(&self, method: &str, f: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(method, f).await;
    }

    /// Passthrough to [`Registry::describe`].
    pub async fn describe(&self, method: &str, params: Value, returns: Value) {
        self.registry.describe(method, params, returns).await;
    }

    /// Decode one fully-buffered request body and run it through the
    /// dispatch pipeline. A body that is not JSON yields a parse error with
    /// a null id.
    pub async fn handle_slice(&self, raw: &[u8]) -> RpcResponse {
        match serde_json::from_slice::<Value>(raw) {
            Ok(payload) => self.handle_value(payload).await,
            Err(err) => {
                warn!("request body failed to parse: {}", err);
                RpcResponse::parse_error()
            }
        }
    }

    /// Validate a decoded payload, resolve its method and invoke the
    /// handler.
    ///
    /// The envelope must be an object with a truthy `method`, a truthy
    /// `params` and an `id` key. An explicit `"id": null` is accepted; a
    /// missing `id` key is not. The id is echoed verbatim on every path
    /// where one was decoded.
    pub async fn handle_value(&self, payload: Value) -> RpcResponse {
        let id = payload.get("id").cloned().unwrap_or(Value::Null);

        let Some(envelope) = payload.as_object() else {
            return RpcResponse::invalid_request(id);
        };
        if !is_truthy(envelope.get("method"))
            || !is_truthy(envelope.get("params"))
            || !envelope.contains_key("id")
        {
            return RpcResponse::invalid_request(id);
        }

        // A non-string method can never name a registered handler.
        let Some(method) = envelope.get("method").and_then(Value::as_str) else {
            return RpcResponse::method_not_found(id);
        };
        let Some(handler) = self.registry.lookup(method).await else {
            debug!("no handler for method {}", method);
            return RpcResponse::method_not_found(id);
        };

        let params = envelope.get("params").cloned().unwrap_or(Value::Null);
        debug!("dispatching {}", method);

        // The handler future resolves exactly once; a panic inside it is
        // caught and surfaced as an internal error instead of tearing down
        // the connection task.
        match AssertUnwindSafe((*handler)(params)).catch_unwind().await {
            Ok(Ok(result)) => RpcResponse::with_result(id, result),
            Ok(Err(err)) => RpcResponse::with_error_obj(id, err.into_error_obj()),
            Err(_) => {
                error!("handler for {} panicked", method);
                RpcResponse::internal_error(id)
            }
        }
    }
}

impl Default for RpcServer {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON truthiness: null, false, 0 and "" are falsy; everything else,
/// including empty arrays and objects, is truthy. A missing key is falsy.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Registers the demo method set used by the CLI server and the
/// integration tests.
///
/// 1. **`ping`** -> always responds with `"pong"`.
/// 2. **`sum`** -> adds `params.a` and `params.b`; missing or non-numeric
///    operands produce an Invalid params error.
/// 3. **`new_token`** -> returns a freshly generated UUID string.
pub async fn register_default_handlers(server: &RpcServer) {
    server
        .register("ping", |_params| async move {
            Ok(Value::String("pong".into()))
        })
        .await;
    server.describe("ping", json!({}), json!("string")).await;

    server
        .register("sum", |params| async move {
            let a = params.get("a").and_then(Value::as_i64).ok_or_invalid_params()?;
            let b = params.get("b").and_then(Value::as_i64).ok_or_invalid_params()?;
            Ok(json!(a + b))
        })
        .await;
    server
        .describe(
            "sum",
            json!({"a": "number", "b": "number"}),
            json!({"type": "number"}),
        )
        .await;

    server
        .register("new_token", |_params| async move {
            Ok(Value::String(Uuid::new_v4().to_string()))
        })
        .await;
    server.describe("new_token", json!({}), json!("string")).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn demo_server() -> RpcServer {
        let server = RpcServer::new();
        register_default_handlers(&server).await;
        server
    }

    #[tokio::test]
    async fn test_round_trip_result() {
        let server = demo_server().await;
        let resp = server
            .handle_value(json!({"method": "ping", "params": {}, "id": 7}))
            .await;
        assert_eq!(resp.jsonrpc, "2.0");
        assert_eq!(resp.result, Some(json!("pong")));
        assert!(resp.error.is_none());
        assert_eq!(resp.id, json!(7));
    }

    #[tokio::test]
    async fn test_explicit_null_id_is_accepted() {
        let server = demo_server().await;
        let resp = server
            .handle_value(json!({"method": "ping", "params": {}, "id": null}))
            .await;
        assert_eq!(resp.result, Some(json!("pong")));
        assert_eq!(resp.id, Value::Null);
    }

    #[tokio::test]
    async fn test_missing_id_key_is_invalid_request() {
        let server = demo_server().await;
        let resp = server
            .handle_value(json!({"method": "ping", "params": {}}))
            .await;
        let error = resp.error.unwrap();
        assert_eq!(error.code, INVALID_REQUEST);
        assert!(resp.result.is_none());
    }

    #[tokio::test]
    async fn test_falsy_params_is_invalid_request() {
        let server = demo_server().await;
        for params in [json!(null), json!(false), json!(0), json!("")] {
            let resp = server
                .handle_value(json!({"method": "ping", "params": params, "id": 1}))
                .await;
            assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_empty_object_params_is_truthy() {
        let server = demo_server().await;
        let resp = server
            .handle_value(json!({"method": "ping", "params": {}, "id": 1}))
            .await;
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn test_non_object_payload_is_invalid_request() {
        let server = demo_server().await;
        let resp = server.handle_value(json!([1, 2, 3])).await;
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
        assert_eq!(resp.id, Value::Null);
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let server = demo_server().await;
        let resp = server.handle_slice(b"this is not json").await;
        let error = resp.error.unwrap();
        assert_eq!(error.code, PARSE_ERROR);
        assert_eq!(error.message, "Parse error.");
        assert_eq!(resp.id, Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = demo_server().await;
        let resp = server
            .handle_value(json!({"method": "doesNotExist", "params": {}, "id": 1}))
            .await;
        let error = resp.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found.");
        assert_eq!(resp.id, json!(1));
    }

    #[tokio::test]
    async fn test_structured_handler_error_is_forwarded() {
        let server = RpcServer::new();
        server
            .register("explode", |_params| async move {
                Err(HandlerError::structured(-32000, "custom failure"))
            })
            .await;

        let resp = server
            .handle_value(json!({"method": "explode", "params": {}, "id": 2}))
            .await;
        assert_eq!(
            resp.error,
            Some(RpcErrorObj {
                code: -32000,
                message: "custom failure".into()
            })
        );
    }

    #[tokio::test]
    async fn test_bare_code_error_is_synthesized() {
        let server = RpcServer::new();
        server
            .register("reject", |_params| async move {
                Err(HandlerError::bare(-32001, "bad param"))
            })
            .await;

        let resp = server
            .handle_value(json!({"method": "reject", "params": {}, "id": 3}))
            .await;
        assert_eq!(
            resp.error,
            Some(RpcErrorObj {
                code: -32001,
                message: "bad param".into()
            })
        );
    }

    #[tokio::test]
    async fn test_handler_panic_maps_to_internal_error() {
        let server = RpcServer::new();
        server
            .register("crash", |_params| async move { panic!("boom") })
            .await;

        let resp = server
            .handle_value(json!({"method": "crash", "params": {}, "id": 4}))
            .await;
        let error = resp.error.unwrap();
        assert_eq!(error.code, INTERNAL_ERROR);
        assert_eq!(error.message, "Internal error.");
        assert_eq!(resp.id, json!(4));
    }

    #[tokio::test]
    async fn test_invalid_params_from_demo_sum() {
        let server = demo_server().await;
        let resp = server
            .handle_value(json!({"method": "sum", "params": {"a": 1}, "id": 5}))
            .await;
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);

        let resp = server
            .handle_value(json!({"method": "sum", "params": {"a": 2, "b": 40}, "id": 6}))
            .await;
        assert_eq!(resp.result, Some(json!(42)));
    }

    #[test]
    fn test_success_envelope_omits_error_key() {
        let resp = RpcResponse::with_result(json!(1), json!("ok"));
        let encoded = serde_json::to_value(&resp).unwrap();
        assert!(encoded.get("error").is_none());
        assert_eq!(encoded["result"], json!("ok"));

        let resp = RpcResponse::method_not_found(json!(1));
        let encoded = serde_json::to_value(&resp).unwrap();
        assert!(encoded.get("result").is_none());
        assert_eq!(encoded["error"]["code"], json!(METHOD_NOT_FOUND));
    }
}
