use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::rpc::rpc::{Handler, HandlerResult};

/// Declared shape of a single method parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

/// Declared return shape of a method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnsSpec {
    #[serde(rename = "type")]
    pub ty: String,
}

/// Parameter and return declaration attached to a method name, used to
/// build the discovery document. A method without one gets the defaults
/// (no parameters, unspecified returns).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodDescription {
    pub parameters: BTreeMap<String, ParamSpec>,
    pub returns: Option<ReturnsSpec>,
}

/// Set of callable methods and their optional descriptions.
///
/// The registry is populated before the transport starts listening and is
/// only read while requests are in flight, so the locks are uncontended at
/// request time. Registering a name twice silently replaces the prior
/// handler.
pub struct Registry {
    handlers: RwLock<HashMap<String, Arc<Handler>>>,
    descriptions: RwLock<HashMap<String, MethodDescription>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            descriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Store `f` under `method`, replacing any previous handler.
    pub async fn register<F, Fut>(&self, method: &str, f: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        trace!("exposing method: {}", method);
        let handler: Arc<Handler> = Arc::new(move |params: Value| Box::pin(f(params)));

        let replaced = self
            .handlers
            .write()
            .await
            .insert(method.to_string(), handler);
        if replaced.is_some() {
            debug!("replaced existing handler for {}", method);
        }
    }

    /// Attach a description to `method` for discovery.
    ///
    /// `params` is a map of parameter name to either a bare type string or
    /// a `{"type": ..., "optional": ...}` object; `returns` likewise takes a
    /// bare string or a `{"type": ...}` object. Bare strings normalize to
    /// the object form. Works whether or not `method` is registered yet.
    pub async fn describe(&self, method: &str, params: Value, returns: Value) {
        let description = MethodDescription {
            parameters: normalize_params(&params),
            returns: normalize_returns(&returns),
        };
        self.descriptions
            .write()
            .await
            .insert(method.to_string(), description);
    }

    /// Resolve the handler registered under `method`.
    pub async fn lookup(&self, method: &str) -> Option<Arc<Handler>> {
        self.handlers.read().await.get(method).cloned()
    }

    /// Description for every registered method, with defaults filled in
    /// for methods that were never described.
    pub async fn describe_all(&self) -> BTreeMap<String, MethodDescription> {
        let handlers = self.handlers.read().await;
        let descriptions = self.descriptions.read().await;

        handlers
            .keys()
            .map(|name| {
                let description = descriptions.get(name).cloned().unwrap_or_default();
                (name.clone(), description)
            })
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_params(params: &Value) -> BTreeMap<String, ParamSpec> {
    let Some(map) = params.as_object() else {
        return BTreeMap::new();
    };
    map.iter()
        .map(|(name, spec)| (name.clone(), normalize_param(spec)))
        .collect()
}

fn normalize_param(spec: &Value) -> ParamSpec {
    match spec {
        Value::String(ty) => ParamSpec {
            ty: ty.clone(),
            optional: false,
        },
        Value::Object(map) => ParamSpec {
            ty: map
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            optional: map
                .get("optional")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        _ => ParamSpec {
            ty: String::new(),
            optional: false,
        },
    }
}

fn normalize_returns(returns: &Value) -> Option<ReturnsSpec> {
    match returns {
        Value::String(ty) => Some(ReturnsSpec { ty: ty.clone() }),
        Value::Object(map) => Some(ReturnsSpec {
            ty: map
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        _ => None,
    }
}
