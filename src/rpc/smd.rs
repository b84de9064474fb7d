use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::rpc::registry::Registry;

pub const ENVELOPE: &str = "JSON-RPC-2.0";
pub const TRANSPORT: &str = "POST";
pub const CONTENT_TYPE: &str = "application/json";
pub const SMD_VERSION: &str = "2.0";

/// Service-mapping description served to non-POST requests: one entry per
/// registered method, describing how to call the service.
#[derive(Debug, Serialize)]
pub struct SmdDocument {
    pub transport: &'static str,
    pub envelope: &'static str,
    #[serde(rename = "contentType")]
    pub content_type: &'static str,
    #[serde(rename = "SMDVersion")]
    pub smd_version: &'static str,
    pub target: String,
    pub services: BTreeMap<String, SmdService>,
}

#[derive(Debug, Serialize)]
pub struct SmdService {
    pub envelope: &'static str,
    pub transport: &'static str,
    /// Parameter map, `{}` when the method was never described.
    pub parameters: Value,
    /// `{"type": ...}`, or `""` when the method was never described.
    pub returns: Value,
}

impl SmdDocument {
    /// Snapshot the registry into a discovery document for `target`.
    pub async fn from_registry(registry: &Registry, target: &str) -> Self {
        let services = registry
            .describe_all()
            .await
            .into_iter()
            .map(|(name, description)| {
                let parameters =
                    serde_json::to_value(&description.parameters).unwrap_or_else(|_| json!({}));
                let returns = match &description.returns {
                    Some(spec) => serde_json::to_value(spec).unwrap_or_else(|_| json!("")),
                    None => json!(""),
                };
                let service = SmdService {
                    envelope: ENVELOPE,
                    transport: TRANSPORT,
                    parameters,
                    returns,
                };
                (name, service)
            })
            .collect();

        SmdDocument {
            transport: TRANSPORT,
            envelope: ENVELOPE,
            content_type: CONTENT_TYPE,
            smd_version: SMD_VERSION,
            target: target.to_string(),
            services,
        }
    }
}
