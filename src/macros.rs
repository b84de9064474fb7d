/// Macros for ergonomic method registration
///
/// Usage:
/// ```rust,ignore
/// rpc_method!(lookup, params => {
///     let key = params["key"].as_str().ok_or_invalid_params()?;
///     Ok(json!({"key": key}))
/// });
///
/// register_methods!(server, {
///     "lookup" => lookup,
/// });
/// ```
#[macro_export]
macro_rules! rpc_method {
    ($name:ident, $params:ident => $body:block) => {
        pub fn $name(
            $params: serde_json::Value,
        ) -> std::pin::Pin<
            Box<
                dyn std::future::Future<
                        Output = Result<serde_json::Value, $crate::rpc::HandlerError>,
                    > + Send,
            >,
        > {
            Box::pin(async move { $body })
        }
    };
}

/// Register multiple method handlers at once
///
/// Usage:
/// ```rust,ignore
/// register_methods!(server, {
///     "ping" => ping,
///     "sum" => sum,
/// });
/// ```
#[macro_export]
macro_rules! register_methods {
    ($server:expr, { $($method:expr => $handler:expr),* $(,)? }) => {
        {
            $(
                $server.register($method, $handler).await;
            )*
        }
    };
}

/// Helper trait to convert Option misses into handler errors
pub trait OptionExt<T> {
    fn ok_or_invalid_params(self) -> Result<T, crate::rpc::HandlerError>;
    fn ok_or_rpc_error(
        self,
        code: i64,
        msg: impl Into<String>,
    ) -> Result<T, crate::rpc::HandlerError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_params(self) -> Result<T, crate::rpc::HandlerError> {
        self.ok_or_else(|| {
            crate::rpc::HandlerError::structured(crate::rpc::INVALID_PARAMS, "Invalid params.")
        })
    }

    fn ok_or_rpc_error(
        self,
        code: i64,
        msg: impl Into<String>,
    ) -> Result<T, crate::rpc::HandlerError> {
        self.ok_or_else(|| crate::rpc::HandlerError::structured(code, msg))
    }
}
