//! Stdio server for the weather service.
//!
//! Reads requests from stdin, routes them to resources, tools, and prompts,
//! and writes responses to stdout. Exits when stdin closes.

use crate::protocol::{
    framing, Method, PromptParams, Request, ResourceParams, Response, RpcError, ToolParams,
    JSONRPC_VERSION,
};
use crate::service::{prompts, resources, tools::Tool};
use crate::weather::Catalog;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, info, warn};

/// The weather service. Stateless apart from the catalog it serves.
pub struct WeatherService {
    catalog: Catalog,
}

impl Default for WeatherService {
    fn default() -> Self {
        Self::new(Catalog::builtin())
    }
}

impl WeatherService {
    /// Create a new service over `catalog`.
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Serve on the process's own stdin/stdout.
    pub async fn run_stdio(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve requests from `reader` until it reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(reader);
        info!("Weather service ready ({} cities)", self.catalog.len());

        loop {
            let response = match framing::read_line(&mut reader).await {
                Ok(Some(line)) => self.handle_line(&line),
                Ok(None) => {
                    info!("Input closed, shutting down");
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    warn!("Rejected request: {}", e);
                    Some(Response::error(Value::Null, RpcError::invalid_request(e)))
                }
                Err(e) => return Err(e).context("Failed to read request"),
            };

            if let Some(response) = response {
                framing::write_message(&mut writer, &response)
                    .await
                    .context("Failed to write response")?;
                debug!("Response sent (id {})", response.id);
            }
        }
    }

    /// Handle one raw line. Returns `None` for notifications.
    pub fn handle_line(&self, line: &str) -> Option<Response> {
        let value: Value = match framing::decode(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparseable request: {}", e);
                return Some(Response::error(Value::Null, RpcError::parse_error(e)));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.handle(request),
            Err(e) => Some(Response::error(id, RpcError::invalid_request(e))),
        }
    }

    /// Handle a decoded request envelope.
    pub fn handle(&self, request: Request) -> Option<Response> {
        let Some(id) = request.id else {
            debug!("Received notification: {}", request.method);
            if request.jsonrpc == JSONRPC_VERSION {
                if let Some(method) = Method::parse(&request.method) {
                    if let Err(error) = self.dispatch(method, request.params) {
                        debug!("Notification {} failed: {}", request.method, error.message);
                    }
                }
            }
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(Response::error(
                id,
                RpcError::invalid_request(format!(
                    "unsupported jsonrpc version '{}'",
                    request.jsonrpc
                )),
            ));
        }

        debug!("Received {} (id {})", request.method, id);
        let result = match Method::parse(&request.method) {
            Some(method) => self.dispatch(method, request.params),
            None => Err(RpcError::method_not_found(&request.method)),
        };

        Some(match result {
            Ok(result) => Response::success(id, result),
            Err(error) => {
                debug!("Request failed: {}", error.message);
                Response::error(id, error)
            }
        })
    }

    fn dispatch(&self, method: Method, params: Value) -> Result<Value, RpcError> {
        match method {
            Method::Ping => Ok(json!({})),
            Method::GetResource => {
                let params: ResourceParams = parse_params(params)?;
                encode(&resources::get(&self.catalog, &params.uri)?)
            }
            Method::InvokeTool => {
                let params: ToolParams = parse_params(params)?;
                let tool = Tool::from_name(&params.tool).ok_or_else(|| {
                    RpcError::invalid_params(format!("unknown tool '{}'", params.tool))
                })?;
                encode(&tool.call(&self.catalog, params.arguments)?)
            }
            Method::GetPrompt => {
                let params: PromptParams = parse_params(params)?;
                encode(&prompts::get(&params.prompt, params.arguments)?)
            }
            Method::ListResources => Ok(json!({ "resources": resources::descriptors() })),
            Method::ListTools => {
                let tools: Vec<_> = Tool::ALL.iter().map(Tool::descriptor).collect();
                Ok(json!({ "tools": tools }))
            }
            Method::ListPrompts => Ok(json!({ "prompts": prompts::descriptors() })),
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(RpcError::invalid_params)
}

fn encode<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(RpcError::internal)
}
