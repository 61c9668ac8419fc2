//! Wire protocol between the shell and the weather service.
//!
//! JSON-RPC 2.0 envelopes, one JSON object per line, over the service's
//! stdin/stdout.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Methods understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GetResource,
    InvokeTool,
    GetPrompt,
    ListResources,
    ListTools,
    ListPrompts,
    Ping,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GetResource => "get_resource",
            Method::InvokeTool => "invoke_tool",
            Method::GetPrompt => "get_prompt",
            Method::ListResources => "list_resources",
            Method::ListTools => "list_tools",
            Method::ListPrompts => "list_prompts",
            Method::Ping => "ping",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        [
            Method::GetResource,
            Method::InvokeTool,
            Method::GetPrompt,
            Method::ListResources,
            Method::ListTools,
            Method::ListPrompts,
            Method::Ping,
        ]
        .into_iter()
        .find(|m| m.as_str() == name)
    }
}

/// Request envelope. A request without an `id` is a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: Method, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.as_str().to_string(),
            params,
            id: Some(Value::from(id)),
        }
    }
}

/// Response envelope. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Create a successful response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Standard JSON-RPC error codes, plus the resource-not-found code.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const RESOURCE_NOT_FOUND: i64 = -32002;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", detail))
    }

    pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::INVALID_REQUEST, format!("Invalid request: {}", detail))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::INVALID_PARAMS, format!("Invalid params: {}", detail))
    }

    pub fn resource_not_found(uri: &str) -> Self {
        Self::new(codes::RESOURCE_NOT_FOUND, format!("Resource not found: {}", uri))
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::INTERNAL_ERROR, format!("Internal error: {}", detail))
    }
}

/// Params of `get_resource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceParams {
    pub uri: String,
}

/// Params of `invoke_tool`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParams {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Params of `get_prompt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptParams {
    pub prompt: String,
    #[serde(default)]
    pub arguments: Value,
}

/// A piece of content inside a tool result or prompt message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Content::Text { text } => text,
        }
    }
}

/// Result of `get_resource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContents {
    pub contents: Vec<ResourceContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContent {
    pub uri: String,
    pub text: String,
}

/// Result of `invoke_tool`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl ToolResult {
    pub fn success(text: impl Into<String>, structured: Value) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
            structured_content: Some(structured),
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: true,
            structured_content: None,
        }
    }

    /// All text content joined by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(Content::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Vec<Content>,
}

/// Result of `get_prompt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResult {
    pub messages: Vec<PromptMessage>,
}

/// Entry in the `list_resources` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_template: Option<String>,
    pub description: String,
}

/// Entry in the `list_tools` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Entry in the `list_prompts` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub required: bool,
}

/// Framing for messages: newline-delimited JSON.
/// Format: one JSON document per line, terminated by `\n`.
pub mod framing {
    use std::io;
    use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

    /// Longest accepted line, newline excluded.
    pub const MAX_LINE_BYTES: usize = 1_000_000;

    /// Write one message followed by a newline.
    pub async fn write_message<W, T>(writer: &mut W, message: &T) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
        T: serde::Serialize,
    {
        let mut json = serde_json::to_vec(message)?;
        json.push(b'\n');
        writer.write_all(&json).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read the next non-blank line. `Ok(None)` means the peer closed the stream.
    ///
    /// Oversized or non-UTF-8 lines are consumed in full and reported as
    /// `InvalidData`, so the caller can keep reading after them.
    pub async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let mut buf = Vec::new();
            let limit = MAX_LINE_BYTES as u64 + 1;
            let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
            if n == 0 {
                return Ok(None);
            }

            if buf.last() != Some(&b'\n') && n as u64 == limit {
                discard_line(reader).await?;
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Message too large: more than {} bytes", MAX_LINE_BYTES),
                ));
            }

            let line = String::from_utf8(buf)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(trimmed.to_string()));
        }
    }

    /// Skip everything up to and including the next newline.
    async fn discard_line<R>(reader: &mut R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let buf = reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(());
            }
            match buf.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    reader.consume(pos + 1);
                    return Ok(());
                }
                None => {
                    let len = buf.len();
                    reader.consume(len);
                }
            }
        }
    }

    /// Parse a line read with [`read_line`].
    pub fn decode<T>(line: &str) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(line)
    }
}
