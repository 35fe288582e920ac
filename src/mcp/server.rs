use serde_json::{json, Value};
use std::sync::Arc;

use super::protocol::{
    CallToolParams, CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION,
    MCP_PROTOCOL_VERSION,
};
use crate::tools::{Tool, ToolCallError};

pub const SERVER_NAME: &str = "YouTube Transcript Extractor";

/// MCP server holding the tools it exposes.
///
/// Built once at startup and shared read-only between connections.
pub struct McpServer {
    name: String,
    version: String,
    tools: Vec<Arc<dyn Tool>>,
}

impl McpServer {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tools,
        }
    }

    /// Names of the registered tools
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.definition().name).collect()
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.definition().name == name)
    }

    /// Handle one raw JSON message. Returns `None` for notifications.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Discarding malformed message: {}", e);
                return Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error(e)));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);

        // A present-but-null id is neither a request nor a notification
        if value.get("id").is_some_and(Value::is_null) {
            return Some(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::invalid_request("id must not be null"),
            ));
        }

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request(e))),
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("unsupported jsonrpc version '{}'", request.jsonrpc)),
            ));
        }

        self.handle_request(request).await
    }

    /// Dispatch a parsed request. Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = match request.id {
            Some(id) => id,
            None => {
                tracing::debug!("Received notification: {}", request.method);
                return None;
            }
        };

        tracing::debug!("Handling request {}: {}", id, request.method);

        let result = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(request.params).await,
            method => Err(JsonRpcError::method_not_found(method)),
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": self.name,
                "version": self.version,
            }
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<_> = self.tools.iter().map(|tool| tool.definition()).collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("missing params"))
            .and_then(|p| serde_json::from_value(p).map_err(JsonRpcError::invalid_params))?;

        let tool = self
            .find_tool(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("unknown tool '{}'", params.name)))?;

        let arguments = params.arguments.unwrap_or_else(|| json!({}));

        let result = match tool.call(arguments).await {
            Ok(text) => CallToolResult::text(text),
            Err(ToolCallError::InvalidArguments(detail)) => {
                return Err(JsonRpcError::invalid_params(detail));
            }
            Err(ToolCallError::Failed(err)) => CallToolResult::error(err.to_string()),
        };

        serde_json::to_value(result).map_err(JsonRpcError::internal_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
    use crate::provider::{MockTranscriptProvider, ProviderError, TranscriptSegment};
    use crate::tools::TranscriptTool;

    fn server_with(provider: MockTranscriptProvider) -> McpServer {
        McpServer::new(vec![Arc::new(TranscriptTool::new(provider))])
    }

    fn call_request(arguments: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(
            1,
            "tools/call",
            Some(json!({"name": "get_youtube_transcript", "arguments": arguments})),
        )
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = server_with(MockTranscriptProvider::new());
        let response = server
            .handle_request(JsonRpcRequest::new(1, "initialize", Some(json!({}))))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let server = server_with(MockTranscriptProvider::new());
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = server_with(MockTranscriptProvider::new());
        let response = server
            .handle_request(JsonRpcRequest::new("a", "tools/list", None))
            .await
            .unwrap();

        assert_eq!(response.id, json!("a"));
        let tools = &response.result.unwrap()["tools"];
        assert_eq!(tools.as_array().unwrap().len(), 1);
        assert_eq!(tools[0]["name"], "get_youtube_transcript");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["video_url"]));
        assert_eq!(server.tool_names(), vec!["get_youtube_transcript".to_string()]);
    }

    #[tokio::test]
    async fn test_call_success() {
        let mut provider = MockTranscriptProvider::new();
        provider.expect_fetch_transcript().returning(|_| {
            Ok(vec![
                TranscriptSegment::new("Hello", 0.0, 1.0),
                TranscriptSegment::new("world", 1.0, 1.0),
            ])
        });
        let server = server_with(provider);

        let response = server
            .handle_request(call_request(json!({"video_url": "https://youtu.be/dQw4w9WgXcQ"})))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["text"], "Hello world");
    }

    #[tokio::test]
    async fn test_call_tool_error_is_result() {
        let server = server_with(MockTranscriptProvider::new());

        let response = server
            .handle_request(call_request(json!({"video_url": "not a youtube url"})))
            .await
            .unwrap();

        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("not a youtube url"));
    }

    #[tokio::test]
    async fn test_call_provider_failure() {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_fetch_transcript()
            .returning(|_| Err(ProviderError::TranscriptsDisabled));
        provider.expect_provider_name().return_const("mock");
        let server = server_with(provider);

        let response = server
            .handle_request(call_request(json!({"video_url": "https://youtu.be/abc12345678"})))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(
            result["content"][0]["text"],
            "Transcripts are disabled for the video with ID: abc12345678"
        );
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let server = server_with(MockTranscriptProvider::new());
        let response = server
            .handle_request(JsonRpcRequest::new(
                2,
                "tools/call",
                Some(json!({"name": "nope", "arguments": {}})),
            ))
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_call_missing_arguments() {
        let server = server_with(MockTranscriptProvider::new());
        let response = server
            .handle_request(JsonRpcRequest::new(
                3,
                "tools/call",
                Some(json!({"name": "get_youtube_transcript"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server_with(MockTranscriptProvider::new());

        let response = server.handle_message("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);

        let response = server.handle_message(r#"{"jsonrpc":"2.0","id":4}"#).await.unwrap();
        assert_eq!(response.id, json!(4));
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);

        let response = server
            .handle_message(r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }
}
