use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use super::server::McpServer;
use crate::Result;

const MCP_PATHS: &[&str] = &["/mcp", "/mcp/"];
const MAX_HEADER_LINE: usize = 8 * 1024;
const MAX_HEADERS: usize = 100;
const MAX_BODY: usize = 4 * 1024 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Newline-delimited JSON-RPC over stdin/stdout
pub struct StdioTransport {
    server: Arc<McpServer>,
}

impl StdioTransport {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }

    /// Serve stdin until it is closed
    pub async fn run(&self) -> Result<()> {
        tracing::info!("MCP server listening on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
    }

    /// Answer every message read from `reader`, one response line per request
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.server.handle_message(&line).await {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }
}

/// JSON-RPC over HTTP: each message is POSTed to `/mcp` and answered in the response body
pub struct HttpTransport {
    server: Arc<McpServer>,
    host: String,
    port: u16,
    read_timeout: Duration,
}

impl HttpTransport {
    pub fn new(server: Arc<McpServer>, host: impl Into<String>, port: u16) -> Self {
        Self {
            server,
            host: host.into(),
            port,
            read_timeout: READ_TIMEOUT,
        }
    }

    /// Time a client gets to send a complete request before it is answered with 408
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", self.host, self.port))?;

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        self.serve(listener, shutdown).await
    }

    /// Accept connections on `listener` until `shutdown` completes
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!("MCP server listening on http://{}/mcp", addr);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    let server = Arc::clone(&self.server);
                    let read_timeout = self.read_timeout;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(&server, stream, read_timeout).await {
                            tracing::debug!("Connection from {} ended with error: {}", peer, e);
                        }
                    });
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down HTTP transport");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

#[derive(Debug)]
struct HttpResponse {
    status: u16,
    reason: &'static str,
    extra_headers: Vec<(&'static str, &'static str)>,
    body: Option<String>,
}

impl HttpResponse {
    fn new(status: u16, reason: &'static str) -> Self {
        Self {
            status,
            reason,
            extra_headers: Vec::new(),
            body: None,
        }
    }

    fn json(body: String) -> Self {
        Self {
            body: Some(body),
            ..Self::new(200, "OK")
        }
    }

    fn plain(status: u16, reason: &'static str) -> Self {
        Self {
            body: Some(reason.to_string()),
            ..Self::new(status, reason)
        }
    }

    async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut head = format!("HTTP/1.1 {} {}\r\nConnection: close\r\n", self.status, self.reason);

        for (name, value) in &self.extra_headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }

        let body = self.body.as_deref().unwrap_or("");
        if self.body.is_some() {
            let content_type = if self.status == 200 {
                "application/json"
            } else {
                "text/plain; charset=utf-8"
            };
            head.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        head.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));

        writer.write_all(head.as_bytes()).await?;
        writer.write_all(body.as_bytes()).await?;
        writer.flush().await
    }
}

async fn handle_connection<S>(server: &McpServer, stream: S, read_timeout: Duration) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(stream);

    let response = match tokio::time::timeout(read_timeout, read_request(&mut reader)).await {
        Ok(Ok(request)) => route(server, request).await,
        Ok(Err(e)) => {
            tracing::debug!("Rejecting malformed HTTP request: {}", e);
            HttpResponse::plain(400, "Bad Request")
        }
        Err(_) => {
            tracing::debug!("Client did not send a request within {:?}", read_timeout);
            HttpResponse::plain(408, "Request Timeout")
        }
    };

    response.write_to(reader.get_mut()).await?;
    Ok(())
}

async fn route(server: &McpServer, request: HttpRequest) -> HttpResponse {
    let path = request.path.split('?').next().unwrap_or("");
    if !MCP_PATHS.contains(&path) {
        return HttpResponse::plain(404, "Not Found");
    }

    if request.method != "POST" {
        let mut response = HttpResponse::plain(405, "Method Not Allowed");
        response.extra_headers.push(("Allow", "POST"));
        return response;
    }

    let body = match std::str::from_utf8(&request.body) {
        Ok(body) => body,
        Err(_) => return HttpResponse::plain(400, "Bad Request"),
    };

    match server.handle_message(body).await {
        Some(response) => match serde_json::to_string(&response) {
            Ok(json) => HttpResponse::json(json),
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                HttpResponse::plain(500, "Internal Server Error")
            }
        },
        None => HttpResponse::new(202, "Accepted"),
    }
}

async fn read_line_limited<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    let read = (&mut *reader)
        .take(MAX_HEADER_LINE as u64)
        .read_line(&mut line)
        .await?;

    if read == 0 {
        anyhow::bail!("connection closed before request was complete");
    }
    if !line.ends_with('\n') {
        anyhow::bail!("header line too long");
    }

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn read_request<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<HttpRequest> {
    let request_line = read_line_limited(reader).await?;
    let mut parts = request_line.split_whitespace();
    let (method, path) = match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(path), Some(version)) if version.starts_with("HTTP/1.") => {
            (method.to_string(), path.to_string())
        }
        _ => anyhow::bail!("invalid request line: {}", request_line),
    };

    let mut content_length = 0usize;
    let mut header_count = 0;

    loop {
        let line = read_line_limited(reader).await?;
        if line.is_empty() {
            break;
        }

        header_count += 1;
        if header_count > MAX_HEADERS {
            anyhow::bail!("too many headers");
        }

        let (name, value) = line
            .split_once(':')
            .with_context(|| format!("invalid header: {}", line))?;

        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value.trim().parse().context("invalid Content-Length")?;
        } else if name.trim().eq_ignore_ascii_case("transfer-encoding") {
            anyhow::bail!("chunked request bodies are not supported");
        }
    }

    if content_length > MAX_BODY {
        anyhow::bail!("request body too large: {} bytes", content_length);
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    Ok(HttpRequest { method, path, body })
}
