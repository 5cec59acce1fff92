//! JSON-over-HTTP transport for the gateway REST API
//!
//! Requests are built against a base address and executed with a caller
//! supplied [`CancellationToken`]. Response bodies are always read to the end
//! before being interpreted, so the underlying connection can be reused.

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Request, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use kg_core::{GatewayConfig, GatewayError, Result};

/// HTTP client bound to one gateway's REST base address
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
    auth_token: Option<String>,
}

impl HttpTransport {
    /// Create a transport for the given REST base address
    pub fn new(base: Url) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base,
            auth_token: None,
        })
    }

    /// Create a transport from configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let base = config.api_base()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            auth_token: config.auth_token.clone(),
        })
    }

    /// Send `Authorization: token <token>` with every request
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// REST base address
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a path against the base address
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::Address(format!("{} against {}: {}", path, self.base, e)))
    }

    /// Build a request for `path`, with `body` encoded as JSON when present
    pub fn build_request<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Request>
    where
        B: Serialize + ?Sized,
    {
        let url = self.resolve(path)?;
        let mut request = Request::new(method, url);

        if let Some(body) = body {
            let json =
                serde_json::to_vec(body).map_err(|e| GatewayError::Encoding(e.to_string()))?;
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *request.body_mut() = Some(json.into());
        }

        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("token {}", token))
                .map_err(|e| GatewayError::Encoding(format!("Invalid auth token: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        Ok(request)
    }

    /// Execute a request and decode the JSON body.
    ///
    /// Returns `None` when the body is empty.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        let body = self.execute_bytes(request, cancel).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| GatewayError::Decoding(format!("Malformed response body: {}", e)))
    }

    /// Execute a request and discard the body
    pub async fn execute_empty(&self, request: Request, cancel: &CancellationToken) -> Result<()> {
        self.execute_bytes(request, cancel).await.map(|_| ())
    }

    /// Execute a request and copy the raw body into `sink`.
    ///
    /// Returns the number of bytes written.
    pub async fn execute_raw<W>(
        &self,
        request: Request,
        cancel: &CancellationToken,
        sink: &mut W,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut response = self.send(request, cancel).await?;
        if !response.status().is_success() {
            return Err(status_error(response, cancel).await);
        }

        let mut written = 0u64;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                chunk = response.chunk() => chunk.map_err(transport_error)?,
            };
            let Some(chunk) = chunk else { break };
            sink.write_all(&chunk)
                .await
                .map_err(|e| GatewayError::Transport(format!("Failed to write response: {}", e)))?;
            written += chunk.len() as u64;
        }
        sink.flush()
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to flush response: {}", e)))?;

        Ok(written)
    }

    async fn execute_bytes(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<bytes::Bytes> {
        let response = self.send(request, cancel).await?;
        if !response.status().is_success() {
            return Err(status_error(response, cancel).await);
        }
        read_body(response, cancel).await
    }

    async fn send(&self, request: Request, cancel: &CancellationToken) -> Result<Response> {
        tracing::debug!(method = %request.method(), url = %request.url(), "Sending gateway request");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            response = self.client.execute(request) => response.map_err(transport_error)?,
        };

        tracing::debug!(status = %response.status(), "Gateway responded");
        Ok(response)
    }
}

async fn read_body(response: Response, cancel: &CancellationToken) -> Result<bytes::Bytes> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GatewayError::Cancelled),
        body = response.bytes() => body.map_err(transport_error),
    }
}

/// Drain a non-success response into a `Status` error
async fn status_error(response: Response, cancel: &CancellationToken) -> GatewayError {
    let code = response.status().as_u16();
    match read_body(response, cancel).await {
        Ok(body) => GatewayError::Status {
            code,
            body: String::from_utf8_lossy(&body).trim().to_string(),
        },
        Err(err) => err,
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}
