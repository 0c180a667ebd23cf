//! HTTP transport for the method-call API.
//!
//! Only `POST /method` is served. The body must be a JSON object; it is
//! handed to the [`MethodRouter`] and the resulting envelope is written back
//! with the envelope's code as the HTTP status.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use scoring_api::{default_router, error_text, MemoryStore, MethodRouter, Store};
use scoring_core::{RequestContext, RequestId};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Header carrying the request id, in and out.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The only routed path, without slashes.
pub const METHOD_PATH: &str = "method";

/// The scoring API server.
pub struct ApiServer {
    config: Arc<ServerConfig>,
    router: Arc<MethodRouter>,
    store: Arc<dyn Store>,
}

impl ApiServer {
    /// Creates a server with the default methods over `store`.
    pub fn new(config: ServerConfig, store: Arc<dyn Store>) -> Self {
        let router = default_router(config.credentials());
        Self {
            config: Arc::new(config),
            router: Arc::new(router),
            store,
        }
    }

    /// Creates a server with an in-memory store, seeded if configured.
    pub fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let store: Arc<dyn Store> = match &config.store.seed_file {
            Some(path) => Arc::new(MemoryStore::from_seed_file(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(config, store))
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn run(self) -> ServerResult<()> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::bind(format!("failed to bind to {addr}: {e}")))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serves connections from `listener` until `shutdown` completes.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "scoring server listening");

        let server = Arc::new(self);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(&server);
                            tokio::spawn(async move {
                                server.handle_connection(stream, peer_addr).await;
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }

                () = &mut shutdown => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream, peer_addr: SocketAddr) {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req| {
            let server = Arc::clone(&self);
            async move { Ok::<_, Infallible>(server.handle_request(req).await) }
        });

        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
            debug!(peer = %peer_addr, "Connection error: {}", e);
        }
    }

    /// Handles one HTTP request.
    pub async fn handle_request<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = RequestId::from_header(
            req.headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok()),
        );
        let mut ctx = RequestContext::with_request_id(request_id);
        let path = req.uri().path().to_string();

        let (code, envelope) = if req.method() == Method::POST {
            let limit = self.config.server.max_body_size;
            match Limited::new(req.into_body(), limit).collect().await {
                Ok(collected) => self.respond(&path, &collected.to_bytes(), &mut ctx),
                Err(e) => {
                    warn!(request_id = %ctx.request_id(), "Failed to read request body: {}", e);
                    error_envelope(StatusCode::BAD_REQUEST)
                }
            }
        } else {
            let code = StatusCode::METHOD_NOT_ALLOWED;
            (code, json!({"error": "Method Not Allowed", "code": code.as_u16()}))
        };

        info!(
            request_id = %ctx.request_id(),
            path = %path,
            code = code.as_u16(),
            method = ctx.method().unwrap_or("-"),
            has = ?ctx.has(),
            nclients = ?ctx.nclients(),
            duration_ms = u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );

        json_response(code, &envelope, ctx.request_id())
    }

    /// Turns a raw body posted to `path` into a status and response envelope.
    pub fn respond(&self, path: &str, body: &[u8], ctx: &mut RequestContext) -> (StatusCode, Value) {
        let request = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(request)) => request,
            Ok(_) => {
                debug!(request_id = %ctx.request_id(), "request body is not an object");
                return error_envelope(StatusCode::BAD_REQUEST);
            }
            Err(e) => {
                debug!(request_id = %ctx.request_id(), "invalid JSON body: {}", e);
                return error_envelope(StatusCode::BAD_REQUEST);
            }
        };

        if path.trim_matches('/') != METHOD_PATH {
            return error_envelope(StatusCode::NOT_FOUND);
        }

        let dispatched = catch_unwind(AssertUnwindSafe(|| {
            self.router.dispatch(&request, ctx, self.store.as_ref())
        }));
        match dispatched {
            Ok(outcome) => (outcome.status_code(), outcome.into_envelope()),
            Err(_) => {
                error!(request_id = %ctx.request_id(), "dispatch panicked");
                error_envelope(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn error_envelope(code: StatusCode) -> (StatusCode, Value) {
    (code, json!({"error": error_text(code), "code": code.as_u16()}))
}

/// Create a JSON response.
fn json_response(status: StatusCode, body: &Value, request_id: &RequestId) -> Response<Full<Bytes>> {
    let json = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());

    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoring_api::auth::Credentials;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn server() -> ApiServer {
        let store = MemoryStore::new();
        store.insert("i:1", r#"["cars"]"#);
        ApiServer::new(ServerConfig::default(), Arc::new(store))
    }

    fn interests_call() -> Value {
        json!({
            "account": "horns&hoofs",
            "login": "h&f",
            "token": Credentials::default().user_token("horns&hoofs", "h&f"),
            "method": "clients_interests",
            "arguments": {"client_ids": [1, 2]},
        })
    }

    fn respond(server: &ApiServer, path: &str, body: &[u8]) -> (StatusCode, Value, RequestContext) {
        let mut ctx = RequestContext::new();
        let (code, envelope) = server.respond(path, body, &mut ctx);
        (code, envelope, ctx)
    }

    async fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_invalid_json_is_bad_request() {
        let (code, envelope, _) = respond(&server(), "/method", b"{not json");
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(envelope, json!({"error": "Bad Request", "code": 400}));
    }

    #[test]
    fn test_non_object_is_bad_request() {
        let (code, _, _) = respond(&server(), "/method", b"[1, 2]");
        assert_eq!(code, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unknown_path() {
        let body = interests_call().to_string();
        let (code, envelope, ctx) = respond(&server(), "/score", body.as_bytes());
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(envelope, json!({"error": "Not Found", "code": 404}));
        assert_eq!(ctx.nclients(), None);
    }

    #[test]
    fn test_method_path_is_trimmed() {
        let body = interests_call().to_string();
        let (code, envelope, ctx) = respond(&server(), "/method/", body.as_bytes());
        assert_eq!(code, StatusCode::OK);
        assert_eq!(ctx.nclients(), Some(2));
        assert_eq!(
            envelope,
            json!({"response": {"1": ["cars"], "2": []}, "code": 200})
        );
    }

    #[test]
    fn test_envelope_code_matches_status() {
        let (code, envelope, _) = respond(&server(), "/method", b"{}");
        assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(envelope["code"], 422);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let request = Request::post("/method")
            .header("X-Request-ID", "req-42")
            .body(Full::new(Bytes::from(interests_call().to_string())))
            .unwrap();

        let response = server().handle_request(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-42");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_json(response).await["code"], 200);
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let request = Request::post("/method").body(Full::new(Bytes::from_static(b"{}"))).unwrap();
        let response = server().handle_request(request).await;
        let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert_eq!(id.len(), 32);
    }

    #[tokio::test]
    async fn test_get_is_not_allowed() {
        let request = Request::get("/method").body(Full::new(Bytes::new())).unwrap();
        let response = server().handle_request(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Method Not Allowed", "code": 405})
        );
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let mut config = ServerConfig::default();
        config.server.max_body_size = 8;
        let server = ApiServer::new(config, Arc::new(MemoryStore::new()));

        let request = Request::post("/method")
            .body(Full::new(Bytes::from(interests_call().to_string())))
            .unwrap();
        let response = server.handle_request(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_seeded_from_config() {
        let mut seed = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::io::Write::write_all(&mut seed, br#"{"i:2": ["music"]}"#).unwrap();

        let mut config = ServerConfig::default();
        config.store.seed_file = Some(seed.path().to_path_buf());
        let server = ApiServer::from_config(config).unwrap();

        let request = Request::post("/method")
            .body(Full::new(Bytes::from(interests_call().to_string())))
            .unwrap();
        let response = server.handle_request(request).await;
        assert_eq!(
            body_json(response).await,
            json!({"response": {"1": [], "2": ["music"]}, "code": 200})
        );
    }

    #[tokio::test]
    async fn test_serve_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server().serve(listener, async {
            let _ = stopped.await;
        }));

        let body = interests_call().to_string();
        let request = format!(
            "POST /method HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
        assert!(raw.contains(r#""code":200"#), "{raw}");

        stop.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
