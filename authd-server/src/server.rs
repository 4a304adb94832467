//! HTTP/1.1 server implementation

use crate::handlers::handle_request;
use authd_core::{Authenticator, KeyManager, TokenAuthority};
use authd_store::UserStore;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Response;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// Shared per-request context: key manager, token authority, orchestrator
/// and store, all cheaply cloneable
#[derive(Clone)]
pub struct AppState {
    pub keys: Arc<KeyManager>,
    pub store: UserStore,
    pub tokens: TokenAuthority,
    pub authenticator: Authenticator<UserStore>,
}

impl AppState {
    pub fn new(keys: Arc<KeyManager>, store: UserStore, token_ttl: Duration) -> Self {
        let tokens = TokenAuthority::new(keys.clone());
        let authenticator = Authenticator::new(store.clone(), tokens.clone(), token_ttl);

        AppState {
            keys,
            store,
            tokens,
            authenticator,
        }
    }
}

pub struct AuthServer {
    state: AppState,
}

impl AuthServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn serve(self, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener (lets tests bind port 0)
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        info!("authd server listening on {}", listener.local_addr()?);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            debug!("New connection from {}", remote_addr);

            let state = self.state.clone();
            tokio::spawn(async move {
                if let Err(err) = Self::handle_connection(stream, state).await {
                    error!("Connection error from {}: {}", remote_addr, err);
                }
            });
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        state: AppState,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req| {
            let state = state.clone();
            async move { handle_request(req, state).await }
        });

        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
            error!("HTTP connection error: {}", err);
        }

        Ok(())
    }
}

/// Simple HTTP response builder
pub fn simple_response(
    status: hyper::StatusCode,
    body: impl Into<String>,
) -> Result<Response<Full<bytes::Bytes>>, hyper::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("server", "authd/0.1.0")
        .body(Full::new(bytes::Bytes::from(body.into())))
        .unwrap())
}
