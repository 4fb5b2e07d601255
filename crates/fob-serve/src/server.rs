//! HTTP surface of the dev server.
//!
//! Live updates go out over Server-Sent Events; every other request runs
//! through the [`MiddlewareChain`].

use crate::error::{Error, Result};
use crate::middleware::{CLIENT_SCRIPT_PATH, DevRequest, MiddlewareChain, asset_response};
use crate::state::SharedState;
use axum::{
    Router,
    extract::{Request, State},
    response::{
        Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tower_http::cors::{Any, CorsLayer};

/// Route of the live-update event stream.
pub const LIVE_UPDATE_PATH: &str = "/__fob_live__";

const CLIENT_SCRIPT: &str = include_str!("../assets/dev/live-client.js");

#[derive(Clone)]
struct ServerContext {
    state: SharedState,
    chain: Arc<MiddlewareChain>,
}

/// Build the router: live-update stream, client script, and the chain as
/// fallback. CORS is open for every origin.
pub fn router(state: SharedState, chain: MiddlewareChain) -> Router {
    let context = ServerContext {
        state,
        chain: Arc::new(chain),
    };

    Router::new()
        .route(LIVE_UPDATE_PATH, get(handle_sse))
        .route(CLIENT_SCRIPT_PATH, get(handle_client_script))
        .fallback(handle_request)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(context)
}

/// Bind the listener. Failure is fatal for the session.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })
}

/// A running server task.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Start serving on an already-bound listener.
    pub fn spawn(listener: TcpListener, router: Router) -> Result<Self> {
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
        });

        Ok(Self {
            addr,
            shutdown: Some(tx),
            task,
        })
    }

    /// Bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for the server task.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result.map_err(|e| Error::Server(e.to_string())),
            Err(e) => Err(Error::Server(e.to_string())),
        }
    }
}

/// Handle SSE connections for live-update events.
async fn handle_sse(
    State(context): State<ServerContext>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (id, rx) = context.state.register_client();
    tracing::debug!(client = id, "live update client connected");

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn handle_client_script(State(context): State<ServerContext>) -> Response {
    asset_response(
        CLIENT_SCRIPT,
        "text/javascript; charset=utf-8",
        context.state.headers(),
    )
}

async fn handle_request(State(context): State<ServerContext>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let request = DevRequest::new(parts.method, parts.uri, parts.headers);
    context.chain.run(request).await
}
