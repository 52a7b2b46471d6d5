//! The webhook server. Telegram posts each chat message to one path; we route it, send the reply
//! back through the `Messenger` and answer Telegram with `202 Accepted`.
//!
//! Every request is independent. Once the body has been parsed the answer is always `202`: a
//! failure while handling the message is logged and reported to the chat as a reply, never as a
//! status code, because Telegram redelivers any update that gets a non-2xx answer.

use crate::api::Messenger;
use crate::error::{ErrorType, Res};
use crate::model::Update;
use crate::router::{Router, CANNOT_PROCESS, DEPENDENCY_FAILED};
use anyhow::Context;
use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Telegram updates are a few kilobytes at most.
const MAX_BODY_BYTES: usize = 64 * 1024;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything a request handler needs. Shared by all connections.
pub struct AppState {
    router: Router,
    messenger: Arc<dyn Messenger>,
    webhook_path: String,
}

impl AppState {
    pub fn new(router: Router, messenger: Arc<dyn Messenger>, webhook_path: impl Into<String>) -> Self {
        Self {
            router,
            messenger,
            webhook_path: webhook_path.into(),
        }
    }
}

/// Accepts connections on `listener` forever, serving each one in its own task.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Res<()> {
    let addr = listener
        .local_addr()
        .context("Unable to read the listening address")?;
    info!("Listening for webhooks on http://{addr}{}", state.webhook_path);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept a connection: {e}");
                continue;
            }
        };
        let state = state.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handle(&state, req, peer).await) }
            });
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("Connection from {peer} ended with an error: {e}");
            }
        });
    }
}

/// Handles one HTTP request.
pub async fn handle(state: &AppState, req: Request<Incoming>, peer: SocketAddr) -> Response<String> {
    if req.uri().path() != state.webhook_path {
        return status(StatusCode::NOT_FOUND);
    }
    if req.method() != Method::POST {
        return status(StatusCode::METHOD_NOT_ALLOWED);
    }

    let body = match read_body(req.into_body()).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Unable to read the request body from {peer}: {e}");
            return status(StatusCode::BAD_REQUEST);
        }
    };
    let update = match Update::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Unable to parse the webhook payload from {peer}: {e}");
            return status(StatusCode::BAD_REQUEST);
        }
    };

    let reply = respond(state, update.text()).await;
    if let Err(e) = state.messenger.send(&reply).await {
        warn!("Unable to send the reply '{reply}': {e:#}");
    }
    status(StatusCode::ACCEPTED)
}

/// Routes `text` and decides on the reply text. Errors become one of the fixed failure replies.
async fn respond(state: &AppState, text: &str) -> String {
    match state.router.handle(text).await {
        Ok(reply) => reply,
        Err(e) => match e.error_type() {
            ErrorType::Request => {
                warn!("Unable to process '{text}': {e}");
                CANNOT_PROCESS.to_string()
            }
            ErrorType::Dependency | ErrorType::Startup => {
                error!("Failed to handle '{text}': {e}");
                DEPENDENCY_FAILED.to_string()
            }
        },
    }
}

/// Reads the whole body, failing if it is larger than `MAX_BODY_BYTES`.
async fn read_body<B>(body: B) -> std::result::Result<Bytes, BoxError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    Ok(Limited::new(body, MAX_BODY_BYTES).collect().await?.to_bytes())
}

fn status(code: StatusCode) -> Response<String> {
    let mut response = Response::new(String::new());
    *response.status_mut() = code;
    response
}
