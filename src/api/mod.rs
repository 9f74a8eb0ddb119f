use crate::{api::handlers::health, cli::telemetry, gateway::Gateway};
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::options,
};
use std::{path::Path, sync::Arc};
use tokio::{net::TcpListener, signal};
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{
    request_id::PropagateRequestIdLayer, services::ServeDir,
    set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, debug, info, info_span};
use ulid::Ulid;

pub(crate) mod handlers;
mod openapi;

pub use openapi::openapi;

/// JSON bodies above this size are rejected.
pub const BODY_LIMIT_BYTES: usize = 6 * 1024 * 1024;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Assemble the full application: documented API routes, `OPTIONS /health`,
/// the static file fallback and the shared middleware stack.
pub fn app(gateway: Arc<Gateway>, static_dir: &Path) -> Router {
    let (router, _openapi) = openapi::api_router().split_for_parts();
    let files = ServeDir::new(static_dir);
    router
        .route("/health", options(health::health))
        .fallback(move |request: Request<Body>| serve_static(files.clone(), request))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
                .layer(Extension(gateway)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, gateway: Gateway, static_dir: impl AsRef<Path>) -> Result<()> {
    let app = app(Arc::new(gateway), static_dir.as_ref());

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    telemetry::shutdown_tracer();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

/// Serve a file from the static directory. Paths with a hidden segment
/// (`.env`, `.git/...`) are never served.
async fn serve_static(files: ServeDir, request: Request<Body>) -> Response {
    if has_hidden_segment(request.uri().path()) {
        debug!("Refusing hidden static path {}", request.uri().path());
        return StatusCode::NOT_FOUND.into_response();
    }

    match files.oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// `ServeDir` percent-decodes paths, so an encoded leading dot counts too.
fn has_hidden_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        segment.starts_with('.')
            || segment
                .get(..3)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%2e"))
    })
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
