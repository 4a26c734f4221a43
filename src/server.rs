//! HTTP surface: `POST /align`, `GET /health`. Grounded in the teacher's
//! `handle_transcribe_request`/`handle_health_request`/`track_request`
//! shape, simplified to the alignment service's single JSON endpoint (no
//! client-auth layer — this service has no notion of API clients).

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::MatchedPath;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_server::Handle;
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::error::{HttpResult, VoxAlignHttpError};
use crate::models::{AlignRequest, AlignResponse};
use crate::pipeline::run_alignment;

pub fn build_router() -> Router {
    Router::new()
        .route("/align", post(handle_align_request))
        .route("/health", get(handle_health_request))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(track_request))
}

pub async fn serve(address: &str, port: u16) -> Result<()> {
    let router = build_router();
    let addr = format!("{address}:{port}")
        .parse::<SocketAddr>()
        .context("failed to parse bind address")?;
    info!("listening on {}", addr);

    let shutdown_handle = Handle::new();
    tokio::spawn(shutdown_handler(shutdown_handle.clone()));

    axum_server::bind(addr)
        .handle(shutdown_handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

async fn shutdown_handler(handle: Handle) {
    let ctrl_c_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate_signal = async {
        if let Ok(mut signal) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            signal.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate_signal = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c_signal => handle.graceful_shutdown(Some(Duration::from_secs(10))),
        () = terminate_signal => handle.graceful_shutdown(Some(Duration::from_secs(10))),
    }
}

/// Advisory header mirroring `metadata.license_warning` (spec §6.2): set
/// whenever the ASR collaborator selected a non-commercial model, so a
/// caller can surface the notice without parsing the JSON body.
const LICENSE_WARNING_HEADER: &str = "x-voxalign-license-warning";

#[instrument(level = "trace", skip(req))]
async fn handle_align_request(Json(req): Json<AlignRequest>) -> HttpResult<Response> {
    let response = task::spawn_blocking(move || run_alignment(&req))
        .await
        .map_err(|err| VoxAlignHttpError::from(anyhow::anyhow!(err)))??;

    let license_warning = response.metadata.license_warning.clone();
    let mut http_response = Json(response).into_response();
    if let Some(warning) = license_warning {
        if let Ok(value) = HeaderValue::from_str(&warning) {
            http_response.headers_mut().insert(LICENSE_WARNING_HEADER, value);
        }
    }
    Ok(http_response)
}

#[instrument(level = "trace")]
async fn handle_health_request() -> StatusCode {
    StatusCode::OK
}

fn get_path(request: &axum::extract::Request) -> String {
    request.extensions().get::<MatchedPath>().map_or_else(
        || request.uri().path().to_string(),
        |matched_path| matched_path.as_str().to_string(),
    )
}

async fn track_request(req: axum::extract::Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_owned();
    let path = get_path(&req);

    let response = next.run(req).await;
    info!(
        histogram.http.server.request.duration = start.elapsed().as_secs_f64(),
        %method,
        path,
        status = response.status().as_u16(),
    );
    response
}
