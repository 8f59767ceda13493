use axum::{
    extract::State,
    http::StatusCode,
    response::{sse::Event, Html, IntoResponse, Redirect, Sse},
    routing::{get, post},
    Form, Json, Router,
};
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::app_state::AppState;
use crate::controller::SubmitRejection;
use crate::domain::{Backend, Capability, RequestId, ViewSnapshot, ViewState};
use crate::service::{begin_search, search, spawn_completion};
use crate::view::render_page;

fn build_cors_layer(origins_raw: Option<&str>) -> CorsLayer {
    let origins: Vec<String> = origins_raw
        .unwrap_or("*")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values = origins
            .into_iter()
            .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
            .collect::<Vec<_>>();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchRequest {
    pub term: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, start_search, current_view, status, sse_stream, openapi_json),
    components(
        schemas(
            SearchRequest,
            HealthResponse,
            ErrorResponse,
            ViewSnapshot,
            ViewState,
            RequestId,
            Capability,
            Backend
        )
    ),
    tags(
        (name = "finterm", description = "AI financial term explainer")
    )
)]
pub struct ApiDoc;

pub fn app(state: AppState, cors_origins: Option<&str>) -> Router {
    let cors = build_cors_layer(cors_origins);

    Router::new()
        .route("/", get(index))
        .route("/search", post(form_search))
        .route("/health", get(health))
        .route("/v1/search", post(start_search))
        .route("/v1/view", get(current_view))
        .route("/v1/status", get(status))
        .route("/v1/stream", get(sse_stream))
        .route("/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(cors)
}

fn rejection_response(rejection: SubmitRejection) -> axum::response::Response {
    let code = match rejection {
        SubmitRejection::EmptyTerm => StatusCode::BAD_REQUEST,
        SubmitRejection::Busy => StatusCode::CONFLICT,
    };
    (
        code,
        Json(ErrorResponse {
            error: rejection.to_string(),
        }),
    )
        .into_response()
}

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.controller.lock().await.state().clone();
    Html(render_page(&view, &state.capability()))
}

/// Script-free fallback: waits for the answer, then sends the browser back to `/`.
async fn form_search(State(state): State<AppState>, Form(req): Form<SearchRequest>) -> impl IntoResponse {
    if let Err(rejection) = search(&state, &req.term).await {
        tracing::debug!(%rejection, "form submission ignored");
    }
    Redirect::to("/")
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, body = HealthResponse))
)]
async fn health() -> impl IntoResponse {
    Json(HealthResponse { ok: true })
}

#[utoipa::path(
    post,
    path = "/v1/search",
    request_body = SearchRequest,
    responses(
        (status = 202, body = ViewSnapshot, description = "Search started; the view is Loading"),
        (status = 400, body = ErrorResponse, description = "Blank term"),
        (status = 409, body = ErrorResponse, description = "A search is already in flight")
    )
)]
async fn start_search(State(state): State<AppState>, Json(req): Json<SearchRequest>) -> impl IntoResponse {
    match begin_search(&state, &req.term).await {
        Ok((ticket, snapshot)) => {
            spawn_completion(&state, ticket);
            (StatusCode::ACCEPTED, Json(snapshot)).into_response()
        }
        Err(rejection) => rejection_response(rejection),
    }
}

#[utoipa::path(
    get,
    path = "/v1/view",
    responses((status = 200, body = ViewSnapshot))
)]
async fn current_view(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.snapshot().await)
}

#[utoipa::path(
    get,
    path = "/v1/status",
    responses((status = 200, body = Capability))
)]
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.capability())
}

#[utoipa::path(
    get,
    path = "/v1/stream",
    responses((status = 200, body = String, description = "SSE stream of `view` events"))
)]
async fn sse_stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events_tx.subscribe();
    let current = state.snapshot().await;

    let initial = stream::once(async move { current });
    let updates = BroadcastStream::new(rx).filter_map(|msg| async move { msg.ok() });

    let stream = initial.chain(updates).map(|snapshot| {
        let data = serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().event("view").data(data))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("ping"),
    )
}

#[utoipa::path(
    get,
    path = "/openapi.json",
    responses((status = 200, body = serde_json::Value))
)]
async fn openapi_json() -> impl IntoResponse {
    Json(serde_json::to_value(ApiDoc::openapi()).unwrap_or_else(|_| json!({})))
}

pub async fn run_server(addr: SocketAddr, state: AppState, cors_origins: Option<&str>) -> anyhow::Result<()> {
    let app = app(state, cors_origins);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn write_spec_json(path: &str) -> anyhow::Result<()> {
    let v = serde_json::to_value(ApiDoc::openapi()).unwrap_or_else(|_| json!({}));
    let bytes = serde_json::to_vec_pretty(&v)?;
    tokio::fs::write(path, bytes).await?;
    tracing::info!(path, "wrote OpenAPI document");
    Ok(())
}
