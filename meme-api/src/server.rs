//! The HTTP surface: JSON routes over the cache, the sampler and the update coordinator.

use crate::catalog::{CatalogCache, EntityKind, RandomSource, Sampler, UpdateCoordinator};
use crate::error::CatalogError;
use crate::sheets::{Category, ConfigSource};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use eyre::Context;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

const ROUTES: &[(&str, &str)] = &[
    ("GET /api/v1/all/videos", "every listed video"),
    ("GET /api/v1/all/playlists", "every playlist, including channel uploads"),
    ("GET /api/v1/all/channels", "every channel"),
    ("GET /api/v1/all/items", "the first page of items of every playlist"),
    ("GET /api/v1/random/video", "a random item of a random playlist"),
    ("GET /api/v1/random/listed-video", "a random listed video"),
    ("GET /api/v1/random/playlist", "a random playlist"),
    ("GET /api/v1/random/channel", "a random channel"),
    (
        "GET|POST /api/v1/update/{all,videos,playlists,channels}",
        "re-read the sheet and repopulate what changed; ?force=true repopulates unconditionally",
    ),
    ("DELETE /api/v1/cache", "empty the cache"),
];

/// Everything the request handlers need, shared by every connection.
#[derive(Debug)]
pub struct AppState {
    cache: Arc<CatalogCache>,
    sampler: Sampler,
    coordinator: UpdateCoordinator,
}

impl AppState {
    pub fn new(
        cache: Arc<CatalogCache>,
        source: Arc<dyn ConfigSource>,
        random: RandomSource,
    ) -> Self {
        Self {
            sampler: Sampler::new(cache.clone(), random),
            coordinator: UpdateCoordinator::new(source, cache.clone()),
            cache,
        }
    }

    pub fn coordinator(&self) -> &UpdateCoordinator {
        &self.coordinator
    }
}

/// A failed request, reported as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "not found".to_string(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(error: CatalogError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            tracing::warn!(%error, %status, "request failed");
        }
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

/// The HTTP status a catalog failure is reported with.
pub fn status_for(error: &CatalogError) -> StatusCode {
    match error {
        CatalogError::EmptyCollection { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CatalogError::RemoteUnavailable { .. }
        | CatalogError::NotFound { .. }
        | CatalogError::EmptyResult { .. }
        | CatalogError::ExhaustedPagination { .. } => StatusCode::BAD_GATEWAY,
        CatalogError::MalformedReference { .. }
        | CatalogError::PersistenceWrite { .. }
        | CatalogError::PersistenceRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Creates the router for the whole API.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/v1/all/{listing}", get(all))
        .route("/api/v1/random/{draw}", get(random))
        .route("/api/v1/update/{target}", get(update).post(update))
        .route("/api/v1/cache", delete(clear))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` completes.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> eyre::Result<()> {
    let addr = listener.local_addr().context("get listening address")?;
    tracing::info!(%addr, "serving");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("serve HTTP")?;
    tracing::info!("no longer accepting connections");
    Ok(())
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    tracing::debug!(%method, path, status = response.status().as_u16(), "handled request");
    response
}

async fn index() -> Json<serde_json::Map<String, serde_json::Value>> {
    Json(
        ROUTES
            .iter()
            .map(|(route, what)| (route.to_string(), serde_json::Value::from(*what)))
            .collect(),
    )
}

/// GET /api/v1/all/{listing}
async fn all(
    State(state): State<Arc<AppState>>,
    Path(listing): Path<String>,
) -> Result<Response, ApiError> {
    let kind = match listing.as_str() {
        "videos" => EntityKind::Video,
        "playlists" => EntityKind::Playlist,
        "channels" => EntityKind::Channel,
        "items" => EntityKind::PlaylistItemPage,
        _ => return Err(ApiError::not_found()),
    };
    Ok(Json(state.cache.get(kind)).into_response())
}

/// GET /api/v1/random/{draw}
async fn random(
    State(state): State<Arc<AppState>>,
    Path(draw): Path<String>,
) -> Result<Response, ApiError> {
    let sampler = &state.sampler;
    let response = match draw.as_str() {
        "video" => Json(sampler.random_nested_item().await?).into_response(),
        "listed-video" => Json(sampler.random_entity(EntityKind::Video)?).into_response(),
        "playlist" => Json(sampler.random_entity(EntityKind::Playlist)?).into_response(),
        "channel" => Json(sampler.random_entity(EntityKind::Channel)?).into_response(),
        _ => return Err(ApiError::not_found()),
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct UpdateParams {
    #[serde(default)]
    force: bool,
}

/// GET|POST /api/v1/update/{target}
async fn update(
    State(state): State<Arc<AppState>>,
    Path(target): Path<String>,
    Query(params): Query<UpdateParams>,
) -> Result<Response, ApiError> {
    let coordinator = &state.coordinator;
    let category = match target.as_str() {
        "all" => {
            let outcomes = if params.force {
                coordinator.load_all(true).await?
            } else {
                coordinator.refresh_all().await?
            };
            return Ok(Json(outcomes).into_response());
        }
        "videos" => Category::Video,
        "playlists" => Category::Playlist,
        "channels" => Category::Channel,
        _ => return Err(ApiError::not_found()),
    };
    let outcome = if params.force {
        coordinator.reload(category, true).await?
    } else {
        coordinator.refresh(category).await?
    };
    Ok(Json(outcome).into_response())
}

/// DELETE /api/v1/cache
async fn clear(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.coordinator.reset().await;
    Json(serde_json::json!({ "cleared": true }))
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

async fn method_not_allowed() -> ApiError {
    ApiError {
        status: StatusCode::METHOD_NOT_ALLOWED,
        message: "method not allowed".to_string(),
    }
}
