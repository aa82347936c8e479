use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info};

use crate::color::Color;
use crate::compose::GenerationRequest;
use crate::error::OgError;
use crate::fonts::FontProvider;
use crate::settings::Settings;

use super::models::{ErrorResponse, OgQuery};
use super::state::ServerState;

pub async fn run_server(settings: Settings, addr: Option<String>) -> Result<()> {
    let generator = crate::build_generator(&settings)?;
    let addr = addr
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| settings.server_addr.clone());
    let state = Arc::new(ServerState {
        settings,
        generator,
    });
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router<P: FontProvider + 'static>(state: Arc<ServerState<P>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/og", get(og_image::<P>))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<OgError> for ServerError {
    fn from(err: OgError) -> Self {
        ServerError::internal(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

async fn og_image<P: FontProvider + 'static>(
    State(state): State<Arc<ServerState<P>>>,
    Query(query): Query<OgQuery>,
) -> Result<Response<Body>, ServerError> {
    let request = build_request(&state.settings, query)?;
    let state = state.clone();
    let handle = tokio::runtime::Handle::current();
    let result = tokio::task::spawn_blocking(move || {
        handle.block_on(state.generator.generate(&request))
    })
    .await
    .map_err(|err| ServerError::internal(format!("render task failed: {}", err)))?;

    let bytes = result.map_err(|err| {
        error!("og image generation failed: {}", err);
        ServerError::from(err)
    })?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("image/png"))],
        bytes,
    )
        .into_response())
}

fn build_request(settings: &Settings, query: OgQuery) -> Result<GenerationRequest, ServerError> {
    let title = query
        .title
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ServerError::bad_request("title is required"))?;
    let site_name = query.sitename.unwrap_or_default();
    let mut request = settings.request(title, site_name).with_tag(query.tag);
    if let Some(font) = query.font.filter(|value| !value.trim().is_empty()) {
        request = request.with_font_family(font.trim());
    }
    let top = color_param("top", query.top.as_deref(), request.top_color)?;
    let bottom = color_param("bottom", query.bottom.as_deref(), request.bottom_color)?;
    Ok(request.with_colors(top, bottom))
}

fn color_param(name: &str, value: Option<&str>, fallback: Color) -> Result<Color, ServerError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(raw) => Color::parse(raw)
            .map_err(|err| ServerError::bad_request(format!("invalid {} color: {}", name, err))),
        None => Ok(fallback),
    }
}
