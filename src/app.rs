#![cfg(not(tarpaulin_include))]

use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use handlebars::RenderError;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::cache::GradeCache;
use crate::config::{RefreshPolicy, ServerConfig};
use crate::fetcher::Fetcher;
use crate::query::{self, QueryError, QueryForm};
use crate::render::Pages;

pub struct AppState {
    cache: GradeCache,
    pages: Pages,
    refresh: RefreshPolicy,
}

impl AppState {
    /// Create the cache directory and compile the page templates
    pub fn new(config: &ServerConfig, fetcher: Fetcher) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            cache: GradeCache::open(&config.cache_dir, &config.registry, fetcher)?,
            pages: Pages::new()?,
            refresh: config.refresh,
        })
    }
}

/// Build the shared state with an HTTP fetcher configured from `config`
pub fn build_state(config: &ServerConfig) -> Result<Arc<AppState>, Box<dyn std::error::Error>> {
    let fetcher = Fetcher::new(config.fetch_timeout)?;
    Ok(Arc::new(AppState::new(config, fetcher)?))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_form))
        .route("/query", post(handle_query))
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.registry.is_empty() {
        warn!("No classes registered; every query will fail to download");
    }
    let state = build_state(&config)?;
    info!(
        "Serving {} classes, caching under {}",
        config.registry.len(),
        state.cache.dir().display()
    );

    let app = router(state);

    // Start server
    let listener = TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_form() -> Html<&'static str> {
    Html(include_str!("./static/query.html"))
}

async fn handle_query(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QueryForm>,
) -> Response {
    match query::lookup(&state.cache, state.refresh, &form).await {
        Ok(record) => page(state.pages.report(&record)),
        Err(QueryError::DownloadFailed(_)) => page(state.pages.download_failed(&form.class_id)),
        Err(QueryError::StudentNotFound) => Html(state.pages.student_not_found()).into_response(),
        Err(QueryError::WrongPassword) => Html(state.pages.wrong_password()).into_response(),
        Err(e) => {
            error!("Query for class {} failed: {}", form.class_id, e);
            server_error()
        }
    }
}

fn page(rendered: Result<String, RenderError>) -> Response {
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render page: {}", e);
            server_error()
        }
    }
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}
