use crate::error::AppError;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use sapawarga_exporter_collector::MetricRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: MetricRegistry,
}

pub fn create_router(registry: MetricRegistry) -> Router {
    let state = AppState { registry };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.registry.render()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
