use super::load_dashboard;
use super::page::DashboardPage;
use crate::error::{Result, WarehouseError};
use crate::warehouse::Connector;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use hyper::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Environment lookup used on every page load.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn Connector>,
    pub env: EnvLookup,
}

impl AppState {
    /// State reading the process environment.
    pub fn from_process_env(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            env: Arc::new(|key: &str| std::env::var(key).ok()),
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "culture-warehouse-dashboard",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn index(State(state): State<AppState>) -> Response {
    let env = state.env.clone();
    let view = load_dashboard(|key| env(key), state.connector.as_ref()).await;
    match DashboardPage::from_view(&view).to_html() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render dashboard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// `Content-Security-Policy` value allowing the page to be framed by `ancestors`.
pub fn frame_ancestors_policy(ancestors: &[String]) -> String {
    let mut policy = String::from("frame-ancestors 'self'");
    for origin in ancestors {
        policy.push(' ');
        policy.push_str(origin);
    }
    policy
}

pub fn create_router(state: AppState, frame_ancestors: &[String]) -> Result<Router> {
    let policy = frame_ancestors_policy(frame_ancestors);
    let policy = HeaderValue::from_str(&policy)
        .map_err(|e| WarehouseError::Config(format!("invalid frame ancestors {policy:?}: {e}")))?;

    Ok(Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::overriding(header::CONTENT_SECURITY_POLICY, policy)),
        ))
}

pub async fn start_server(state: AppState, port: u16, frame_ancestors: &[String]) -> Result<()> {
    let app = create_router(state, frame_ancestors)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Dashboard running on http://localhost:{}", port);
    info!("Health check: http://localhost:{}/health", port);

    Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}
