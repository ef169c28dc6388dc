//! Web服务器

use axum::{
    routing::{get, post, put},
    Router,
};
use clinic_core::Result;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{
    acknowledge_blood, admit_token, api_root, approve_token, decline_blood, escalate_session,
    finalize_session, fulfill_blood, get_blood_history, get_blood_requests, get_escalated,
    get_history, get_overview, get_protocol, get_queue, get_session_progress, get_sessions,
    health, post_blood_request, put_expected_duration, put_protocol, reschedule_token,
};
use crate::state::AppState;

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        let app = Self::create_app(state);
        Self { addr, app }
    }

    fn create_app(state: AppState) -> Router {
        Router::new()
            // 根路径
            .route("/", get(api_root))
            // 健康检查
            .route("/health", get(health))
            // API路由
            .nest("/api/v1", api_routes())
            .with_state(state)
            // 全局中间件
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(
                        CorsLayer::new()
                            .allow_origin(Any)
                            .allow_methods(Any)
                            .allow_headers(Any),
                    ),
            )
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|e| clinic_core::ClinicError::Internal(format!("web server failed: {}", e)))?;

        Ok(())
    }
}

/// API v1 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(get_overview))
        .route("/queue", get(get_queue))
        .route("/sessions", get(get_sessions))
        .route("/sessions/progress", get(get_session_progress))
        .route("/history", get(get_history))
        .route("/escalated", get(get_escalated))
        .route("/tokens", post(admit_token))
        .route("/tokens/:id/approve", post(approve_token))
        .route("/tokens/:id/reschedule", post(reschedule_token))
        .route("/sessions/:id/finalize", post(finalize_session))
        .route("/sessions/:id/escalate", post(escalate_session))
        .route("/protocol", get(get_protocol).put(put_protocol))
        .route("/doctors/:name/expected-duration", put(put_expected_duration))
        .route("/blood/requests", get(get_blood_requests).post(post_blood_request))
        .route("/blood/requests/:id/acknowledge", post(acknowledge_blood))
        .route("/blood/requests/:id/decline", post(decline_blood))
        .route("/blood/requests/:id/fulfill", post(fulfill_blood))
        .route("/blood/history", get(get_blood_history))
}
