use anyhow::Result;
use axum::{
    extract::Extension,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use chat_core::ChatContext;
use chat_messaging::MessagingService;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing;

use crate::handlers;

fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    match origins {
        Some(origins) => {
            let origin_list: Vec<HeaderValue> = origins
                .split(',')
                .map(|s| s.trim())
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect();
            cors.allow_origin(origin_list)
        }
        None => cors.allow_origin(Any),
    }
}

pub fn router(ctx: ChatContext) -> Router {
    let server = &ctx.config.server;
    let templates = &server.templates_dir;

    if server.cors_origins.is_none() {
        tracing::warn!("CORS_ORIGINS not set, allowing any origin");
    }
    let cors = cors_layer(server.cors_origins.as_deref());
    let service = MessagingService::new(ctx.clone());

    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/search-users", post(handlers::search_users))
        .route("/send-message", post(handlers::send_message))
        .route("/get-messages", get(handlers::get_messages))
        .route("/get-all-messages", get(handlers::get_all_messages))
        .route("/get-recent-chats", get(handlers::get_recent_chats))
        .route("/mark-messages-read", post(handlers::mark_messages_read))
        .route("/goto-dashboard", get(handlers::goto_dashboard))
        .route_service("/", ServeFile::new(templates.join("index.html")))
        .route_service("/dashboard", ServeFile::new(templates.join("dashboard.html")))
        .route_service("/redirect", ServeFile::new(templates.join("redirect.html")))
        .route_service("/test", ServeFile::new(server.static_dir.join("test.html")))
        .nest_service("/static", ServeDir::new(&server.static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(Extension(service))
                .layer(Extension(ctx.clone())),
        )
}

pub async fn run(ctx: ChatContext) -> Result<()> {
    let host = ctx.config.server.host.clone();
    let api_port = ctx.config.server.api_port;
    let app = router(ctx);

    let listener = tokio::net::TcpListener::bind((host.as_str(), api_port)).await?;
    tracing::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
