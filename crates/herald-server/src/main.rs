use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use herald_api::{AppState, AppStateInner, admin, events, messages, reactions, search};
use herald_api::principal::PrincipalCache;
use herald_core::feed::FeedEngine;
use herald_core::notify::{LogSink, NotificationSink};
use herald_core::reactions::ReactionEngine;
use herald_core::search::SearchEngine;
use herald_gateway::Dispatcher;
use herald_types::config::ConfigHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let session_secret =
        std::env::var("HERALD_SESSION_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("HERALD_DB_PATH").unwrap_or_else(|_| "herald.db".into());
    let host = std::env::var("HERALD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("HERALD_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init store
    let store = Arc::new(herald_store::Store::open(&PathBuf::from(&db_path))?);

    // Shared state: the settings layer swaps snapshots through this handle
    let config = ConfigHandle::default();
    let dispatcher = Dispatcher::new();
    let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);

    let state: AppState = Arc::new(AppStateInner {
        feed: FeedEngine::new(
            store.clone(),
            config.clone(),
            dispatcher.clone(),
            sink.clone(),
        ),
        reactions: ReactionEngine::new(store.clone(), config.clone(), dispatcher.clone()),
        search: SearchEngine::new(store.clone(), config.clone()),
        store,
        config,
        dispatcher,
        principals: PrincipalCache::new(),
        session_secret,
    });

    // Routes
    let app = Router::new()
        .route(
            "/api/messages",
            get(messages::get_feed).post(messages::create_message),
        )
        .route(
            "/api/messages/{id}",
            put(messages::edit_message).delete(messages::delete_message),
        )
        .route("/api/messages/{id}/thread", get(messages::get_thread))
        .route("/api/search", post(search::search_messages))
        .route("/api/reactions", post(reactions::set_reaction))
        .route("/api/events", get(events::stream_events))
        .route("/api/users", get(admin::get_users).put(admin::set_users))
        .route("/api/version", get(herald_api::version))
        .layer(from_fn_with_state(
            state.clone(),
            herald_api::middleware::resolve_capabilities,
        ))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Herald server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
