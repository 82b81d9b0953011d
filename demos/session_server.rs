#![allow(
    clippy::print_stdout,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown
)]

//! Session server example with file-backed sessions.
//!
//! Sessions are written under `SESSION_STORE_DIR` and survive restarts.
//! Without a `.env`, the development preset is used.
//!
//! Run with: `cargo run --example session_server`
//!
//! Test endpoints:
//!   curl -c jar -X POST http://localhost:8080/api/login \
//!     -H "Content-Type: application/json" \
//!     -d '{"email": "ama@example.com", "displayName": "Ama"}'
//!
//!   curl -b jar http://localhost:8080/api/profile
//!   curl -b jar http://localhost:8080/api/check-auth
//!   curl -b jar -X POST http://localhost:8080/api/logout

use std::time::Duration;

use axum::Json;
use axum::routing::post;
use datasell_session::api::MessageResponse;
use datasell_session::api::axum::{
    SessionContext, SessionHandle, session_cors, session_routes, with_session_layer,
};
use datasell_session::{AppConfig, FileKeyValueStore, SessionStore, SessionUser};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const PRUNE_INTERVAL_SECS: u64 = 15 * 60;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    email: String,
    display_name: String,
}

/// Stand-in for real credential checks: any email logs in.
async fn login(session: SessionHandle, Json(body): Json<LoginRequest>) -> Json<MessageResponse> {
    session.establish(SessionUser {
        uid: body.email.clone(),
        email: body.email,
        display_name: body.display_name,
        is_admin: false,
    });
    Json(MessageResponse::ok("Logged in"))
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        log::warn!(target: "session_server", "msg=\"using development preset\" error=\"{e}\"");
        AppConfig::development()
    });

    let backend = FileKeyValueStore::new(&config.store_dir).expect("store directory");
    let store = SessionStore::new(backend);

    let sweeper = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(PRUNE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.prune_expired().await {
                log::error!(target: "session_server", "msg=\"session prune failed\" error=\"{e}\"");
            }
        }
    });

    let ctx = SessionContext::new(store, config.session.clone());
    let routes = session_routes::<FileKeyValueStore>().route("/api/login", post(login));
    let app = with_session_layer(routes, ctx)
        .layer(session_cors(&["localhost:3000", "localhost:8080"]));

    println!("Starting session server on http://localhost:8080");
    println!("Sessions stored in {}", config.store_dir.display());
    println!("Endpoints:");
    println!("  POST /api/login      - Start a session (demo only)");
    println!("  GET  /api/check-auth - Session status");
    println!("  GET  /api/profile    - Current user (requires session)");
    println!("  POST /api/logout     - End the session");

    let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .unwrap();
}
