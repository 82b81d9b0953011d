#![allow(clippy::print_stdout, clippy::unwrap_used, clippy::expect_used)]

//! Inactivity timeout from a terminal.
//!
//! Logs in against `session_server`, then treats every line typed on stdin
//! as user activity. `c` continues from the warning, `q` logs out now.
//! Timeouts come from `SESSION_TIMEOUT_MINUTES` / `SESSION_WARNING_MINUTES`.
//!
//! Run with: `cargo run --example timeout_client --features http_client`

use std::io::BufRead;
use std::time::Duration;

use datasell_session::client::HttpSessionClient;
use datasell_session::{
    ActivityEvent, AppConfig, LoginNotice, LogoutReason, TimeoutManager, TimeoutNotifier,
};
use tracing_subscriber::EnvFilter;

struct TerminalNotifier {
    notice: LoginNotice,
}

impl TimeoutNotifier for TerminalNotifier {
    fn on_warning(&self, remaining: Duration) {
        println!(
            "Your session will expire in {} seconds. Type c to stay logged in, q to log out.",
            remaining.as_secs()
        );
    }

    fn on_warning_dismissed(&self) {
        println!("Session extended.");
    }

    fn on_logged_out(&self, _reason: LogoutReason, message: &'static str) {
        self.notice.store(message);
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let base_url =
        std::env::var("SESSION_SERVER_URL").unwrap_or_else(|_| "http://localhost:8080".into());
    let timeout = AppConfig::from_env()
        .unwrap_or_else(|_| AppConfig::development())
        .timeout;

    let client = HttpSessionClient::new(&base_url).expect("http client");
    client
        .http()
        .post(format!("{base_url}/api/login"))
        .json(&serde_json::json!({"email": "demo@example.com", "displayName": "Demo"}))
        .send()
        .await
        .expect("login request");

    let notice = LoginNotice::new();
    let notifier = TerminalNotifier {
        notice: notice.clone(),
    };
    let (manager, handle) = TimeoutManager::new(timeout, client, notifier);

    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let delivered = match line.trim() {
                "c" => handle.continue_session(),
                "q" => handle.logout_now(),
                _ => handle.activity(ActivityEvent::KeyDown),
            };
            if !delivered {
                break;
            }
        }
    });

    let state = manager.run().await;
    println!("Timeout manager finished in state {state:?}");

    // what the login page would show
    if let Some(message) = notice.take() {
        println!("{message}");
    }
}
