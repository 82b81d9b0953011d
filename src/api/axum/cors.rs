//! CORS for browser clients that send the session cookie cross-origin.

use std::time::Duration;

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Credentialed CORS limited to the given domains and their subdomains.
///
/// Entries are bare hosts, optionally with a port (`datasell.store`,
/// `localhost:3000`). An origin matches when its host equals an entry or
/// ends with `.` followed by one.
pub fn session_cors(allowed_domains: &[&str]) -> CorsLayer {
    let domains: Vec<String> = allowed_domains
        .iter()
        .map(|d| d.to_ascii_lowercase())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| origin_allowed(origin, &domains))
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

fn origin_allowed(origin: &str, domains: &[String]) -> bool {
    let Some((_, host)) = origin.split_once("://") else {
        return false;
    };
    let host = host.trim_end_matches('/').to_ascii_lowercase();

    domains.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains() -> Vec<String> {
        vec!["datasell.store".to_owned(), "localhost:3000".to_owned()]
    }

    #[test]
    fn test_exact_and_subdomain_match() {
        assert!(origin_allowed("https://datasell.store", &domains()));
        assert!(origin_allowed("https://www.datasell.store", &domains()));
        assert!(origin_allowed("http://localhost:3000", &domains()));
    }

    #[test]
    fn test_lookalike_hosts_rejected() {
        assert!(!origin_allowed("https://evildatasell.store", &domains()));
        assert!(!origin_allowed("https://datasell.store.attacker.io", &domains()));
        assert!(!origin_allowed("http://localhost:3001", &domains()));
        assert!(!origin_allowed("datasell.store", &domains()));
    }
}
