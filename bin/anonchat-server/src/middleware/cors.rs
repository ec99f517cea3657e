use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;

pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    // Wildcard when nothing usable is configured; set ANONCHAT_CORS_ORIGINS
    // to lock the API down to the page's own origin.
    let layer = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_with_and_without_origins() {
        let _ = cors_layer(&Config::default());
        let config = Config {
            cors_allowed_origins: Some("http://localhost:8080, https://chat.example".into()),
            ..Config::default()
        };
        let _ = cors_layer(&config);
    }
}
