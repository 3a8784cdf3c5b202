pub mod auth;
pub mod posts;

use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::config::CorsConfig;
use crate::state::AppState;

/// Build the full application router.
///
/// Post routes sit behind the auth gate; `route_layer` keeps unknown paths
/// answering 404 rather than 401.
pub fn app(state: AppState) -> Router {
    let protected = posts::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_auth,
    ));

    let app = Router::new()
        .merge(auth::router())
        .merge(protected)
        .layer(TraceLayer::new_for_http());

    let app = match cors_layer(&state.config.cors) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    app.with_state(state)
}

fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    // Credentialed requests cannot use wildcards, so everything is listed.
    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_disabled_without_origins() {
        assert!(cors_layer(&CorsConfig::default()).is_none());
    }

    #[test]
    fn cors_enabled_for_valid_origins() {
        let config = CorsConfig {
            allowed_origins: vec!["http://localhost:5173".into()],
        };
        assert!(cors_layer(&config).is_some());
    }

    #[test]
    fn invalid_origins_are_skipped() {
        let config = CorsConfig {
            allowed_origins: vec!["bad\norigin".into()],
        };
        assert!(cors_layer(&config).is_none());
    }
}
