//! Tracing setup and request logging.

use crate::config::Environment;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ulid::Ulid;

/// Default log filter when `RUST_LOG` is unset.
#[must_use]
pub fn default_filter(environment: Environment) -> &'static str {
    if environment.is_development() {
        "debug,tower_http=debug"
    } else {
        "info,tower_http=info"
    }
}

/// Installs the global tracing subscriber.
pub fn init_tracing(environment: Environment) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(environment).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Logs one line per request and runs the request inside a span carrying a
/// fresh request id.
pub async fn log_request(request: Request, next: Next) -> Response {
    let request_id = Ulid::new();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = tracing::info_span!("request", %request_id, %method, %path);

    async move {
        let started = Instant::now();
        let response = next.run(request).await;
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Handled request"
        );
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_is_more_verbose() {
        assert_eq!(default_filter(Environment::Development), "debug,tower_http=debug");
        assert_eq!(default_filter(Environment::Production), "info,tower_http=info");
    }
}
