mod routes;
mod types;

use crate::http::routes::*;
use crate::relay::Relay;
use crate::verifier::WebhookVerifier;
use axum::http::{HeaderName, HeaderValue};
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct HttpState {
    pub relay: Relay,
    pub verifier: WebhookVerifier,
}

pub fn create_app(relay: Relay, verifier: WebhookVerifier) -> axum::Router {
    axum::Router::new()
        .route("/", get(home))
        .route("/webhook", get(webhook_verify).post(webhook_receive))
        .route("/sys/version", get(sys_version))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-version"),
                    HeaderValue::from_static(crate::VERSION),
                )),
        )
        .with_state(HttpState { relay, verifier })
}
