//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the catch-all gateway handler
//! - Wire up middleware (request ID, tracing, concurrency limit)
//! - Bind the server to a listener with peer-address info
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::gateway::Gateway;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: ListenerConfig,
}

impl HttpServer {
    pub fn new(config: ListenerConfig, gateway: Arc<Gateway>) -> Self {
        let router = Self::build_router(&config, AppState { gateway });
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Every method and path is forwarded, including `/`.
    pub fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(GlobalConcurrencyLimitLayer::new(config.max_connections)),
            )
    }

    /// The fully layered router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_connections = self.config.max_connections,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }
}

async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.gateway.handle(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use crate::gateway::{Dispatcher, GatewayError, OutboundRequest, SecretMap, UpstreamResponse};
    use async_trait::async_trait;
    use axum::http::{HeaderMap, StatusCode};
    use tower::ServiceExt;

    struct EchoPath;

    #[async_trait]
    impl Dispatcher for EchoPath {
        async fn dispatch(&self, request: OutboundRequest) -> Result<UpstreamResponse, GatewayError> {
            let body = bytes::Bytes::from(request.url.to_string());
            Ok(UpstreamResponse::from_chunks(StatusCode::OK, HeaderMap::new(), vec![body]))
        }
    }

    fn router() -> Router {
        let secrets: SecretMap = [("API_EXAMPLE_COM_API_KEY", "k")].into_iter().collect();
        let gateway = Gateway::new(
            Arc::new(secrets),
            Arc::new(EchoPath),
            None,
            &UpstreamConfig::default(),
        );
        HttpServer::new(ListenerConfig::default(), Arc::new(gateway)).router()
    }

    #[tokio::test]
    async fn test_root_and_nested_paths_are_forwarded() {
        for (path, expected) in [
            ("/", "https://api.example.com/"),
            ("/a/b/c?x=1", "https://api.example.com/a/b/c?x=1"),
        ] {
            let response = router()
                .oneshot(
                    Request::builder()
                        .method("DELETE")
                        .uri(path)
                        .header("x-gateway-service-host", "api.example.com")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(body, expected);
        }
    }

    #[tokio::test]
    async fn test_request_id_is_set_and_echoed() {
        let response = router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
