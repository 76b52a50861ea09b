//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the user-service handlers
//! - Wire up middleware (timeout, admission, tracing)
//! - Serve on a bound listener until told to stop
//! - Expose the running server to the shutdown orchestrator as a [`Transport`]

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::app::{AppError, RegisterUser, RegisterUserInput, RegisterUserOutput};
use crate::config::AppConfig;
use crate::http::middleware::admission_middleware;
use crate::lifecycle::shutdown::Transport;
use crate::lifecycle::tracker::RequestTracker;

/// Path of the registration call.
pub const REGISTER_USER_PATH: &str = "/user.v1.UserService/RegisterUser";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub register_user: RegisterUser,
}

/// HTTP server for the user service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &AppConfig, state: AppState, tracker: RequestTracker) -> Self {
        let router = Self::build_router(config, state, tracker);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Admission sits outside the timeout so a timed-out call still ends its
    /// tracking entry.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState, tracker: RequestTracker) -> Router {
        Router::new()
            .route(REGISTER_USER_PATH, post(register_user))
            .route("/healthz", get(healthz))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(middleware::from_fn_with_state(tracker, admission_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `signal` resolves and every accepted connection has closed.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve in a background task.
    pub fn spawn(self, listener: TcpListener) -> io::Result<ServerHandle> {
        let local_addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(self.serve(listener, async move {
            let _ = stop_rx.await;
        }));

        Ok(ServerHandle {
            stop: Some(stop_tx),
            task,
            local_addr,
        })
    }
}

/// A server running in a background task.
#[derive(Debug)]
pub struct ServerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<io::Result<()>>,
    local_addr: SocketAddr,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn signal_stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

#[async_trait]
impl Transport for ServerHandle {
    async fn graceful_stop(&mut self) {
        self.signal_stop();
        match (&mut self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "HTTP server exited with error"),
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
        }
    }

    async fn force_stop(&mut self) {
        self.signal_stop();
        self.task.abort();
        let _ = (&mut self.task).await;
        tracing::warn!(address = %self.local_addr, "HTTP server aborted");
    }
}

async fn register_user(
    State(state): State<AppState>,
    Json(input): Json<RegisterUserInput>,
) -> Result<(StatusCode, Json<RegisterUserOutput>), AppError> {
    let output = state.register_user.execute(input).await?;
    Ok((StatusCode::CREATED, Json(output)))
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, Hasher};
    use crate::http::request::X_REQUEST_ID;
    use crate::infra::MemoryUserStore;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct PlainHasher;

    impl Hasher for PlainHasher {
        fn hash(&self, plain: &str) -> Result<String, DomainError> {
            Ok(format!("hashed:{}", plain))
        }

        fn verify(&self, hash: &str, plain: &str) -> Result<bool, DomainError> {
            Ok(hash == format!("hashed:{}", plain))
        }
    }

    fn server(tracker: &RequestTracker) -> HttpServer {
        let store = Arc::new(MemoryUserStore::new(10));
        let state = AppState {
            register_user: RegisterUser::new(store, Arc::new(PlainHasher)),
        };
        HttpServer::new(&AppConfig::default(), state, tracker.clone())
    }

    fn register_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(REGISTER_USER_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn anna() -> Value {
        json!({
            "email": "anna@example.com",
            "public_name": "anna",
            "password": "Sicilian#1",
            "country_code": "NO",
            "language": "en"
        })
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_then_conflict() {
        let tracker = RequestTracker::new();
        let router = server(&tracker).router();

        let response = router.clone().oneshot(register_request(anna())).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key(X_REQUEST_ID));
        assert_eq!(json_body(response).await["message"], "User successfully registered.");

        let response = router.oneshot(register_request(anna())).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["code"], "ALREADY_EXISTS");
        assert!(body["details"]["email"].is_string());
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn invalid_input_is_bad_request() {
        let router = server(&RequestTracker::new()).router();
        let response = router
            .oneshot(register_request(json!({
                "email": "anna",
                "public_name": "anna",
                "password": "Sicilian#1",
                "language": "en"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_ARGUMENT");
        assert!(body["details"]["email"].is_string());
    }

    #[tokio::test]
    async fn health_is_refused_while_shutting_down() {
        let tracker = RequestTracker::new();
        let router = server(&tracker).router();
        let healthz = || Request::builder().uri("/healthz").body(Body::empty()).unwrap();

        let response = router.clone().oneshot(healthz()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        tracker.set_shutting_down(true);
        let response = router.oneshot(healthz()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn spawned_server_stops_gracefully() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut handle = server(&RequestTracker::new()).spawn(listener).unwrap();
        let addr = handle.local_addr();

        tokio::time::timeout(Duration::from_secs(5), handle.graceful_stop())
            .await
            .expect("idle server should stop promptly");
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn force_stop_aborts_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut handle = server(&RequestTracker::new()).spawn(listener).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle.force_stop())
            .await
            .expect("abort should not block");
        assert!(handle.task.is_finished());
    }
}
