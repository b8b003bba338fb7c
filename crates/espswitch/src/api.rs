use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::accessory::EspSwitch;
use crate::hap::CharacteristicKind;
use crate::hap::HapError;
use crate::hap::MemoryRegistry;
use crate::hap::MemoryService;
use crate::hap::ServiceKind;
use crate::hap::ServiceSnapshot;
use crate::hap::Value;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
    accessory: String,
}

/// Body of GET and PUT /v1/switch
#[derive(Debug, Serialize, Deserialize)]
struct SwitchBody {
    on: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    version: &'static str,
    accessory: Arc<EspSwitch>,
    registry: Arc<MemoryRegistry>,
}

impl AppState {
    pub fn new(accessory: Arc<EspSwitch>, registry: Arc<MemoryRegistry>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            accessory,
            registry,
        }
    }

    fn switch_service(&self) -> Result<Arc<MemoryService>, ApiError> {
        self.registry
            .service(ServiceKind::Switch)
            .ok_or(ApiError::MissingService(ServiceKind::Switch))
    }
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("{0:?} service is not registered")]
    MissingService(ServiceKind),

    #[error(transparent)]
    Hap(#[from] HapError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Hap(HapError::InvalidValue { .. }) | ApiError::Hap(HapError::ReadOnly(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Hap(HapError::Gone) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!("API request failed: {}", self);

        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
            accessory: state.accessory.name().to_string(),
        }),
    )
}

/// Handler for GET /v1/switch
#[tracing::instrument(skip(state))]
async fn get_switch(State(state): State<AppState>) -> Result<Json<SwitchBody>, ApiError> {
    let value = state.switch_service()?.read(CharacteristicKind::On)?;
    let on = value.as_bool().ok_or(HapError::InvalidValue {
        characteristic: CharacteristicKind::On,
        expected: "boolean",
        got: value.clone(),
    })?;
    Ok(Json(SwitchBody { on }))
}

/// Handler for PUT /v1/switch
#[tracing::instrument(skip(state))]
async fn put_switch(
    State(state): State<AppState>,
    Json(body): Json<SwitchBody>,
) -> Result<StatusCode, ApiError> {
    state
        .switch_service()?
        .write(CharacteristicKind::On, Value::Bool(body.on))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /v1/identify
#[tracing::instrument(skip(state))]
async fn identify(State(state): State<AppState>) -> StatusCode {
    state.accessory.identify();
    StatusCode::NO_CONTENT
}

/// Handler for GET /v1/services
#[tracing::instrument(skip(state))]
async fn services(State(state): State<AppState>) -> Json<Vec<ServiceSnapshot>> {
    Json(
        state
            .registry
            .services()
            .iter()
            .map(|s| s.snapshot())
            .collect(),
    )
}

/// Create the API router with all endpoints
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/switch", get(get_switch).put(put_switch))
        .route("/v1/identify", post(identify))
        .route("/v1/services", get(services))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// Binds to `listen:port` and serves until `shutdown_rx` fires or its sender
/// is dropped.
pub async fn serve(
    listen: String,
    port: u16,
    state: AppState,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Method;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AccessoryConfig;
    use crate::device::DeviceRequest;
    use crate::device::MockDeviceClient;

    fn setup() -> (Router, Arc<MockDeviceClient>, Arc<EspSwitch>) {
        let client = Arc::new(MockDeviceClient::new());
        let registry = Arc::new(MemoryRegistry::new());
        let accessory = Arc::new(
            EspSwitch::new(
                &AccessoryConfig::new("Relay", "10.0.0.5"),
                registry.as_ref(),
                client.clone(),
            )
            .unwrap(),
        );
        let router = create_router(AppState::new(accessory.clone(), registry));
        (router, client, accessory)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn put_switch_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri("/v1/switch")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let (router, _client, _accessory) = setup();

        let response = router
            .oneshot(Request::get("/v1/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_info() {
        let (router, _client, _accessory) = setup();

        let response = router
            .oneshot(Request::get("/v1/info").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["accessory"], "Relay");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_get_switch_initially_off() {
        let (router, _client, _accessory) = setup();

        let response = router
            .oneshot(Request::get("/v1/switch").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"on": false}));
    }

    #[tokio::test]
    async fn test_put_switch_is_optimistic() {
        let (router, client, accessory) = setup();
        client.push_ok(json!({"on": true}));

        let response = router
            .clone()
            .oneshot(put_switch_request(r#"{"on": true}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(accessory.is_on());

        let response = router
            .oneshot(Request::get("/v1/switch").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!({"on": true}));

        // Background write
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let issued: Vec<_> = client.requests().into_iter().map(|(r, _)| r).collect();
        assert_eq!(issued, vec![DeviceRequest::TurnOn]);
    }

    #[tokio::test]
    async fn test_put_switch_rejects_bad_body() {
        let (router, _client, accessory) = setup();

        let response = router
            .oneshot(put_switch_request(r#"{"on": "yes"}"#))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert!(!accessory.is_on());
    }

    #[tokio::test]
    async fn test_identify() {
        let (router, _client, _accessory) = setup();

        let response = router
            .oneshot(
                Request::post("/v1/identify")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_services() {
        let (router, _client, _accessory) = setup();

        let response = router
            .oneshot(Request::get("/v1/services").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["kind"], "Switch");
        assert_eq!(body[0]["characteristics"]["On"], false);
        assert_eq!(body[1]["kind"], "AccessoryInformation");
        assert_eq!(body[1]["characteristics"]["Model"], "ESP-01S");
    }
}
