use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use super::DeviceError;

/// Requests understood by the relay firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRequest {
    /// `GET /state`
    ReadState,
    /// `POST /state/on`
    TurnOn,
    /// `POST /state/off`
    TurnOff,
}

impl DeviceRequest {
    /// The request that drives the relay to `on`.
    pub fn switch(on: bool) -> Self {
        if on {
            DeviceRequest::TurnOn
        } else {
            DeviceRequest::TurnOff
        }
    }

    /// Path relative to the device root, without a leading slash.
    pub fn path(self) -> &'static str {
        match self {
            DeviceRequest::ReadState => "state",
            DeviceRequest::TurnOn => "state/on",
            DeviceRequest::TurnOff => "state/off",
        }
    }

    pub fn method(self) -> Method {
        match self {
            DeviceRequest::ReadState => Method::GET,
            DeviceRequest::TurnOn | DeviceRequest::TurnOff => Method::POST,
        }
    }
}

/// Trait for device transport operations
///
/// This trait allows for mocking the device for testing purposes
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Issue one request and return the parsed JSON body.
    async fn request(&self, request: DeviceRequest) -> Result<serde_json::Value, DeviceError>;
}

/// Device client speaking plain HTTP to `http://{host}/{path}`.
pub struct HttpDeviceClient {
    host: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpDeviceClient {
    /// Create a client for `host` (`host` or `host:port`). Every request is
    /// bounded by `timeout`.
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self, DeviceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeviceError::Client)?;

        Ok(Self {
            host: host.into(),
            timeout,
            client,
        })
    }

    pub fn url(&self, request: DeviceRequest) -> String {
        format!("http://{}/{}", self.host, request.path())
    }

    fn transport_error(&self, url: String, source: reqwest::Error) -> DeviceError {
        if source.is_timeout() {
            DeviceError::Timeout {
                url,
                after: self.timeout,
            }
        } else {
            DeviceError::Transport { url, source }
        }
    }
}

#[async_trait]
impl DeviceClient for HttpDeviceClient {
    async fn request(&self, request: DeviceRequest) -> Result<serde_json::Value, DeviceError> {
        let url = self.url(request);

        let response = match self
            .client
            .request(request.method(), url.as_str())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.transport_error(url, e)),
        };

        // Status is not inspected; the firmware always answers with its state.
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Err(self.transport_error(url, e)),
        };
        debug!("Received response from {}: {}", url, body);

        serde_json::from_str(&body).map_err(|source| DeviceError::Parse { url, source })
    }
}

/// Mock device client for testing
#[cfg(test)]
#[derive(Default)]
pub struct MockDeviceClient {
    responses: std::sync::Mutex<
        std::collections::VecDeque<(Duration, Result<serde_json::Value, DeviceError>)>,
    >,
    requests: std::sync::Mutex<Vec<(DeviceRequest, tokio::time::Instant)>>,
}

#[cfg(test)]
impl MockDeviceClient {
    /// Create a new mock device client
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response returned immediately
    pub fn push_ok(&self, body: serde_json::Value) {
        self.push_delayed(Duration::ZERO, Ok(body));
    }

    /// Queue a timeout failure returned immediately
    pub fn push_timeout(&self) {
        self.push_delayed(
            Duration::ZERO,
            Err(DeviceError::Timeout {
                url: "http://mock/state".to_string(),
                after: Duration::from_secs(10),
            }),
        );
    }

    /// Queue a response returned after `delay`
    pub fn push_delayed(&self, delay: Duration, response: Result<serde_json::Value, DeviceError>) {
        self.responses
            .lock()
            .unwrap()
            .push_back((delay, response));
    }

    /// Every request issued so far, with the instant it was issued
    pub fn requests(&self) -> Vec<(DeviceRequest, tokio::time::Instant)> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl DeviceClient for MockDeviceClient {
    async fn request(&self, request: DeviceRequest) -> Result<serde_json::Value, DeviceError> {
        self.requests
            .lock()
            .unwrap()
            .push((request, tokio::time::Instant::now()));

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some((delay, response)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                response
            }
            // Nothing scripted behaves like an unreachable device
            None => Err(DeviceError::Timeout {
                url: format!("http://mock/{}", request.path()),
                after: Duration::from_secs(10),
            }),
        }
    }
}
