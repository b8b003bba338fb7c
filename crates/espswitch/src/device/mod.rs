//! HTTP/JSON transport to the ESP-01S relay firmware.

mod client;
mod state;

use std::time::Duration;

pub use client::DeviceClient;
pub use client::DeviceRequest;
pub use client::HttpDeviceClient;
#[cfg(test)]
pub use client::MockDeviceClient;
pub use state::DeviceState;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out after {}ms", .after.as_millis())]
    Timeout { url: String, after: Duration },

    #[error("Invalid JSON from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
