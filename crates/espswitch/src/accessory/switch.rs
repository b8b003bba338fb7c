use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::handler::OnHandler;
use super::poller::Poller;
use crate::config::AccessoryConfig;
use crate::config::ConfigError;
use crate::device::DeviceClient;
use crate::device::DeviceError;
use crate::device::DeviceRequest;
use crate::device::DeviceState;
use crate::hap::CharacteristicKind;
use crate::hap::HapError;
use crate::hap::Registry;
use crate::hap::Service;
use crate::hap::ServiceKind;
use crate::hap::Value;

pub const MANUFACTURER: &str = "Espressif";
pub const MODEL: &str = "ESP-01S";
pub const SERIAL_NUMBER: &str = "CC-ESP-420-69";
pub const FIRMWARE_REVISION: &str = "4.0";

#[derive(Debug, thiserror::Error)]
pub enum AccessoryError {
    #[error("Invalid accessory configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to register services: {0}")]
    Hap(#[from] HapError),

    #[error("Accessory must be created inside a tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

/// State shared between the accessory, its `On` handler and the poll loop.
pub(super) struct Shared {
    pub(super) name: String,
    pub(super) runtime: Handle,

    /// Last known or last commanded relay state
    switch_on: AtomicBool,

    switch_service: Arc<dyn Service>,
    client: Arc<dyn DeviceClient>,

    /// Sequence number of the most recently issued device request
    issued: AtomicU64,

    /// Sequence number of the newest response applied so far
    applied: AtomicU64,
}

impl Shared {
    /// Read path: answer from the cache, never from the network.
    pub(super) fn current_state(&self) -> bool {
        let on = self.switch_on.load(Ordering::SeqCst);
        info!(
            "[{}] Current state of the switch was returned: {}",
            self.name,
            on_off(on)
        );
        on
    }

    /// Write path: update the cache now and confirm with the device in the
    /// background. A failed confirmation leaves the cache as commanded.
    pub(super) fn command(self: &Arc<Self>, on: bool) {
        info!("[{}] Switch state being set to: {}", self.name, on_off(on));
        self.switch_on.store(on, Ordering::SeqCst);

        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            shared.set_switch_state(on).await;
        });
    }

    /// Query the device and apply its answer. Failures are logged only.
    pub(super) async fn get_switch_state(&self) {
        if let Err(e) = self.send(DeviceRequest::ReadState).await {
            warn!("[{}] Failed to get state: {}", self.name, e);
        }
    }

    /// Drive the device to `on` and apply its answer. Failures are logged only.
    async fn set_switch_state(&self, on: bool) {
        if let Err(e) = self.send(DeviceRequest::switch(on)).await {
            warn!("[{}] Failed to set state: {}", self.name, e);
        }
    }

    async fn send(&self, request: DeviceRequest) -> Result<(), DeviceError> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let response = self.client.request(request).await?;
        self.handle_response(seq, &response);
        Ok(())
    }

    /// Push a device-confirmed state to the cache and to controllers.
    ///
    /// A response older than one already applied is dropped, so overlapping
    /// polls and writes settle on the most recently issued request.
    fn handle_response(&self, seq: u64, response: &serde_json::Value) {
        let newest = self.applied.fetch_max(seq, Ordering::SeqCst);
        if newest > seq {
            debug!(
                "[{}] Discarding stale response #{} (already applied #{})",
                self.name, seq, newest
            );
            return;
        }

        let state = DeviceState::from_response(response);
        self.switch_on.store(state.on, Ordering::SeqCst);

        if let Err(e) = self
            .switch_service
            .update_characteristic(CharacteristicKind::On, Value::Bool(state.on))
        {
            warn!("[{}] Failed to update On characteristic: {}", self.name, e);
        }
    }
}

/// Accessory bridging one ESP-01S relay.
///
/// Exposes a Switch service whose `On` characteristic is answered from a
/// cached state, commands the relay over HTTP when controllers assign `On`, and
/// re-reads the relay on a fixed interval to catch changes made elsewhere.
pub struct EspSwitch {
    shared: Arc<Shared>,
    host: String,
    update_interval: Duration,
    switch_service: Arc<dyn Service>,
    information_service: Arc<dyn Service>,
    poller: Mutex<Option<Poller>>,
}

impl EspSwitch {
    /// Register the accessory's services and schedule the first poll one
    /// interval from now.
    ///
    /// Must be called from within a tokio runtime; the poll loop and
    /// background device writes are spawned onto it.
    pub fn new(
        config: &AccessoryConfig,
        registry: &dyn Registry,
        client: Arc<dyn DeviceClient>,
    ) -> Result<Self, AccessoryError> {
        config.validate()?;
        let runtime = Handle::try_current()?;

        let name = config.name.clone();
        let update_interval = config.effective_update_interval();
        if let Some(requested) = config.update_interval {
            if Duration::from_millis(requested) < update_interval {
                warn!(
                    "[{}] update_interval {}ms is below the minimum, using {}ms",
                    name,
                    requested,
                    update_interval.as_millis()
                );
            }
        }

        let switch_service = registry.create_service(ServiceKind::Switch, &name);
        switch_service.set_value(CharacteristicKind::Name, Value::from(name.as_str()))?;
        switch_service.set_value(CharacteristicKind::On, Value::Bool(false))?;

        let information_service =
            registry.create_service(ServiceKind::AccessoryInformation, &name);
        information_service.set_value(CharacteristicKind::Manufacturer, Value::from(MANUFACTURER))?;
        information_service.set_value(CharacteristicKind::Model, Value::from(MODEL))?;
        information_service.set_value(CharacteristicKind::SerialNumber, Value::from(SERIAL_NUMBER))?;
        information_service
            .set_value(CharacteristicKind::FirmwareRevision, Value::from(FIRMWARE_REVISION))?;
        information_service
            .set_value(CharacteristicKind::ConfiguredName, Value::from(name.as_str()))?;

        let shared = Arc::new(Shared {
            name,
            runtime,
            switch_on: AtomicBool::new(false),
            switch_service: switch_service.clone(),
            client,
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        });

        switch_service.subscribe(
            CharacteristicKind::On,
            Arc::new(OnHandler {
                shared: Arc::downgrade(&shared),
            }),
        )?;

        let poller = Poller::spawn(shared.clone(), update_interval);
        info!(
            "[{}] Accessory ready for {} (polling every {}ms)",
            shared.name,
            config.host,
            update_interval.as_millis()
        );

        Ok(Self {
            shared,
            host: config.host.clone(),
            update_interval,
            switch_service,
            information_service,
            poller: Mutex::new(Some(poller)),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Poll interval in effect, after clamping.
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Cached relay state, without logging or touching the network.
    pub fn is_on(&self) -> bool {
        self.shared.switch_on.load(Ordering::SeqCst)
    }

    /// Services to attach to the accessory: Switch first, then
    /// AccessoryInformation.
    pub fn services(&self) -> [Arc<dyn Service>; 2] {
        [
            self.switch_service.clone(),
            self.information_service.clone(),
        ]
    }

    /// Invoked by the framework while pairing or when a user asks the
    /// accessory to identify itself.
    pub fn identify(&self) {
        info!("[{}] Identify!", self.shared.name);
    }

    /// Poll the device once, outside the regular schedule.
    pub async fn refresh(&self) {
        self.shared.get_switch_state().await;
    }

    /// Stop the poll loop. Once this returns the poller issues no further
    /// requests; background writes already started are left to finish.
    pub async fn shutdown(&self) {
        let poller = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(poller) = poller {
            info!("[{}] Shutting down", self.shared.name);
            poller.stop().await;
        }
    }
}
