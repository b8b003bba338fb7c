//! In-process implementation of the framework boundary.
//!
//! Holds characteristic values in memory and dispatches controller reads and
//! writes to subscribed handlers. The daemon serves it over the local HTTP API;
//! tests use it to drive an accessory without a real bridge.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::characteristic::CharacteristicKind;
use super::characteristic::ServiceKind;
use super::characteristic::Value;
use super::registry::CharacteristicHandler;
use super::registry::HapError;
use super::registry::Registry;
use super::registry::Service;

/// Capacity of the update notification channel
const UPDATE_CHANNEL_SIZE: usize = 64;

/// An externally pushed characteristic value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicUpdate {
    pub service: ServiceKind,
    pub characteristic: CharacteristicKind,
    pub value: Value,
}

/// Serializable view of a service and its current values.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSnapshot {
    pub kind: ServiceKind,
    pub name: String,
    pub characteristics: BTreeMap<CharacteristicKind, Value>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MemoryService {
    kind: ServiceKind,
    display_name: String,
    values: Mutex<BTreeMap<CharacteristicKind, Value>>,
    handlers: Mutex<BTreeMap<CharacteristicKind, Arc<dyn CharacteristicHandler>>>,
    updates: broadcast::Sender<CharacteristicUpdate>,
}

impl MemoryService {
    fn new(
        kind: ServiceKind,
        display_name: &str,
        updates: broadcast::Sender<CharacteristicUpdate>,
    ) -> Self {
        Self {
            kind,
            display_name: display_name.to_string(),
            values: Mutex::new(BTreeMap::new()),
            handlers: Mutex::new(BTreeMap::new()),
            updates,
        }
    }

    fn check(&self, characteristic: CharacteristicKind) -> Result<(), HapError> {
        if self.kind.supports(characteristic) {
            Ok(())
        } else {
            Err(HapError::Unsupported {
                service: self.kind,
                characteristic,
            })
        }
    }

    fn handler(&self, characteristic: CharacteristicKind) -> Option<Arc<dyn CharacteristicHandler>> {
        lock(&self.handlers).get(&characteristic).cloned()
    }

    /// The stored value, without consulting any handler.
    pub fn value(&self, characteristic: CharacteristicKind) -> Option<Value> {
        lock(&self.values).get(&characteristic).cloned()
    }

    /// Serve a controller read.
    ///
    /// A subscribed handler answers and its answer becomes the stored value;
    /// otherwise the stored value is returned.
    pub fn read(&self, characteristic: CharacteristicKind) -> Result<Value, HapError> {
        self.check(characteristic)?;

        match self.handler(characteristic) {
            Some(handler) => {
                let value = handler.on_get()?;
                lock(&self.values).insert(characteristic, value.clone());
                Ok(value)
            }
            None => self
                .value(characteristic)
                .ok_or(HapError::NoValue(characteristic)),
        }
    }

    /// Serve a controller write. The value is stored once the handler
    /// acknowledges it.
    pub fn write(&self, characteristic: CharacteristicKind, value: Value) -> Result<(), HapError> {
        self.check(characteristic)?;
        if !characteristic.is_writable() {
            return Err(HapError::ReadOnly(characteristic));
        }

        if let Some(handler) = self.handler(characteristic) {
            handler.on_set(value.clone())?;
        }
        lock(&self.values).insert(characteristic, value);
        Ok(())
    }

    pub fn snapshot(&self) -> ServiceSnapshot {
        ServiceSnapshot {
            kind: self.kind,
            name: self.display_name.clone(),
            characteristics: lock(&self.values).clone(),
        }
    }
}

impl Service for MemoryService {
    fn kind(&self) -> ServiceKind {
        self.kind
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn set_value(&self, characteristic: CharacteristicKind, value: Value) -> Result<(), HapError> {
        self.check(characteristic)?;
        lock(&self.values).insert(characteristic, value);
        Ok(())
    }

    fn update_characteristic(
        &self,
        characteristic: CharacteristicKind,
        value: Value,
    ) -> Result<(), HapError> {
        self.check(characteristic)?;
        lock(&self.values).insert(characteristic, value.clone());

        // No receivers is fine; nobody is watching.
        let _ = self.updates.send(CharacteristicUpdate {
            service: self.kind,
            characteristic,
            value,
        });
        Ok(())
    }

    fn subscribe(
        &self,
        characteristic: CharacteristicKind,
        handler: Arc<dyn CharacteristicHandler>,
    ) -> Result<(), HapError> {
        self.check(characteristic)?;
        lock(&self.handlers).insert(characteristic, handler);
        debug!(
            "Handler subscribed to {:?}.{:?}",
            self.kind, characteristic
        );
        Ok(())
    }
}

/// Registry that keeps every created service in memory, in creation order.
pub struct MemoryRegistry {
    services: Mutex<Vec<Arc<MemoryService>>>,
    updates: broadcast::Sender<CharacteristicUpdate>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_SIZE);
        Self {
            services: Mutex::new(Vec::new()),
            updates,
        }
    }

    /// First service of the given kind.
    pub fn service(&self, kind: ServiceKind) -> Option<Arc<MemoryService>> {
        lock(&self.services)
            .iter()
            .find(|s| s.kind == kind)
            .cloned()
    }

    pub fn services(&self) -> Vec<Arc<MemoryService>> {
        lock(&self.services).clone()
    }

    /// Receive every value pushed through `update_characteristic`.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<CharacteristicUpdate> {
        self.updates.subscribe()
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for MemoryRegistry {
    fn create_service(&self, kind: ServiceKind, display_name: &str) -> Arc<dyn Service> {
        let service = Arc::new(MemoryService::new(
            kind,
            display_name,
            self.updates.clone(),
        ));
        lock(&self.services).push(service.clone());
        service
    }
}
