use std::sync::Arc;

use super::characteristic::CharacteristicKind;
use super::characteristic::ServiceKind;
use super::characteristic::Value;

/// Errors reported across the framework boundary.
#[derive(Debug, thiserror::Error)]
pub enum HapError {
    #[error("{service:?} has no {characteristic:?} characteristic")]
    Unsupported {
        service: ServiceKind,
        characteristic: CharacteristicKind,
    },

    #[error("{0:?} is read-only")]
    ReadOnly(CharacteristicKind),

    #[error("{characteristic:?} expects a {expected} value, got {got}")]
    InvalidValue {
        characteristic: CharacteristicKind,
        expected: &'static str,
        got: Value,
    },

    #[error("{0:?} has no value")]
    NoValue(CharacteristicKind),

    #[error("accessory is no longer available")]
    Gone,
}

/// Callbacks a service invokes when a controller touches a characteristic.
pub trait CharacteristicHandler: Send + Sync {
    /// A controller asked for the current value.
    fn on_get(&self) -> Result<Value, HapError>;

    /// A controller assigned a new value. Returning `Ok` acknowledges it.
    fn on_set(&self, value: Value) -> Result<(), HapError>;
}

/// A named bundle of characteristics exposed to controllers.
pub trait Service: Send + Sync {
    fn kind(&self) -> ServiceKind;

    fn display_name(&self) -> &str;

    /// Store a value without notifying controllers. Used for static values at
    /// registration time.
    fn set_value(&self, characteristic: CharacteristicKind, value: Value) -> Result<(), HapError>;

    /// Push an externally observed value and notify controllers.
    fn update_characteristic(
        &self,
        characteristic: CharacteristicKind,
        value: Value,
    ) -> Result<(), HapError>;

    /// Route controller reads and writes of `characteristic` to `handler`.
    fn subscribe(
        &self,
        characteristic: CharacteristicKind,
        handler: Arc<dyn CharacteristicHandler>,
    ) -> Result<(), HapError>;
}

/// Constructs services on behalf of an accessory.
pub trait Registry: Send + Sync {
    fn create_service(&self, kind: ServiceKind, display_name: &str) -> Arc<dyn Service>;
}
