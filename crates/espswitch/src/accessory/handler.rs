use std::sync::Weak;

use super::switch::Shared;
use crate::hap::CharacteristicHandler;
use crate::hap::CharacteristicKind;
use crate::hap::HapError;
use crate::hap::Value;

/// Routes controller reads and writes of `On` into the accessory.
///
/// Holds a weak reference: the switch service owns this handler and the
/// accessory owns the service.
pub(super) struct OnHandler {
    pub(super) shared: Weak<Shared>,
}

impl CharacteristicHandler for OnHandler {
    fn on_get(&self) -> Result<Value, HapError> {
        let shared = self.shared.upgrade().ok_or(HapError::Gone)?;
        Ok(Value::Bool(shared.current_state()))
    }

    fn on_set(&self, value: Value) -> Result<(), HapError> {
        let on = value.as_bool().ok_or_else(|| HapError::InvalidValue {
            characteristic: CharacteristicKind::On,
            expected: "boolean",
            got: value.clone(),
        })?;

        let shared = self.shared.upgrade().ok_or(HapError::Gone)?;
        shared.command(on);
        Ok(())
    }
}
