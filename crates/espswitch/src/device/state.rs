use serde::Serialize;
use tracing::debug;

/// Relay state as reported by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeviceState {
    pub on: bool,
}

impl DeviceState {
    /// Read the state out of a response body.
    ///
    /// The firmware answers `{"on": bool, ...}`. Only `on` is consumed, and a
    /// missing or non-boolean `on` reads as off.
    pub fn from_response(body: &serde_json::Value) -> Self {
        let on = match body.get("on") {
            Some(serde_json::Value::Bool(on)) => *on,
            other => {
                debug!("Response has no boolean \"on\" field ({:?}), reading as off", other);
                false
            }
        };

        Self { on }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_on_true() {
        let state = DeviceState::from_response(&json!({"on": true}));
        assert!(state.on);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let state = DeviceState::from_response(&json!({
            "on": false,
            "uptime": 1234,
            "rssi": -60
        }));
        assert!(!state.on);
    }

    #[test]
    fn test_missing_field_reads_off() {
        assert!(!DeviceState::from_response(&json!({"relay": 1})).on);
        assert!(!DeviceState::from_response(&json!([true])).on);
    }

    #[test]
    fn test_non_boolean_field_reads_off() {
        assert!(!DeviceState::from_response(&json!({"on": "true"})).on);
        assert!(!DeviceState::from_response(&json!({"on": 1})).on);
    }
}
