use std::fmt;

use serde::Serialize;

/// Kinds of service an accessory can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ServiceKind {
    Switch,
    AccessoryInformation,
}

impl ServiceKind {
    /// Characteristics a service of this kind carries.
    pub fn characteristics(self) -> &'static [CharacteristicKind] {
        match self {
            ServiceKind::Switch => &[CharacteristicKind::Name, CharacteristicKind::On],
            ServiceKind::AccessoryInformation => &[
                CharacteristicKind::Name,
                CharacteristicKind::Manufacturer,
                CharacteristicKind::Model,
                CharacteristicKind::SerialNumber,
                CharacteristicKind::FirmwareRevision,
                CharacteristicKind::ConfiguredName,
            ],
        }
    }

    pub fn supports(self, characteristic: CharacteristicKind) -> bool {
        self.characteristics().contains(&characteristic)
    }
}

/// Individual attributes of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CharacteristicKind {
    Name,
    On,
    Manufacturer,
    Model,
    SerialNumber,
    FirmwareRevision,
    ConfiguredName,
}

impl CharacteristicKind {
    /// Whether controllers may assign this characteristic.
    pub fn is_writable(self) -> bool {
        matches!(self, CharacteristicKind::On)
    }
}

/// A characteristic value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    String(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Bool(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_characteristics() {
        assert!(ServiceKind::Switch.supports(CharacteristicKind::On));
        assert!(ServiceKind::Switch.supports(CharacteristicKind::Name));
        assert!(!ServiceKind::Switch.supports(CharacteristicKind::Model));
    }

    #[test]
    fn test_information_characteristics() {
        let info = ServiceKind::AccessoryInformation;
        assert!(info.supports(CharacteristicKind::Manufacturer));
        assert!(info.supports(CharacteristicKind::ConfiguredName));
        assert!(!info.supports(CharacteristicKind::On));
    }

    #[test]
    fn test_only_on_is_writable() {
        assert!(CharacteristicKind::On.is_writable());
        assert!(!CharacteristicKind::Name.is_writable());
        assert!(!CharacteristicKind::SerialNumber.is_writable());
    }

    #[test]
    fn test_value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(
            serde_json::to_string(&Value::from("ESP-01S")).unwrap(),
            "\"ESP-01S\""
        );
    }
}
