//! 会话状态实体类（由 DeviceSessionClient 维护，console 只读）

use std::fmt::{self, Display, Formatter};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    NotConnected,
    Failed,
}

impl ConnectionStatus {
    /// a connect attempt has finished, one way or the other
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionStatus::Connected | ConnectionStatus::NotConnected | ConnectionStatus::Failed)
    }
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Idle => "Idle",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::NotConnected => "Not Connected",
            ConnectionStatus::Failed => "Failed to connect",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    On,
    Off,
}

impl DeviceState {
    /// value the device reports for this state
    pub fn wire_value(&self) -> u8 {
        match self {
            DeviceState::On => 1,
            DeviceState::Off => 0,
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            DeviceState::On => DeviceState::Off,
            DeviceState::Off => DeviceState::On,
        }
    }
}

impl Display for DeviceState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            DeviceState::On => f.write_str("ON"),
            DeviceState::Off => f.write_str("OFF"),
        }
    }
}

/// enabled flags of the two toggle controls, derived from the device state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub on_enabled: bool,
    pub off_enabled: bool,
}

impl From<DeviceState> for ControlState {
    fn from(state: DeviceState) -> Self {
        ControlState {
            on_enabled: state == DeviceState::Off,
            off_enabled: state == DeviceState::On,
        }
    }
}

/// how `toggle_value` treats the echoed response of `/change-value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuePolicy {
    /// flip as soon as the request returns, body is not inspected
    #[default]
    Optimistic,
    /// flip only when the echo carries the requested value
    Confirmed,
}

/// result of one user action, for the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    Rejected(String),
    Busy,
}

/// immutable copy of everything the view renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub device_state: DeviceState,
    pub controls: ControlState,
    pub raw_value: Option<Value>,
    pub value_policy: ValuePolicy,
    pub serial_port: Option<String>,
}

impl SessionSnapshot {
    /// raw value as shown on screen, strings without their quotes
    pub fn display_value(&self) -> String {
        match &self.raw_value {
            None => "-".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_strings() {
        assert_eq!(ConnectionStatus::Failed.to_string(), "Failed to connect");
        assert_eq!(ConnectionStatus::NotConnected.to_string(), "Not Connected");
        assert_eq!(ConnectionStatus::Connecting.to_string(), "Connecting...");
        assert!(!ConnectionStatus::Idle.is_terminal());
        assert!(!ConnectionStatus::Connecting.is_terminal());
        assert!(ConnectionStatus::Failed.is_terminal());
    }

    #[test]
    fn test_controls_never_both_enabled() {
        for state in [DeviceState::On, DeviceState::Off] {
            let controls = ControlState::from(state);
            assert!(controls.on_enabled != controls.off_enabled);
        }
        assert!(ControlState::from(DeviceState::Off).on_enabled);
    }

    #[test]
    fn test_display_value() {
        let mut snapshot = SessionSnapshot {
            status: ConnectionStatus::Idle,
            device_state: DeviceState::Off,
            controls: DeviceState::Off.into(),
            raw_value: None,
            value_policy: ValuePolicy::Optimistic,
            serial_port: None,
        };
        assert_eq!(snapshot.display_value(), "-");
        snapshot.raw_value = Some(json!(7));
        assert_eq!(snapshot.display_value(), "7");
        snapshot.raw_value = Some(json!("1"));
        assert_eq!(snapshot.display_value(), "1");
    }
}
