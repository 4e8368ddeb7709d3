//! Device session client
//! - 维护连接状态、设备状态、最近一次读取的值
//! - 所有操作先获取会话锁，已有操作执行中则直接返回 Busy
//! - 失败只记录日志并体现在状态上，不向调用方抛出

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use uuid::Uuid;

use super::handshake::run_handshake;
use super::serial_link::SerialLink;
use super::traits::{DeviceApi, PortOpener};
use crate::common::error::{ClientError, ErrorCode};
use crate::common::setting::Settings;
use crate::entity::bo::session_bo::{
    ActionOutcome, ConnectionStatus, ControlState, DeviceState, SessionSnapshot, ValuePolicy,
};
use crate::entity::dto::device_value_dto::{echo_confirms, value_equals, value_field, ChangeValueDto};
use crate::{debug, error, info, warn};

const LOG_TAG: &str = "device_session";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub baud_rate: u32,
    pub handshake_token: String,
    pub handshake_timeout: Duration,
    pub value_policy: ValuePolicy,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        SessionConfig {
            baud_rate: settings.serial.baud_rate,
            handshake_token: settings.serial.handshake_token.clone(),
            handshake_timeout: settings.serial.handshake_timeout(),
            value_policy: settings.session.value_policy,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::from_settings(&Settings::default())
    }
}

struct SessionState {
    status: ConnectionStatus,
    device_state: DeviceState,
    raw_value: Option<Value>,
    serial_port: Option<String>,
}

pub struct DeviceSessionClient {
    api: Box<dyn DeviceApi>,
    opener: Box<dyn PortOpener>,
    config: SessionConfig,
    // never held across an await
    state: Mutex<SessionState>,
    // held for the whole of one action, owns the open serial port
    in_flight: AsyncMutex<Option<SerialLink>>,
}

impl DeviceSessionClient {
    pub fn new(api: Box<dyn DeviceApi>, opener: Box<dyn PortOpener>, config: SessionConfig) -> Self {
        DeviceSessionClient {
            api,
            opener,
            config,
            state: Mutex::new(SessionState {
                status: ConnectionStatus::Idle,
                device_state: DeviceState::Off,
                raw_value: None,
                serial_port: None,
            }),
            in_flight: AsyncMutex::new(None),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            status: state.status,
            device_state: state.device_state,
            controls: ControlState::from(state.device_state),
            raw_value: state.raw_value.clone(),
            value_policy: self.config.value_policy,
            serial_port: state.serial_port.clone(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_status(&self, status: ConnectionStatus) {
        let mut state = self.state();
        debug!(LOG_TAG, "status {:?} -> {:?}", state.status, status);
        state.status = status;
    }

    /// take the session lock, None when another action is running
    fn begin(&self, action: &str) -> Option<(AsyncMutexGuard<'_, Option<SerialLink>>, Uuid)> {
        match self.in_flight.try_lock() {
            Ok(guard) => {
                let token = Uuid::new_v4();
                debug!(LOG_TAG, "{} started, request {}", action, token);
                Some((guard, token))
            }
            Err(_) => {
                let err = ClientError::new(ErrorCode::Busy, format!("{} ignored, another action is in flight", action));
                warn!(LOG_TAG, "{}", err);
                None
            }
        }
    }

    /// close the open serial port, if any, and forget its name
    async fn release_port(&self, port: &mut Option<SerialLink>, reason: &str) {
        if let Some(old) = port.take() {
            info!(LOG_TAG, "closing port {} before {}", old.port_name(), reason);
            self.state().serial_port = None;
            old.close().await;
        }
    }

    /// GET /connect, any failure ends in "Failed to connect"
    /// an open serial port is closed first, the session then runs over http
    pub async fn connect(&self) -> ActionOutcome {
        let Some((mut port, token)) = self.begin("connect") else {
            return ActionOutcome::Busy;
        };
        self.release_port(&mut port, "http connect").await;
        let previous = self.state().status;
        if previous.is_terminal() {
            debug!(LOG_TAG, "connect again after {:?}", previous);
        }
        self.set_status(ConnectionStatus::Connecting);

        match self.api.connect().await {
            Ok(()) => {
                self.set_status(ConnectionStatus::Connected);
                info!(LOG_TAG, "connected to backend, request {}", token);
                ActionOutcome::Done
            }
            Err(e) => {
                error!(LOG_TAG, "connect failed, request {}, err: {}", token, e);
                self.set_status(ConnectionStatus::Failed);
                ActionOutcome::Rejected(e.to_string())
            }
        }
    }

    /// open the chosen port and wait for the handshake token
    /// `selection` is None when the user declined to pick a port
    pub async fn connect_serial(&self, selection: Option<String>) -> ActionOutcome {
        let Some((mut port, token)) = self.begin("connect_serial") else {
            return ActionOutcome::Busy;
        };

        self.release_port(&mut port, "serial reconnect").await;
        self.set_status(ConnectionStatus::Connecting);

        let Some(port_name) = selection else {
            let err = ClientError::new(ErrorCode::UserCancelled, "no serial port selected");
            warn!(LOG_TAG, "{}, request {}", err, token);
            self.set_status(ConnectionStatus::NotConnected);
            return ActionOutcome::Rejected(err.to_string());
        };

        let mut link = match self.opener.open(&port_name, self.config.baud_rate) {
            Ok(link) => link,
            Err(e) => {
                error!(LOG_TAG, "cannot open {}, request {}, err: {}", port_name, token, e);
                self.set_status(ConnectionStatus::Failed);
                return ActionOutcome::Rejected(e.to_string());
            }
        };

        let outcome = run_handshake(&mut link, &self.config.handshake_token, self.config.handshake_timeout).await;
        match outcome.into_error(&self.config.handshake_token, self.config.handshake_timeout) {
            None => {
                info!(LOG_TAG, "device on {} acknowledged, request {}", port_name, token);
                {
                    let mut state = self.state();
                    state.status = ConnectionStatus::Connected;
                    state.serial_port = Some(port_name);
                }
                *port = Some(link);
                ActionOutcome::Done
            }
            Some(e) => {
                error!(LOG_TAG, "handshake on {} failed, request {}, err: {}", port_name, token, e);
                link.close().await;
                self.set_status(ConnectionStatus::NotConnected);
                ActionOutcome::Rejected(e.to_string())
            }
        }
    }

    pub async fn toggle_on(&self) -> ActionOutcome {
        self.toggle_to(DeviceState::On).await
    }

    pub async fn toggle_off(&self) -> ActionOutcome {
        self.toggle_to(DeviceState::Off).await
    }

    /// state changes only when the response `value` confirms it
    async fn toggle_to(&self, target: DeviceState) -> ActionOutcome {
        let action = match target {
            DeviceState::On => "toggle_on",
            DeviceState::Off => "toggle_off",
        };
        let Some((_guard, token)) = self.begin(action) else {
            return ActionOutcome::Busy;
        };

        let controls = ControlState::from(self.state().device_state);
        let enabled = match target {
            DeviceState::On => controls.on_enabled,
            DeviceState::Off => controls.off_enabled,
        };
        if !enabled {
            warn!(LOG_TAG, "{} ignored, device is already {}", action, target);
            return ActionOutcome::Rejected(format!("{} control is disabled", target));
        }

        let resp = match target {
            DeviceState::On => self.api.on_toggle().await,
            DeviceState::Off => self.api.off_toggle().await,
        };
        let body = match resp {
            Ok(body) => body,
            Err(e) => {
                error!(LOG_TAG, "{} failed, request {}, err: {}", action, token, e);
                return ActionOutcome::Rejected(e.to_string());
            }
        };

        match value_field(&body) {
            Some(v) if value_equals(v, target.wire_value()) => {
                self.state().device_state = target;
                info!(LOG_TAG, "device confirmed {}, request {}", target, token);
                ActionOutcome::Done
            }
            _ => {
                let err = ClientError::new(
                    ErrorCode::UnexpectedValue,
                    format!("{} expected value {}, got {}", action, target.wire_value(), body),
                );
                warn!(LOG_TAG, "{}, request {}", err, token);
                ActionOutcome::Rejected(err.to_string())
            }
        }
    }

    /// POST /change-value with the complement of the current state
    pub async fn toggle_value(&self) -> ActionOutcome {
        let Some((_guard, token)) = self.begin("toggle_value") else {
            return ActionOutcome::Busy;
        };

        let target = self.state().device_state.flipped();
        let body = ChangeValueDto::new(target.wire_value());
        let echo = match self.api.change_value(body).await {
            Ok(echo) => echo,
            Err(e) => {
                error!(LOG_TAG, "toggle_value failed, request {}, err: {}", token, e);
                return ActionOutcome::Rejected(e.to_string());
            }
        };
        debug!(LOG_TAG, "change-value echo: {}", echo);

        let accepted = match self.config.value_policy {
            ValuePolicy::Optimistic => true,
            ValuePolicy::Confirmed => echo_confirms(&echo, target.wire_value()),
        };
        if accepted {
            self.state().device_state = target;
            info!(LOG_TAG, "value set to {}, request {}", target.wire_value(), token);
            ActionOutcome::Done
        } else {
            let err = ClientError::new(
                ErrorCode::UnexpectedValue,
                format!("change-value not confirmed, wanted {}, echo {}", target.wire_value(), echo),
            );
            warn!(LOG_TAG, "{}, request {}", err, token);
            ActionOutcome::Rejected(err.to_string())
        }
    }

    /// GET /getvalue, keeps the previous value on failure
    pub async fn fetch_value(&self) -> ActionOutcome {
        let Some((_guard, token)) = self.begin("fetch_value") else {
            return ActionOutcome::Busy;
        };

        let body = match self.api.get_value().await {
            Ok(body) => body,
            Err(e) => {
                error!(LOG_TAG, "fetch_value failed, request {}, err: {}", token, e);
                return ActionOutcome::Rejected(e.to_string());
            }
        };

        match value_field(&body) {
            Some(v) => {
                info!(LOG_TAG, "device value {}, request {}", v, token);
                self.state().raw_value = Some(v.clone());
                ActionOutcome::Done
            }
            None => {
                let err = ClientError::new(ErrorCode::UnexpectedValue, format!("no value field in {}", body));
                warn!(LOG_TAG, "{}, request {}", err, token);
                ActionOutcome::Rejected(err.to_string())
            }
        }
    }

    /// close the serial port if any and go back to Idle
    pub async fn disconnect(&self) -> ActionOutcome {
        let Some((mut port, token)) = self.begin("disconnect") else {
            return ActionOutcome::Busy;
        };
        self.release_port(&mut port, "disconnect").await;
        {
            let mut state = self.state();
            state.serial_port = None;
            state.status = ConnectionStatus::Idle;
        }
        info!(LOG_TAG, "session disconnected, request {}", token);
        ActionOutcome::Done
    }
}
