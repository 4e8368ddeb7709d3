use async_trait::async_trait;
use serde_json::Value;

use super::serial_link::SerialLink;
use crate::common::error::ClientError;
use crate::entity::dto::device_value_dto::ChangeValueDto;

/// the remote endpoints that drive the device
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// only the status code matters
    async fn connect(&self) -> Result<(), ClientError>;

    async fn on_toggle(&self) -> Result<Value, ClientError>;

    async fn off_toggle(&self) -> Result<Value, ClientError>;

    async fn get_value(&self) -> Result<Value, ClientError>;

    /// returns the echoed object as is
    async fn change_value(&self, body: ChangeValueDto) -> Result<Value, ClientError>;
}

/// opens the serial port the user picked
pub trait PortOpener: Send + Sync {
    fn open(&self, port_name: &str, baud_rate: u32) -> Result<SerialLink, ClientError>;
}
