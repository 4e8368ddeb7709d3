//! device endpoints on the cloud backend

use async_trait::async_trait;
use serde_json::Value;

use super::traits::DeviceApi;
use crate::common::error::{ClientError, ErrorCode};
use crate::common::http::HttpClient;
use crate::entity::dto::device_value_dto::ChangeValueDto;

const CONNECT_URL: &str = "/connect";
const ON_TOGGLE_URL: &str = "/onToggle";
const OFF_TOGGLE_URL: &str = "/offToggle";
const GET_VALUE_URL: &str = "/getvalue";
const CHANGE_VALUE_URL: &str = "/change-value";

pub struct HttpDeviceApi {
    http: HttpClient,
}

impl HttpDeviceApi {
    pub fn new(http: HttpClient) -> Self {
        HttpDeviceApi { http }
    }
}

#[async_trait]
impl DeviceApi for HttpDeviceApi {
    async fn connect(&self) -> Result<(), ClientError> {
        self.http.api_probe(CONNECT_URL).await
    }

    async fn on_toggle(&self) -> Result<Value, ClientError> {
        self.http.api_get(ON_TOGGLE_URL).await
    }

    async fn off_toggle(&self) -> Result<Value, ClientError> {
        self.http.api_get(OFF_TOGGLE_URL).await
    }

    async fn get_value(&self) -> Result<Value, ClientError> {
        self.http.api_get(GET_VALUE_URL).await
    }

    async fn change_value(&self, body: ChangeValueDto) -> Result<Value, ClientError> {
        let data = serde_json::to_value(body)
            .map_err(|e| ClientError::new(ErrorCode::TransportFailure, format!("cannot encode change-value body: {}", e)))?;
        self.http.api_post(CHANGE_VALUE_URL, data).await
    }
}
