//! networking module
//! function:
//! - 处理远程服务器错误：如果远程返回非 2xx，那么返回 TransportFailure
//! - 保证输出均为 json value

use std::time::Duration;
use serde_json::Value;
use super::error::{ClientError, ErrorCode};
use crate::trace;

const LOG_TAG: &str = "http-common-module";

/// thin json wrapper around one reqwest client and one base url
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(HttpClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            inner,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, api_url: &str) -> String {
        format!("{}/{}", self.base_url, api_url.trim_start_matches('/'))
    }

    /// GET whose body is ignored, only the status code matters
    pub async fn api_probe(&self, api_url: &str) -> Result<(), ClientError> {
        let url = self.url(api_url);
        trace!(LOG_TAG, "GET {}", url);
        let resp = self.inner.get(url.as_str()).send().await?;
        check_status(resp)?;
        Ok(())
    }

    /// wrapper for get api
    pub async fn api_get(&self, api_url: &str) -> Result<Value, ClientError> {
        let url = self.url(api_url);
        trace!(LOG_TAG, "GET {}", url);
        let resp = self.inner.get(url.as_str()).send().await?;
        let res: Value = check_status(resp)?.json().await?;
        trace!(LOG_TAG, "GET {} -> {}", url, res);
        Ok(res)
    }

    /// wrapper for post api
    pub async fn api_post(&self, api_url: &str, data: Value) -> Result<Value, ClientError> {
        let url = self.url(api_url);
        trace!(LOG_TAG, "POST {} {}", url, data);
        let resp = self.inner
            .post(url.as_str())
            .json(&data)
            .send()
            .await?;
        let res: Value = check_status(resp)?.json().await?;
        trace!(LOG_TAG, "POST {} -> {}", url, res);
        Ok(res)
    }
}

/// 检查返回值中的 status 是否成功，不成功则返回错误
fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(ClientError::new(
            ErrorCode::TransportFailure,
            format!("http 请求错误: {} {}", resp.url(), status),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpClient {
        HttpClient::new(&server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_get_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getvalue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": 7})))
            .mount(&server)
            .await;

        let res = client(&server).api_get("/getvalue").await.unwrap();
        assert_eq!(res["value"], 7);
    }

    #[tokio::test]
    async fn test_post_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/change-value"))
            .and(body_json(json!({"newValue": "1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"newValue": "1"})))
            .mount(&server)
            .await;

        let res = client(&server)
            .api_post("change-value", json!({"newValue": "1"}))
            .await
            .unwrap();
        assert_eq!(res["newValue"], "1");
    }

    #[tokio::test]
    async fn test_non_2xx_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/connect"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).api_probe("/connect").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TransportFailure);
    }

    #[tokio::test]
    async fn test_invalid_json_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/onToggle"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).api_get("/onToggle").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TransportFailure);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpClient::new("http://device.local/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/connect"), "http://device.local/connect");
        assert_eq!(client.base_url(), "http://device.local");
    }
}
