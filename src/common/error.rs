use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    // 网络不可达，非 2xx，或 json 解析失败
    TransportFailure = 1001,
    // 串口握手超时
    HandshakeTimeout = 1002,
    // 用户取消串口选择
    UserCancelled = 1003,
    // 串口无法打开
    PortOpenFailure = 1004,
    // 设备返回了非预期的值
    UnexpectedValue = 1005,
    // 会话中已有正在执行的操作
    Busy = 1006,
}

#[derive(Debug)]
pub struct ClientError {
    pub code: ErrorCode,
    pub msg: String,
}

impl ClientError {
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        ClientError { code, msg: msg.into() }
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "device client error code: {}, msg: {}", self.code as u16, self.msg)
    }
}

impl Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::new(ErrorCode::TransportFailure, format!("http request error: {}", e))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::new(ErrorCode::TransportFailure, format!("io error: {}", e))
    }
}

impl From<tokio_serial::Error> for ClientError {
    fn from(e: tokio_serial::Error) -> Self {
        ClientError::new(ErrorCode::PortOpenFailure, format!("serial port error: {}", e))
    }
}
