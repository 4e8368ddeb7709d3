//! 设备会话模块
//! - 维护连接状态和设备状态
//! - 通过 http 接口或串口与设备通信
//! - 同一时间只允许一个操作

pub mod client;
pub mod handshake;
pub mod http_api;
pub mod serial_link;
pub mod traits;
