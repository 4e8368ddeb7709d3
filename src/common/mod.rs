pub mod setting;
pub mod logger;
pub mod http;
pub mod error;
