//! setting config file
//! - `ENV` selects `config_{ENV}.toml`, default 'dev'
//! - missing or broken file falls back to built-in defaults

use std::{fs::File, io::Read, time::Duration};
use lazy_static::lazy_static;
use serde_derive::Deserialize;
use std::env;

use crate::entity::bo::session_bo::ValuePolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Env {
    pub debug: bool,
    pub env: String,
    pub log_level: String,
}

impl Default for Env {
    fn default() -> Self {
        Env {
            debug: false,
            env: "dev".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// the cloud backend serving the toggle endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Upstream {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for Upstream {
    fn default() -> Self {
        Upstream {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Serial {
    pub baud_rate: u32,
    pub handshake_token: String,
    pub handshake_timeout_secs: u64,
}

impl Default for Serial {
    fn default() -> Self {
        Serial {
            baud_rate: 9600,
            handshake_token: "ESP32_OK".to_string(),
            handshake_timeout_secs: 10,
        }
    }
}

impl Serial {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Session {
    pub value_policy: ValuePolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub env: Env,
    pub upstream: Upstream,
    pub serial: Serial,
    pub session: Session,
}

impl Settings {
    pub fn get<'a>() -> &'a Self {
        // 给静态变量延迟赋值的宏
        lazy_static! {
            static ref CACHE: Settings = Settings::load();
        }
        &CACHE
    }

    /// read `config_{ENV}.toml` from the working directory
    fn load() -> Self {
        let env = match env::var("ENV") {
            Ok(e) => e,
            Err(_) => {
                log::warn!("no ENV set, use default: 'dev'");
                String::from("dev")
            }
        };

        let file_path: String = format!("config_{}.toml", env);

        let mut file = match File::open(file_path.as_str()) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("no such file {}, use default settings, err: {}", file_path, e);
                return Settings::default();
            }
        };

        let mut str_val = String::new();
        if let Err(e) = file.read_to_string(&mut str_val) {
            eprintln!("cannot read config file {}, use default settings, err: {}", file_path, e);
            return Settings::default();
        }

        Settings::from_toml(&str_val).unwrap_or_else(|e| {
            eprintln!("config file {} format invalid, use default settings, err: {}", file_path, e);
            Settings::default()
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
