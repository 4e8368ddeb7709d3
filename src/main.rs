mod common;
mod console;
mod entity;
mod session;
use common::setting::Settings;
use common::logger::init_logger;
use common::http::HttpClient;
use session::client::{DeviceSessionClient, SessionConfig};
use session::http_api::HttpDeviceApi;
use session::serial_link::NativePortOpener;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use dotenv::dotenv;


fn main() -> Result<(), Box<dyn Error>> {
    // 检查 env 文件
    dotenv().ok();

    // 加载 config
    let settings = Settings::get();

    // 设置 logger
    init_logger()?;
    log::info!("配置已加载，环境: {:?}", settings.env.env);
    log::debug!("配置: {:?}", settings);

    let http = HttpClient::new(
        settings.upstream.base_url.as_str(),
        Duration::from_secs(settings.upstream.timeout_secs),
    )?;
    log::info!("后端地址: {}", http.base_url());
    let client = Arc::new(DeviceSessionClient::new(
        Box::new(HttpDeviceApi::new(http)),
        Box::new(NativePortOpener),
        SessionConfig::from_settings(settings),
    ));

    // 单线程运行时，所有操作在 I/O 处让出
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(console::runner::run(client))?;

    Ok(())
}
