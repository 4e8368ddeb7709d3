//! 控制台界面
//! - 将用户输入解析为命令
//! - 命令交给 DeviceSessionClient 执行
//! - 渲染会话状态

pub mod command;
pub mod runner;
pub mod view;
