//! 实体类
//! - dto: 与远程接口交换的数据
//! - bo: 会话内部状态

pub mod bo;
pub mod dto;
