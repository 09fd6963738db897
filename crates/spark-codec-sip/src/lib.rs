#![warn(missing_docs)]

//! # spark-codec-sip
//!
//! ## 教案目的（Why）
//! - **定位**：该 crate 负责把 SIP 请求从字节流增量解析为结构化对象，是 spark 平台信令面的入口。
//! - **架构角色**：传输层每收到一块数据就调用一次解析器，解析器跨调用保留进度，
//!   直到请求完整或被拒绝；被拒绝时给出可直接回写给对端的状态码。
//! - **资源模型**：请求对象、字节 arena 与值列表池在同一连接上复用，稳态下不再触发堆分配。
//!
//! ## 交互契约（What）
//! - **输入前提**：请求行形如 `METHOD SP URI SP SIP/version`，行尾接受 CRLF 或单独的 LF；
//! - **输出能力**：
//!   - 方法、URI（scheme、用户、密码、主机、端口、参数）与协议；
//!   - 头部名称大小写不敏感的多值映射；
//!   - 按 `Content-Length` 收取的消息体；
//! - **上限**：所有长度与数量上限由 [`Settings`] 给出，可从 TOML 加载。
//!
//! ## 实现策略（How）
//! - **模块划分**：
//!   1. `types`：请求模型与借用视图；
//!   2. `headers`：头部与 URI 参数共用的多值存储；
//!   3. `parse`：状态机解析器；
//!   4. `settings`：上限与预分配配置；
//!   5. `error`/`status`：错误枚举与状态码映射。
//! - **关键技巧**：字段以句柄引用 arena，读取经由借用视图，视图不可能跨越 `release`。
//!
//! ## 风险提示（Trade-offs）
//! - **功能边界**：不解析响应，不解析具体头部的内部语法，不处理头部折行；
//! - **维护建议**：新增上限时需同步 [`Settings::validate`] 与错误映射。

pub mod error;
pub mod headers;
pub mod parse;
pub mod settings;
pub mod status;
pub mod types;

pub use crate::error::{ErrorClass, FieldWriteError, SipParseError};
pub use crate::headers::{Fields, FieldsMut, HeaderStore, ValuePool, Values};
pub use crate::parse::{ParseStatus, RequestParser};
pub use crate::settings::{
    BodySettings, HeaderSettings, RequestLineSettings, Settings, SettingsError,
};
pub use crate::status::StatusCode;
pub use crate::types::{Method, Protocol, Request, Text, Uri};
