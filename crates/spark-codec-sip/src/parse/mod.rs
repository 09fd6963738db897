//! 解析模块入口。
//!
//! ## 模块目标（Why）
//! - 面向流式传输提供可恢复的请求解析：字节块在任意位置切分，结果都与整包输入一致。
//!
//! ## 结构概览（What）
//! - [`RequestParser`]：状态机本体，负责请求行、头部与消息体；
//! - [`ParseStatus`]：一次 `parse` 调用的结果；
//! - 内部模块 `state` 定义状态枚举，`request` 实现各状态的转移。

mod request;
mod state;

pub use request::RequestParser;

/// 一次 `parse` 调用后的进度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// 需要更多字节。
    Incomplete,
    /// 请求已完整，可读取结果。
    Complete,
}
