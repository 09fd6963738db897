//! 解析器配置。
//!
//! ## 模块目的（Why）
//! - 每一项上限都是对抗恶意或停滞发送方的防线，必须显式可调，而不是散落在代码里的常量；
//! - 配置可从 TOML 文档加载，缺省字段回落到默认值，未知字段直接拒绝，防止拼写错误被静默忽略。
//!
//! ## 使用契约（What）
//! - 所有 `max_*` 字段必须大于零，由 [`Settings::validate`] 校验；
//! - `*_prealloc` 只影响首次分配，不构成上限。

use serde::Deserialize;
use thiserror::Error;

/// 解析器全部上限与预分配参数。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// 请求行相关上限。
    pub request_line: RequestLineSettings,
    /// 头部相关上限。
    pub headers: HeaderSettings,
    /// 消息体相关上限。
    pub body: BodySettings,
}

/// 请求行配置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestLineSettings {
    /// 请求行总字节数上限，同时作为请求行 arena 的容量。
    pub max_length: usize,
    /// 方法名字节数上限。
    pub max_method_length: usize,
    /// 请求行 arena 的预分配字节数。
    pub buffer_prealloc: usize,
}

impl Default for RequestLineSettings {
    fn default() -> Self {
        Self {
            max_length: 65535,
            max_method_length: 32,
            buffer_prealloc: 1024,
        }
    }
}

/// 头部配置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderSettings {
    /// 头部行数上限。
    pub max_number: usize,
    /// 单个头部名称字节数上限。
    pub max_key_length: usize,
    /// 单个头部值字节数上限。
    pub max_value_length: usize,
    /// 头部名称 arena 容量。
    pub key_arena_capacity: usize,
    /// 头部值 arena 容量。
    pub value_arena_capacity: usize,
    /// 两块头部 arena 的预分配字节数。
    pub buffer_prealloc: usize,
    /// 值列表池保留的空闲列表上限。
    pub max_idle_value_lists: usize,
}

impl Default for HeaderSettings {
    fn default() -> Self {
        Self {
            max_number: 200,
            max_key_length: 32768,
            max_value_length: 131070,
            key_arena_capacity: 65535,
            value_arena_capacity: 262140,
            buffer_prealloc: 1024,
            max_idle_value_lists: 64,
        }
    }
}

/// 消息体配置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BodySettings {
    /// `Content-Length` 允许的最大值。
    pub max_length: usize,
    /// 消息体缓冲的预分配字节数。
    pub buffer_prealloc: usize,
}

impl Default for BodySettings {
    fn default() -> Self {
        Self {
            max_length: 2_147_483_647,
            buffer_prealloc: 1024,
        }
    }
}

/// 配置加载或校验失败。
#[derive(Debug, Error)]
pub enum SettingsError {
    /// TOML 文档无法解析或包含未知字段。
    #[error("invalid settings document: {0}")]
    Parse(#[from] toml::de::Error),
    /// 某个上限为零。
    #[error("`{field}` must be greater than zero")]
    ZeroLimit {
        /// 字段路径，例如 `headers.max_number`。
        field: &'static str,
    },
}

impl Settings {
    /// 从 TOML 文本加载并校验。
    pub fn from_toml_str(document: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(document)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 校验所有上限均大于零。
    pub fn validate(&self) -> Result<(), SettingsError> {
        let limits = [
            ("request_line.max_length", self.request_line.max_length),
            (
                "request_line.max_method_length",
                self.request_line.max_method_length,
            ),
            ("headers.max_number", self.headers.max_number),
            ("headers.max_key_length", self.headers.max_key_length),
            ("headers.max_value_length", self.headers.max_value_length),
            ("headers.key_arena_capacity", self.headers.key_arena_capacity),
            ("headers.value_arena_capacity", self.headers.value_arena_capacity),
            ("body.max_length", self.body.max_length),
        ];
        match limits.iter().find(|(_, value)| *value == 0) {
            Some(&(field, _)) => Err(SettingsError::ZeroLimit { field }),
            None => Ok(()),
        }
    }
}
