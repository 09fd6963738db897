//! 错误类型模块。
//!
//! ## 模块目的（Why）
//! - 增量解析的失败只有少数几类，但每一类都需要稳定地映射到回写给对端的状态码，
//!   因此错误枚举与 [`StatusCode`] 一一对应，调用方无需自行维护映射表。
//! - [`ErrorClass`] 把失败归为语法错误、资源上限与“可理解但拒绝”三类，便于按类别计数或限流。
//!
//! ## 使用契约（What）
//! - 错误不携带对输入缓冲的引用，可在日志中安全复制；
//! - 解析器进入失败态后会反复返回同一个错误，直到调用方 `release`。

use thiserror::Error;

use crate::status::StatusCode;

/// SIP 请求解析错误。
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SipParseError {
    /// 语法错误：分隔符缺失、数字非法、孤立 CR 等。
    #[error("bad request")]
    BadRequest,
    /// `Content-Length` 超过消息体上限。
    #[error("request entity too large")]
    RequestEntityTooLarge,
    /// 请求行超过长度上限或请求行 arena 写满。
    #[error("request line too long")]
    UriTooLong,
    /// URI 中的百分号转义非法，或解码结果不是 UTF-8。
    #[error("malformed percent-encoding in request URI")]
    UriDecoding,
    /// 协议名不是 `SIP`。
    #[error("unsupported protocol")]
    UnsupportedProtocol,
    /// 头部数量超过上限。
    #[error("too many headers")]
    TooManyHeaders,
    /// 头部名称或值超过长度上限，或头部 arena 写满。
    #[error("header fields too large")]
    HeaderFieldsTooLarge,
    /// 方法名超过长度上限。
    #[error("method not implemented")]
    MethodNotImplemented,
}

impl SipParseError {
    /// 应回写给对端的状态码。
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::RequestEntityTooLarge => StatusCode::REQUEST_ENTITY_TOO_LARGE,
            Self::UriTooLong => StatusCode::URI_TOO_LONG,
            Self::UriDecoding => StatusCode::URI_DECODING,
            Self::UnsupportedProtocol => StatusCode::UNSUPPORTED_PROTOCOL,
            Self::TooManyHeaders => StatusCode::TOO_MANY_HEADERS,
            Self::HeaderFieldsTooLarge => StatusCode::HEADER_FIELDS_TOO_LARGE,
            Self::MethodNotImplemented => StatusCode::METHOD_NOT_IMPLEMENTED,
        }
    }

    /// 错误类别。
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::BadRequest => ErrorClass::Syntax,
            Self::RequestEntityTooLarge
            | Self::UriTooLong
            | Self::TooManyHeaders
            | Self::HeaderFieldsTooLarge => ErrorClass::ResourceLimit,
            Self::UriDecoding | Self::UnsupportedProtocol | Self::MethodNotImplemented => {
                ErrorClass::Rejected
            }
        }
    }
}

/// 解析错误的粗粒度类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// 输入不符合语法。
    Syntax,
    /// 输入超出配置的资源上限。
    ResourceLimit,
    /// 输入可以理解但被拒绝：转义非法、协议或方法不受支持。
    Rejected,
}

/// 手工写入头部或参数失败。
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FieldWriteError {
    /// 目标 arena 剩余容量不足。
    #[error("arena capacity exhausted")]
    ArenaExhausted,
    /// 解析器尚有未封存的字段写在同一 arena 中；请求完成、失败或 `release` 之后再写。
    #[error("a field is still being parsed into the arena")]
    FieldInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_maps_to_its_status() {
        let table = [
            (SipParseError::BadRequest, 400),
            (SipParseError::RequestEntityTooLarge, 413),
            (SipParseError::UriTooLong, 520),
            (SipParseError::UriDecoding, 521),
            (SipParseError::UnsupportedProtocol, 522),
            (SipParseError::TooManyHeaders, 523),
            (SipParseError::HeaderFieldsTooLarge, 524),
            (SipParseError::MethodNotImplemented, 525),
        ];
        for (error, code) in table {
            assert_eq!(error.status().as_u16(), code, "{error}");
        }
    }

    #[test]
    fn classes_group_limits_together() {
        assert_eq!(SipParseError::BadRequest.class(), ErrorClass::Syntax);
        assert_eq!(SipParseError::UriDecoding.class(), ErrorClass::Rejected);
        assert_eq!(SipParseError::TooManyHeaders.class(), ErrorClass::ResourceLimit);
        assert_eq!(SipParseError::UnsupportedProtocol.class(), ErrorClass::Rejected);
    }
}
