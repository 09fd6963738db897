//! SIP 状态码。
//!
//! 解析失败需要映射为可直接回写给对端的状态码：标准码沿用 RFC 3261 §21，
//! 解析器专用的细分失败使用 520–529 私有区间，方便运维从响应中直接区分原因。

use core::fmt;

/// SIP 状态码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 400 Bad Request。
    pub const BAD_REQUEST: Self = Self(400);
    /// 413 Request Entity Too Large。
    pub const REQUEST_ENTITY_TOO_LARGE: Self = Self(413);
    /// 414 Request-URI Too Long。
    pub const REQUEST_URI_TOO_LONG: Self = Self(414);
    /// 500 Server Internal Error。
    pub const SERVER_INTERNAL_ERROR: Self = Self(500);
    /// 501 Not Implemented。
    pub const NOT_IMPLEMENTED: Self = Self(501);
    /// 505 Version Not Supported。
    pub const VERSION_NOT_SUPPORTED: Self = Self(505);
    /// 513 Message Too Large。
    pub const MESSAGE_TOO_LARGE: Self = Self(513);
    /// 520：请求行或 URI 超出上限。
    pub const URI_TOO_LONG: Self = Self(520);
    /// 521：URI 百分号解码失败。
    pub const URI_DECODING: Self = Self(521);
    /// 522：协议名不是 `SIP`。
    pub const UNSUPPORTED_PROTOCOL: Self = Self(522);
    /// 523：头部数量超出上限。
    pub const TOO_MANY_HEADERS: Self = Self(523);
    /// 524：头部名称或值超出上限。
    pub const HEADER_FIELDS_TOO_LARGE: Self = Self(524);
    /// 525：方法名超出上限。
    pub const METHOD_NOT_IMPLEMENTED: Self = Self(525);

    /// 由数值构造；只接受 100–699。
    pub const fn from_u16(code: u16) -> Option<Self> {
        if code >= 100 && code <= 699 {
            Some(Self(code))
        } else {
            None
        }
    }

    /// 数值。
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// 是否落在解析器专用的 520–529 区间。
    pub const fn is_parser_specific(self) -> bool {
        self.0 >= 520 && self.0 <= 529
    }

    /// 已知状态码的原因短语。
    pub fn reason_phrase(self) -> Option<&'static str> {
        let phrase = match self.0 {
            400 => "Bad Request",
            413 => "Request Entity Too Large",
            414 => "Request-URI Too Long",
            500 => "Server Internal Error",
            501 => "Not Implemented",
            505 => "Version Not Supported",
            513 => "Message Too Large",
            520 => "URI Too Long",
            521 => "URI Decoding Failed",
            522 => "Unsupported Protocol",
            523 => "Too Many Headers",
            524 => "Header Fields Too Large",
            525 => "Method Not Implemented",
            _ => return None,
        };
        Some(phrase)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason_phrase() {
            Some(phrase) => write!(f, "{} {}", self.0, phrase),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_code_and_reason() {
        assert_eq!(StatusCode::BAD_REQUEST.to_string(), "400 Bad Request");
        assert_eq!(StatusCode::from_u16(599).map(|c| c.to_string()), Some("599".into()));
    }

    #[test]
    fn private_range_is_flagged() {
        assert!(StatusCode::URI_DECODING.is_parser_specific());
        assert!(!StatusCode::REQUEST_ENTITY_TOO_LARGE.is_parser_specific());
        assert_eq!(StatusCode::from_u16(99), None);
        assert_eq!(u16::from(StatusCode::TOO_MANY_HEADERS), 523);
    }
}
