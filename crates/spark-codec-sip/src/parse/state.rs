//! 解析状态枚举。
//!
//! 状态按报文结构自左向右排列：请求行、行尾、头部、消息体。行尾相关的三个状态
//! 在请求行与头部之间共享。

use crate::error::SipParseError;

/// 允许百分号转义的 URI 片段，转义结束后回到对应状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment {
    /// `@` 或 `:` 出现前的首段，可能是用户名也可能是主机。
    UserOrHost,
    /// 首段 `:` 之后的片段，可能是密码也可能是端口。
    PasswordOrPort,
    ParamKey,
    ParamValue,
}

impl Segment {
    pub(crate) fn state(self) -> State {
        match self {
            Self::UserOrHost => State::UriUserOrHost,
            Self::PasswordOrPort => State::UriPasswordOrPort,
            Self::ParamKey => State::ParamKey,
            Self::ParamValue => State::ParamValue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Method,
    UriScheme,
    UriUserOrHost,
    UriPasswordOrPort,
    UriHost,
    UriPort,
    ParamKey,
    ParamValue,
    /// 已读 `%`，等待高位十六进制数字。
    PercentHigh(Segment),
    /// 已读高位，等待低位十六进制数字。
    PercentLow(Segment),
    /// 等待 `S`。
    Proto,
    /// 等待 `I`。
    ProtoS,
    /// 等待 `P`。
    ProtoSI,
    /// 等待 `/`。
    ProtoSIP,
    ProtoVersion,
    /// 行内已读 CR，等待 LF。
    LineCR,
    /// 新行开始：空行结束头部，否则进入头部名称。
    LineStart,
    /// 空行已读 CR，等待 LF。
    BlankLineCR,
    HeaderKey,
    /// 冒号后的空白。
    HeaderColon,
    HeaderValue,
    ContentLength,
    /// 数字之后的空白，只允许继续空白或行尾。
    ContentLengthTrailing,
    Body,
    Complete,
    Failed(SipParseError),
}

impl State {
    /// 该状态消费的字节是否计入请求行长度。
    pub(crate) fn in_request_line(self) -> bool {
        matches!(
            self,
            Self::Method
                | Self::UriScheme
                | Self::UriUserOrHost
                | Self::UriPasswordOrPort
                | Self::UriHost
                | Self::UriPort
                | Self::ParamKey
                | Self::ParamValue
                | Self::PercentHigh(_)
                | Self::PercentLow(_)
                | Self::Proto
                | Self::ProtoS
                | Self::ProtoSI
                | Self::ProtoSIP
                | Self::ProtoVersion
        )
    }
}
