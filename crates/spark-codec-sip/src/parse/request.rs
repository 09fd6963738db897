//! 增量请求解析器。
//!
//! ## 教案目的（Why）
//! - 传输层交付的字节块可能在任意位置切断报文，包括 CRLF 中间与百分号转义中间；
//!   解析器因此以显式状态机驱动，每次调用只消费当前块，状态跨调用保留。
//! - 每个字节只被检查一次，字段内容直接写入请求自带的 arena，不做回溯，也不缓存原始块。
//!
//! ## 交互契约（What）
//! - [`RequestParser::parse`] 返回 [`ParseStatus::Incomplete`] 表示需要更多字节，
//!   [`ParseStatus::Complete`] 表示请求已完整；
//! - 失败后解析器停留在失败态，后续调用返回同一错误，直至 [`RequestParser::release`]；
//! - 完成后继续输入的字节被丢弃，不会开始解析下一条请求。
//!
//! ## 实现策略（How）
//! - 请求行逐字节推进，每个字节计入请求行长度；
//! - 头部值与消息体按连续片段批量拷贝，是吞吐的主要来源；
//! - URI 的 userinfo 歧义通过“用户或主机”“密码或端口”两个暂定状态延迟判定：
//!   遇到 `@` 时首段为用户，否则首段降级为主机、次段降级为端口。

use tracing::{debug, trace};

use super::ParseStatus;
use super::state::{Segment, State};
use crate::error::SipParseError;
use crate::headers::ValuePool;
use crate::settings::{Settings, SettingsError};
use crate::types::{Request, Slot, Text};

/// 单条请求的临时解析上下文，`release` 时整体重置。
#[derive(Debug, Default)]
struct Scratch {
    line_len: usize,
    field_len: usize,
    header_count: usize,
    hex_high: u8,
    first: Text,
    first_escaped: bool,
    second_escaped: bool,
    port: u32,
    port_digits: usize,
    param_key: Text,
    header_key: Text,
    key_gap: bool,
    content_length: usize,
    digits: usize,
    content_length_seen: Option<usize>,
    body_remaining: usize,
}

/// 可复用的 SIP 请求解析器。
///
/// # 契约说明（What）
/// - 构造时接管 [`Request`] 与 [`ValuePool`]，二者可通过 [`into_parts`](Self::into_parts) 取回；
/// - 每条请求解析完成（或失败）后调用 [`release`](Self::release)，即可在同一对象上解析下一条，
///   arena、消息体缓冲与值列表均保留容量；
/// - 解析结果经由 [`request`](Self::request) 借用读取。
///
/// # 风险提示（Trade-offs）
/// - 解析器不是线程安全的共享对象，应按连接独占使用。
#[derive(Debug)]
pub struct RequestParser {
    request: Request,
    pool: ValuePool,
    settings: Settings,
    state: State,
    scratch: Scratch,
}

impl RequestParser {
    /// 以调用方提供的请求、值列表池与配置构造解析器。
    ///
    /// `request` 的 arena 容量应与 `settings` 一致，通常由 [`Request::with_settings`] 创建。
    ///
    /// # 前置条件
    /// - `settings` 应已通过 [`Settings::validate`]：任何上限为零都会让每条请求以对应的
    ///   上限错误失败（例如方法名上限为零时一律返回 525）。需要构造时校验请使用
    ///   [`try_with_settings`](Self::try_with_settings)。
    pub fn new(request: Request, pool: ValuePool, settings: Settings) -> Self {
        Self {
            request,
            pool,
            settings,
            state: State::Method,
            scratch: Scratch::default(),
        }
    }

    /// 按配置创建请求与值列表池；前置条件同 [`new`](Self::new)。
    pub fn with_settings(settings: Settings) -> Self {
        let request = Request::with_settings(&settings);
        let pool = ValuePool::new(settings.headers.max_idle_value_lists, 2);
        Self::new(request, pool, settings)
    }

    /// 先校验配置，再按配置创建解析器。
    pub fn try_with_settings(settings: Settings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self::with_settings(settings))
    }

    /// 输入一个字节块。
    ///
    /// 空块不改变任何状态。
    pub fn parse(&mut self, chunk: &[u8]) -> Result<ParseStatus, SipParseError> {
        match self.state {
            State::Failed(error) => return Err(error),
            State::Complete => {
                discard(chunk.len());
                return Ok(ParseStatus::Complete);
            }
            _ => {}
        }

        let mut data = chunk;
        while !data.is_empty() {
            match self.advance(data) {
                Ok(consumed) => data = &data[consumed..],
                Err(error) => return Err(self.fail(error)),
            }
            if self.state == State::Complete {
                trace!(
                    method = self.request.method(),
                    headers = self.request.headers.len(),
                    content_length = self.request.content_length,
                    "request complete"
                );
                discard(data.len());
                return Ok(ParseStatus::Complete);
            }
        }
        Ok(ParseStatus::Incomplete)
    }

    /// 重置解析器与请求，准备解析下一条请求。
    pub fn release(&mut self) {
        self.request.reset(&mut self.pool);
        self.state = State::Method;
        self.scratch = Scratch::default();
    }

    /// 当前请求。
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// 当前请求的可变引用，用于在解析完成后补写头部或参数。
    ///
    /// 解析进行中（[`ParseStatus::Incomplete`]）写入可能得到
    /// [`FieldWriteError::FieldInProgress`](crate::FieldWriteError::FieldInProgress)；
    /// 完成、失败或 `release` 之后写入只受 arena 剩余容量约束。
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// 值列表池，主要用于读取复用统计。
    pub fn pool(&self) -> &ValuePool {
        &self.pool
    }

    /// 生效配置。
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// 请求是否已完整。
    pub fn is_complete(&self) -> bool {
        self.state == State::Complete
    }

    /// 取回请求与值列表池。
    pub fn into_parts(self) -> (Request, ValuePool) {
        (self.request, self.pool)
    }

    fn fail(&mut self, error: SipParseError) -> SipParseError {
        debug!(
            state = ?self.state,
            status = error.status().as_u16(),
            %error,
            "request rejected"
        );
        self.request.arenas.discard_pending();
        self.state = State::Failed(error);
        error
    }

    /// 处理 `data` 的前缀并返回消费的字节数；返回 0 时状态必然已切换。
    fn advance(&mut self, data: &[u8]) -> Result<usize, SipParseError> {
        let Some(&byte) = data.first() else {
            return Ok(0);
        };
        if self.state.in_request_line() {
            self.scratch.line_len += 1;
            if self.scratch.line_len > self.settings.request_line.max_length {
                return Err(SipParseError::UriTooLong);
            }
        }

        match self.state {
            State::Method => self.method(byte),
            State::UriScheme => self.uri_scheme(byte),
            State::UriUserOrHost => self.uri_user_or_host(byte),
            State::UriPasswordOrPort => self.uri_password_or_port(byte),
            State::UriHost => self.uri_host(byte),
            State::UriPort => self.uri_port(byte),
            State::ParamKey => self.param_key(byte),
            State::ParamValue => self.param_value(byte),
            State::PercentHigh(segment) => {
                self.scratch.hex_high = hex_value(byte).ok_or(SipParseError::UriDecoding)? << 4;
                self.state = State::PercentLow(segment);
                Ok(1)
            }
            State::PercentLow(segment) => {
                let low = hex_value(byte).ok_or(SipParseError::UriDecoding)?;
                self.push_line(self.scratch.hex_high | low)?;
                self.state = segment.state();
                Ok(1)
            }
            State::Proto => self.proto_literal(byte, b'S', State::ProtoS),
            State::ProtoS => self.proto_literal(byte, b'I', State::ProtoSI),
            State::ProtoSI => self.proto_literal(byte, b'P', State::ProtoSIP),
            State::ProtoSIP => {
                self.scratch.field_len = 0;
                self.proto_literal(byte, b'/', State::ProtoVersion)
            }
            State::ProtoVersion => self.proto_version(byte),
            State::LineCR => match byte {
                b'\n' => {
                    self.state = State::LineStart;
                    Ok(1)
                }
                _ => Err(SipParseError::BadRequest),
            },
            State::LineStart => match byte {
                b'\r' => {
                    self.state = State::BlankLineCR;
                    Ok(1)
                }
                b'\n' => self.end_of_headers(),
                _ => {
                    self.state = State::HeaderKey;
                    self.scratch.field_len = 0;
                    self.scratch.key_gap = false;
                    Ok(0)
                }
            },
            State::BlankLineCR => match byte {
                b'\n' => self.end_of_headers(),
                _ => Err(SipParseError::BadRequest),
            },
            State::HeaderKey => self.header_key(byte),
            State::HeaderColon => match byte {
                b' ' | b'\t' => Ok(1),
                _ => {
                    self.state = State::HeaderValue;
                    self.scratch.field_len = 0;
                    Ok(0)
                }
            },
            State::HeaderValue => self.header_value(data),
            State::ContentLength => self.content_length(byte),
            State::ContentLengthTrailing => match byte {
                b' ' | b'\t' => Ok(1),
                b'\r' | b'\n' => self.finish_content_length(byte),
                _ => Err(SipParseError::BadRequest),
            },
            State::Body => Ok(self.body(data)),
            State::Complete => Ok(data.len()),
            State::Failed(error) => Err(error),
        }
    }

    fn method(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b' ' => {
                if self.scratch.field_len == 0 {
                    return Err(SipParseError::BadRequest);
                }
                self.request.method = self.seal_line(SipParseError::BadRequest)?;
                self.scratch.field_len = 0;
                self.state = State::UriScheme;
            }
            b'\r' | b'\n' | b'\t' => return Err(SipParseError::BadRequest),
            _ => {
                self.scratch.field_len += 1;
                if self.scratch.field_len > self.settings.request_line.max_method_length {
                    return Err(SipParseError::MethodNotImplemented);
                }
                self.push_line(byte)?;
            }
        }
        Ok(1)
    }

    fn uri_scheme(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b':' => {
                if self.pending_line_is_empty() {
                    return Err(SipParseError::BadRequest);
                }
                self.request.uri.scheme = self.seal_line(SipParseError::UriDecoding)?;
                self.scratch.first_escaped = false;
                self.state = State::UriUserOrHost;
            }
            b' ' | b'\t' | b'\r' | b'\n' | b'@' | b';' | b'%' => {
                return Err(SipParseError::BadRequest);
            }
            _ => self.push_line(byte)?,
        }
        Ok(1)
    }

    fn uri_user_or_host(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b'@' => {
                self.request.uri.user = Some(self.seal_line(SipParseError::UriDecoding)?);
                self.state = State::UriHost;
            }
            b':' => {
                self.scratch.first = self.seal_line(SipParseError::UriDecoding)?;
                self.scratch.second_escaped = false;
                self.state = State::UriPasswordOrPort;
            }
            b';' | b' ' => {
                if self.scratch.first_escaped {
                    return Err(SipParseError::BadRequest);
                }
                self.seal_host()?;
                self.state = after_host(byte);
            }
            b'%' => {
                self.scratch.first_escaped = true;
                self.state = State::PercentHigh(Segment::UserOrHost);
            }
            b'\t' | b'\r' | b'\n' => return Err(SipParseError::BadRequest),
            _ => self.push_line(byte)?,
        }
        Ok(1)
    }

    fn uri_password_or_port(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b'@' => {
                self.request.uri.user = Some(self.scratch.first);
                self.request.uri.password = Some(self.seal_line(SipParseError::UriDecoding)?);
                self.state = State::UriHost;
            }
            b';' | b' ' => {
                let host = self.scratch.first;
                if self.scratch.first_escaped || host.is_empty() {
                    return Err(SipParseError::BadRequest);
                }
                self.request.uri.host = host;
                self.request.uri.port = Some(self.demoted_port()?);
                self.state = after_host(byte);
            }
            b'%' => {
                self.scratch.second_escaped = true;
                self.state = State::PercentHigh(Segment::PasswordOrPort);
            }
            b'\t' | b'\r' | b'\n' => return Err(SipParseError::BadRequest),
            _ => self.push_line(byte)?,
        }
        Ok(1)
    }

    fn uri_host(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b':' => {
                self.seal_host()?;
                self.scratch.port = 0;
                self.scratch.port_digits = 0;
                self.state = State::UriPort;
            }
            b';' | b' ' => {
                self.seal_host()?;
                self.state = after_host(byte);
            }
            b'%' | b'@' | b'\t' | b'\r' | b'\n' => return Err(SipParseError::BadRequest),
            _ => self.push_line(byte)?,
        }
        Ok(1)
    }

    fn uri_port(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b'0'..=b'9' => {
                self.scratch.port = self.scratch.port * 10 + u32::from(byte - b'0');
                if self.scratch.port > u32::from(u16::MAX) {
                    return Err(SipParseError::BadRequest);
                }
                self.scratch.port_digits += 1;
            }
            b';' | b' ' => {
                if self.scratch.port_digits == 0 {
                    return Err(SipParseError::BadRequest);
                }
                let port =
                    u16::try_from(self.scratch.port).map_err(|_| SipParseError::BadRequest)?;
                self.request.uri.port = Some(port);
                self.state = after_host(byte);
            }
            _ => return Err(SipParseError::BadRequest),
        }
        Ok(1)
    }

    fn param_key(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b'=' => {
                if self.pending_line_is_empty() {
                    return Err(SipParseError::BadRequest);
                }
                self.scratch.param_key = self.seal_line(SipParseError::UriDecoding)?;
                self.state = State::ParamValue;
            }
            b';' | b' ' => {
                // `;;` 与末尾多余的 `;` 不产生参数。
                if !self.pending_line_is_empty() {
                    let key = self.seal_line(SipParseError::UriDecoding)?;
                    let value = self.seal_line(SipParseError::UriDecoding)?;
                    self.add_param(key, value);
                }
                self.state = after_host(byte);
            }
            b'%' => self.state = State::PercentHigh(Segment::ParamKey),
            b'+' => self.push_line(b' ')?,
            b'\t' | b'\r' | b'\n' => return Err(SipParseError::BadRequest),
            _ => self.push_line(byte)?,
        }
        Ok(1)
    }

    fn param_value(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b';' | b' ' => {
                let value = self.seal_line(SipParseError::UriDecoding)?;
                self.add_param(self.scratch.param_key, value);
                self.state = after_host(byte);
            }
            b'%' => self.state = State::PercentHigh(Segment::ParamValue),
            b'+' => self.push_line(b' ')?,
            b'\t' | b'\r' | b'\n' => return Err(SipParseError::BadRequest),
            _ => self.push_line(byte)?,
        }
        Ok(1)
    }

    fn proto_literal(
        &mut self,
        byte: u8,
        expected: u8,
        next: State,
    ) -> Result<usize, SipParseError> {
        if !byte.eq_ignore_ascii_case(&expected) {
            return Err(SipParseError::UnsupportedProtocol);
        }
        self.push_line(byte)?;
        self.state = next;
        Ok(1)
    }

    fn proto_version(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b'\r' | b'\n' => {
                if self.scratch.field_len == 0 {
                    return Err(SipParseError::BadRequest);
                }
                self.request.proto = self.seal_line(SipParseError::BadRequest)?;
                self.state = after_line(byte);
            }
            b' ' | b'\t' => return Err(SipParseError::BadRequest),
            _ => {
                self.scratch.field_len += 1;
                self.push_line(byte)?;
            }
        }
        Ok(1)
    }

    fn header_key(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b':' => {
                if self.scratch.field_len == 0 {
                    return Err(SipParseError::BadRequest);
                }
                self.scratch.header_count += 1;
                if self.scratch.header_count > self.settings.headers.max_number {
                    return Err(SipParseError::TooManyHeaders);
                }
                let mut key = self
                    .request
                    .arenas
                    .seal(Slot::HeaderKey)
                    .ok_or(SipParseError::BadRequest)?;
                let name = self.request.arenas.bytes(key);
                let content_length = is_content_length(name);
                // 紧凑形式 `l` 以完整名称入库，按 `Content-Length` 查找时同样可见。
                if content_length && name.len() == 1 {
                    key = self
                        .request
                        .arenas
                        .intern(Slot::HeaderKey, CONTENT_LENGTH)
                        .map_err(|_| SipParseError::HeaderFieldsTooLarge)?;
                }
                self.scratch.header_key = key;
                self.scratch.field_len = 0;
                self.state = if content_length {
                    self.scratch.content_length = 0;
                    self.scratch.digits = 0;
                    State::ContentLength
                } else {
                    State::HeaderColon
                };
            }
            // 名称与冒号之间允许空白，名称内部不允许。
            b' ' | b'\t' => {
                if self.scratch.field_len == 0 {
                    return Err(SipParseError::BadRequest);
                }
                self.scratch.key_gap = true;
            }
            b'\r' | b'\n' => return Err(SipParseError::BadRequest),
            _ => {
                if self.scratch.key_gap {
                    return Err(SipParseError::BadRequest);
                }
                self.scratch.field_len += 1;
                if self.scratch.field_len > self.settings.headers.max_key_length
                    || !self.request.arenas.arena_mut(Slot::HeaderKey).append(byte)
                {
                    return Err(SipParseError::HeaderFieldsTooLarge);
                }
            }
        }
        Ok(1)
    }

    fn header_value(&mut self, data: &[u8]) -> Result<usize, SipParseError> {
        let end = data.iter().position(|&b| b == b'\r' || b == b'\n');
        let run = &data[..end.unwrap_or(data.len())];
        self.scratch.field_len += run.len();
        if self.scratch.field_len > self.settings.headers.max_value_length
            || !self
                .request
                .arenas
                .arena_mut(Slot::HeaderValue)
                .append_slice(run)
        {
            return Err(SipParseError::HeaderFieldsTooLarge);
        }

        let Some(end) = end else {
            return Ok(data.len());
        };
        let value = self
            .request
            .arenas
            .seal(Slot::HeaderValue)
            .ok_or(SipParseError::BadRequest)?;
        self.add_header(value);
        self.state = after_line(data[end]);
        Ok(end + 1)
    }

    fn content_length(&mut self, byte: u8) -> Result<usize, SipParseError> {
        match byte {
            b' ' | b'\t' => {
                if self.scratch.digits > 0 {
                    self.state = State::ContentLengthTrailing;
                }
            }
            b'0'..=b'9' => {
                self.scratch.content_length = self
                    .scratch
                    .content_length
                    .checked_mul(10)
                    .and_then(|value| value.checked_add(usize::from(byte - b'0')))
                    .ok_or(SipParseError::BadRequest)?;
                self.scratch.digits += 1;
                self.scratch.field_len += 1;
                if self.scratch.field_len > self.settings.headers.max_value_length
                    || !self.request.arenas.arena_mut(Slot::HeaderValue).append(byte)
                {
                    return Err(SipParseError::HeaderFieldsTooLarge);
                }
                if self.scratch.content_length > self.settings.body.max_length {
                    return Err(SipParseError::RequestEntityTooLarge);
                }
            }
            b'\r' | b'\n' => return self.finish_content_length(byte),
            _ => return Err(SipParseError::BadRequest),
        }
        Ok(1)
    }

    fn finish_content_length(&mut self, terminator: u8) -> Result<usize, SipParseError> {
        if self.scratch.digits == 0 {
            return Err(SipParseError::BadRequest);
        }
        let length = self.scratch.content_length;
        if self
            .scratch
            .content_length_seen
            .is_some_and(|previous| previous != length)
        {
            return Err(SipParseError::BadRequest);
        }
        self.scratch.content_length_seen = Some(length);
        self.request.content_length = length;

        let value = self
            .request
            .arenas
            .seal(Slot::HeaderValue)
            .ok_or(SipParseError::BadRequest)?;
        self.add_header(value);
        self.state = after_line(terminator);
        Ok(1)
    }

    fn end_of_headers(&mut self) -> Result<usize, SipParseError> {
        let length = self.request.content_length;
        if length == 0 {
            self.state = State::Complete;
        } else {
            self.request
                .body
                .reserve(length.min(self.settings.body.buffer_prealloc));
            self.scratch.body_remaining = length;
            self.state = State::Body;
        }
        Ok(1)
    }

    fn body(&mut self, data: &[u8]) -> usize {
        let take = self.scratch.body_remaining.min(data.len());
        self.request.body.extend_from_slice(&data[..take]);
        self.scratch.body_remaining -= take;
        if self.scratch.body_remaining == 0 {
            self.state = State::Complete;
        }
        take
    }

    fn push_line(&mut self, byte: u8) -> Result<(), SipParseError> {
        if self.request.arenas.arena_mut(Slot::RequestLine).append(byte) {
            Ok(())
        } else {
            Err(SipParseError::UriTooLong)
        }
    }

    fn pending_line_is_empty(&self) -> bool {
        self.request
            .arenas
            .arena(Slot::RequestLine)
            .pending()
            .is_empty()
    }

    fn seal_line(&mut self, invalid_utf8: SipParseError) -> Result<Text, SipParseError> {
        self.request
            .arenas
            .seal(Slot::RequestLine)
            .ok_or(invalid_utf8)
    }

    fn seal_host(&mut self) -> Result<(), SipParseError> {
        if self.pending_line_is_empty() {
            return Err(SipParseError::BadRequest);
        }
        self.request.uri.host = self.seal_line(SipParseError::UriDecoding)?;
        Ok(())
    }

    /// 把 `:` 之后暂存的片段按端口解释。
    fn demoted_port(&mut self) -> Result<u16, SipParseError> {
        if self.scratch.second_escaped {
            return Err(SipParseError::BadRequest);
        }
        let text = self.seal_line(SipParseError::BadRequest)?;
        let digits = self.request.arenas.bytes(text);
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(SipParseError::BadRequest);
        }
        digits
            .iter()
            .try_fold(0u16, |port, &digit| {
                port.checked_mul(10)?.checked_add(u16::from(digit - b'0'))
            })
            .ok_or(SipParseError::BadRequest)
    }

    fn add_param(&mut self, key: Text, value: Text) {
        self.request.uri.params.add(
            &self.request.arenas,
            Some(&mut self.pool),
            key,
            &[value],
        );
    }

    fn add_header(&mut self, value: Text) {
        self.request.headers.add(
            &self.request.arenas,
            Some(&mut self.pool),
            self.scratch.header_key,
            &[value],
        );
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

fn after_host(separator: u8) -> State {
    if separator == b';' {
        State::ParamKey
    } else {
        State::Proto
    }
}

fn after_line(terminator: u8) -> State {
    if terminator == b'\r' {
        State::LineCR
    } else {
        State::LineStart
    }
}

const CONTENT_LENGTH: &str = "Content-Length";

fn is_content_length(name: &[u8]) -> bool {
    name.eq_ignore_ascii_case(b"content-length") || name.eq_ignore_ascii_case(b"l")
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn discard(len: usize) {
    if len > 0 {
        trace!(discarded = len, "bytes after a complete request were dropped");
    }
}
