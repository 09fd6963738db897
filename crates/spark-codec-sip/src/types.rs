//! SIP 请求模型。
//!
//! ## 教案目的（Why）
//! - [`Request`] 是解析器的输出对象，在同一连接上反复复用：字段不持有字符串，
//!   只保存指向请求自带 arena 的 [`Text`] 句柄。
//! - 读取一律经由借用视图（[`Uri`]、[`Protocol`]、[`Fields`]）完成，
//!   借用检查器因此保证任何视图都不会跨越解析器的 `release`。
//!
//! ## 交互契约（What）
//! - 请求行的各段（方法、scheme、用户、密码、主机、参数、协议）写入请求行 arena；
//! - 头部名称与头部值分别写入两块独立的 arena，容量各自受配置约束；
//! - 所有文本在封存时已通过 UTF-8 校验，解析视图时不会失败。

use core::fmt;
use core::str;

use spark_buffer::{ByteArena, Span};

use crate::error::FieldWriteError;
use crate::headers::{Fields, FieldsMut, HeaderStore, ValuePool};
use crate::settings::Settings;

/// 文本所在的 arena。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub(crate) enum Slot {
    #[default]
    RequestLine,
    HeaderKey,
    HeaderValue,
}

/// 指向请求 arena 内某段文本的不透明句柄。
///
/// 句柄本身不携带生命周期，只能通过所属 [`Request`] 的视图解析；
/// 请求被重置后，旧句柄解析为空字符串。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Text {
    slot: Slot,
    span: Span,
}

impl Text {
    pub(crate) fn new(slot: Slot, span: Span) -> Self {
        Self { slot, span }
    }

    /// 文本是否为空。
    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }
}

/// 请求自带的三块 arena。
#[derive(Debug)]
pub(crate) struct Arenas {
    request_line: ByteArena,
    header_key: ByteArena,
    header_value: ByteArena,
}

impl Arenas {
    fn with_settings(settings: &Settings) -> Self {
        let line = &settings.request_line;
        let headers = &settings.headers;
        Self {
            request_line: ByteArena::new(line.buffer_prealloc, line.max_length),
            header_key: ByteArena::new(headers.buffer_prealloc, headers.key_arena_capacity),
            header_value: ByteArena::new(headers.buffer_prealloc, headers.value_arena_capacity),
        }
    }

    pub(crate) fn arena(&self, slot: Slot) -> &ByteArena {
        match slot {
            Slot::RequestLine => &self.request_line,
            Slot::HeaderKey => &self.header_key,
            Slot::HeaderValue => &self.header_value,
        }
    }

    pub(crate) fn arena_mut(&mut self, slot: Slot) -> &mut ByteArena {
        match slot {
            Slot::RequestLine => &mut self.request_line,
            Slot::HeaderKey => &mut self.header_key,
            Slot::HeaderValue => &mut self.header_value,
        }
    }

    pub(crate) fn bytes(&self, text: Text) -> &[u8] {
        self.arena(text.slot).resolve(text.span)
    }

    pub(crate) fn text(&self, text: Text) -> &str {
        str::from_utf8(self.bytes(text)).unwrap_or_default()
    }

    /// 封存当前段；非 UTF-8 时返回 `None`，已写入的字节仍留在 arena 中直至重置。
    pub(crate) fn seal(&mut self, slot: Slot) -> Option<Text> {
        let text = Text::new(slot, self.arena_mut(slot).finish());
        str::from_utf8(self.bytes(text)).ok().map(|_| text)
    }

    /// 把调用方文本整体写入指定 arena 并封存。
    ///
    /// 解析器正在写入同一 arena 的某个字段时拒绝写入，否则该字段会被截成两段。
    pub(crate) fn intern(&mut self, slot: Slot, value: &str) -> Result<Text, FieldWriteError> {
        let arena = self.arena_mut(slot);
        if !arena.pending().is_empty() {
            return Err(FieldWriteError::FieldInProgress);
        }
        if !arena.append_slice(value.as_bytes()) {
            return Err(FieldWriteError::ArenaExhausted);
        }
        Ok(Text::new(slot, arena.finish()))
    }

    /// 丢弃三块 arena 中尚未封存的字段。
    pub(crate) fn discard_pending(&mut self) {
        self.request_line.discard_pending();
        self.header_key.discard_pending();
        self.header_value.discard_pending();
    }

    fn clear(&mut self) {
        self.request_line.clear();
        self.header_key.clear();
        self.header_value.clear();
    }
}

/// SIP 方法分类。
///
/// 方法名区分大小写；不在列表中的方法以 [`Method::Extension`] 原样保留。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method<'a> {
    /// INVITE。
    Invite,
    /// ACK。
    Ack,
    /// BYE。
    Bye,
    /// CANCEL。
    Cancel,
    /// OPTIONS。
    Options,
    /// REGISTER。
    Register,
    /// PRACK。
    Prack,
    /// SUBSCRIBE。
    Subscribe,
    /// NOTIFY。
    Notify,
    /// PUBLISH。
    Publish,
    /// INFO。
    Info,
    /// REFER。
    Refer,
    /// MESSAGE。
    Message,
    /// UPDATE。
    Update,
    /// 扩展方法。
    Extension(&'a str),
}

impl<'a> Method<'a> {
    /// 按 RFC 3261 的 token 分类方法名。
    pub fn from_token(token: &'a str) -> Self {
        match token {
            "INVITE" => Self::Invite,
            "ACK" => Self::Ack,
            "BYE" => Self::Bye,
            "CANCEL" => Self::Cancel,
            "OPTIONS" => Self::Options,
            "REGISTER" => Self::Register,
            "PRACK" => Self::Prack,
            "SUBSCRIBE" => Self::Subscribe,
            "NOTIFY" => Self::Notify,
            "PUBLISH" => Self::Publish,
            "INFO" => Self::Info,
            "REFER" => Self::Refer,
            "MESSAGE" => Self::Message,
            "UPDATE" => Self::Update,
            other => Self::Extension(other),
        }
    }

    /// 方法名原文。
    pub fn as_str(&self) -> &'a str {
        match self {
            Self::Invite => "INVITE",
            Self::Ack => "ACK",
            Self::Bye => "BYE",
            Self::Cancel => "CANCEL",
            Self::Options => "OPTIONS",
            Self::Register => "REGISTER",
            Self::Prack => "PRACK",
            Self::Subscribe => "SUBSCRIBE",
            Self::Notify => "NOTIFY",
            Self::Publish => "PUBLISH",
            Self::Info => "INFO",
            Self::Refer => "REFER",
            Self::Message => "MESSAGE",
            Self::Update => "UPDATE",
            Self::Extension(token) => *token,
        }
    }
}

impl fmt::Display for Method<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 请求 URI 的存储部分。
#[derive(Debug, Default)]
pub(crate) struct UriParts {
    pub(crate) scheme: Text,
    pub(crate) user: Option<Text>,
    pub(crate) password: Option<Text>,
    pub(crate) host: Text,
    pub(crate) port: Option<u16>,
    pub(crate) params: HeaderStore,
}

impl UriParts {
    fn reset(&mut self, pool: &mut ValuePool) {
        self.params.clear(pool);
        self.scheme = Text::default();
        self.user = None;
        self.password = None;
        self.host = Text::default();
        self.port = None;
    }
}

/// 请求 URI 的只读视图。
///
/// 用户名、密码与参数均为百分号解码后的文本。
#[derive(Clone, Copy)]
pub struct Uri<'r> {
    parts: &'r UriParts,
    arenas: &'r Arenas,
}

impl<'r> Uri<'r> {
    /// scheme，例如 `sip`。
    pub fn scheme(&self) -> &'r str {
        self.arenas.text(self.parts.scheme)
    }

    /// userinfo 中的用户部分。
    pub fn user(&self) -> Option<&'r str> {
        self.parts.user.map(|text| self.arenas.text(text))
    }

    /// userinfo 中的密码部分。
    pub fn password(&self) -> Option<&'r str> {
        self.parts.password.map(|text| self.arenas.text(text))
    }

    /// 主机。
    pub fn host(&self) -> &'r str {
        self.arenas.text(self.parts.host)
    }

    /// 端口；未显式给出时为 `None`。
    pub fn port(&self) -> Option<u16> {
        self.parts.port
    }

    /// `;key=value` 形式的参数。
    pub fn params(&self) -> Fields<'r> {
        Fields::new(&self.parts.params, self.arenas)
    }
}

impl fmt::Debug for Uri<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uri")
            .field("scheme", &self.scheme())
            .field("user", &self.user())
            .field("password", &self.password())
            .field("host", &self.host())
            .field("port", &self.port())
            .field("params", &self.params())
            .finish()
    }
}

/// 协议字段视图，例如 `SIP/2.0`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protocol<'r>(&'r str);

impl<'r> Protocol<'r> {
    /// 原文。
    pub fn as_str(&self) -> &'r str {
        self.0
    }

    /// `/` 之前的部分。
    pub fn scheme(&self) -> &'r str {
        self.0.split_once('/').map_or(self.0, |(scheme, _)| scheme)
    }

    /// `/` 之后的版本号。
    pub fn version(&self) -> &'r str {
        self.0.split_once('/').map_or("", |(_, version)| version)
    }
}

impl fmt::Display for Protocol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// 解析结果：一条 SIP 请求。
///
/// # 契约说明（What）
/// - 由 [`RequestParser`](crate::RequestParser) 填充；也可独立构造后手工写入头部与参数；
/// - `content_length` 在存在 `Content-Length` 头部时与其数值一致，否则为 0；
/// - 所有读取方法返回的字符串都借用自请求本身。
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Text,
    pub(crate) uri: UriParts,
    pub(crate) proto: Text,
    pub(crate) headers: HeaderStore,
    pub(crate) content_length: usize,
    pub(crate) body: Vec<u8>,
    pub(crate) arenas: Arenas,
}

impl Request {
    /// 按默认配置创建空请求。
    pub fn new() -> Self {
        Self::with_settings(&Settings::default())
    }

    /// 按给定配置预留 arena 与头部容量。
    pub fn with_settings(settings: &Settings) -> Self {
        Self {
            method: Text::default(),
            uri: UriParts::default(),
            proto: Text::default(),
            headers: HeaderStore::with_capacity(settings.headers.max_number.min(32)),
            content_length: 0,
            body: Vec::with_capacity(settings.body.buffer_prealloc),
            arenas: Arenas::with_settings(settings),
        }
    }

    /// 方法名原文。
    pub fn method(&self) -> &str {
        self.arenas.text(self.method)
    }

    /// 方法分类。
    pub fn method_kind(&self) -> Method<'_> {
        Method::from_token(self.method())
    }

    /// 请求 URI。
    pub fn uri(&self) -> Uri<'_> {
        Uri {
            parts: &self.uri,
            arenas: &self.arenas,
        }
    }

    /// 协议字段。
    pub fn proto(&self) -> Protocol<'_> {
        Protocol(self.arenas.text(self.proto))
    }

    /// 头部视图。
    pub fn headers(&self) -> Fields<'_> {
        Fields::new(&self.headers, &self.arenas)
    }

    /// 可写头部视图；名称与值写入头部 arena。
    pub fn headers_mut(&mut self) -> FieldsMut<'_> {
        FieldsMut::new(
            &mut self.headers,
            &mut self.arenas,
            Slot::HeaderKey,
            Slot::HeaderValue,
        )
    }

    /// 可写 URI 参数视图；键值写入请求行 arena。
    pub fn params_mut(&mut self) -> FieldsMut<'_> {
        FieldsMut::new(
            &mut self.uri.params,
            &mut self.arenas,
            Slot::RequestLine,
            Slot::RequestLine,
        )
    }

    /// 声明的消息体长度。
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// 消息体。
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// 是否携带非空消息体。
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// 清空全部字段，值列表归还池中，arena 与消息体保留容量。
    pub(crate) fn reset(&mut self, pool: &mut ValuePool) {
        self.headers.clear(pool);
        self.uri.reset(pool);
        self.arenas.clear();
        self.method = Text::default();
        self.proto = Text::default();
        self.content_length = 0;
        self.body.clear();
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}
