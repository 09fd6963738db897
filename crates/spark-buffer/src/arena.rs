use bytes::{BufMut, BytesMut};

/// `Span` 描述 [`ByteArena`] 内一段已封存的连续字节。
///
/// # 设计初衷（Why）
/// - 请求对象会在同一连接上被反复复用，字段若直接持有 `&[u8]` 将把 arena 的借用扩散到调用方，
///   无法在 `release` 时重置；改用 `(起始偏移, 长度)` 的句柄即可脱离生命周期约束。
/// - `epoch` 记录生成该句柄时 arena 的清空代数，`clear` 之后旧句柄解析为空切片，
///   避免误读到下一条请求写入的字节。
///
/// # 契约说明（What）
/// - 句柄只能交还给生成它的 arena 解析；跨 arena 解析的结果未定义（但不会 panic）。
/// - `Span::default()` 表示空段，在任意 arena 上解析都得到空切片。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    start: usize,
    len: usize,
    epoch: u32,
}

impl Span {
    /// 段起始偏移。
    pub fn start(&self) -> usize {
        self.start
    }

    /// 段长度（字节）。
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否为空段。
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// `ByteArena` 是容量固定、只追加的字节区，按段（[`Span`]）对外提供零拷贝视图。
///
/// # 模块角色（Why）
/// - 增量解析器在字节到达时逐个写入 arena，字段结束时调用 [`finish`](Self::finish) 封存为一段；
///   所有字段共享同一块底层内存，请求结束后整体清空复用，稳态下不再触发堆分配。
/// - 固定上限是对抗恶意或停滞发送方的防线：写满后 `append` 返回 `false`，由调用方映射为具体的协议错误，
///   绝不静默截断。
///
/// # 核心机制（How）
/// - 底层使用 `bytes::BytesMut`，`clear` 只重置长度而保留容量；
/// - `span_start` 记录当前未封存段的起点，`finish` 以 `[span_start, len)` 生成句柄后推进起点；
/// - `epoch` 在每次 `clear` 时自增，使旧句柄在解析时失效。
///
/// # 契约说明（What）
/// - **前置条件**：`capacity` 为硬上限；`prealloc` 只影响首次分配，超过上限时按上限截取；
/// - **后置条件**：`append`/`append_slice` 失败时 arena 内容保持不变；
/// - `clear` 之后，此前返回的所有 [`Span`] 均失效。
#[derive(Debug)]
pub struct ByteArena {
    storage: BytesMut,
    capacity: usize,
    span_start: usize,
    epoch: u32,
}

impl ByteArena {
    /// 创建预分配 `prealloc` 字节、上限为 `capacity` 字节的 arena。
    pub fn new(prealloc: usize, capacity: usize) -> Self {
        Self {
            storage: BytesMut::with_capacity(prealloc.min(capacity)),
            capacity,
            span_start: 0,
            epoch: 0,
        }
    }

    /// 追加单个字节；超出上限时返回 `false` 且不写入。
    #[inline]
    pub fn append(&mut self, byte: u8) -> bool {
        if self.storage.len() >= self.capacity {
            return false;
        }
        self.storage.put_u8(byte);
        true
    }

    /// 追加一段字节；整段放不下时返回 `false` 且不写入任何字节。
    #[inline]
    pub fn append_slice(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.remaining() {
            return false;
        }
        self.storage.extend_from_slice(bytes);
        true
    }

    /// 封存自上次 `finish`/`clear` 以来追加的字节，并开启新段。
    pub fn finish(&mut self) -> Span {
        let end = self.storage.len();
        let span = Span {
            start: self.span_start,
            len: end - self.span_start,
            epoch: self.epoch,
        };
        self.span_start = end;
        span
    }

    /// 解析句柄为零拷贝视图；失效或越界的句柄得到空切片。
    #[inline]
    pub fn resolve(&self, span: Span) -> &[u8] {
        if span.epoch != self.epoch {
            return &[];
        }
        self.storage
            .get(span.start..span.start + span.len)
            .unwrap_or(&[])
    }

    /// 当前未封存段的内容。
    pub fn pending(&self) -> &[u8] {
        &self.storage[self.span_start..]
    }

    /// 丢弃未封存段，返回丢弃的字节数；已封存的段不受影响。
    pub fn discard_pending(&mut self) -> usize {
        let discarded = self.storage.len() - self.span_start;
        self.storage.truncate(self.span_start);
        discarded
    }

    /// 清空 arena 并保留已分配容量。
    pub fn clear(&mut self) {
        self.storage.clear();
        self.span_start = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// 已写入的字节数（含未封存段）。
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// 是否尚未写入任何字节。
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// 硬上限。
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 距离硬上限的剩余字节数。
    pub fn remaining(&self) -> usize {
        self.capacity - self.storage.len()
    }
}
