//! `spark-buffer` 提供解析器复用的内存构件：定长字节 arena 与向量池。
//!
//! # 模块定位（Why）
//! - 信令解析在单条连接上会处理成千上万条请求，字段字符串与头部值列表若逐条分配，
//!   将使分配器成为热点；本 crate 提供“清空即复用”的两类构件，让稳态解析不再触发堆分配。
//! - 两者都是单一所有者、无锁的结构，由连接级调用方显式持有并注入解析器。
//!
//! # 设计概要（How）
//! - `arena` 模块实现 [`ByteArena`]：基于 `bytes::BytesMut` 的只追加字节区，按 [`Span`] 句柄封存字段；
//! - `pool` 模块实现 [`VecPool`]：保存已清空 `Vec<T>` 的自由链表，并通过 [`PoolStats`] 暴露复用情况。
//!
//! # 命名约定（Consistency）
//! - `append`/`finish`/`clear` 与 `acquire`/`release` 成对出现，分别对应“写入-封存-重置”与“租借-归还”。

extern crate alloc;

mod arena;
mod pool;

pub use arena::{ByteArena, Span};
pub use pool::{PoolStats, VecPool};
