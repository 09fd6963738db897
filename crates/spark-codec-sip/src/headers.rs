//! 头部存储模块。
//!
//! ## 模块目的（Why）
//! - SIP 头部与 URI 参数都是“名称 → 有序多值”的结构，统一由 [`HeaderStore`] 承载，避免两套实现。
//! - 名称与值都存放在请求自带的 arena 中，存储本身只保存 [`Text`] 句柄，
//!   因此清空时无需逐项释放字符串。
//!
//! ## 能力概览（What）
//! - [`HeaderStore`]：按首次出现顺序保存条目，名称比较采用 ASCII 大小写不敏感；
//! - [`Fields`]：绑定请求借用的只读视图，提供 `get`/`get_all`/`iter`；
//! - [`FieldsMut`]：把调用方提供的文本写入 arena 后再追加或覆盖条目。
//!
//! ## 风险提示（Trade-offs）
//! - 查找为线性扫描；头部数量受 `headers.max_number` 约束，实测远小于哈希表的常数开销。

use core::slice;

use spark_buffer::VecPool;

use crate::error::FieldWriteError;
use crate::types::{Arenas, Slot, Text};

/// 值列表池：头部与 URI 参数共用。
pub type ValuePool = VecPool<Text>;

#[derive(Debug)]
struct Entry {
    name: Text,
    values: Vec<Text>,
}

/// 有序多值映射，名称大小写不敏感。
///
/// # 契约说明（What）
/// - 同一名称的值保持追加顺序；不同名称之间的顺序不具备语义；
/// - 条目的值列表来自 [`ValuePool`]，`clear` 时全部归还，条目向量本身保留容量。
#[derive(Debug, Default)]
pub struct HeaderStore {
    entries: Vec<Entry>,
}

impl HeaderStore {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// 不同名称的条目数。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, arenas: &Arenas, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| arenas.bytes(entry.name).eq_ignore_ascii_case(name.as_bytes()))
    }

    pub(crate) fn get(&self, arenas: &Arenas, name: &str) -> Option<Text> {
        self.get_all(arenas, name)
            .and_then(|values| values.first().copied())
    }

    pub(crate) fn get_all(&self, arenas: &Arenas, name: &str) -> Option<&[Text]> {
        self.position(arenas, name)
            .map(|index| self.entries[index].values.as_slice())
    }

    /// 追加值；名称不存在时新建条目，值列表优先从池中租借。
    pub(crate) fn add(
        &mut self,
        arenas: &Arenas,
        pool: Option<&mut ValuePool>,
        name: Text,
        values: &[Text],
    ) {
        let needle = arenas.text(name);
        match self.position(arenas, needle) {
            Some(index) => self.entries[index].values.extend_from_slice(values),
            None => {
                let mut list = pool.map(VecPool::acquire).unwrap_or_default();
                list.extend_from_slice(values);
                self.entries.push(Entry { name, values: list });
            }
        }
    }

    /// 以给定值整体替换条目。
    pub(crate) fn set(
        &mut self,
        arenas: &Arenas,
        pool: Option<&mut ValuePool>,
        name: Text,
        values: &[Text],
    ) {
        let needle = arenas.text(name);
        match self.position(arenas, needle) {
            Some(index) => {
                let entry = &mut self.entries[index];
                entry.values.clear();
                entry.values.extend_from_slice(values);
            }
            None => self.add(arenas, pool, name, values),
        }
    }

    /// 清空全部条目，值列表归还池中。
    pub(crate) fn clear(&mut self, pool: &mut ValuePool) {
        for entry in self.entries.drain(..) {
            pool.release(entry.values);
        }
    }
}

/// 绑定请求借用的只读视图。
///
/// 视图中的字符串直接指向请求的 arena，生命周期不超过请求的不可变借用，
/// 因此无法跨越解析器的 `release`。
#[derive(Clone, Copy)]
pub struct Fields<'r> {
    store: &'r HeaderStore,
    arenas: &'r Arenas,
}

impl<'r> Fields<'r> {
    pub(crate) fn new(store: &'r HeaderStore, arenas: &'r Arenas) -> Self {
        Self { store, arenas }
    }

    /// 返回名称对应的首个值。
    pub fn get(&self, name: &str) -> Option<&'r str> {
        self.store
            .get(self.arenas, name)
            .map(|text| self.arenas.text(text))
    }

    /// 返回名称对应的全部值。
    pub fn get_all(&self, name: &str) -> Option<Values<'r>> {
        self.store
            .get_all(self.arenas, name)
            .map(|texts| Values::new(texts, self.arenas))
    }

    /// 名称是否存在。
    pub fn contains(&self, name: &str) -> bool {
        self.store.position(self.arenas, name).is_some()
    }

    /// 不同名称的条目数。
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// 按条目插入顺序遍历 `(名称, 值列表)`。
    pub fn iter(self) -> impl Iterator<Item = (&'r str, Values<'r>)> + use<'r> {
        let arenas = self.arenas;
        let store = self.store;
        store
            .entries
            .iter()
            .map(move |entry| (arenas.text(entry.name), Values::new(&entry.values, arenas)))
    }
}

impl core::fmt::Debug for Fields<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(name, values)| (name, values.collect::<Vec<_>>())))
            .finish()
    }
}

/// 单个名称下的值迭代器。
#[derive(Clone)]
pub struct Values<'r> {
    texts: slice::Iter<'r, Text>,
    arenas: &'r Arenas,
}

impl<'r> Values<'r> {
    fn new(texts: &'r [Text], arenas: &'r Arenas) -> Self {
        Self {
            texts: texts.iter(),
            arenas,
        }
    }
}

impl<'r> Iterator for Values<'r> {
    type Item = &'r str;

    fn next(&mut self) -> Option<Self::Item> {
        self.texts.next().map(|text| self.arenas.text(*text))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.texts.size_hint()
    }
}

impl ExactSizeIterator for Values<'_> {}

/// 可写视图：先把文本写入 arena，再更新条目。
///
/// 在解析器之外新建的条目不经过值列表池分配，但会在 `release` 时归还到池中。
pub struct FieldsMut<'r> {
    store: &'r mut HeaderStore,
    arenas: &'r mut Arenas,
    name_slot: Slot,
    value_slot: Slot,
}

impl<'r> FieldsMut<'r> {
    pub(crate) fn new(
        store: &'r mut HeaderStore,
        arenas: &'r mut Arenas,
        name_slot: Slot,
        value_slot: Slot,
    ) -> Self {
        Self {
            store,
            arenas,
            name_slot,
            value_slot,
        }
    }

    /// 追加值，名称不存在时新建条目。
    pub fn add(&mut self, name: &str, values: &[&str]) -> Result<(), FieldWriteError> {
        let (name, texts) = self.intern(name, values)?;
        self.store.add(self.arenas, None, name, &texts);
        Ok(())
    }

    /// 以给定值整体替换条目。
    pub fn set(&mut self, name: &str, values: &[&str]) -> Result<(), FieldWriteError> {
        let (name, texts) = self.intern(name, values)?;
        self.store.set(self.arenas, None, name, &texts);
        Ok(())
    }

    fn intern(
        &mut self,
        name: &str,
        values: &[&str],
    ) -> Result<(Text, Vec<Text>), FieldWriteError> {
        let name = self.arenas.intern(self.name_slot, name)?;
        let texts = values
            .iter()
            .map(|value| self.arenas.intern(self.value_slot, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((name, texts))
    }
}
