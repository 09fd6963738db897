use alloc::vec::Vec;

/// `VecPool` 复用小型 `Vec<T>` 缓冲，供多值头部等场景摊薄分配成本。
///
/// # 模块角色（Why）
/// - SIP 头部的值列表通常只有一两个元素，但每条请求都会创建十余个；
///   每次请求都向分配器申请会在高并发下造成可观的抖动。
/// - 池由连接级调用方显式持有并注入解析器，不存在进程级的全局池，
///   因此无需任何锁。
///
/// # 核心机制（How）
/// - `idle` 作为自由链表保存已清空的 `Vec<T>`，`acquire` 优先弹出复用；
/// - `release` 清空元素后放回，超过 `max_idle` 的部分直接丢弃，防止峰值后常驻内存膨胀；
/// - 统计计数只在单一所有者下读写，使用普通整数即可。
///
/// # 契约说明（What）
/// - `acquire` 返回的向量保证为空；
/// - `release` 接受任意来源的向量，不要求来自本池。
#[derive(Debug)]
pub struct VecPool<T> {
    idle: Vec<Vec<T>>,
    max_idle: usize,
    prealloc: usize,
    allocated: u64,
    reused: u64,
    dropped: u64,
}

/// 池的统计快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// 因自由链表为空而新建的向量数量。
    pub allocated: u64,
    /// 从自由链表复用的次数。
    pub reused: u64,
    /// 因超出 `max_idle` 而丢弃的向量数量。
    pub dropped: u64,
    /// 当前空闲向量数。
    pub idle: usize,
}

impl<T> VecPool<T> {
    /// 创建最多保留 `max_idle` 个空闲向量、每个新向量预留 `prealloc` 元素的池。
    pub fn new(max_idle: usize, prealloc: usize) -> Self {
        Self {
            idle: Vec::with_capacity(max_idle),
            max_idle,
            prealloc,
            allocated: 0,
            reused: 0,
            dropped: 0,
        }
    }

    /// 取出一个空向量。
    pub fn acquire(&mut self) -> Vec<T> {
        match self.idle.pop() {
            Some(values) => {
                self.reused += 1;
                values
            }
            None => {
                self.allocated += 1;
                Vec::with_capacity(self.prealloc)
            }
        }
    }

    /// 归还向量；池已满时丢弃。
    pub fn release(&mut self, mut values: Vec<T>) {
        if self.idle.len() >= self.max_idle {
            self.dropped += 1;
            return;
        }
        values.clear();
        self.idle.push(values);
    }

    /// 丢弃全部空闲向量，返回丢弃数量。
    pub fn shrink_to_fit(&mut self) -> usize {
        let reclaimed = self.idle.len();
        self.idle.clear();
        self.idle.shrink_to_fit();
        reclaimed
    }

    /// 读取统计快照。
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated,
            reused: self.reused,
            dropped: self.dropped,
            idle: self.idle.len(),
        }
    }
}

impl<T> Default for VecPool<T> {
    fn default() -> Self {
        Self::new(64, 2)
    }
}
