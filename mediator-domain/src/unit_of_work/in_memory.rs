//! 内存版事务资源（InMemoryResource）
//!
//! 基于键值表的轻量事务资源，满足 `TransactionalResource` 协议：
//! - 事务内的写入先暂存，提交时一次性生效，回滚时丢弃；
//! - 记录开始/提交/回滚次数，并支持注入获取失败与提交失败；
//! - 典型用途：测试环境、示例与本地开发。
//!
use super::resource::{Transaction, TransactionalResource};
use crate::error::{DomainError, DomainResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// 事务资源的调用统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStats {
    pub begun: usize,
    pub committed: usize,
    pub rolled_back: usize,
}

#[derive(Default)]
struct Shared {
    store: RwLock<BTreeMap<String, Value>>,
    begun: AtomicUsize,
    committed: AtomicUsize,
    rolled_back: AtomicUsize,
    fail_next_begin: AtomicBool,
    fail_next_commit: AtomicBool,
}

/// 简单的内存事务资源实现
#[derive(Clone, Default)]
pub struct InMemoryResource {
    shared: Arc<Shared>,
}

impl InMemoryResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取已提交的值
    pub fn get(&self, key: &str) -> Option<Value> {
        self.shared.store.read().get(key).cloned()
    }

    /// 已提交的键数量
    pub fn len(&self) -> usize {
        self.shared.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> ResourceStats {
        ResourceStats {
            begun: self.shared.begun.load(Ordering::SeqCst),
            committed: self.shared.committed.load(Ordering::SeqCst),
            rolled_back: self.shared.rolled_back.load(Ordering::SeqCst),
        }
    }

    /// 下一次 `begin` 返回 `ResourceUnavailable`
    pub fn fail_next_begin(&self) {
        self.shared.fail_next_begin.store(true, Ordering::SeqCst);
    }

    /// 下一次 `commit` 返回 `Transaction` 错误（事务随之回滚）
    pub fn fail_next_commit(&self) {
        self.shared.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransactionalResource for InMemoryResource {
    async fn begin(&self) -> DomainResult<Box<dyn Transaction>> {
        if self.shared.fail_next_begin.swap(false, Ordering::SeqCst) {
            return Err(DomainError::resource_unavailable(
                "in-memory resource refused a new transaction",
            ));
        }
        self.shared.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryTransaction {
            shared: self.shared.clone(),
            staged: BTreeMap::new(),
        }))
    }
}

/// 内存事务：暂存写入，提交时生效
pub struct InMemoryTransaction {
    shared: Arc<Shared>,
    staged: BTreeMap<String, Option<Value>>,
}

impl InMemoryTransaction {
    /// 读取：优先返回本事务内暂存的值
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.staged.get(key) {
            Some(staged) => staged.clone(),
            None => self.shared.store.read().get(key).cloned(),
        }
    }

    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        self.staged.insert(key.into(), Some(value));
    }

    pub fn delete(&mut self, key: impl Into<String>) {
        self.staged.insert(key.into(), None);
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let InMemoryTransaction { shared, staged } = *self;
        if shared.fail_next_commit.swap(false, Ordering::SeqCst) {
            shared.rolled_back.fetch_add(1, Ordering::SeqCst);
            return Err(DomainError::transaction("in-memory commit failure injected"));
        }

        let mut store = shared.store.write();
        for (key, value) in staged {
            match value {
                Some(v) => {
                    store.insert(key, v);
                }
                None => {
                    store.remove(&key);
                }
            }
        }
        drop(store);
        shared.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        self.shared.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
