//! 集成测试共享工具模块
//!
//! 提供可观测释放次数的测试查询与手动时钟驱动的注册表

#![allow(dead_code)]

pub mod assertions;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use query_registry::query::{ManualClock, QueryRegistry, RegisteredQuery, DEFAULT_QUERY_TTL};

/// 记录 teardown 次数的测试查询
#[derive(Debug)]
pub struct TrackedQuery {
    pub label: String,
    pub pages_served: u64,
    released: Arc<AtomicUsize>,
}

impl TrackedQuery {
    pub fn new(label: &str) -> (Self, ReleaseCounter) {
        let released = Arc::new(AtomicUsize::new(0));
        let query = Self {
            label: label.to_string(),
            pages_served: 0,
            released: Arc::clone(&released),
        };
        (query, ReleaseCounter(released))
    }
}

impl RegisteredQuery for TrackedQuery {
    fn teardown(self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// 查询被释放的次数
#[derive(Debug, Clone)]
pub struct ReleaseCounter(Arc<AtomicUsize>);

impl ReleaseCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.count() > 0
    }
}

/// 测试上下文：手动时钟驱动的注册表
pub struct TestRegistry {
    pub registry: Arc<QueryRegistry<TrackedQuery>>,
    pub clock: Arc<ManualClock>,
}

impl TestRegistry {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new());
        let registry = Arc::new(QueryRegistry::with_clock(clock.clone(), DEFAULT_QUERY_TTL));
        Self { registry, clock }
    }
}
