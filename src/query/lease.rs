//! 查询检出凭据
//!
//! [`QueryLease`] 是 `open` 交给调用方的独占句柄。它只能通过
//! `QueryRegistry::close` 归还，归还时被消耗，因此归还后无法再使用查询对象。

use log::warn;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::ids::{QueryId, TenantId};

const LEASE_HOLDS_QUERY: &str = "lease holds its query until consumed";

/// 可被注册表托管的查询对象
///
/// 注册表从不检查查询对象的内容，只在释放时调用一次 [`RegisteredQuery::teardown`]。
pub trait RegisteredQuery: Send + Sync + 'static {
    /// 释放查询持有的事务、游标与中间结果
    fn teardown(self);
}

/// 已检出查询的独占句柄
pub struct QueryLease<Q: RegisteredQuery> {
    tenant: TenantId,
    id: QueryId,
    generation: u64,
    query: Option<Q>,
    aborted: Arc<AtomicBool>,
}

impl<Q: RegisteredQuery> QueryLease<Q> {
    pub(crate) fn new(
        tenant: TenantId,
        id: QueryId,
        generation: u64,
        query: Q,
        aborted: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tenant,
            id,
            generation,
            query: Some(query),
            aborted,
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    /// 条目在检出期间是否已被 `destroy`
    ///
    /// 被中止的查询应尽快停止工作，随后的 `close` 会返回 `NotFound` 并释放查询对象。
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn take_query(&mut self) -> Q {
        self.query.take().expect(LEASE_HOLDS_QUERY)
    }
}

impl<Q: RegisteredQuery> Deref for QueryLease<Q> {
    type Target = Q;

    fn deref(&self) -> &Q {
        self.query.as_ref().expect(LEASE_HOLDS_QUERY)
    }
}

impl<Q: RegisteredQuery> DerefMut for QueryLease<Q> {
    fn deref_mut(&mut self) -> &mut Q {
        self.query.as_mut().expect(LEASE_HOLDS_QUERY)
    }
}

impl<Q: RegisteredQuery> Drop for QueryLease<Q> {
    fn drop(&mut self) {
        // 未归还就丢弃的句柄：查询对象随之释放，条目保持检出状态直到被 destroy
        if let Some(query) = self.query.take() {
            warn!(
                "Query lease dropped without close: tenant={}, id={}",
                self.tenant, self.id
            );
            query.teardown();
        }
    }
}

impl<Q: RegisteredQuery> std::fmt::Debug for QueryLease<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryLease")
            .field("tenant", &self.tenant)
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("aborted", &self.is_aborted())
            .finish_non_exhaustive()
    }
}
