//! 查询注册表
//!
//! 按 (租户, 查询ID) 托管长生命周期的查询对象，支持跨多次客户端往返访问同一个查询。
//!
//! 每个条目处于两种状态之一：
//! - 驻留（Resident）：注册表持有查询对象，超过 ttl 未被使用时会被清扫回收
//! - 检出（CheckedOut）：调用方通过 [`QueryLease`] 独占查询对象，不会过期
//!
//! 所有条目由一把进程级读写锁保护。锁只在单次调用内持有，查询对象的
//! teardown 总是在释放锁之后执行。

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::clock::{Clock, SystemClock};
use super::lease::{QueryLease, RegisteredQuery};
use crate::config::RegistryConfig;
use crate::core::error::{InsertError, RegistryError, RegistryResult};
use crate::core::ids::{QueryId, TenantId};

/// 默认存活时间：一小时
pub const DEFAULT_QUERY_TTL: Duration = Duration::from_secs(3600);

/// 条目状态，过期时间只在驻留状态下存在
///
/// `expires_at` 为 None 表示 now + ttl 超出了时钟的表示范围，条目永不过期。
enum EntryState<Q> {
    Resident {
        query: Q,
        expires_at: Option<Instant>,
    },
    CheckedOut { aborted: Arc<AtomicBool> },
}

struct QueryEntry<Q> {
    tenant: TenantId,
    id: QueryId,
    generation: u64,
    ttl: Duration,
    created_at: DateTime<Utc>,
    state: EntryState<Q>,
}

impl<Q: RegisteredQuery> QueryEntry<Q> {
    fn is_expired(&self, now: Instant) -> bool {
        match self.state {
            EntryState::Resident { expires_at, .. } => expires_at.is_some_and(|at| at <= now),
            EntryState::CheckedOut { .. } => false,
        }
    }

    fn is_checked_out(&self) -> bool {
        matches!(self.state, EntryState::CheckedOut { .. })
    }

    /// 释放条目：驻留的查询立即 teardown，检出的查询标记为中止，由持有者释放
    fn release(self) {
        match self.state {
            EntryState::Resident { query, .. } => query.teardown(),
            EntryState::CheckedOut { aborted } => {
                aborted.store(true, Ordering::Release);
                debug!(
                    "Query {}/{} destroyed while checked out, holder releases it",
                    self.tenant, self.id
                );
            }
        }
    }

    fn info(&self, now: Instant) -> QueryEntryInfo {
        let (state, expires_in) = match self.state {
            EntryState::Resident { expires_at, .. } => (
                QueryState::Resident,
                Some(expires_at.map_or(Duration::MAX, |at| at.saturating_duration_since(now))),
            ),
            EntryState::CheckedOut { .. } => (QueryState::CheckedOut, None),
        };
        QueryEntryInfo {
            tenant: self.tenant.clone(),
            id: self.id,
            state,
            ttl: self.ttl,
            expires_in,
            created_at: self.created_at,
        }
    }
}

/// 条目状态，用于展示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryState {
    Resident,
    CheckedOut,
}

/// 条目信息，用于 SHOW QUERIES 一类的管理接口
#[derive(Debug, Clone, Serialize)]
pub struct QueryEntryInfo {
    pub tenant: TenantId,
    pub id: QueryId,
    pub state: QueryState,
    pub ttl: Duration,
    /// 距离过期的剩余时间，检出状态下为 None，永不过期时为 `Duration::MAX`
    pub expires_in: Option<Duration>,
    pub created_at: DateTime<Utc>,
}

/// 注册表统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub tenants: usize,
    pub resident_queries: usize,
    pub checked_out_queries: usize,
}

impl RegistryStats {
    pub fn total_queries(&self) -> usize {
        self.resident_queries + self.checked_out_queries
    }
}

type TenantQueries<Q> = HashMap<QueryId, QueryEntry<Q>>;

/// 查询注册表
pub struct QueryRegistry<Q: RegisteredQuery> {
    queries: RwLock<HashMap<TenantId, TenantQueries<Q>>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    next_generation: AtomicU64,
}

impl<Q: RegisteredQuery> QueryRegistry<Q> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_QUERY_TTL)
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self::with_clock(Arc::new(SystemClock), default_ttl)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            queries: RwLock::new(HashMap::new()),
            clock,
            default_ttl,
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::with_default_ttl(config.default_ttl())
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// 注册新查询
    ///
    /// 条目以驻留状态创建，过期时间为 now + ttl（`None` 使用默认 ttl）。
    /// 若 (租户, 查询ID) 已存在则返回 `AlreadyExists`，查询对象随错误交还调用方。
    pub fn insert(
        &self,
        tenant: TenantId,
        id: QueryId,
        query: Q,
        ttl: Option<Duration>,
    ) -> Result<(), InsertError<Q>> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let expires_at = self.clock.now().checked_add(ttl);

        let mut queries = self.queries.write();
        let tenant_queries = queries.entry(tenant.clone()).or_default();
        if tenant_queries.contains_key(&id) {
            drop(queries);
            warn!("Query insert rejected, already registered: tenant={}, id={}", tenant, id);
            return Err(InsertError::new(
                RegistryError::already_exists(&tenant, id),
                query,
            ));
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        tenant_queries.insert(
            id,
            QueryEntry {
                tenant: tenant.clone(),
                id,
                generation,
                ttl,
                created_at: Utc::now(),
                state: EntryState::Resident { query, expires_at },
            },
        );
        drop(queries);

        info!("Query registered: tenant={}, id={}, ttl={:?}", tenant, id, ttl);
        Ok(())
    }

    /// 检出查询
    ///
    /// - 条目不存在：返回 `Ok(None)`，表示从未存在或已被回收
    /// - 条目驻留：转为检出状态，查询对象通过 [`QueryLease`] 交给调用方
    /// - 条目已检出：返回 `AlreadyInUse`，不会等待
    pub fn open(&self, tenant: &TenantId, id: QueryId) -> RegistryResult<Option<QueryLease<Q>>> {
        let mut queries = self.queries.write();
        let Some(entry) = queries.get_mut(tenant).and_then(|m| m.get_mut(&id)) else {
            debug!("Query not found on open: tenant={}, id={}", tenant, id);
            return Ok(None);
        };

        let aborted = Arc::new(AtomicBool::new(false));
        let previous = std::mem::replace(
            &mut entry.state,
            EntryState::CheckedOut {
                aborted: Arc::clone(&aborted),
            },
        );
        match previous {
            EntryState::Resident { query, .. } => {
                let lease = QueryLease::new(tenant.clone(), id, entry.generation, query, aborted);
                drop(queries);
                debug!("Query checked out: tenant={}, id={}", tenant, id);
                Ok(Some(lease))
            }
            busy @ EntryState::CheckedOut { .. } => {
                entry.state = busy;
                drop(queries);
                debug!("Query already in use: tenant={}, id={}", tenant, id);
                Err(RegistryError::already_in_use(tenant, id))
            }
        }
    }

    /// 归还查询
    ///
    /// 条目回到驻留状态，过期时间为 now + ttl（`None` 沿用插入时的 ttl）。
    /// 条目已不存在或已被同键的新条目取代时返回 `NotFound`；
    /// 同键条目处于驻留状态时返回 `NotOpen`。失败时注册表不变，
    /// 句柄中的查询对象因无处归属而被释放。
    pub fn close(&self, mut lease: QueryLease<Q>, ttl: Option<Duration>) -> RegistryResult<()> {
        let tenant = lease.tenant().clone();
        let id = lease.id();
        let generation = lease.generation();
        let query = lease.take_query();
        let now = self.clock.now();

        let mut queries = self.queries.write();
        let error = match queries.get_mut(&tenant).and_then(|m| m.get_mut(&id)) {
            None => RegistryError::not_found(&tenant, id),
            Some(entry) => match entry.state {
                EntryState::Resident { .. } => RegistryError::not_open(&tenant, id),
                EntryState::CheckedOut { .. } if entry.generation != generation => {
                    RegistryError::not_found(&tenant, id)
                }
                EntryState::CheckedOut { .. } => {
                    let ttl = ttl.unwrap_or(entry.ttl);
                    entry.state = EntryState::Resident {
                        query,
                        expires_at: now.checked_add(ttl),
                    };
                    drop(queries);
                    debug!("Query returned: tenant={}, id={}, ttl={:?}", tenant, id, ttl);
                    return Ok(());
                }
            },
        };
        drop(queries);

        warn!("Query close failed, releasing leased query: {}", error);
        query.teardown();
        Err(error)
    }

    /// 删除查询，无论其处于驻留还是检出状态
    ///
    /// 驻留的查询对象立即释放；检出中的查询被标记为中止，由句柄持有者在
    /// `close` 或丢弃句柄时释放。条目不存在时返回 `NotFound`。
    pub fn destroy(&self, tenant: &TenantId, id: QueryId) -> RegistryResult<()> {
        let removed = {
            let mut queries = self.queries.write();
            let removed = queries.get_mut(tenant).and_then(|m| m.remove(&id));
            if queries.get(tenant).is_some_and(|m| m.is_empty()) {
                queries.remove(tenant);
            }
            removed
        };

        match removed {
            Some(entry) => {
                info!(
                    "Query destroyed: tenant={}, id={}, checked_out={}",
                    tenant,
                    id,
                    entry.is_checked_out()
                );
                entry.release();
                Ok(())
            }
            None => {
                debug!("Query not found on destroy: tenant={}, id={}", tenant, id);
                Err(RegistryError::not_found(tenant, id))
            }
        }
    }

    /// 删除租户下的所有查询（例如数据库被删除），返回删除的条目数
    pub fn destroy_tenant(&self, tenant: &TenantId) -> usize {
        let removed = self.queries.write().remove(tenant);
        let Some(entries) = removed else {
            return 0;
        };

        let count = entries.len();
        for entry in entries.into_values() {
            entry.release();
        }
        info!("Destroyed {} queries of tenant {}", count, tenant);
        count
    }

    /// 清扫过期查询，返回回收的条目数
    ///
    /// 只回收驻留且 `expires_at <= now` 的条目，检出中的条目无论多久都不会被选中。
    pub fn expire_queries(&self) -> usize {
        let now = self.clock.now();
        let mut expired = Vec::new();
        {
            let mut queries = self.queries.write();
            for tenant_queries in queries.values_mut() {
                let ids: Vec<QueryId> = tenant_queries
                    .iter()
                    .filter(|(_, entry)| entry.is_expired(now))
                    .map(|(id, _)| *id)
                    .collect();
                for id in ids {
                    if let Some(entry) = tenant_queries.remove(&id) {
                        expired.push(entry);
                    }
                }
            }
            queries.retain(|_, tenant_queries| !tenant_queries.is_empty());
        }

        let count = expired.len();
        for entry in expired {
            info!("Query expired: tenant={}, id={}", entry.tenant, entry.id);
            entry.release();
        }
        count
    }

    /// 是否存在 (租户, 查询ID) 的条目
    pub fn contains(&self, tenant: &TenantId, id: QueryId) -> bool {
        self.queries
            .read()
            .get(tenant)
            .is_some_and(|m| m.contains_key(&id))
    }

    /// 条目状态
    pub fn state(&self, tenant: &TenantId, id: QueryId) -> Option<QueryState> {
        self.queries
            .read()
            .get(tenant)
            .and_then(|m| m.get(&id))
            .map(|entry| {
                if entry.is_checked_out() {
                    QueryState::CheckedOut
                } else {
                    QueryState::Resident
                }
            })
    }

    pub fn len(&self) -> usize {
        self.queries.read().values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 获取所有条目信息
    pub fn list_queries(&self) -> Vec<QueryEntryInfo> {
        let now = self.clock.now();
        let queries = self.queries.read();
        let mut infos: Vec<QueryEntryInfo> = queries
            .values()
            .flat_map(|m| m.values())
            .map(|entry| entry.info(now))
            .collect();
        drop(queries);

        infos.sort_by(|a, b| a.tenant.cmp(&b.tenant).then(a.id.cmp(&b.id)));
        infos
    }

    /// 获取注册表统计
    pub fn stats(&self) -> RegistryStats {
        let queries = self.queries.read();
        let mut stats = RegistryStats {
            tenants: queries.len(),
            ..RegistryStats::default()
        };
        for entry in queries.values().flat_map(|m| m.values()) {
            if entry.is_checked_out() {
                stats.checked_out_queries += 1;
            } else {
                stats.resident_queries += 1;
            }
        }
        stats
    }
}

impl<Q: RegisteredQuery> Default for QueryRegistry<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: RegisteredQuery> Drop for QueryRegistry<Q> {
    fn drop(&mut self) {
        let queries = std::mem::take(self.queries.get_mut());
        let mut resident = 0usize;
        let mut checked_out = 0usize;
        for entry in queries.into_values().flat_map(|m| m.into_values()) {
            if entry.is_checked_out() {
                checked_out += 1;
            } else {
                resident += 1;
            }
            entry.release();
        }

        if checked_out > 0 {
            warn!(
                "Query registry dropped with {} queries still checked out",
                checked_out
            );
        }
        if resident > 0 {
            info!("Query registry released {} resident queries on shutdown", resident);
        }
    }
}

impl<Q: RegisteredQuery> std::fmt::Debug for QueryRegistry<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRegistry")
            .field("default_ttl", &self.default_ttl)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
