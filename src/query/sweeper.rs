//! 后台清扫任务
//!
//! 按固定间隔调用 [`QueryRegistry::expire_queries`]。注册表本身不依赖清扫频率，
//! 频率只决定过期查询被回收的延迟。

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::lease::RegisteredQuery;
use super::registry::QueryRegistry;

/// 默认清扫间隔
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// 清扫任务句柄
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl SweeperHandle {
    /// 停止清扫任务并等待其退出，返回任务生命周期内回收的查询总数
    pub async fn shutdown(self) -> u64 {
        let _ = self.shutdown_tx.send(true);
        match self.task.await {
            Ok(reclaimed) => reclaimed,
            Err(e) => {
                warn!("Query sweeper task ended abnormally: {}", e);
                0
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// 启动后台清扫任务，必须在 tokio 运行时内调用
pub fn spawn_sweeper<Q: RegisteredQuery>(
    registry: Arc<QueryRegistry<Q>>,
    interval: Duration,
) -> SweeperHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(sweep_loop(registry, interval, shutdown_rx));
    info!("Query sweeper started, interval={:?}", interval);
    SweeperHandle { shutdown_tx, task }
}

async fn sweep_loop<Q: RegisteredQuery>(
    registry: Arc<QueryRegistry<Q>>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut total: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let reclaimed = registry.expire_queries();
                if reclaimed > 0 {
                    info!("Query sweeper reclaimed {} expired queries", reclaimed);
                    total += reclaimed as u64;
                }
            }
            changed = shutdown_rx.changed() => {
                let stop = changed.is_err() || *shutdown_rx.borrow();
                if stop {
                    break;
                }
            }
        }
    }

    debug!("Query sweeper stopped, reclaimed {} queries in total", total);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::{QueryId, TenantId};
    use crate::query::clock::ManualClock;
    use crate::query::registry::DEFAULT_QUERY_TTL;

    struct NoopQuery;

    impl RegisteredQuery for NoopQuery {
        fn teardown(self) {}
    }

    #[tokio::test]
    async fn test_sweeper_reclaims_expired_queries() {
        let clock = Arc::new(ManualClock::new());
        let registry = Arc::new(QueryRegistry::with_clock(clock.clone(), DEFAULT_QUERY_TTL));
        let tenant = TenantId::from("_system");

        registry
            .insert(tenant.clone(), QueryId::new(1), NoopQuery, Some(Duration::from_secs(1)))
            .expect("insert should succeed");
        registry
            .insert(tenant.clone(), QueryId::new(2), NoopQuery, None)
            .expect("insert should succeed");
        clock.advance(Duration::from_secs(2));

        let handle = spawn_sweeper(Arc::clone(&registry), Duration::from_millis(10));
        for _ in 0..100 {
            if !registry.contains(&tenant, QueryId::new(1)) {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }

        assert!(!registry.contains(&tenant, QueryId::new(1)));
        assert!(registry.contains(&tenant, QueryId::new(2)));
        assert_eq!(handle.shutdown().await, 1);
    }

    #[tokio::test]
    async fn test_sweeper_shutdown() {
        let registry: Arc<QueryRegistry<NoopQuery>> = Arc::new(QueryRegistry::new());
        let handle = spawn_sweeper(Arc::clone(&registry), Duration::from_secs(3600));
        assert!(!handle.is_finished());
        assert_eq!(handle.shutdown().await, 0);
    }
}
