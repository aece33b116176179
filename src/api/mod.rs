use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;

pub mod cursor;

use crate::api::cursor::PagedCursor;
use crate::config::Config;
use crate::core::ids::{QueryId, TenantId};
use crate::query::{spawn_sweeper, QueryRegistry};

/// 模拟负载参数
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub clients: usize,
    pub queries_per_client: u64,
    pub rows_per_query: u64,
    pub batch_size: u64,
    /// 每隔多少个查询放弃一个（只取第一批就不再访问），0 表示不放弃
    pub abandon_every: u64,
    /// 被放弃的查询的 ttl
    pub abandon_ttl: Duration,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            clients: 4,
            queries_per_client: 25,
            rows_per_query: 1000,
            batch_size: 100,
            abandon_every: 5,
            abandon_ttl: Duration::from_millis(500),
        }
    }
}

/// 模拟结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub pages_fetched: u64,
    pub completed_queries: u64,
    pub abandoned_queries: u64,
    pub reclaimed_queries: u64,
    pub remaining_queries: usize,
}

/// 加载配置，失败时回退到默认配置
pub fn load_config(config_path: &str) -> Config {
    match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Failed to load config from '{}': {}, using default config",
                config_path, e
            );
            Config::default()
        }
    }
}

/// 启动注册表与后台清扫任务，直到收到关闭信号
///
/// 注册表的生命周期与进程绑定：关闭时先停止清扫任务，再释放注册表中剩余的查询。
pub async fn start_service(config: &Config) -> Result<()> {
    let registry: Arc<QueryRegistry<PagedCursor>> =
        Arc::new(QueryRegistry::from_config(&config.registry));
    let sweeper = spawn_sweeper(Arc::clone(&registry), config.registry.sweep_interval());
    info!(
        "Query registry service started: default_ttl={:?}",
        registry.default_ttl()
    );

    shutdown_signal().await;

    let reclaimed = sweeper.shutdown().await;
    info!(
        "Query registry service stopping: reclaimed={}, stats={:?}",
        reclaimed,
        registry.stats()
    );
    drop(registry);
    Ok(())
}

/// 以多个并发客户端分页读取查询结果，放弃的查询交给后台清扫回收
pub async fn run_simulation(config: &Config, options: SimulationOptions) -> Result<SimulationReport> {
    let registry: Arc<QueryRegistry<PagedCursor>> =
        Arc::new(QueryRegistry::from_config(&config.registry));
    let sweeper = spawn_sweeper(Arc::clone(&registry), config.registry.sweep_interval());
    info!("Simulation started: {:?}", options);

    let mut tasks = Vec::with_capacity(options.clients);
    for client in 0..options.clients {
        let registry = Arc::clone(&registry);
        let options = options.clone();
        tasks.push(tokio::spawn(async move {
            run_client(&registry, client, &options).await
        }));
    }

    let mut report = SimulationReport::default();
    for task in tasks {
        let client_report = task.await??;
        report.pages_fetched += client_report.pages_fetched;
        report.completed_queries += client_report.completed_queries;
        report.abandoned_queries += client_report.abandoned_queries;
    }

    // 等待被放弃的查询过期并被清扫
    let deadline =
        Instant::now() + options.abandon_ttl * 2 + config.registry.sweep_interval() * 10;
    while !registry.is_empty() && Instant::now() < deadline {
        tokio::time::sleep(config.registry.sweep_interval()).await;
    }

    report.reclaimed_queries = sweeper.shutdown().await;
    report.remaining_queries = registry.len();
    if report.remaining_queries > 0 {
        warn!(
            "Simulation finished with {} queries still registered",
            report.remaining_queries
        );
    }
    info!("Simulation finished: {:?}", report);
    Ok(report)
}

async fn run_client(
    registry: &QueryRegistry<PagedCursor>,
    client: usize,
    options: &SimulationOptions,
) -> Result<SimulationReport> {
    let tenant = TenantId::new(format!("tenant_{}", client % 2));
    let mut report = SimulationReport::default();

    for n in 0..options.queries_per_client {
        let id = QueryId::new(client as u64 * options.queries_per_client + n);
        let abandon = options.abandon_every > 0 && (n + 1) % options.abandon_every == 0;
        let ttl = abandon.then_some(options.abandon_ttl);
        let cursor = PagedCursor::new(options.rows_per_query, options.batch_size);
        registry.insert(tenant.clone(), id, cursor, ttl)?;

        loop {
            let Some(mut lease) = registry.open(&tenant, id)? else {
                anyhow::bail!("query {}/{} disappeared while paging", tenant, id);
            };
            lease.next_batch();
            report.pages_fetched += 1;
            let has_more = lease.has_more();
            registry.close(lease, None)?;

            if abandon {
                report.abandoned_queries += 1;
                break;
            }
            if !has_more {
                registry.destroy(&tenant, id)?;
                report.completed_queries += 1;
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    Ok(report)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
