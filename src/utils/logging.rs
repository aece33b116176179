// 日志工具模块
//
// 注册表进程只有一个 flexi_logger 实例，句柄保存在这里，退出前 flush

use crate::config::LogConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use parking_lot::{const_mutex, Mutex};

static LOGGER_HANDLE: Mutex<Option<LoggerHandle>> = const_mutex(None);

/// 按 `[log]` 配置启动异步文件日志，文件按大小轮转
pub fn init(config: &LogConfig) -> Result<(), FlexiLoggerError> {
    let handle = Logger::try_with_str(&config.level)?
        .log_to_file(
            FileSpec::default()
                .basename(&config.file)
                .directory(&config.dir),
        )
        .rotate(
            Criterion::Size(config.max_file_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.max_files),
        )
        .write_mode(WriteMode::Async)
        .append()
        .start()?;

    *LOGGER_HANDLE.lock() = Some(handle);
    log::info!(
        "注册表日志已启动: level={}, path={}/{}",
        config.level,
        config.dir,
        config.file
    );
    Ok(())
}

/// 刷新异步日志并释放句柄，返回日志系统此前是否处于启动状态
pub fn shutdown() -> bool {
    match LOGGER_HANDLE.lock().take() {
        Some(handle) => {
            handle.flush();
            // drop 时等待异步写线程退出
            true
        }
        None => false,
    }
}
