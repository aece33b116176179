//! 自定义断言辅助模块
//!
//! 提供注册表测试中的常用断言函数

use query_registry::core::RegistryError;

/// 断言结果成功，返回内部值
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
    result.expect("操作应该成功")
}

/// 断言 open 返回了查询
pub fn assert_opened<T>(result: Result<Option<T>, RegistryError>) -> T {
    result
        .expect("open 应该成功")
        .expect("查询应该存在")
}

/// 断言 open 返回空
pub fn assert_absent<T>(result: Result<Option<T>, RegistryError>) {
    match result {
        Ok(None) => {}
        Ok(Some(_)) => panic!("查询应该不存在"),
        Err(e) => panic!("open 不应该失败: {}", e),
    }
}

/// 断言失败且错误类型符合预期
pub fn assert_registry_err<T>(result: Result<T, RegistryError>, matches: fn(&RegistryError) -> bool) {
    match result {
        Ok(_) => panic!("操作应该失败"),
        Err(e) => assert!(matches(&e), "错误类型不符合预期: {:?}", e),
    }
}
