//! 查询注册表错误类型
//!
//! 所有错误都是同步、局部的：失败的操作不会改变注册表的内容。

use std::fmt;
use thiserror::Error;

use crate::core::error::codes::{ErrorCode, ToPublicError};
use crate::core::ids::{QueryId, TenantId};

/// 注册表操作结果类型
pub type RegistryResult<T> = Result<T, RegistryError>;

/// 查询注册表错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("查询已存在: tenant={tenant}, id={id}")]
    AlreadyExists { tenant: TenantId, id: QueryId },

    #[error("查询正在被使用: tenant={tenant}, id={id}")]
    AlreadyInUse { tenant: TenantId, id: QueryId },

    #[error("查询不存在: tenant={tenant}, id={id}")]
    NotFound { tenant: TenantId, id: QueryId },

    #[error("查询未被打开: tenant={tenant}, id={id}")]
    NotOpen { tenant: TenantId, id: QueryId },
}

impl RegistryError {
    pub fn already_exists(tenant: &TenantId, id: QueryId) -> Self {
        Self::AlreadyExists {
            tenant: tenant.clone(),
            id,
        }
    }

    pub fn already_in_use(tenant: &TenantId, id: QueryId) -> Self {
        Self::AlreadyInUse {
            tenant: tenant.clone(),
            id,
        }
    }

    pub fn not_found(tenant: &TenantId, id: QueryId) -> Self {
        Self::NotFound {
            tenant: tenant.clone(),
            id,
        }
    }

    pub fn not_open(tenant: &TenantId, id: QueryId) -> Self {
        Self::NotOpen {
            tenant: tenant.clone(),
            id,
        }
    }

    /// 出错的 (租户, 查询ID)
    pub fn key(&self) -> (&TenantId, QueryId) {
        match self {
            RegistryError::AlreadyExists { tenant, id }
            | RegistryError::AlreadyInUse { tenant, id }
            | RegistryError::NotFound { tenant, id }
            | RegistryError::NotOpen { tenant, id } => (tenant, *id),
        }
    }
}

impl ToPublicError for RegistryError {
    fn to_error_code(&self) -> ErrorCode {
        match self {
            RegistryError::AlreadyExists { .. } => ErrorCode::ResourceAlreadyExists,
            RegistryError::AlreadyInUse { .. } => ErrorCode::Conflict,
            RegistryError::NotFound { .. } => ErrorCode::ResourceNotFound,
            RegistryError::NotOpen { .. } => ErrorCode::ConstraintViolation,
        }
    }

    fn to_public_message(&self) -> String {
        self.to_string()
    }
}

/// 插入失败时的错误，携带调用方交出的查询对象
///
/// 插入失败不会转移所有权，调用方通过 [`InsertError::into_query`] 取回对象。
pub struct InsertError<Q> {
    error: RegistryError,
    query: Q,
}

impl<Q> InsertError<Q> {
    pub(crate) fn new(error: RegistryError, query: Q) -> Self {
        Self { error, query }
    }

    pub fn error(&self) -> &RegistryError {
        &self.error
    }

    pub fn into_query(self) -> Q {
        self.query
    }

    pub fn into_parts(self) -> (RegistryError, Q) {
        (self.error, self.query)
    }
}

impl<Q> fmt::Debug for InsertError<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<Q> fmt::Display for InsertError<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<Q> std::error::Error for InsertError<Q> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<Q> From<InsertError<Q>> for RegistryError {
    fn from(err: InsertError<Q>) -> Self {
        err.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let tenant = TenantId::from("db");
        let id = QueryId::new(1);

        assert_eq!(
            RegistryError::already_exists(&tenant, id).to_error_code(),
            ErrorCode::ResourceAlreadyExists
        );
        assert_eq!(
            RegistryError::already_in_use(&tenant, id).to_error_code(),
            ErrorCode::Conflict
        );
        assert_eq!(
            RegistryError::not_found(&tenant, id).to_error_code(),
            ErrorCode::ResourceNotFound
        );
        assert_eq!(
            RegistryError::not_open(&tenant, id).to_error_code(),
            ErrorCode::ConstraintViolation
        );
    }

    #[test]
    fn test_error_message_names_key() {
        let err = RegistryError::not_found(&TenantId::from("db"), QueryId::new(17));
        assert_eq!(err.to_string(), "查询不存在: tenant=db, id=17");
        assert_eq!(err.key(), (&TenantId::from("db"), QueryId::new(17)));

        let public = err.to_public_error();
        assert_eq!(public.code, ErrorCode::ResourceNotFound);
        assert_eq!(public.message, err.to_string());
    }

    #[test]
    fn test_insert_error_returns_query() {
        let err = InsertError::new(
            RegistryError::already_exists(&TenantId::from("db"), QueryId::new(3)),
            String::from("payload"),
        );
        assert!(matches!(err.error(), RegistryError::AlreadyExists { .. }));
        assert_eq!(err.to_string(), "查询已存在: tenant=db, id=3");
        assert_eq!(err.into_query(), "payload");
    }
}
