pub mod error;
pub mod ids;

// 错误和结果类型
pub use error::{
    ConfigError, ConfigResult, ErrorCode, InsertError, PublicError, RegistryError,
    RegistryResult, ToPublicError,
};

// 标识类型
pub use ids::{QueryId, TenantId};
