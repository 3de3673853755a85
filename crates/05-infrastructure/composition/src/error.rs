//! 上下文错误类型

use ioc_common::{BeanError, DestructionErrors};
use std::path::PathBuf;
use thiserror::Error;

/// 应用上下文错误
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("上下文 '{display_name}' 已经刷新过，不支持重复刷新")]
    AlreadyRefreshed { display_name: String },

    #[error("上下文 '{display_name}' 尚未刷新")]
    NotActive { display_name: String },

    #[error("上下文 '{display_name}' 已关闭")]
    Closed { display_name: String },

    #[error("配置文件不存在: {}", .path.display())]
    ConfigFileMissing { path: PathBuf },

    #[error("配置加载失败: {source}")]
    Config {
        #[from]
        source: config::ConfigError,
    },

    #[error(transparent)]
    Bean(#[from] BeanError),

    #[error("关闭上下文时 {0}")]
    Destruction(#[from] DestructionErrors),
}

impl ContextError {
    /// 内部的 Bean 错误
    pub fn as_bean_error(&self) -> Option<&BeanError> {
        match self {
            Self::Bean(e) => Some(e),
            _ => None,
        }
    }
}

/// 结果类型别名
pub type ContextResult<T> = Result<T, ContextError>;
