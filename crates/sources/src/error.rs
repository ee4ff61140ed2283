//! Sources 错误类型

use contracts::{ContractError, SensorKind};
use thiserror::Error;

/// Source 层错误
#[derive(Debug, Error)]
pub enum SourceError {
    /// 数据源构建失败
    #[error("failed to build source for kind '{kind}': {message}")]
    BuildFailed {
        /// 传感器流类别
        kind: SensorKind,
        /// 错误消息
        message: String,
    },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl SourceError {
    /// 创建构建失败错误
    pub fn build_failed(kind: SensorKind, message: impl Into<String>) -> Self {
        Self::BuildFailed {
            kind,
            message: message.into(),
        }
    }
}

/// Sources Result 类型别名
pub type Result<T> = std::result::Result<T, SourceError>;
