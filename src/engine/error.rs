// ==========================================
// PPM 资质覆盖规划系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 除 ConfigError 外的错误均不终止流水线,
//       以 DataIssue / 缺口清单的形式累积到运行报告
// ==========================================

use crate::config::error::ConfigError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据引用错误: {0}")]
    Data(String),

    #[error("资质分配不可行: {0}")]
    InfeasibleAssignment(String),

    #[error("求解超时: 已运行 {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("外部数据源访问失败: {0}")]
    Source(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

// ==========================================
// DataIssue - 非致命数据问题
// ==========================================
// 花名册/要求/轮班引用了未知实体,该实体作为未解决缺口上报,流程继续
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIssue {
    pub entity: String,    // engineer / ride / rotation / requirement
    pub id: String,
    pub reason: String,
}

impl DataIssue {
    pub fn new(entity: &str, id: &str, reason: impl Into<String>) -> Self {
        Self {
            entity: entity.to_string(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<DataIssue> for EngineError {
    fn from(issue: DataIssue) -> Self {
        EngineError::Data(format!("{}={}: {}", issue.entity, issue.id, issue.reason))
    }
}
