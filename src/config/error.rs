// ==========================================
// PPM 资质覆盖规划系统 - 配置层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: ConfigError 为致命错误,在仿真开始前终止流程
// ==========================================

use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    // ===== 静态表一致性错误 =====
    #[error("维护窗口引用了未定义的班次: window={window_id}, shift={shift_code}")]
    UndefinedShiftReference { window_id: String, shift_code: String },

    #[error("时长必须为正数 ({entity}={id}): {value}")]
    NonPositiveDuration { entity: String, id: String, value: f64 },

    #[error("重复定义 ({entity}): {id}")]
    DuplicateId { entity: String, id: String },

    #[error("维护窗口未声明任何适用频次: {0}")]
    EmptyFrequencySet(String),

    // ===== 配置值错误 =====
    #[error("配置值无效 (key={key}): {message}")]
    InvalidValue { key: String, message: String },

    #[error("配置项缺失: {0}")]
    MissingKey(String),

    // ===== 存储错误 =====
    #[error("配置存储访问失败: {0}")]
    Storage(String),

    #[error("配置解析失败: {0}")]
    Parse(String),

    #[error("锁获取失败: {0}")]
    LockError(String),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ConfigError {
    fn from(err: rusqlite::Error) -> Self {
        ConfigError::Storage(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
