// ==========================================
// PPM 资质覆盖规划系统 - 配置层
// ==========================================
// 职责: 静态表与运行参数的加载,支持 SQLite 存储与内存两种来源
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod config_reader;
pub mod error;
pub mod settings;
pub mod strategy_profile;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use config_reader::{InMemoryConfig, PlanningConfigReader};
pub use error::{ConfigError, ConfigResult};
pub use settings::{RunSettings, StaticTables};
pub use strategy_profile::{CustomStrategyParameters, CustomStrategyProfile};
