// ==========================================
// PPM 资质覆盖规划系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite (配置) + rayon/tokio (并发)
// 系统定位: 决策支持系统 (培训与分配由人工最终确认)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 仿真/优化/评估
pub mod engine;

// 配置层 - 静态表与运行参数
pub mod config;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CoverageStatus, FrequencyClass, HandoverPolicy, RideClass, RiskLevel, Role};

// 领域实体
pub use domain::{Engineer, PpmWindow, QualificationMatrix, Requirement, Ride, RotationAssignment, ShiftCode};

// 配置
pub use config::{ConfigError, ConfigManager, InMemoryConfig, PlanningConfigReader, RunSettings, StaticTables};

// 引擎
pub use engine::{
    AssignmentOptimizer, CoverageReport, CoverageSimulator, EngineError, InMemorySources,
    PlanningPipeline, PriorityScorer, RiskClassifier, RiskReport, RunReport, RunState,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "PPM 资质覆盖规划系统";
