// ==========================================
// PPM 资质覆盖规划系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod matrix;
pub mod roster;
pub mod shift;
pub mod types;

// 重导出核心类型
pub use matrix::QualificationMatrix;
pub use roster::{Engineer, Requirement, Ride, RotationAssignment};
pub use shift::{PpmWindow, ShiftCode, TimeWindow};
pub use types::{CoverageStatus, FrequencyClass, HandoverPolicy, RideClass, RiskLevel, Role};
