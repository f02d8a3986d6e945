// ==========================================
// PPM 资质覆盖规划系统 - 引擎层
// ==========================================
// 职责: 覆盖仿真、资质分配优化、风险与培训优先级评估
// 红线: 引擎之间只传递不可变的资质矩阵快照
// ==========================================

pub mod coverage;
pub mod error;
pub mod optimizer;
pub mod orchestrator;
pub mod ppm_catalog;
pub mod priority;
pub mod requirement_catalog;
pub mod risk;
pub mod shift_calendar;
pub mod sources;
pub mod strategy;

// 重导出核心引擎
pub use coverage::{ClassCoverage, CoverageReport, CoverageSimulator, Horizon, RequirementCoverage};
pub use error::{DataIssue, EngineError, EngineResult};
pub use optimizer::{
    AssignmentOptimizer, AssignmentProblem, AssignmentSolver, Candidate, ConstraintViolation,
    LocalSearchSolver, ObjectiveScore, OptimizationResult, OptimizationStatus, Shortfall,
    SolveBudget, SolveOutcome,
};
pub use orchestrator::{PlanningPipeline, RejectionReason, RunReport, RunState, StrategyComparison};
pub use ppm_catalog::PpmWindowCatalog;
pub use priority::{PriorityEntry, PriorityScorer};
pub use requirement_catalog::RequirementCatalog;
pub use risk::{QualificationRisk, RiskClassifier, RiskReport};
pub use shift_calendar::ShiftCalendar;
pub use sources::{InMemorySources, RequirementSource, RosterSource, RotationSource};
pub use strategy::{
    ConstraintMode, ConstraintSet, MatrixSeed, ObjectiveWeights, OptimizationStrategy,
    Relaxation, SearchLimits, StrategyProfile,
};
