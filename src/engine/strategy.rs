// ==========================================
// PPM 资质覆盖规划系统 - 优化策略定义
// ==========================================
// 用途：
// - 所有优化策略统一为 StrategyProfile 配置值（目标权重 + 硬/软约束集合）；
// - 同一个 AssignmentOptimizer 按配置执行，不为策略复制代码路径；
// - 多策略可并发试算，结果按评分择优。

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::strategy_profile::{CustomStrategyParameters, CustomStrategyProfile};
use serde::{Deserialize, Serialize};

/// 预设优化策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    Balanced,
    CoverageMax,
    ConstraintEnhanced,
    Exact,
    ProgressiveTraining,
}

impl OptimizationStrategy {
    pub const ALL: [OptimizationStrategy; 5] = [
        OptimizationStrategy::Balanced,
        OptimizationStrategy::CoverageMax,
        OptimizationStrategy::ConstraintEnhanced,
        OptimizationStrategy::Exact,
        OptimizationStrategy::ProgressiveTraining,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationStrategy::Balanced => "balanced",
            OptimizationStrategy::CoverageMax => "coverage_max",
            OptimizationStrategy::ConstraintEnhanced => "constraint_enhanced",
            OptimizationStrategy::Exact => "exact",
            OptimizationStrategy::ProgressiveTraining => "progressive_training",
        }
    }

    pub fn title_cn(&self) -> &'static str {
        match self {
            OptimizationStrategy::Balanced => "均衡方案",
            OptimizationStrategy::CoverageMax => "覆盖优先",
            OptimizationStrategy::ConstraintEnhanced => "约束强化",
            OptimizationStrategy::Exact => "精确搜索",
            OptimizationStrategy::ProgressiveTraining => "渐进培训",
        }
    }
}

impl Default for OptimizationStrategy {
    fn default() -> Self {
        OptimizationStrategy::Balanced
    }
}

impl std::str::FromStr for OptimizationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "balanced" => Ok(OptimizationStrategy::Balanced),
            "coverage_max" | "coverage-max" | "maximum" => Ok(OptimizationStrategy::CoverageMax),
            "constraint_enhanced" | "constraint-enhanced" => {
                Ok(OptimizationStrategy::ConstraintEnhanced)
            }
            "exact" | "milp" => Ok(OptimizationStrategy::Exact),
            "progressive_training" | "progressive-training" | "training" => {
                Ok(OptimizationStrategy::ProgressiveTraining)
            }
            other => Err(format!("未知策略类型: {}", other)),
        }
    }
}

// ==========================================
// 策略配置组成部分
// ==========================================

/// 约束模式：硬约束必须满足；软约束计入目标惩罚
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintMode {
    Hard,
    Soft,
}

/// 求解不可行时的松弛步骤（按顺序逐次应用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relaxation {
    /// 次目标（资质数量惩罚）权重归零
    DropSecondaryObjective,
    /// 工作量容差加倍（上限 100%）
    WidenWorkloadTolerance,
}

/// 矩阵起点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixSeed {
    /// 从空矩阵开始设计
    Empty,
    /// 保留当前持有资质，只做增量培训
    CurrentHoldings,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub coverage: f64,
    pub qualification: f64,
    pub balance: f64,
    pub training: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    pub workload_balance: ConstraintMode,
    pub class_split: ConstraintMode,
    pub workload_tolerance_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    /// 贪心 + 修复 + 剪枝 的最大轮数
    pub max_passes: usize,
    /// 是否启用交换邻域
    pub swap_moves: bool,
}

// ==========================================
// StrategyProfile - 解析后的执行策略
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    /// 对外展示/审计使用（例如 balanced / custom:night_cover）
    pub strategy_key: String,
    pub base_strategy: OptimizationStrategy,
    pub title: String,
    pub objective: ObjectiveWeights,
    pub constraints: ConstraintSet,
    pub seed: MatrixSeed,
    pub search: SearchLimits,
    pub max_relaxations: usize,
    pub relaxation_order: Vec<Relaxation>,
}

impl StrategyProfile {
    /// 预设策略
    ///
    /// # 参数
    /// - `strategy`: 预设策略
    /// - `workload_tolerance_pct`: 运行参数中的班组均值容差
    pub fn preset(strategy: OptimizationStrategy, workload_tolerance_pct: f64) -> Self {
        use ConstraintMode::{Hard, Soft};

        let (objective, workload_balance, class_split, tolerance, seed, search) = match strategy {
            OptimizationStrategy::Balanced => (
                ObjectiveWeights { coverage: 100.0, qualification: 1.0, balance: 5.0, training: 0.0 },
                Hard,
                Hard,
                workload_tolerance_pct,
                MatrixSeed::Empty,
                SearchLimits { max_passes: 3, swap_moves: false },
            ),
            OptimizationStrategy::CoverageMax => (
                ObjectiveWeights { coverage: 100.0, qualification: 0.1, balance: 0.0, training: 0.0 },
                Soft,
                Soft,
                workload_tolerance_pct,
                MatrixSeed::Empty,
                SearchLimits { max_passes: 3, swap_moves: false },
            ),
            OptimizationStrategy::ConstraintEnhanced => (
                ObjectiveWeights { coverage: 100.0, qualification: 1.0, balance: 10.0, training: 0.0 },
                Hard,
                Hard,
                workload_tolerance_pct * 0.5,
                MatrixSeed::Empty,
                SearchLimits { max_passes: 4, swap_moves: false },
            ),
            OptimizationStrategy::Exact => (
                ObjectiveWeights { coverage: 100.0, qualification: 1.0, balance: 5.0, training: 0.0 },
                Hard,
                Hard,
                workload_tolerance_pct,
                MatrixSeed::Empty,
                SearchLimits { max_passes: 8, swap_moves: true },
            ),
            OptimizationStrategy::ProgressiveTraining => (
                ObjectiveWeights { coverage: 100.0, qualification: 0.5, balance: 2.0, training: 2.0 },
                Soft,
                Soft,
                workload_tolerance_pct,
                MatrixSeed::CurrentHoldings,
                SearchLimits { max_passes: 3, swap_moves: false },
            ),
        };

        Self {
            strategy_key: strategy.as_str().to_string(),
            base_strategy: strategy,
            title: strategy.title_cn().to_string(),
            objective,
            constraints: ConstraintSet {
                workload_balance,
                class_split,
                workload_tolerance_pct: tolerance,
            },
            seed,
            search,
            max_relaxations: 1,
            relaxation_order: vec![
                Relaxation::DropSecondaryObjective,
                Relaxation::WidenWorkloadTolerance,
            ],
        }
    }

    /// 由自定义策略解析
    ///
    /// 基础策略无法识别或参数越界时返回 ConfigError
    pub fn from_custom(
        custom: &CustomStrategyProfile,
        workload_tolerance_pct: f64,
    ) -> ConfigResult<Self> {
        let base: OptimizationStrategy =
            custom
                .base_strategy
                .parse()
                .map_err(|message| ConfigError::InvalidValue {
                    key: format!("custom_strategy/{}", custom.strategy_id),
                    message,
                })?;

        let mut profile = Self::preset(base, workload_tolerance_pct);
        profile.strategy_key = format!("custom:{}", custom.strategy_id);
        profile.title = custom.title.clone();
        profile.apply_parameters(&custom.parameters, &custom.strategy_id)?;
        Ok(profile)
    }

    fn apply_parameters(
        &mut self,
        params: &CustomStrategyParameters,
        strategy_id: &str,
    ) -> ConfigResult<()> {
        let check = |name: &str, value: f64| -> ConfigResult<f64> {
            if value.is_finite() && value >= 0.0 {
                Ok(value)
            } else {
                Err(ConfigError::InvalidValue {
                    key: format!("custom_strategy/{}.{}", strategy_id, name),
                    message: format!("权重必须为非负数: {}", value),
                })
            }
        };

        if let Some(v) = params.coverage_weight {
            self.objective.coverage = check("coverage_weight", v)?;
        }
        if let Some(v) = params.qualification_weight {
            self.objective.qualification = check("qualification_weight", v)?;
        }
        if let Some(v) = params.balance_weight {
            self.objective.balance = check("balance_weight", v)?;
        }
        if let Some(v) = params.training_weight {
            self.objective.training = check("training_weight", v)?;
        }
        if let Some(v) = params.workload_tolerance_pct {
            self.constraints.workload_tolerance_pct = check("workload_tolerance_pct", v)?.min(1.0);
        }
        if let Some(hard) = params.workload_balance_hard {
            self.constraints.workload_balance = if hard { ConstraintMode::Hard } else { ConstraintMode::Soft };
        }
        if let Some(hard) = params.class_split_hard {
            self.constraints.class_split = if hard { ConstraintMode::Hard } else { ConstraintMode::Soft };
        }
        if let Some(n) = params.max_relaxations {
            self.max_relaxations = n;
        }
        Ok(())
    }

    /// 应用一步松弛，返回新的策略配置
    pub fn relaxed(&self, step: Relaxation) -> Self {
        let mut next = self.clone();
        match step {
            Relaxation::DropSecondaryObjective => {
                next.objective.qualification = 0.0;
                next.objective.training = 0.0;
            }
            Relaxation::WidenWorkloadTolerance => {
                let widened = (self.constraints.workload_tolerance_pct * 2.0).max(0.1);
                next.constraints.workload_tolerance_pct = widened.min(1.0);
            }
        }
        next
    }
}
