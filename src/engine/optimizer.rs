// ==========================================
// PPM 资质覆盖规划系统 - 资质分配优化引擎
// ==========================================
// 职责: 在角色/归属/工作量/等级均衡约束下,搜索覆盖率最高、授予资质最少的矩阵
// 输入: AssignmentProblem (花名册 + 要求目录 + 覆盖仿真器) + StrategyProfile
// 输出: OptimizationResult (矩阵 + 评分 + 缺口清单 + 已应用的松弛步骤)
// 红线: 求解器只通过 AssignmentSolver trait 调用;超时返回现有最优解
// ==========================================

mod local_search;

pub use local_search::LocalSearchSolver;

use crate::domain::matrix::QualificationMatrix;
use crate::domain::roster::Engineer;
use crate::domain::types::{FrequencyClass, RideClass, Role};
use crate::engine::coverage::{CoverageReport, CoverageSimulator};
use crate::engine::requirement_catalog::RequirementCatalog;
use crate::engine::strategy::{
    ConstraintSet, MatrixSeed, ObjectiveWeights, Relaxation, SearchLimits, StrategyProfile,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 每周/每月要求的达标线
pub const PERIODIC_COVERAGE_TARGET: f64 = 0.8;

// ==========================================
// AssignmentProblem - 求解输入
// ==========================================
#[derive(Clone)]
pub struct AssignmentProblem {
    pub engineers: Arc<Vec<Engineer>>,
    pub catalog: Arc<RequirementCatalog>,
    pub simulator: Arc<CoverageSimulator>,
    /// 当前持有资质 (培训基线)
    pub current: QualificationMatrix,
}

impl AssignmentProblem {
    pub fn new(
        engineers: Arc<Vec<Engineer>>,
        catalog: Arc<RequirementCatalog>,
        simulator: Arc<CoverageSimulator>,
    ) -> Self {
        let current = QualificationMatrix::from_holdings(&engineers);
        Self {
            engineers,
            catalog,
            simulator,
            current,
        }
    }

    /// 求解起点矩阵
    pub fn seed_matrix(&self, seed: MatrixSeed) -> QualificationMatrix {
        match seed {
            MatrixSeed::Empty => QualificationMatrix::empty(),
            MatrixSeed::CurrentHoldings => self.current.clone(),
        }
    }

    /// 工程师可激活的设施: 归属于该工程师、且至少含一项角色合格的资质
    ///
    /// # 返回
    /// (设施ID, 设施等级, 角色合格资质集),按设施ID升序
    pub fn ride_options(&self, engineer: &Engineer) -> Vec<(String, RideClass, BTreeSet<String>)> {
        engineer
            .assigned_rides
            .iter()
            .filter_map(|ride_id| {
                let ride = self.catalog.ride(ride_id)?;
                let quals = self.catalog.qualifications_for_ride(ride_id, &engineer.roles);
                if quals.is_empty() {
                    None
                } else {
                    Some((ride_id.clone(), ride.class, quals))
                }
            })
            .collect()
    }

    /// 没有任何角色合格工程师可激活的设施
    pub fn rides_without_eligible_engineer(&self) -> Vec<String> {
        let coverable: BTreeSet<String> = self
            .engineers
            .iter()
            .flat_map(|e| self.ride_options(e).into_iter().map(|(ride_id, _, _)| ride_id))
            .collect();
        self.catalog
            .rides()
            .filter(|ride| {
                !coverable.contains(&ride.ride_id)
                    && self.catalog.requirements_for_ride(&ride.ride_id).next().is_some()
            })
            .map(|ride| ride.ride_id.clone())
            .collect()
    }
}

// ==========================================
// 求解结果
// ==========================================

/// 目标函数分项
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectiveScore {
    /// 各要求覆盖率之和
    pub coverage: f64,
    /// 相对起点矩阵新增的资质数
    pub grants: usize,
    /// 相对当前持有新增的资质数 (培训量)
    pub training: usize,
    pub imbalance: usize,
    pub total: f64,
}

impl ObjectiveScore {
    pub fn compute(
        weights: &ObjectiveWeights,
        coverage: f64,
        grants: usize,
        training: usize,
        imbalance: usize,
    ) -> Self {
        let total = weights.coverage * coverage
            - weights.qualification * grants as f64
            - weights.training * training as f64
            - weights.balance * imbalance as f64;
        Self {
            coverage,
            grants,
            training,
            imbalance,
            total,
        }
    }
}

/// 候选解
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub matrix: QualificationMatrix,
    /// 工程师 → 已激活设施
    pub activations: BTreeMap<String, BTreeSet<String>>,
    pub score: ObjectiveScore,
}

/// 硬约束违反
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintViolation {
    WorkloadAbove { team: String, engineer_id: String, rides: usize },
    WorkloadBelow { team: String, engineer_id: String, rides: usize },
    ClassSplit { team: String, class: RideClass, spread: usize },
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintViolation::WorkloadAbove { team, engineer_id, rides } => {
                write!(f, "班组 {} 工程师 {} 设施数 {} 高于均值容差", team, engineer_id, rides)
            }
            ConstraintViolation::WorkloadBelow { team, engineer_id, rides } => {
                write!(f, "班组 {} 工程师 {} 设施数 {} 低于均值容差", team, engineer_id, rides)
            }
            ConstraintViolation::ClassSplit { team, class, spread } => {
                write!(f, "班组 {} {} 类设施分配极差 {}", team, class, spread)
            }
        }
    }
}

/// 求解器输出
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Solved(Candidate),
    Infeasible {
        incumbent: Candidate,
        violations: Vec<ConstraintViolation>,
    },
    TimedOut {
        incumbent: Candidate,
    },
}

impl SolveOutcome {
    pub fn candidate(&self) -> &Candidate {
        match self {
            SolveOutcome::Solved(c) => c,
            SolveOutcome::Infeasible { incumbent, .. } => incumbent,
            SolveOutcome::TimedOut { incumbent } => incumbent,
        }
    }
}

/// 单次求解的预算
#[derive(Debug, Clone, Copy)]
pub struct SolveBudget {
    pub deadline: Option<Instant>,
    pub search: SearchLimits,
    pub seed: MatrixSeed,
}

impl SolveBudget {
    pub fn expired(&self) -> bool {
        self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }
}

// ==========================================
// AssignmentSolver - 求解器接口
// ==========================================
// 内置 LocalSearchSolver;外部 MILP 求解器可实现此 trait 替换
pub trait AssignmentSolver: Send + Sync {
    fn name(&self) -> &str;

    fn solve(
        &self,
        problem: &AssignmentProblem,
        objective: &ObjectiveWeights,
        constraints: &ConstraintSet,
        budget: &SolveBudget,
    ) -> SolveOutcome;
}

// ==========================================
// 优化结果
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationStatus {
    Solved,
    Infeasible,
    TimedOut,
}

/// 未达标要求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortfall {
    pub ride_id: String,
    pub qualification_id: String,
    pub frequency: FrequencyClass,
    pub role: Option<Role>,
    pub coverage_fraction: f64,
    pub target: f64,
}

/// 达标线: 每日 100%,每周/每月 80%
pub fn coverage_target(frequency: FrequencyClass) -> f64 {
    match frequency {
        FrequencyClass::Daily => 1.0,
        FrequencyClass::Weekly | FrequencyClass::Monthly => PERIODIC_COVERAGE_TARGET,
    }
}

/// 从覆盖报告提取未达标要求
pub fn shortfall_of(report: &CoverageReport) -> Vec<Shortfall> {
    report
        .requirements
        .iter()
        .filter(|r| r.coverage_fraction < coverage_target(r.frequency))
        .map(|r| Shortfall {
            ride_id: r.ride_id.clone(),
            qualification_id: r.qualification_id.clone(),
            frequency: r.frequency,
            role: r.role,
            coverage_fraction: r.coverage_fraction,
            target: coverage_target(r.frequency),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub strategy_key: String,
    pub solver: String,
    pub status: OptimizationStatus,
    pub candidate: Candidate,
    pub coverage: CoverageReport,
    pub shortfall: Vec<Shortfall>,
    pub violations: Vec<ConstraintViolation>,
    pub relaxations_applied: Vec<Relaxation>,
    pub elapsed_ms: u64,
}

impl OptimizationResult {
    pub fn timed_out(&self) -> bool {
        self.status == OptimizationStatus::TimedOut
    }
}

// ==========================================
// AssignmentOptimizer - 优化引擎
// ==========================================
pub struct AssignmentOptimizer {
    solver: Arc<dyn AssignmentSolver>,
}

impl AssignmentOptimizer {
    pub fn new(solver: Arc<dyn AssignmentSolver>) -> Self {
        Self { solver }
    }

    pub fn with_local_search() -> Self {
        Self::new(Arc::new(LocalSearchSolver::new()))
    }

    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    /// 求解并按松弛阶梯处理不可行
    ///
    /// # 参数
    /// - `problem`: 求解输入
    /// - `profile`: 策略配置
    /// - `timeout`: 整个阶梯共享的时限
    pub fn optimize(
        &self,
        problem: &AssignmentProblem,
        profile: &StrategyProfile,
        timeout: Option<Duration>,
    ) -> OptimizationResult {
        let deadline = timeout.map(|t| Instant::now() + t);
        self.optimize_from(problem, profile, &[], deadline)
    }

    /// 在已应用若干松弛步骤的基础上继续求解
    ///
    /// 求解器报告不可行时,按 relaxation_order 逐步松弛,总步数不超过 max_relaxations;
    /// 仍不可行则返回现有最优解及缺口清单
    pub fn optimize_from(
        &self,
        problem: &AssignmentProblem,
        profile: &StrategyProfile,
        already_applied: &[Relaxation],
        deadline: Option<Instant>,
    ) -> OptimizationResult {
        let started = Instant::now();
        let mut applied: Vec<Relaxation> = already_applied.to_vec();
        let mut current = applied
            .iter()
            .fold(profile.clone(), |p, step| p.relaxed(*step));

        let outcome = loop {
            let budget = SolveBudget {
                deadline,
                search: current.search,
                seed: current.seed,
            };
            let outcome = self
                .solver
                .solve(problem, &current.objective, &current.constraints, &budget);

            let next_step = current.relaxation_order.get(applied.len()).copied();
            let relax = match (&outcome, next_step) {
                (SolveOutcome::Infeasible { violations, .. }, Some(step))
                    if applied.len() < profile.max_relaxations =>
                {
                    warn!(
                        strategy = %profile.strategy_key,
                        violation_count = violations.len(),
                        relaxation = ?step,
                        "求解不可行,应用松弛"
                    );
                    Some(step)
                }
                _ => None,
            };
            match relax {
                Some(step) => {
                    current = current.relaxed(step);
                    applied.push(step);
                }
                None => break outcome,
            }
        };

        let (status, violations) = match &outcome {
            SolveOutcome::Solved(_) => (OptimizationStatus::Solved, Vec::new()),
            SolveOutcome::Infeasible { violations, .. } => {
                (OptimizationStatus::Infeasible, violations.clone())
            }
            SolveOutcome::TimedOut { .. } => (OptimizationStatus::TimedOut, Vec::new()),
        };
        let candidate = outcome.candidate().clone();
        let coverage = problem
            .simulator
            .simulate(problem.catalog.requirements(), &candidate.matrix);
        let shortfall = shortfall_of(&coverage);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            strategy = %profile.strategy_key,
            solver = self.solver.name(),
            status = ?status,
            coverage = candidate.score.coverage,
            grants = candidate.score.grants,
            shortfall_count = shortfall.len(),
            relaxations = applied.len(),
            elapsed_ms,
            "资质分配优化完成"
        );

        OptimizationResult {
            strategy_key: profile.strategy_key.clone(),
            solver: self.solver.name().to_string(),
            status,
            candidate,
            coverage,
            shortfall,
            violations,
            relaxations_applied: applied,
            elapsed_ms,
        }
    }
}

impl Default for AssignmentOptimizer {
    fn default() -> Self {
        Self::with_local_search()
    }
}

#[cfg(test)]
mod tests;
