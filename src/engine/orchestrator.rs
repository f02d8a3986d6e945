// ==========================================
// PPM 资质覆盖规划系统 - 规划流水线编排器
// ==========================================
// 状态机: Loaded → Simulated → Optimized → Validated → Accepted | Rejected
// Rejected 在未超时、且仍有松弛额度时,可带松弛后的约束重新进入 Optimized 一次
// 红线: 只有 ConfigError 在输出前终止流程;其余问题累积到 RunReport
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::matrix::QualificationMatrix;
use crate::domain::roster::{Engineer, Requirement, Ride, RotationAssignment};
use crate::domain::types::{CoverageStatus, FrequencyClass, HandoverPolicy};
use crate::engine::coverage::{CoverageReport, CoverageSimulator, Horizon};
use crate::engine::error::{DataIssue, EngineError, EngineResult};
use crate::engine::optimizer::{
    coverage_target, AssignmentOptimizer, AssignmentProblem, ConstraintViolation, ObjectiveScore,
    OptimizationResult, OptimizationStatus, Shortfall,
};
use crate::engine::ppm_catalog::PpmWindowCatalog;
use crate::engine::priority::{PriorityEntry, PriorityScorer};
use crate::engine::requirement_catalog::RequirementCatalog;
use crate::engine::risk::{RiskClassifier, RiskReport};
use crate::engine::shift_calendar::ShiftCalendar;
use crate::engine::sources::{RequirementSource, RosterSource, RotationSource};
use crate::engine::strategy::{Relaxation, StrategyProfile};
use chrono::{NaiveDateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// 运行状态
// ==========================================

/// 拒绝原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    Timeout,
    Infeasible { violations: Vec<ConstraintViolation> },
    NoEligibleEngineer { ride_id: String },
    DailyCoverageFailed { failing_requirements: usize },
    CoverageInsufficient { overall: CoverageStatus },
}

impl RejectionReason {
    /// 松弛约束后有望改善的原因
    fn relaxable(&self) -> bool {
        matches!(
            self,
            RejectionReason::Infeasible { .. }
                | RejectionReason::DailyCoverageFailed { .. }
                | RejectionReason::CoverageInsufficient { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Loaded,
    Simulated,
    Optimized,
    Validated,
    Accepted,
    Rejected { reasons: Vec<RejectionReason> },
}

impl RunState {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RunState::Accepted)
    }
}

// ==========================================
// RunReport - 单次运行报告
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub strategy_key: String,
    pub solver: String,
    pub created_at: NaiveDateTime,
    pub horizon: Horizon,

    // ===== 状态 =====
    pub state: RunState,
    pub history: Vec<RunState>,
    /// 超时后以现有最优解出具的报告
    pub degraded: bool,
    pub relaxations_applied: Vec<Relaxation>,

    // ===== 结果 =====
    pub matrix: QualificationMatrix,
    pub activations: BTreeMap<String, BTreeSet<String>>,
    pub score: ObjectiveScore,
    pub baseline: CoverageReport,
    pub coverage: CoverageReport,
    pub risk: RiskReport,
    pub priority: Vec<PriorityEntry>,
    /// 工程师 → 需新培训的资质
    pub training_plan: BTreeMap<String, BTreeSet<String>>,
    pub shortfall: Vec<Shortfall>,
    pub data_issues: Vec<DataIssue>,
    pub elapsed_ms: u64,
}

/// 多策略对比结果
#[derive(Debug, Clone, Serialize)]
pub struct StrategyComparison {
    pub runs: Vec<RunReport>,
    /// runs 中最优者的下标
    pub best: usize,
}

impl StrategyComparison {
    pub fn best_run(&self) -> Option<&RunReport> {
        self.runs.get(self.best)
    }
}

// ==========================================
// 内部: 已准备好的共享输入
// ==========================================
struct PreparedRun {
    problem: AssignmentProblem,
    horizon: Horizon,
    baseline: CoverageReport,
    data_issues: Vec<DataIssue>,
    deadline: Option<Instant>,
}

/// 阻塞线程上完成的优化 + 校验
struct DrivenRun {
    result: OptimizationResult,
    history: Vec<RunState>,
    reasons: Vec<RejectionReason>,
    shortfall: Vec<Shortfall>,
}

// ==========================================
// PlanningPipeline - 规划流水线
// ==========================================
pub struct PlanningPipeline<C>
where
    C: PlanningConfigReader,
{
    config: Arc<C>,
    optimizer: Arc<AssignmentOptimizer>,
    scorer: PriorityScorer,
    classifier: RiskClassifier,
}

impl<C> PlanningPipeline<C>
where
    C: PlanningConfigReader,
{
    /// 使用内置局部搜索求解器
    pub fn new(config: Arc<C>) -> Self {
        Self::with_optimizer(config, Arc::new(AssignmentOptimizer::with_local_search()))
    }

    pub fn with_optimizer(config: Arc<C>, optimizer: Arc<AssignmentOptimizer>) -> Self {
        Self {
            config,
            optimizer,
            scorer: PriorityScorer::new(),
            classifier: RiskClassifier::new(),
        }
    }

    /// 执行单策略规划
    ///
    /// # 参数
    /// - `strategy_key`: 策略键,None 时使用运行参数中的默认策略
    ///
    /// # 返回
    /// 配置错误或数据源读取失败时返回 Err;其余情况均返回 RunReport
    pub async fn run(
        &self,
        roster: &dyn RosterSource,
        requirements: &dyn RequirementSource,
        rotations: &dyn RotationSource,
        strategy_key: Option<&str>,
    ) -> EngineResult<RunReport> {
        let settings = self.config.get_run_settings().await?;
        let key = strategy_key
            .map(str::to_string)
            .unwrap_or_else(|| settings.default_strategy.as_str().to_string());

        let mut comparison = self
            .run_strategies(roster, requirements, rotations, &[key.as_str()])
            .await?;
        let best = comparison.best;
        Ok(comparison.runs.swap_remove(best))
    }

    /// 多策略并发规划,选出最优结果
    ///
    /// 各策略共享只读输入,在阻塞线程池上并发求解
    ///
    /// 最优: 已接受优先 → 覆盖率之和降序 → 培训量升序 → 策略键升序
    pub async fn run_strategies(
        &self,
        roster: &dyn RosterSource,
        requirements: &dyn RequirementSource,
        rotations: &dyn RotationSource,
        strategy_keys: &[&str],
    ) -> EngineResult<StrategyComparison> {
        if strategy_keys.is_empty() {
            return Err(EngineError::Internal("未指定任何策略".to_string()));
        }

        // ===== 配置 (ConfigError 在此终止) =====
        let settings = self.config.get_run_settings().await?;
        settings.validate()?;
        let tables = self.config.get_static_tables().await?;
        let windows = Arc::new(PpmWindowCatalog::load(tables)?);

        let mut profiles = Vec::with_capacity(strategy_keys.len());
        for key in strategy_keys {
            profiles.push(self.config.get_strategy_profile(key).await?);
        }

        // ===== 外部数据 =====
        let engineers = roster.load_engineers().await?;
        let rides = requirements.load_rides().await?;
        let reqs = requirements.load_requirements().await?;
        let rotation_list = rotations.load_rotations().await?;

        let horizon = Horizon::new(settings.horizon_start, settings.horizon_days);
        let deadline = settings.solver_timeout().map(|t| Instant::now() + t);
        let prepared = Arc::new(Self::prepare(
            windows,
            engineers,
            rides,
            reqs,
            rotation_list,
            horizon,
            settings.handover_policy,
            deadline,
        ));

        info!(
            strategy_count = profiles.len(),
            engineer_count = prepared.problem.engineers.len(),
            requirement_count = prepared.problem.catalog.requirements().len(),
            horizon_days = horizon.days,
            "开始规划"
        );

        // ===== 并发求解 =====
        let tasks = profiles.iter().cloned().map(|profile| {
            let optimizer = self.optimizer.clone();
            let prepared = prepared.clone();
            tokio::task::spawn_blocking(move || {
                let driven = drive(&optimizer, &prepared, &profile);
                (profile, driven)
            })
        });

        let mut runs = Vec::with_capacity(profiles.len());
        for joined in join_all(tasks).await {
            let (profile, driven) =
                joined.map_err(|e| EngineError::Internal(format!("求解任务异常终止: {}", e)))?;
            runs.push(self.finish(&prepared, &profile, driven));
        }

        let best = select_best(&runs);
        info!(
            best_strategy = %runs[best].strategy_key,
            accepted = runs[best].state.is_accepted(),
            "规划完成"
        );
        Ok(StrategyComparison { runs, best })
    }

    /// 构建目录、日历与仿真器,并评估当前持有资质的基线覆盖
    #[allow(clippy::too_many_arguments)]
    fn prepare(
        windows: Arc<PpmWindowCatalog>,
        engineers: Vec<Engineer>,
        rides: Vec<Ride>,
        requirements: Vec<Requirement>,
        rotations: Vec<RotationAssignment>,
        horizon: Horizon,
        handover: HandoverPolicy,
        deadline: Option<Instant>,
    ) -> PreparedRun {
        let mut data_issues = Vec::new();

        let (catalog, issues) = RequirementCatalog::build(rides, requirements);
        data_issues.extend(issues);
        data_issues.extend(catalog.check_roster(&engineers));

        let (calendar, issues) = ShiftCalendar::build(rotations, &windows);
        data_issues.extend(issues);

        let simulator = CoverageSimulator::new(windows, &calendar, &engineers, horizon, handover);
        data_issues.extend(simulator.issues().iter().cloned());

        let problem = AssignmentProblem::new(
            Arc::new(engineers),
            Arc::new(catalog),
            Arc::new(simulator),
        );
        // 状态: Loaded

        let baseline = problem
            .simulator
            .simulate(problem.catalog.requirements(), &problem.current);
        debug!(
            baseline_overall = %baseline.overall,
            data_issue_count = data_issues.len(),
            "基线覆盖评估完成"
        );
        // 状态: Simulated

        PreparedRun {
            problem,
            horizon,
            baseline,
            data_issues,
            deadline,
        }
    }

    /// 风险、优先级、培训清单,组装报告
    fn finish(&self, prepared: &PreparedRun, profile: &StrategyProfile, driven: DrivenRun) -> RunReport {
        let DrivenRun {
            result,
            mut history,
            reasons,
            shortfall,
        } = driven;
        let problem = &prepared.problem;
        let matrix = result.candidate.matrix.clone();

        let risk = self
            .classifier
            .classify(&problem.simulator, &problem.catalog, &matrix);
        let priority = self
            .scorer
            .rank(&problem.engineers, &problem.catalog, &problem.current);
        let training_plan = matrix.additions_over(&problem.current);

        let state = if reasons.is_empty() {
            RunState::Accepted
        } else {
            RunState::Rejected { reasons }
        };
        history.push(state.clone());

        let degraded = result.timed_out();
        if let RunState::Rejected { reasons } = &state {
            warn!(
                strategy = %profile.strategy_key,
                reason_count = reasons.len(),
                degraded,
                "规划结果被拒绝"
            );
        }

        RunReport {
            run_id: Uuid::new_v4().to_string(),
            strategy_key: profile.strategy_key.clone(),
            solver: result.solver.clone(),
            created_at: Utc::now().naive_utc(),
            horizon: prepared.horizon,
            state,
            history,
            degraded,
            relaxations_applied: result.relaxations_applied.clone(),
            matrix,
            activations: result.candidate.activations.clone(),
            score: result.candidate.score,
            baseline: prepared.baseline.clone(),
            coverage: result.coverage,
            risk,
            priority,
            training_plan,
            shortfall,
            data_issues: prepared.data_issues.clone(),
            elapsed_ms: result.elapsed_ms,
        }
    }
}

// ==========================================
// 状态机驱动 (阻塞线程)
// ==========================================

fn drive(optimizer: &AssignmentOptimizer, prepared: &PreparedRun, profile: &StrategyProfile) -> DrivenRun {
    let problem = &prepared.problem;
    let mut history = vec![RunState::Loaded, RunState::Simulated];

    let mut result = optimizer.optimize_from(problem, profile, &[], prepared.deadline);
    history.push(RunState::Optimized);
    let (mut reasons, mut shortfall) = validate(problem, &result);
    history.push(RunState::Validated);

    // 重新进入 Optimized 至多一次
    if !reasons.is_empty() && !result.timed_out() && reasons.iter().any(RejectionReason::relaxable) {
        let applied = result.relaxations_applied.clone();
        if let Some(step) = profile.relaxation_order.get(applied.len()).copied() {
            if applied.len() < profile.max_relaxations {
                history.push(RunState::Rejected {
                    reasons: reasons.clone(),
                });
                info!(
                    strategy = %profile.strategy_key,
                    relaxation = ?step,
                    "校验未通过,松弛约束后重新优化"
                );

                let mut next_applied = applied;
                next_applied.push(step);
                result = optimizer.optimize_from(problem, profile, &next_applied, prepared.deadline);
                history.push(RunState::Optimized);
                let (r, s) = validate(problem, &result);
                reasons = r;
                shortfall = s;
                history.push(RunState::Validated);
            }
        }
    }

    DrivenRun {
        result,
        history,
        reasons,
        shortfall,
    }
}

/// 校验候选解
///
/// # 返回
/// (拒绝原因, 缺口清单);无人可覆盖的设施,其全部要求都列入缺口
fn validate(problem: &AssignmentProblem, result: &OptimizationResult) -> (Vec<RejectionReason>, Vec<Shortfall>) {
    let mut reasons = Vec::new();
    let mut shortfall = result.shortfall.clone();

    match result.status {
        OptimizationStatus::TimedOut => reasons.push(RejectionReason::Timeout),
        OptimizationStatus::Infeasible => reasons.push(RejectionReason::Infeasible {
            violations: result.violations.clone(),
        }),
        OptimizationStatus::Solved => {}
    }

    for ride_id in problem.rides_without_eligible_engineer() {
        for req in problem.catalog.requirements_for_ride(&ride_id) {
            let listed = shortfall.iter().any(|s| {
                s.ride_id == req.ride_id
                    && s.qualification_id == req.qualification_id
                    && s.frequency == req.frequency
            });
            if !listed {
                let fraction = result
                    .coverage
                    .fraction_of(&req.ride_id, &req.qualification_id, req.frequency)
                    .unwrap_or(0.0);
                shortfall.push(Shortfall {
                    ride_id: req.ride_id.clone(),
                    qualification_id: req.qualification_id.clone(),
                    frequency: req.frequency,
                    role: req.role,
                    coverage_fraction: fraction,
                    target: coverage_target(req.frequency),
                });
            }
        }
        reasons.push(RejectionReason::NoEligibleEngineer { ride_id });
    }

    if !result.coverage.daily_passed {
        let failing = result
            .coverage
            .requirements
            .iter()
            .filter(|r| r.frequency == FrequencyClass::Daily && r.coverage_fraction < 1.0)
            .count();
        reasons.push(RejectionReason::DailyCoverageFailed {
            failing_requirements: failing,
        });
    }
    if result.coverage.overall < CoverageStatus::Acceptable {
        reasons.push(RejectionReason::CoverageInsufficient {
            overall: result.coverage.overall,
        });
    }

    (reasons, shortfall)
}

/// 选出最优运行
fn select_best(runs: &[RunReport]) -> usize {
    let mut best = 0;
    for (idx, run) in runs.iter().enumerate().skip(1) {
        let current = &runs[best];
        let better = match (run.state.is_accepted(), current.state.is_accepted()) {
            (true, false) => true,
            (false, true) => false,
            _ => {
                let a = run.coverage.total_fraction;
                let b = current.coverage.total_fraction;
                if (a - b).abs() > 1e-9 {
                    a > b
                } else if run.score.training != current.score.training {
                    run.score.training < current.score.training
                } else {
                    run.strategy_key < current.strategy_key
                }
            }
        };
        if better {
            best = idx;
        }
    }
    best
}
