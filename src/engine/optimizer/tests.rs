use super::*;
use crate::config::settings::StaticTables;
use crate::domain::roster::{Requirement, Ride, RotationAssignment};
use crate::domain::shift::{PpmWindow, ShiftCode, TimeWindow};
use crate::domain::types::HandoverPolicy;
use crate::engine::coverage::Horizon;
use crate::engine::ppm_catalog::PpmWindowCatalog;
use crate::engine::shift_calendar::ShiftCalendar;
use crate::engine::strategy::{OptimizationStrategy, StrategyProfile};
use chrono::{NaiveDate, NaiveTime};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ==========================================
// 测试辅助函数
// ==========================================

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
}

fn window_catalog() -> Arc<PpmWindowCatalog> {
    let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
    let shift = |code: &str, working: bool| ShiftCode {
        code: code.to_string(),
        label: code.to_string(),
        working,
        weekday: None,
        weekend: None,
        window: if working { Some(TimeWindow::new(t(6), t(14))) } else { None },
        valid_for_handover: true,
        role_restriction: None,
        description: None,
    };
    let catalog = PpmWindowCatalog::load(StaticTables {
        shift_codes: vec![shift("E", true), shift("O", false)],
        ppm_windows: vec![PpmWindow {
            id: "AM".to_string(),
            label: "AM".to_string(),
            time_range: TimeWindow::new(t(6), t(10)),
            duration_hours: 3.5,
            compatible_shifts: ["E".to_string()].into_iter().collect(),
            valid_for: FrequencyClass::ALL.into_iter().collect(),
            description: None,
        }],
    })
    .unwrap();
    Arc::new(catalog)
}

fn ride(id: &str, class: RideClass) -> Ride {
    Ride {
        ride_id: id.to_string(),
        team: "T1".to_string(),
        class,
    }
}

fn req(ride: &str, qual: &str, freq: FrequencyClass, role: Option<Role>) -> Requirement {
    Requirement {
        ride_id: ride.to_string(),
        qualification_id: qual.to_string(),
        frequency: freq,
        duration_hours: 1.0,
        role,
    }
}

fn engineer(id: &str, rides: &[&str], holds: &[&str]) -> Engineer {
    Engineer {
        engineer_id: id.to_string(),
        team: "T1".to_string(),
        roles: [Role::Electrical].into_iter().collect(),
        assigned_rides: rides.iter().map(|r| r.to_string()).collect(),
        qualifications: holds.iter().map(|q| q.to_string()).collect(),
        vacancy: false,
    }
}

fn rotation(id: &str) -> RotationAssignment {
    RotationAssignment {
        engineer_id: id.to_string(),
        anchor_date: start(),
        offset_days: 0,
        cycle: vec!["E".to_string(); 63],
    }
}

fn problem(engineers: Vec<Engineer>) -> AssignmentProblem {
    let windows = window_catalog();
    let (catalog, _) = RequirementCatalog::build(
        vec![ride("R1", RideClass::A), ride("R2", RideClass::B), ride("R3", RideClass::C)],
        vec![
            req("R1", "Q1", FrequencyClass::Daily, None),
            req("R1", "QM", FrequencyClass::Daily, Some(Role::Mechanical)),
            req("R2", "Q2", FrequencyClass::Weekly, None),
            req("R3", "Q3", FrequencyClass::Monthly, None),
        ],
    );
    let rotations = engineers.iter().map(|e| rotation(&e.engineer_id)).collect();
    let (calendar, _) = ShiftCalendar::build(rotations, &windows);
    let simulator = CoverageSimulator::new(
        windows,
        &calendar,
        &engineers,
        Horizon::new(start(), 28),
        HandoverPolicy::Ignore,
    );
    AssignmentProblem::new(Arc::new(engineers), Arc::new(catalog), Arc::new(simulator))
}

/// 单设施 7 小时每日任务,AM 窗口 3.5 小时需 2 人同时在岗
fn long_task_problem(engineers: Vec<Engineer>) -> AssignmentProblem {
    let windows = window_catalog();
    let mut task = req("R1", "Q1", FrequencyClass::Daily, None);
    task.duration_hours = 7.0;
    let (catalog, _) = RequirementCatalog::build(vec![ride("R1", RideClass::A)], vec![task]);
    let rotations = engineers.iter().map(|e| rotation(&e.engineer_id)).collect();
    let (calendar, _) = ShiftCalendar::build(rotations, &windows);
    let simulator = CoverageSimulator::new(
        windows,
        &calendar,
        &engineers,
        Horizon::new(start(), 28),
        HandoverPolicy::Ignore,
    );
    AssignmentProblem::new(Arc::new(engineers), Arc::new(catalog), Arc::new(simulator))
}

fn two_engineers() -> AssignmentProblem {
    problem(vec![
        engineer("E1", &["R1", "R2", "R3"], &[]),
        engineer("E2", &["R1", "R2", "R3"], &[]),
    ])
}

// ==========================================
// 内置求解器
// ==========================================

#[test]
fn test_balanced_covers_all_eligible_requirements() {
    let problem = two_engineers();
    let profile = StrategyProfile::preset(OptimizationStrategy::Balanced, 0.25);

    let result = AssignmentOptimizer::default().optimize(&problem, &profile, None);

    assert_eq!(result.status, OptimizationStatus::Solved);
    assert!(result.violations.is_empty());
    assert!(result.relaxations_applied.is_empty());
    for q in ["Q1", "Q2", "Q3"] {
        assert!(result.candidate.matrix.holders_of(q).next().is_some(), "{} 无人持有", q);
    }
    // 仅机械角色的要求无人可覆盖
    assert_eq!(result.shortfall.len(), 1);
    assert_eq!(result.shortfall[0].qualification_id, "QM");
    assert_eq!(result.shortfall[0].target, 1.0);
}

#[test]
fn test_role_ineligible_qualification_never_granted() {
    let problem = two_engineers();
    let profile = StrategyProfile::preset(OptimizationStrategy::CoverageMax, 0.25);

    let result = AssignmentOptimizer::default().optimize(&problem, &profile, None);
    assert_eq!(result.candidate.matrix.holders_of("QM").count(), 0);
}

#[test]
fn test_grants_limited_to_owned_rides() {
    let problem = problem(vec![
        engineer("E1", &["R1", "R2", "R3"], &[]),
        engineer("E9", &[], &[]),
    ]);
    let profile = StrategyProfile::preset(OptimizationStrategy::CoverageMax, 0.25);

    let result = AssignmentOptimizer::default().optimize(&problem, &profile, None);
    assert!(result.candidate.matrix.qualifications_of("E9").map_or(true, |q| q.is_empty()));
    assert!(!result.candidate.activations.contains_key("E9"));
}

#[test]
fn test_no_redundant_grants() {
    let problem = two_engineers();
    let profile = StrategyProfile::preset(OptimizationStrategy::CoverageMax, 0.25);

    let result = AssignmentOptimizer::default().optimize(&problem, &profile, None);
    // 不计均衡时,每项资质一人即可满足,不会重复授予
    assert_eq!(result.candidate.score.grants, 3);
    assert_eq!(result.candidate.matrix.grant_count(), 3);
}

#[test]
fn test_workload_spread_across_team() {
    let problem = two_engineers();
    let profile = StrategyProfile::preset(OptimizationStrategy::Balanced, 0.25);

    let result = AssignmentOptimizer::default().optimize(&problem, &profile, None);
    let counts: Vec<usize> = ["E1", "E2"]
        .iter()
        .map(|id| result.candidate.activations.get(*id).map_or(0, |r| r.len()))
        .collect();
    assert!(counts.iter().all(|c| *c >= 1));
    assert!(counts[0].abs_diff(counts[1]) <= 1);
}

#[test]
fn test_long_task_co_activates_two_holders() {
    let problem = long_task_problem(vec![
        engineer("E1", &["R1"], &[]),
        engineer("E2", &["R1"], &[]),
    ]);

    for strategy in OptimizationStrategy::ALL {
        let profile = StrategyProfile::preset(strategy, 0.25);
        let result = AssignmentOptimizer::default().optimize(&problem, &profile, None);

        assert_eq!(result.status, OptimizationStatus::Solved, "{}", strategy.as_str());
        assert!(result.shortfall.is_empty(), "{} 仍有缺口", strategy.as_str());
        assert!((result.candidate.score.coverage - 1.0).abs() < 1e-9);
        assert_eq!(result.candidate.matrix.holders_of("Q1").count(), 2);
        assert_eq!(result.candidate.activations.len(), 2);
    }
}

#[test]
fn test_long_task_with_single_holder_grants_nothing() {
    let problem = long_task_problem(vec![engineer("E1", &["R1"], &[])]);
    let profile = StrategyProfile::preset(OptimizationStrategy::CoverageMax, 0.25);

    let result = AssignmentOptimizer::default().optimize(&problem, &profile, None);
    // 一人无法凑齐人数,授予也不会带来覆盖
    assert_eq!(result.candidate.score.grants, 0);
    assert_eq!(result.shortfall.len(), 1);
}

#[test]
fn test_search_is_deterministic() {
    let profile = StrategyProfile::preset(OptimizationStrategy::Exact, 0.25);
    let optimizer = AssignmentOptimizer::default();

    let first = optimizer.optimize(&two_engineers(), &profile, None);
    let second = optimizer.optimize(&two_engineers(), &profile, None);
    assert_eq!(first.candidate, second.candidate);
}

#[test]
fn test_progressive_training_keeps_current_holdings() {
    let problem = problem(vec![
        engineer("E1", &["R1", "R2", "R3"], &["Q1"]),
        engineer("E2", &["R1", "R2", "R3"], &[]),
    ]);
    let profile = StrategyProfile::preset(OptimizationStrategy::ProgressiveTraining, 0.25);

    let result = AssignmentOptimizer::default().optimize(&problem, &profile, None);
    assert!(result.candidate.matrix.holds("E1", "Q1"));

    let training = result.candidate.matrix.additions_over(&problem.current);
    assert!(training.values().all(|quals| !quals.contains("Q1")));
    assert_eq!(result.candidate.score.training, 2);
}

#[test]
fn test_zero_timeout_returns_incumbent() {
    let problem = two_engineers();
    let profile = StrategyProfile::preset(OptimizationStrategy::Balanced, 0.25);

    let result = AssignmentOptimizer::default().optimize(&problem, &profile, Some(Duration::ZERO));
    assert!(result.timed_out());
    assert!(result.relaxations_applied.is_empty());
    // 现有最优解仍被仿真评估
    assert_eq!(result.coverage.requirements.len(), 4);
}

// ==========================================
// 松弛阶梯
// ==========================================

/// 始终报告不可行的求解器,记录每次调用看到的次目标权重
struct AlwaysInfeasible {
    calls: AtomicUsize,
    qualification_weights: Mutex<Vec<f64>>,
}

impl AssignmentSolver for AlwaysInfeasible {
    fn name(&self) -> &str {
        "always_infeasible"
    }

    fn solve(
        &self,
        problem: &AssignmentProblem,
        objective: &ObjectiveWeights,
        _constraints: &ConstraintSet,
        _budget: &SolveBudget,
    ) -> SolveOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.qualification_weights.lock().unwrap().push(objective.qualification);
        SolveOutcome::Infeasible {
            incumbent: Candidate {
                matrix: problem.current.clone(),
                activations: BTreeMap::new(),
                score: ObjectiveScore::default(),
            },
            violations: vec![ConstraintViolation::ClassSplit {
                team: "T1".to_string(),
                class: RideClass::A,
                spread: 2,
            }],
        }
    }
}

#[test]
fn test_relaxation_ladder_bounded_by_max_relaxations() {
    let solver = Arc::new(AlwaysInfeasible {
        calls: AtomicUsize::new(0),
        qualification_weights: Mutex::new(Vec::new()),
    });
    let optimizer = AssignmentOptimizer::new(solver.clone());
    let profile = StrategyProfile::preset(OptimizationStrategy::Balanced, 0.25);

    let result = optimizer.optimize(&two_engineers(), &profile, None);

    assert_eq!(result.status, OptimizationStatus::Infeasible);
    assert_eq!(result.relaxations_applied, vec![Relaxation::DropSecondaryObjective]);
    assert_eq!(solver.calls.load(Ordering::SeqCst), 2);
    assert_eq!(*solver.qualification_weights.lock().unwrap(), vec![1.0, 0.0]);
    // 仍给出缺口清单
    assert_eq!(result.shortfall.len(), 4);
    assert_eq!(result.violations.len(), 1);
}

#[test]
fn test_optimize_from_continues_ladder() {
    let solver = Arc::new(AlwaysInfeasible {
        calls: AtomicUsize::new(0),
        qualification_weights: Mutex::new(Vec::new()),
    });
    let optimizer = AssignmentOptimizer::new(solver.clone());
    let mut profile = StrategyProfile::preset(OptimizationStrategy::Balanced, 0.25);
    profile.max_relaxations = 2;

    let result = optimizer.optimize_from(
        &two_engineers(),
        &profile,
        &[Relaxation::DropSecondaryObjective],
        None,
    );
    assert_eq!(
        result.relaxations_applied,
        vec![Relaxation::DropSecondaryObjective, Relaxation::WidenWorkloadTolerance]
    );
    assert_eq!(solver.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_rides_without_eligible_engineer() {
    let problem = problem(vec![engineer("E1", &["R1"], &[])]);
    assert_eq!(problem.rides_without_eligible_engineer(), vec!["R2", "R3"]);
}

#[test]
fn test_coverage_targets() {
    assert_eq!(coverage_target(FrequencyClass::Daily), 1.0);
    assert_eq!(coverage_target(FrequencyClass::Monthly), PERIODIC_COVERAGE_TARGET);
}
