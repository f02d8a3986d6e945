// ==========================================
// AssignmentOptimizer 集成测试
// ==========================================
// 测试目标: 验证设施激活式资质分配在各策略下的结果
// 覆盖范围: 均衡分配 / 工作量硬约束 / 覆盖优先 / 渐进培训 / 多人同时在岗
// ==========================================

mod helpers;

use helpers::test_data_builder::{EngineerBuilder, ScenarioBuilder};
use ppm_coverage_planner::domain::types::{FrequencyClass, RideClass};
use ppm_coverage_planner::engine::optimizer::{AssignmentOptimizer, AssignmentProblem, OptimizationStatus};
use ppm_coverage_planner::engine::strategy::{OptimizationStrategy, StrategyProfile};
use std::collections::BTreeSet;
use std::sync::Arc;

// ==========================================
// 测试辅助函数
// ==========================================

fn problem(scenario: &ScenarioBuilder) -> AssignmentProblem {
    let (catalog, simulator, _) = scenario.simulator();
    AssignmentProblem::new(
        Arc::new(scenario.engineers().to_vec()),
        Arc::new(catalog),
        Arc::new(simulator),
    )
}

fn profile(strategy: OptimizationStrategy) -> StrategyProfile {
    StrategyProfile::preset(strategy, 0.25)
}

/// 两名工程师共同负责 2 个 A 类 + 2 个 B 类设施
fn shared_team() -> ScenarioBuilder {
    ScenarioBuilder::new()
        .ride("R1", "T1", RideClass::A)
        .ride("R2", "T1", RideClass::A)
        .ride("R3", "T1", RideClass::B)
        .ride("R4", "T1", RideClass::B)
        .requirement("R1", "Q1", FrequencyClass::Daily, 1.0)
        .requirement("R2", "Q2", FrequencyClass::Daily, 1.0)
        .requirement("R3", "Q3", FrequencyClass::Weekly, 1.0)
        .requirement("R4", "Q4", FrequencyClass::Weekly, 1.0)
}

/// E1 负责 4 个设施,E2/E3 各负责 1 个
fn dominant_engineer() -> ScenarioBuilder {
    let mut scenario = ScenarioBuilder::new();
    for i in 1..=6 {
        scenario = scenario
            .ride(&format!("R{}", i), "T1", RideClass::A)
            .requirement(&format!("R{}", i), &format!("Q{}", i), FrequencyClass::Daily, 1.0);
    }
    scenario
        .engineer(EngineerBuilder::new("E1").rides(&["R1", "R2", "R3", "R4"]))
        .engineer(EngineerBuilder::new("E2").rides(&["R5"]))
        .engineer(EngineerBuilder::new("E3").rides(&["R6"]))
}

fn class_count(activations: &BTreeSet<String>, rides: &[&str]) -> usize {
    activations.iter().filter(|r| rides.contains(&r.as_str())).count()
}

// ==========================================
// 测试用例
// ==========================================

#[test]
fn test_balanced_splits_rides_and_classes() {
    let scenario = shared_team()
        .engineer(EngineerBuilder::new("E1").rides(&["R1", "R2", "R3", "R4"]))
        .engineer(EngineerBuilder::new("E2").rides(&["R1", "R2", "R3", "R4"]));
    let problem = problem(&scenario);

    let result = AssignmentOptimizer::default().optimize(&problem, &profile(OptimizationStrategy::Balanced), None);

    assert_eq!(result.status, OptimizationStatus::Solved);
    assert!(result.shortfall.is_empty());
    assert_eq!(result.candidate.score.grants, 4);
    for id in ["E1", "E2"] {
        let rides = &result.candidate.activations[id];
        assert_eq!(rides.len(), 2, "{} 激活设施数", id);
        assert_eq!(class_count(rides, &["R1", "R2"]), 1, "{} A 类设施数", id);
        assert_eq!(class_count(rides, &["R3", "R4"]), 1, "{} B 类设施数", id);
    }
}

#[test]
fn test_hard_workload_band_caps_dominant_engineer() {
    let problem = problem(&dominant_engineer());

    let result = AssignmentOptimizer::default().optimize(&problem, &profile(OptimizationStrategy::Balanced), None);

    // 约束满足,但覆盖不全
    assert_eq!(result.status, OptimizationStatus::Solved);
    assert!(result.violations.is_empty());
    assert_eq!(result.candidate.activations["E1"].len(), 2);

    let missing: BTreeSet<&str> = result.shortfall.iter().map(|s| s.qualification_id.as_str()).collect();
    assert_eq!(missing, ["Q3", "Q4"].into_iter().collect());
    assert!(!result.coverage.daily_passed);
}

#[test]
fn test_coverage_max_ignores_workload_band() {
    let problem = problem(&dominant_engineer());

    let result = AssignmentOptimizer::default().optimize(&problem, &profile(OptimizationStrategy::CoverageMax), None);

    assert_eq!(result.status, OptimizationStatus::Solved);
    assert!(result.shortfall.is_empty());
    assert_eq!(result.candidate.activations["E1"].len(), 4);
    assert_eq!(result.candidate.score.grants, 6);
    assert!(result.coverage.daily_passed);
}

#[test]
fn test_progressive_training_builds_on_current_holdings() {
    let scenario = shared_team()
        .engineer(
            EngineerBuilder::new("E1")
                .rides(&["R1", "R2", "R3", "R4"])
                .holds(&["Q1", "Q3"]),
        )
        .engineer(EngineerBuilder::new("E2").rides(&["R1", "R2", "R3", "R4"]));
    let problem = problem(&scenario);

    let result = AssignmentOptimizer::default().optimize(
        &problem,
        &profile(OptimizationStrategy::ProgressiveTraining),
        None,
    );

    assert!(result.shortfall.is_empty());
    assert!(result.candidate.matrix.holds("E1", "Q1"));
    assert!(result.candidate.matrix.holds("E1", "Q3"));
    // 只需培训 Q2 与 Q4
    assert_eq!(result.candidate.score.training, 2);
    let trained: BTreeSet<String> = result
        .candidate
        .matrix
        .additions_over(&problem.current)
        .into_values()
        .flatten()
        .collect();
    assert_eq!(trained, ["Q2".to_string(), "Q4".to_string()].into_iter().collect());
}

#[test]
fn test_grants_stay_within_role_and_ownership() {
    let scenario = shared_team()
        .ride("R9", "T2", RideClass::C)
        .requirement("R9", "Q9", FrequencyClass::Monthly, 1.0)
        .engineer(EngineerBuilder::new("E1").rides(&["R1", "R3"]))
        .engineer(EngineerBuilder::new("E2").rides(&["R2", "R4"]))
        .engineer(EngineerBuilder::new("F1").team("T2").rides(&["R9"]));
    let problem = problem(&scenario);

    let result = AssignmentOptimizer::default().optimize(&problem, &profile(OptimizationStrategy::CoverageMax), None);

    let owned = |id: &str| -> BTreeSet<String> {
        let engineer = scenario.engineers().iter().find(|e| e.engineer_id == id).unwrap();
        problem
            .ride_options(engineer)
            .into_iter()
            .flat_map(|(_, _, quals)| quals)
            .collect()
    };
    for (engineer_id, quals) in result.candidate.matrix.engineers() {
        assert!(quals.is_subset(&owned(engineer_id)), "{} 获得了非所属设施的资质", engineer_id);
    }
    assert_eq!(
        result.candidate.matrix.qualifications_of("F1").cloned().unwrap_or_default(),
        ["Q9".to_string()].into_iter().collect()
    );
}

#[test]
fn test_long_task_needs_two_simultaneous_holders() {
    // 7 小时每日任务,AM 窗口 3.5 小时 → 需 2 人同时在岗
    let scenario = ScenarioBuilder::new()
        .ride("R1", "T1", RideClass::A)
        .requirement("R1", "Q1", FrequencyClass::Daily, 7.0)
        .engineer(EngineerBuilder::new("E1").rides(&["R1"]))
        .engineer(EngineerBuilder::new("E2").rides(&["R1"]))
        .engineer(EngineerBuilder::new("E3").rides(&["R1"]).shift("L"));
    let problem = problem(&scenario);

    for strategy in [
        OptimizationStrategy::Balanced,
        OptimizationStrategy::CoverageMax,
        OptimizationStrategy::Exact,
    ] {
        let result = AssignmentOptimizer::default().optimize(&problem, &profile(strategy), None);

        assert_eq!(result.status, OptimizationStatus::Solved);
        assert!(result.shortfall.is_empty(), "{} 未覆盖多人任务", strategy.as_str());
        assert!(result.coverage.daily_passed);
        // 早班的 E1/E2 才能凑齐 AM 窗口人数
        let holders: BTreeSet<&str> = result.candidate.matrix.holders_of("Q1").collect();
        assert!(holders.contains("E1") && holders.contains("E2"));
        if strategy == OptimizationStrategy::CoverageMax {
            assert_eq!(holders.len(), 2);
        }
    }
}
