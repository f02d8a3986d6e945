// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
// 标准静态表:
//   班次 E(早班 06-14) / L(晚班 14-22) / M(机械专用早班) / X(早班,不可交接) / O(休息)
//   窗口 AM(06-10, 3.5h, E/M/X, 全频次) / PM(14-18, 3.0h, L, 每周+每月)
// 仿真区间默认从 2026-01-05 (周一) 起 28 天
// ==========================================

use chrono::{NaiveDate, NaiveTime};
use ppm_coverage_planner::config::{InMemoryConfig, RunSettings, StaticTables};
use ppm_coverage_planner::domain::roster::{Engineer, Requirement, Ride, RotationAssignment};
use ppm_coverage_planner::domain::shift::{PpmWindow, ShiftCode, TimeWindow};
use ppm_coverage_planner::domain::types::{FrequencyClass, HandoverPolicy, RideClass, Role};
use ppm_coverage_planner::engine::coverage::{CoverageSimulator, Horizon};
use ppm_coverage_planner::engine::error::DataIssue;
use ppm_coverage_planner::engine::ppm_catalog::PpmWindowCatalog;
use ppm_coverage_planner::engine::requirement_catalog::RequirementCatalog;
use ppm_coverage_planner::engine::shift_calendar::ShiftCalendar;
use ppm_coverage_planner::engine::sources::InMemorySources;
use ppm_coverage_planner::engine::strategy::OptimizationStrategy;
use std::sync::Arc;

/// 轮班周期长度 (9 周)
pub const CYCLE_DAYS: usize = 63;

pub fn horizon_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
}

fn t(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

fn shift(code: &str, window: Option<TimeWindow>, handover: bool, restriction: Option<Role>) -> ShiftCode {
    ShiftCode {
        code: code.to_string(),
        label: code.to_string(),
        working: window.is_some(),
        weekday: None,
        weekend: None,
        window,
        valid_for_handover: handover,
        role_restriction: restriction,
        description: None,
    }
}

fn window(id: &str, from: u32, to: u32, hours: f64, shifts: &[&str], freqs: &[FrequencyClass]) -> PpmWindow {
    PpmWindow {
        id: id.to_string(),
        label: id.to_string(),
        time_range: TimeWindow::new(t(from), t(to)),
        duration_hours: hours,
        compatible_shifts: shifts.iter().map(|s| s.to_string()).collect(),
        valid_for: freqs.iter().copied().collect(),
        description: None,
    }
}

/// 标准班次表与维护窗口表
pub fn standard_tables() -> StaticTables {
    let early = Some(TimeWindow::new(t(6), t(14)));
    let late = Some(TimeWindow::new(t(14), t(22)));
    StaticTables {
        shift_codes: vec![
            shift("E", early, true, None),
            shift("L", late, true, None),
            shift("M", early, true, Some(Role::Mechanical)),
            shift("X", early, false, None),
            shift("O", None, true, None),
        ],
        ppm_windows: vec![
            window("AM", 6, 10, 3.5, &["E", "M", "X"], &FrequencyClass::ALL),
            window("PM", 14, 18, 3.0, &["L"], &[FrequencyClass::Weekly, FrequencyClass::Monthly]),
        ],
    }
}

pub fn standard_catalog() -> Arc<PpmWindowCatalog> {
    Arc::new(PpmWindowCatalog::load(standard_tables()).unwrap())
}

// ==========================================
// Engineer 构建器
// ==========================================

pub struct EngineerBuilder {
    engineer_id: String,
    team: String,
    roles: Vec<Role>,
    rides: Vec<String>,
    holds: Vec<String>,
    vacancy: bool,
    week: Option<Vec<String>>,
}

impl EngineerBuilder {
    pub fn new(engineer_id: &str) -> Self {
        Self {
            engineer_id: engineer_id.to_string(),
            team: "T1".to_string(),
            roles: vec![Role::Electrical],
            rides: Vec::new(),
            holds: Vec::new(),
            vacancy: false,
            week: Some(vec!["E".to_string(); 7]),
        }
    }

    pub fn team(mut self, team: &str) -> Self {
        self.team = team.to_string();
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.roles = vec![role];
        self
    }

    pub fn rides(mut self, rides: &[&str]) -> Self {
        self.rides = rides.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn holds(mut self, quals: &[&str]) -> Self {
        self.holds = quals.iter().map(|q| q.to_string()).collect();
        self
    }

    pub fn vacancy(mut self) -> Self {
        self.vacancy = true;
        self
    }

    /// 每天同一班次
    pub fn shift(mut self, code: &str) -> Self {
        self.week = Some(vec![code.to_string(); 7]);
        self
    }

    /// 一周 7 天的班次 (周一起),在 9 周周期内重复
    pub fn week(mut self, codes: [&str; 7]) -> Self {
        self.week = Some(codes.iter().map(|c| c.to_string()).collect());
        self
    }

    /// 不提供轮班
    pub fn no_rotation(mut self) -> Self {
        self.week = None;
        self
    }

    pub fn build(&self) -> (Engineer, Option<RotationAssignment>) {
        let engineer = Engineer {
            engineer_id: self.engineer_id.clone(),
            team: self.team.clone(),
            roles: self.roles.iter().copied().collect(),
            assigned_rides: self.rides.iter().cloned().collect(),
            qualifications: self.holds.iter().cloned().collect(),
            vacancy: self.vacancy,
        };
        let rotation = self.week.as_ref().map(|week| RotationAssignment {
            engineer_id: self.engineer_id.clone(),
            anchor_date: horizon_start(),
            offset_days: 0,
            cycle: week.iter().cycle().take(CYCLE_DAYS).cloned().collect(),
        });
        (engineer, rotation)
    }
}

// ==========================================
// Scenario 构建器
// ==========================================

pub struct ScenarioBuilder {
    rides: Vec<Ride>,
    requirements: Vec<Requirement>,
    engineers: Vec<Engineer>,
    rotations: Vec<RotationAssignment>,
    settings: RunSettings,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            rides: Vec::new(),
            requirements: Vec::new(),
            engineers: Vec::new(),
            rotations: Vec::new(),
            settings: RunSettings {
                horizon_start: horizon_start(),
                horizon_days: 28,
                solver_timeout_ms: None,
                workload_tolerance_pct: 0.25,
                handover_policy: HandoverPolicy::Ignore,
                default_strategy: OptimizationStrategy::Balanced,
            },
        }
    }

    pub fn ride(mut self, ride_id: &str, team: &str, class: RideClass) -> Self {
        self.rides.push(Ride {
            ride_id: ride_id.to_string(),
            team: team.to_string(),
            class,
        });
        self
    }

    pub fn requirement(self, ride_id: &str, qual: &str, frequency: FrequencyClass, hours: f64) -> Self {
        self.push_requirement(ride_id, qual, frequency, hours, None)
    }

    pub fn role_requirement(
        self,
        ride_id: &str,
        qual: &str,
        frequency: FrequencyClass,
        hours: f64,
        role: Role,
    ) -> Self {
        self.push_requirement(ride_id, qual, frequency, hours, Some(role))
    }

    fn push_requirement(
        mut self,
        ride_id: &str,
        qual: &str,
        frequency: FrequencyClass,
        hours: f64,
        role: Option<Role>,
    ) -> Self {
        self.requirements.push(Requirement {
            ride_id: ride_id.to_string(),
            qualification_id: qual.to_string(),
            frequency,
            duration_hours: hours,
            role,
        });
        self
    }

    pub fn engineer(mut self, builder: EngineerBuilder) -> Self {
        let (engineer, rotation) = builder.build();
        self.engineers.push(engineer);
        self.rotations.extend(rotation);
        self
    }

    pub fn horizon_days(mut self, days: usize) -> Self {
        self.settings.horizon_days = days;
        self
    }

    pub fn timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.settings.solver_timeout_ms = ms;
        self
    }

    pub fn handover(mut self, policy: HandoverPolicy) -> Self {
        self.settings.handover_policy = policy;
        self
    }

    pub fn default_strategy(mut self, strategy: OptimizationStrategy) -> Self {
        self.settings.default_strategy = strategy;
        self
    }

    pub fn engineers(&self) -> &[Engineer] {
        &self.engineers
    }

    pub fn sources(&self) -> InMemorySources {
        InMemorySources::new(
            self.engineers.clone(),
            self.rides.clone(),
            self.requirements.clone(),
            self.rotations.clone(),
        )
    }

    pub fn config(&self) -> InMemoryConfig {
        InMemoryConfig::new(standard_tables(), self.settings.clone())
    }

    /// 直接构建要求目录与仿真器 (不经流水线)
    pub fn simulator(&self) -> (RequirementCatalog, CoverageSimulator, Vec<DataIssue>) {
        let windows = standard_catalog();
        let (catalog, mut issues) = RequirementCatalog::build(self.rides.clone(), self.requirements.clone());
        let (calendar, calendar_issues) = ShiftCalendar::build(self.rotations.clone(), &windows);
        issues.extend(calendar_issues);

        let simulator = CoverageSimulator::new(
            windows,
            &calendar,
            &self.engineers,
            Horizon::new(self.settings.horizon_start, self.settings.horizon_days),
            self.settings.handover_policy,
        );
        issues.extend(simulator.issues().iter().cloned());
        (catalog, simulator, issues)
    }
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}
