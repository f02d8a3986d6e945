// ==========================================
// PPM 资质覆盖规划系统 - 覆盖仿真引擎
// ==========================================
// 职责: 评估候选资质矩阵在仿真区间内能否满足每一项 PPM 要求
// 输入: 维护窗口目录 + 轮班日历 + 花名册 + 资质矩阵
// 输出: CoverageReport (逐要求覆盖率 + 频次汇总 + 总体状态)
// 红线: 零持有人的要求计 0,不得跳过;相同输入必须得到相同结果
// ==========================================

use crate::domain::matrix::QualificationMatrix;
use crate::domain::roster::{Engineer, Requirement};
use crate::domain::shift::ShiftCode;
use crate::domain::types::{CoverageStatus, FrequencyClass, HandoverPolicy, Role};
use crate::engine::error::DataIssue;
use crate::engine::ppm_catalog::PpmWindowCatalog;
use crate::engine::shift_calendar::ShiftCalendar;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 每项要求最多记录的失败实例起始日期
const MAX_FAILED_DATES: usize = 10;

// ==========================================
// Horizon - 仿真区间
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    pub start: NaiveDate,
    pub days: usize,
}

impl Horizon {
    pub fn new(start: NaiveDate, days: usize) -> Self {
        Self { start, days }
    }

    pub fn date(&self, day: usize) -> NaiveDate {
        self.start + Duration::days(day as i64)
    }
}

// ==========================================
// 报告结构
// ==========================================

/// 单项要求的覆盖结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementCoverage {
    pub ride_id: String,
    pub qualification_id: String,
    pub frequency: FrequencyClass,
    pub role: Option<Role>,
    pub required_instances: usize,
    pub satisfied_instances: usize,
    pub coverage_fraction: f64,
    pub status: CoverageStatus,
    /// 矩阵中持有该资质且角色合格的工程师数
    pub holder_count: usize,
    /// 未满足实例的起始日期 (最多 10 个)
    pub failed_dates: Vec<NaiveDate>,
}

/// 频次等级汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCoverage {
    pub frequency: FrequencyClass,
    pub requirement_count: usize,
    pub required_instances: usize,
    pub satisfied_instances: usize,
    /// 该等级各要求覆盖率的均值
    pub mean_fraction: f64,
    pub status: CoverageStatus,
    pub passed: bool,
}

/// 覆盖仿真报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub horizon: Horizon,
    pub requirements: Vec<RequirementCoverage>,
    pub classes: Vec<ClassCoverage>,
    pub overall: CoverageStatus,
    /// 每日要求是否 100% 满足
    pub daily_passed: bool,
    /// 各要求覆盖率之和 (优化主目标)
    pub total_fraction: f64,
}

impl CoverageReport {
    pub fn class(&self, frequency: FrequencyClass) -> Option<&ClassCoverage> {
        self.classes.iter().find(|c| c.frequency == frequency)
    }

    pub fn fraction_of(&self, ride_id: &str, qualification_id: &str, frequency: FrequencyClass) -> Option<f64> {
        self.requirements
            .iter()
            .find(|r| {
                r.ride_id == ride_id && r.qualification_id == qualification_id && r.frequency == frequency
            })
            .map(|r| r.coverage_fraction)
    }
}

// ==========================================
// 状态判定
// ==========================================

/// 频次等级状态
///
/// - 每日: 100% 才算通过,否则 INSUFFICIENT
/// - 每周/每月: >95% EXCELLENT, ≥90% GOOD, ≥80% ACCEPTABLE
pub fn class_status(frequency: FrequencyClass, fraction: f64) -> CoverageStatus {
    match frequency {
        FrequencyClass::Daily => {
            if fraction >= 1.0 {
                CoverageStatus::Excellent
            } else {
                CoverageStatus::Insufficient
            }
        }
        FrequencyClass::Weekly | FrequencyClass::Monthly => {
            if fraction > 0.95 {
                CoverageStatus::Excellent
            } else if fraction >= 0.90 {
                CoverageStatus::Good
            } else if fraction >= 0.80 {
                CoverageStatus::Acceptable
            } else {
                CoverageStatus::Insufficient
            }
        }
    }
}

/// 总体状态: 按最低等级均值判定
///
/// 全部 >95% EXCELLENT, >90% GOOD, 80~90% ACCEPTABLE, 其余 INSUFFICIENT
pub fn overall_status(min_class_fraction: f64) -> CoverageStatus {
    if min_class_fraction > 0.95 {
        CoverageStatus::Excellent
    } else if min_class_fraction > 0.90 {
        CoverageStatus::Good
    } else if min_class_fraction >= 0.80 {
        CoverageStatus::Acceptable
    } else {
        CoverageStatus::Insufficient
    }
}

// ==========================================
// 内部: 在岗表
// ==========================================

#[derive(Debug, Clone)]
struct EngineerProfile {
    engineer_id: String,
    team: String,
    roles: BTreeSet<Role>,
}

/// 某天某窗口下在岗的工程师 (工程师索引, 当天班次索引)
type DutySlot = (usize, usize);

// ==========================================
// CoverageSimulator - 覆盖仿真引擎
// ==========================================
pub struct CoverageSimulator {
    catalog: Arc<PpmWindowCatalog>,
    horizon: Horizon,
    engineers: Vec<EngineerProfile>,
    window_ids: Vec<String>,
    shifts: Vec<ShiftCode>,
    /// window_duty[w][d]: 第 d 天班次与窗口 w 兼容的在岗工程师
    window_duty: Vec<Vec<Vec<DutySlot>>>,
    issues: Vec<DataIssue>,
}

impl CoverageSimulator {
    /// 构造仿真器并预计算在岗表
    ///
    /// 无轮班的工程师不会在岗,记为 DataIssue
    ///
    /// # 参数
    /// - `catalog`: 维护窗口目录
    /// - `calendar`: 轮班日历
    /// - `engineers`: 花名册
    /// - `horizon`: 仿真区间
    /// - `handover`: 交接班策略
    pub fn new(
        catalog: Arc<PpmWindowCatalog>,
        calendar: &ShiftCalendar,
        engineers: &[Engineer],
        horizon: Horizon,
        handover: HandoverPolicy,
    ) -> Self {
        let window_ids: Vec<String> = catalog.windows().map(|w| w.id.clone()).collect();
        let shifts: Vec<ShiftCode> = catalog.shift_codes().cloned().collect();
        let shift_index: HashMap<&str, usize> = shifts
            .iter()
            .enumerate()
            .map(|(idx, shift)| (shift.code.as_str(), idx))
            .collect();
        let mut window_duty = vec![vec![Vec::new(); horizon.days]; window_ids.len()];
        let mut issues = Vec::new();
        let mut profiles = Vec::with_capacity(engineers.len());

        for (idx, engineer) in engineers.iter().enumerate() {
            profiles.push(EngineerProfile {
                engineer_id: engineer.engineer_id.clone(),
                team: engineer.team.clone(),
                roles: engineer.roles.clone(),
            });

            if !calendar.has_rotation(&engineer.engineer_id) {
                issues.push(DataIssue::new("engineer", &engineer.engineer_id, "缺少轮班定义,不计入在岗"));
                continue;
            }

            // 前一天班次用于交接班判定
            let mut previous = calendar
                .shift_on(&engineer.engineer_id, horizon.start - Duration::days(1))
                .ok()
                .map(str::to_string);

            for day in 0..horizon.days {
                let date = horizon.date(day);
                let code = match calendar.shift_on(&engineer.engineer_id, date) {
                    Ok(code) => code.to_string(),
                    Err(_) => break,
                };
                let counted = Self::counts_on_day(&catalog, &code, previous.as_deref(), date, handover);
                if let (true, Some(&shift)) = (counted, shift_index.get(code.as_str())) {
                    for (w, window) in catalog.windows().enumerate() {
                        if window.admits_shift(&code) {
                            window_duty[w][day].push((idx, shift));
                        }
                    }
                }
                previous = Some(code);
            }
        }

        if !issues.is_empty() {
            warn!(issue_count = issues.len(), "部分工程师缺少轮班定义");
        }
        debug!(
            engineers = profiles.len(),
            windows = window_ids.len(),
            days = horizon.days,
            "在岗表预计算完成"
        );

        Self {
            catalog,
            horizon,
            engineers: profiles,
            window_ids,
            shifts,
            window_duty,
            issues,
        }
    }

    /// 当天是否计入在岗
    fn counts_on_day(
        catalog: &PpmWindowCatalog,
        code: &str,
        previous: Option<&str>,
        date: NaiveDate,
        handover: HandoverPolicy,
    ) -> bool {
        let Some(shift) = catalog.shift(code) else {
            return false;
        };
        let is_weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        if !shift.on_duty(is_weekend) {
            return false;
        }
        !(handover == HandoverPolicy::Strict
            && previous.map(|p| p != code).unwrap_or(false)
            && !shift.valid_for_handover)
    }

    // ==========================================
    // 查询方法
    // ==========================================

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn issues(&self) -> &[DataIssue] {
        &self.issues
    }

    pub fn catalog(&self) -> &PpmWindowCatalog {
        &self.catalog
    }

    /// 要求的合格持有人掩码 (持有资质 + 角色合格)
    fn holder_mask(&self, req: &Requirement, matrix: &QualificationMatrix) -> Vec<bool> {
        self.engineers
            .iter()
            .map(|e| matrix.holds(&e.engineer_id, &req.qualification_id) && req.admits(&e.roles))
            .collect()
    }

    /// 要求适用的 (窗口索引, 所需人数)
    fn windows_for(&self, req: &Requirement) -> Vec<(usize, u32)> {
        self.window_ids
            .iter()
            .enumerate()
            .filter_map(|(w, id)| {
                let window = self.catalog.window(id)?;
                if !window.serves(req.frequency) {
                    return None;
                }
                let needed = self.catalog.required_engineer_count(id, req.duration_hours)?;
                Some((w, needed))
            })
            .collect()
    }

    /// 某天某窗口下为该要求出力的合格在岗人数
    fn present(&self, w: usize, day: usize, req: &Requirement, holders: &[bool]) -> usize {
        self.window_duty[w][day]
            .iter()
            .filter(|(idx, shift)| holders[*idx] && self.shifts[*shift].admits_role(req.role))
            .count()
    }

    /// 逐日判定: 是否存在某窗口有足够的合格在岗人员
    fn satisfied_days(&self, req: &Requirement, holders: &[bool]) -> Vec<bool> {
        let windows = self.windows_for(req);
        (0..self.horizon.days)
            .map(|day| {
                windows
                    .iter()
                    .any(|&(w, needed)| self.present(w, day, req, holders) as u32 >= needed)
            })
            .collect()
    }

    /// 要求在各适用窗口中的最大同时在岗人数
    ///
    /// 0 表示没有适用窗口
    pub fn required_headcount(&self, req: &Requirement) -> u32 {
        self.windows_for(req)
            .into_iter()
            .map(|(_, needed)| needed)
            .max()
            .unwrap_or(0)
    }

    /// 在岗人数进度: 逐日取各窗口 min(在岗, 所需)/所需 的最大值,再按天取均值
    ///
    /// 覆盖率只在人数凑齐时才变化,多人要求用此值引导搜索
    pub fn staffing_progress(&self, req: &Requirement, matrix: &QualificationMatrix) -> f64 {
        let windows = self.windows_for(req);
        if windows.is_empty() || self.horizon.days == 0 {
            return 0.0;
        }
        let holders = self.holder_mask(req, matrix);
        let total: f64 = (0..self.horizon.days)
            .map(|day| {
                windows
                    .iter()
                    .map(|&(w, needed)| {
                        let present = self.present(w, day, req, &holders).min(needed as usize);
                        present as f64 / needed as f64
                    })
                    .fold(0.0, f64::max)
            })
            .sum();
        total / self.horizon.days as f64
    }

    /// 评估单项要求
    pub fn evaluate_requirement(&self, req: &Requirement, matrix: &QualificationMatrix) -> RequirementCoverage {
        let holders = self.holder_mask(req, matrix);
        let holder_count = holders.iter().filter(|h| **h).count();

        let days = if holder_count == 0 {
            vec![false; self.horizon.days]
        } else {
            self.satisfied_days(req, &holders)
        };

        let (required, satisfied, failed_starts) = count_instances(&days, req.frequency.window_days());
        let fraction = if required == 0 {
            0.0
        } else {
            satisfied as f64 / required as f64
        };

        RequirementCoverage {
            ride_id: req.ride_id.clone(),
            qualification_id: req.qualification_id.clone(),
            frequency: req.frequency,
            role: req.role,
            required_instances: required,
            satisfied_instances: satisfied,
            coverage_fraction: fraction,
            status: class_status(req.frequency, fraction),
            holder_count,
            failed_dates: failed_starts
                .into_iter()
                .take(MAX_FAILED_DATES)
                .map(|d| self.horizon.date(d))
                .collect(),
        }
    }

    /// 单项要求覆盖率
    pub fn coverage_fraction(&self, req: &Requirement, matrix: &QualificationMatrix) -> f64 {
        self.evaluate_requirement(req, matrix).coverage_fraction
    }

    /// 并行评估全部要求并汇总
    ///
    /// 各要求的评估互相独立,按要求顺序合并,结果与线程调度无关
    pub fn simulate(&self, requirements: &[Requirement], matrix: &QualificationMatrix) -> CoverageReport {
        let results: Vec<RequirementCoverage> = requirements
            .par_iter()
            .map(|req| self.evaluate_requirement(req, matrix))
            .collect();

        let mut accumulator = CoverageAccumulator::default();
        for r in &results {
            accumulator.add(r);
        }
        let report = accumulator.finish(self.horizon, results);

        info!(
            requirement_count = report.requirements.len(),
            total_fraction = report.total_fraction,
            overall = %report.overall,
            daily_passed = report.daily_passed,
            "覆盖仿真完成"
        );
        report
    }

    // ==========================================
    // 风险分析支撑
    // ==========================================

    /// 持有资质、角色合格、且仿真区间内至少一天在兼容班次上的工程师
    ///
    /// # 返回
    /// (工程师ID, 班组) 列表,按工程师在花名册中的顺序
    pub fn on_duty_holders(
        &self,
        qualification_id: &str,
        requirements: &[&Requirement],
        matrix: &QualificationMatrix,
    ) -> Vec<(String, String)> {
        let mut eligible: BTreeSet<usize> = BTreeSet::new();

        for req in requirements.iter().filter(|r| r.qualification_id == qualification_id) {
            let holders = self.holder_mask(req, matrix);
            for (w, _) in self.windows_for(req) {
                for slots in &self.window_duty[w] {
                    for (idx, shift) in slots {
                        if holders[*idx] && self.shifts[*shift].admits_role(req.role) {
                            eligible.insert(*idx);
                        }
                    }
                }
            }
        }

        eligible
            .iter()
            .map(|idx| {
                let e = &self.engineers[*idx];
                (e.engineer_id.clone(), e.team.clone())
            })
            .collect()
    }
}

/// 按滚动窗口统计实例
///
/// # 参数
/// - `days`: 逐日满足标志
/// - `window`: 窗口长度 (每日=1, 每周=7, 每月=30)
///
/// # 返回
/// (应满足实例数, 已满足实例数, 未满足实例的起始日索引)
fn count_instances(days: &[bool], window: usize) -> (usize, usize, Vec<usize>) {
    if days.is_empty() {
        return (0, 0, Vec::new());
    }
    // 区间短于窗口时,整个区间算一个实例
    let window = window.min(days.len()).max(1);

    let mut prefix = Vec::with_capacity(days.len() + 1);
    prefix.push(0usize);
    for d in days {
        prefix.push(prefix[prefix.len() - 1] + usize::from(*d));
    }

    let required = days.len() - window + 1;
    let mut satisfied = 0;
    let mut failed = Vec::new();
    for start in 0..required {
        if prefix[start + window] - prefix[start] > 0 {
            satisfied += 1;
        } else {
            failed.push(start);
        }
    }
    (required, satisfied, failed)
}

// ==========================================
// CoverageAccumulator - 汇总累加器
// ==========================================
#[derive(Debug, Default)]
struct CoverageAccumulator {
    per_class: BTreeMap<FrequencyClass, (usize, usize, usize, f64)>, // (要求数, 应满足, 已满足, 覆盖率和)
    total_fraction: f64,
}

impl CoverageAccumulator {
    fn add(&mut self, r: &RequirementCoverage) {
        let entry = self.per_class.entry(r.frequency).or_insert((0, 0, 0, 0.0));
        entry.0 += 1;
        entry.1 += r.required_instances;
        entry.2 += r.satisfied_instances;
        entry.3 += r.coverage_fraction;
        self.total_fraction += r.coverage_fraction;
    }

    fn finish(self, horizon: Horizon, requirements: Vec<RequirementCoverage>) -> CoverageReport {
        let classes: Vec<ClassCoverage> = self
            .per_class
            .into_iter()
            .map(|(frequency, (count, required, satisfied, sum))| {
                let mean = if count == 0 { 0.0 } else { sum / count as f64 };
                let status = class_status(frequency, mean);
                ClassCoverage {
                    frequency,
                    requirement_count: count,
                    required_instances: required,
                    satisfied_instances: satisfied,
                    mean_fraction: mean,
                    status,
                    passed: status >= CoverageStatus::Acceptable,
                }
            })
            .collect();

        let daily_passed = classes
            .iter()
            .find(|c| c.frequency == FrequencyClass::Daily)
            .map(|c| c.passed)
            .unwrap_or(true);

        // 没有任何要求时视为全部满足
        let min_fraction = classes
            .iter()
            .map(|c| c.mean_fraction)
            .fold(1.0_f64, f64::min);

        CoverageReport {
            horizon,
            requirements,
            classes,
            overall: overall_status(min_fraction),
            daily_passed,
            total_fraction: self.total_fraction,
        }
    }
}
