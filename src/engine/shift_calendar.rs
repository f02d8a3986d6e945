// ==========================================
// PPM 资质覆盖规划系统 - 轮班日历
// ==========================================
// 职责: 由周期性轮班定义推导任意 (工程师, 日期) 的班次
// 输入: RotationAssignment 列表 (外部只读)
// 输出: O(1) 查表 + 可重启的惰性班次序列
// 红线: 不物化逐日日历,只存 (周期, 偏移, 班次序列)
// ==========================================

use crate::domain::roster::RotationAssignment;
use crate::engine::error::{DataIssue, EngineError, EngineResult};
use crate::engine::ppm_catalog::PpmWindowCatalog;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{info, warn};

// ==========================================
// ShiftCalendar - 轮班日历
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ShiftCalendar {
    rotations: HashMap<String, RotationAssignment>,
}

impl ShiftCalendar {
    /// 构建日历并校验轮班定义
    ///
    /// 无效轮班不终止流程: 以 DataIssue 上报,该工程师视为无轮班
    ///
    /// # 参数
    /// - `rotations`: 外部轮班分配
    /// - `catalog`: 维护窗口目录 (用于校验班次代码)
    ///
    /// # 返回
    /// (日历, 数据问题列表)
    pub fn build(
        rotations: Vec<RotationAssignment>,
        catalog: &PpmWindowCatalog,
    ) -> (Self, Vec<DataIssue>) {
        let mut accepted = HashMap::new();
        let mut issues = Vec::new();

        for rotation in rotations {
            if let Some(issue) = Self::check_rotation(&rotation, catalog) {
                warn!(engineer_id = %rotation.engineer_id, reason = %issue.reason, "轮班定义无效");
                issues.push(issue);
                continue;
            }
            if accepted.contains_key(&rotation.engineer_id) {
                issues.push(DataIssue::new(
                    "rotation",
                    &rotation.engineer_id,
                    "重复的轮班定义,保留第一条",
                ));
                continue;
            }
            accepted.insert(rotation.engineer_id.clone(), rotation);
        }

        info!(
            rotation_count = accepted.len(),
            issue_count = issues.len(),
            "轮班日历构建完成"
        );

        (Self { rotations: accepted }, issues)
    }

    fn check_rotation(rotation: &RotationAssignment, catalog: &PpmWindowCatalog) -> Option<DataIssue> {
        let weeks = match rotation.cycle_weeks() {
            Some(w) => w,
            None => {
                return Some(DataIssue::new(
                    "rotation",
                    &rotation.engineer_id,
                    format!("周期长度 {} 天不是整周", rotation.cycle.len()),
                ))
            }
        };

        if !(RotationAssignment::MIN_CYCLE_WEEKS..=RotationAssignment::MAX_CYCLE_WEEKS)
            .contains(&weeks)
        {
            return Some(DataIssue::new(
                "rotation",
                &rotation.engineer_id,
                format!(
                    "周期 {} 周超出范围 [{}, {}]",
                    weeks,
                    RotationAssignment::MIN_CYCLE_WEEKS,
                    RotationAssignment::MAX_CYCLE_WEEKS
                ),
            ));
        }

        rotation
            .cycle
            .iter()
            .find(|code| catalog.shift(code).is_none())
            .map(|code| {
                DataIssue::new(
                    "rotation",
                    &rotation.engineer_id,
                    format!("引用了未定义的班次代码: {}", code),
                )
            })
    }

    // ==========================================
    // 查询方法
    // ==========================================

    pub fn has_rotation(&self, engineer_id: &str) -> bool {
        self.rotations.contains_key(engineer_id)
    }

    pub fn cycle_weeks(&self, engineer_id: &str) -> Option<usize> {
        self.rotations.get(engineer_id).and_then(|r| r.cycle_weeks())
    }

    /// 指定工程师在指定日期的班次代码
    ///
    /// index = (date - anchor + offset) mod cycle_len,早于 anchor 的日期同样可解析
    pub fn shift_on(&self, engineer_id: &str, date: NaiveDate) -> EngineResult<&str> {
        let rotation = self.rotation(engineer_id)?;
        Ok(rotation.cycle[cycle_index(rotation, date)].as_str())
    }

    /// 从 start 起连续 days 天的惰性班次序列
    pub fn shifts(&self, engineer_id: &str, start: NaiveDate, days: usize) -> EngineResult<ShiftIter<'_>> {
        let rotation = self.rotation(engineer_id)?;
        Ok(ShiftIter {
            rotation,
            start_index: cycle_index(rotation, start),
            position: 0,
            days,
        })
    }

    fn rotation(&self, engineer_id: &str) -> EngineResult<&RotationAssignment> {
        self.rotations
            .get(engineer_id)
            .ok_or_else(|| EngineError::not_found("rotation", engineer_id))
    }
}

fn cycle_index(rotation: &RotationAssignment, date: NaiveDate) -> usize {
    let len = rotation.cycle.len() as i64;
    let days = (date - rotation.anchor_date).num_days() + rotation.offset_days;
    days.rem_euclid(len) as usize
}

// ==========================================
// ShiftIter - 惰性班次序列
// ==========================================
// Clone 即可从头重启
#[derive(Debug, Clone)]
pub struct ShiftIter<'a> {
    rotation: &'a RotationAssignment,
    start_index: usize,
    position: usize,
    days: usize,
}

impl<'a> ShiftIter<'a> {
    /// 回到序列起点
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl<'a> Iterator for ShiftIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.days {
            return None;
        }
        let len = self.rotation.cycle.len();
        let code = &self.rotation.cycle[(self.start_index + self.position) % len];
        self.position += 1;
        Some(code.as_str())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.days.saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for ShiftIter<'a> {}
