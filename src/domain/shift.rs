// ==========================================
// PPM 资质覆盖规划系统 - 班次与维护窗口领域模型
// ==========================================
// 职责: 班次代码、时间窗口、PPM 维护窗口定义
// 红线: 配置加载后只读
// ==========================================

use crate::domain::types::{FrequencyClass, Role};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// TimeWindow - 时间窗口
// ==========================================
// 结束时间早于开始时间时视为跨午夜
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// 窗口时长（小时）
    pub fn duration_hours(&self) -> f64 {
        let minutes = (self.end - self.start).num_minutes();
        let minutes = if minutes <= 0 { minutes + 24 * 60 } else { minutes };
        minutes as f64 / 60.0
    }
}

// ==========================================
// ShiftCode - 班次代码
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftCode {
    pub code: String,  // 班次代码 (E/L/M/O...)
    pub label: String, // 显示名称

    /// 是否为工作班次 (休息班次永不参与覆盖)
    pub working: bool,

    // ===== 时间窗口 =====
    // 只配置一个窗口时,工作日与周末共用
    #[serde(default)]
    pub weekday: Option<TimeWindow>,
    #[serde(default)]
    pub weekend: Option<TimeWindow>,
    #[serde(default)]
    pub window: Option<TimeWindow>,

    #[serde(default)]
    pub valid_for_handover: bool,

    /// 限定角色的班次 (例如仅电气)
    #[serde(default, alias = "team_restriction")]
    pub role_restriction: Option<Role>,

    #[serde(default)]
    pub description: Option<String>,
}

impl ShiftCode {
    /// 指定日类型的时间窗口
    ///
    /// # 参数
    /// - `is_weekend`: 是否周末
    ///
    /// # 返回
    /// None 表示该班次在此日类型不出勤
    pub fn window_for(&self, is_weekend: bool) -> Option<TimeWindow> {
        let specific = if is_weekend { self.weekend } else { self.weekday };
        specific.or(self.window)
    }

    /// 当天是否在岗
    pub fn on_duty(&self, is_weekend: bool) -> bool {
        self.working && self.window_for(is_weekend).is_some()
    }

    /// 班次角色限制是否允许为指定角色的要求出力
    pub fn admits_role(&self, role: Option<Role>) -> bool {
        match (self.role_restriction, role) {
            (Some(restricted), Some(required)) => restricted == required,
            _ => true,
        }
    }
}

// ==========================================
// PpmWindow - PPM 维护窗口
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PpmWindow {
    pub id: String,
    pub label: String,
    pub time_range: TimeWindow,
    pub duration_hours: f64,
    pub compatible_shifts: BTreeSet<String>,
    pub valid_for: BTreeSet<FrequencyClass>,
    #[serde(default)]
    pub description: Option<String>,
}

impl PpmWindow {
    /// 班次是否可在此窗口内执行维护
    pub fn admits_shift(&self, shift_code: &str) -> bool {
        self.compatible_shifts.contains(shift_code)
    }

    /// 窗口是否适用于该频次
    pub fn serves(&self, frequency: FrequencyClass) -> bool {
        self.valid_for.contains(&frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_duration_same_day_and_overnight() {
        assert!((TimeWindow::new(t(6, 0), t(9, 30)).duration_hours() - 3.5).abs() < 1e-9);
        assert!((TimeWindow::new(t(22, 0), t(6, 0)).duration_hours() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_window_shared_by_weekend() {
        let shift = ShiftCode {
            code: "E".to_string(),
            label: "Early".to_string(),
            working: true,
            weekday: None,
            weekend: None,
            window: Some(TimeWindow::new(t(6, 0), t(14, 0))),
            valid_for_handover: true,
            role_restriction: None,
            description: None,
        };
        assert!(shift.on_duty(false));
        assert!(shift.on_duty(true));
    }

    #[test]
    fn test_role_restriction() {
        let shift = ShiftCode {
            code: "M".to_string(),
            label: "Mid".to_string(),
            working: true,
            weekday: Some(TimeWindow::new(t(9, 30), t(18, 45))),
            weekend: None,
            window: None,
            valid_for_handover: false,
            role_restriction: Some(Role::Electrical),
            description: None,
        };
        assert!(shift.admits_role(None));
        assert!(shift.admits_role(Some(Role::Electrical)));
        assert!(!shift.admits_role(Some(Role::Mechanical)));
        assert!(!shift.on_duty(true));
    }
}
