// ==========================================
// PPM 资质覆盖规划系统 - 维护窗口目录
// ==========================================
// 职责: 班次代码 → 兼容维护窗口 / 频次 的静态查表
// 输入: StaticTables (班次表 + 维护窗口表)
// 输出: 只读目录,加载时完成一致性校验
// 红线: 未定义班次引用、非正时长 → ConfigError,在仿真前终止
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::settings::StaticTables;
use crate::domain::shift::{PpmWindow, ShiftCode};
use crate::domain::types::FrequencyClass;
use std::collections::BTreeMap;
use tracing::info;

// 浮点时长比较容差,避免 7.0/3.5 之类因舍入多出一人
const DURATION_EPSILON: f64 = 1e-9;

// ==========================================
// PpmWindowCatalog - 维护窗口目录
// ==========================================
#[derive(Debug, Clone)]
pub struct PpmWindowCatalog {
    shifts: BTreeMap<String, ShiftCode>,
    windows: BTreeMap<String, PpmWindow>,
}

impl PpmWindowCatalog {
    /// 加载并校验静态表
    ///
    /// 校验项:
    /// 1) 班次代码、窗口 ID 不重复
    /// 2) 窗口时长 > 0
    /// 3) 窗口至少声明一个适用频次
    /// 4) compatible_shifts 中的每个班次均已定义
    pub fn load(tables: StaticTables) -> ConfigResult<Self> {
        let mut shifts = BTreeMap::new();
        for shift in tables.shift_codes {
            if shifts.contains_key(&shift.code) {
                return Err(ConfigError::DuplicateId {
                    entity: "shift_code".to_string(),
                    id: shift.code,
                });
            }
            shifts.insert(shift.code.clone(), shift);
        }

        let mut windows = BTreeMap::new();
        for window in tables.ppm_windows {
            if windows.contains_key(&window.id) {
                return Err(ConfigError::DuplicateId {
                    entity: "ppm_window".to_string(),
                    id: window.id,
                });
            }
            if !(window.duration_hours > 0.0) {
                return Err(ConfigError::NonPositiveDuration {
                    entity: "ppm_window".to_string(),
                    id: window.id,
                    value: window.duration_hours,
                });
            }
            if window.valid_for.is_empty() {
                return Err(ConfigError::EmptyFrequencySet(window.id));
            }
            if let Some(missing) = window
                .compatible_shifts
                .iter()
                .find(|code| !shifts.contains_key(*code))
            {
                return Err(ConfigError::UndefinedShiftReference {
                    window_id: window.id.clone(),
                    shift_code: missing.clone(),
                });
            }
            windows.insert(window.id.clone(), window);
        }

        info!(
            shift_count = shifts.len(),
            window_count = windows.len(),
            "维护窗口目录加载完成"
        );

        Ok(Self { shifts, windows })
    }

    // ==========================================
    // 查询方法
    // ==========================================

    /// 班次在指定窗口、指定频次下是否兼容
    ///
    /// 仅当 shift_code ∈ window.compatible_shifts 且 frequency ∈ window.valid_for 时为真
    pub fn is_compatible(&self, shift_code: &str, window_id: &str, frequency: FrequencyClass) -> bool {
        self.windows
            .get(window_id)
            .map(|w| w.admits_shift(shift_code) && w.serves(frequency))
            .unwrap_or(false)
    }

    /// 所需同时在岗人数 = ceil(duration / window.duration),最少 1 人
    ///
    /// # 返回
    /// None 表示窗口未定义
    pub fn required_engineer_count(&self, window_id: &str, duration_hours: f64) -> Option<u32> {
        let window = self.windows.get(window_id)?;
        let ratio = duration_hours / window.duration_hours;
        let count = (ratio - DURATION_EPSILON).ceil();
        Some(if count.is_finite() && count >= 1.0 { count as u32 } else { 1 })
    }

    /// 适用于指定频次的窗口（按 ID 升序）
    pub fn windows_for(&self, frequency: FrequencyClass) -> impl Iterator<Item = &PpmWindow> {
        self.windows
            .values()
            .filter(move |w| w.serves(frequency))
    }

    pub fn windows(&self) -> impl Iterator<Item = &PpmWindow> {
        self.windows.values()
    }

    pub fn window(&self, window_id: &str) -> Option<&PpmWindow> {
        self.windows.get(window_id)
    }

    pub fn shift(&self, code: &str) -> Option<&ShiftCode> {
        self.shifts.get(code)
    }

    pub fn shift_codes(&self) -> impl Iterator<Item = &ShiftCode> {
        self.shifts.values()
    }
}
