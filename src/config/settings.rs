// ==========================================
// PPM 资质覆盖规划系统 - 静态配置表与运行参数
// ==========================================
// 职责: 班次表/维护窗口表的原始载体,运行期参数默认值
// 说明: 一致性校验在 PpmWindowCatalog::load 中完成
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::shift::{PpmWindow, ShiftCode};
use crate::domain::types::HandoverPolicy;
use crate::engine::strategy::OptimizationStrategy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// StaticTables - 静态配置表
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticTables {
    pub shift_codes: Vec<ShiftCode>,
    pub ppm_windows: Vec<PpmWindow>,
}

impl StaticTables {
    /// 从 JSON 文本解析
    ///
    /// 格式: {"shift_codes": [...], "ppm_windows": [...]}
    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

// ==========================================
// RunSettings - 运行参数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    pub horizon_start: NaiveDate,
    pub horizon_days: usize,          // 仿真天数: 默认 18 周
    pub solver_timeout_ms: Option<u64>, // 求解超时: 默认 5 分钟
    pub workload_tolerance_pct: f64,  // 班组均值容差带: 默认 25%
    pub handover_policy: HandoverPolicy,
    pub default_strategy: OptimizationStrategy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            horizon_start: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap_or_default(),
            horizon_days: 18 * 7,
            solver_timeout_ms: Some(300_000),
            workload_tolerance_pct: 0.25,
            handover_policy: HandoverPolicy::Ignore,
            default_strategy: OptimizationStrategy::Balanced,
        }
    }
}

impl RunSettings {
    pub fn solver_timeout(&self) -> Option<Duration> {
        self.solver_timeout_ms.map(Duration::from_millis)
    }

    /// 参数合法性校验
    pub fn validate(&self) -> ConfigResult<()> {
        if self.horizon_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "horizon_days".to_string(),
                message: "仿真天数必须大于 0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.workload_tolerance_pct) {
            return Err(ConfigError::InvalidValue {
                key: "workload_tolerance_pct".to_string(),
                message: format!("容差必须在 [0, 1] 内: {}", self.workload_tolerance_pct),
            });
        }
        Ok(())
    }
}
