// ==========================================
// PPM 资质覆盖规划系统 - 规划配置读取 Trait
// ==========================================
// 职责: 定义规划流水线所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::settings::{RunSettings, StaticTables};
use crate::engine::strategy::StrategyProfile;
use async_trait::async_trait;

// ==========================================
// PlanningConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）、InMemoryConfig（测试/嵌入场景）
#[async_trait]
pub trait PlanningConfigReader: Send + Sync {
    /// 获取班次表与维护窗口表（原始表,未校验）
    async fn get_static_tables(&self) -> ConfigResult<StaticTables>;

    /// 获取运行参数
    ///
    /// # 默认值
    /// - 见 RunSettings::default
    async fn get_run_settings(&self) -> ConfigResult<RunSettings>;

    /// 解析策略键
    ///
    /// # 参数
    /// - `strategy_key`: 预设策略名（balanced/exact/...）或 `custom:{id}`
    async fn get_strategy_profile(&self, strategy_key: &str) -> ConfigResult<StrategyProfile>;
}

// ==========================================
// InMemoryConfig - 内存配置
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfig {
    pub tables: StaticTables,
    pub settings: RunSettings,
    pub custom_profiles: Vec<StrategyProfile>,
}

impl InMemoryConfig {
    pub fn new(tables: StaticTables, settings: RunSettings) -> Self {
        Self {
            tables,
            settings,
            custom_profiles: Vec::new(),
        }
    }
}

#[async_trait]
impl PlanningConfigReader for InMemoryConfig {
    async fn get_static_tables(&self) -> ConfigResult<StaticTables> {
        Ok(self.tables.clone())
    }

    async fn get_run_settings(&self) -> ConfigResult<RunSettings> {
        Ok(self.settings.clone())
    }

    async fn get_strategy_profile(&self, strategy_key: &str) -> ConfigResult<StrategyProfile> {
        if let Some(profile) = self
            .custom_profiles
            .iter()
            .find(|p| p.strategy_key == strategy_key)
        {
            return Ok(profile.clone());
        }

        let strategy = strategy_key
            .parse()
            .map_err(|message| ConfigError::InvalidValue {
                key: "strategy".to_string(),
                message,
            })?;
        Ok(StrategyProfile::preset(
            strategy,
            self.settings.workload_tolerance_pct,
        ))
    }
}
