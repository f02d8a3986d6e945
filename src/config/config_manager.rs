// ==========================================
// PPM 资质覆盖规划系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::config_reader::PlanningConfigReader;
use crate::config::error::{ConfigError, ConfigResult};
use crate::config::settings::{RunSettings, StaticTables};
use crate::config::strategy_profile::CustomStrategyProfile;
use crate::engine::strategy::{OptimizationStrategy, StrategyProfile};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 内存库（测试/一次性运行）
    pub fn in_memory() -> ConfigResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会确保 config_kv 表存在（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            conn_guard.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
            conn_guard.execute_batch(
                "CREATE TABLE IF NOT EXISTS config_kv (
                    scope_id TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    PRIMARY KEY (scope_id, key)
                );",
            )?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 解析配置值，不存在时使用默认值
    fn get_parsed_or<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    // ===== 静态表 =====

    /// 写入班次表与维护窗口表
    pub fn store_static_tables(&self, tables: &StaticTables) -> ConfigResult<()> {
        self.set_global_config_value(
            config_keys::SHIFT_CODES,
            &serde_json::to_string(&tables.shift_codes)?,
        )?;
        self.set_global_config_value(
            config_keys::PPM_WINDOWS,
            &serde_json::to_string(&tables.ppm_windows)?,
        )?;
        Ok(())
    }

    // ===== 自定义策略 =====

    /// 保存自定义策略（存储于 config_kv: custom_strategy/{strategy_id}）
    pub fn save_custom_strategy_profile(&self, profile: &CustomStrategyProfile) -> ConfigResult<()> {
        let id = profile.strategy_id.trim();
        if id.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "custom_strategy".to_string(),
                message: "strategy_id 不能为空".to_string(),
            });
        }
        let key = format!("custom_strategy/{}", id);
        self.set_global_config_value(&key, &serde_json::to_string(profile)?)
    }

    /// 读取自定义策略配置
    pub fn get_custom_strategy_profile(
        &self,
        strategy_id: &str,
    ) -> ConfigResult<Option<CustomStrategyProfile>> {
        let id = strategy_id.trim();
        if id.is_empty() {
            return Ok(None);
        }

        let key = format!("custom_strategy/{}", id);
        let raw = match self.get_config_value(&key)? {
            Some(v) => v,
            None => return Ok(None),
        };

        let profile: CustomStrategyProfile = serde_json::from_str(&raw)?;
        Ok(Some(profile))
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 在运行报告中记录配置快照,保证结果可复现
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// PlanningConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PlanningConfigReader for ConfigManager {
    async fn get_static_tables(&self) -> ConfigResult<StaticTables> {
        let shift_raw = self
            .get_config_value(config_keys::SHIFT_CODES)?
            .ok_or_else(|| ConfigError::MissingKey(config_keys::SHIFT_CODES.to_string()))?;
        let window_raw = self
            .get_config_value(config_keys::PPM_WINDOWS)?
            .ok_or_else(|| ConfigError::MissingKey(config_keys::PPM_WINDOWS.to_string()))?;

        Ok(StaticTables {
            shift_codes: serde_json::from_str(&shift_raw)?,
            ppm_windows: serde_json::from_str(&window_raw)?,
        })
    }

    async fn get_run_settings(&self) -> ConfigResult<RunSettings> {
        let defaults = RunSettings::default();

        let horizon_start = match self.get_config_value(config_keys::HORIZON_START)? {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                ConfigError::InvalidValue {
                    key: config_keys::HORIZON_START.to_string(),
                    message: e.to_string(),
                }
            })?,
            None => defaults.horizon_start,
        };

        // 0 表示不设超时
        let timeout_ms = self.get_parsed_or(
            config_keys::SOLVER_TIMEOUT_MS,
            defaults.solver_timeout_ms.unwrap_or(0),
        )?;

        let settings = RunSettings {
            horizon_start,
            horizon_days: self.get_parsed_or(config_keys::HORIZON_DAYS, defaults.horizon_days)?,
            solver_timeout_ms: if timeout_ms == 0 { None } else { Some(timeout_ms) },
            workload_tolerance_pct: self.get_parsed_or(
                config_keys::WORKLOAD_TOLERANCE_PCT,
                defaults.workload_tolerance_pct,
            )?,
            handover_policy: self
                .get_parsed_or(config_keys::HANDOVER_POLICY, defaults.handover_policy)?,
            default_strategy: self
                .get_parsed_or(config_keys::DEFAULT_STRATEGY, defaults.default_strategy)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    async fn get_strategy_profile(&self, strategy_key: &str) -> ConfigResult<StrategyProfile> {
        let tolerance = self.get_parsed_or(
            config_keys::WORKLOAD_TOLERANCE_PCT,
            RunSettings::default().workload_tolerance_pct,
        )?;

        if let Some(custom_id) = strategy_key.strip_prefix("custom:") {
            let custom = self
                .get_custom_strategy_profile(custom_id)?
                .ok_or_else(|| ConfigError::MissingKey(format!("custom_strategy/{}", custom_id)))?;
            return StrategyProfile::from_custom(&custom, tolerance);
        }

        let strategy: OptimizationStrategy =
            strategy_key
                .parse()
                .map_err(|message| ConfigError::InvalidValue {
                    key: "strategy".to_string(),
                    message,
                })?;
        Ok(StrategyProfile::preset(strategy, tolerance))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 静态表 (JSON)
    pub const SHIFT_CODES: &str = "shift_codes";
    pub const PPM_WINDOWS: &str = "ppm_windows";

    // 仿真区间
    pub const HORIZON_START: &str = "horizon_start"; // YYYY-MM-DD
    pub const HORIZON_DAYS: &str = "horizon_days";

    // 求解
    pub const SOLVER_TIMEOUT_MS: &str = "solver_timeout_ms";
    pub const WORKLOAD_TOLERANCE_PCT: &str = "workload_tolerance_pct";
    pub const DEFAULT_STRATEGY: &str = "default_strategy";

    // 交接班
    pub const HANDOVER_POLICY: &str = "handover_policy";
}
