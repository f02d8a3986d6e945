use serde::{Deserialize, Serialize};

/// 自定义优化策略（持久化对象）
///
/// 存储位置：config_kv（scope_id='global'，key='custom_strategy/{strategy_id}'）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomStrategyProfile {
    /// 自定义策略 ID（用于选择/引用）
    pub strategy_id: String,

    /// 显示名称
    pub title: String,

    /// 说明（可选）
    #[serde(default)]
    pub description: Option<String>,

    /// 基于哪个预设策略（balanced/coverage_max/constraint_enhanced/exact/progressive_training）
    pub base_strategy: String,

    /// 参数覆写（未填写的维度沿用预设值）
    #[serde(default)]
    pub parameters: CustomStrategyParameters,
}

/// 自定义策略参数
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CustomStrategyParameters {
    /// 覆盖率权重（主目标）
    #[serde(default)]
    pub coverage_weight: Option<f64>,

    /// 资质授予数量惩罚（次目标，避免过度授予）
    #[serde(default)]
    pub qualification_weight: Option<f64>,

    /// 工作量不均衡惩罚（软约束时生效）
    #[serde(default)]
    pub balance_weight: Option<f64>,

    /// 培训量惩罚（新授予且当前未持有的资质）
    #[serde(default)]
    pub training_weight: Option<f64>,

    /// 班组均值容差（0~1）
    #[serde(default)]
    pub workload_tolerance_pct: Option<f64>,

    /// 工作量均衡是否为硬约束
    #[serde(default)]
    pub workload_balance_hard: Option<bool>,

    /// A/B/C 等级配比是否为硬约束
    #[serde(default)]
    pub class_split_hard: Option<bool>,

    /// 不可行时的松弛重试次数上限
    #[serde(default)]
    pub max_relaxations: Option<usize>,
}
