// ==========================================
// PPM 资质覆盖规划系统 - 领域类型定义
// ==========================================
// 职责: 频次等级、角色、设施等级、覆盖状态、风险等级
// 序列化格式: SCREAMING_SNAKE_CASE (与配置表一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 频次等级 (Frequency Class)
// ==========================================
// 顺序: Daily < Weekly < Monthly (越靠前越频繁)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrequencyClass {
    Daily,   // 每日
    Weekly,  // 每周
    Monthly, // 每月
}

impl FrequencyClass {
    pub const ALL: [FrequencyClass; 3] = [
        FrequencyClass::Daily,
        FrequencyClass::Weekly,
        FrequencyClass::Monthly,
    ];

    /// 滚动窗口长度（天）
    ///
    /// 每日要求逐日校验,窗口长度为 1
    pub fn window_days(&self) -> usize {
        match self {
            FrequencyClass::Daily => 1,
            FrequencyClass::Weekly => 7,
            FrequencyClass::Monthly => 30,
        }
    }

    /// 培训优先级权重 (每日10 / 每周5 / 每月2)
    pub fn priority_weight(&self) -> i64 {
        match self {
            FrequencyClass::Daily => 10,
            FrequencyClass::Weekly => 5,
            FrequencyClass::Monthly => 2,
        }
    }
}

impl fmt::Display for FrequencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyClass::Daily => write!(f, "DAILY"),
            FrequencyClass::Weekly => write!(f, "WEEKLY"),
            FrequencyClass::Monthly => write!(f, "MONTHLY"),
        }
    }
}

impl std::str::FromStr for FrequencyClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DAILY" => Ok(FrequencyClass::Daily),
            "WEEKLY" => Ok(FrequencyClass::Weekly),
            "MONTHLY" => Ok(FrequencyClass::Monthly),
            other => Err(format!("未知频次等级: {}", other)),
        }
    }
}

// ==========================================
// 工程师角色 (Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Electrical, // 电气
    Mechanical, // 机械
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Electrical => write!(f, "ELECTRICAL"),
            Role::Mechanical => write!(f, "MECHANICAL"),
        }
    }
}

// ==========================================
// 设施等级 (Ride Class)
// ==========================================
// A: 复杂 / B: 中等 / C: 简单
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RideClass {
    A,
    B,
    C,
}

impl RideClass {
    pub const ALL: [RideClass; 3] = [RideClass::A, RideClass::B, RideClass::C];
}

impl fmt::Display for RideClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RideClass::A => write!(f, "A"),
            RideClass::B => write!(f, "B"),
            RideClass::C => write!(f, "C"),
        }
    }
}

// ==========================================
// 覆盖状态 (Coverage Status)
// ==========================================
// 顺序: Insufficient < Acceptable < Good < Excellent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoverageStatus {
    Insufficient, // 不足
    Acceptable,   // 可接受
    Good,         // 良好
    Excellent,    // 优秀
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageStatus::Insufficient => write!(f, "INSUFFICIENT"),
            CoverageStatus::Acceptable => write!(f, "ACCEPTABLE"),
            CoverageStatus::Good => write!(f, "GOOD"),
            CoverageStatus::Excellent => write!(f, "EXCELLENT"),
        }
    }
}

// ==========================================
// 资质风险等级 (Risk Level)
// ==========================================
// 顺序: Low < Medium < High < Critical
// Critical 只用于汇总等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,      // 冗余充足且跨班组
    Medium,   // 冗余充足但集中于单一班组
    High,     // 单点故障
    Critical, // 单点故障过半
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ==========================================
// 交接班策略 (Handover Policy)
// ==========================================
// Ignore: 不校验交接班
// Strict: 当天班次与前一天不同时,新班次必须允许交接
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandoverPolicy {
    #[default]
    Ignore,
    Strict,
}

impl std::str::FromStr for HandoverPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IGNORE" => Ok(HandoverPolicy::Ignore),
            "STRICT" => Ok(HandoverPolicy::Strict),
            other => Err(format!("未知交接班策略: {}", other)),
        }
    }
}
