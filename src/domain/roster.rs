// ==========================================
// PPM 资质覆盖规划系统 - 人员与设施领域模型
// ==========================================
// 职责: 设施、PPM 要求、工程师、轮班分配
// 红线: 轮班分配为外部输入,只读
// ==========================================

use crate::domain::types::{FrequencyClass, RideClass, Role};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// Ride - 设施
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ride {
    pub ride_id: String,
    pub team: String,      // 负责班组
    pub class: RideClass,  // 复杂度等级
}

// ==========================================
// Requirement - PPM 资质要求
// ==========================================
// 同时在岗人数按维护窗口派生,不在此存储
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub ride_id: String,
    pub qualification_id: String,
    pub frequency: FrequencyClass,
    pub duration_hours: f64,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Requirement {
    /// 工程师角色是否满足要求的角色限制
    pub fn admits(&self, roles: &BTreeSet<Role>) -> bool {
        match self.role {
            Some(role) => roles.contains(&role),
            None => true,
        }
    }

    /// 报告用的要求键 (ride/qualification/frequency[/role])
    pub fn key(&self) -> String {
        match self.role {
            Some(role) => format!(
                "{}/{}/{}/{}",
                self.ride_id, self.qualification_id, self.frequency, role
            ),
            None => format!("{}/{}/{}", self.ride_id, self.qualification_id, self.frequency),
        }
    }
}

// ==========================================
// Engineer - 工程师
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engineer {
    pub engineer_id: String,
    pub team: String,
    pub roles: BTreeSet<Role>,
    pub assigned_rides: BTreeSet<String>,
    #[serde(default)]
    pub qualifications: BTreeSet<String>,

    /// 空缺岗位 (尚未招聘)
    #[serde(default)]
    pub vacancy: bool,
}

// ==========================================
// RotationAssignment - 轮班分配
// ==========================================
// cycle[i] 为周期内第 i 天的班次代码
// 日期 d 的班次 = cycle[(d - anchor + offset) mod len]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationAssignment {
    pub engineer_id: String,
    pub anchor_date: NaiveDate,
    #[serde(default)]
    pub offset_days: i64,
    pub cycle: Vec<String>,
}

impl RotationAssignment {
    pub const MIN_CYCLE_WEEKS: usize = 9;
    pub const MAX_CYCLE_WEEKS: usize = 18;

    /// 周期长度（周）,不足整周时返回 None
    pub fn cycle_weeks(&self) -> Option<usize> {
        if self.cycle.is_empty() || self.cycle.len() % 7 != 0 {
            None
        } else {
            Some(self.cycle.len() / 7)
        }
    }
}
