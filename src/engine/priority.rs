// ==========================================
// PPM 资质覆盖规划系统 - 培训优先级引擎
// ==========================================
// 职责: 按缺失资质的频次加权,对工程师排序
// 输入: 花名册 + 要求目录 + 资质矩阵
// 输出: 按优先级降序的 PriorityEntry 列表 (同分按工程师ID升序)
// ==========================================

use crate::domain::matrix::QualificationMatrix;
use crate::domain::roster::Engineer;
use crate::domain::types::FrequencyClass;
use crate::engine::requirement_catalog::RequirementCatalog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// 空缺岗位的优先级扣分
pub const VACANCY_PENALTY: i64 = -20;

// ==========================================
// PriorityEntry - 单个工程师的优先级
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub rank: usize, // 1 起
    pub engineer_id: String,
    pub team: String,
    pub score: i64,
    pub vacancy: bool,

    // ===== 缺失资质计数 (每项资质只按最高频次计一次) =====
    pub missing_daily: usize,
    pub missing_weekly: usize,
    pub missing_monthly: usize,

    /// 设施 → 缺失资质
    pub missing_by_ride: BTreeMap<String, BTreeSet<String>>,
}

impl PriorityEntry {
    pub fn missing_total(&self) -> usize {
        self.missing_daily + self.missing_weekly + self.missing_monthly
    }
}

// ==========================================
// PriorityScorer - 培训优先级引擎
// ==========================================
pub struct PriorityScorer {
    // 无状态引擎
}

impl PriorityScorer {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算单个工程师的优先级 (rank 暂为 0)
    ///
    /// 只统计所负责设施上、角色合格、且矩阵中未持有的资质
    pub fn score(
        &self,
        engineer: &Engineer,
        catalog: &RequirementCatalog,
        matrix: &QualificationMatrix,
    ) -> PriorityEntry {
        // 资质 → 最高频次 (Daily 最小)
        let mut highest: BTreeMap<&str, FrequencyClass> = BTreeMap::new();
        let mut missing_by_ride: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for ride_id in &engineer.assigned_rides {
            for req in catalog.requirements_for_ride(ride_id) {
                if !req.admits(&engineer.roles)
                    || matrix.holds(&engineer.engineer_id, &req.qualification_id)
                {
                    continue;
                }
                highest
                    .entry(req.qualification_id.as_str())
                    .and_modify(|f| *f = (*f).min(req.frequency))
                    .or_insert(req.frequency);
                missing_by_ride
                    .entry(ride_id.clone())
                    .or_default()
                    .insert(req.qualification_id.clone());
            }
        }

        let count = |class: FrequencyClass| highest.values().filter(|f| **f == class).count();
        let missing_daily = count(FrequencyClass::Daily);
        let missing_weekly = count(FrequencyClass::Weekly);
        let missing_monthly = count(FrequencyClass::Monthly);

        let mut score: i64 = highest.values().map(|f| f.priority_weight()).sum();
        if engineer.vacancy {
            score += VACANCY_PENALTY;
        }

        PriorityEntry {
            rank: 0,
            engineer_id: engineer.engineer_id.clone(),
            team: engineer.team.clone(),
            score,
            vacancy: engineer.vacancy,
            missing_daily,
            missing_weekly,
            missing_monthly,
            missing_by_ride,
        }
    }

    /// 对全部工程师排序
    ///
    /// 排序键: score 降序 → engineer_id 升序
    ///
    /// # 返回
    /// 含每位工程师的完整排名 (rank 从 1 开始)
    pub fn rank(
        &self,
        engineers: &[Engineer],
        catalog: &RequirementCatalog,
        matrix: &QualificationMatrix,
    ) -> Vec<PriorityEntry> {
        let mut entries: Vec<PriorityEntry> = engineers
            .iter()
            .map(|e| self.score(e, catalog, matrix))
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.engineer_id.cmp(&b.engineer_id))
        });
        for (idx, entry) in entries.iter_mut().enumerate() {
            entry.rank = idx + 1;
        }

        debug!(
            engineer_count = entries.len(),
            top_score = entries.first().map(|e| e.score).unwrap_or(0),
            "培训优先级排序完成"
        );
        entries
    }
}

impl Default for PriorityScorer {
    fn default() -> Self {
        Self::new()
    }
}
