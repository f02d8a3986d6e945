// ==========================================
// PPM 资质覆盖规划系统 - 资质风险分级引擎
// ==========================================
// 职责: 按冗余度为每项被要求的资质分级,识别单点故障与覆盖缺口
// 输入: 覆盖仿真器 (在岗信息) + 要求目录 + 资质矩阵
// 输出: RiskReport
// ==========================================

use crate::domain::matrix::QualificationMatrix;
use crate::domain::roster::Requirement;
use crate::domain::types::RiskLevel;
use crate::engine::coverage::CoverageSimulator;
use crate::engine::requirement_catalog::RequirementCatalog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

// 汇总等级阈值 (单点故障占比)
const CRITICAL_SPOF_RATIO: f64 = 0.5;
const HIGH_SPOF_RATIO: f64 = 0.3;
const MEDIUM_SPOF_RATIO: f64 = 0.1;

/// 单项资质的风险
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationRisk {
    pub qualification_id: String,
    pub redundancy: usize,
    pub holders: Vec<String>,
    pub teams: BTreeSet<String>,
    pub level: RiskLevel,
}

/// 风险报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// 冗余度 ≥ 1 的资质 (按资质ID升序)
    pub qualifications: Vec<QualificationRisk>,
    pub single_points_of_failure: Vec<String>,
    /// 冗余度为 0 的资质
    pub coverage_gaps: Vec<String>,
    pub good_redundancy: usize,      // ≥2
    pub excellent_redundancy: usize, // ≥3
    pub spof_ratio: f64,
    pub aggregate: RiskLevel,
}

// ==========================================
// RiskClassifier - 资质风险分级引擎
// ==========================================
pub struct RiskClassifier {
    // 无状态引擎
}

impl RiskClassifier {
    pub fn new() -> Self {
        Self {}
    }

    /// 单项资质分级
    ///
    /// - ≥2 人且跨两个及以上班组 → LOW
    /// - ≥2 人但集中于单一班组 → MEDIUM
    /// - 恰好 1 人 → HIGH (单点故障)
    ///
    /// # 返回
    /// None 表示冗余度为 0 (覆盖缺口)
    pub fn level_for(redundancy: usize, team_count: usize) -> Option<RiskLevel> {
        match redundancy {
            0 => None,
            1 => Some(RiskLevel::High),
            _ if team_count >= 2 => Some(RiskLevel::Low),
            _ => Some(RiskLevel::Medium),
        }
    }

    /// 汇总等级: 单点故障占比 >50% CRITICAL, >30% HIGH, >10% MEDIUM, 其余 LOW
    pub fn aggregate_level(spof_ratio: f64) -> RiskLevel {
        if spof_ratio > CRITICAL_SPOF_RATIO {
            RiskLevel::Critical
        } else if spof_ratio > HIGH_SPOF_RATIO {
            RiskLevel::High
        } else if spof_ratio > MEDIUM_SPOF_RATIO {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// 对全部被要求的资质分级
    ///
    /// # 参数
    /// - `simulator`: 提供在岗与班次兼容信息
    /// - `catalog`: 要求目录
    /// - `matrix`: 待评估的资质矩阵
    pub fn classify(
        &self,
        simulator: &CoverageSimulator,
        catalog: &RequirementCatalog,
        matrix: &QualificationMatrix,
    ) -> RiskReport {
        let mut by_qualification: BTreeMap<&str, Vec<&Requirement>> = BTreeMap::new();
        for req in catalog.requirements() {
            by_qualification
                .entry(req.qualification_id.as_str())
                .or_default()
                .push(req);
        }

        let mut qualifications = Vec::new();
        let mut coverage_gaps = Vec::new();
        let mut single_points_of_failure = Vec::new();

        for (qualification_id, requirements) in &by_qualification {
            let holders = simulator.on_duty_holders(qualification_id, requirements, matrix);
            let teams: BTreeSet<String> = holders.iter().map(|(_, team)| team.clone()).collect();

            match Self::level_for(holders.len(), teams.len()) {
                None => coverage_gaps.push(qualification_id.to_string()),
                Some(level) => {
                    if level == RiskLevel::High {
                        single_points_of_failure.push(qualification_id.to_string());
                    }
                    qualifications.push(QualificationRisk {
                        qualification_id: qualification_id.to_string(),
                        redundancy: holders.len(),
                        holders: holders.into_iter().map(|(id, _)| id).collect(),
                        teams,
                        level,
                    });
                }
            }
        }

        let required = by_qualification.len();
        let spof_ratio = if required == 0 {
            0.0
        } else {
            single_points_of_failure.len() as f64 / required as f64
        };
        let aggregate = Self::aggregate_level(spof_ratio);
        let good_redundancy = qualifications.iter().filter(|q| q.redundancy >= 2).count();
        let excellent_redundancy = qualifications.iter().filter(|q| q.redundancy >= 3).count();

        if !coverage_gaps.is_empty() {
            warn!(gap_count = coverage_gaps.len(), "存在无人可覆盖的资质");
        }
        info!(
            required_qualifications = required,
            spof_count = single_points_of_failure.len(),
            aggregate = %aggregate,
            "资质风险分级完成"
        );

        RiskReport {
            qualifications,
            single_points_of_failure,
            coverage_gaps,
            good_redundancy,
            excellent_redundancy,
            spof_ratio,
            aggregate,
        }
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new()
    }
}
