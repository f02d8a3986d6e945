// ==========================================
// PPM 资质覆盖规划系统 - 要求目录
// ==========================================
// 职责: 设施 → 资质要求 (频次、时长、角色限制)
// 输入: 设施清单 + PPM 要求清单 (外部协作方提供)
// 输出: 按设施分组的只读目录 + 未解决引用列表
// ==========================================

use crate::domain::roster::{Engineer, Requirement, Ride};
use crate::domain::types::Role;
use crate::engine::error::DataIssue;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct RequirementCatalog {
    rides: BTreeMap<String, Ride>,
    requirements: Vec<Requirement>,
}

impl RequirementCatalog {
    /// 构建目录
    ///
    /// 以下情况记为 DataIssue 并剔除该要求:
    /// - 引用未知设施
    /// - 时长为负或非数
    /// - (设施, 资质, 频次, 角色) 重复
    pub fn build(rides: Vec<Ride>, requirements: Vec<Requirement>) -> (Self, Vec<DataIssue>) {
        let mut issues = Vec::new();
        let mut ride_map = BTreeMap::new();
        for ride in rides {
            if ride_map.contains_key(&ride.ride_id) {
                issues.push(DataIssue::new("ride", &ride.ride_id, "重复的设施定义"));
                continue;
            }
            ride_map.insert(ride.ride_id.clone(), ride);
        }

        let mut seen = HashSet::new();
        let mut accepted = Vec::with_capacity(requirements.len());
        for req in requirements {
            if !ride_map.contains_key(&req.ride_id) {
                issues.push(DataIssue::new(
                    "requirement",
                    &req.key(),
                    format!("引用了未知设施: {}", req.ride_id),
                ));
                continue;
            }
            if !(req.duration_hours >= 0.0) {
                issues.push(DataIssue::new(
                    "requirement",
                    &req.key(),
                    format!("时长无效: {}", req.duration_hours),
                ));
                continue;
            }
            if !seen.insert(req.key()) {
                issues.push(DataIssue::new("requirement", &req.key(), "重复的资质要求"));
                continue;
            }
            accepted.push(req);
        }

        // 固定顺序: 设施 → 频次 → 资质 → 角色
        accepted.sort_by(|a, b| {
            a.ride_id
                .cmp(&b.ride_id)
                .then(a.frequency.cmp(&b.frequency))
                .then(a.qualification_id.cmp(&b.qualification_id))
                .then(a.role.cmp(&b.role))
        });

        if !issues.is_empty() {
            warn!(issue_count = issues.len(), "要求目录存在未解决引用");
        }
        info!(
            ride_count = ride_map.len(),
            requirement_count = accepted.len(),
            "要求目录构建完成"
        );

        (
            Self {
                rides: ride_map,
                requirements: accepted,
            },
            issues,
        )
    }

    /// 校验花名册中的设施引用
    pub fn check_roster(&self, engineers: &[Engineer]) -> Vec<DataIssue> {
        let rides = &self.rides;
        engineers
            .iter()
            .flat_map(|e| {
                e.assigned_rides
                    .iter()
                    .filter(move |ride_id| !rides.contains_key(*ride_id))
                    .map(move |ride_id| {
                        DataIssue::new(
                            "engineer",
                            &e.engineer_id,
                            format!("分配了未知设施: {}", ride_id),
                        )
                    })
            })
            .collect()
    }

    // ==========================================
    // 查询方法
    // ==========================================

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn ride(&self, ride_id: &str) -> Option<&Ride> {
        self.rides.get(ride_id)
    }

    pub fn rides(&self) -> impl Iterator<Item = &Ride> {
        self.rides.values()
    }

    pub fn requirements_for_ride<'a>(&'a self, ride_id: &'a str) -> impl Iterator<Item = &'a Requirement> + 'a {
        self.requirements.iter().filter(move |r| r.ride_id == ride_id)
    }

    /// 设施对指定角色集合开放的完整资质集
    pub fn qualifications_for_ride(&self, ride_id: &str, roles: &BTreeSet<Role>) -> BTreeSet<String> {
        self.requirements_for_ride(ride_id)
            .filter(|r| r.admits(roles))
            .map(|r| r.qualification_id.clone())
            .collect()
    }

    /// 所有被要求的资质
    pub fn required_qualifications(&self) -> BTreeSet<String> {
        self.requirements
            .iter()
            .map(|r| r.qualification_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{FrequencyClass, RideClass};

    fn ride(id: &str) -> Ride {
        Ride {
            ride_id: id.to_string(),
            team: "1".to_string(),
            class: RideClass::A,
        }
    }

    fn req(ride: &str, qual: &str, freq: FrequencyClass, role: Option<Role>) -> Requirement {
        Requirement {
            ride_id: ride.to_string(),
            qualification_id: qual.to_string(),
            frequency: freq,
            duration_hours: 1.0,
            role,
        }
    }

    #[test]
    fn test_unknown_ride_and_duplicates_reported() {
        let (catalog, issues) = RequirementCatalog::build(
            vec![ride("R1")],
            vec![
                req("R1", "Q1", FrequencyClass::Daily, None),
                req("R1", "Q1", FrequencyClass::Daily, None),
                req("GHOST", "Q2", FrequencyClass::Weekly, None),
            ],
        );
        assert_eq!(catalog.requirements().len(), 1);
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_role_specific_requirements_not_duplicates() {
        let (catalog, issues) = RequirementCatalog::build(
            vec![ride("R1")],
            vec![
                req("R1", "Q1", FrequencyClass::Daily, Some(Role::Mechanical)),
                req("R1", "Q1", FrequencyClass::Daily, Some(Role::Electrical)),
                req("R1", "Q1", FrequencyClass::Daily, Some(Role::Electrical)),
            ],
        );
        assert_eq!(catalog.requirements().len(), 2);
        assert_eq!(catalog.requirements()[0].role, Some(Role::Electrical));
        assert_eq!(catalog.requirements()[1].role, Some(Role::Mechanical));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "R1/Q1/DAILY/ELECTRICAL");
    }

    #[test]
    fn test_role_filtered_ride_set() {
        let (catalog, _) = RequirementCatalog::build(
            vec![ride("R1")],
            vec![
                req("R1", "QE", FrequencyClass::Daily, Some(Role::Electrical)),
                req("R1", "QM", FrequencyClass::Weekly, Some(Role::Mechanical)),
                req("R1", "QX", FrequencyClass::Monthly, None),
            ],
        );
        let roles: BTreeSet<Role> = [Role::Electrical].into_iter().collect();
        let set = catalog.qualifications_for_ride("R1", &roles);
        assert!(set.contains("QE"));
        assert!(set.contains("QX"));
        assert!(!set.contains("QM"));
    }

    #[test]
    fn test_roster_unknown_ride() {
        let (catalog, _) = RequirementCatalog::build(vec![ride("R1")], vec![]);
        let engineer = Engineer {
            engineer_id: "E1".to_string(),
            team: "1".to_string(),
            roles: BTreeSet::new(),
            assigned_rides: ["R1".to_string(), "R9".to_string()].into_iter().collect(),
            qualifications: BTreeSet::new(),
            vacancy: false,
        };
        let issues = catalog.check_roster(&[engineer]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "E1");
    }
}
