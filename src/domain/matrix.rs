// ==========================================
// PPM 资质覆盖规划系统 - 资质矩阵
// ==========================================
// 职责: 工程师 → 资质集合 的不可变快照
// 红线: 所有变换返回新矩阵 (copy-on-transform),不提供原地修改
// ==========================================

use crate::domain::roster::Engineer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationMatrix {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl QualificationMatrix {
    /// 空矩阵
    pub fn empty() -> Self {
        Self::default()
    }

    /// 以工程师当前持有资质作为种子
    pub fn from_holdings(engineers: &[Engineer]) -> Self {
        let entries = engineers
            .iter()
            .map(|e| (e.engineer_id.clone(), e.qualifications.clone()))
            .collect();
        Self { entries }
    }

    pub fn from_entries(entries: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self { entries }
    }

    pub fn holds(&self, engineer_id: &str, qualification_id: &str) -> bool {
        self.entries
            .get(engineer_id)
            .map(|quals| quals.contains(qualification_id))
            .unwrap_or(false)
    }

    pub fn qualifications_of(&self, engineer_id: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(engineer_id)
    }

    /// 持有指定资质的工程师 (按 ID 升序)
    pub fn holders_of<'a>(&'a self, qualification_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(_, quals)| quals.contains(qualification_id))
            .map(|(id, _)| id.as_str())
    }

    pub fn engineers(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.entries.iter().map(|(id, quals)| (id.as_str(), quals))
    }

    /// 资质授予总数
    pub fn grant_count(&self) -> usize {
        self.entries.values().map(|quals| quals.len()).sum()
    }

    /// 授予一组资质,返回新矩阵
    pub fn with_granted<I, S>(&self, engineer_id: &str, qualifications: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = self.entries.clone();
        entries
            .entry(engineer_id.to_string())
            .or_default()
            .extend(qualifications.into_iter().map(Into::into));
        Self { entries }
    }

    /// 收回一组资质,返回新矩阵
    pub fn with_revoked<'a, I>(&self, engineer_id: &str, qualifications: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut entries = self.entries.clone();
        if let Some(quals) = entries.get_mut(engineer_id) {
            for q in qualifications {
                quals.remove(q);
            }
        }
        Self { entries }
    }

    /// 相对基线新增资质的总数
    pub fn addition_count(&self, baseline: &QualificationMatrix) -> usize {
        let empty = BTreeSet::new();
        self.entries
            .iter()
            .map(|(id, quals)| {
                let base = baseline.entries.get(id).unwrap_or(&empty);
                quals.difference(base).count()
            })
            .sum()
    }

    /// 相对基线新增的资质 (培训清单)
    ///
    /// # 返回
    /// BTreeMap<工程师ID, 新增资质集合>,无新增的工程师不出现
    pub fn additions_over(&self, baseline: &QualificationMatrix) -> BTreeMap<String, BTreeSet<String>> {
        let empty = BTreeSet::new();
        self.entries
            .iter()
            .filter_map(|(id, quals)| {
                let base = baseline.entries.get(id).unwrap_or(&empty);
                let added: BTreeSet<String> = quals.difference(base).cloned().collect();
                if added.is_empty() {
                    None
                } else {
                    Some((id.clone(), added))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_granted_is_copy_on_transform() {
        let base = QualificationMatrix::empty().with_granted("E1", ["Q1"]);
        let next = base.with_granted("E1", ["Q2"]);

        assert!(!base.holds("E1", "Q2"));
        assert!(next.holds("E1", "Q1"));
        assert!(next.holds("E1", "Q2"));
        assert_eq!(base.grant_count(), 1);
        assert_eq!(next.grant_count(), 2);
    }

    #[test]
    fn test_additions_over_baseline() {
        let base = QualificationMatrix::empty().with_granted("E1", ["Q1"]);
        let next = base.with_granted("E1", ["Q2"]).with_granted("E2", ["Q1"]);

        let added = next.additions_over(&base);
        assert_eq!(added.len(), 2);
        assert!(added["E1"].contains("Q2"));
        assert!(!added["E1"].contains("Q1"));
    }

    #[test]
    fn test_with_revoked_leaves_source_untouched() {
        let base = QualificationMatrix::empty().with_granted("E1", ["Q1", "Q2"]);
        let revoke = vec!["Q1".to_string()];
        let next = base.with_revoked("E1", &revoke);

        assert!(base.holds("E1", "Q1"));
        assert!(!next.holds("E1", "Q1"));
        assert!(next.holds("E1", "Q2"));
        assert_eq!(base.addition_count(&next), 1);
    }

    #[test]
    fn test_holders_sorted() {
        let m = QualificationMatrix::empty()
            .with_granted("E2", ["Q"])
            .with_granted("E1", ["Q"])
            .with_granted("E3", ["X"]);
        let holders: Vec<&str> = m.holders_of("Q").collect();
        assert_eq!(holders, vec!["E1", "E2"]);
    }
}
