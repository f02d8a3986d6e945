// ==========================================
// PPM 资质覆盖规划系统 - 外部数据源接口
// ==========================================
// 职责: 定义花名册/要求/轮班 三类外部协作方的读取接口
// 说明: 原始 HR 导出的解析不在本 crate 范围内,由实现方完成
// ==========================================

use crate::domain::roster::{Engineer, Requirement, Ride, RotationAssignment};
use crate::engine::error::{EngineError, EngineResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn load_engineers(&self) -> EngineResult<Vec<Engineer>>;
}

#[async_trait]
pub trait RequirementSource: Send + Sync {
    async fn load_rides(&self) -> EngineResult<Vec<Ride>>;

    async fn load_requirements(&self) -> EngineResult<Vec<Requirement>>;
}

#[async_trait]
pub trait RotationSource: Send + Sync {
    async fn load_rotations(&self) -> EngineResult<Vec<RotationAssignment>>;
}

// ==========================================
// InMemorySources - 内存数据源
// ==========================================
// 同时实现三类接口,用于测试与嵌入式调用
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemorySources {
    #[serde(default)]
    pub engineers: Vec<Engineer>,
    #[serde(default)]
    pub rides: Vec<Ride>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub rotations: Vec<RotationAssignment>,
}

impl InMemorySources {
    pub fn new(
        engineers: Vec<Engineer>,
        rides: Vec<Ride>,
        requirements: Vec<Requirement>,
        rotations: Vec<RotationAssignment>,
    ) -> Self {
        Self {
            engineers,
            rides,
            requirements,
            rotations,
        }
    }

    /// 从 JSON 文档加载 (字段: engineers / rides / requirements / rotations)
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        serde_json::from_str(raw).map_err(|e| EngineError::Source(format!("数据源 JSON 解析失败: {}", e)))
    }
}

#[async_trait]
impl RosterSource for InMemorySources {
    async fn load_engineers(&self) -> EngineResult<Vec<Engineer>> {
        Ok(self.engineers.clone())
    }
}

#[async_trait]
impl RequirementSource for InMemorySources {
    async fn load_rides(&self) -> EngineResult<Vec<Ride>> {
        Ok(self.rides.clone())
    }

    async fn load_requirements(&self) -> EngineResult<Vec<Requirement>> {
        Ok(self.requirements.clone())
    }
}

#[async_trait]
impl RotationSource for InMemorySources {
    async fn load_rotations(&self) -> EngineResult<Vec<RotationAssignment>> {
        Ok(self.rotations.clone())
    }
}
