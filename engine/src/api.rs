use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapping::FeatureBundle;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("ron write error: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("config error: {0}")]
    Config(String),
}

pub type TerrainResult<T> = Result<T, TerrainError>;

/// 采样拓扑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    HeightField,
    PointCloud,
}

/// 场合成器：消费 FeatureBundle，整体重新生成输出缓冲区（不做增量修补）
pub trait FieldSynthesizer: Send + Sync {
    type Output;

    fn kind(&self) -> FieldKind;

    fn synthesize(&self, bundle: &FeatureBundle) -> Self::Output;
}

/// 供渲染层读取的扁平缓冲区视图（stride 3）
pub trait FieldBuffers {
    fn positions(&self) -> &[f32];

    fn colors(&self) -> &[f32];

    fn sample_count(&self) -> usize {
        self.positions().len() / 3
    }
}
