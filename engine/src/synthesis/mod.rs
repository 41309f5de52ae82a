//! 场合成：高度场与点云两种拓扑，消费同一个 FeatureBundle。
//!
//! 每个采样点彼此独立，用 rayon 并行写入互不重叠的输出槽；
//! 单个采样点内部对影响节点的累加保持顺序折叠。

use glam::DVec3;
use tracing::warn;

pub mod height_field;
pub mod jitter;
pub mod point_cloud;

pub use height_field::{HeightField, HeightFieldConfig, HeightFieldSynth};
pub use jitter::{JitterConfig, PointCloudJitter};
pub use point_cloud::{ClusterSpan, MassWeights, PointCloud, PointCloudConfig, PointCloudSynth};

/// 非有限值取 fallback
#[inline]
pub(crate) fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!("non-finite field value {value}, replaced with {fallback}");
        fallback
    }
}

/// 高度对颜色亮度的偏移，两种拓扑共用
#[inline]
pub(crate) fn height_luminance(height: f64, normalizer: f64, luminance: f64) -> f64 {
    if normalizer <= 0.0 {
        return 0.0;
    }
    let h = (height / normalizer).clamp(-1.0, 1.0);
    if h.is_nan() {
        0.0
    } else {
        h * luminance
    }
}

/// 零向量时返回 fallback
#[inline]
pub(crate) fn safe_normalize(v: DVec3, fallback: DVec3) -> DVec3 {
    let len = v.length();
    if len > f64::EPSILON && len.is_finite() {
        v / len
    } else {
        fallback
    }
}
