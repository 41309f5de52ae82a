use serde::{Deserialize, Serialize};

use crate::api::{TerrainError, TerrainResult};
use crate::color::ChromaShift;
use crate::mapping::bundle::CoefficientRanges;
use crate::mapping::modifiers::{ModifierTable, TintTable};

/// 闭区间 [min, max]，用作 remap 的输出范围
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn lower(&self) -> f64 {
        self.min.min(self.max)
    }

    pub fn upper(&self) -> f64 {
        self.min.max(self.max)
    }

    pub fn mid(&self) -> f64 {
        (self.min + self.max) * 0.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasWeights {
    pub significance: f64,
    pub intensity: f64,
    pub valence: f64,
}

/// 语义字段到空间位置与地形系数的映射配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// languageBalance [-1,1] 映射到的水平范围
    pub x_range: ValueRange,
    /// 语言轴在 x 上的权重，其余来自时间螺旋
    pub language_blend: f64,
    pub spiral_turns: f64,
    pub spiral_radius: ValueRange,
    /// 数据集中没有任何年份时使用的年代
    pub fallback_era: ValueRange,

    pub jitter: f64,
    pub visit_jitter: f64,
    pub jitter_c1: f64,
    pub jitter_c2: f64,

    pub bias_weights: BiasWeights,
    pub bias_range: ValueRange,
    pub amplitude: ValueRange,
    pub duration_max: f64,
    pub roughness: ValueRange,
    pub erosion: ValueRange,
    pub ridge: ValueRange,
    pub hub_lift: f64,

    pub label_scale: ValueRange,
    pub halo: ValueRange,
    pub child_display_scale: f64,

    pub ring_base: f64,
    pub ring_intensity: f64,
    pub ring_phase_shift: f64,
    pub ring_valence_lift: f64,
    pub ring_sentiment_lift: f64,

    pub curvature: ValueRange,
    pub opacity: ValueRange,
    pub default_weight: f64,

    pub chroma: ChromaShift,
    pub modifiers: ModifierTable,
    pub tints: TintTable,
}

impl Default for MappingConfig {
    fn default() -> Self {
        let ranges = CoefficientRanges::default();
        Self {
            x_range: ValueRange::new(-150.0, 150.0),
            language_blend: 0.6,
            spiral_turns: 2.6,
            spiral_radius: ValueRange::new(0.0, 120.0),
            fallback_era: ValueRange::new(1990.0, 2025.0),
            jitter: 3.5,
            visit_jitter: 5.0,
            jitter_c1: 12.9898,
            jitter_c2: 78.233,
            bias_weights: BiasWeights { significance: 14.0, intensity: 8.0, valence: 5.0 },
            bias_range: ranges.elevation_bias,
            amplitude: ranges.amplitude,
            duration_max: 20.0,
            roughness: ranges.roughness,
            erosion: ranges.erosion,
            ridge: ranges.ridge_factor,
            hub_lift: 0.5,
            label_scale: ValueRange::new(0.8, 1.6),
            halo: ValueRange::new(0.2, 1.0),
            child_display_scale: 0.55,
            ring_base: 10.0,
            ring_intensity: 14.0,
            ring_phase_shift: 0.6,
            ring_valence_lift: 3.0,
            ring_sentiment_lift: 4.0,
            curvature: ValueRange::new(6.0, 28.0),
            opacity: ValueRange::new(0.15, 0.75),
            default_weight: 0.5,
            chroma: ChromaShift::default(),
            modifiers: ModifierTable::default(),
            tints: TintTable::default(),
        }
    }
}

impl MappingConfig {
    /// 映射输出系数所用的范围，随 FeatureBundle 一起交给合成阶段
    pub fn coefficient_ranges(&self) -> CoefficientRanges {
        CoefficientRanges {
            elevation_bias: self.bias_range,
            amplitude: self.amplitude,
            roughness: self.roughness,
            erosion: self.erosion,
            ridge_factor: self.ridge,
        }
    }

    pub fn validate(&self) -> TerrainResult<()> {
        if !(self.x_range.max > self.x_range.min) {
            return Err(TerrainError::Config(format!(
                "x_range must be increasing, got [{}, {}]",
                self.x_range.min, self.x_range.max
            )));
        }
        if !(0.0..=1.0).contains(&self.language_blend) {
            return Err(TerrainError::Config(format!(
                "language_blend must be in [0, 1], got {}",
                self.language_blend
            )));
        }
        if !(self.fallback_era.max > self.fallback_era.min) {
            return Err(TerrainError::Config(format!(
                "fallback_era must be increasing, got [{}, {}]",
                self.fallback_era.min, self.fallback_era.max
            )));
        }
        if self.spiral_radius.min < 0.0 || self.spiral_radius.max < self.spiral_radius.min {
            return Err(TerrainError::Config(format!(
                "spiral_radius must satisfy 0 <= min <= max, got [{}, {}]",
                self.spiral_radius.min, self.spiral_radius.max
            )));
        }
        if !(self.duration_max > 0.0) {
            return Err(TerrainError::Config(format!(
                "duration_max must be > 0, got {}",
                self.duration_max
            )));
        }
        if self.bias_range.max < self.bias_range.min {
            return Err(TerrainError::Config("bias_range must not be inverted".to_string()));
        }
        if !(0.0..=1.0).contains(&self.default_weight) {
            return Err(TerrainError::Config(format!(
                "default_weight must be in [0, 1], got {}",
                self.default_weight
            )));
        }
        Ok(())
    }
}
