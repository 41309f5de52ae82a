use glam::DVec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::{FieldBuffers, FieldKind, FieldSynthesizer, TerrainError, TerrainResult};
use crate::mapping::{FeatureBundle, MappedLocation, NodeRole};
use crate::noise::{lerp, ValueNoise};
use crate::synthesis::{finite_or, height_luminance, safe_normalize};

/// 高度场生成配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightFieldConfig {
    pub seed: u32,
    /// 网格边长（世界单位），以原点为中心
    pub size: f64,
    /// 每边的四边形数量
    pub segments: u32,
    pub base_frequency: f64,
    pub base_octaves: u32,
    pub base_lacunarity: f64,
    pub base_gain: f64,
    pub base_scale: f64,
    pub exaggeration: f64,
    pub residence_radius: f64,
    pub visit_radius: f64,
    pub child_radius: f64,
    pub falloff_power: f64,
    /// 实际频率再乘以 (0.5 + roughness)
    pub ridge_frequency: f64,
    pub ridge_octaves: u32,
    pub bias_factor: f64,
    pub erosion_factor: f64,
    /// 侵蚀把高度拉向 h * erosion_floor
    pub erosion_floor: f64,
    pub cliff_exponent: Option<f64>,
    pub luminance: f64,
    pub height_normalizer: f64,
}

impl Default for HeightFieldConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            size: 420.0,
            segments: 200,
            base_frequency: 0.012,
            base_octaves: 5,
            base_lacunarity: 2.0,
            base_gain: 0.48,
            base_scale: 28.0,
            exaggeration: 1.0,
            residence_radius: 46.0,
            visit_radius: 28.0,
            child_radius: 16.0,
            falloff_power: 2.2,
            ridge_frequency: 0.045,
            ridge_octaves: 4,
            bias_factor: 0.35,
            erosion_factor: 0.5,
            erosion_floor: 0.7,
            cliff_exponent: Some(1.12),
            luminance: 0.22,
            height_normalizer: 40.0,
        }
    }
}

impl HeightFieldConfig {
    pub fn validate(&self) -> TerrainResult<()> {
        if !(self.size > 0.0) || !self.size.is_finite() {
            return Err(TerrainError::Config(format!("size must be > 0, got {}", self.size)));
        }
        if self.segments == 0 {
            return Err(TerrainError::Config("segments must be >= 1".to_string()));
        }
        for (name, radius) in [
            ("residence_radius", self.residence_radius),
            ("visit_radius", self.visit_radius),
            ("child_radius", self.child_radius),
        ] {
            if !(radius > 0.0) {
                return Err(TerrainError::Config(format!("{name} must be > 0, got {radius}")));
            }
        }
        if !(self.falloff_power > 0.0) {
            return Err(TerrainError::Config(format!(
                "falloff_power must be > 0, got {}",
                self.falloff_power
            )));
        }
        if let Some(e) = self.cliff_exponent {
            if !(e > 0.0) {
                return Err(TerrainError::Config(format!("cliff_exponent must be > 0, got {e}")));
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> usize {
        self.segments as usize + 1
    }
}

/// 高度场生成器
pub struct HeightFieldSynth {
    terrain_noise: ValueNoise,
    ridge_noise: ValueNoise,
    config: HeightFieldConfig,
}

impl HeightFieldSynth {
    /// 先校验配置，非法参数（例如 segments 为 0）直接返回错误
    pub fn new(config: HeightFieldConfig) -> TerrainResult<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// 调用方已经校验过配置
    pub(crate) fn from_valid(config: HeightFieldConfig) -> Self {
        Self {
            terrain_noise: ValueNoise::new(config.seed),
            ridge_noise: ValueNoise::new(config.seed.wrapping_add(1)),
            config,
        }
    }

    pub fn config(&self) -> &HeightFieldConfig {
        &self.config
    }

    fn base_noise(&self, x: f64, z: f64) -> f64 {
        let c = &self.config;
        self.terrain_noise.fractal(
            x * c.base_frequency,
            z * c.base_frequency,
            c.base_octaves,
            c.base_lacunarity,
            c.base_gain,
            1.0,
        )
    }

    /// 没有任何节点影响时的基础起伏
    pub fn base_relief(&self, x: f64, z: f64) -> f64 {
        (self.base_noise(x, z) - 0.5) * self.config.base_scale * self.config.exaggeration
    }

    fn influence_radius(&self, location: &MappedLocation) -> f64 {
        match location.role {
            NodeRole::Child { .. } => self.config.child_radius,
            NodeRole::Hub if location.is_visit => self.config.visit_radius,
            NodeRole::Hub => self.config.residence_radius,
        }
    }

    /// 单点高度。按 bundle 顺序逐个节点原地修改 h，侵蚀那一步
    /// 与顺序相关，不能换成并行归约。没有任何节点覆盖该点时
    /// 结果就是 `base_relief`，不做 cliff 变换。
    pub fn sample(&self, bundle: &FeatureBundle, x: f64, z: f64) -> f64 {
        let c = &self.config;
        let hill = self.base_noise(x, z);
        let mut h = (hill - 0.5) * c.base_scale * c.exaggeration;
        let mut touched = false;

        for location in &bundle.locations {
            let radius = self.influence_radius(location);
            let d = location.planar_distance(x, z);
            if !(d < radius) {
                continue;
            }

            touched = true;
            let k = bundle.coefficients(location);
            let falloff = (1.0 - d / radius).powf(c.falloff_power);

            let freq = c.ridge_frequency * (0.5 + k.roughness);
            let ridge_sample = self.ridge_noise.fractal(x * freq, z * freq, c.ridge_octaves, 2.0, 0.5, 1.0);
            let ridge = (ridge_sample - 0.5).abs() * 2.0 - 0.5;
            let shape = k.ridge_factor * ridge + (1.0 - k.ridge_factor) * hill;

            h += k.amplitude * shape * falloff * c.exaggeration;
            h += k.elevation_bias * falloff * c.exaggeration * c.bias_factor;
            h = lerp(h, h * c.erosion_floor, k.erosion * c.erosion_factor);
        }

        if let (true, Some(exponent)) = (touched, c.cliff_exponent) {
            if h > 0.0 {
                h = h.powf(exponent);
            }
        }

        finite_or(h, 0.0)
    }

    /// 生成整张网格
    pub fn generate(&self, bundle: &FeatureBundle) -> HeightField {
        let c = &self.config;
        let columns = c.columns();
        let step = c.size / c.segments as f64;
        let half = c.size * 0.5;
        debug!(
            "Height field: {}x{} vertices, step {:.3}, {} influencing nodes",
            columns,
            columns,
            step,
            bundle.locations.len()
        );

        let mut positions = vec![0.0f32; columns * columns * 3];
        let mut colors = vec![0.0f32; columns * columns * 3];

        positions
            .par_chunks_mut(columns * 3)
            .zip(colors.par_chunks_mut(columns * 3))
            .enumerate()
            .for_each(|(row, (row_positions, row_colors))| {
                let z = -half + row as f64 * step;
                for col in 0..columns {
                    let x = -half + col as f64 * step;
                    let h = self.sample(bundle, x, z);

                    let x_norm = col as f64 / c.segments as f64;
                    let color = bundle
                        .chroma_shift(x_norm)
                        .offset(height_luminance(h, c.height_normalizer, c.luminance));

                    let i = col * 3;
                    row_positions[i..i + 3].copy_from_slice(&[x as f32, h as f32, z as f32]);
                    row_colors[i..i + 3].copy_from_slice(&color.to_array());
                }
            });

        let field = HeightField { segments: c.segments, size: c.size, positions, colors };
        let (lo, hi) = field.height_range();
        info!(
            "Generated height field: {} vertices, height range {:.2} .. {:.2}",
            field.vertex_count(),
            lo,
            hi
        );
        field
    }
}

impl FieldSynthesizer for HeightFieldSynth {
    type Output = HeightField;

    fn kind(&self) -> FieldKind {
        FieldKind::HeightField
    }

    fn synthesize(&self, bundle: &FeatureBundle) -> HeightField {
        self.generate(bundle)
    }
}

/// 高度场输出：行优先 (z 行, x 列)，stride 3 的位置与颜色
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightField {
    pub segments: u32,
    pub size: f64,
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
}

impl HeightField {
    pub fn columns(&self) -> usize {
        self.segments as usize + 1
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn height(&self, row: usize, col: usize) -> f32 {
        self.positions[(row * self.columns() + col) * 3 + 1]
    }

    pub fn height_range(&self) -> (f32, f32) {
        self.positions
            .chunks_exact(3)
            .map(|p| p[1])
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), h| (lo.min(h), hi.max(h)))
    }

    /// 标准网格三角化，每个四边形两个三角形
    pub fn indices(&self) -> Vec<u32> {
        let columns = self.columns() as u32;
        let segments = self.segments;
        let mut indices = Vec::with_capacity(segments as usize * segments as usize * 6);
        for row in 0..segments {
            for col in 0..segments {
                let a = row * columns + col;
                let b = a + 1;
                let c = a + columns;
                let d = c + 1;
                indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }
        indices
    }

    /// 中心差分法线
    pub fn normals(&self) -> Vec<f32> {
        let columns = self.columns();
        let last = columns - 1;
        let step = self.size / self.segments as f64;
        let mut normals = Vec::with_capacity(columns * columns * 3);
        for row in 0..columns {
            for col in 0..columns {
                let (l, r) = (col.saturating_sub(1), (col + 1).min(last));
                let (u, d) = (row.saturating_sub(1), (row + 1).min(last));
                let dx = (self.height(row, r) - self.height(row, l)) as f64 / ((r - l).max(1) as f64 * step);
                let dz = (self.height(d, col) - self.height(u, col)) as f64 / ((d - u).max(1) as f64 * step);
                let n = safe_normalize(DVec3::new(-dx, 1.0, -dz), DVec3::Y);
                normals.extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
            }
        }
        normals
    }

    /// 双线性插值取任意 (x, z) 的高度，超出网格时夹到边缘
    pub fn height_at(&self, x: f64, z: f64) -> f32 {
        let segments = self.segments as f64;
        let half = self.size * 0.5;
        let u = ((x + half) / self.size * segments).clamp(0.0, segments);
        let v = ((z + half) / self.size * segments).clamp(0.0, segments);
        let (u, v) = (if u.is_nan() { 0.0 } else { u }, if v.is_nan() { 0.0 } else { v });

        let last = self.columns() - 1;
        let (c0, r0) = (u.floor() as usize, v.floor() as usize);
        let (c1, r1) = ((c0 + 1).min(last), (r0 + 1).min(last));
        let (fu, fv) = (u - c0 as f64, v - r0 as f64);

        let top = lerp(self.height(r0, c0) as f64, self.height(r0, c1) as f64, fu);
        let bottom = lerp(self.height(r1, c0) as f64, self.height(r1, c1) as f64, fu);
        lerp(top, bottom, fv) as f32
    }
}

impl FieldBuffers for HeightField {
    fn positions(&self) -> &[f32] {
        &self.positions
    }

    fn colors(&self) -> &[f32] {
        &self.colors
    }
}
