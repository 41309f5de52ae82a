use std::f64::consts::{PI, TAU};

use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::{FieldBuffers, FieldKind, FieldSynthesizer, TerrainError, TerrainResult};
use crate::color::Rgb;
use crate::mapping::{remap, FeatureBundle, MappedLocation};
use crate::noise::{FractalParams, ValueNoise};
use crate::synthesis::jitter::JitterConfig;
use crate::synthesis::{finite_or, height_luminance, safe_normalize};

/// 每个节点的质量权重组成
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassWeights {
    pub amplitude: f64,
    pub significance: f64,
    pub ridge: f64,
    pub roughness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointCloudConfig {
    pub seed: u32,
    pub point_count: u32,
    pub base_radius: f64,
    /// 平面 x ∈ [-x_half_range, x_half_range] 绕一圈
    pub x_half_range: f64,
    /// 平面 z ∈ [-z_half_range, z_half_range] 映射到纬度带
    pub z_half_range: f64,
    /// 极角范围（弧度），避开两极
    pub polar_min: f64,
    pub polar_max: f64,
    pub influence_angle: f64,
    pub mass_weights: MassWeights,
    /// amplitude 归一化用的参考值
    pub amplitude_reference: f64,
    pub mass_scale: f64,
    pub signed_scale: f64,
    pub macro_noise: FractalParams,
    pub macro_amplitude: f64,
    pub micro_noise: FractalParams,
    pub micro_amplitude: f64,
    pub min_radius_ratio: f64,
    pub cluster_base: f64,
    pub cluster_scale: f64,
    pub cluster_max: u32,
    pub cluster_spread: f64,
    pub cluster_lift: f64,
    pub highlight: Rgb,
    pub highlight_strength: f64,
    pub luminance: f64,
    pub height_normalizer: f64,
    pub jitter: JitterConfig,
}

impl Default for PointCloudConfig {
    fn default() -> Self {
        Self {
            seed: 7331,
            point_count: 24_000,
            base_radius: 100.0,
            x_half_range: 150.0,
            z_half_range: 150.0,
            polar_min: 0.22 * PI,
            polar_max: 0.78 * PI,
            influence_angle: 0.55,
            mass_weights: MassWeights { amplitude: 0.45, significance: 0.3, ridge: 0.15, roughness: 0.1 },
            amplitude_reference: 26.0,
            mass_scale: 16.0,
            signed_scale: 7.0,
            macro_noise: FractalParams { octaves: 3, lacunarity: 2.0, gain: 0.5, base_frequency: 1.8 },
            macro_amplitude: 7.0,
            micro_noise: FractalParams { octaves: 2, lacunarity: 2.2, gain: 0.5, base_frequency: 7.5 },
            micro_amplitude: 1.6,
            min_radius_ratio: 0.25,
            cluster_base: 24.0,
            cluster_scale: 140.0,
            cluster_max: 260,
            cluster_spread: 0.14,
            cluster_lift: 1.5,
            highlight: Rgb::new(1.0, 0.95, 0.82),
            highlight_strength: 0.6,
            luminance: 0.22,
            height_normalizer: 30.0,
            jitter: JitterConfig::default(),
        }
    }
}

impl PointCloudConfig {
    pub fn validate(&self) -> TerrainResult<()> {
        if self.point_count == 0 {
            return Err(TerrainError::Config("point_count must be >= 1".to_string()));
        }
        if !(self.base_radius > 0.0) {
            return Err(TerrainError::Config(format!(
                "base_radius must be > 0, got {}",
                self.base_radius
            )));
        }
        if !(self.x_half_range > 0.0) || !(self.z_half_range > 0.0) {
            return Err(TerrainError::Config("half ranges must be > 0".to_string()));
        }
        if !(self.polar_min > 0.0 && self.polar_min < self.polar_max && self.polar_max < PI) {
            return Err(TerrainError::Config(format!(
                "polar band must satisfy 0 < min < max < π, got [{}, {}]",
                self.polar_min, self.polar_max
            )));
        }
        if !(self.influence_angle > 0.0) {
            return Err(TerrainError::Config(format!(
                "influence_angle must be > 0, got {}",
                self.influence_angle
            )));
        }
        Ok(())
    }
}

/// 点云中某个节点的簇点区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpan {
    /// `FeatureBundle::locations` 中的下标
    pub location: usize,
    /// 点下标（不是浮点下标）
    pub start: usize,
    pub len: usize,
}

/// 点云输出：先是 `base_count` 个基础点，之后是各节点的簇点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub base_count: usize,
    pub clusters: Vec<ClusterSpan>,
}

impl PointCloud {
    pub fn point_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn cluster_count(&self) -> usize {
        self.point_count() - self.base_count
    }
}

impl FieldBuffers for PointCloud {
    fn positions(&self) -> &[f32] {
        &self.positions
    }

    fn colors(&self) -> &[f32] {
        &self.colors
    }
}

/// 节点在球面上的预计算影响
#[derive(Debug, Clone, Copy)]
struct Influence {
    direction: DVec3,
    weight: f64,
    sign: f64,
}

/// 质量场与有符号场
struct MassField {
    influences: Vec<Influence>,
    total_weight: f64,
    peak_weight: f64,
    radius: f64,
}

impl MassField {
    fn sample(&self, direction: DVec3) -> (f64, f64) {
        if self.total_weight <= 0.0 || self.peak_weight <= 0.0 {
            return (0.0, 0.0);
        }
        let mut mass = 0.0;
        let mut signed = 0.0;
        for inf in &self.influences {
            let angle = direction.dot(inf.direction).clamp(-1.0, 1.0).acos();
            if !(angle < self.radius) {
                continue;
            }
            let t = 1.0 - angle / self.radius;
            let falloff = t * t * t;
            mass += inf.weight * falloff;
            signed += inf.weight * inf.sign * falloff;
        }
        (mass / self.peak_weight, signed / self.peak_weight)
    }
}

/// 斐波那契球面上第 i 个点的方向
pub fn fibonacci_direction(i: usize, n: usize) -> DVec3 {
    let golden_angle = PI * (3.0 - 5.0f64.sqrt());
    let y = 1.0 - (i as f64 + 0.5) / n as f64 * 2.0;
    let r = (1.0 - y * y).max(0.0).sqrt();
    let theta = golden_angle * i as f64;
    DVec3::new(theta.cos() * r, y, theta.sin() * r)
}

pub struct PointCloudSynth {
    macro_noise: ValueNoise,
    micro_noise: ValueNoise,
    config: PointCloudConfig,
}

impl PointCloudSynth {
    pub fn new(config: PointCloudConfig) -> TerrainResult<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// 调用方已经校验过配置
    pub(crate) fn from_valid(config: PointCloudConfig) -> Self {
        Self {
            macro_noise: ValueNoise::new(config.seed),
            micro_noise: ValueNoise::new(config.seed.wrapping_add(1)),
            config,
        }
    }

    pub fn config(&self) -> &PointCloudConfig {
        &self.config
    }

    /// 平面 (x, z) 映射到球面方向
    pub fn planar_to_direction(&self, x: f64, z: f64) -> DVec3 {
        let c = &self.config;
        let theta = (x + c.x_half_range) / (2.0 * c.x_half_range) * TAU;
        let phi = remap(z, -c.z_half_range, c.z_half_range, c.polar_min, c.polar_max);
        let theta = finite_or(theta, 0.0);
        DVec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin())
    }

    fn mass_weight(&self, bundle: &FeatureBundle, location: &MappedLocation) -> f64 {
        let w = &self.config.mass_weights;
        let k = bundle.coefficients(location);
        let amplitude = if self.config.amplitude_reference > 0.0 {
            k.amplitude / self.config.amplitude_reference
        } else {
            0.0
        };
        let weight = amplitude * w.amplitude
            + location.significance * w.significance
            + k.ridge_factor.abs() * w.ridge
            + k.roughness * w.roughness;
        finite_or(weight, 0.0).max(0.0)
    }

    fn push_sign(location: &MappedLocation) -> f64 {
        if location.valence > 0.0 {
            1.0
        } else if location.valence < 0.0 {
            -1.0
        } else if location.terrain.elevation_bias < 0.0 {
            -1.0
        } else if location.terrain.elevation_bias > 0.0 {
            1.0
        } else {
            0.0
        }
    }

    fn mass_field(&self, bundle: &FeatureBundle) -> MassField {
        let influences: Vec<Influence> = bundle
            .locations
            .iter()
            .map(|l| Influence {
                direction: self.planar_to_direction(l.position.x, l.position.z),
                weight: self.mass_weight(bundle, l),
                sign: Self::push_sign(l),
            })
            .collect();
        let total_weight = influences.iter().map(|i| i.weight).sum();
        let peak_weight = influences.iter().map(|i| i.weight).fold(0.0, f64::max);
        MassField { influences, total_weight, peak_weight, radius: self.config.influence_angle }
    }

    fn radius_at(&self, field: &MassField, direction: DVec3) -> f64 {
        let c = &self.config;
        let (mass, signed) = field.sample(direction);
        let macro_n = self.macro_noise.fractal_3d(direction.x, direction.y, direction.z, &c.macro_noise);
        let micro_n = self.micro_noise.fractal_3d(direction.x, direction.y, direction.z, &c.micro_noise);

        let radius = c.base_radius
            + mass * c.mass_scale
            + signed * c.signed_scale
            + (macro_n - 0.5) * 2.0 * c.macro_amplitude
            + (micro_n - 0.5) * 2.0 * c.micro_amplitude;
        finite_or(radius, c.base_radius).max(c.base_radius * c.min_radius_ratio)
    }

    /// 经度决定冷暖，离基准半径的高度决定明暗
    fn base_color(&self, bundle: &FeatureBundle, direction: DVec3, radius: f64) -> Rgb {
        let c = &self.config;
        let luma = height_luminance(radius - c.base_radius, c.height_normalizer, c.luminance);
        bundle.chroma_shift(direction_x_norm(direction)).offset(luma)
    }

    /// 单个方向上的半径（世界单位）
    pub fn sample(&self, bundle: &FeatureBundle, direction: DVec3) -> f64 {
        let field = self.mass_field(bundle);
        self.radius_at(&field, safe_normalize(direction, DVec3::Y))
    }

    fn cluster_size(&self, bundle: &FeatureBundle, location: &MappedLocation) -> usize {
        let c = &self.config;
        let k = bundle.coefficients(location);
        let amplitude = if c.amplitude_reference > 0.0 { k.amplitude / c.amplitude_reference } else { 0.0 };
        let score = (amplitude * 0.5 + location.significance * 0.3 + k.ridge_factor * 0.2).clamp(0.0, 1.0);
        let score = if score.is_nan() { 0.0 } else { score };
        let count = (c.cluster_base + c.cluster_scale * score).round().max(0.0) as usize;
        count.min(c.cluster_max as usize)
    }

    fn cluster_points(
        &self,
        field: &MassField,
        index: usize,
        location: &MappedLocation,
        bundle: &FeatureBundle,
    ) -> Vec<([f32; 3], [f32; 3])> {
        let c = &self.config;
        let count = self.cluster_size(bundle, location);
        let center = field.influences[index].direction;
        let up = if center.y.abs() < 0.99 { DVec3::Y } else { DVec3::X };
        let t1 = safe_normalize(up.cross(center), DVec3::X);
        let t2 = center.cross(t1);

        let mut rng = StdRng::seed_from_u64(((c.seed as u64) << 32) ^ index as u64);
        let tint = location.color.lerp(c.highlight, location.significance * c.highlight_strength);

        (0..count)
            .map(|_| {
                let around: f64 = rng.gen::<f64>() * TAU;
                let spread = c.cluster_spread * rng.gen::<f64>().sqrt();
                let tangent = t1 * around.cos() + t2 * around.sin();
                let dir = safe_normalize(center * spread.cos() + tangent * spread.sin(), center);

                let radius = self.radius_at(field, dir) + c.cluster_lift;
                let p = dir * radius;
                let x_norm = direction_x_norm(dir);
                let color = tint.lerp(bundle.chroma_shift(x_norm), 0.15);
                ([p.x as f32, p.y as f32, p.z as f32], color.to_array())
            })
            .collect()
    }

    pub fn generate(&self, bundle: &FeatureBundle) -> PointCloud {
        let c = &self.config;
        let n = c.point_count as usize;
        let field = self.mass_field(bundle);
        debug!(
            "Point cloud: {} base points, {} influences, total weight {:.3}",
            n,
            field.influences.len(),
            field.total_weight
        );

        let mut positions = vec![0.0f32; n * 3];
        let mut colors = vec![0.0f32; n * 3];
        positions
            .par_chunks_mut(3)
            .zip(colors.par_chunks_mut(3))
            .enumerate()
            .for_each(|(i, (p, col))| {
                let dir = fibonacci_direction(i, n);
                let radius = self.radius_at(&field, dir);
                let v = dir * radius;
                p.copy_from_slice(&[v.x as f32, v.y as f32, v.z as f32]);
                let color = self.base_color(bundle, dir, radius);
                col.copy_from_slice(&color.to_array());
            });

        let clusters: Vec<Vec<([f32; 3], [f32; 3])>> = bundle
            .locations
            .par_iter()
            .enumerate()
            .map(|(index, location)| self.cluster_points(&field, index, location, bundle))
            .collect();

        let mut spans = Vec::with_capacity(clusters.len());
        for (index, points) in clusters.into_iter().enumerate() {
            spans.push(ClusterSpan { location: index, start: positions.len() / 3, len: points.len() });
            for (p, col) in points {
                positions.extend_from_slice(&p);
                colors.extend_from_slice(&col);
            }
        }

        let cloud = PointCloud { positions, colors, base_count: n, clusters: spans };
        info!(
            "Generated point cloud: {} base points, {} cluster points",
            cloud.base_count,
            cloud.cluster_count()
        );
        cloud
    }
}

impl FieldSynthesizer for PointCloudSynth {
    type Output = PointCloud;

    fn kind(&self) -> FieldKind {
        FieldKind::PointCloud
    }

    fn synthesize(&self, bundle: &FeatureBundle) -> PointCloud {
        self.generate(bundle)
    }
}

/// 方向的经度归一化到 [0,1)，与 planar_to_direction 的 theta 一致
pub fn direction_x_norm(direction: DVec3) -> f64 {
    let theta = direction.z.atan2(direction.x).rem_euclid(TAU);
    finite_or(theta / TAU, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ChromaShift;
    use crate::mapping::{NodeRole, TerrainCoefficients};

    fn small_config() -> PointCloudConfig {
        PointCloudConfig { point_count: 600, ..Default::default() }
    }

    fn hub(x: f64, z: f64, valence: f64) -> MappedLocation {
        MappedLocation {
            id: format!("{x}:{z}"),
            name: String::new(),
            role: NodeRole::Hub,
            position: DVec3::new(x, 0.0, z),
            color: Rgb::new(0.9, 0.2, 0.2),
            label_scale: 1.0,
            halo: 0.5,
            terrain: TerrainCoefficients {
                elevation_bias: 12.0,
                amplitude: 22.0,
                roughness: 0.6,
                erosion: 0.2,
                ridge_factor: 0.5,
            },
            significance: 0.9,
            valence,
            is_visit: false,
        }
    }

    fn bundle(locations: Vec<MappedLocation>) -> FeatureBundle {
        FeatureBundle { locations, ..FeatureBundle::empty(ChromaShift::default()) }
    }

    #[test]
    fn fibonacci_points_are_unit_length() {
        for i in 0..100 {
            let d = fibonacci_direction(i, 100);
            assert!((d.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn planar_mapping_respects_latitude_band() {
        let synth = PointCloudSynth::new(small_config()).unwrap();
        let c = synth.config().clone();
        for z in [-1e6, -150.0, 0.0, 150.0, 1e6] {
            let d = synth.planar_to_direction(12.0, z);
            let phi = d.y.clamp(-1.0, 1.0).acos();
            assert!(phi >= c.polar_min - 1e-9 && phi <= c.polar_max + 1e-9);
        }
        let d = synth.planar_to_direction(-150.0, 0.0);
        assert!((direction_x_norm(d) - 0.0).abs() < 1e-9);
        let d = synth.planar_to_direction(0.0, 0.0);
        assert!((direction_x_norm(d) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_bundle_has_no_field_displacement() {
        let synth = PointCloudSynth::new(small_config()).unwrap();
        let empty = bundle(Vec::new());
        let field = synth.mass_field(&empty);
        assert_eq!(field.sample(DVec3::Y), (0.0, 0.0));

        let cloud = synth.generate(&empty);
        assert_eq!(cloud.base_count, 600);
        assert_eq!(cloud.cluster_count(), 0);
        assert!(cloud.clusters.is_empty());
        let c = synth.config();
        let reach = c.macro_amplitude + c.micro_amplitude + 1e-3;
        for p in cloud.positions.chunks_exact(3) {
            let r = (p[0] as f64).hypot(p[1] as f64).hypot(p[2] as f64);
            assert!((r - c.base_radius).abs() <= reach, "radius {r}");
        }
    }

    #[test]
    fn cubic_falloff_inside_influence_angle() {
        let synth = PointCloudSynth::new(small_config()).unwrap();
        let b = bundle(vec![hub(0.0, 0.0, 0.5)]);
        let field = synth.mass_field(&b);
        let center = field.influences[0].direction;
        let (mass, signed) = field.sample(center);
        assert!((mass - 1.0).abs() < 1e-6);
        assert!((signed - 1.0).abs() < 1e-6);

        // 半个影响半径处应为 (1/2)^3
        let axis = safe_normalize(center.cross(DVec3::Y), DVec3::X);
        let half = synth.config().influence_angle * 0.5;
        let rotated = center * half.cos() + axis.cross(center) * half.sin();
        let (mass, _) = field.sample(rotated);
        assert!((mass - 0.125).abs() < 1e-6, "mass {mass}");
    }

    #[test]
    fn negative_valence_pushes_inward() {
        let synth = PointCloudSynth::new(small_config()).unwrap();
        let up = bundle(vec![hub(0.0, 0.0, 0.8)]);
        let down = bundle(vec![hub(0.0, 0.0, -0.8)]);
        let dir = synth.planar_to_direction(0.0, 0.0);
        assert!(synth.sample(&up, dir) > synth.sample(&down, dir));
    }

    #[test]
    fn clusters_scale_with_location_and_stay_deterministic() {
        let synth = PointCloudSynth::new(small_config()).unwrap();
        let mut quiet = hub(60.0, 40.0, 0.0);
        quiet.significance = 0.0;
        quiet.terrain.amplitude = 6.0;
        quiet.terrain.ridge_factor = 0.1;
        let b = bundle(vec![hub(0.0, 0.0, 0.5), quiet]);

        let cloud = synth.generate(&b);
        assert_eq!(cloud.clusters.len(), 2);
        assert!(cloud.clusters[0].len > cloud.clusters[1].len);
        assert_eq!(cloud.clusters[0].start, 600);
        assert_eq!(cloud.clusters[1].start, 600 + cloud.clusters[0].len);
        assert_eq!(cloud.point_count(), 600 + cloud.clusters[0].len + cloud.clusters[1].len);
        assert_eq!(cloud, synth.generate(&b));
        assert!(cloud.positions.iter().all(|v| v.is_finite()));
        assert!(cloud.colors.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn cluster_size_is_capped() {
        let cfg = PointCloudConfig { cluster_scale: 10_000.0, cluster_max: 50, ..small_config() };
        let synth = PointCloudSynth::new(cfg).unwrap();
        let loud = hub(0.0, 0.0, 1.0);
        assert_eq!(synth.cluster_size(&bundle(vec![loud.clone()]), &loud), 50);
    }

    #[test]
    fn out_of_range_amplitude_is_clamped_before_weighting() {
        let synth = PointCloudSynth::new(small_config()).unwrap();
        let mut inflated = hub(0.0, 0.0, 0.5);
        inflated.terrain.amplitude = 500.0;
        let mut capped = inflated.clone();
        capped.terrain.amplitude = 26.0;
        let b = bundle(vec![inflated.clone()]);
        assert_eq!(synth.mass_weight(&b, &inflated), synth.mass_weight(&b, &capped));
        assert_eq!(synth.cluster_size(&b, &inflated), synth.cluster_size(&b, &capped));
    }

    #[test]
    fn cluster_colors_blend_location_highlight_and_chroma() {
        let synth = PointCloudSynth::new(small_config()).unwrap();
        let c = synth.config().clone();
        let shift = Rgb::new(0.1, 0.3, 0.7);
        let mut dim = hub(-80.0, 10.0, 0.0);
        dim.significance = 0.0;
        let mut bright = hub(80.0, -10.0, 0.0);
        bright.significance = 1.0;
        let b = FeatureBundle {
            locations: vec![dim, bright],
            ..FeatureBundle::empty(ChromaShift { warm: shift, cool: shift })
        };

        let cloud = synth.generate(&b);
        for span in &cloud.clusters {
            let location = &b.locations[span.location];
            let expected = location
                .color
                .lerp(c.highlight, location.significance * c.highlight_strength)
                .lerp(shift, 0.15)
                .to_array();
            assert!(span.len > 0);
            for i in span.start..span.start + span.len {
                for (got, want) in cloud.colors[i * 3..i * 3 + 3].iter().zip(expected) {
                    assert!((got - want).abs() < 1e-6, "point {i}: {got} vs {want}");
                }
            }
        }
    }

    #[test]
    fn new_rejects_invalid_config() {
        let result = PointCloudSynth::new(PointCloudConfig { point_count: 0, ..Default::default() });
        assert!(matches!(result, Err(TerrainError::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_band() {
        assert!(PointCloudConfig::default().validate().is_ok());
        let cfg = PointCloudConfig { polar_min: 0.0, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = PointCloudConfig { point_count: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
