use glam::DVec3;
use noise::NoiseFn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::noise::ValueNoise;
use crate::synthesis::point_cloud::PointCloud;
use crate::synthesis::{finite_or, safe_normalize};

/// 每帧抖动参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    /// 位置到噪声坐标的缩放
    pub frequency: f64,
    /// 两路噪声随时间滑动的速度
    pub rate_a: f64,
    pub rate_b: f64,
    /// 径向最大位移（世界单位）
    pub amplitude: f64,
    /// 第二路噪声的固定相位
    pub phase: f64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self { frequency: 0.035, rate_a: 0.35, rate_b: 0.21, amplitude: 0.6, phase: 17.0 }
    }
}

/// 点云的逐帧抖动。`base` 是合成结果的只读副本，`working` 每次都从它重新计算
pub struct PointCloudJitter {
    base: Vec<f32>,
    working: Vec<f32>,
    noise_a: ValueNoise,
    noise_b: ValueNoise,
    config: JitterConfig,
}

impl PointCloudJitter {
    pub fn new(cloud: &PointCloud, config: JitterConfig, seed: u32) -> Self {
        let base = cloud.positions.clone();
        debug!("Jitter pass holds {} points", base.len() / 3);
        Self {
            working: base.clone(),
            base,
            noise_a: ValueNoise::new(seed.wrapping_add(11)),
            noise_b: ValueNoise::new(seed.wrapping_add(29)),
            config,
        }
    }

    pub fn config(&self) -> &JitterConfig {
        &self.config
    }

    pub fn base_positions(&self) -> &[f32] {
        &self.base
    }

    /// 最近一次 `update` 的结果
    pub fn positions(&self) -> &[f32] {
        &self.working
    }

    /// 按经过的秒数重算工作缓冲
    pub fn update(&mut self, elapsed: f64) -> &[f32] {
        let elapsed = finite_or(elapsed, 0.0);
        let c = self.config;
        let (noise_a, noise_b) = (&self.noise_a, &self.noise_b);

        self.working
            .par_chunks_mut(3)
            .zip(self.base.par_chunks(3))
            .for_each(|(out, src)| {
                let p = DVec3::new(src[0] as f64, src[1] as f64, src[2] as f64);
                let q = p * c.frequency;
                let a = noise_a.get([q.x + elapsed * c.rate_a, q.y, q.z]);
                let b = noise_b.get([q.x, q.y + elapsed * c.rate_b, q.z + c.phase]);
                let push = finite_or((a - 0.5 + (b - 0.5)) * c.amplitude, 0.0);
                let moved = p + safe_normalize(p, DVec3::Y) * push;
                out.copy_from_slice(&[moved.x as f32, moved.y as f32, moved.z as f32]);
            });

        &self.working
    }

    pub fn reset(&mut self) {
        self.working.copy_from_slice(&self.base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud() -> PointCloud {
        let positions: Vec<f32> = (0..64)
            .flat_map(|i| {
                let a = i as f32 * 0.37;
                [a.cos() * 100.0, (i as f32 - 32.0) * 2.0, a.sin() * 100.0]
            })
            .collect();
        let colors = vec![0.5; positions.len()];
        PointCloud { positions, colors, base_count: 64, clusters: Vec::new() }
    }

    #[test]
    fn update_never_drifts() {
        let mut jitter = PointCloudJitter::new(&cloud(), JitterConfig::default(), 3);
        let first = jitter.update(2.5).to_vec();
        for t in [0.1, 7.0, 2.5, 2.5] {
            jitter.update(t);
        }
        assert_eq!(jitter.positions(), first.as_slice());
        assert_eq!(jitter.base_positions(), cloud().positions.as_slice());
    }

    #[test]
    fn displacement_is_radial_and_bounded() {
        let source = cloud();
        let mut jitter = PointCloudJitter::new(&source, JitterConfig::default(), 3);
        let moved = jitter.update(4.0).to_vec();
        let amp = jitter.config().amplitude;
        for (m, b) in moved.chunks_exact(3).zip(source.positions.chunks_exact(3)) {
            let m = DVec3::new(m[0] as f64, m[1] as f64, m[2] as f64);
            let b = DVec3::new(b[0] as f64, b[1] as f64, b[2] as f64);
            assert!((m - b).length() <= amp + 1e-3);
            assert!(m.normalize().dot(b.normalize()) > 0.9999);
        }
    }

    #[test]
    fn time_changes_output_and_reset_restores() {
        let mut jitter = PointCloudJitter::new(&cloud(), JitterConfig::default(), 3);
        let a = jitter.update(0.0).to_vec();
        let b = jitter.update(10.0).to_vec();
        assert_ne!(a, b);
        jitter.reset();
        assert_eq!(jitter.positions(), jitter.base_positions());
    }

    #[test]
    fn non_finite_time_is_treated_as_zero() {
        let mut jitter = PointCloudJitter::new(&cloud(), JitterConfig::default(), 3);
        let zero = jitter.update(0.0).to_vec();
        assert_eq!(jitter.update(f64::NAN), zero.as_slice());
        assert!(jitter.positions().iter().all(|v| v.is_finite()));
    }
}
