use tracing::debug;

use crate::api::TerrainResult;
use crate::config::TerrainConfig;
use crate::mapping::{map_journey, FeatureBundle};
use crate::model::JourneyData;
use crate::synthesis::{HeightField, HeightFieldSynth, PointCloud, PointCloudJitter, PointCloudSynth};

/// 数据 → FeatureBundle → 采样缓冲的一站式入口
pub struct TerrainPipeline {
    config: TerrainConfig,
    height_field: HeightFieldSynth,
    point_cloud: PointCloudSynth,
}

impl TerrainPipeline {
    pub fn new(config: TerrainConfig) -> TerrainResult<Self> {
        config.validate()?;
        Ok(Self::new_unchecked(config))
    }

    fn new_unchecked(config: TerrainConfig) -> Self {
        Self {
            height_field: HeightFieldSynth::from_valid(config.height_field.clone()),
            point_cloud: PointCloudSynth::from_valid(config.point_cloud.clone()),
            config,
        }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn bundle(&self, data: &JourneyData) -> FeatureBundle {
        map_journey(data, &self.config.mapping)
    }

    pub fn height_field(&self, bundle: &FeatureBundle) -> HeightField {
        self.height_field.generate(bundle)
    }

    pub fn point_cloud(&self, bundle: &FeatureBundle) -> PointCloud {
        self.point_cloud.generate(bundle)
    }

    /// 点云加上它自己的抖动器，抖动器持有基础位置的副本
    pub fn animated_point_cloud(&self, bundle: &FeatureBundle) -> (PointCloud, PointCloudJitter) {
        let cloud = self.point_cloud(bundle);
        let pc = &self.config.point_cloud;
        let jitter = PointCloudJitter::new(&cloud, pc.jitter, pc.seed);
        debug!("Attached jitter pass to {} points", cloud.point_count());
        (cloud, jitter)
    }

    pub fn height_field_synth(&self) -> &HeightFieldSynth {
        &self.height_field
    }

    pub fn point_cloud_synth(&self) -> &PointCloudSynth {
        &self.point_cloud
    }
}

impl Default for TerrainPipeline {
    fn default() -> Self {
        Self::new_unchecked(TerrainConfig::default())
    }
}
