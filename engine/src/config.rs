use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{TerrainError, TerrainResult};
use crate::mapping::MappingConfig;
use crate::synthesis::{HeightFieldConfig, PointCloudConfig};

/// 映射与两种合成的完整配置，缺省字段取默认值
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub mapping: MappingConfig,
    pub height_field: HeightFieldConfig,
    pub point_cloud: PointCloudConfig,
}

impl TerrainConfig {
    pub fn from_ron_str(text: &str) -> TerrainResult<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> TerrainResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 按扩展名载入 `.ron` 或 `.json`，载入后校验
    pub fn load<P: AsRef<Path>>(path: P) -> TerrainResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("ron") => Self::from_ron_str(&content)?,
            Some("json") => Self::from_json_str(&content)?,
            other => {
                return Err(TerrainError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };
        config.validate()?;
        info!("Loaded terrain config from {:?}", path);
        Ok(config)
    }

    pub fn to_ron_string(&self) -> TerrainResult<String> {
        let pretty = ron::ser::PrettyConfig::new().depth_limit(4);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    pub fn validate(&self) -> TerrainResult<()> {
        self.mapping.validate()?;
        self.height_field.validate()?;
        self.point_cloud.validate()?;
        Ok(())
    }
}
