//! 把自传数据集映射为地形：语义模型 → FeatureBundle → 高度场 / 点云。

pub mod api;
pub mod color;
pub mod config;
pub mod mapping;
pub mod model;
pub mod noise;
pub mod pipeline;
pub mod synthesis;

pub use api::{FieldBuffers, FieldKind, FieldSynthesizer, TerrainError, TerrainResult};
pub use color::{ChromaShift, Rgb};
pub use config::TerrainConfig;
pub use mapping::{map_journey, remap, FeatureBundle, MappedConnection, MappedLocation, MappingConfig};
pub use model::{Connection, DocumentKind, JourneyData, LanguageTag, Location, MemoryEvent, Period};
pub use self::noise::{FractalParams, ValueNoise};
pub use pipeline::TerrainPipeline;
pub use synthesis::{HeightField, HeightFieldSynth, PointCloud, PointCloudJitter, PointCloudSynth};
