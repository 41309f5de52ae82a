use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use journey_engine::synthesis::{HeightField, PointCloud};
use journey_engine::FieldKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// 文件头里的格式版本
pub const BAKE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum BakeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("unsupported bake version {0}")]
    Version(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BakedField {
    HeightField {
        field: HeightField,
        indices: Vec<u32>,
        normals: Vec<f32>,
    },
    PointCloud(PointCloud),
}

impl BakedField {
    pub fn kind(&self) -> FieldKind {
        match self {
            BakedField::HeightField { .. } => FieldKind::HeightField,
            BakedField::PointCloud(_) => FieldKind::PointCloud,
        }
    }

    /// 高度场连同三角形索引与法线一起导出
    pub fn from_height_field(field: HeightField) -> Self {
        let indices = field.indices();
        let normals = field.normals();
        BakedField::HeightField { field, indices, normals }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedFile {
    pub version: u32,
    pub kind: FieldKind,
    pub field: BakedField,
}

/// bincode 编码后 gzip 压缩写盘，返回压缩后的字节数
pub fn write_baked(path: &Path, field: BakedField) -> Result<u64, BakeError> {
    let file = BakedFile { version: BAKE_VERSION, kind: field.kind(), field };
    let raw = bincode::serialize(&file)?;

    let mut encoder = GzEncoder::new(BufWriter::new(File::create(path)?), Compression::default());
    encoder.write_all(&raw)?;
    let mut writer = encoder.finish()?;
    writer.flush()?;

    let written = std::fs::metadata(path)?.len();
    info!(
        "Baked {:?} to {:?}: {} bytes raw, {} bytes compressed",
        file.kind,
        path,
        raw.len(),
        written
    );
    Ok(written)
}

pub fn read_baked(path: &Path) -> Result<BakedFile, BakeError> {
    let decoder = GzDecoder::new(BufReader::new(File::open(path)?));
    let file: BakedFile = bincode::deserialize_from(decoder)?;
    if file.version != BAKE_VERSION {
        return Err(BakeError::Version(file.version));
    }
    Ok(file)
}
