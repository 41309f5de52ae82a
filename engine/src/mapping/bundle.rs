use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::color::{ChromaShift, Rgb};
use crate::mapping::config::ValueRange;
use crate::model::DocumentKind;

/// 五个地形系数，均已夹紧到配置范围
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TerrainCoefficients {
    pub elevation_bias: f64,
    pub amplitude: f64,
    pub roughness: f64,
    pub erosion: f64,
    pub ridge_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeRole {
    /// 每个 Location 一个
    Hub,
    /// 每个 MemoryEvent 一个，挂在父 hub 上
    Child {
        parent_id: String,
        parent_index: usize,
        index: usize,
        count: usize,
        kind: DocumentKind,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedLocation {
    pub id: String,
    pub name: String,
    pub role: NodeRole,
    pub position: DVec3,
    pub color: Rgb,
    pub label_scale: f64,
    pub halo: f64,
    pub terrain: TerrainCoefficients,
    /// 夹紧后的源信号，点云的质量场要用
    pub significance: f64,
    pub valence: f64,
    pub is_visit: bool,
}

impl MappedLocation {
    pub fn is_hub(&self) -> bool {
        matches!(self.role, NodeRole::Hub)
    }

    pub fn planar_distance(&self, x: f64, z: f64) -> f64 {
        let dx = self.position.x - x;
        let dz = self.position.z - z;
        (dx * dx + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedConnection {
    /// `FeatureBundle::locations` 中的 hub 下标
    pub from: usize,
    pub to: usize,
    pub color: Rgb,
    pub curvature_y: f64,
    pub opacity: f64,
    pub weight: f64,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

/// 五个地形系数的合法范围，合成读取系数前按它夹紧
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoefficientRanges {
    pub elevation_bias: ValueRange,
    pub amplitude: ValueRange,
    pub roughness: ValueRange,
    pub erosion: ValueRange,
    pub ridge_factor: ValueRange,
}

impl Default for CoefficientRanges {
    fn default() -> Self {
        Self {
            elevation_bias: ValueRange::new(-5.0, 22.0),
            amplitude: ValueRange::new(6.0, 26.0),
            roughness: ValueRange::new(0.35, 1.0),
            erosion: ValueRange::new(0.05, 0.6),
            ridge_factor: ValueRange::new(0.1, 0.9),
        }
    }
}

/// 映射阶段的完整输出；hub 之后紧跟它的子节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBundle {
    pub locations: Vec<MappedLocation>,
    pub connections: Vec<MappedConnection>,
    pub chroma: ChromaShift,
    /// 缺省时取默认范围，手写或从文件载入的 bundle 同样会被夹紧
    #[serde(default)]
    pub ranges: CoefficientRanges,
}

impl FeatureBundle {
    pub fn empty(chroma: ChromaShift) -> Self {
        Self {
            locations: Vec::new(),
            connections: Vec::new(),
            chroma,
            ranges: CoefficientRanges::default(),
        }
    }

    /// 按本 bundle 的范围读取某个节点的系数
    pub fn coefficients(&self, location: &MappedLocation) -> TerrainCoefficients {
        location.terrain.sanitized(&self.ranges)
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn chroma_shift(&self, x_norm: f64) -> Rgb {
        self.chroma.at(x_norm)
    }

    pub fn hubs(&self) -> impl Iterator<Item = (usize, &MappedLocation)> {
        self.locations.iter().enumerate().filter(|(_, l)| l.is_hub())
    }

    pub fn hub_count(&self) -> usize {
        self.hubs().count()
    }

    pub fn hub_index(&self, id: &str) -> Option<usize> {
        self.hubs().find(|(_, l)| l.id == id).map(|(i, _)| i)
    }

    pub fn children_of(&self, hub_index: usize) -> impl Iterator<Item = &MappedLocation> {
        self.locations.iter().filter(move |l| {
            matches!(l.role, NodeRole::Child { parent_index, .. } if parent_index == hub_index)
        })
    }

    /// 地面上离 (x, z) 最近的节点，供悬停/最近查询使用
    pub fn nearest(&self, x: f64, z: f64) -> Option<&MappedLocation> {
        self.locations
            .iter()
            .map(|l| (l.planar_distance(x, z), l))
            .filter(|(d, _)| d.is_finite())
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, l)| l)
    }

    pub fn bounds(&self) -> Option<PlanarBounds> {
        let first = self.locations.first()?;
        let init = PlanarBounds {
            min_x: first.position.x,
            max_x: first.position.x,
            min_z: first.position.z,
            max_z: first.position.z,
        };
        Some(self.locations.iter().fold(init, |b, l| PlanarBounds {
            min_x: b.min_x.min(l.position.x),
            max_x: b.max_x.max(l.position.x),
            min_z: b.min_z.min(l.position.z),
            max_z: b.max_z.max(l.position.z),
        }))
    }
}

impl TerrainCoefficients {
    /// 夹紧到给定范围；NaN 取下界，无穷取最近的边界
    pub fn sanitized(&self, ranges: &CoefficientRanges) -> TerrainCoefficients {
        let fix = |v: f64, r: ValueRange| {
            if v.is_nan() {
                r.lower()
            } else {
                v.clamp(r.lower(), r.upper())
            }
        };
        TerrainCoefficients {
            elevation_bias: fix(self.elevation_bias, ranges.elevation_bias),
            amplitude: fix(self.amplitude, ranges.amplitude),
            roughness: fix(self.roughness, ranges.roughness),
            erosion: fix(self.erosion, ranges.erosion),
            ridge_factor: fix(self.ridge_factor, ranges.ridge_factor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentKind;

    fn node(id: &str, x: f64, z: f64, role: NodeRole) -> MappedLocation {
        MappedLocation {
            id: id.to_string(),
            name: id.to_string(),
            role,
            position: DVec3::new(x, 0.0, z),
            color: Rgb::NEUTRAL,
            label_scale: 1.0,
            halo: 0.5,
            terrain: TerrainCoefficients::default(),
            significance: 0.5,
            valence: 0.0,
            is_visit: false,
        }
    }

    fn sample_bundle() -> FeatureBundle {
        let child = NodeRole::Child {
            parent_id: "a".into(),
            parent_index: 0,
            index: 0,
            count: 1,
            kind: DocumentKind::Letter,
        };
        FeatureBundle {
            locations: vec![
                node("a", 0.0, 0.0, NodeRole::Hub),
                node("a#0", 10.0, 0.0, child),
                node("b", -40.0, 25.0, NodeRole::Hub),
            ],
            ..FeatureBundle::empty(ChromaShift::default())
        }
    }

    #[test]
    fn hub_queries() {
        let bundle = sample_bundle();
        assert_eq!(bundle.hub_count(), 2);
        assert_eq!(bundle.hub_index("b"), Some(2));
        assert_eq!(bundle.hub_index("a#0"), None);
        assert_eq!(bundle.children_of(0).count(), 1);
        assert_eq!(bundle.children_of(2).count(), 0);
    }

    #[test]
    fn nearest_and_bounds() {
        let bundle = sample_bundle();
        assert_eq!(bundle.nearest(9.0, 1.0).map(|l| l.id.as_str()), Some("a#0"));
        assert_eq!(bundle.nearest(-35.0, 20.0).map(|l| l.id.as_str()), Some("b"));
        let b = bundle.bounds().unwrap();
        assert_eq!((b.min_x, b.max_x, b.min_z, b.max_z), (-40.0, 10.0, 0.0, 25.0));

        let empty = FeatureBundle::empty(ChromaShift::default());
        assert!(empty.nearest(0.0, 0.0).is_none());
        assert!(empty.bounds().is_none());
    }

    #[test]
    fn sanitized_clamps_non_finite() {
        let raw = TerrainCoefficients {
            elevation_bias: f64::INFINITY,
            amplitude: f64::NAN,
            roughness: -1.0,
            erosion: 3.0,
            ridge_factor: f64::NEG_INFINITY,
        };
        let c = raw.sanitized(&CoefficientRanges::default());
        assert_eq!(c.elevation_bias, 22.0);
        assert_eq!(c.amplitude, 6.0);
        assert_eq!(c.roughness, 0.35);
        assert_eq!(c.erosion, 0.6);
        assert_eq!(c.ridge_factor, 0.1);
    }

    #[test]
    fn coefficients_are_clamped_to_bundle_ranges() {
        let mut bundle = sample_bundle();
        bundle.locations[0].terrain = TerrainCoefficients {
            elevation_bias: -40.0,
            amplitude: 150.0,
            roughness: 0.5,
            erosion: 0.3,
            ridge_factor: 2.0,
        };
        let c = bundle.coefficients(&bundle.locations[0]);
        assert_eq!(c.elevation_bias, -5.0);
        assert_eq!(c.amplitude, 26.0);
        assert_eq!((c.roughness, c.erosion), (0.5, 0.3));
        assert_eq!(c.ridge_factor, 0.9);
    }

    #[test]
    fn missing_ranges_deserialize_to_defaults() {
        let json = r#"{ "locations": [], "connections": [],
            "chroma": { "warm": { "r": 1.0, "g": 0.0, "b": 0.0 }, "cool": { "r": 0.0, "g": 0.0, "b": 1.0 } } }"#;
        let bundle: FeatureBundle = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.ranges, CoefficientRanges::default());
    }
}
