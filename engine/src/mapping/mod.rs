//! 语义数据到空间位置与地形系数的纯映射。
//!
//! 除了按数组下标计算的三角抖动之外没有任何随机性；同样的输入
//! （包括数组顺序）必然得到逐位相同的 FeatureBundle。

use std::collections::HashMap;
use std::f64::consts::TAU;

use glam::DVec3;
use tracing::{debug, info, warn};

use crate::color::Rgb;
use crate::model::{JourneyData, Location, MemoryEvent};

pub mod bundle;
pub mod config;
pub mod modifiers;

pub use bundle::{
    CoefficientRanges, FeatureBundle, MappedConnection, MappedLocation, NodeRole, PlanarBounds,
    TerrainCoefficients,
};
pub use config::{BiasWeights, MappingConfig, ValueRange};
pub use modifiers::{KindModifier, LanguageTint, ModifierTable, TintTable};

/// 先把输入夹紧到 [in_min, in_max] 再插值；输入区间为零时取 out_min
#[inline]
pub fn remap(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    let span = in_max - in_min;
    let t = if span.abs() <= f64::EPSILON {
        0.0
    } else {
        (value - in_min) / span
    };
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    // 两端精确落在 out_min / out_max 上
    out_min * (1.0 - t) + out_max * t
}

#[inline]
pub fn remap_into(value: f64, in_min: f64, in_max: f64, out: ValueRange) -> f64 {
    remap(value, in_min, in_max, out.min, out.max)
}

/// 夹紧到 [lo, hi]；NaN 取 lo，无穷取最近的边界
pub fn clamp_signal(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        warn!("clamp_signal: NaN detected, clamping to {lo:.4}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        warn!("clamp_signal: Inf detected, clamping to {boundary:.4}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// 夹紧后的五个信号
#[derive(Debug, Clone, Copy, PartialEq)]
struct Signals {
    intensity: f64,
    valence: f64,
    language_balance: f64,
    significance: f64,
    duration: f64,
}

impl Signals {
    fn of(location: &Location) -> Self {
        Self {
            intensity: clamp_signal(location.intensity, 0.0, 1.0),
            valence: clamp_signal(location.valence, -1.0, 1.0),
            language_balance: clamp_signal(location.language_balance, -1.0, 1.0),
            significance: clamp_signal(location.significance, 0.0, 1.0),
            duration: clamp_signal(location.duration, 0.0, f64::MAX),
        }
    }
}

/// 年份归一化区间；没有任何年份时退回配置的年代
fn year_span(data: &JourneyData, config: &MappingConfig) -> (f64, f64) {
    let (min, max) = data
        .locations
        .iter()
        .filter_map(Location::representative_year)
        .filter(|y| y.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));

    if min.is_finite() && max.is_finite() {
        (min, max)
    } else {
        (config.fallback_era.min, config.fallback_era.max)
    }
}

/// languageBalance 线性映射到水平范围
pub fn language_axis(language_balance: f64, config: &MappingConfig) -> f64 {
    remap_into(language_balance, -1.0, 1.0, config.x_range)
}

/// 时间螺旋：t∈[0,1] 映射到 (x, z)
pub fn time_spiral(t: f64, config: &MappingConfig) -> (f64, f64) {
    let angle = t * TAU * config.spiral_turns;
    let radius = remap_into(t, 0.0, 1.0, config.spiral_radius);
    (angle.cos() * radius, angle.sin() * radius)
}

/// 按下标计算的确定性抖动
pub fn index_jitter(index: usize, is_visit: bool, config: &MappingConfig) -> (f64, f64) {
    let amount = if is_visit { config.visit_jitter } else { config.jitter };
    let i = index as f64;
    ((i * config.jitter_c1).sin() * amount, (i * config.jitter_c2).cos() * amount)
}

fn hub_coefficients(s: &Signals, config: &MappingConfig) -> TerrainCoefficients {
    let w = &config.bias_weights;
    let bias = s.significance * w.significance + s.intensity * w.intensity + s.valence * w.valence;
    TerrainCoefficients {
        elevation_bias: clamp_signal(bias, config.bias_range.lower(), config.bias_range.upper()),
        amplitude: remap_into(s.intensity, 0.0, 1.0, config.amplitude),
        roughness: remap_into(s.duration, 0.0, config.duration_max, config.roughness),
        erosion: remap_into(1.0 - s.significance, 0.0, 1.0, config.erosion),
        ridge_factor: remap_into(s.valence.abs(), 0.0, 1.0, config.ridge),
    }
}

fn child_coefficients(
    hub: &TerrainCoefficients,
    event: &MemoryEvent,
    sentiment: f64,
    config: &MappingConfig,
) -> TerrainCoefficients {
    let m = config.modifiers.get(event.kind);
    let within = |v: f64, r: ValueRange| clamp_signal(v, r.lower(), r.upper());
    TerrainCoefficients {
        elevation_bias: within(hub.elevation_bias + m.sentiment_bias * sentiment, config.bias_range),
        amplitude: within(hub.amplitude * m.amplitude, config.amplitude),
        roughness: within(hub.roughness * m.roughness, config.roughness),
        erosion: hub.erosion,
        ridge_factor: within(hub.ridge_factor * m.ridge, config.ridge),
    }
}

fn base_color(location: &Location) -> Rgb {
    Rgb::from_hex(&location.color).unwrap_or_else(|| {
        warn!(
            "Location '{}' has unparseable color '{}', using neutral grey",
            location.id, location.color
        );
        Rgb::NEUTRAL
    })
}

/// JourneyData -> FeatureBundle
pub fn map_journey(data: &JourneyData, config: &MappingConfig) -> FeatureBundle {
    let (year_min, year_max) = year_span(data, config);
    debug!("Year span for time spiral: {:.2} - {:.2}", year_min, year_max);

    let mut locations = Vec::with_capacity(data.locations.len() + data.event_count());
    let mut hub_by_id: HashMap<&str, usize> = HashMap::with_capacity(data.locations.len());

    for (index, location) in data.locations.iter().enumerate() {
        let signals = Signals::of(location);
        let year = location.representative_year().unwrap_or(0.0);
        let t = remap(year, year_min, year_max, 0.0, 1.0);

        let (spiral_x, spiral_z) = time_spiral(t, config);
        let lang_x = language_axis(signals.language_balance, config);
        let (jitter_x, jitter_z) = index_jitter(index, location.is_visit, config);

        let terrain = hub_coefficients(&signals, config);
        let position = DVec3::new(
            spiral_x + (lang_x - spiral_x) * config.language_blend + jitter_x,
            terrain.elevation_bias * config.hub_lift,
            spiral_z + jitter_z,
        );
        let color = base_color(location);
        let label_scale = remap_into(signals.significance, 0.0, 1.0, config.label_scale);
        let halo = remap_into(signals.intensity, 0.0, 1.0, config.halo);

        let hub_index = locations.len();
        hub_by_id.entry(location.id.as_str()).or_insert(hub_index);
        locations.push(MappedLocation {
            id: location.id.clone(),
            name: location.name.clone(),
            role: NodeRole::Hub,
            position,
            color,
            label_scale,
            halo,
            terrain,
            significance: signals.significance,
            valence: signals.valence,
            is_visit: location.is_visit,
        });

        let count = location.events.len();
        let ring = config.ring_base + config.ring_intensity * signals.intensity;
        for (i, event) in location.events.iter().enumerate() {
            let sentiment = clamp_signal(event.sentiment.unwrap_or(0.0), -1.0, 1.0);
            let angle = TAU * i as f64 / count as f64 + signals.language_balance * config.ring_phase_shift;
            let lift = signals.valence * config.ring_valence_lift + sentiment * config.ring_sentiment_lift;
            let offset = DVec3::new(angle.cos() * ring, lift, angle.sin() * ring);

            locations.push(MappedLocation {
                id: format!("{}#{}", location.id, i),
                name: location.name.clone(),
                role: NodeRole::Child {
                    parent_id: location.id.clone(),
                    parent_index: hub_index,
                    index: i,
                    count,
                    kind: event.kind,
                },
                position: position + offset,
                color: config.tints.apply(color, event.language),
                label_scale: label_scale * config.child_display_scale,
                halo: halo * config.child_display_scale,
                terrain: child_coefficients(&terrain, event, sentiment, config),
                significance: signals.significance,
                valence: sentiment,
                is_visit: location.is_visit,
            });
        }
    }

    let mut connections = Vec::with_capacity(data.connections.len());
    for connection in &data.connections {
        let (Some(&from), Some(&to)) = (
            hub_by_id.get(connection.from.as_str()),
            hub_by_id.get(connection.to.as_str()),
        ) else {
            warn!(
                "Dropping connection {} -> {}: endpoint not found",
                connection.from, connection.to
            );
            continue;
        };

        let weight = clamp_signal(connection.weight.unwrap_or(config.default_weight), 0.0, 1.0);
        connections.push(MappedConnection {
            from,
            to,
            color: locations[from].color.lerp(locations[to].color, 0.5),
            curvature_y: remap_into(weight, 0.0, 1.0, config.curvature),
            opacity: remap_into(weight, 0.0, 1.0, config.opacity),
            weight,
            year: connection.year,
        });
    }

    info!(
        "Mapped journey: {} hubs, {} event nodes, {} connections ({} dropped)",
        data.locations.len(),
        locations.len() - data.locations.len(),
        connections.len(),
        data.connections.len() - connections.len()
    );

    FeatureBundle { locations, connections, chroma: config.chroma, ranges: config.coefficient_ranges() }
}
