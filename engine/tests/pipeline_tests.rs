use journey_engine::api::FieldBuffers;
use journey_engine::mapping::language_axis;
use journey_engine::synthesis::{HeightFieldConfig, PointCloudConfig};
use journey_engine::{
    Connection, JourneyData, Location, MappingConfig, TerrainConfig, TerrainPipeline,
};

fn location(id: &str, language_balance: f64) -> Location {
    Location {
        id: id.to_string(),
        name: id.to_string(),
        native_name: None,
        period: None,
        year: None,
        intensity: 0.9,
        valence: 0.0,
        language_balance,
        significance: 1.0,
        duration: 0.0,
        is_visit: false,
        color: "#c08040".to_string(),
        events: Vec::new(),
    }
}

fn connection(from: &str, to: &str) -> Connection {
    Connection { from: from.to_string(), to: to.to_string(), year: None, weight: Some(0.8) }
}

fn small_pipeline() -> TerrainPipeline {
    let config = TerrainConfig {
        mapping: MappingConfig::default(),
        height_field: HeightFieldConfig { segments: 24, ..Default::default() },
        point_cloud: PointCloudConfig { point_count: 400, ..Default::default() },
    };
    TerrainPipeline::new(config).unwrap()
}

fn sample_data() -> JourneyData {
    let json = include_str!("../../baker/data/sample_journey.json");
    JourneyData::from_json_str(json).unwrap()
}

#[test]
fn single_location_lands_on_midpoint_plus_index_jitter() {
    let data = JourneyData { locations: vec![location("only", 0.0)], connections: Vec::new() };
    let pipeline = TerrainPipeline::default();
    let bundle = pipeline.bundle(&data);

    assert_eq!(bundle.locations.len(), 1);
    assert_eq!(bundle.connections.len(), 0);
    let p = bundle.locations[0].position;
    // index 0: sin(0) * 3.5 on x, cos(0) * 3.5 on z
    assert_eq!(p.x, 0.0);
    assert_eq!(p.z, 3.5);

    // intensity 0.9 -> 6 + 0.9 * 20
    assert!((bundle.locations[0].terrain.amplitude - 24.0).abs() < 1e-12);
}

#[test]
fn language_balance_extremes_reach_configured_range() {
    let cfg = MappingConfig::default();
    assert_eq!(language_axis(-1.0, &cfg), cfg.x_range.min);
    assert_eq!(language_axis(1.0, &cfg), cfg.x_range.max);
    assert_eq!(language_axis(0.0, &cfg), cfg.x_range.mid());

    let pipeline = TerrainPipeline::default();
    for (balance, expected) in [(-1.0, cfg.x_range.min), (1.0, cfg.x_range.max)] {
        let data = JourneyData { locations: vec![location("a", balance)], connections: Vec::new() };
        let bundle = pipeline.bundle(&data);
        let x = bundle.locations[0].position.x;
        assert!((x - expected * cfg.language_blend).abs() < 1e-9, "x = {x}");
    }
}

#[test]
fn dangling_connections_are_dropped_one_for_one() {
    let data = JourneyData {
        locations: vec![location("a", -0.5), location("b", 0.5)],
        connections: vec![
            connection("a", "b"),
            connection("a", "gone"),
            connection("missing", "b"),
            connection("b", "a"),
        ],
    };
    let bundle = TerrainPipeline::default().bundle(&data);
    assert_eq!(bundle.connections.len(), 2);
    assert_eq!((bundle.connections[0].from, bundle.connections[0].to), (0, 1));
    assert_eq!((bundle.connections[1].from, bundle.connections[1].to), (1, 0));
}

#[test]
fn mapping_and_synthesis_are_bit_identical_across_runs() {
    let data = sample_data();
    let pipeline = small_pipeline();

    let a = pipeline.bundle(&data);
    let b = pipeline.bundle(&data);
    assert_eq!(a, b);

    let ha = pipeline.height_field(&a);
    let hb = pipeline.height_field(&b);
    assert_eq!(ha.positions(), hb.positions());
    assert_eq!(ha.colors(), hb.colors());

    let ca = pipeline.point_cloud(&a);
    let cb = pipeline.point_cloud(&b);
    assert_eq!(ca.positions(), cb.positions());
    assert_eq!(ca.colors(), cb.colors());
}

#[test]
fn empty_dataset_still_produces_complete_buffers() {
    let pipeline = small_pipeline();
    let bundle = pipeline.bundle(&JourneyData::default());
    assert!(bundle.is_empty());

    let field = pipeline.height_field(&bundle);
    assert_eq!(field.sample_count(), 25 * 25);
    assert!(field.positions().iter().all(|v| v.is_finite()));

    let cloud = pipeline.point_cloud(&bundle);
    assert_eq!(cloud.sample_count(), 400);
    assert!(cloud.colors().iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn sample_dataset_maps_hubs_children_and_connections() {
    let data = sample_data();
    let bundle = small_pipeline().bundle(&data);

    assert_eq!(bundle.hub_count(), data.locations.len());
    assert_eq!(bundle.locations.len(), data.locations.len() + data.event_count());
    assert!(bundle.connections.len() <= data.connections.len());
    for (index, hub) in bundle.hubs() {
        let source = data.location(&hub.id).unwrap();
        assert_eq!(bundle.children_of(index).count(), source.events.len());
    }
}

#[test]
fn jitter_pass_leaves_synthesized_cloud_untouched() {
    let pipeline = small_pipeline();
    let bundle = pipeline.bundle(&sample_data());
    let (cloud, mut jitter) = pipeline.animated_point_cloud(&bundle);

    let frame = jitter.update(1.25).to_vec();
    jitter.update(9.0);
    assert_eq!(jitter.update(1.25), frame.as_slice());
    assert_eq!(jitter.base_positions(), cloud.positions());
}

#[test]
fn shipped_config_overrides_only_what_it_names() {
    let config = TerrainConfig::from_ron_str(include_str!("../../baker/data/terrain.ron")).unwrap();
    config.validate().unwrap();
    assert_eq!(config.height_field.segments, 160);
    assert_eq!(config.height_field.cliff_exponent, Some(1.1));
    assert_eq!(config.point_cloud.jitter.amplitude, 0.45);
    assert_eq!(config.point_cloud.jitter.frequency, 0.035);
    assert_eq!(config.mapping.language_blend, MappingConfig::default().language_blend);
}
