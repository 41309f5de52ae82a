use journey_engine::mapping::{PlanarBounds, TerrainCoefficients};
use journey_engine::FeatureBundle;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HubSummary {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub position: [f64; 3],
    pub terrain: TerrainCoefficients,
    pub children: usize,
}

/// `inspect` 子命令打印的 FeatureBundle 概要
#[derive(Debug, Serialize)]
pub struct BundleSummary {
    pub hubs: usize,
    pub event_nodes: usize,
    pub connections: usize,
    pub bounds: Option<PlanarBounds>,
    pub hub_details: Vec<HubSummary>,
}

impl BundleSummary {
    pub fn of(bundle: &FeatureBundle) -> Self {
        let hub_details: Vec<HubSummary> = bundle
            .hubs()
            .map(|(index, hub)| HubSummary {
                index,
                id: hub.id.clone(),
                name: hub.name.clone(),
                position: hub.position.to_array(),
                terrain: hub.terrain,
                children: bundle.children_of(index).count(),
            })
            .collect();

        Self {
            hubs: hub_details.len(),
            event_nodes: bundle.locations.len() - hub_details.len(),
            connections: bundle.connections.len(),
            bounds: bundle.bounds(),
            hub_details,
        }
    }
}
