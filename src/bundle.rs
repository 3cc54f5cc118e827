//!
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Everything an entity needs to answer path requests - the layers to search,
/// the movement-classes agents request under and the cache answering coarsely
/// repeated requests
#[derive(Bundle)]
pub struct QuadtreePathsBundle {
	/// The quad-tree decomposition of each movement-class
	node_layers: NodeLayers,
	/// The movement-classes agents may request routes under
	move_profiles: MoveProfiles,
	/// Computed routes keyed for reuse
	route_cache: RouteCache,
	/// The length `x` and depth `z` of the map
	map_dimensions: MapDimensions,
}

impl QuadtreePathsBundle {
	/// Create a new instance of [QuadtreePathsBundle]. Each movement-class
	/// must supply both a layer and a profile, and every layer must describe
	/// the same map
	pub fn new(node_layers: NodeLayers, move_profiles: MoveProfiles) -> Self {
		let layers = node_layers.get();
		if layers.is_empty() {
			panic!("A QuadtreePathsBundle requires at least one NodeLayer");
		}
		if layers.len() != move_profiles.get().len() {
			panic!(
				"Each movement-class requires a layer and a profile, got {} layers and {} profiles",
				layers.len(),
				move_profiles.get().len()
			);
		}
		let map_dimensions = *layers[0].get_dimensions();
		for layer in layers.iter() {
			let dimensions = layer.get_dimensions();
			if dimensions.get_length() != map_dimensions.get_length()
				|| dimensions.get_depth() != map_dimensions.get_depth()
			{
				panic!(
					"Layer {} describes a ({}, {}) map, expected ({}, {})",
					layer.get_layer(),
					dimensions.get_length(),
					dimensions.get_depth(),
					map_dimensions.get_length(),
					map_dimensions.get_depth()
				);
			}
		}
		QuadtreePathsBundle {
			node_layers,
			move_profiles,
			route_cache: RouteCache::default(),
			map_dimensions,
		}
	}
	/// Create a new instance of [QuadtreePathsBundle] where the [NodeLayers]
	/// are derived from disk
	#[cfg(feature = "ron")]
	pub fn new_from_disk(path: &str, move_profiles: MoveProfiles) -> Self {
		let node_layers = NodeLayers::from_ron(path.to_string());
		QuadtreePathsBundle::new(node_layers, move_profiles)
	}
}
