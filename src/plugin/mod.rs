//! Defines the Bevy [Plugin] for QuadtreePaths
//!

use crate::prelude::*;
use bevy::prelude::*;

pub mod route_layer;

/// Groups the systems so that cache upkeep always runs before route generation
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	/// Cache cleardown
	Tidy,
	/// Route generation
	Calculate,
}

/// Registers the events, reflected types and systems servicing path requests
pub struct QuadtreePathsPlugin;

impl Plugin for QuadtreePathsPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.register_type::<GridRect>()
			.register_type::<MapDimensions>()
			.register_type::<MoveProfile>()
			.register_type::<RouteMetadata>()
			.add_event::<route_layer::EventPathRequest>()
			.add_event::<route_layer::EventRouteComputed>()
			.configure_sets(Update, (OrderingSet::Tidy, OrderingSet::Calculate).chain())
			.add_systems(
				Update,
				(
					route_layer::cleanup_old_routes.in_set(OrderingSet::Tidy),
					route_layer::process_path_requests.in_set(OrderingSet::Calculate),
				),
			);
	}
}
