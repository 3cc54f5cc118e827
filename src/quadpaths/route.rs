//! The output of a search is a [Route] of ordered waypoints which steering
//! logic walks, plus a [RouteCache] letting crowds of agents with coarsely
//! similar requests reuse one computed route instead of searching again
//!

use std::collections::BTreeMap;
use std::time::Duration;

use bevy::prelude::*;

/// An ordered series of waypoints from a literal source point to a literal
/// (or substituted) target point together with the outcome of the search that
/// produced it. Exactly one of full path, partial path or neither holds -
/// callers must handle all three
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, Default)]
pub struct Route {
	/// The waypoints, the first being the literal source point and the last
	/// the target point (the effective target for a partial path)
	points: Vec<Vec3>,
	/// Axis-aligned bounding box `(min, max)` of all waypoints
	bounding_box: (Vec3, Vec3),
	/// Whether the route reaches the requested target
	full_path: bool,
	/// Whether the route is a best-effort path ending short of the target
	partial_path: bool,
	/// Whether the literal target was unreachable and a nearby passable node
	/// was substituted as the goal
	degraded_goal: bool,
}

impl Route {
	/// Create a new instance of [Route]
	pub fn new(points: Vec<Vec3>, full_path: bool, partial_path: bool, degraded_goal: bool) -> Self {
		if points.len() < 2 {
			panic!(
				"A Route requires at least a source and a target point, got {} points",
				points.len()
			);
		}
		let bounding_box = calculate_bounding_box(&points);
		Route {
			points,
			bounding_box,
			full_path,
			partial_path,
			degraded_goal,
		}
	}
	/// Get the waypoints
	pub fn get_points(&self) -> &Vec<Vec3> {
		&self.points
	}
	/// Get the literal source point
	pub fn get_source(&self) -> Vec3 {
		self.points[0]
	}
	/// Get the target point (the effective target for a partial path)
	pub fn get_target(&self) -> Vec3 {
		self.points[self.points.len() - 1]
	}
	/// Get the axis-aligned bounding box `(min, max)` of the waypoints
	pub fn get_bounding_box(&self) -> (Vec3, Vec3) {
		self.bounding_box
	}
	/// Whether the route reaches the requested target
	pub fn is_full_path(&self) -> bool {
		self.full_path
	}
	/// Whether the route is a best-effort path ending short of the target
	pub fn is_partial_path(&self) -> bool {
		self.partial_path
	}
	/// Whether the goal was substituted because the literal target was unreachable
	pub fn is_degraded_goal(&self) -> bool {
		self.degraded_goal
	}
	/// Copy this route for a new request - the waypoints are reused verbatim
	/// while the literal source and target points are overwritten with the
	/// new request's own, the bounding box recomputed and the outcome flags
	/// carried over as-is
	pub fn reuse_for(&self, source: Vec3, target: Vec3) -> Route {
		let mut points = self.points.clone();
		let last = points.len() - 1;
		points[0] = source;
		points[last] = target;
		let bounding_box = calculate_bounding_box(&points);
		Route {
			points,
			bounding_box,
			full_path: self.full_path,
			partial_path: self.partial_path,
			degraded_goal: self.degraded_goal,
		}
	}
}

/// Compute the axis-aligned bounding box `(min, max)` over a set of waypoints
fn calculate_bounding_box(points: &[Vec3]) -> (Vec3, Vec3) {
	let mut min = Vec3::INFINITY;
	let mut max = Vec3::NEG_INFINITY;
	for point in points.iter() {
		min = min.min(*point);
		max = max.max(*point);
	}
	(min, max)
}

/// Describes the properties of a cached route
#[derive(Clone, Copy, Debug, Reflect)]
pub struct RouteMetadata {
	/// The 64-bit sharing key identifying the coarse requests the route answers
	key: u64,
	//? If a game is running for 136 years bad things will start happening here
	/// Marks the route based on time elapsed since app start, used to enable
	/// automatic cleardown of long lived routes that are probably not needed anymore
	time_generated: Duration,
}

// we don't want to compare `time_generated` so manually impl PartialEq
impl PartialEq for RouteMetadata {
	fn eq(&self, other: &Self) -> bool {
		self.key == other.key
	}
}
impl Eq for RouteMetadata {}

impl Ord for RouteMetadata {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.key.cmp(&other.key)
	}
}

impl PartialOrd for RouteMetadata {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl RouteMetadata {
	/// Create a new instance of [RouteMetadata]
	pub fn new(key: u64, time_generated: Duration) -> Self {
		RouteMetadata {
			key,
			time_generated,
		}
	}
	/// Get the sharing key
	pub fn get_key(&self) -> u64 {
		self.key
	}
	/// Get when the route was generated
	pub fn get_time_generated(&self) -> Duration {
		self.time_generated
	}
}

/// Computed routes keyed by their sharing key so that coarsely similar
/// requests reuse one dataset. This cache is the single point guaranteeing at
/// most one computation per key - the search itself only promises a correct,
/// stable key
#[derive(Component, Default, Clone)]
pub struct RouteCache {
	/// Computed routes an agent can copy via [Route::reuse_for]
	routes: BTreeMap<RouteMetadata, Route>,
}

impl RouteCache {
	/// Get the map of routes
	pub fn get(&self) -> &BTreeMap<RouteMetadata, Route> {
		&self.routes
	}
	/// Get a mutable reference to the map of routes
	pub fn get_mut(&mut self) -> &mut BTreeMap<RouteMetadata, Route> {
		&mut self.routes
	}
	/// Get a cached route by sharing key. Returns [None] if it doesn't exist
	pub fn get_route(&self, key: u64) -> Option<&Route> {
		let metadata = RouteMetadata {
			key,
			time_generated: Duration::default(),
		};
		let route = self.routes.get(&metadata);
		trace!("Route: {:?}", route);
		route
	}
	/// Insert a computed route under its sharing key
	pub fn insert_route(&mut self, key: u64, elapsed_duration: Duration, route: Route) {
		let metadata = RouteMetadata {
			key,
			time_generated: elapsed_duration,
		};
		self.routes.insert(metadata, route);
	}
	/// Remove a route from the cache
	pub fn remove_route(&mut self, metadata: RouteMetadata) {
		self.routes.remove(&metadata);
	}
}
