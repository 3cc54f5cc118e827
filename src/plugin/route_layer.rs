//! Logic relating to servicing [Route] requests
//!

use crate::prelude::*;
use bevy::prelude::*;

/// A request to generate a [Route] describing a path from the source to target
#[derive(Event)]
pub struct EventPathRequest {
	/// The world position the route starts from
	source: Vec3,
	/// The world position to try and find a path to
	target: Vec3,
	/// The movement-class layer of the requesting agent
	layer: u32,
	/// How the search orders its open list
	mode: SearchMode,
	/// Answer with a straight-line traversability test instead of a node walk
	raw_probe: bool,
}

impl EventPathRequest {
	/// Create a new instance of [EventPathRequest]
	pub fn new(source: Vec3, target: Vec3, layer: u32, mode: SearchMode, raw_probe: bool) -> Self {
		EventPathRequest {
			source,
			target,
			layer,
			mode,
			raw_probe,
		}
	}
}

/// Announces the [Route] generated for an [EventPathRequest], whether freshly
/// computed or copied from the [RouteCache]
#[derive(Event)]
pub struct EventRouteComputed {
	/// The world position the request started from
	source: Vec3,
	/// The world position the request pathed towards
	target: Vec3,
	/// The movement-class layer of the request
	layer: u32,
	/// The generated route
	route: Route,
}

impl EventRouteComputed {
	/// Get the world position the request started from
	pub fn get_source(&self) -> Vec3 {
		self.source
	}
	/// Get the world position the request pathed towards
	pub fn get_target(&self) -> Vec3 {
		self.target
	}
	/// Get the movement-class layer of the request
	pub fn get_layer(&self) -> u32 {
		self.layer
	}
	/// Get the generated route
	pub fn get_route(&self) -> &Route {
		&self.route
	}
}

/// Process [EventPathRequest] and respond with [EventRouteComputed]. Requests
/// whose sharing key already has a cached [Route] are answered by copying it
/// rather than searching again, and freshly computed shareable routes are
/// published into the [RouteCache] for later requests. Unshareable requests
/// are computed without touching the cache
#[cfg(not(tarpaulin_include))]
pub fn process_path_requests(
	mut events: EventReader<EventPathRequest>,
	mut cache_q: Query<(&mut RouteCache, &NodeLayers, &MoveProfiles)>,
	mut computed: EventWriter<EventRouteComputed>,
	mut context: Local<SearchContext>,
	time: Res<Time>,
) {
	for event in events.read() {
		for (mut cache, layers, profiles) in cache_q.iter_mut() {
			if event.layer as usize >= layers.get().len() {
				warn!(
					"Path request names movement-class layer {} but only {} layers exist",
					event.layer,
					layers.get().len()
				);
				continue;
			}
			let layer = layers.get_layer(event.layer);
			let profile = profiles.get_profile(event.layer);
			let mut search = PathSearch::new(
				layer,
				profile,
				event.source,
				event.target,
				event.mode,
				event.raw_probe,
			);
			// several agents of a crowd tend to raise coarsely identical
			// requests at once, answer them from the cache instead of
			// searching again - this is critical to perf
			if let Some(key) = search.get_sharing_key() {
				if let Some(cached) = cache.get_route(key) {
					debug!("Route reused from cache under key {}", key);
					computed.write(EventRouteComputed {
						source: event.source,
						target: event.target,
						layer: event.layer,
						route: search.shared_finalize(cached),
					});
					continue;
				}
			}
			search.bind_context(&mut context);
			if !search.execute(&mut context) {
				debug!(
					"No route exists from {} to {} on layer {}",
					event.source, event.target, event.layer
				);
			}
			let route = search.finalize(&context);
			if let Some(key) = search.get_sharing_key() {
				cache.insert_route(key, time.elapsed(), route.clone());
			}
			computed.write(EventRouteComputed {
				source: event.source,
				target: event.target,
				layer: event.layer,
				route,
			});
		}
	}
}

/// Purge any [Route]s older than 15 minutes
#[cfg(not(tarpaulin_include))]
pub fn cleanup_old_routes(mut q_route_cache: Query<&mut RouteCache>, time: Res<Time>) {
	for mut cache in q_route_cache.iter_mut() {
		let mut routes_to_purge = Vec::new();
		for data in cache.get_mut().keys() {
			let elapsed = time.elapsed();
			let diff = elapsed.saturating_sub(data.get_time_generated());
			if diff.as_secs() > 900 {
				routes_to_purge.push(*data);
			}
		}
		for purge in routes_to_purge.iter() {
			cache.remove_route(*purge);
		}
	}
}
