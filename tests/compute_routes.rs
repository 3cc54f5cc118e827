//! Drive route generation end to end, from the plain search API and from the
//! plugin systems servicing request events
//!

use bevy::prelude::*;
use bevy_quadtree_paths_plugin::prelude::*;

/// A `16x16` map where a wall juts down from the northern edge leaving a gap
/// along the southern edge
fn walled_gap_layer() -> NodeLayer {
	let dimensions = MapDimensions::new(16, 16);
	let regions = vec![
		(GridRect::new(0, 0, 6, 16), 1.0),
		(GridRect::new(6, 0, 8, 12), 0.0),
		(GridRect::new(6, 12, 8, 16), 1.0),
		(GridRect::new(8, 0, 16, 16), 1.0),
	];
	NodeLayer::from_regions(dimensions, 0, &regions)
}

/// A `128x64` map of two root-sized nodes, large enough for path sharing
fn shareable_layer() -> NodeLayer {
	let dimensions = MapDimensions::new(128, 64);
	let regions = vec![
		(GridRect::new(0, 0, 64, 64), 1.0),
		(GridRect::new(64, 0, 128, 64), 1.0),
	];
	NodeLayer::from_regions(dimensions, 0, &regions)
}

#[test]
fn route_detours_around_wall() {
	let layer = walled_gap_layer();
	let profile = MoveProfile::new(0, 1);
	let mut context = SearchContext::default();
	let source = Vec3::new(2.0, 0.0, 2.0);
	let target = Vec3::new(14.0, 0.0, 2.0);
	let mut search = PathSearch::new(
		&layer,
		&profile,
		source,
		target,
		SearchMode::Heuristic,
		false,
	);
	search.bind_context(&mut context);
	assert!(search.execute(&mut context));
	let route = search.finalize(&context);
	assert!(route.is_full_path());
	assert_eq!(source, route.get_source());
	assert_eq!(target, route.get_target());
	// the only opening sits along the southern edge of the wall
	assert!(route.get_points().iter().any(|p| p.z >= 12.0));
	// no waypoint may sit strictly inside the blocked region
	let blocked = GridRect::new(6, 0, 8, 12);
	for point in route.get_points().iter() {
		let inside = point.x > blocked.x1 as f32
			&& point.x < blocked.x2 as f32
			&& point.z > blocked.z1 as f32
			&& point.z < blocked.z2 as f32;
		assert!(!inside, "waypoint {:?} crosses the wall", point);
	}
	// the detour is necessarily longer than the straight line
	let length: f32 = route
		.get_points()
		.windows(2)
		.map(|w| w[0].distance(w[1]))
		.sum();
	assert!(length > source.distance(target));
}

#[test]
fn plugin_services_requests_and_reuses_cached_routes() {
	let mut app = App::new();
	app.add_plugins((MinimalPlugins, QuadtreePathsPlugin));
	let layers = NodeLayers::new(vec![shareable_layer()]);
	let profiles = MoveProfiles::new(vec![MoveProfile::new(0, 3)]);
	app.world_mut().spawn(QuadtreePathsBundle::new(layers, profiles));
	app.update();

	// two agents of the same movement-class raise coarsely identical requests,
	// their sources fall within the same footprint-normalised quadrant
	let target = Vec3::new(100.0, 0.0, 30.0);
	app.world_mut().send_event(EventPathRequest::new(
		Vec3::new(1.0, 0.0, 1.0),
		target,
		0,
		SearchMode::Heuristic,
		false,
	));
	app.world_mut().send_event(EventPathRequest::new(
		Vec3::new(2.5, 0.0, 3.0),
		target,
		0,
		SearchMode::Heuristic,
		false,
	));
	app.update();

	// one computation answered both requests
	let mut query = app.world_mut().query::<&RouteCache>();
	let cache = query.single(app.world()).unwrap();
	assert_eq!(1, cache.get().len());

	let events = app.world().resource::<Events<EventRouteComputed>>();
	let mut cursor = events.get_cursor();
	let computed: Vec<&EventRouteComputed> = cursor.read(events).collect();
	assert_eq!(2, computed.len());
	for event in computed.iter() {
		let route = event.get_route();
		assert!(route.is_full_path());
		// each agent received the route stamped with its own literal end points
		assert_eq!(event.get_source(), route.get_source());
		assert_eq!(event.get_target(), route.get_target());
	}
	// the reused copy carries the same interior waypoints as the original
	let first = computed[0].get_route().get_points();
	let second = computed[1].get_route().get_points();
	assert_eq!(first.len(), second.len());
	assert_eq!(first[1..first.len() - 1], second[1..second.len() - 1]);
}

#[test]
fn plugin_answers_raw_probe_requests() {
	let mut app = App::new();
	app.add_plugins((MinimalPlugins, QuadtreePathsPlugin));
	let layers = NodeLayers::new(vec![walled_gap_layer()]);
	let profiles = MoveProfiles::new(vec![MoveProfile::new(0, 1)]);
	app.world_mut().spawn(QuadtreePathsBundle::new(layers, profiles));
	app.update();

	// a straight line through the wall fails the probe
	app.world_mut().send_event(EventPathRequest::new(
		Vec3::new(2.0, 0.0, 2.0),
		Vec3::new(14.0, 0.0, 2.0),
		0,
		SearchMode::Heuristic,
		true,
	));
	app.update();

	let events = app.world().resource::<Events<EventRouteComputed>>();
	let mut cursor = events.get_cursor();
	let computed: Vec<&EventRouteComputed> = cursor.read(events).collect();
	assert_eq!(1, computed.len());
	let route = computed[0].get_route();
	assert!(!route.is_full_path());
	assert!(!route.is_partial_path());
	assert_eq!(2, route.get_points().len());
	// probes are never cached
	let mut query = app.world_mut().query::<&RouteCache>();
	let cache = query.single(app.world()).unwrap();
	assert!(cache.get().is_empty());
}
