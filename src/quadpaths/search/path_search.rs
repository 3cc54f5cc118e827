//! A [PathSearch] services one route request from a literal source point to a
//! literal target point. It moves through the states Initialized (points
//! recorded and map-clamped), ThreadBound (a [SearchContext] attached and the
//! end nodes resolved), Executing and Finalized, and is never shared across
//! threads. The expansion loop walks the node graph cheapest-first, detecting
//! superseded open-list entries lazily at pop time instead of re-prioritising
//! them in place
//!

use std::collections::VecDeque;

use crate::prelude::*;
use bevy::prelude::*;

/// Cell margin around an impassable target node searched for a passable
/// substitute goal
const GOAL_SUBSTITUTE_MARGIN: u32 = 16;

/// One source to target route request
pub struct PathSearch<'a> {
	/// The movement-class layer being searched
	layer: &'a NodeLayer,
	/// The profile of the agent requesting the route
	profile: &'a MoveProfile,
	/// Literal start of the route, clamped into the map
	source_point: Vec3,
	/// Literal end of the route, clamped into the map. Replaced by the most
	/// promising visited node's centre when only a partial path is found
	target_point: Vec3,
	/// How the open list orders its nodes
	mode: SearchMode,
	/// Skip the node walk and answer with a straight-line traversability test
	raw_probe: bool,
	/// Node containing the source point
	source_node: u32,
	/// Node containing the target point, possibly substituted for a passable
	/// neighbour or for the partial-path anchor
	target_node: u32,
	/// The visited node with the lowest heuristic cost, the anchor of a
	/// partial path should the open list empty without reaching the target
	min_node: u32,
	/// Scales the remaining-distance estimate, the reciprocal of the layer's
	/// best speed modifier (or zero for uniform-cost ordering)
	h_cost_multiplier: f32,
	/// Whether the literal target node was impassable and a substitute was used
	degraded_goal: bool,
	/// Whether the search reached the target node
	have_full_path: bool,
	/// Whether the search ended short of the target at the min-heuristic node
	have_partial_path: bool,
	/// Whether a [SearchContext] has been bound
	bound: bool,
	/// Whether the search has executed
	executed: bool,
	/// Coarse 64-bit key identifying the requests this route may answer,
	/// [None] when the request cannot be shared
	sharing_key: Option<u64>,
}

impl<'a> PathSearch<'a> {
	/// Create a new instance of [PathSearch] for a request, clamping both
	/// points into the map and deriving the sharing key
	pub fn new(
		layer: &'a NodeLayer,
		profile: &'a MoveProfile,
		source: Vec3,
		target: Vec3,
		mode: SearchMode,
		raw_probe: bool,
	) -> Self {
		let source_point = layer.get_dimensions().clamp_point(source);
		let target_point = layer.get_dimensions().clamp_point(target);
		let source_node = layer.get_node_index_at_point(source_point);
		let target_node = layer.get_node_index_at_point(target_point);
		let mut search = PathSearch {
			layer,
			profile,
			source_point,
			target_point,
			mode,
			raw_probe,
			source_node,
			target_node,
			min_node: source_node,
			h_cost_multiplier: 0.0,
			degraded_goal: false,
			have_full_path: false,
			have_partial_path: false,
			bound: false,
			executed: false,
			sharing_key: None,
		};
		search.sharing_key = search.derive_sharing_key();
		search
	}
	/// Get the literal (clamped) source point
	pub fn get_source_point(&self) -> Vec3 {
		self.source_point
	}
	/// Get the effective target point - the literal (clamped) target, or the
	/// centre of the partial-path anchor node after execution found no full path
	pub fn get_target_point(&self) -> Vec3 {
		self.target_point
	}
	/// Whether the search reached the target node
	pub fn has_full_path(&self) -> bool {
		self.have_full_path
	}
	/// Whether the search ended short of the target with a best-effort route
	pub fn has_partial_path(&self) -> bool {
		self.have_partial_path
	}
	/// Whether the literal target node was impassable and a substitute goal was used
	pub fn is_degraded_goal(&self) -> bool {
		self.degraded_goal
	}
	/// Get the sharing key of the request, [None] when it cannot be shared
	pub fn get_sharing_key(&self) -> Option<u64> {
		self.sharing_key
	}
	/// Attach the reusable scratch storage of the worker executing this
	/// search and resolve the end nodes. An impassable target node is
	/// substituted by the nearest passable node in a bounded area around it,
	/// degrading the goal, because pathing towards a literally unreachable
	/// node would otherwise visit every pathable node of the layer
	pub fn bind_context(&mut self, context: &mut SearchContext) {
		context.init(self.layer.node_count(), self.layer.leaf_count());
		let target = self.layer.get_node(self.target_node);
		if target.is_impassable() {
			let area = target.get_bounds().expanded_by(GOAL_SUBSTITUTE_MARGIN);
			let anchor = self.layer.get_dimensions().get_cell_of_point(self.target_point);
			if let Some(alternative) =
				self.layer
					.nearest_node_in_area(&area, anchor, &mut context.area_scratch)
			{
				self.target_node = alternative;
				self.degraded_goal = true;
			}
		}
		context.records.insert(self.source_node);
		context.records.insert_if_absent(self.target_node);
		self.min_node = self.source_node;
		self.bound = true;
	}
	/// Run the search to completion on the calling thread. Returns whether
	/// any route (full or partial) exists. A source node equal to the target
	/// node short-circuits to a trivial two point path and a raw-probe
	/// request delegates to the straight-line traversability test
	pub fn execute(&mut self, context: &mut SearchContext) -> bool {
		if !self.bound {
			panic!("PathSearch::execute called before a SearchContext was bound");
		}
		self.executed = true;
		self.have_full_path = self.source_node == self.target_node;
		self.have_partial_path = false;

		// early-out
		if self.have_full_path {
			return true;
		}

		if self.raw_probe {
			self.have_full_path =
				self.profile
					.is_line_traversable(self.layer, self.source_point, self.target_point);
			return self.have_full_path;
		}

		self.execute_node_search(context)
	}
	/// The main expansion loop
	fn execute_node_search(&mut self, context: &mut SearchContext) -> bool {
		// be as optimistic as possible: assume the remainder of the route
		// covers only terrain carrying the layer's best speed modifier. The
		// estimate then never overestimates the remaining true cost, at the
		// price of being loose over slower ground
		self.h_cost_multiplier = match self.mode {
			SearchMode::Heuristic => 1.0 / self.layer.get_max_speed_modifier(),
			SearchMode::UniformCost => 0.0,
		};

		self.reset_state(context);

		while let Some(entry) = context.open_list.pop() {
			if self.iterate_node(context, entry) {
				self.have_full_path = true;
				context.reset_queue();
			}
		}

		self.have_partial_path = !self.have_full_path && self.min_node != self.source_node;

		// adjust the target point if we only got a partial result, otherwise
		// steering would drive an agent towards a waypoint it can never reach
		if self.have_partial_path {
			self.target_node = self.min_node;
			let centre = self.layer.get_node(self.min_node).get_centre();
			self.target_point = Vec3::new(centre.x, 0.0, centre.y);
		}

		self.have_full_path || self.have_partial_path
	}
	/// Seed the open list with the source node at priority zero
	fn reset_state(&mut self, context: &mut SearchContext) {
		context.reset_queue();
		let h_distance = self.source_point.distance(self.target_point);
		let slot = context.records.insert(self.source_node);
		let record = context.records.record_at_mut(slot);
		record.g_cost = 0.0;
		record.h_cost = h_distance * self.h_cost_multiplier;
		record.prev_slot = 0;
		record.crossing = Vec2::new(self.source_point.x, self.source_point.z);
		record.priority = record.g_cost + record.h_cost;
		context.open_list.push(QueueEntry::new(self.source_node, 0.0));
	}
	/// Pop one entry off the open list and expand it. Returns whether the
	/// entry is the target node
	fn iterate_node(&mut self, context: &mut SearchContext, entry: QueueEntry) -> bool {
		debug_assert!(context.records.is_set(entry.node));

		if entry.node == self.target_node {
			return true;
		}

		let slot = context.records.slot_of(entry.node);
		// a later, cheaper push for this node supersedes this entry
		if context.records.record_at(slot).priority < entry.priority {
			return false;
		}

		// remember the node with the lowest h-cost in case the search fails
		// to reach the target
		let min_slot = context.records.slot_of(self.min_node);
		if context.records.record_at(slot).h_cost < context.records.record_at(min_slot).h_cost {
			self.min_node = entry.node;
		}

		debug_assert_eq!(entry.node, context.records.record_at(slot).get_node());

		self.expand_neighbours(context, entry.node, slot);
		false
	}
	/// Relax every node sharing an edge with the current node
	fn expand_neighbours(&mut self, context: &mut SearchContext, node: u32, slot: usize) {
		let current = self.layer.get_node(node);
		// if the current node is the source node, this is just the original source point
		let (current_g, current_crossing) = {
			let record = context.records.record_at(slot);
			(record.g_cost, record.crossing)
		};
		let current_point = Vec3::new(current_crossing.x, 0.0, current_crossing.y);
		// a large finite cost lets agents starting inside a blocked region
		// pay their way out, a cost of infinity would prevent them escaping
		let current_cost = if current.is_impassable() {
			CLOSED_NODE_COST
		} else {
			current.get_move_cost()
		};

		for (i, &neighbour) in current.get_neighbours().iter().enumerate() {
			let next = self.layer.get_node(neighbour);
			// blocked nodes can be left but never entered
			if next.is_impassable() && !current.is_impassable() {
				continue;
			}
			let is_target = neighbour == self.target_node;
			if is_target {
				debug_assert!(current.neighbour_relation(next).is_some());
				debug_assert!(next.neighbour_relation(current).is_some());
			}

			// examine the candidate crossing points along the edge between
			// the current node and its neighbour and keep the one that
			// minimises g + h. Each segment is weighted by the move-cost of
			// the node it crosses and measured with literal distances -
			// squared distances would bias routes towards smaller nodes
			let mut best_g = f32::INFINITY;
			let mut best_h = f32::INFINITY;
			let mut best_point = Vec2::ZERO;
			for j in 0..CROSSING_POINTS_PER_EDGE {
				let crossing = current.get_crossing_point(i, j);
				let point = Vec3::new(crossing.x, 0.0, crossing.y);
				let g_distance = current_point.distance(point);
				let h_distance = self.target_point.distance(point);
				let mut g = current_g + current_cost * g_distance;
				let h = if is_target {
					// the closing segment from the crossing point to the
					// literal target crosses the target node itself
					g += next.get_move_cost() * h_distance;
					0.0
				} else {
					h_distance * self.h_cost_multiplier
				};
				if g + h < best_g + best_h {
					best_g = g;
					best_h = h;
					best_point = crossing;
				}
			}

			let next_slot = context.records.insert_if_absent(neighbour);
			let record = context.records.record_at_mut(next_slot);
			// accept only a strict improvement on the best known cost, any
			// superseded open-list entry is discarded lazily at pop time
			if best_g >= record.g_cost {
				continue;
			}
			record.g_cost = best_g;
			record.h_cost = best_h;
			record.prev_slot = slot as u32;
			record.crossing = best_point;
			record.priority = best_g + best_h;
			context.open_list.push(QueueEntry::new(neighbour, record.priority));
		}
	}
	/// Produce the [Route] of an executed search - trace the predecessor
	/// chain into waypoints, straighten them and stamp the outcome flags. A
	/// degraded goal suppresses the full-path flag so callers do not treat
	/// the substituted goal as the requested one
	pub fn finalize(&self, context: &SearchContext) -> Route {
		if !self.executed {
			panic!("PathSearch::finalize called before the search was executed");
		}
		let points = if self.raw_probe || self.source_node == self.target_node {
			// source equals target (or no node walk ran), only two points needed
			vec![self.source_point, self.target_point]
		} else {
			let mut traced = self.trace_path(context);
			self.smooth_path(context, &mut traced);
			traced
		};
		Route::new(
			points,
			self.have_full_path && !self.degraded_goal,
			self.have_partial_path,
			self.degraded_goal,
		)
	}
	/// Copy a cached route computed under the same sharing key into a fresh
	/// [Route] for this request - waypoints verbatim, this request's literal
	/// end points, flags carried over as-is
	pub fn shared_finalize(&self, cached: &Route) -> Route {
		cached.reuse_for(self.source_point, self.target_point)
	}
	/// Walk the predecessor chain from the target back to the source,
	/// collecting each hop's chosen crossing point
	fn trace_path(&self, context: &SearchContext) -> Vec<Vec3> {
		let records = &context.records;
		let mut waypoints = VecDeque::new();

		if self.source_node != self.target_node {
			let mut slot = records.slot_of(self.target_node);
			let mut previous_point = self.target_point;

			loop {
				let record = records.record_at(slot);
				if record.prev_slot == 0 || record.get_node() == self.source_node {
					break;
				}
				let point = Vec3::new(record.crossing.x, 0.0, record.crossing.y);

				debug_assert!(point.is_finite());
				debug_assert!(record.crossing.x >= 0.0 && record.crossing.y >= 0.0);
				// waypoints should never have identical coordinates, with one
				// exception: the target point can legitimately coincide with
				// the first crossing point, which we must skip
				debug_assert!(
					point != previous_point || record.get_node() == self.target_node
				);

				if point != previous_point {
					waypoints.push_front(point);
				}
				previous_point = point;
				slot = record.prev_slot as usize;
			}
		}

		// the first and last waypoints are always the literal end points
		let mut points = Vec::with_capacity(waypoints.len() + 2);
		points.push(self.source_point);
		points.extend(waypoints);
		points.push(self.target_point);
		points
	}
	/// Straighten the traced waypoints with a bounded number of smoothing passes
	fn smooth_path(&self, context: &SearchContext, points: &mut [Vec3]) {
		if points.len() == 2 {
			return;
		}
		debug_assert_eq!(0, context.records.get(self.source_node).prev_slot);
		for _ in 0..MAX_SMOOTHING_PASSES {
			if !self.smooth_pass(context, points) {
				// all waypoints stopped moving
				break;
			}
		}
	}
	/// One smoothing pass walked in reverse (target to source) over the
	/// waypoint triplets. Returns whether any waypoint moved beyond
	/// [SMOOTHING_MOVED_SQ_EPSILON]
	fn smooth_pass(&self, context: &SearchContext, points: &mut [Vec3]) -> bool {
		let records = &context.records;
		let mut index = points.len();
		let mut moved = 0;

		let mut slot_1 = records.slot_of(self.target_node);

		while records.record_at(slot_1).get_node() != self.source_node {
			let slot_0 = slot_1;
			slot_1 = records.record_at(slot_0).prev_slot as usize;
			if slot_1 == 0 {
				break;
			}
			index -= 1;
			if index < 2 {
				break;
			}

			let node_0 = self.layer.get_node(records.record_at(slot_0).get_node());
			let node_1 = self.layer.get_node(records.record_at(slot_1).get_node());
			let relation = match node_0.neighbour_relation(node_1) {
				Some(relation) => relation,
				None => break,
			};

			debug_assert!(index < points.len());
			let p0 = points[index];
			let p1 = points[index - 1];
			let p2 = points[index - 2];

			// check if we can reduce the angle between segments p0-p1 and
			// p1-p2 (ideally to zero degrees, making p0-p2 a straight line)
			// by sliding p1 along the edge shared between the two nodes
			// without causing either segment to cross into other nodes
			let p1p0 = (p1 - p0).normalize_or_zero();
			let p2p1 = (p2 - p1).normalize_or_zero();
			let p2p0 = (p2 - p0).normalize_or_zero();
			let dot = p1p0.dot(p2p1);

			// if the segments are already nearly parallel, skip
			if dot >= SMOOTHING_PARALLEL_CUTOFF {
				continue;
			}

			let h_edge = relation == EdgeShared::Horizontal || relation == EdgeShared::Corner;
			let v_edge = relation == EdgeShared::Vertical || relation == EdgeShared::Corner;

			// establish the span within which p1 may move
			let b0 = node_0.get_bounds();
			let b1 = node_1.get_bounds();
			let x_min = b0.x1.max(b1.x1) as f32;
			let z_min = b0.z1.max(b1.z1) as f32;
			let x_max = b0.x2.min(b1.x2) as f32;
			let z_max = b0.z2.min(b1.z2) as f32;

			{
				// intersect the ray p0 -> p2 with the shared edge, if the
				// intersection lies within the overlapping extent of both
				// nodes use it and move to the next triplet
				let dfx = if p2p0.x > 0.0 {
					b0.x2 as f32 - p0.x
				} else {
					b0.x1 as f32 - p0.x
				};
				let dfz = if p2p0.z > 0.0 {
					b0.z2 as f32 - p0.z
				} else {
					b0.z1 as f32 - p0.z
				};
				let dx = if p2p0.x.abs() > 0.001 { p2p0.x } else { 0.001 };
				let dz = if p2p0.z.abs() > 0.001 { p2p0.z } else { 0.001 };
				let tx = dfx / dx;
				let tz = dfz / dz;

				let mut pi = Vec3::ZERO;
				if h_edge {
					pi.x = p0.x + p2p0.x * tz;
					pi.z = p1.z;
				}
				if v_edge {
					pi.x = p1.x;
					pi.z = p0.z + p2p0.z * tx;
				}

				let ok = pi.x >= x_min && pi.x <= x_max && pi.z >= z_min && pi.z <= z_max;
				if ok {
					moved += usize::from((pi - p1).length_squared() > SMOOTHING_MOVED_SQ_EPSILON);
					debug_assert!(pi.is_finite());
					points[index - 1] = pi;
					continue;
				}
			}

			if h_edge != v_edge {
				// substitute the edge end points for p1 and keep whichever
				// yields the straighter pair of segments (dot-products as
				// close to 1 as possible), if either improves at all
				let mut e0 = p1;
				let mut e1 = p1;
				if h_edge {
					e0.x = x_min;
					e1.x = x_max;
				}
				if v_edge {
					e0.z = z_min;
					e1.z = z_max;
				}

				// p0-e0-p2
				let e0p0 = (e0 - p0).normalize_or_zero();
				let p2e0 = (p2 - e0).normalize_or_zero();
				let dot0 = e0p0.dot(p2e0);
				// p0-e1-p2
				let e1p0 = (e1 - p0).normalize_or_zero();
				let p2e1 = (p2 - e1).normalize_or_zero();
				let dot1 = e1p0.dot(p2e1);

				// if neither end point is an improvement, skip
				if dot >= dot0.max(dot1) {
					continue;
				}

				let mut pi = p1;
				if dot0 > dot1.max(dot) {
					pi = e0;
				}
				if dot1 >= dot0.max(dot) {
					pi = e1;
				}

				moved += usize::from((pi - p1).length_squared() > SMOOTHING_MOVED_SQ_EPSILON);
				debug_assert!(pi.is_finite());
				points[index - 1] = pi;
			}
		}

		moved != 0
	}
	/// Derive the coarse 64-bit key identifying the requests that can safely
	/// reuse this request's route, [None] marking the request unshareable.
	/// The source is normalised by descending from its node's quad-tree
	/// number towards the virtual quadrant exactly bounding the agent's
	/// footprint bucket, so nearby same-class agents collapse onto one key
	fn derive_sharing_key(&self) -> Option<u64> {
		if self.raw_probe {
			return None;
		}
		let source = self.layer.get_node(self.source_node);
		let bounds = source.get_bounds();
		// the quadrant descent quarters square nodes, any other shape cannot
		// be normalised this way
		if bounds.width() != bounds.depth() {
			return None;
		}
		let mut node_size = bounds.width();
		// small nodes pin the source too precisely for the route to be reusable
		if node_size < SHARE_PATH_MIN_SIZE {
			return None;
		}
		let bucket = self.profile.get_footprint().next_power_of_two();
		// is the node too small to have multiple agents within it?
		if node_size < bucket {
			return None;
		}
		// is the agent too big to be able to share paths?
		if bucket > SHARE_PATH_MAX_SIZE {
			return None;
		}

		let root_mask = self.layer.get_root_mask();
		let mut node_number = source.get_node_number();
		let mut x_offset = bounds.x1;
		let mut z_offset = bounds.z1;
		let (source_x, source_z) = self
			.layer
			.get_dimensions()
			.get_cell_of_point(self.source_point);
		while node_size > bucket {
			// build the rest of the virtual node number
			let half = node_size >> 1;
			let is_east = source_x >= x_offset + half;
			let is_south = source_z >= z_offset + half;
			let quadrant = u32::from(is_east) + 2 * u32::from(is_south);
			node_number = child_node_number(node_number, quadrant, root_mask);

			node_size = half;
			x_offset += half * u32::from(is_east);
			z_offset += half * u32::from(is_south);
		}

		let area = self.layer.get_dimensions().get_area();
		let target_number = self.layer.get_node(self.target_node).get_node_number() as u64;
		let layer_index = self.layer.get_layer() as u64;
		Some(node_number as u64 + target_number * area + layer_index * area * area)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	/// An `8x8` map of 64 uniform-cost single-cell leaf nodes
	fn unit_grid_layer() -> NodeLayer {
		let dimensions = MapDimensions::new(8, 8);
		let mut regions = Vec::new();
		for z in 0..8 {
			for x in 0..8 {
				regions.push((GridRect::new(x, z, x + 1, z + 1), 1.0));
			}
		}
		NodeLayer::from_regions(dimensions, 0, &regions)
	}
	/// An `8x8` map where an impassable wall spans the full depth, cutting
	/// the western nodes off from the eastern one
	fn walled_layer() -> NodeLayer {
		let dimensions = MapDimensions::new(8, 8);
		let regions = vec![
			(GridRect::new(0, 0, 3, 4), 1.0),
			(GridRect::new(0, 4, 3, 8), 1.0),
			(GridRect::new(3, 0, 5, 8), 0.0),
			(GridRect::new(5, 0, 8, 8), 1.0),
		];
		NodeLayer::from_regions(dimensions, 0, &regions)
	}
	/// Sum of segment lengths along a set of waypoints
	fn total_length(points: &[Vec3]) -> f32 {
		points.windows(2).map(|w| w[0].distance(w[1])).sum()
	}
	/// Drive a request through the full state machine and return the route
	fn run(layer: &NodeLayer, source: Vec3, target: Vec3, mode: SearchMode) -> Route {
		let profile = MoveProfile::new(0, 1);
		let mut context = SearchContext::default();
		let mut search = PathSearch::new(layer, &profile, source, target, mode, false);
		search.bind_context(&mut context);
		search.execute(&mut context);
		search.finalize(&context)
	}
	#[test]
	fn trivial_same_node_path() {
		let layer = walled_layer();
		let profile = MoveProfile::new(0, 1);
		let mut context = SearchContext::default();
		let source = Vec3::new(0.5, 0.0, 0.5);
		let target = Vec3::new(2.5, 0.0, 3.5);
		let mut search = PathSearch::new(&layer, &profile, source, target, SearchMode::Heuristic, false);
		search.bind_context(&mut context);
		assert!(search.execute(&mut context));
		// the expansion loop never ran
		assert!(context.open_list.is_empty());
		let route = search.finalize(&context);
		assert!(route.is_full_path());
		assert!(!route.is_partial_path());
		assert_eq!(&vec![source, target], route.get_points());
	}
	#[test]
	fn scenario_8x8_corner_to_corner() {
		let layer = unit_grid_layer();
		let source = Vec3::new(0.5, 0.0, 0.5);
		let target = Vec3::new(7.5, 0.0, 7.5);
		let route = run(&layer, source, target, SearchMode::Heuristic);
		assert!(route.is_full_path());
		assert!(!route.is_partial_path());
		let points = route.get_points();
		assert_eq!(source, points[0]);
		assert_eq!(target, points[points.len() - 1]);
		// interior waypoints bounded by twice the grid's Chebyshev distance
		assert!(points.len() - 2 <= 2 * 7);
		// cumulative segment distance is monotonically non-decreasing, i.e.
		// no zero-length segments appear along the trace
		for w in points.windows(2) {
			assert!(w[0].distance(w[1]) > 0.0);
		}
	}
	#[test]
	fn completeness_on_connected_grid() {
		let layer = unit_grid_layer();
		for (sx, sz, tx, tz) in [(0, 0, 7, 0), (3, 5, 0, 7), (6, 6, 1, 2)] {
			let source = Vec3::new(sx as f32 + 0.5, 0.0, sz as f32 + 0.5);
			let target = Vec3::new(tx as f32 + 0.5, 0.0, tz as f32 + 0.5);
			let route = run(&layer, source, target, SearchMode::Heuristic);
			assert!(route.is_full_path(), "no path {:?} -> {:?}", source, target);
		}
	}
	#[test]
	fn partial_path_anchors_at_min_heuristic_node() {
		let layer = walled_layer();
		// west of the wall pathing east across it
		let source = Vec3::new(0.5, 0.0, 0.5);
		let target = Vec3::new(7.0, 0.0, 7.0);
		let route = run(&layer, source, target, SearchMode::Heuristic);
		assert!(!route.is_full_path());
		assert!(route.is_partial_path());
		// the south-western node sits closest to the unreachable target so
		// its centre becomes the effective target
		let expected = layer.get_node(1).get_centre();
		assert_eq!(
			Vec3::new(expected.x, 0.0, expected.y),
			route.get_target()
		);
	}
	#[test]
	fn neither_flag_when_no_progress_possible() {
		let layer = walled_layer();
		// source node is walled in on its east side and the only other
		// passable western node sits further from the target than the source
		let source = Vec3::new(1.5, 0.0, 6.0);
		let target = Vec3::new(7.0, 0.0, 7.9);
		let route = run(&layer, source, target, SearchMode::Heuristic);
		// a partial route exists (the northern neighbour was expanded) only
		// if it improves the heuristic, which moving north does not
		assert!(!route.is_full_path());
		assert!(!route.is_partial_path());
		assert_eq!(2, route.get_points().len());
	}
	#[test]
	fn heuristic_mode_stays_near_optimal() {
		let layer = unit_grid_layer();
		let source = Vec3::new(0.5, 0.0, 3.5);
		let target = Vec3::new(7.5, 0.0, 4.5);
		let heuristic = run(&layer, source, target, SearchMode::Heuristic);
		let uniform = run(&layer, source, target, SearchMode::UniformCost);
		assert!(heuristic.is_full_path());
		assert!(uniform.is_full_path());
		// on a uniform-cost grid the heuristic never overestimates, so the
		// returned route cost stays within a small tolerance of optimal
		let h_length = total_length(heuristic.get_points());
		let u_length = total_length(uniform.get_points());
		assert!(
			h_length <= u_length * 1.05 + f32::EPSILON,
			"heuristic {} vs uniform {}",
			h_length,
			u_length
		);
	}
	#[test]
	fn degraded_goal_substitutes_nearest_passable() {
		let layer = walled_layer();
		let source = Vec3::new(0.5, 0.0, 0.5);
		// the literal target sits inside the wall
		let target = Vec3::new(4.0, 0.0, 1.0);
		let route = run(&layer, source, target, SearchMode::Heuristic);
		assert!(route.is_degraded_goal());
		// the search reached the substituted goal yet the full-path flag is
		// suppressed so callers do not drive agents at the literal target
		assert!(!route.is_full_path());
	}
	#[test]
	fn smoothing_never_lengthens_and_reaches_fixed_point() {
		let layer = unit_grid_layer();
		let profile = MoveProfile::new(0, 1);
		let mut context = SearchContext::default();
		let source = Vec3::new(0.5, 0.0, 0.5);
		let target = Vec3::new(6.5, 0.0, 3.5);
		let mut search =
			PathSearch::new(&layer, &profile, source, target, SearchMode::Heuristic, false);
		search.bind_context(&mut context);
		assert!(search.execute(&mut context));
		let mut points = search.trace_path(&context);
		let raw_length = total_length(&points);
		// iterate well beyond the production pass cap to reach a fixed point
		let mut passes = 0;
		while search.smooth_pass(&context, &mut points) && passes < 50 {
			passes += 1;
			assert!(total_length(&points) <= raw_length + 1e-3);
		}
		let settled_length = total_length(&points);
		assert!(settled_length <= raw_length + 1e-3);
		// a further pass must not move anything or shorten the route
		assert!(!search.smooth_pass(&context, &mut points));
		assert!((total_length(&points) - settled_length).abs() <= 1e-3);
	}
	/// A `128x64` map of two 64-cell root nodes, large enough for path sharing
	fn shareable_layer() -> NodeLayer {
		let dimensions = MapDimensions::new(128, 64);
		let regions = vec![
			(GridRect::new(0, 0, 64, 64), 1.0),
			(GridRect::new(64, 0, 128, 64), 1.0),
		];
		NodeLayer::from_regions(dimensions, 0, &regions)
	}
	#[test]
	fn sharing_key_stable_within_footprint_quadrant() {
		let layer = shareable_layer();
		let profile = MoveProfile::new(0, 3);
		let target = Vec3::new(100.0, 0.0, 30.0);
		// both sources fall inside the same footprint-normalised quadrant
		// (footprint 3 rounds up to a 4-cell bucket)
		let a = PathSearch::new(
			&layer,
			&profile,
			Vec3::new(1.0, 0.0, 1.0),
			target,
			SearchMode::Heuristic,
			false,
		);
		let b = PathSearch::new(
			&layer,
			&profile,
			Vec3::new(2.5, 0.0, 3.0),
			target,
			SearchMode::Heuristic,
			false,
		);
		assert!(a.get_sharing_key().is_some());
		assert_eq!(a.get_sharing_key(), b.get_sharing_key());
		// a source in a different quadrant derives a different key
		let c = PathSearch::new(
			&layer,
			&profile,
			Vec3::new(5.0, 0.0, 5.0),
			target,
			SearchMode::Heuristic,
			false,
		);
		assert_ne!(a.get_sharing_key(), c.get_sharing_key());
	}
	#[test]
	fn sharing_key_sentinels() {
		let layer = shareable_layer();
		let target = Vec3::new(100.0, 0.0, 30.0);
		// raw-probe requests are never shared
		let profile = MoveProfile::new(0, 3);
		let raw = PathSearch::new(
			&layer,
			&profile,
			Vec3::new(1.0, 0.0, 1.0),
			target,
			SearchMode::Heuristic,
			true,
		);
		assert_eq!(None, raw.get_sharing_key());
		// a footprint bucket beyond the shareable maximum is never shared
		let oversized = MoveProfile::new(0, 17);
		let big = PathSearch::new(
			&layer,
			&oversized,
			Vec3::new(1.0, 0.0, 1.0),
			target,
			SearchMode::Heuristic,
			false,
		);
		assert_eq!(None, big.get_sharing_key());
		// sources in nodes below the minimum shareable size are never shared
		let small = unit_grid_layer();
		let tiny = PathSearch::new(
			&small,
			&profile,
			Vec3::new(1.0, 0.0, 1.0),
			Vec3::new(7.0, 0.0, 7.0),
			SearchMode::Heuristic,
			false,
		);
		assert_eq!(None, tiny.get_sharing_key());
	}
	#[test]
	fn stale_queue_entries_are_discarded_without_expansion() {
		let layer = unit_grid_layer();
		let profile = MoveProfile::new(0, 1);
		let mut context = SearchContext::default();
		let source = Vec3::new(0.5, 0.0, 0.5);
		let target = Vec3::new(7.5, 0.0, 7.5);
		let mut search =
			PathSearch::new(&layer, &profile, source, target, SearchMode::Heuristic, false);
		search.bind_context(&mut context);
		// relax a node as if a cheap re-push had superseded an earlier,
		// costlier entry still sitting in the queue
		let node = layer.get_node_index_at_cell(1, 1);
		let slot = context.records.insert(node);
		let record = context.records.record_at_mut(slot);
		record.g_cost = 2.0;
		record.h_cost = 1.0;
		record.crossing = Vec2::new(1.0, 1.0);
		record.priority = 3.0;
		// popping the superseded entry discards it: nothing is queued, no
		// neighbour is relaxed and the record keeps the cheaper push's costs
		let stale = QueueEntry::new(node, 5.0);
		assert!(!search.iterate_node(&mut context, stale));
		assert!(context.open_list.is_empty());
		let east = layer.get_node_index_at_cell(2, 1);
		assert!(!context.records.is_set(east));
		assert_eq!(2.0, context.records.get(node).g_cost);
		assert_eq!(3.0, context.records.get(node).priority);
		// popping the live entry expands the node
		let live = QueueEntry::new(node, 3.0);
		assert!(!search.iterate_node(&mut context, live));
		assert!(!context.open_list.is_empty());
		assert!(context.records.is_set(east));
		assert!(context.records.get(east).g_cost < f32::INFINITY);
	}
	#[test]
	fn sharing_key_rejects_non_square_source_nodes() {
		// a single root node spanning the whole map, wider than it is deep
		let dimensions = MapDimensions::new(128, 64);
		let regions = vec![(GridRect::new(0, 0, 128, 64), 1.0)];
		let layer = NodeLayer::from_regions(dimensions, 0, &regions);
		let profile = MoveProfile::new(0, 3);
		let search = PathSearch::new(
			&layer,
			&profile,
			Vec3::new(80.0, 0.0, 30.0),
			Vec3::new(10.0, 0.0, 10.0),
			SearchMode::Heuristic,
			false,
		);
		assert_eq!(None, search.get_sharing_key());
	}
	#[test]
	fn raw_probe_skips_node_walk() {
		let layer = walled_layer();
		let profile = MoveProfile::new(0, 1);
		let mut context = SearchContext::default();
		// blocked by the wall
		let mut search = PathSearch::new(
			&layer,
			&profile,
			Vec3::new(0.5, 0.0, 4.0),
			Vec3::new(7.5, 0.0, 4.0),
			SearchMode::Heuristic,
			true,
		);
		search.bind_context(&mut context);
		assert!(!search.execute(&mut context));
		let route = search.finalize(&context);
		assert!(!route.is_full_path());
		assert!(!route.is_partial_path());
		assert_eq!(2, route.get_points().len());
		// clear line within the western ground
		let mut search = PathSearch::new(
			&layer,
			&profile,
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(2.5, 0.0, 7.5),
			SearchMode::Heuristic,
			true,
		);
		search.bind_context(&mut context);
		assert!(search.execute(&mut context));
		assert!(search.has_full_path());
	}
}
