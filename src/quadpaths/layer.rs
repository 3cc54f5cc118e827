//! A map is decomposed per movement-class into a layer of rectangular leaf
//! nodes which the search walks instead of individual cells
//!
//! An example layer over a `16x16` cell map may look like:
//!
//! ```text
//!  _______________________
//! |     |     |           |
//! |     |     |           |
//! |_____|_____|           |
//! |     |     |           |
//! |     |     |           |
//! |_____|_____|___________|
//! |           |     |     |
//! |           |     |     |
//! |           |_____|_____|
//! |           |     |     |
//! |           |     |xxxxx|
//! |___________|_____|_____|
//! ```
//!
//! Where `x` marks an impassable node. Each node records the average movement
//! cost of the terrain it covers (the reciprocal of the average speed
//! modifier, `0` speed meaning impassable) and for every neighbouring node a
//! set of candidate crossing points spaced along the shared edge. The
//! construction and incremental mutation of the decomposition itself is the
//! responsibility of the host - a layer is treated as a read-only snapshot
//! while searches run against it
//!

use crate::prelude::*;
use bevy::prelude::*;

/// The dimensions of the world measured in cells, where a cell is a `1x1`
/// unit area of world space (for 3d the recommendation is for a `unit` of
/// space to be 1 meter, for 2d a pixel)
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Component, Default, Clone, Copy, Reflect)]
pub struct MapDimensions {
	/// Dimensions of the world as `(x, z)` in 3d or `(x, y)` in 2d
	size: (u32, u32),
}

impl MapDimensions {
	/// Create a new instance of [MapDimensions]
	pub fn new(length: u32, depth: u32) -> Self {
		if length == 0 || depth == 0 {
			panic!(
				"Map dimensions `({}, {})` are degenerate, length and depth must be non-zero",
				length, depth
			);
		}
		MapDimensions {
			size: (length, depth),
		}
	}
	/// Number of `x` units in size
	pub fn get_length(&self) -> u32 {
		self.size.0
	}
	/// 2d: number of `y` units in size
	///
	/// 3d: number of `z` units in size
	pub fn get_depth(&self) -> u32 {
		self.size.1
	}
	/// Number of cells covering the map
	pub fn get_area(&self) -> u64 {
		self.size.0 as u64 * self.size.1 as u64
	}
	/// The whole map as a [GridRect]
	pub fn as_rect(&self) -> GridRect {
		GridRect::new(0, 0, self.size.0, self.size.1)
	}
	/// Clamp a world position so it lies within the map
	pub fn clamp_point(&self, point: Vec3) -> Vec3 {
		Vec3::new(
			point.x.clamp(0.0, self.size.0 as f32),
			point.y,
			point.z.clamp(0.0, self.size.1 as f32),
		)
	}
	/// The `(column, row)` of the cell containing a world position
	pub fn get_cell_of_point(&self, point: Vec3) -> (u32, u32) {
		let column = (point.x.max(0.0) as u32).min(self.size.0 - 1);
		let row = (point.z.max(0.0) as u32).min(self.size.1 - 1);
		(column, row)
	}
}

/// How two adjacent nodes touch one another, used to establish the axis a
/// waypoint may slide along during route smoothing
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeShared {
	/// The nodes sit above/below one another, the shared edge runs along `x`
	Horizontal,
	/// The nodes sit beside one another, the shared edge runs along `z`
	Vertical,
	/// The nodes touch only at a single corner vertex
	Corner,
}

/// A rectangular cell of a [NodeLayer], immutable for the duration of any
/// search reading the layer
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug)]
pub struct QuadNode {
	/// Quad-tree numbering of this node, the layer's root bits are held under
	/// [NodeLayer::get_root_mask] while the remaining bits describe the
	/// quadrant choices descending from that root
	node_number: u32,
	/// Cell extents of the node
	bounds: GridRect,
	/// Average cost of traversing the node, the reciprocal of the average
	/// speed modifier of the terrain covered
	move_cost: f32,
	/// Whether every cell of the node is blocked
	impassable: bool,
	/// Indices of nodes sharing an edge or corner with this node
	neighbours: Vec<u32>,
	/// Candidate crossing points, [CROSSING_POINTS_PER_EDGE] per neighbour,
	/// flattened in neighbour order
	crossing_points: Vec<Vec2>,
}

impl QuadNode {
	/// Create a new unlinked instance of [QuadNode] from the speed modifier
	/// of the terrain it covers
	fn new(node_number: u32, bounds: GridRect, speed_modifier: f32) -> Self {
		let impassable = speed_modifier <= 0.0;
		let move_cost = if impassable {
			CLOSED_NODE_COST
		} else {
			1.0 / speed_modifier
		};
		QuadNode {
			node_number,
			bounds,
			move_cost,
			impassable,
			neighbours: Vec::new(),
			crossing_points: Vec::new(),
		}
	}
	/// Get the quad-tree numbering of the node
	pub fn get_node_number(&self) -> u32 {
		self.node_number
	}
	/// Get the cell extents of the node
	pub fn get_bounds(&self) -> &GridRect {
		&self.bounds
	}
	/// Get the average cost of traversing the node
	pub fn get_move_cost(&self) -> f32 {
		self.move_cost
	}
	/// Whether every cell of the node is blocked
	pub fn is_impassable(&self) -> bool {
		self.impassable
	}
	/// Get the indices of nodes sharing an edge or corner with this node
	pub fn get_neighbours(&self) -> &Vec<u32> {
		&self.neighbours
	}
	/// Get a candidate crossing point on the edge shared with a neighbour,
	/// where `neighbour` is a position in [QuadNode::get_neighbours] and
	/// `candidate` is in `0..CROSSING_POINTS_PER_EDGE`
	pub fn get_crossing_point(&self, neighbour: usize, candidate: usize) -> Vec2 {
		self.crossing_points[neighbour * CROSSING_POINTS_PER_EDGE + candidate]
	}
	/// The centre of the node in world space
	pub fn get_centre(&self) -> Vec2 {
		self.bounds.centre()
	}
	/// How this node touches `other`, [None] when they are not adjacent
	pub fn neighbour_relation(&self, other: &QuadNode) -> Option<EdgeShared> {
		let a = &self.bounds;
		let b = &other.bounds;
		let x_touch = a.x2 == b.x1 || b.x2 == a.x1;
		let z_touch = a.z2 == b.z1 || b.z2 == a.z1;
		let x_overlap = a.x2.min(b.x2) as i64 - a.x1.max(b.x1) as i64;
		let z_overlap = a.z2.min(b.z2) as i64 - a.z1.max(b.z1) as i64;
		if x_touch && z_overlap > 0 {
			Some(EdgeShared::Vertical)
		} else if z_touch && x_overlap > 0 {
			Some(EdgeShared::Horizontal)
		} else if x_touch && z_touch && x_overlap == 0 && z_overlap == 0 {
			Some(EdgeShared::Corner)
		} else {
			None
		}
	}
}

/// One movement-class decomposition of the map. The search reads nodes by
/// index, looks leaf nodes up by cell and queries the layer aggregates
/// recorded at build time
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone)]
pub struct NodeLayer {
	/// Which movement-class this layer decomposes the map for
	layer_index: u32,
	/// The dimensions of the world the layer covers
	dimensions: MapDimensions,
	/// Mask selecting the root identifier bits of every node number in the layer
	root_mask: u32,
	/// The greatest relative speed modifier attainable anywhere in the layer,
	/// used to keep the search heuristic admissible
	max_speed_modifier: f32,
	/// The leaf nodes of the layer
	nodes: Vec<QuadNode>,
	/// Maps every cell (row-major) to the index of the leaf node covering it
	cell_lookup: Vec<u32>,
}

/// Mask selecting the root identifier bits of node numbers produced by
/// [NodeLayer::from_regions], which places every supplied region as a root
const REGION_ROOT_MASK: u32 = 0xFFFF_0000;

impl NodeLayer {
	/// Create a new instance of [NodeLayer] from an exact tiling of the map,
	/// each region becoming a root leaf node weighted by the average speed
	/// modifier of the terrain it covers (`0.0` meaning impassable). Panics if
	/// the regions overlap, leave cells uncovered or the whole layer is
	/// impassable
	pub fn from_regions(
		dimensions: MapDimensions,
		layer_index: u32,
		regions: &[(GridRect, f32)],
	) -> Self {
		if regions.is_empty() {
			panic!("Cannot build a NodeLayer from zero regions");
		}
		if regions.len() > (REGION_ROOT_MASK >> 16) as usize + 1 {
			panic!(
				"Cannot build a NodeLayer from {} regions, root numbering supports at most 65536",
				regions.len()
			);
		}
		let map_rect = dimensions.as_rect();
		// place every region as a root node and index the cells it covers
		let mut nodes = Vec::with_capacity(regions.len());
		let mut cell_lookup = vec![u32::MAX; dimensions.get_area() as usize];
		let mut max_speed_modifier = 0.0_f32;
		for (i, (bounds, speed_modifier)) in regions.iter().enumerate() {
			if bounds.clamp_in(&map_rect) != *bounds || bounds.area() == 0 {
				panic!("Region {:?} does not fit within the map", bounds);
			}
			for z in bounds.z1..bounds.z2 {
				for x in bounds.x1..bounds.x2 {
					let cell = (z * dimensions.get_length() + x) as usize;
					if cell_lookup[cell] != u32::MAX {
						panic!("Regions overlap at cell `({}, {})`", x, z);
					}
					cell_lookup[cell] = i as u32;
				}
			}
			max_speed_modifier = max_speed_modifier.max(*speed_modifier);
			nodes.push(QuadNode::new(
				(i as u32) << 16,
				*bounds,
				*speed_modifier,
			));
		}
		if cell_lookup.contains(&u32::MAX) {
			panic!("Regions do not tile the map, some cells are uncovered");
		}
		if max_speed_modifier <= 0.0 {
			panic!("Layer {} has no passable terrain", layer_index);
		}
		let mut layer = NodeLayer {
			layer_index,
			dimensions,
			root_mask: REGION_ROOT_MASK,
			max_speed_modifier,
			nodes,
			cell_lookup,
		};
		layer.link_neighbours();
		layer
	}
	/// Discover which nodes share an edge or corner and record the candidate
	/// crossing points along each shared span
	fn link_neighbours(&mut self) {
		let length = self.dimensions.get_length();
		let depth = self.dimensions.get_depth();
		// walking only the eastern and southern boundaries (plus their corner
		// vertices) of every node visits each adjacency exactly once
		let mut pairs: Vec<(u32, u32)> = Vec::new();
		for (i, node) in self.nodes.iter().enumerate() {
			let b = node.bounds;
			let mut found: Vec<u32> = Vec::new();
			if b.x2 < length {
				for z in b.z1..b.z2 {
					found.push(self.get_node_index_at_cell(b.x2, z));
				}
				if b.z1 > 0 {
					found.push(self.get_node_index_at_cell(b.x2, b.z1 - 1));
				}
				if b.z2 < depth {
					found.push(self.get_node_index_at_cell(b.x2, b.z2));
				}
			}
			if b.z2 < depth {
				for x in b.x1..b.x2 {
					found.push(self.get_node_index_at_cell(x, b.z2));
				}
				if b.x1 > 0 {
					found.push(self.get_node_index_at_cell(b.x1 - 1, b.z2));
				}
			}
			found.sort_unstable();
			found.dedup();
			for other in found {
				pairs.push((i as u32, other));
			}
		}
		for (a, b) in pairs {
			let points = self.crossing_points_between(a, b);
			self.nodes[a as usize].neighbours.push(b);
			self.nodes[a as usize].crossing_points.extend(&points);
			self.nodes[b as usize].neighbours.push(a);
			self.nodes[b as usize].crossing_points.extend(&points);
		}
	}
	/// Candidate crossing points spaced along the span shared by two adjacent
	/// nodes - for a corner adjacency every candidate is the corner vertex
	fn crossing_points_between(&self, a: u32, b: u32) -> Vec<Vec2> {
		let node_a = &self.nodes[a as usize];
		let node_b = &self.nodes[b as usize];
		let ba = &node_a.bounds;
		let bb = &node_b.bounds;
		let relation = match node_a.neighbour_relation(node_b) {
			Some(relation) => relation,
			None => panic!(
				"Nodes {} and {} are not adjacent, the layer adjacency wiring is corrupt",
				a, b
			),
		};
		let mut points = Vec::with_capacity(CROSSING_POINTS_PER_EDGE);
		match relation {
			EdgeShared::Vertical => {
				let x = if ba.x2 == bb.x1 { ba.x2 } else { ba.x1 } as f32;
				let lo = ba.z1.max(bb.z1) as f32;
				let hi = ba.z2.min(bb.z2) as f32;
				for j in 0..CROSSING_POINTS_PER_EDGE {
					let t = (j + 1) as f32 / (CROSSING_POINTS_PER_EDGE + 1) as f32;
					points.push(Vec2::new(x, lo + (hi - lo) * t));
				}
			}
			EdgeShared::Horizontal => {
				let z = if ba.z2 == bb.z1 { ba.z2 } else { ba.z1 } as f32;
				let lo = ba.x1.max(bb.x1) as f32;
				let hi = ba.x2.min(bb.x2) as f32;
				for j in 0..CROSSING_POINTS_PER_EDGE {
					let t = (j + 1) as f32 / (CROSSING_POINTS_PER_EDGE + 1) as f32;
					points.push(Vec2::new(lo + (hi - lo) * t, z));
				}
			}
			EdgeShared::Corner => {
				let x = if ba.x2 == bb.x1 { ba.x2 } else { ba.x1 } as f32;
				let z = if ba.z2 == bb.z1 { ba.z2 } else { ba.z1 } as f32;
				for _ in 0..CROSSING_POINTS_PER_EDGE {
					points.push(Vec2::new(x, z));
				}
			}
		}
		points
	}
	/// Which movement-class this layer decomposes the map for
	pub fn get_layer(&self) -> u32 {
		self.layer_index
	}
	/// Get the dimensions of the world the layer covers
	pub fn get_dimensions(&self) -> &MapDimensions {
		&self.dimensions
	}
	/// Get the mask selecting the root identifier bits of every node number
	pub fn get_root_mask(&self) -> u32 {
		self.root_mask
	}
	/// The greatest relative speed modifier attainable anywhere in the layer
	pub fn get_max_speed_modifier(&self) -> f32 {
		self.max_speed_modifier
	}
	/// Total number of nodes allocated in the layer
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}
	/// Number of leaf nodes in the layer
	pub fn leaf_count(&self) -> usize {
		self.nodes.len()
	}
	/// Get a node by its index
	pub fn get_node(&self, index: u32) -> &QuadNode {
		if index as usize >= self.nodes.len() {
			panic!(
				"Cannot get node {}, layer {} only holds {} nodes",
				index,
				self.layer_index,
				self.nodes.len()
			);
		}
		&self.nodes[index as usize]
	}
	/// Get the index of the leaf node covering a cell
	pub fn get_node_index_at_cell(&self, column: u32, row: u32) -> u32 {
		if column >= self.dimensions.get_length() || row >= self.dimensions.get_depth() {
			panic!(
				"Cannot get a node, cell `({}, {})` is out of bounds of map `({}, {})`",
				column,
				row,
				self.dimensions.get_length(),
				self.dimensions.get_depth()
			);
		}
		self.cell_lookup[(row * self.dimensions.get_length() + column) as usize]
	}
	/// Get the index of the leaf node containing a world position
	pub fn get_node_index_at_point(&self, point: Vec3) -> u32 {
		let (column, row) = self.dimensions.get_cell_of_point(point);
		self.get_node_index_at_cell(column, row)
	}
	/// Find the passable node within `area` whose centre sits nearest to the
	/// `anchor` cell, reusing `scratch` to avoid allocation. Returns [None]
	/// when the area holds no passable node
	pub fn nearest_node_in_area(
		&self,
		area: &GridRect,
		anchor: (u32, u32),
		scratch: &mut Vec<u32>,
	) -> Option<u32> {
		let area = area.clamp_in(&self.dimensions.as_rect());
		scratch.clear();
		for row in area.z1..area.z2 {
			for column in area.x1..area.x2 {
				let index = self.get_node_index_at_cell(column, row);
				if !scratch.contains(&index) {
					scratch.push(index);
				}
			}
		}
		let anchor = Vec2::new(anchor.0 as f32 + 0.5, anchor.1 as f32 + 0.5);
		let mut best: Option<(u32, f32)> = None;
		for &index in scratch.iter() {
			let node = &self.nodes[index as usize];
			if node.impassable {
				continue;
			}
			let distance = node.get_centre().distance_squared(anchor);
			if best.is_none_or(|(_, d)| distance < d) {
				best = Some((index, distance));
			}
		}
		best.map(|(index, _)| index)
	}
}

/// The per movement-class [NodeLayer]s of a map, ordered by layer index
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Component, Clone)]
pub struct NodeLayers {
	/// One layer per movement-class
	layers: Vec<NodeLayer>,
}

impl NodeLayers {
	/// Create a new instance of [NodeLayers]
	pub fn new(layers: Vec<NodeLayer>) -> Self {
		for (i, layer) in layers.iter().enumerate() {
			if layer.get_layer() != i as u32 {
				panic!(
					"Layer at position {} reports layer index {}, layers must be ordered by index",
					i,
					layer.get_layer()
				);
			}
		}
		NodeLayers { layers }
	}
	/// Get the [NodeLayer] of a movement-class
	pub fn get_layer(&self, layer: u32) -> &NodeLayer {
		if layer as usize >= self.layers.len() {
			panic!(
				"No NodeLayer exists for movement-class layer {}, only {} layers are registered",
				layer,
				self.layers.len()
			);
		}
		&self.layers[layer as usize]
	}
	/// Get all layers
	pub fn get(&self) -> &Vec<NodeLayer> {
		&self.layers
	}
	/// From a `ron` file generate the [NodeLayers]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: String) -> Self {
		let file = std::fs::File::open(path).expect("Failed opening NodeLayers file");
		let layers: NodeLayers = match ron::de::from_reader(file) {
			Ok(layers) => layers,
			Err(e) => panic!("Failed deserializing NodeLayers: {}", e),
		};
		layers
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	/// An `8x8` map tiled by four `4x4` nodes where the south-east node is impassable
	fn quartered_layer() -> NodeLayer {
		let dimensions = MapDimensions::new(8, 8);
		let regions = vec![
			(GridRect::new(0, 0, 4, 4), 1.0),
			(GridRect::new(4, 0, 8, 4), 0.5),
			(GridRect::new(0, 4, 4, 8), 1.0),
			(GridRect::new(4, 4, 8, 8), 0.0),
		];
		NodeLayer::from_regions(dimensions, 0, &regions)
	}
	#[test]
	fn cell_lookup_resolves_regions() {
		let layer = quartered_layer();
		assert_eq!(0, layer.get_node_index_at_cell(0, 0));
		assert_eq!(1, layer.get_node_index_at_cell(7, 3));
		assert_eq!(2, layer.get_node_index_at_cell(3, 6));
		assert_eq!(3, layer.get_node_index_at_cell(5, 5));
	}
	#[test]
	fn neighbours_are_mutual() {
		let layer = quartered_layer();
		for i in 0..layer.node_count() as u32 {
			for &n in layer.get_node(i).get_neighbours() {
				assert!(layer.get_node(n).get_neighbours().contains(&i));
			}
		}
	}
	#[test]
	fn corner_adjacency_detected() {
		let layer = quartered_layer();
		// node 0 (north-west) touches node 3 (south-east) only at `(4, 4)`
		let relation = layer.get_node(0).neighbour_relation(layer.get_node(3));
		assert_eq!(Some(EdgeShared::Corner), relation);
		let i = layer
			.get_node(0)
			.get_neighbours()
			.iter()
			.position(|&n| n == 3)
			.unwrap();
		assert_eq!(Vec2::new(4.0, 4.0), layer.get_node(0).get_crossing_point(i, 0));
	}
	#[test]
	fn crossing_points_sit_on_shared_edge() {
		let layer = quartered_layer();
		// node 0 and node 1 share the vertical edge `x = 4`, `z` in `[0, 4]`
		let i = layer
			.get_node(0)
			.get_neighbours()
			.iter()
			.position(|&n| n == 1)
			.unwrap();
		for j in 0..CROSSING_POINTS_PER_EDGE {
			let point = layer.get_node(0).get_crossing_point(i, j);
			assert_eq!(4.0, point.x);
			assert!(point.y > 0.0 && point.y < 4.0);
		}
	}
	#[test]
	fn max_speed_modifier_aggregated() {
		let layer = quartered_layer();
		assert_eq!(1.0, layer.get_max_speed_modifier());
	}
	#[test]
	fn nearest_passable_node_skips_blocked() {
		let layer = quartered_layer();
		let mut scratch = Vec::new();
		// anchored inside the impassable south-east node
		let area = GridRect::new(4, 4, 8, 8).expanded_by(2);
		let nearest = layer.nearest_node_in_area(&area, (7, 5), &mut scratch);
		assert_eq!(Some(1), nearest);
	}
	#[test]
	#[should_panic]
	fn rejects_overlapping_regions() {
		let dimensions = MapDimensions::new(4, 4);
		let regions = vec![
			(GridRect::new(0, 0, 4, 4), 1.0),
			(GridRect::new(2, 2, 4, 4), 1.0),
		];
		NodeLayer::from_regions(dimensions, 0, &regions);
	}
	#[test]
	#[should_panic]
	fn rejects_gappy_regions() {
		let dimensions = MapDimensions::new(4, 4);
		let regions = vec![(GridRect::new(0, 0, 4, 2), 1.0)];
		NodeLayer::from_regions(dimensions, 0, &regions);
	}
	#[test]
	fn clamping_points() {
		let dimensions = MapDimensions::new(8, 8);
		let clamped = dimensions.clamp_point(Vec3::new(-3.0, 0.0, 11.0));
		assert_eq!(Vec3::new(0.0, 0.0, 8.0), clamped);
		assert_eq!((0, 7), dimensions.get_cell_of_point(clamped));
	}
}
