//! Useful structures and tools used by the layers and the search
//!

use bevy::prelude::*;

/// Number of candidate crossing points evaluated along the edge between two
/// adjacent nodes. More points reduce the non-cardinality of raw routes (at a
/// cost), a single point degenerates to the edge midpoint
pub const CROSSING_POINTS_PER_EDGE: usize = 2;
/// Large finite movement cost substituted for a fully impassable node so that
/// a search starting inside a blocked region can still find its way out
pub const CLOSED_NODE_COST: f32 = 65536.0;
/// Minimum source node size (in cells) for a request to be eligible for path sharing
pub const SHARE_PATH_MIN_SIZE: u32 = 64;
/// Maximum footprint bucket (in cells) for a request to be eligible for path sharing
pub const SHARE_PATH_MAX_SIZE: u32 = 16;
/// Upper bound on smoothing passes over the waypoints of a traced route
pub const MAX_SMOOTHING_PASSES: usize = 2;
/// Cosine similarity between adjacent route segments above which they are
/// treated as parallel and no smoothing adjustment is attempted
pub const SMOOTHING_PARALLEL_CUTOFF: f32 = 0.995;
/// Squared distance a waypoint must move during a smoothing pass for the pass
/// to count as having changed the route
pub const SMOOTHING_MOVED_SQ_EPSILON: f32 = 0.05 * 0.05;

/// An axis aligned rectangle of grid cells, min corner inclusive, max corner exclusive
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct GridRect {
	/// Western (min) cell column
	pub x1: u32,
	/// Northern (min) cell row
	pub z1: u32,
	/// One past the eastern (max) cell column
	pub x2: u32,
	/// One past the southern (max) cell row
	pub z2: u32,
}

impl GridRect {
	/// Create a new instance of [GridRect]
	pub fn new(x1: u32, z1: u32, x2: u32, z2: u32) -> Self {
		if x2 < x1 || z2 < z1 {
			panic!(
				"GridRect corners are inverted, min `({}, {})` exceeds max `({}, {})`",
				x1, z1, x2, z2
			);
		}
		GridRect { x1, z1, x2, z2 }
	}
	/// Width of the rectangle in cells
	pub fn width(&self) -> u32 {
		self.x2 - self.x1
	}
	/// Depth of the rectangle in cells
	pub fn depth(&self) -> u32 {
		self.z2 - self.z1
	}
	/// Number of cells covered
	pub fn area(&self) -> u64 {
		self.width() as u64 * self.depth() as u64
	}
	/// Whether a cell `(column, row)` lies within the rectangle
	pub fn contains_cell(&self, cell: (u32, u32)) -> bool {
		cell.0 >= self.x1 && cell.0 < self.x2 && cell.1 >= self.z1 && cell.1 < self.z2
	}
	/// Shrink the rectangle so it lies within `bounds`
	pub fn clamp_in(&self, bounds: &GridRect) -> GridRect {
		GridRect {
			x1: self.x1.max(bounds.x1).min(bounds.x2),
			z1: self.z1.max(bounds.z1).min(bounds.z2),
			x2: self.x2.min(bounds.x2).max(bounds.x1),
			z2: self.z2.min(bounds.z2).max(bounds.z1),
		}
	}
	/// Grow the rectangle by `margin` cells in every direction, saturating at zero
	pub fn expanded_by(&self, margin: u32) -> GridRect {
		GridRect {
			x1: self.x1.saturating_sub(margin),
			z1: self.z1.saturating_sub(margin),
			x2: self.x2.saturating_add(margin),
			z2: self.z2.saturating_add(margin),
		}
	}
	/// The centre of the rectangle in world space
	pub fn centre(&self) -> Vec2 {
		Vec2::new(
			(self.x1 + self.x2) as f32 * 0.5,
			(self.z1 + self.z2) as f32 * 0.5,
		)
	}
}

/// Fold a quadrant choice into a quad-tree node number. The bits of the layer's
/// root identifier are masked off so they stay stable while the sub-node bits
/// shift up to make room for the chosen quadrant (`0..4`, stored one-based so
/// a child is always distinguishable from its parent)
pub fn child_node_number(node_number: u32, quadrant: u32, root_mask: u32) -> u32 {
	let root_id = root_mask & node_number;
	let node_id = !root_mask & node_number;
	root_id | ((node_id << 2) + (quadrant + 1))
}

/// Using the Bresenham line algorithm get a list of cells that lie along a line between two map cells
pub fn cells_between_points(source: (u32, u32), target: (u32, u32)) -> Vec<(u32, u32)> {
	let source_col = source.0 as i64;
	let source_row = source.1 as i64;
	let target_col = target.0 as i64;
	let target_row = target.1 as i64;

	// optimise for orthognal line (horizontal or vertical)
	if source_col == target_col {
		let mut cells = Vec::new();
		if source_row < target_row {
			for row in source_row..=target_row {
				cells.push((source_col as u32, row as u32));
			}
			cells
		} else {
			for row in target_row..=source_row {
				cells.push((source_col as u32, row as u32));
			}
			cells.reverse();
			cells
		}
	} else if source_row == target_row {
		let mut cells = Vec::new();
		if source_col < target_col {
			for col in source_col..=target_col {
				cells.push((col as u32, source_row as u32));
			}
			cells
		} else {
			for col in target_col..=source_col {
				cells.push((col as u32, source_row as u32));
			}
			cells.reverse();
			cells
		}
	} else if (target_row - source_row).abs() < (target_col - source_col).abs() {
		if source_col > target_col {
			let mut cells = walk_bresenham_shallow(target_col, target_row, source_col, source_row);
			// ensure list points in the direction of source to target
			cells.reverse();
			cells
		} else {
			walk_bresenham_shallow(source_col, source_row, target_col, target_row)
		}
	} else if source_row > target_row {
		let mut cells = walk_bresenham_steep(target_col, target_row, source_col, source_row);
		cells.reverse();
		cells
	} else {
		walk_bresenham_steep(source_col, source_row, target_col, target_row)
	}
}

/// When finding a shallow raster representation of a line we step through the x-dimension and increment y based on an error bound which indicates which cells lie on the line
fn walk_bresenham_shallow(col_0: i64, row_0: i64, col_1: i64, row_1: i64) -> Vec<(u32, u32)> {
	let mut cells = Vec::new();

	let delta_col = col_1 - col_0;
	let mut delta_row = row_1 - row_0;

	let mut row_increment = 1;
	if delta_row < 0 {
		row_increment = -1;
		delta_row *= -1;
	}
	let mut difference = 2 * delta_row - delta_col;
	let mut row = row_0;

	for col in col_0..=col_1 {
		cells.push((col as u32, row as u32));
		if difference > 0 {
			row += row_increment;
			difference += 2 * (delta_row - delta_col);
		} else {
			difference += 2 * delta_row;
		}
	}
	cells
}
/// When finding a steep raster representation of a line we step through the y-dimension and increment x based on an error bound which indicates which cells lie on the line
fn walk_bresenham_steep(col_0: i64, row_0: i64, col_1: i64, row_1: i64) -> Vec<(u32, u32)> {
	let mut cells = Vec::new();

	let mut delta_col = col_1 - col_0;
	let delta_row = row_1 - row_0;

	let mut col_increment = 1;
	if delta_col < 0 {
		col_increment = -1;
		delta_col *= -1;
	}
	let mut difference = 2 * delta_col - delta_row;
	let mut col = col_0;

	for row in row_0..=row_1 {
		cells.push((col as u32, row as u32));
		if difference > 0 {
			col += col_increment;
			difference += 2 * (delta_col - delta_row);
		} else {
			difference += 2 * delta_col;
		}
	}
	cells
}
