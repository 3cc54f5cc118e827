//! Movement-classes describe the agents requesting routes - their footprint
//! size selects the [NodeLayer] decomposition they path against and bounds
//! which requests may share one computed route
//!

use crate::prelude::*;
use bevy::prelude::*;

/// The pathing properties of one category of agent
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, Default, Reflect)]
pub struct MoveProfile {
	/// The movement-class layer agents of this profile path against
	layer: u32,
	/// Footprint of an agent measured in cells
	footprint: u32,
}

impl MoveProfile {
	/// Create a new instance of [MoveProfile]
	pub fn new(layer: u32, footprint: u32) -> Self {
		if footprint == 0 {
			panic!("A MoveProfile footprint cannot be zero cells");
		}
		MoveProfile { layer, footprint }
	}
	/// Get the movement-class layer of the profile
	pub fn get_layer(&self) -> u32 {
		self.layer
	}
	/// Get the footprint in cells
	pub fn get_footprint(&self) -> u32 {
		self.footprint
	}
	/// Test whether the straight line between two world positions only
	/// touches passable nodes. This is a cheap substitute for a graph search
	/// on short or simple requests where the node walk is not worth its
	/// overhead
	pub fn is_line_traversable(&self, layer: &NodeLayer, source: Vec3, target: Vec3) -> bool {
		let source_cell = layer.get_dimensions().get_cell_of_point(source);
		let target_cell = layer.get_dimensions().get_cell_of_point(target);
		let cells = cells_between_points(source_cell, target_cell);
		for (column, row) in cells {
			let index = layer.get_node_index_at_cell(column, row);
			if layer.get_node(index).is_impassable() {
				return false;
			}
		}
		true
	}
}

/// Registry of the [MoveProfile]s agents may request routes under
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Component, Clone, Default)]
pub struct MoveProfiles {
	/// One profile per movement-class, ordered by layer index
	profiles: Vec<MoveProfile>,
}

impl MoveProfiles {
	/// Create a new instance of [MoveProfiles]
	pub fn new(profiles: Vec<MoveProfile>) -> Self {
		for (i, profile) in profiles.iter().enumerate() {
			if profile.get_layer() != i as u32 {
				panic!(
					"Profile at position {} reports layer {}, profiles must be ordered by layer",
					i,
					profile.get_layer()
				);
			}
		}
		MoveProfiles { profiles }
	}
	/// Get the [MoveProfile] of a movement-class
	pub fn get_profile(&self, layer: u32) -> &MoveProfile {
		if layer as usize >= self.profiles.len() {
			panic!(
				"No MoveProfile exists for movement-class layer {}, only {} profiles are registered",
				layer,
				self.profiles.len()
			);
		}
		&self.profiles[layer as usize]
	}
	/// Get all profiles
	pub fn get(&self) -> &Vec<MoveProfile> {
		&self.profiles
	}
}
