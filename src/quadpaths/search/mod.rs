//! The search engine - a per-request state machine expanding the node graph
//! of a [crate::prelude::NodeLayer] against reusable per-worker scratch
//! storage
//!

pub mod path_search;
pub mod scratch;

/// How the open list of a search orders its nodes
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchMode {
	/// Order by accumulated cost plus an admissible estimate of the remaining
	/// cost. The estimate assumes the rest of the route covers only the
	/// fastest terrain found anywhere in the layer, so it never overestimates
	/// but is loose over slower ground
	#[default]
	Heuristic,
	/// Order by accumulated cost alone, exploring evenly in every direction
	UniformCost,
}
