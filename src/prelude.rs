//! `use bevy_quadtree_paths_plugin::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::quadpaths::{
	layer::*,
	movement::*,
	route::*,
	search::{path_search::*, scratch::*, *},
	utilities::*,
	*,
};

#[doc(hidden)]
pub use crate::{
	bundle::*,
	plugin::{route_layer::*, *},
};
