//! This is a plugin for Bevy game engine to compute routes for crowds of agents over a quad-tree decomposition of the world
//!

pub mod quadpaths;
pub mod bundle;
pub mod plugin;

pub mod prelude;
