//! Quad-tree path searching is a means of handling pathfinding for a crowd of actors.
//!
//! A map is decomposed per movement-class into a layer of rectangular nodes. Large open
//! areas are covered by a handful of big nodes while cluttered areas shatter into small
//! ones, so a search visits far fewer elements than a uniform grid would. Each node
//! stores an average movement cost (the reciprocal of the average speed modifier of the
//! terrain it covers), its neighbours and a set of candidate crossing points along each
//! shared edge.
//!
//! Definitions:
//!
//! * Node - a rectangular cell of a movement-class layer, impassable or weighted by terrain speed
//! * Crossing point - a coordinate on the shared edge between two adjacent nodes, used as a route waypoint
//! * Layer - a full decomposition of the map specialised for one category of agent footprint/speed
//! * Route - the ordered waypoints delivered to steering, flagged as a full or partial path
//! * Sharing key - a coarse 64-bit identifier letting many similar requests reuse one computed route
//!
//! A route request runs one synchronous search against a reusable per-worker scratch
//! context, traces the predecessor chain back into waypoints and straightens them with a
//! small number of smoothing passes.
//!

pub mod layer;
pub mod movement;
pub mod route;
pub mod search;
pub mod utilities;
