//! Reusable per-worker scratch storage. Running thousands of searches per
//! tick cannot afford to allocate bookkeeping per request, so each worker
//! owns one [SearchContext] which is reset (cheaply, without rewriting every
//! slot) between the searches it services
//!

use std::collections::BinaryHeap;

use bevy::prelude::*;

/// The mutable bookkeeping of one node during one search. Records are created
/// lazily on first visit and are only meaningful inside the search that
/// created them - a [NodeRecords::reset] invalidates every record and every
/// predecessor slot reference
#[derive(Clone, Debug)]
pub struct SearchRecord {
	/// Index of the node this record describes
	node: u32,
	/// Best known cost of reaching the node from the source
	pub g_cost: f32,
	/// Estimated cost of reaching the target from the node
	pub h_cost: f32,
	/// Arena slot of the record this node was best reached from, `0` (the
	/// dummy slot) meaning none. A plain index, never an owning reference,
	/// valid only within the search that wrote it
	pub prev_slot: u32,
	/// The crossing point chosen to enter the node, becomes a route waypoint
	/// during trace-back
	pub crossing: Vec2,
	/// The priority this node was last pushed onto the open list under, used
	/// to detect stale queue entries at pop time
	pub priority: f32,
}

impl SearchRecord {
	/// Create a fresh instance of [SearchRecord] for a node, costs start at
	/// infinity so any real relaxation improves on them
	fn new(node: u32) -> Self {
		SearchRecord {
			node,
			g_cost: f32::INFINITY,
			h_cost: f32::INFINITY,
			prev_slot: 0,
			crossing: Vec2::ZERO,
			priority: f32::INFINITY,
		}
	}
	/// Get the index of the node this record describes
	pub fn get_node(&self) -> u32 {
		self.node
	}
}

impl Default for SearchRecord {
	fn default() -> Self {
		SearchRecord::new(u32::MAX)
	}
}

/// A sparse-to-dense associative structure mapping bounded node indices to
/// [SearchRecord]s. A sparse index table (cleared to an unset sentinel on
/// reset) points into a dense arena whose slot `0` holds a permanent dummy
/// record returned for any out-of-domain index. Insertion and lookup are
/// O(1) amortized; only the reset touches the whole index table, which is why
/// resets are batched per search rather than per node
#[derive(Default)]
pub struct NodeRecords {
	/// Maps a node index to its arena slot, `0` meaning unset
	sparse_index: Vec<u32>,
	/// Dense arena of records, slot `0` is the permanent dummy
	records: Vec<SearchRecord>,
}

impl NodeRecords {
	/// Clear the index table back to the unset sentinel and truncate the
	/// arena to the dummy record. O(sparse_size)
	pub fn reset(&mut self, sparse_size: usize) {
		self.sparse_index.clear();
		self.sparse_index.resize(sparse_size, 0);
		self.records.clear();
		self.records.push(SearchRecord::default());
	}
	/// Reserve arena capacity for the number of records a search is expected to touch
	pub fn reserve(&mut self, dense_size: usize) {
		self.records.reserve(dense_size + 1);
	}
	/// Insert a fresh record for a node, overwriting any existing one, and
	/// return its arena slot
	pub fn insert(&mut self, node: u32) -> usize {
		if node as usize >= self.sparse_index.len() {
			return 0;
		}
		let slot = self.sparse_index[node as usize];
		if slot == 0 {
			self.records.push(SearchRecord::new(node));
			let slot = self.records.len() - 1;
			self.sparse_index[node as usize] = slot as u32;
			slot
		} else {
			self.records[slot as usize] = SearchRecord::new(node);
			slot as usize
		}
	}
	/// Insert a fresh record for a node only on first touch and return its arena slot
	pub fn insert_if_absent(&mut self, node: u32) -> usize {
		if node as usize >= self.sparse_index.len() {
			return 0;
		}
		if self.sparse_index[node as usize] == 0 {
			self.insert(node)
		} else {
			self.sparse_index[node as usize] as usize
		}
	}
	/// Whether a node has been visited during the current search
	pub fn is_set(&self, node: u32) -> bool {
		(node as usize) < self.sparse_index.len() && self.sparse_index[node as usize] != 0
	}
	/// Get the arena slot of a node, `0` (the dummy) when unvisited or out-of-domain
	pub fn slot_of(&self, node: u32) -> usize {
		if (node as usize) < self.sparse_index.len() {
			self.sparse_index[node as usize] as usize
		} else {
			0
		}
	}
	/// Get the record held in an arena slot
	pub fn record_at(&self, slot: usize) -> &SearchRecord {
		&self.records[slot]
	}
	/// Get a mutable reference to the record held in an arena slot
	pub fn record_at_mut(&mut self, slot: usize) -> &mut SearchRecord {
		&mut self.records[slot]
	}
	/// Get the record of a node (the dummy when unvisited)
	pub fn get(&self, node: u32) -> &SearchRecord {
		&self.records[self.slot_of(node)]
	}
}

/// An entry of the open list. Entries are never removed or re-prioritised in
/// place - a cheaper re-push supersedes an older entry which is detected as
/// stale (its priority no longer matching the record's) and discarded at pop
/// time
#[derive(Clone, Copy, Debug)]
pub struct QueueEntry {
	/// Priority the node was pushed under (g + h at push time)
	pub priority: f32,
	/// Index of the node
	pub node: u32,
}

impl QueueEntry {
	/// Create a new instance of [QueueEntry]
	pub fn new(node: u32, priority: f32) -> Self {
		QueueEntry { priority, node }
	}
}

impl PartialEq for QueueEntry {
	fn eq(&self, other: &Self) -> bool {
		self.priority.total_cmp(&other.priority).is_eq()
	}
}
impl Eq for QueueEntry {}

impl Ord for QueueEntry {
	// reversed so that a BinaryHeap pops the smallest priority first
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		other.priority.total_cmp(&self.priority)
	}
}

impl PartialOrd for QueueEntry {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

/// The reusable scratch storage of one worker. A context services exactly one
/// search at a time and must never be shared between two concurrently
/// executing searches - allocate one per worker thread (or hold one in a
/// Bevy system `Local`) and reuse it across many searches
#[derive(Default)]
pub struct SearchContext {
	/// Per-node bookkeeping of the search currently being serviced
	pub(crate) records: NodeRecords,
	/// The open list, ordered cheapest-first
	pub(crate) open_list: BinaryHeap<QueueEntry>,
	/// Scratch buffer for bounded-area node lookups
	pub(crate) area_scratch: Vec<u32>,
}

impl SearchContext {
	/// Size the index table for a layer's node domain and reserve capacity
	/// for the records and queue entries a search is expected to touch
	pub fn init(&mut self, index_capacity: usize, expected_touched: usize) {
		/// Initial reservation for the bounded-area lookup scratch
		const AREA_SCRATCH_INITIAL_RESERVE: usize = 128;
		self.records.reserve(expected_touched);
		self.records.reset(index_capacity);
		self.open_list.reserve(expected_touched);
		self.area_scratch.reserve(AREA_SCRATCH_INITIAL_RESERVE);
		self.reset_queue();
	}
	/// Empty the open list
	pub fn reset_queue(&mut self) {
		self.open_list.clear();
	}
	/// Get the per-node bookkeeping
	pub fn get_records(&self) -> &NodeRecords {
		&self.records
	}
}
