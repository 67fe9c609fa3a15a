//! Slot allocator: hands out fresh node/edge slots, or recycles
//! tombstoned ones, FIFO. The allocator knows nothing about the BSTs;
//! callers splice the returned slot into whichever tree it belongs in
//! (spec §4.2).

use std::collections::VecDeque;

use crate::file::GraphFile;
use crate::Result;

#[derive(Debug, Default)]
pub struct Allocator {
    free_nodes: VecDeque<u64>,
    free_edges: VecDeque<u64>,
}

impl Allocator {
    pub fn new() -> Allocator {
        Allocator::default()
    }

    pub fn free_node_count(&self) -> usize {
        self.free_nodes.len()
    }

    pub fn free_edge_count(&self) -> usize {
        self.free_edges.len()
    }

    /// Reseed the free lists from a fresh linear scan of the file, used by
    /// `find_tombstones` after reopening a file the allocator has no
    /// in-memory state for.
    pub fn reseed(&mut self, free_nodes: Vec<u64>, free_edges: Vec<u64>) {
        self.free_nodes = free_nodes.into();
        self.free_edges = free_edges.into();
    }

    /// Returns `(position, recycled)`. `recycled` is true when an existing
    /// tombstoned slot was reused instead of extending the bump pointer.
    pub fn alloc_node(&mut self, file: &mut GraphFile) -> Result<(u64, bool)> {
        if let Some(pos) = self.free_nodes.pop_front() {
            return Ok((pos, true));
        }
        let pos = file.header.next_table_position;
        let step = file.layout.node_slots as u64;
        file.header.next_table_position += step;
        if file.should_grow() {
            file.grow()?;
        }
        Ok((pos, false))
    }

    pub fn alloc_edge(&mut self, file: &mut GraphFile) -> Result<(u64, bool)> {
        if let Some(pos) = self.free_edges.pop_front() {
            return Ok((pos, true));
        }
        let pos = file.header.next_table_position;
        file.header.next_table_position += 1;
        if file.should_grow() {
            file.grow()?;
        }
        Ok((pos, false))
    }

    pub fn free_node(&mut self, file: &mut GraphFile, pos: u64) -> Result<()> {
        file.erase_node(pos)?;
        self.free_nodes.push_back(pos);
        Ok(())
    }

    pub fn free_edge(&mut self, file: &mut GraphFile, pos: u64) -> Result<()> {
        file.erase_edge(pos)?;
        self.free_edges.push_back(pos);
        Ok(())
    }
}

#[cfg(test)]
#[path = "alloc_test.rs"]
mod alloc_test;
