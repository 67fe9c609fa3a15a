//! The three coupled BSTs that index the slot table: the global
//! node-BST (`node_bst`) and the per-node out-/in-edge BSTs (`edge_bst`),
//! which share the same edge records but link them through independent
//! parent pointers (spec §4.4).

pub mod edge_bst;
pub mod node_bst;
